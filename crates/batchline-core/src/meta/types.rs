//! Core types for execution metadata
//!
//! Mirrors the four metadata tables: job instances, job executions, step
//! executions, and execution context entries.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lifecycle status of a job or step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Starting,
    Started,
    Stopping,
    Stopped,
    Completed,
    Failed,
    Abandoned,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Starting => "starting",
            BatchStatus::Started => "started",
            BatchStatus::Stopping => "stopping",
            BatchStatus::Stopped => "stopped",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Abandoned => "abandoned",
        }
    }

    /// An active execution holds the per-instance execution slot
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            BatchStatus::Starting | BatchStatus::Started | BatchStatus::Stopping
        )
    }

    /// Terminal statuses are never silently overwritten
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Stopped
                | BatchStatus::Completed
                | BatchStatus::Failed
                | BatchStatus::Abandoned
        )
    }
}

impl From<String> for BatchStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "starting" => BatchStatus::Starting,
            "started" => BatchStatus::Started,
            "stopping" => BatchStatus::Stopping,
            "stopped" => BatchStatus::Stopped,
            "completed" => BatchStatus::Completed,
            "failed" => BatchStatus::Failed,
            "abandoned" => BatchStatus::Abandoned,
            _ => BatchStatus::Starting,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit code and human-readable description recorded for a finished execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    pub code: String,
    pub description: String,
}

impl ExitStatus {
    /// Exit code for an execution that read zero records
    pub const NO_DATA: &'static str = "NO_DATA";

    pub fn completed() -> Self {
        Self {
            code: "COMPLETED".to_string(),
            description: String::new(),
        }
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            code: "FAILED".to_string(),
            description: description.into(),
        }
    }

    pub fn stopped() -> Self {
        Self {
            code: "STOPPED".to_string(),
            description: "Stop requested; execution halted at a chunk boundary".to_string(),
        }
    }

    pub fn no_data() -> Self {
        Self {
            code: Self::NO_DATA.to_string(),
            description: "No pending records to process".to_string(),
        }
    }
}

/// Launch parameters for a job
///
/// A `BTreeMap` keeps the serialization stable so the identity hash does not
/// depend on insertion order. Launching twice with the same parameters maps
/// to the same [`JobInstance`]; callers that want repeat runs add a run token
/// (see [`JobParameters::with_run_token`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameters(BTreeMap<String, String>);

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Add a monotonically increasing token, making this a distinct instance
    pub fn with_run_token(self, token: i64) -> Self {
        self.insert("run.token", token.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SHA-256 over the canonical `key=value` lines; identifies the JobInstance
    pub fn identity_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for (key, value) in &self.0 {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(Self(serde_json::from_str(json)?))
    }
}

impl fmt::Display for JobParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Logical run configuration: one row per (job name, parameter hash) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInstance {
    pub id: i64,
    pub job_name: String,
    pub job_key: String,
    pub created_at: DateTime<Utc>,
}

/// One attempt of running a [`JobInstance`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecution {
    pub id: i64,
    pub job_instance_id: i64,
    pub job_name: String,
    pub status: BatchStatus,
    pub exit_code: Option<String>,
    pub exit_description: Option<String>,
    pub parameters: JobParameters,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobExecution {
    /// Wall-clock duration, available once the execution has ended
    pub fn duration_secs(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}

/// One attempt of a pipeline step, with its running statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    pub id: i64,
    pub job_execution_id: i64,
    pub step_name: String,
    pub status: BatchStatus,
    pub exit_code: Option<String>,
    pub read_count: i64,
    pub write_count: i64,
    pub filter_count: i64,
    pub read_skip_count: i64,
    pub process_skip_count: i64,
    pub write_skip_count: i64,
    pub commit_count: i64,
    pub rollback_count: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl StepExecution {
    /// Total items skipped across the read, process, and write phases
    pub fn skip_total(&self) -> i64 {
        self.read_skip_count + self.process_skip_count + self.write_skip_count
    }
}

/// Scope of an execution context entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextScope {
    Job,
    Step,
}

impl ContextScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextScope::Job => "job",
            ContextScope::Step => "step",
        }
    }
}

/// Aggregate counts across the execution history of one job name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStats {
    pub completed: i64,
    pub failed: i64,
    pub active: i64,
    pub total_written: i64,
}
