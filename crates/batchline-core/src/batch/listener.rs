//! Execution lifecycle listeners
//!
//! Hooks fire around job and step execution. A failing hook is logged and
//! never alters the status the engine has already determined.

use crate::error::Result;
use crate::meta::types::{ExitStatus, JobExecution, StepExecution};

/// Before/after hooks around a job execution
pub trait JobListener: Send + Sync {
    fn before_job(&self, _execution: &JobExecution) -> Result<()> {
        Ok(())
    }

    fn after_job(&self, _execution: &JobExecution) -> Result<()> {
        Ok(())
    }
}

/// Before/after hooks around a step execution
///
/// `after_step` may replace the step's exit status based on the observed
/// counters; returning `None` keeps the engine's status.
pub trait StepListener: Send + Sync {
    fn before_step(&self, _step: &StepExecution) -> Result<()> {
        Ok(())
    }

    fn after_step(&self, _step: &StepExecution) -> Result<Option<ExitStatus>> {
        Ok(None)
    }
}

/// Logs a summary at job start and end
pub struct JobSummaryListener;

impl JobListener for JobSummaryListener {
    fn before_job(&self, execution: &JobExecution) -> Result<()> {
        tracing::info!(
            execution_id = execution.id,
            job_name = %execution.job_name,
            parameters = %execution.parameters,
            "Job execution starting"
        );
        Ok(())
    }

    fn after_job(&self, execution: &JobExecution) -> Result<()> {
        tracing::info!(
            execution_id = execution.id,
            job_name = %execution.job_name,
            status = %execution.status,
            exit_code = execution.exit_code.as_deref().unwrap_or(""),
            duration_secs = execution.duration_secs().unwrap_or(0.0),
            "Job execution finished"
        );
        Ok(())
    }
}

/// Logs the step's counters when it finishes
pub struct StepSummaryListener;

impl StepListener for StepSummaryListener {
    fn before_step(&self, step: &StepExecution) -> Result<()> {
        tracing::info!(
            step_execution_id = step.id,
            job_execution_id = step.job_execution_id,
            step_name = %step.step_name,
            "Step starting"
        );
        Ok(())
    }

    fn after_step(&self, step: &StepExecution) -> Result<Option<ExitStatus>> {
        tracing::info!(
            step_execution_id = step.id,
            step_name = %step.step_name,
            status = %step.status,
            read = step.read_count,
            written = step.write_count,
            filtered = step.filter_count,
            skipped = step.skip_total(),
            commits = step.commit_count,
            rollbacks = step.rollback_count,
            "Step finished"
        );
        Ok(None)
    }
}

/// Replaces the exit status with `NO_DATA` when nothing was read
///
/// An empty working set is not an error; the distinguished exit code is left
/// for the caller to interpret.
pub struct NoDataStepListener;

impl StepListener for NoDataStepListener {
    fn after_step(&self, step: &StepExecution) -> Result<Option<ExitStatus>> {
        if step.read_count == 0 {
            tracing::warn!(
                step_execution_id = step.id,
                "No records were read in this step"
            );
            return Ok(Some(ExitStatus::no_data()));
        }
        Ok(None)
    }
}
