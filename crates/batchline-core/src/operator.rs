//! Job operator: the launch, inspection, and control surface
//!
//! The operator owns job identity (name plus parameter hash), enforces the
//! single-active-execution rule, and wires the customer pipeline into the
//! chunk engine for each launch.

use crate::batch::engine::{ChunkConfig, ChunkEngine};
use crate::batch::listener::{JobSummaryListener, NoDataStepListener, StepSummaryListener};
use crate::batch::sink::ProcessedCustomerSink;
use crate::batch::source::CustomerSource;
use crate::batch::transform::CustomerTransformer;
use crate::error::{BatchError, Result};
use crate::meta::store::MetadataStore;
use crate::meta::types::{JobExecution, JobParameters, JobStats, StepExecution};

/// Default job name for the customer processing pipeline
pub const CUSTOMER_JOB_NAME: &str = "customer-processing-job";

/// A finished (or failed) run with its step detail
#[derive(Debug)]
pub struct RunSummary {
    pub execution: JobExecution,
    pub steps: Vec<StepExecution>,
}

/// Launches and controls executions of the customer processing job
pub struct JobOperator {
    store: MetadataStore,
    job_name: String,
    config: ChunkConfig,
}

impl JobOperator {
    pub fn new(store: MetadataStore, config: ChunkConfig) -> Self {
        Self {
            store,
            job_name: CUSTOMER_JOB_NAME.to_string(),
            config,
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Launch one execution and drive it to a terminal status
    ///
    /// Rejects the launch with `DuplicateExecution` when the instance for
    /// this parameter set already has an active execution. A failed step
    /// yields a `failed` execution in the summary, not an `Err`; callers
    /// inspect `execution.status`.
    pub async fn launch(&self, parameters: JobParameters) -> Result<RunSummary> {
        let instance = self
            .store
            .find_or_create_instance(&self.job_name, &parameters)
            .await?;

        if let Some(active_id) = self.store.find_active_execution(instance.id).await? {
            return Err(BatchError::DuplicateExecution {
                job_name: self.job_name.clone(),
                execution_id: active_id,
            });
        }

        let execution = self.store.create_execution(&instance, &parameters).await?;
        tracing::info!(
            execution_id = execution.id,
            job_instance_id = instance.id,
            job_name = %self.job_name,
            "Launching job execution"
        );

        let pool = self.store.pool().clone();
        let engine = ChunkEngine::new(
            self.store.clone(),
            CustomerSource::new(pool),
            CustomerTransformer::new(execution.id),
            ProcessedCustomerSink::new(),
            self.config.clone(),
        )?
        .with_job_listener(JobSummaryListener)
        .with_step_listener(StepSummaryListener)
        .with_step_listener(NoDataStepListener);

        let finished = engine.run(execution.id).await?;
        self.summarize(finished).await
    }

    /// Execution with its steps, for status display
    pub async fn status(&self, execution_id: i64) -> Result<RunSummary> {
        let execution = self
            .store
            .get_execution(execution_id)
            .await?
            .ok_or_else(|| BatchError::NotFound(format!("job execution {}", execution_id)))?;
        self.summarize(execution).await
    }

    /// Most recent executions of this job, newest first
    pub async fn list_executions(&self, limit: i64) -> Result<Vec<JobExecution>> {
        self.store.list_executions(&self.job_name, limit).await
    }

    /// Aggregate counts across all executions of this job
    pub async fn stats(&self) -> Result<JobStats> {
        self.store.aggregate_stats(&self.job_name).await
    }

    /// Ask a started execution to stop at its next chunk boundary
    pub async fn stop(&self, execution_id: i64) -> Result<()> {
        self.store.request_stop(execution_id).await?;
        tracing::info!(execution_id, "Stop requested");
        Ok(())
    }

    /// Mark an execution abandoned mid-flight (e.g. by a crash) as failed so
    /// its instance becomes launchable again
    pub async fn recover(&self, execution_id: i64) -> Result<RunSummary> {
        let execution = self.store.recover_execution(execution_id).await?;
        tracing::info!(
            execution_id,
            status = %execution.status,
            "Execution recovered"
        );
        self.summarize(execution).await
    }

    async fn summarize(&self, execution: JobExecution) -> Result<RunSummary> {
        let steps = self.store.steps_for_execution(execution.id).await?;
        Ok(RunSummary { execution, steps })
    }
}
