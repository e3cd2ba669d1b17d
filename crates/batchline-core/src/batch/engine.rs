//! Chunk-oriented processing engine
//!
//! Drives the read/transform/write loop, owns the transaction boundary,
//! accumulates step statistics, and applies the skip/retry policy.

use chrono::Utc;

use crate::batch::listener::{JobListener, StepListener};
use crate::batch::sink::ItemSink;
use crate::batch::source::{ItemSource, SourceItem};
use crate::batch::transform::{ItemTransformer, Transformed};
use crate::error::{BatchError, Result};
use crate::meta::store::MetadataStore;
use crate::meta::types::{BatchStatus, ContextScope, ExitStatus, JobExecution, StepExecution};

/// Context key holding the last source id read before a committed chunk
pub const LAST_READ_ID_KEY: &str = "last_read_id";

/// Engine knobs
///
/// Skip and retry limits default to zero: fail-fast unless configured
/// otherwise.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    pub step_name: String,
    /// Items per transaction; size 1 degrades to per-item transactions
    pub chunk_size: usize,
    /// Item errors tolerated per phase (read/process) before the step aborts
    pub skip_limit: i64,
    /// Transient chunk-commit failures retried before the step aborts
    pub retry_limit: u32,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            step_name: "process-customers".to_string(),
            chunk_size: 100,
            skip_limit: 0,
            retry_limit: 0,
        }
    }
}

impl ChunkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size < 1 {
            return Err(BatchError::Config("chunk_size must be >= 1".to_string()));
        }
        Ok(())
    }
}

/// How the single step of a run ended
enum StepTermination {
    Completed(ExitStatus),
    Stopped,
}

/// The chunk engine for one pipeline
///
/// Collaborators are injected at construction; the engine is the only writer
/// of execution metadata while a run is in flight.
pub struct ChunkEngine<S, T, W> {
    store: MetadataStore,
    source: S,
    transformer: T,
    sink: W,
    config: ChunkConfig,
    job_listeners: Vec<Box<dyn JobListener>>,
    step_listeners: Vec<Box<dyn StepListener>>,
}

impl<S, T, W> ChunkEngine<S, T, W>
where
    S: ItemSource,
    T: ItemTransformer<Input = S::Item>,
    T::Output: Send + Sync,
    W: ItemSink<Item = T::Output>,
{
    pub fn new(
        store: MetadataStore,
        source: S,
        transformer: T,
        sink: W,
        config: ChunkConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            source,
            transformer,
            sink,
            config,
            job_listeners: Vec::new(),
            step_listeners: Vec::new(),
        })
    }

    pub fn with_job_listener(mut self, listener: impl JobListener + 'static) -> Self {
        self.job_listeners.push(Box::new(listener));
        self
    }

    pub fn with_step_listener(mut self, listener: impl StepListener + 'static) -> Self {
        self.step_listeners.push(Box::new(listener));
        self
    }

    /// Run the job execution to a terminal status
    ///
    /// Step failure is absorbed into a `failed` execution with the error in
    /// the exit description; only infrastructure errors (store connectivity,
    /// invalid state transitions) propagate as `Err`.
    pub async fn run(&self, execution_id: i64) -> Result<JobExecution> {
        let execution = self
            .store
            .get_execution(execution_id)
            .await?
            .ok_or_else(|| BatchError::NotFound(format!("job execution {}", execution_id)))?;

        // The source may have served a previous execution of this engine.
        self.source.reset().await;

        self.store.mark_execution_started(execution.id).await?;
        let execution = self
            .store
            .get_execution(execution_id)
            .await?
            .ok_or_else(|| BatchError::NotFound(format!("job execution {}", execution_id)))?;

        for listener in &self.job_listeners {
            if let Err(e) = listener.before_job(&execution) {
                tracing::warn!(error = %e, "before_job listener failed");
            }
        }

        let (status, exit) = match self.run_step(&execution).await {
            Ok(StepTermination::Completed(exit)) => (BatchStatus::Completed, exit),
            Ok(StepTermination::Stopped) => (BatchStatus::Stopped, ExitStatus::stopped()),
            Err(e) => {
                tracing::error!(execution_id, error = %e, "Step failed; failing job execution");
                (BatchStatus::Failed, ExitStatus::failed(e.to_string()))
            }
        };
        self.store
            .complete_execution(execution.id, status, &exit)
            .await?;

        let finished = self
            .store
            .get_execution(execution_id)
            .await?
            .ok_or_else(|| BatchError::NotFound(format!("job execution {}", execution_id)))?;

        // Fires on the success and failure paths alike.
        for listener in &self.job_listeners {
            if let Err(e) = listener.after_job(&finished) {
                tracing::warn!(error = %e, "after_job listener failed");
            }
        }

        Ok(finished)
    }

    async fn run_step(&self, execution: &JobExecution) -> Result<StepTermination> {
        let mut step = self
            .store
            .create_step_execution(execution.id, &self.config.step_name)
            .await?;
        step.status = BatchStatus::Started;
        step.start_time = Some(Utc::now());
        self.store.save_step_now(&step).await?;

        for listener in &self.step_listeners {
            if let Err(e) = listener.before_step(&step) {
                tracing::warn!(error = %e, "before_step listener failed");
            }
        }

        let loop_result = self.drive_loop(execution, &mut step).await;

        let termination = match loop_result {
            Ok(stopped) => {
                step.status = if stopped {
                    BatchStatus::Stopped
                } else {
                    BatchStatus::Completed
                };
                step.end_time = Some(Utc::now());

                let mut exit = if stopped {
                    ExitStatus::stopped()
                } else {
                    ExitStatus::completed()
                };
                for listener in &self.step_listeners {
                    match listener.after_step(&step) {
                        // Overrides apply only to a completed step.
                        Ok(Some(replacement)) if !stopped => exit = replacement,
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "after_step listener failed"),
                    }
                }
                step.exit_code = Some(exit.code.clone());
                self.store.save_step_now(&step).await?;

                if stopped {
                    Ok(StepTermination::Stopped)
                } else {
                    Ok(StepTermination::Completed(exit))
                }
            }
            Err(e) => {
                step.status = BatchStatus::Failed;
                step.exit_code = Some("FAILED".to_string());
                step.end_time = Some(Utc::now());
                self.store.save_step_now(&step).await?;

                for listener in &self.step_listeners {
                    if let Err(le) = listener.after_step(&step) {
                        tracing::warn!(error = %le, "after_step listener failed");
                    }
                }
                Err(e)
            }
        };

        termination
    }

    /// The read/transform/accumulate loop; returns whether a stop was observed
    async fn drive_loop(
        &self,
        execution: &JobExecution,
        step: &mut StepExecution,
    ) -> Result<bool> {
        let chunk_size = self.config.chunk_size;
        let mut buffer: Vec<T::Output> = Vec::with_capacity(chunk_size);
        let mut last_read_id: Option<i64> = None;

        loop {
            // A stop request is observed at chunk boundaries only; a chunk in
            // flight always commits or rolls back whole.
            if buffer.is_empty()
                && self.store.execution_status(execution.id).await? == BatchStatus::Stopping
            {
                tracing::info!(
                    execution_id = execution.id,
                    "Stop observed at chunk boundary, halting read loop"
                );
                return Ok(true);
            }

            let item = match self.source.next().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    if e.is_transient() && step.read_skip_count < self.config.skip_limit {
                        step.read_skip_count += 1;
                        tracing::warn!(error = %e, "Read error skipped");
                        continue;
                    }
                    return Err(e);
                }
            };
            step.read_count += 1;
            last_read_id = Some(item.source_id());

            match self.transformer.apply(&item) {
                Ok(Transformed::Output(output)) => buffer.push(output),
                Ok(Transformed::Filtered) => {
                    step.filter_count += 1;
                    continue;
                }
                Err(e) => {
                    if matches!(e, BatchError::FatalItem(_)) {
                        return Err(e);
                    }
                    if step.process_skip_count < self.config.skip_limit {
                        step.process_skip_count += 1;
                        tracing::warn!(
                            source_id = item.source_id(),
                            error = %e,
                            "Item error skipped"
                        );
                        continue;
                    }
                    return Err(e);
                }
            }

            if buffer.len() >= chunk_size {
                self.commit_chunk(step, &mut buffer, last_read_id).await?;
            }
        }

        if !buffer.is_empty() {
            self.commit_chunk(step, &mut buffer, last_read_id).await?;
        }
        Ok(false)
    }

    /// Commit the buffered chunk, retrying transient failures up to the limit
    async fn commit_chunk(
        &self,
        step: &mut StepExecution,
        buffer: &mut Vec<T::Output>,
        last_read_id: Option<i64>,
    ) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            match self.try_commit(step, buffer, last_read_id).await {
                Ok(committed) => {
                    *step = committed;
                    buffer.clear();
                    return Ok(());
                }
                Err(e) => {
                    step.rollback_count += 1;
                    self.store.save_step_now(step).await?;

                    if e.is_transient() && attempt < self.config.retry_limit {
                        attempt += 1;
                        tracing::warn!(
                            attempt,
                            retry_limit = self.config.retry_limit,
                            error = %e,
                            "Chunk commit rolled back, retrying"
                        );
                        continue;
                    }
                    tracing::error!(error = %e, "Chunk commit rolled back, aborting step");
                    return Err(e);
                }
            }
        }
    }

    /// One transactional attempt: sink write, counter update, restart
    /// position, then commit
    async fn try_commit(
        &self,
        step: &StepExecution,
        buffer: &[T::Output],
        last_read_id: Option<i64>,
    ) -> Result<StepExecution> {
        let mut tx = self
            .store
            .pool()
            .begin()
            .await
            .map_err(|e| BatchError::Transaction(e.to_string()))?;

        let outcome = self.sink.write(&mut tx, buffer).await?;

        let mut committed = step.clone();
        committed.commit_count += 1;
        committed.write_count += buffer.len() as i64;
        self.store.save_step(&mut tx, &committed).await?;

        if let Some(id) = last_read_id {
            self.store
                .put_context(
                    &mut tx,
                    ContextScope::Step,
                    step.id,
                    LAST_READ_ID_KEY,
                    &serde_json::json!(id),
                )
                .await?;
        }

        tx.commit()
            .await
            .map_err(|e| BatchError::Transaction(e.to_string()))?;

        tracing::info!(
            step_execution_id = step.id,
            chunk_len = buffer.len(),
            written = outcome.written,
            duplicates = outcome.duplicates,
            commit_count = committed.commit_count,
            "Chunk committed"
        );
        Ok(committed)
    }
}
