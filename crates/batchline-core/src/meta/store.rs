//! Relational metadata store
//!
//! Persists the execution history: job instances, job executions, step
//! executions, and key-value execution context. History is append-only; a
//! terminal status is never silently overwritten, only the explicit
//! [`MetadataStore::recover_execution`] path may move a stuck execution to
//! `failed`.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, SqliteConnection};

use crate::error::{BatchError, Result};
use crate::meta::types::{
    BatchStatus, ContextScope, ExitStatus, JobExecution, JobInstance, JobParameters, JobStats,
    StepExecution,
};

/// Embedded schema applied on startup
const SCHEMA: &str = include_str!("schema.sql");

#[derive(FromRow)]
struct JobExecutionRow {
    id: i64,
    job_instance_id: i64,
    job_name: String,
    status: String,
    exit_code: Option<String>,
    exit_description: Option<String>,
    parameters: String,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobExecutionRow> for JobExecution {
    type Error = BatchError;

    fn try_from(row: JobExecutionRow) -> Result<Self> {
        Ok(JobExecution {
            id: row.id,
            job_instance_id: row.job_instance_id,
            job_name: row.job_name,
            status: BatchStatus::from(row.status),
            exit_code: row.exit_code,
            exit_description: row.exit_description,
            parameters: JobParameters::from_json(&row.parameters)?,
            start_time: row.start_time,
            end_time: row.end_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct StepExecutionRow {
    id: i64,
    job_execution_id: i64,
    step_name: String,
    status: String,
    exit_code: Option<String>,
    read_count: i64,
    write_count: i64,
    filter_count: i64,
    read_skip_count: i64,
    process_skip_count: i64,
    write_skip_count: i64,
    commit_count: i64,
    rollback_count: i64,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl From<StepExecutionRow> for StepExecution {
    fn from(row: StepExecutionRow) -> Self {
        StepExecution {
            id: row.id,
            job_execution_id: row.job_execution_id,
            step_name: row.step_name,
            status: BatchStatus::from(row.status),
            exit_code: row.exit_code,
            read_count: row.read_count,
            write_count: row.write_count,
            filter_count: row.filter_count,
            read_skip_count: row.read_skip_count,
            process_skip_count: row.process_skip_count,
            write_skip_count: row.write_skip_count,
            commit_count: row.commit_count,
            rollback_count: row.rollback_count,
            start_time: row.start_time,
            end_time: row.end_time,
        }
    }
}

const SELECT_EXECUTION: &str = r#"
    SELECT e.id, e.job_instance_id, i.job_name, e.status, e.exit_code,
           e.exit_description, e.parameters, e.start_time, e.end_time,
           e.created_at, e.updated_at
    FROM batch_job_executions e
    JOIN batch_job_instances i ON i.id = e.job_instance_id
"#;

const SELECT_STEP: &str = r#"
    SELECT id, job_execution_id, step_name, status, exit_code,
           read_count, write_count, filter_count,
           read_skip_count, process_skip_count, write_skip_count,
           commit_count, rollback_count, start_time, end_time
    FROM batch_step_executions
"#;

/// Store for execution metadata, backed by a SQLite pool
#[derive(Clone)]
pub struct MetadataStore {
    pool: SqlitePool,
}

impl MetadataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the database and apply the schema
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply the embedded schema (idempotent)
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    // ========================================================================
    // Job instances
    // ========================================================================

    /// Look up the instance for (job name, parameter hash), creating it on
    /// first launch with that parameter set
    pub async fn find_or_create_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Result<JobInstance> {
        let job_key = parameters.identity_hash();

        sqlx::query(
            r#"
            INSERT INTO batch_job_instances (job_name, job_key, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (job_name, job_key) DO NOTHING
            "#,
        )
        .bind(job_name)
        .bind(&job_key)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let row: (i64, String, String, DateTime<Utc>) = sqlx::query_as(
            "SELECT id, job_name, job_key, created_at FROM batch_job_instances \
             WHERE job_name = ? AND job_key = ?",
        )
        .bind(job_name)
        .bind(&job_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(JobInstance {
            id: row.0,
            job_name: row.1,
            job_key: row.2,
            created_at: row.3,
        })
    }

    // ========================================================================
    // Job executions
    // ========================================================================

    /// Id of the active (starting/started/stopping) execution, if any
    pub async fn find_active_execution(&self, job_instance_id: i64) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM batch_job_executions \
             WHERE job_instance_id = ? AND status IN ('starting', 'started', 'stopping') \
             LIMIT 1",
        )
        .bind(job_instance_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id,)| id))
    }

    /// Create a new execution in `starting` state
    ///
    /// The partial unique index on active executions backstops the launch
    /// path's duplicate check; a violation surfaces as `DuplicateExecution`.
    pub async fn create_execution(
        &self,
        instance: &JobInstance,
        parameters: &JobParameters,
    ) -> Result<JobExecution> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO batch_job_executions
                (job_instance_id, status, parameters, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(instance.id)
        .bind(BatchStatus::Starting.as_str())
        .bind(parameters.to_json()?)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(BatchError::from);

        let result = match result {
            Ok(r) => r,
            Err(e) if e.is_unique_violation() => {
                let active = self.find_active_execution(instance.id).await?;
                return Err(BatchError::DuplicateExecution {
                    job_name: instance.job_name.clone(),
                    execution_id: active.unwrap_or_default(),
                });
            }
            Err(e) => return Err(e),
        };

        let id = result.last_insert_rowid();
        self.get_execution(id)
            .await?
            .ok_or_else(|| BatchError::NotFound(format!("job execution {}", id)))
    }

    pub async fn get_execution(&self, execution_id: i64) -> Result<Option<JobExecution>> {
        let row: Option<JobExecutionRow> =
            sqlx::query_as(&format!("{} WHERE e.id = ?", SELECT_EXECUTION))
                .bind(execution_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(JobExecution::try_from).transpose()
    }

    /// Current status only; cheaper than fetching the whole row
    pub async fn execution_status(&self, execution_id: i64) -> Result<BatchStatus> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT status FROM batch_job_executions WHERE id = ?")
                .bind(execution_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(s,)| BatchStatus::from(s))
            .ok_or_else(|| BatchError::NotFound(format!("job execution {}", execution_id)))
    }

    /// Transition `starting -> started` and stamp the start time
    pub async fn mark_execution_started(&self, execution_id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE batch_job_executions \
             SET status = 'started', start_time = ?, updated_at = ? \
             WHERE id = ? AND status = 'starting'",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(execution_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.execution_status(execution_id).await?;
            return Err(BatchError::InvalidTransition {
                from: current,
                to: BatchStatus::Started,
            });
        }
        Ok(())
    }

    /// Record the final status and exit for an execution
    ///
    /// Refuses to overwrite an already-terminal status.
    pub async fn complete_execution(
        &self,
        execution_id: i64,
        status: BatchStatus,
        exit: &ExitStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE batch_job_executions \
             SET status = ?, exit_code = ?, exit_description = ?, end_time = ?, updated_at = ? \
             WHERE id = ? AND status NOT IN ('stopped', 'completed', 'failed', 'abandoned')",
        )
        .bind(status.as_str())
        .bind(&exit.code)
        .bind(&exit.description)
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(execution_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.execution_status(execution_id).await?;
            return Err(BatchError::InvalidTransition {
                from: current,
                to: status,
            });
        }
        Ok(())
    }

    /// Signal a running execution to stop at the next chunk boundary
    pub async fn request_stop(&self, execution_id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE batch_job_executions SET status = 'stopping', updated_at = ? \
             WHERE id = ? AND status = 'started'",
        )
        .bind(Utc::now())
        .bind(execution_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.execution_status(execution_id).await?;
            return Err(BatchError::InvalidTransition {
                from: current,
                to: BatchStatus::Stopping,
            });
        }
        Ok(())
    }

    /// Move a stuck execution to `failed` so its instance is restart-eligible
    ///
    /// Only valid for executions left in `started`/`stopping` by an abruptly
    /// terminated process; anything else is a `Recovery` error.
    pub async fn recover_execution(&self, execution_id: i64) -> Result<JobExecution> {
        let current = self.execution_status(execution_id).await?;
        if !matches!(current, BatchStatus::Started | BatchStatus::Stopping) {
            return Err(BatchError::Recovery {
                execution_id,
                status: current,
            });
        }

        sqlx::query(
            "UPDATE batch_job_executions \
             SET status = 'failed', exit_code = 'FAILED', \
                 exit_description = 'Recovered from abrupt termination', \
                 end_time = ?, updated_at = ? \
             WHERE id = ? AND status IN ('started', 'stopping')",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(execution_id)
        .execute(&self.pool)
        .await?;

        self.get_execution(execution_id)
            .await?
            .ok_or_else(|| BatchError::NotFound(format!("job execution {}", execution_id)))
    }

    /// Executions for a job name, most recent first
    pub async fn list_executions(&self, job_name: &str, limit: i64) -> Result<Vec<JobExecution>> {
        let rows: Vec<JobExecutionRow> = sqlx::query_as(&format!(
            "{} WHERE i.job_name = ? ORDER BY e.id DESC LIMIT ?",
            SELECT_EXECUTION
        ))
        .bind(job_name)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobExecution::try_from).collect()
    }

    /// Aggregate counts by status plus total records written, for a job name
    pub async fn aggregate_stats(&self, job_name: &str) -> Result<JobStats> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT e.status, COUNT(*)
            FROM batch_job_executions e
            JOIN batch_job_instances i ON i.id = e.job_instance_id
            WHERE i.job_name = ?
            GROUP BY e.status
            "#,
        )
        .bind(job_name)
        .fetch_all(&self.pool)
        .await?;

        let mut stats = JobStats::default();
        for (status, count) in rows {
            match BatchStatus::from(status) {
                BatchStatus::Completed => stats.completed = count,
                BatchStatus::Failed => stats.failed = count,
                s if s.is_active() => stats.active += count,
                _ => {}
            }
        }

        let total: (Option<i64>,) = sqlx::query_as(
            r#"
            SELECT SUM(s.write_count)
            FROM batch_step_executions s
            JOIN batch_job_executions e ON e.id = s.job_execution_id
            JOIN batch_job_instances i ON i.id = e.job_instance_id
            WHERE i.job_name = ?
            "#,
        )
        .bind(job_name)
        .fetch_one(&self.pool)
        .await?;
        stats.total_written = total.0.unwrap_or(0);

        Ok(stats)
    }

    // ========================================================================
    // Step executions
    // ========================================================================

    /// Create a step execution in `starting` state
    pub async fn create_step_execution(
        &self,
        job_execution_id: i64,
        step_name: &str,
    ) -> Result<StepExecution> {
        let result = sqlx::query(
            "INSERT INTO batch_step_executions (job_execution_id, step_name, status) \
             VALUES (?, ?, ?)",
        )
        .bind(job_execution_id)
        .bind(step_name)
        .bind(BatchStatus::Starting.as_str())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        let row: StepExecutionRow = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_STEP))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    /// Persist the step's status, exit, counters, and timestamps on the given
    /// connection, so chunk commits can include the counter update in their
    /// transaction
    pub async fn save_step(&self, conn: &mut SqliteConnection, step: &StepExecution) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE batch_step_executions
            SET status = ?, exit_code = ?,
                read_count = ?, write_count = ?, filter_count = ?,
                read_skip_count = ?, process_skip_count = ?, write_skip_count = ?,
                commit_count = ?, rollback_count = ?,
                start_time = ?, end_time = ?
            WHERE id = ?
            "#,
        )
        .bind(step.status.as_str())
        .bind(&step.exit_code)
        .bind(step.read_count)
        .bind(step.write_count)
        .bind(step.filter_count)
        .bind(step.read_skip_count)
        .bind(step.process_skip_count)
        .bind(step.write_skip_count)
        .bind(step.commit_count)
        .bind(step.rollback_count)
        .bind(step.start_time)
        .bind(step.end_time)
        .bind(step.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Persist a step snapshot outside any transaction
    pub async fn save_step_now(&self, step: &StepExecution) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.save_step(&mut conn, step).await
    }

    pub async fn steps_for_execution(&self, job_execution_id: i64) -> Result<Vec<StepExecution>> {
        let rows: Vec<StepExecutionRow> = sqlx::query_as(&format!(
            "{} WHERE job_execution_id = ? ORDER BY id ASC",
            SELECT_STEP
        ))
        .bind(job_execution_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ========================================================================
    // Execution context
    // ========================================================================

    /// Upsert a context entry on the given connection (joins the chunk's
    /// transaction when called with the transaction connection)
    pub async fn put_context(
        &self,
        conn: &mut SqliteConnection,
        scope: ContextScope,
        execution_id: i64,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO batch_execution_context (scope, execution_id, ctx_key, ctx_value, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (scope, execution_id, ctx_key)
            DO UPDATE SET ctx_value = excluded.ctx_value, updated_at = excluded.updated_at
            "#,
        )
        .bind(scope.as_str())
        .bind(execution_id)
        .bind(key)
        .bind(serde_json::to_string(value)?)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get_context(
        &self,
        scope: ContextScope,
        execution_id: i64,
        key: &str,
    ) -> Result<Option<serde_json::Value>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT ctx_value FROM batch_execution_context \
             WHERE scope = ? AND execution_id = ? AND ctx_key = ?",
        )
        .bind(scope.as_str())
        .bind(execution_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(v,)| serde_json::from_str(&v).map_err(BatchError::from))
            .transpose()
    }
}
