//! Item sink: idempotent, transactional bulk writer

use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::domain::ProcessedCustomer;
use crate::error::{BatchError, Result};

/// Per-chunk write outcome
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOutcome {
    /// Records inserted by this write
    pub written: u64,
    /// Records skipped because a processed record already existed
    pub duplicates: u64,
    /// Source rows that could not be flagged (deleted or missing)
    pub missing_sources: u64,
}

/// Writes one chunk on the caller's transaction connection
///
/// Any error aborts the whole chunk; the caller rolls back, so the write is
/// all-or-nothing.
#[async_trait]
pub trait ItemSink: Send + Sync {
    type Item: Send + Sync;

    async fn write(&self, conn: &mut SqliteConnection, chunk: &[Self::Item])
        -> Result<WriteOutcome>;
}

/// Sink for processed customers
///
/// Per item: insert the processed record, skipping silently when one already
/// exists for the source id (idempotent against chunk replays after a
/// crash), then flip the source customer's processed flag in the same
/// transaction. A flag update touching zero rows is a recorded anomaly, not
/// a chunk failure.
#[derive(Default)]
pub struct ProcessedCustomerSink;

impl ProcessedCustomerSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ItemSink for ProcessedCustomerSink {
    type Item = ProcessedCustomer;

    async fn write(
        &self,
        conn: &mut SqliteConnection,
        chunk: &[ProcessedCustomer],
    ) -> Result<WriteOutcome> {
        let mut outcome = WriteOutcome::default();

        for record in chunk {
            let inserted = sqlx::query(
                r#"
                INSERT INTO processed_customers
                    (customer_id, name, email, customer_code, final_status,
                     job_execution_id, processed_at, message)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (customer_id) DO NOTHING
                "#,
            )
            .bind(record.customer_id)
            .bind(&record.name)
            .bind(&record.email)
            .bind(&record.customer_code)
            .bind(record.final_status.as_str())
            .bind(record.job_execution_id)
            .bind(record.processed_at)
            .bind(&record.message)
            .execute(&mut *conn)
            .await
            .map_err(|e| BatchError::Transaction(e.to_string()))?;

            if inserted.rows_affected() == 0 {
                tracing::warn!(
                    customer_id = record.customer_id,
                    "Customer already has a processed record, keeping the existing one"
                );
                outcome.duplicates += 1;
            } else {
                outcome.written += 1;
            }

            // Flipped on the duplicate path too, so a replayed chunk still
            // converges on processed = 1.
            let flagged = sqlx::query(
                "UPDATE customers SET processed = 1, updated_at = ? WHERE id = ?",
            )
            .bind(record.processed_at)
            .bind(record.customer_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| BatchError::Transaction(e.to_string()))?;

            if flagged.rows_affected() == 0 {
                tracing::warn!(
                    customer_id = record.customer_id,
                    "Source customer missing; processed record kept without flag update"
                );
                outcome.missing_sources += 1;
            }
        }

        tracing::debug!(
            written = outcome.written,
            duplicates = outcome.duplicates,
            missing_sources = outcome.missing_sources,
            "Chunk written"
        );
        Ok(outcome)
    }
}
