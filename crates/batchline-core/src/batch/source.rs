//! Item source: stateful, restartable iterator over pending records

use std::collections::VecDeque;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tokio::sync::Mutex;

use crate::domain::{customers, Customer};
use crate::error::Result;

/// An item the engine can track a restart position for
pub trait SourceItem {
    fn source_id(&self) -> i64;
}

impl SourceItem for Customer {
    fn source_id(&self) -> i64 {
        self.id
    }
}

/// Sequential source of items for one execution
///
/// `next` returns `None` at end-of-data (not an error) and never re-yields an
/// item within one execution. `reset` clears the internal position so the
/// same source value can serve a subsequent, independent execution.
#[async_trait]
pub trait ItemSource: Send + Sync {
    type Item: SourceItem + Send;

    async fn next(&self) -> Result<Option<Self::Item>>;

    async fn reset(&self);
}

/// Source over unprocessed customers, ordered by id ascending
///
/// The working set is materialized lazily on the first `next` call of an
/// execution; the read happens outside any chunk transaction and the
/// idempotent sink rechecks at commit time. The async mutex serializes
/// cursor access when the engine is shared across triggers.
pub struct CustomerSource {
    pool: SqlitePool,
    cursor: Mutex<Option<VecDeque<Customer>>>,
}

impl CustomerSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cursor: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ItemSource for CustomerSource {
    type Item = Customer;

    async fn next(&self) -> Result<Option<Customer>> {
        let mut cursor = self.cursor.lock().await;

        if cursor.is_none() {
            let pending = customers::find_unprocessed(&self.pool).await?;
            tracing::info!(count = pending.len(), "Materialized pending customer working set");
            *cursor = Some(pending.into());
        }

        let item = cursor.as_mut().and_then(VecDeque::pop_front);
        if let Some(ref customer) = item {
            tracing::debug!(customer_id = customer.id, "Read customer");
        }
        Ok(item)
    }

    async fn reset(&self) {
        let mut cursor = self.cursor.lock().await;
        *cursor = None;
        tracing::debug!("Customer source reset for a new execution");
    }
}
