//! Integration tests for the job operator: launch semantics, the
//! single-active-execution rule, recovery, and the history queries.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use batchline_core::batch::engine::{ChunkConfig, ChunkEngine};
use batchline_core::batch::sink::{ItemSink, ProcessedCustomerSink, WriteOutcome};
use batchline_core::batch::source::CustomerSource;
use batchline_core::batch::transform::CustomerTransformer;
use batchline_core::domain::{customers, ProcessedCustomer};
use batchline_core::error::{BatchError, Result};
use batchline_core::meta::types::{BatchStatus, ExitStatus};
use batchline_core::operator::{JobOperator, CUSTOMER_JOB_NAME};
use sqlx::SqliteConnection;

fn operator(db: &common::TestDb) -> JobOperator {
    JobOperator::new(db.store.clone(), ChunkConfig::default())
}

#[tokio::test]
async fn test_launch_processes_pending_customers() {
    let db = common::setup().await;
    common::seed_customers(db.pool(), 7).await;

    let summary = operator(&db)
        .launch(common::unique_parameters("launch"))
        .await
        .expect("Launch failed");

    assert_eq!(summary.execution.status, BatchStatus::Completed);
    assert_eq!(summary.execution.job_name, CUSTOMER_JOB_NAME);
    assert_eq!(summary.steps.len(), 1);
    assert_eq!(summary.steps[0].write_count, 7);
    assert_eq!(customers::count_unprocessed(db.pool()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_launch_with_active_execution_is_rejected() {
    let db = common::setup().await;
    common::seed_customers(db.pool(), 2).await;
    let parameters = common::unique_parameters("duplicate");

    // An execution for the same parameter set sits in `starting`, as if
    // another process had claimed the instance.
    let stuck = common::pending_execution(&db.store, CUSTOMER_JOB_NAME, &parameters).await;

    let result = operator(&db).launch(parameters).await;
    match result {
        Err(BatchError::DuplicateExecution {
            job_name,
            execution_id,
        }) => {
            assert_eq!(job_name, CUSTOMER_JOB_NAME);
            assert_eq!(execution_id, stuck.id);
        }
        other => panic!("expected DuplicateExecution, got {:?}", other.map(|s| s.execution.status)),
    }
}

#[tokio::test]
async fn test_different_parameters_are_distinct_instances() {
    let db = common::setup().await;
    common::seed_customers(db.pool(), 2).await;

    // An active execution for one parameter set does not block another.
    common::pending_execution(
        &db.store,
        CUSTOMER_JOB_NAME,
        &common::unique_parameters("instance-a"),
    )
    .await;

    let summary = operator(&db)
        .launch(common::unique_parameters("instance-b"))
        .await
        .expect("Launch failed");
    assert_eq!(summary.execution.status, BatchStatus::Completed);
}

#[tokio::test]
async fn test_recover_fails_abandoned_execution_and_unblocks_relaunch() {
    let db = common::setup().await;
    common::seed_customers(db.pool(), 5).await;
    let parameters = common::unique_parameters("recovery");

    // Simulate a crash: the execution reached `started` and the process died.
    let stuck = common::pending_execution(&db.store, CUSTOMER_JOB_NAME, &parameters).await;
    db.store
        .mark_execution_started(stuck.id)
        .await
        .expect("Failed to start execution");

    let op = operator(&db);
    let recovered = op.recover(stuck.id).await.expect("Recovery failed");
    assert_eq!(recovered.execution.status, BatchStatus::Failed);
    assert_eq!(
        recovered.execution.exit_description.as_deref(),
        Some("Recovered from abrupt termination")
    );

    // The instance is launchable again and picks up the full remainder.
    let summary = op.launch(parameters).await.expect("Relaunch failed");
    assert_eq!(summary.execution.status, BatchStatus::Completed);
    assert_eq!(summary.steps[0].write_count, 5);
}

/// Sink that succeeds its first `succeed_times` writes, then always fails
struct DyingSink {
    inner: ProcessedCustomerSink,
    succeed_times: usize,
    attempts: AtomicUsize,
}

#[async_trait]
impl ItemSink for DyingSink {
    type Item = ProcessedCustomer;

    async fn write(
        &self,
        conn: &mut SqliteConnection,
        chunk: &[ProcessedCustomer],
    ) -> Result<WriteOutcome> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) >= self.succeed_times {
            return Err(BatchError::Transaction("sink gave out".to_string()));
        }
        self.inner.write(conn, chunk).await
    }
}

#[tokio::test]
async fn test_relaunch_after_partial_failure_processes_remainder() {
    let db = common::setup().await;
    common::seed_customers(db.pool(), 6).await;
    let parameters = common::unique_parameters("remainder");

    // First attempt commits two chunks of 2 and dies on the third.
    let failed = common::pending_execution(&db.store, CUSTOMER_JOB_NAME, &parameters).await;
    let engine = ChunkEngine::new(
        db.store.clone(),
        CustomerSource::new(db.pool().clone()),
        CustomerTransformer::new(failed.id),
        DyingSink {
            inner: ProcessedCustomerSink::new(),
            succeed_times: 2,
            attempts: AtomicUsize::new(0),
        },
        ChunkConfig {
            chunk_size: 2,
            ..ChunkConfig::default()
        },
    )
    .expect("Failed to build engine");

    let finished = engine.run(failed.id).await.expect("Run failed");
    assert_eq!(finished.status, BatchStatus::Failed);
    assert_eq!(customers::count_unprocessed(db.pool()).await.unwrap(), 2);

    // The relaunch sees only the uncommitted remainder.
    let op = JobOperator::new(
        db.store.clone(),
        ChunkConfig {
            chunk_size: 2,
            ..ChunkConfig::default()
        },
    );
    let summary = op.launch(parameters).await.expect("Relaunch failed");
    assert_eq!(summary.execution.status, BatchStatus::Completed);
    assert_eq!(summary.steps[0].read_count, 2);
    assert_eq!(summary.steps[0].write_count, 2);
    assert_eq!(customers::count_unprocessed(db.pool()).await.unwrap(), 0);
    assert_eq!(customers::count_processed_records(db.pool()).await.unwrap(), 6);
}

#[tokio::test]
async fn test_recover_rejects_terminal_execution() {
    let db = common::setup().await;
    common::seed_customers(db.pool(), 1).await;

    let op = operator(&db);
    let summary = op
        .launch(common::unique_parameters("recover-terminal"))
        .await
        .expect("Launch failed");

    let result = op.recover(summary.execution.id).await;
    match result {
        Err(BatchError::Recovery {
            execution_id,
            status,
        }) => {
            assert_eq!(execution_id, summary.execution.id);
            assert_eq!(status, BatchStatus::Completed);
        }
        other => panic!(
            "expected Recovery error, got {:?}",
            other.map(|s| s.execution.status)
        ),
    }
}

#[tokio::test]
async fn test_stop_rejects_execution_that_is_not_running() {
    let db = common::setup().await;
    common::seed_customers(db.pool(), 1).await;

    let op = operator(&db);
    let summary = op
        .launch(common::unique_parameters("stop-terminal"))
        .await
        .expect("Launch failed");

    let result = op.stop(summary.execution.id).await;
    assert!(matches!(
        result,
        Err(BatchError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_completed_instance_relaunch_exits_no_data() {
    let db = common::setup().await;
    common::seed_customers(db.pool(), 3).await;
    let parameters = common::unique_parameters("relaunch");

    let op = operator(&db);
    let first = op.launch(parameters.clone()).await.expect("Launch failed");
    assert_eq!(first.steps[0].write_count, 3);

    // Nothing pending remains, so the second run reads zero records.
    let second = op.launch(parameters).await.expect("Relaunch failed");
    assert_eq!(second.execution.status, BatchStatus::Completed);
    assert_eq!(
        second.execution.exit_code.as_deref(),
        Some(ExitStatus::NO_DATA)
    );
    assert_eq!(second.steps[0].read_count, 0);
}

#[tokio::test]
async fn test_list_executions_newest_first() {
    let db = common::setup().await;
    common::seed_customers(db.pool(), 2).await;

    let op = operator(&db);
    let first = op
        .launch(common::unique_parameters("list-1"))
        .await
        .expect("Launch failed");
    let second = op
        .launch(common::unique_parameters("list-2"))
        .await
        .expect("Launch failed");

    let listed = op.list_executions(10).await.expect("List failed");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.execution.id);
    assert_eq!(listed[1].id, first.execution.id);

    let limited = op.list_executions(1).await.expect("List failed");
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, second.execution.id);
}

#[tokio::test]
async fn test_stats_aggregate_across_executions() {
    let db = common::setup().await;
    common::seed_customers(db.pool(), 4).await;

    let op = operator(&db);
    op.launch(common::unique_parameters("stats-1"))
        .await
        .expect("Launch failed");
    op.launch(common::unique_parameters("stats-2"))
        .await
        .expect("Launch failed");

    // One execution left active by a simulated crash.
    let stuck = common::pending_execution(
        &db.store,
        CUSTOMER_JOB_NAME,
        &common::unique_parameters("stats-stuck"),
    )
    .await;
    db.store
        .mark_execution_started(stuck.id)
        .await
        .expect("Failed to start execution");

    let stats = op.stats().await.expect("Stats failed");
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.total_written, 4);
}

#[tokio::test]
async fn test_status_returns_execution_with_steps() {
    let db = common::setup().await;
    common::seed_customers(db.pool(), 2).await;

    let op = operator(&db);
    let summary = op
        .launch(common::unique_parameters("status"))
        .await
        .expect("Launch failed");

    let fetched = op.status(summary.execution.id).await.expect("Status failed");
    assert_eq!(fetched.execution.id, summary.execution.id);
    assert_eq!(fetched.steps.len(), 1);
    assert_eq!(fetched.steps[0].step_name, "process-customers");

    let missing = op.status(9999).await;
    assert!(matches!(missing, Err(BatchError::NotFound(_))));
}
