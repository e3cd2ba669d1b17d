//! Common test utilities for batchline integration tests
//!
//! Each test gets its own SQLite database in a temp directory; the schema is
//! applied on connect, so there is no external setup.

use batchline_core::domain::{customers, Customer};
use batchline_core::meta::store::MetadataStore;
use batchline_core::meta::types::{JobExecution, JobParameters};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// A connected store plus the temp directory keeping its database alive
pub struct TestDb {
    pub store: MetadataStore,
    _dir: TempDir,
}

impl TestDb {
    pub fn pool(&self) -> &SqlitePool {
        self.store.pool()
    }
}

pub async fn setup() -> TestDb {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("batchline-test.db");
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let store = MetadataStore::connect(&url, 5)
        .await
        .expect("Failed to connect test database");
    TestDb { store, _dir: dir }
}

/// Insert `count` valid customers, odd ones without a phone
pub async fn seed_customers(pool: &SqlitePool, count: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(count);
    for i in 1..=count {
        let phone = (i % 2 == 0).then(|| format!("555-01{:02}", i));
        let customer = Customer::new(
            format!("Customer {}", i),
            format!("customer{}@example.com", i),
            phone,
        );
        let id = customers::insert_customer(pool, &customer)
            .await
            .expect("Failed to insert customer");
        ids.push(id);
    }
    ids
}

pub async fn seed_customer(pool: &SqlitePool, customer: &Customer) -> i64 {
    customers::insert_customer(pool, customer)
        .await
        .expect("Failed to insert customer")
}

/// Unique parameters so each call creates a distinct job instance
pub fn unique_parameters(tag: &str) -> JobParameters {
    JobParameters::new().insert("test.tag", tag)
}

/// Create an execution in `starting` state without running it
pub async fn pending_execution(
    store: &MetadataStore,
    job_name: &str,
    parameters: &JobParameters,
) -> JobExecution {
    let instance = store
        .find_or_create_instance(job_name, parameters)
        .await
        .expect("Failed to create job instance");
    store
        .create_execution(&instance, parameters)
        .await
        .expect("Failed to create job execution")
}
