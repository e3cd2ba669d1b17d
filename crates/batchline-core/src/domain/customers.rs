//! Query helpers for the two domain tables
//!
//! The batch engine only needs the read/write contracts below; full CRUD
//! record management lives outside this crate.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

use crate::domain::{Customer, CustomerStatus, ProcessedCustomer};
use crate::error::Result;

#[derive(FromRow)]
struct CustomerRow {
    id: i64,
    name: String,
    email: String,
    phone: Option<String>,
    status: String,
    processed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            status: CustomerStatus::from(row.status),
            processed: row.processed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insert a customer, returning its generated id
pub async fn insert_customer(pool: &SqlitePool, customer: &Customer) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO customers (name, email, phone, status, processed, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.phone)
    .bind(customer.status.as_str())
    .bind(customer.processed)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// The working set for one execution: unprocessed customers by id ascending
pub async fn find_unprocessed(pool: &SqlitePool) -> Result<Vec<Customer>> {
    let rows: Vec<CustomerRow> = sqlx::query_as(
        "SELECT id, name, email, phone, status, processed, created_at, updated_at \
         FROM customers WHERE processed = 0 ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn count_unprocessed(pool: &SqlitePool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers WHERE processed = 0")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn count_processed_records(pool: &SqlitePool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM processed_customers")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// Processed records written by one execution
pub async fn find_processed_by_execution(
    pool: &SqlitePool,
    job_execution_id: i64,
) -> Result<Vec<ProcessedCustomer>> {
    let rows: Vec<(i64, String, String, String, String, i64, DateTime<Utc>, Option<String>)> =
        sqlx::query_as(
            "SELECT customer_id, name, email, customer_code, final_status, \
                    job_execution_id, processed_at, message \
             FROM processed_customers WHERE job_execution_id = ? ORDER BY customer_id ASC",
        )
        .bind(job_execution_id)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(
            |(customer_id, name, email, customer_code, final_status, exec_id, processed_at, message)| {
                ProcessedCustomer {
                    customer_id,
                    name,
                    email,
                    customer_code,
                    final_status: CustomerStatus::from(final_status),
                    job_execution_id: exec_id,
                    processed_at,
                    message: message.unwrap_or_default(),
                }
            },
        )
        .collect())
}
