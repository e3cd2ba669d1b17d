//! Domain records: pending customers and their processed counterparts

pub mod customers;
pub mod validation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    Pending,
    Active,
    Inactive,
    Error,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Pending => "pending",
            CustomerStatus::Active => "active",
            CustomerStatus::Inactive => "inactive",
            CustomerStatus::Error => "error",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CustomerStatus::Pending => "Pending processing",
            CustomerStatus::Active => "Active customer",
            CustomerStatus::Inactive => "Inactive customer",
            CustomerStatus::Error => "Processing error",
        }
    }
}

impl From<String> for CustomerStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => CustomerStatus::Active,
            "inactive" => CustomerStatus::Inactive,
            "error" => CustomerStatus::Error,
            _ => CustomerStatus::Pending,
        }
    }
}

/// Pending source record, owned by upstream producers
///
/// The engine mutates only the `processed` flag, inside a chunk's
/// transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: CustomerStatus,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Construction-time defaulting: pending, unprocessed, timestamps now
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            email: email.into(),
            phone,
            status: CustomerStatus::Pending,
            processed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: CustomerStatus) -> Self {
        self.status = status;
        self
    }
}

/// Output record, created exactly once per successfully processed customer
///
/// The uniqueness constraint on `customer_id` makes sink writes idempotent
/// under chunk replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedCustomer {
    pub customer_id: i64,
    pub name: String,
    pub email: String,
    pub customer_code: String,
    pub final_status: CustomerStatus,
    pub job_execution_id: i64,
    pub processed_at: DateTime<Utc>,
    pub message: String,
}

/// Derive a short customer code from a random UUID
///
/// Uniqueness is enforced at write time by the column constraint, not here.
pub fn generate_customer_code() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("CUS-{}", uuid[..8].to_uppercase())
}
