//! Item transformer: per-item validation, normalization, and business rules

use chrono::Utc;

use crate::domain::validation::validate_customer;
use crate::domain::{generate_customer_code, Customer, CustomerStatus, ProcessedCustomer};
use crate::error::Result;

/// Outcome of transforming one item
///
/// `Filtered` drops the item silently; it is counted separately from errors
/// and never fails the chunk.
#[derive(Debug)]
pub enum Transformed<O> {
    Output(O),
    Filtered,
}

/// Pure per-item transformation
pub trait ItemTransformer: Send + Sync {
    type Input;
    type Output;

    fn apply(&self, item: &Self::Input) -> Result<Transformed<Self::Output>>;
}

/// Transformer for pending customers
///
/// Applies the business rules: name uppercased with inner whitespace
/// collapsed, email lowercased and trimmed, a generated unique customer
/// code, and a final status derived from the source status and email.
pub struct CustomerTransformer {
    job_execution_id: i64,
}

impl CustomerTransformer {
    pub fn new(job_execution_id: i64) -> Self {
        Self { job_execution_id }
    }
}

impl ItemTransformer for CustomerTransformer {
    type Input = Customer;
    type Output = ProcessedCustomer;

    fn apply(&self, customer: &Customer) -> Result<Transformed<ProcessedCustomer>> {
        let errors = validate_customer(customer);
        if !errors.is_empty() {
            tracing::warn!(
                customer_id = customer.id,
                errors = ?errors,
                "Customer failed validation, filtering"
            );
            return Ok(Transformed::Filtered);
        }

        let final_status = derive_final_status(customer);
        let output = ProcessedCustomer {
            customer_id: customer.id,
            name: normalize_name(&customer.name),
            email: normalize_email(&customer.email),
            customer_code: generate_customer_code(),
            final_status,
            job_execution_id: self.job_execution_id,
            processed_at: Utc::now(),
            message: build_message(customer, final_status),
        };

        tracing::debug!(
            customer_id = customer.id,
            customer_code = %output.customer_code,
            final_status = final_status.as_str(),
            "Customer transformed"
        );
        Ok(Transformed::Output(output))
    }
}

/// Trim, collapse inner whitespace, and uppercase
fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Trim and lowercase
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Business rules for the final status
///
/// An inactive customer stays inactive; a present email promotes to active;
/// otherwise the customer remains pending.
fn derive_final_status(customer: &Customer) -> CustomerStatus {
    if customer.status == CustomerStatus::Inactive {
        return CustomerStatus::Inactive;
    }
    if !customer.email.trim().is_empty() {
        return CustomerStatus::Active;
    }
    CustomerStatus::Pending
}

fn build_message(customer: &Customer, final_status: CustomerStatus) -> String {
    let mut message = format!(
        "Processed successfully. Final status: {}.",
        final_status.description()
    );
    if customer.phone.as_deref().is_none_or(str::is_empty) {
        message.push_str(" Note: no phone on record.");
    }
    message
}
