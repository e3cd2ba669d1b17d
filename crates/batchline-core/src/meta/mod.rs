//! Execution metadata: the durable record of every job run
//!
//! Instances, executions, steps, and execution context live in their own
//! tables next to the business data so chunk commits and metadata updates
//! share one transaction.

pub mod store;
pub mod types;
