//! Batchline Core Library
//!
//! Chunk-oriented batch processing over a SQLite-backed metadata store.
//!
//! # Overview
//!
//! The engine reads pending customers, transforms them through validation
//! and normalization rules, and writes processed records in transactional
//! chunks:
//!
//! - **Metadata Store**: job instances, executions, steps, and execution
//!   context persisted with SQLx
//! - **Chunk Engine**: the read/transform/write loop with chunk-sized
//!   transactions, rollback/retry, and a skip policy
//! - **Job Operator**: launch, status, stop, and recovery surface with
//!   single-active-execution enforcement
//! - **Configuration**: environment-based configuration management
//!
//! # Execution model
//!
//! A job instance is identified by its name and a hash of its parameters.
//! Each launch creates a job execution that moves `starting` -> `started`
//! and ends `completed`, `failed`, or `stopped`. Chunks commit the sink
//! writes, the step counters, and the restart position in one transaction,
//! so a crash never leaves a half-applied chunk.
//!
//! # Example
//!
//! ```no_run
//! use batchline_core::config::Config;
//! use batchline_core::meta::store::MetadataStore;
//! use batchline_core::meta::types::JobParameters;
//! use batchline_core::operator::JobOperator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let store =
//!         MetadataStore::connect(&config.database.url, config.database.max_connections).await?;
//!     let operator = JobOperator::new(store, config.chunk_config());
//!     let run_token = chrono::Utc::now().timestamp_millis();
//!     let summary = operator.launch(JobParameters::new().with_run_token(run_token)).await?;
//!     println!("{} -> {}", summary.execution.id, summary.execution.status);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod domain;
pub mod error;
pub mod meta;
pub mod operator;

// Re-export commonly used types
pub use error::{BatchError, Result};
