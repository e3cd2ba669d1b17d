//! Batchline CLI Library
//!
//! Command-line surface over the batch engine: launch runs, inspect
//! execution history, and control stuck or running executions.

pub mod commands;

use clap::{Parser, Subcommand};

/// Chunk-oriented customer batch processing
#[derive(Parser)]
#[command(name = "batchline", version, about)]
pub struct Cli {
    /// Database URL (SQLite)
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Verbose logging to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch one execution of the customer processing job
    Run {
        /// Items per chunk transaction
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Item errors tolerated before the step aborts
        #[arg(long)]
        skip_limit: Option<i64>,

        /// Transient chunk-commit failures retried before the step aborts
        #[arg(long)]
        retry_limit: Option<u32>,

        /// Extra job parameter (repeatable)
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Add a fresh run token so this launch gets its own job instance
        #[arg(long)]
        new_instance: bool,
    },

    /// Show one execution with its step detail
    Status {
        /// Job execution id
        execution_id: i64,
    },

    /// List recent executions, newest first
    List {
        /// Maximum number of executions to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Aggregate statistics across all executions
    Stats,

    /// Ask a running execution to stop at its next chunk boundary
    Stop {
        /// Job execution id
        execution_id: i64,
    },

    /// Mark an execution abandoned by a crash as failed
    Recover {
        /// Job execution id
        execution_id: i64,
    },

    /// Insert sample pending customers for local runs
    Seed {
        /// Number of valid customers to insert
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Also insert records that exercise filtering and status rules
        #[arg(long)]
        with_edge_cases: bool,
    },
}
