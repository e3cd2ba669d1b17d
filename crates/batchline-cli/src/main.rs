//! Batchline CLI - Main entry point

use batchline_cli::{Cli, Commands};
use clap::Parser;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over the verbose flag.
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<()> {
    let database_url = cli.database_url.as_deref();

    match &cli.command {
        Commands::Run {
            chunk_size,
            skip_limit,
            retry_limit,
            params,
            new_instance,
        } => {
            batchline_cli::commands::run::run(
                database_url,
                *chunk_size,
                *skip_limit,
                *retry_limit,
                params,
                *new_instance,
            )
            .await
        }

        Commands::Status { execution_id } => {
            batchline_cli::commands::status::run(database_url, *execution_id).await
        }

        Commands::List { limit } => batchline_cli::commands::list::run(database_url, *limit).await,

        Commands::Stats => batchline_cli::commands::stats::run(database_url).await,

        Commands::Stop { execution_id } => {
            batchline_cli::commands::stop::run(database_url, *execution_id).await
        }

        Commands::Recover { execution_id } => {
            batchline_cli::commands::recover::run(database_url, *execution_id).await
        }

        Commands::Seed {
            count,
            with_edge_cases,
        } => batchline_cli::commands::seed::run(database_url, *count, *with_edge_cases).await,
    }
}
