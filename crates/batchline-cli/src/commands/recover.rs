//! `batchline recover` - fail an execution abandoned by a crashed process

use anyhow::Result;

use super::{connect, operator};

pub async fn run(database_url: Option<&str>, execution_id: i64) -> Result<()> {
    let (config, store) = connect(database_url).await?;
    let summary = operator(&config, store).recover(execution_id).await?;

    println!(
        "Execution {} recovered: {} ({})",
        summary.execution.id,
        summary.execution.status,
        summary.execution.exit_description.as_deref().unwrap_or("-"),
    );
    println!("Its job instance can be launched again.");
    Ok(())
}
