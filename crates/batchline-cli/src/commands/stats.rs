//! `batchline stats` - aggregate counts across the job's history

use anyhow::Result;

use super::{connect, operator};

pub async fn run(database_url: Option<&str>) -> Result<()> {
    let (config, store) = connect(database_url).await?;
    let op = operator(&config, store);
    let stats = op.stats().await?;

    println!("Job: {}", op.job_name());
    println!("  completed:     {}", stats.completed);
    println!("  failed:        {}", stats.failed);
    println!("  active:        {}", stats.active);
    println!("  total written: {}", stats.total_written);
    Ok(())
}
