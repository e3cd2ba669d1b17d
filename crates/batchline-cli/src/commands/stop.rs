//! `batchline stop` - request a graceful stop at the next chunk boundary

use anyhow::Result;

use super::{connect, operator};

pub async fn run(database_url: Option<&str>, execution_id: i64) -> Result<()> {
    let (config, store) = connect(database_url).await?;
    operator(&config, store).stop(execution_id).await?;

    println!(
        "Stop requested for execution {}; it will halt at the next chunk boundary.",
        execution_id
    );
    Ok(())
}
