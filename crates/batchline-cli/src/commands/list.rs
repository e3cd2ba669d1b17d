//! `batchline list` - recent executions, newest first

use anyhow::Result;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

use super::{connect, execution_row, operator};

pub async fn run(database_url: Option<&str>, limit: i64) -> Result<()> {
    let (config, store) = connect(database_url).await?;
    let executions = operator(&config, store).list_executions(limit).await?;

    if executions.is_empty() {
        println!("No executions recorded yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["id", "status", "exit", "started", "duration", "parameters"]);
    for execution in &executions {
        table.add_row(execution_row(execution));
    }
    println!("{}", table);
    Ok(())
}
