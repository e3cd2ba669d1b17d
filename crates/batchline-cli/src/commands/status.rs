//! `batchline status` - one execution with its step detail

use anyhow::Result;

use super::{connect, operator, print_step_detail};

pub async fn run(database_url: Option<&str>, execution_id: i64) -> Result<()> {
    let (config, store) = connect(database_url).await?;
    let summary = operator(&config, store).status(execution_id).await?;

    let execution = &summary.execution;
    println!("Execution {} ({})", execution.id, execution.job_name);
    println!("  status:     {}", execution.status);
    println!(
        "  exit:       {} {}",
        execution.exit_code.as_deref().unwrap_or("-"),
        execution.exit_description.as_deref().unwrap_or(""),
    );
    println!("  parameters: {}", execution.parameters);
    if let Some(start) = execution.start_time {
        println!("  started:    {}", start.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(duration) = execution.duration_secs() {
        println!("  duration:   {:.1}s", duration);
    }
    print_step_detail(&summary.steps);
    Ok(())
}
