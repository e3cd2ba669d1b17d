//! `batchline run` - launch one execution of the customer job

use anyhow::{bail, Context, Result};
use batchline_core::meta::types::{BatchStatus, JobParameters};

use super::{connect, operator, print_step_detail};

pub async fn run(
    database_url: Option<&str>,
    chunk_size: Option<usize>,
    skip_limit: Option<i64>,
    retry_limit: Option<u32>,
    params: &[String],
    new_instance: bool,
) -> Result<()> {
    let (mut config, store) = connect(database_url).await?;
    if let Some(n) = chunk_size {
        config.batch.chunk_size = n;
    }
    if let Some(n) = skip_limit {
        config.batch.skip_limit = n;
    }
    if let Some(n) = retry_limit {
        config.batch.retry_limit = n;
    }
    config.validate()?;

    let mut parameters = JobParameters::new();
    for pair in params {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("invalid parameter '{}', expected KEY=VALUE", pair))?;
        parameters = parameters.insert(key, value);
    }
    if new_instance {
        parameters = parameters.with_run_token(chrono::Utc::now().timestamp_millis());
    }

    let op = operator(&config, store);
    let summary = op.launch(parameters).await?;

    println!(
        "Execution {} finished: {} ({})",
        summary.execution.id,
        summary.execution.status,
        summary.execution.exit_code.as_deref().unwrap_or("-"),
    );
    if let Some(description) = summary
        .execution
        .exit_description
        .as_deref()
        .filter(|d| !d.is_empty())
    {
        println!("  {}", description);
    }
    print_step_detail(&summary.steps);

    // A failed run should fail the invoking shell too.
    if summary.execution.status == BatchStatus::Failed {
        bail!("execution {} failed", summary.execution.id);
    }
    Ok(())
}
