//! CLI command implementations

pub mod list;
pub mod recover;
pub mod run;
pub mod seed;
pub mod stats;
pub mod status;
pub mod stop;

use anyhow::Result;
use batchline_core::config::Config;
use batchline_core::meta::store::MetadataStore;
use batchline_core::meta::types::{JobExecution, StepExecution};
use batchline_core::operator::JobOperator;

/// Load configuration and connect, with the CLI flag overriding the
/// environment's database URL
pub(crate) async fn connect(database_url: Option<&str>) -> Result<(Config, MetadataStore)> {
    let mut config = Config::load()?;
    if let Some(url) = database_url {
        config.database.url = url.to_string();
    }
    let store =
        MetadataStore::connect(&config.database.url, config.database.max_connections).await?;
    Ok((config, store))
}

pub(crate) fn operator(config: &Config, store: MetadataStore) -> JobOperator {
    JobOperator::new(store, config.chunk_config())
}

/// One-line rendering of an execution for list and summary output
pub(crate) fn execution_row(execution: &JobExecution) -> Vec<String> {
    vec![
        execution.id.to_string(),
        execution.status.to_string(),
        execution.exit_code.clone().unwrap_or_default(),
        execution
            .start_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        execution
            .duration_secs()
            .map(|d| format!("{:.1}s", d))
            .unwrap_or_default(),
        execution.parameters.to_string(),
    ]
}

pub(crate) fn print_step_detail(steps: &[StepExecution]) {
    use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            "step", "status", "exit", "read", "written", "filtered", "skipped", "commits",
            "rollbacks",
        ]);

    for step in steps {
        table.add_row(vec![
            step.step_name.clone(),
            step.status.to_string(),
            step.exit_code.clone().unwrap_or_default(),
            step.read_count.to_string(),
            step.write_count.to_string(),
            step.filter_count.to_string(),
            step.skip_total().to_string(),
            step.commit_count.to_string(),
            step.rollback_count.to_string(),
        ]);
    }
    println!("{}", table);
}
