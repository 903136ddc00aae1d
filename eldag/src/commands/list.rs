// eldag/src/commands/list.rs
//
// USE CASE: Show the merged job set of a document.

use comfy_table::{Table, presets::UTF8_FULL};
use std::path::PathBuf;

use super::{is_json, load_registry};

pub fn execute(file: PathBuf, format: String) -> anyhow::Result<()> {
    let json = is_json(&format)?;
    let registry = load_registry(&file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(registry.jobs())?);
        return Ok(());
    }

    println!("📋 Jobs in {}", registry.origin());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Job",
        "Operator",
        "Strategy",
        "Target Schema",
        "Tables",
        "Start Date",
    ]);
    for job in registry.jobs() {
        table.add_row(vec![
            job.name.clone(),
            job.el_operator.to_string(),
            job.strategy().to_string(),
            job.target_schema_name.clone(),
            job.operator_config.tables.len().to_string(),
            job.config.start_date.to_rfc3339(),
        ]);
    }
    println!("{table}");

    Ok(())
}
