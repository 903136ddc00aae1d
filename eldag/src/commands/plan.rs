// eldag/src/commands/plan.rs
//
// USE CASE: Preview the DAGs and tasks the orchestrator registers for a job.

use anyhow::Context;
use chrono::{DateTime, Utc};
use comfy_table::{Table, presets::UTF8_FULL};
use std::path::PathBuf;

use super::{is_json, load_registry};

pub fn execute(
    file: PathBuf,
    job: String,
    now: Option<String>,
    format: String,
) -> anyhow::Result<()> {
    let json = is_json(&format)?;
    let now = match now {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .with_context(|| format!("❌ --now '{}' is not an RFC 3339 timestamp", raw))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let registry = load_registry(&file)?;
    let plans = registry.plan(&job, now)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }

    for plan in &plans {
        println!(
            "\n🗺️  DAG '{}' [{}] every {} from {}",
            plan.dag_id,
            plan.strategy,
            plan.schedule_interval,
            plan.start_date.to_rfc3339()
        );
        if let Some(end) = plan.end_date {
            println!("   until {}", end.to_rfc3339());
        }
        if !plan.read_right_users.is_empty() {
            println!("   read rights: {}", plan.read_right_users.join(", "));
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Task", "Operator", "Target"]);
        for task in &plan.tasks {
            let target = task
                .args
                .get("target_table_name")
                .and_then(|v| v.as_str())
                .unwrap_or(task.table.as_str());
            table.add_row(vec![
                task.task_id.clone(),
                task.operator.to_string(),
                target.to_string(),
            ]);
        }
        println!("{table}");
    }

    Ok(())
}
