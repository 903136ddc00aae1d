// eldag/src/commands/resolve.rs
//
// USE CASE: The orchestrator's question, "how often does this job run in this mode?"

use comfy_table::{Table, presets::UTF8_FULL};
use eldag_core::{Interval, ScheduleMode};
use serde_json::json;
use std::path::PathBuf;

use super::{is_json, load_registry};

pub fn execute(
    file: PathBuf,
    job: Option<String>,
    mode: String,
    format: String,
) -> anyhow::Result<()> {
    let json = is_json(&format)?;
    let mode: ScheduleMode = mode.parse()?;
    let registry = load_registry(&file)?;

    if let Some(name) = job {
        let interval = registry.resolve(&name, mode)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&entry(&name, mode, interval))?);
        } else {
            println!("⏱️  {} ({}): {}", name, mode, interval);
        }
        return Ok(());
    }

    let results = registry.resolve_all(mode);
    let failures = results.iter().filter(|(_, r)| r.is_err()).count();

    if json {
        let rows: Vec<_> = results
            .iter()
            .map(|(name, result)| match result {
                Ok(interval) => entry(name, mode, *interval),
                Err(e) => json!({ "job": name, "mode": mode, "error": e.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Job", "Mode", "Interval", "Seconds"]);
        for (name, result) in &results {
            match result {
                Ok(interval) => table.add_row(vec![
                    name.to_string(),
                    mode.to_string(),
                    interval.to_string(),
                    interval.total_seconds().to_string(),
                ]),
                Err(e) => table.add_row(vec![
                    name.to_string(),
                    mode.to_string(),
                    format!("❌ {}", e),
                    "-".to_string(),
                ]),
            };
        }
        println!("{table}");
    }

    if failures > 0 {
        anyhow::bail!("❌ {} job(s) have no resolvable {} interval", failures, mode);
    }
    Ok(())
}

fn entry(name: &str, mode: ScheduleMode, interval: Interval) -> serde_json::Value {
    json!({
        "job": name,
        "mode": mode,
        "interval": interval,
        "total_seconds": interval.total_seconds(),
    })
}
