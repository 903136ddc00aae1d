// eldag/src/commands/mod.rs

pub mod export;
pub mod list;
pub mod plan;
pub mod resolve;
pub mod validate;

use anyhow::Context;
use eldag_core::DagRegistry;
use eldag_core::infrastructure::YamlFileSource;
use std::path::Path;

/// Shared by every command that works on a single document.
pub(crate) fn load_registry(file: &Path) -> anyhow::Result<DagRegistry> {
    let source = YamlFileSource::discover(file)
        .with_context(|| format!("❌ No DAG document at '{}'", file.display()))?;
    let registry = DagRegistry::load(&source)?;
    Ok(registry)
}

pub(crate) fn is_json(format: &str) -> anyhow::Result<bool> {
    match format {
        "json" => Ok(true),
        "text" => Ok(false),
        other => anyhow::bail!("❌ Unknown format '{}' (expected: text, json)", other),
    }
}
