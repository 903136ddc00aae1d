// eldag-core/src/application/export.rs
//
// USE CASE: write the resolved document (every job fully spelled out) so that
// consumers without the merge logic can read it as-is.

use std::path::Path;
use tracing::info;

use crate::application::registry::DagRegistry;
use crate::error::EldagError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;

pub fn render_export(registry: &DagRegistry) -> Result<String, EldagError> {
    let header = format!(
        "# Resolved from {}. Every field is explicit; edit the source document instead.\n",
        registry.origin()
    );
    let body = serde_yaml::to_string(&registry.export()).map_err(InfrastructureError::YamlError)?;
    Ok(header + &body)
}

pub fn write_export(registry: &DagRegistry, output: &Path) -> Result<(), EldagError> {
    let content = render_export(registry)?;
    atomic_write(output, content)?;
    info!(path = ?output, jobs = registry.jobs().len(), "Resolved document written");
    Ok(())
}
