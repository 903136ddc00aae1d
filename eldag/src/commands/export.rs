// eldag/src/commands/export.rs
//
// USE CASE: Write the resolved document, every merged field explicit.

use eldag_core::application::{render_export, write_export};
use std::path::PathBuf;

use super::load_registry;

pub fn execute(file: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let registry = load_registry(&file)?;

    match output {
        Some(path) => {
            write_export(&registry, &path)?;
            println!(
                "📝 Exported {} job(s) to {:?}",
                registry.jobs().len(),
                path
            );
        }
        None => print!("{}", render_export(&registry)?),
    }

    Ok(())
}
