// eldag/src/commands/validate.rs
//
// USE CASE: Load a document (or a whole DAGs folder) and report the first
// schema problem with its location.

use eldag_core::{DagRegistry, EldagError};
use eldag_core::infrastructure::YamlFileSource;
use std::path::PathBuf;

pub fn execute(file: PathBuf, folder: bool) -> anyhow::Result<()> {
    let result = if folder {
        println!("🔎 Validating DAGs folder: {:?}", file);
        DagRegistry::load_folder(&file)
    } else {
        println!("🔎 Validating DAG document: {:?}", file);
        YamlFileSource::discover(&file)
            .map_err(EldagError::from)
            .and_then(|source| DagRegistry::load(&source))
            .map(|registry| vec![registry])
    };

    match result {
        Ok(registries) => {
            for registry in &registries {
                println!(
                    "✅ {} ({} job(s))",
                    registry.origin(),
                    registry.jobs().len()
                );
                for job in registry.jobs() {
                    println!(
                        "   ➜ {} [{} / {}] {} table(s)",
                        job.name,
                        job.el_operator,
                        job.strategy(),
                        job.operator_config.tables.len()
                    );
                }
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            eprintln!("❌ Validation failed: nothing was registered.");
            std::process::exit(1);
        }
    }
}
