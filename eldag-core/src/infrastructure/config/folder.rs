// eldag-core/src/infrastructure/config/folder.rs
//
// A DAGs folder holds several independent documents (one per source family).

use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::infrastructure::config::document::YamlFileSource;
use crate::infrastructure::error::InfrastructureError;

const SUPPORTED_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Every YAML document under `folder`, sorted by path. Hidden entries are skipped.
pub fn discover_documents(folder: &Path) -> Result<Vec<YamlFileSource>, InfrastructureError> {
    if !folder.is_dir() {
        return Err(InfrastructureError::ConfigNotFound(
            folder.display().to_string(),
        ));
    }

    let mut found = Vec::new();
    let walker = WalkDir::new(folder)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = entry.map_err(|e| {
            InfrastructureError::Io(std::io::Error::other(e.to_string()))
        })?;
        let path = entry.path();
        if path.is_file()
            && let Some(ext) = path.extension().and_then(|s| s.to_str())
            && SUPPORTED_EXTENSIONS.contains(&ext)
        {
            debug!(path = ?path, "DAG document found");
            found.push(YamlFileSource::new(path));
        }
    }

    Ok(found)
}
