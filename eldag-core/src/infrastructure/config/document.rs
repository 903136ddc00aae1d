// eldag-core/src/infrastructure/config/document.rs

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, instrument};

use crate::domain::config::DagDocument;
use crate::domain::error::DomainError;
use crate::error::EldagError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::DocumentSource;

pub const DOCUMENT_CANDIDATES: [&str; 2] = ["dags.yml", "dags.yaml"];

pub const ENV_DWH_CONN_ID: &str = "ELDAG_DWH_CONN_ID";
pub const ENV_AIRFLOW_CONN_ID: &str = "ELDAG_AIRFLOW_CONN_ID";

/// Tags of the YAML core schema; they only restate a plain type.
const CORE_TAGS: [&str; 7] = [
    "!!str", "!!int", "!!float", "!!bool", "!!null", "!!seq", "!!map",
];

fn re_key_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<indent> *)(?P<key>[A-Za-z0-9_][^:#]*?)\s*:(?:\s+(?P<value>.*))?$")
            .unwrap_or_else(|_| Regex::new("$^").unwrap_or_else(|_| unreachable!()))
    })
}

// --- LOADER ---

#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_document(path: &Path) -> Result<DagDocument, EldagError> {
    let content = fs::read_to_string(path).map_err(InfrastructureError::Io)?;
    reject_type_tags(&content)?;
    let mut document: DagDocument = serde_yaml::from_str(&content).map_err(|source| {
        InfrastructureError::DocumentSyntax {
            path: path.display().to_string(),
            source,
        }
    })?;
    info!(jobs = document.el_dags.len(), "DAG document parsed");

    // Layering: the container environment decides which connections are used.
    apply_env_overrides(&mut document);

    Ok(document)
}

pub fn parse_document(content: &str) -> Result<DagDocument, EldagError> {
    reject_type_tags(content)?;
    Ok(serde_yaml::from_str(content)?)
}

/// Documents are plain data. serde_yaml resolves `!!python/...` style tags
/// and drops them before deserialization, so they are caught on the text.
pub fn reject_type_tags(content: &str) -> Result<(), DomainError> {
    match find_type_tag(content) {
        Some((path, tag)) => Err(DomainError::schema(
            path,
            format!("YAML type tag '{}' is not supported; write the value as plain data", tag),
        )),
        None => Ok(()),
    }
}

/// First non-core tag written as a block mapping value, with its dotted path.
fn find_type_tag(content: &str) -> Option<(String, String)> {
    let mut parents: Vec<(usize, String)> = Vec::new();

    for line in content.lines() {
        let Some(caps) = re_key_line().captures(line) else {
            continue;
        };
        let indent = caps["indent"].len();
        let key = caps["key"].trim().to_string();
        while parents.last().is_some_and(|(i, _)| *i >= indent) {
            parents.pop();
        }

        let value = caps.name("value").map_or("", |m| m.as_str());
        if let Some(tag) = value.split_whitespace().next()
            && tag.starts_with('!')
            && !CORE_TAGS.contains(&tag)
        {
            let mut path: Vec<&str> = parents.iter().map(|(_, k)| k.as_str()).collect();
            path.push(&key);
            return Some((path.join("."), tag.to_string()));
        }
        parents.push((indent, key));
    }
    None
}

/// `path` may be the document itself or a directory holding `dags.yml`.
pub fn find_document(path: &Path) -> Result<PathBuf, InfrastructureError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if path.is_dir() {
        for filename in DOCUMENT_CANDIDATES {
            let p = path.join(filename);
            if p.exists() {
                return Ok(p);
            }
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "{} (checked: {:?})",
        path.display(),
        DOCUMENT_CANDIDATES
    )))
}

fn apply_env_overrides(document: &mut DagDocument) {
    let base = &mut document.base_config;
    if let Ok(val) = std::env::var(ENV_DWH_CONN_ID) {
        info!(old = ?base.dwh_conn_id, new = %val, "Overriding dwh_conn_id via ENV");
        base.dwh_conn_id = Some(val);
    }
    if let Ok(val) = std::env::var(ENV_AIRFLOW_CONN_ID) {
        info!(old = ?base.airflow_conn_id, new = %val, "Overriding airflow_conn_id via ENV");
        base.airflow_conn_id = Some(val);
    }
}

// --- ADAPTER ---

/// A single YAML document on disk.
pub struct YamlFileSource {
    path: PathBuf,
}

impl YamlFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolves a directory to its `dags.yml` / `dags.yaml`.
    pub fn discover(path: &Path) -> Result<Self, InfrastructureError> {
        Ok(Self::new(find_document(path)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentSource for YamlFileSource {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<DagDocument, EldagError> {
        load_document(&self.path)
    }
}
