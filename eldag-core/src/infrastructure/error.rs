// eldag-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(eldag::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(eldag::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("YAML Parsing Error in '{path}': {source}")]
    #[diagnostic(
        code(eldag::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    DocumentSyntax {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("DAG document not found at '{0}'")]
    #[diagnostic(
        code(eldag::infra::config_missing),
        help("Pass a file with --file or a directory containing dags.yml.")
    )]
    ConfigNotFound(String),
}
