// eldag-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum EldagError {
    // --- DOMAIN ERRORS (schema, schedule resolution) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (IO, parsing) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

// Manual implementation to avoid duplicate enum variant but keep ergonomics
impl From<std::io::Error> for EldagError {
    fn from(err: std::io::Error) -> Self {
        EldagError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<serde_yaml::Error> for EldagError {
    fn from(err: serde_yaml::Error) -> Self {
        EldagError::Infrastructure(InfrastructureError::YamlError(err))
    }
}
