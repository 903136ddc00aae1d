// eldag-core/src/infrastructure/mod.rs

pub mod config;
pub mod error;
pub mod fs;

pub use config::{YamlFileSource, discover_documents, find_document, load_document};
