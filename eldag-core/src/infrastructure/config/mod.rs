pub mod document;
pub mod folder;

pub use document::{YamlFileSource, find_document, load_document};
pub use folder::discover_documents;
