// eldag-core/src/ports/source.rs

use crate::domain::config::DagDocument;
use crate::error::EldagError;

/// Anything able to hand over one parsed (not yet validated) DAG document.
pub trait DocumentSource: Send + Sync {
    /// Human-readable origin used in logs, e.g. a file path.
    fn origin(&self) -> String;

    fn load(&self) -> Result<DagDocument, EldagError>;
}

/// A document already in memory. Handy for embedding and for tests.
pub struct InlineSource {
    pub name: String,
    pub document: DagDocument,
}

impl DocumentSource for InlineSource {
    fn origin(&self) -> String {
        self.name.clone()
    }

    fn load(&self) -> Result<DagDocument, EldagError> {
        Ok(self.document.clone())
    }
}
