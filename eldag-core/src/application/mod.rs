// eldag-core/src/application/mod.rs

pub mod export;
pub mod registry;

// --- RE-EXPORTS (FACADE PATTERN) ---
// `use eldag_core::application::{DagRegistry, write_export};`

pub use export::{render_export, write_export};
pub use registry::DagRegistry;
