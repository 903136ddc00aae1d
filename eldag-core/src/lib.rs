// eldag-core/src/lib.rs

// 1. Mandatory documentation for production code
#![allow(missing_docs)]

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- LAYERS ---

// 1. Ports (Interfaces / Traits)
// Where a DAG document comes from.
pub mod ports;

// 2. Domain
// Document schema, merge rules, schedule resolution, DAG planning.
// Depends on nothing else in the crate.
pub mod domain;

// 3. Infrastructure (Adapters)
// YAML files, DAG folders, environment overrides, atomic writes.
pub mod infrastructure;

// 4. Application (Use Cases)
// The registry consumed by the orchestrator, export.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use application::DagRegistry;
pub use domain::{Interval, ScheduleMode};
pub use error::EldagError;
