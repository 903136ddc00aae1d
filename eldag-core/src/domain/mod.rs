// eldag-core/src/domain/mod.rs

pub mod config;
pub mod error;
pub mod interval;
pub mod plan;
pub mod schedule;

// Re-exports pour les couches application / CLI
pub use error::DomainError;
pub use interval::Interval;
pub use plan::{DagPlan, DagPlanner, TaskPlan};
pub use schedule::{ScheduleMode, ScheduleResolver};
