// eldag-core/src/domain/config/mod.rs

pub mod base;
pub mod job;
pub mod settings;

pub use base::{BaseConfig, DwhEngine, ScheduleIntervals, SettingsPatch, TaskArgs};
pub use job::{ElOperator, JobDescriptor, LoadStrategy, OperatorConfig, merge_job, merge_jobs};
pub use settings::{DagDocument, DagSettings, JobEntry, NamedEntries, OpaqueMap};
