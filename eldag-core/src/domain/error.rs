// eldag-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::schedule::ScheduleMode;

#[derive(Error, Debug, Diagnostic, PartialEq)]
pub enum DomainError {
    /// A document field is missing, malformed or breaks an invariant.
    /// `path` is the dotted location, e.g. `el_dags.EL_Mailchimp.operator_config.tables`.
    #[error("Schema Error at '{path}': {reason}")]
    #[diagnostic(
        code(eldag::domain::schema),
        help("Fix the field in the DAG document; nothing was registered.")
    )]
    SchemaError { path: String, reason: String },

    #[error("No schedule interval resolvable for job '{job}' in {mode} mode")]
    #[diagnostic(
        code(eldag::domain::unresolved_schedule),
        help("Set 'schedule_interval' in base_config or on the job entry.")
    )]
    UnresolvedScheduleError { job: String, mode: ScheduleMode },

    #[error("Start dates of job '{job}' fall outside the representable calendar")]
    #[diagnostic(
        code(eldag::domain::date_out_of_range),
        help("Shorten schedule_interval_full_refresh or move start_date closer to today.")
    )]
    DateOutOfRange { job: String },

    #[error("Job '{0}' is not declared under el_dags")]
    #[diagnostic(code(eldag::domain::job_not_found))]
    JobNotFound(String),

    #[error("Unknown schedule mode '{0}'")]
    #[diagnostic(
        code(eldag::domain::unknown_mode),
        help("Accepted modes: standard, backfill, future.")
    )]
    UnknownMode(String),
}

impl DomainError {
    pub fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::SchemaError {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
