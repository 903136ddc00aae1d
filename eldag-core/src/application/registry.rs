// eldag-core/src/application/registry.rs
//
// USE CASE: load -> merge, then answer the orchestrator's questions.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::domain::config::{BaseConfig, DagDocument, JobDescriptor, merge_jobs};
use crate::domain::error::DomainError;
use crate::domain::interval::Interval;
use crate::domain::plan::{DagPlan, DagPlanner};
use crate::domain::schedule::{ScheduleMode, ScheduleResolver};
use crate::error::EldagError;
use crate::infrastructure::config::discover_documents;
use crate::ports::DocumentSource;

/// The resolved job set of one document revision. Immutable once built; a new
/// revision means a new registry.
#[derive(Debug, Clone, PartialEq)]
pub struct DagRegistry {
    origin: String,
    base: BaseConfig,
    jobs: Vec<JobDescriptor>,
}

impl DagRegistry {
    /// All-or-nothing: the first schema problem rejects the whole document.
    #[instrument(skip(document))]
    pub fn from_document(origin: &str, document: &DagDocument) -> Result<Self, DomainError> {
        let base = BaseConfig::load(&document.base_config)?;
        let jobs = merge_jobs(&base, &document.el_dags)?;

        if jobs.is_empty() {
            warn!("Document declares no el_dags");
        }
        info!(jobs = jobs.len(), "DAG registry built");

        Ok(Self {
            origin: origin.to_string(),
            base,
            jobs,
        })
    }

    pub fn load(source: &dyn DocumentSource) -> Result<Self, EldagError> {
        let origin = source.origin();
        let document = source.load()?;
        Ok(Self::from_document(&origin, &document)?)
    }

    /// Loads every document of a DAGs folder. Job names must be unique across
    /// the folder since they become DAG ids.
    pub fn load_folder(folder: &Path) -> Result<Vec<Self>, EldagError> {
        let registries = discover_documents(folder)?
            .iter()
            .map(|source| Self::load(source))
            .collect::<Result<Vec<_>, _>>()?;

        let mut owners: HashMap<&str, &str> = HashMap::new();
        for registry in &registries {
            for job in &registry.jobs {
                if let Some(previous) = owners.insert(job.name.as_str(), registry.origin.as_str()) {
                    return Err(DomainError::schema(
                        format!("el_dags.{}", job.name),
                        format!(
                            "job name is declared in both '{}' and '{}'",
                            previous, registry.origin
                        ),
                    )
                    .into());
                }
            }
        }

        Ok(registries)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn base(&self) -> &BaseConfig {
        &self.base
    }

    /// Jobs in document order.
    pub fn jobs(&self) -> &[JobDescriptor] {
        &self.jobs
    }

    pub fn get(&self, job_name: &str) -> Result<&JobDescriptor, DomainError> {
        self.jobs
            .iter()
            .find(|job| job.name == job_name)
            .ok_or_else(|| DomainError::JobNotFound(job_name.to_string()))
    }

    pub fn resolve(&self, job_name: &str, mode: ScheduleMode) -> Result<Interval, DomainError> {
        ScheduleResolver::resolve(self.get(job_name)?, mode)
    }

    /// One result per job: an unresolvable job does not hide the others.
    pub fn resolve_all(&self, mode: ScheduleMode) -> Vec<(&str, Result<Interval, DomainError>)> {
        self.jobs
            .iter()
            .map(|job| (job.name.as_str(), ScheduleResolver::resolve(job, mode)))
            .collect()
    }

    pub fn plan(&self, job_name: &str, now: DateTime<Utc>) -> Result<Vec<DagPlan>, DomainError> {
        DagPlanner::plan(self.get(job_name)?, now)
    }

    /// Document form: the loaded base plus every job fully spelled out.
    /// Loading it again yields an identical registry.
    pub fn export(&self) -> DagDocument {
        let mut document = DagDocument {
            base_config: self.base.to_settings(),
            ..Default::default()
        };
        for job in &self.jobs {
            document.el_dags.push(job.name.clone(), job.to_entry());
        }
        document
    }
}
