// eldag-core/src/domain/config/job.rs
//
// Job Config Merger: `el_dags` entries laid over the BaseConfig.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::domain::config::base::{BaseConfig, SettingsPatch, check_database_name};
use crate::domain::config::settings::{JobEntry, NamedEntries, OpaqueMap, OperatorConfigSpec};
use crate::domain::error::DomainError;

/// How a table is (re)loaded on a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStrategy {
    FullRefresh,
    Incremental,
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStrategy::FullRefresh => f.write_str("full-refresh"),
            LoadStrategy::Incremental => f.write_str("incremental"),
        }
    }
}

/// Extract/load implementations the orchestrator knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElOperator {
    Mailchimp,
    Ga,
    Mysql,
    Postgres,
    Fx,
    S3,
    Gsheets,
    Oracle,
    Facebook,
    Mongodb,
    Googlemaps,
    Bigquery,
}

impl ElOperator {
    pub const ALL: [ElOperator; 12] = [
        ElOperator::Mailchimp,
        ElOperator::Ga,
        ElOperator::Mysql,
        ElOperator::Postgres,
        ElOperator::Fx,
        ElOperator::S3,
        ElOperator::Gsheets,
        ElOperator::Oracle,
        ElOperator::Facebook,
        ElOperator::Mongodb,
        ElOperator::Googlemaps,
        ElOperator::Bigquery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElOperator::Mailchimp => "mailchimp",
            ElOperator::Ga => "ga",
            ElOperator::Mysql => "mysql",
            ElOperator::Postgres => "postgres",
            ElOperator::Fx => "fx",
            ElOperator::S3 => "s3",
            ElOperator::Gsheets => "gsheets",
            ElOperator::Oracle => "oracle",
            ElOperator::Facebook => "facebook",
            ElOperator::Mongodb => "mongodb",
            ElOperator::Googlemaps => "googlemaps",
            ElOperator::Bigquery => "bigquery",
        }
    }

    /// Mailchimp's API only offers complete resource listings.
    pub fn supports(&self, strategy: LoadStrategy) -> bool {
        !matches!(
            (self, strategy),
            (ElOperator::Mailchimp, LoadStrategy::Incremental)
        )
    }
}

impl fmt::Display for ElOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|op| op.as_str() == wanted)
            .copied()
            .ok_or_else(|| {
                let accepted: Vec<&str> = Self::ALL.iter().map(|op| op.as_str()).collect();
                format!(
                    "unknown operator '{}' (accepted: {})",
                    s,
                    accepted.join(", ")
                )
            })
    }
}

/// Operator-specific parameters, passed opaquely to the operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperatorConfig {
    pub general_config: OpaqueMap,
    /// Table name -> table overrides (possibly empty).
    pub tables: BTreeMap<String, OpaqueMap>,
}

impl OperatorConfig {
    fn to_spec(&self) -> OperatorConfigSpec {
        OperatorConfigSpec {
            general_config: Some(self.general_config.clone()),
            tables: Some(
                self.tables
                    .iter()
                    .map(|(name, conf)| (name.clone(), Some(conf.clone())))
                    .collect(),
            ),
        }
    }
}

/// A fully merged `el_dags` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDescriptor {
    pub name: String,
    pub incremental: bool,
    pub el_operator: ElOperator,
    pub target_schema_name: String,
    pub operator_config: OperatorConfig,
    /// Base config with the job's own fields applied.
    pub config: BaseConfig,
}

impl JobDescriptor {
    pub fn strategy(&self) -> LoadStrategy {
        if self.incremental {
            LoadStrategy::Incremental
        } else {
            LoadStrategy::FullRefresh
        }
    }

    /// Document form with every merged field spelled out.
    pub fn to_entry(&self) -> JobEntry {
        JobEntry {
            incremental: Some(self.incremental),
            el_operator: Some(self.el_operator.to_string()),
            target_schema_name: Some(self.target_schema_name.clone()),
            operator_config: Some(self.operator_config.to_spec()),
            settings: self.config.to_settings(),
            unused: OpaqueMap::new(),
        }
    }
}

// =============================================================================
//  MERGE
// =============================================================================

/// Merges every entry over `base`. The first invalid entry aborts the whole set.
pub fn merge_jobs(
    base: &BaseConfig,
    entries: &NamedEntries<JobEntry>,
) -> Result<Vec<JobDescriptor>, DomainError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(entries.len());
    for (name, _) in entries.iter() {
        if !seen.insert(name.as_str()) {
            return Err(DomainError::schema(
                format!("el_dags.{}", name),
                "job name is declared more than once",
            ));
        }
    }

    entries
        .iter()
        .map(|(name, entry)| merge_job(base, name, entry))
        .collect()
}

pub fn merge_job(
    base: &BaseConfig,
    name: &str,
    entry: &JobEntry,
) -> Result<JobDescriptor, DomainError> {
    let prefix = format!("el_dags.{}", name);
    let at = |field: &str| format!("{}.{}", prefix, field);

    if name.trim().is_empty() {
        return Err(DomainError::schema(prefix.as_str(), "job name must not be empty"));
    }

    if !entry.unused.is_empty() {
        let keys: Vec<&String> = entry.unused.keys().collect();
        warn!(job = %name, ?keys, "Unused configuration keys");
    }

    let el_operator = entry
        .el_operator
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| DomainError::schema(at("el_operator"), "required field is missing"))?;
    let el_operator =
        ElOperator::from_str(el_operator).map_err(|e| DomainError::schema(at("el_operator"), e))?;

    let target_schema_name = entry
        .target_schema_name
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| DomainError::schema(at("target_schema_name"), "required field is missing"))?
        .to_string();

    let operator_config = build_operator_config(entry.operator_config.as_ref(), &prefix)?;

    let patch = SettingsPatch::parse(&entry.settings, &prefix)?;
    let descriptor = JobDescriptor {
        name: name.to_string(),
        incremental: entry.incremental.unwrap_or(false),
        el_operator,
        target_schema_name,
        operator_config,
        config: base.overlay(patch),
    };

    check_invariants(&descriptor, &prefix)?;
    debug!(
        job = %descriptor.name,
        operator = %descriptor.el_operator,
        tables = descriptor.operator_config.tables.len(),
        "Job merged"
    );
    Ok(descriptor)
}

fn build_operator_config(
    spec: Option<&OperatorConfigSpec>,
    prefix: &str,
) -> Result<OperatorConfig, DomainError> {
    let tables_path = format!("{}.operator_config.tables", prefix);
    let spec = spec.ok_or_else(|| {
        DomainError::schema(
            format!("{}.operator_config", prefix),
            "required field is missing",
        )
    })?;

    let tables: BTreeMap<String, OpaqueMap> = spec
        .tables
        .as_ref()
        .map(|tables| {
            tables
                .iter()
                .map(|(name, conf)| (name.clone(), conf.clone().unwrap_or_default()))
                .collect()
        })
        .unwrap_or_default();

    if tables.is_empty() {
        return Err(DomainError::schema(
            tables_path,
            "a job must declare at least one table",
        ));
    }
    if let Some(blank) = tables.keys().find(|t| t.trim().is_empty()) {
        return Err(DomainError::schema(
            tables_path,
            format!("table name '{}' is blank", blank),
        ));
    }

    Ok(OperatorConfig {
        general_config: spec.general_config.clone().unwrap_or_default(),
        tables,
    })
}

fn check_invariants(job: &JobDescriptor, prefix: &str) -> Result<(), DomainError> {
    let at = |field: &str| format!("{}.{}", prefix, field);
    let schedule = &job.config.schedule;

    for (field, value) in [
        ("schedule_interval", schedule.schedule_interval),
        ("schedule_interval_backfill", schedule.backfill),
        ("schedule_interval_future", schedule.future),
        ("schedule_interval_full_refresh", schedule.full_refresh),
        ("schedule_interval_incremental", schedule.incremental),
    ] {
        if value.is_some_and(|i| i.is_zero()) {
            return Err(DomainError::schema(at(field), "schedule interval must be positive"));
        }
    }

    if let (Some(backfill), Some(standard)) = (schedule.backfill, schedule.schedule_interval)
        && backfill < standard
    {
        return Err(DomainError::schema(
            at("schedule_interval_backfill"),
            format!(
                "backfill interval ({}) must not be shorter than schedule_interval ({})",
                backfill, standard
            ),
        ));
    }

    if let Some(end) = job.config.end_date
        && end <= job.config.start_date
    {
        return Err(DomainError::schema(at("end_date"), "end_date must be after start_date"));
    }

    check_database_name(&job.config, &at("target_database_name"))?;

    if job.incremental {
        if !job.el_operator.supports(LoadStrategy::Incremental) {
            return Err(DomainError::schema(
                at("incremental"),
                format!("operator '{}' only supports full refresh loads", job.el_operator),
            ));
        }

        let incremental = schedule
            .incremental
            .or(schedule.schedule_interval)
            .ok_or_else(|| {
                DomainError::schema(
                    at("schedule_interval_incremental"),
                    "incremental jobs need schedule_interval_incremental or schedule_interval",
                )
            })?;

        // The periodic full refresh runs on full_refresh, else schedule_interval.
        if let Some(full_refresh) = schedule.full_refresh.or(schedule.schedule_interval)
            && incremental >= full_refresh
        {
            return Err(DomainError::schema(
                at("schedule_interval_incremental"),
                format!(
                    "incremental interval ({}) must be shorter than the full refresh interval ({})",
                    incremental, full_refresh
                ),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::config::settings::{DagDocument, DagSettings};
    use crate::domain::interval::Interval;

    const DOC: &str = r#"
base_config:
  dwh_engine: postgres
  dwh_conn_id: dwh
  airflow_conn_id: airflow
  start_date: 2020-01-01T00:00:00+00:00
  schedule_interval: {days: 1}
  schedule_interval_backfill: {days: 7}
  additional_task_args:
    retries: 1
el_dags:
  EL_Mailchimp:
    incremental: false
    el_operator: mailchimp
    target_schema_name: raw_mailchimp
    operator_config:
      general_config:
        source_conn_id: mailchimp
      tables:
        lists:
        campaigns:
          resource: campaigns
  EL_GA:
    incremental: true
    el_operator: ga
    target_schema_name: raw_ga
    schedule_interval_incremental: {hours: 1}
    schedule_interval_full_refresh: {days: 1}
    additional_task_args:
      retries: 5
    operator_config:
      tables:
        sessions:
          dimensions: [date]
          metrics: [sessions]
"#;

    fn load(yaml: &str) -> Result<Vec<JobDescriptor>, DomainError> {
        let doc: DagDocument = serde_yaml::from_str(yaml).unwrap();
        let base = BaseConfig::load(&doc.base_config)?;
        merge_jobs(&base, &doc.el_dags)
    }

    fn expect_schema_path(result: Result<Vec<JobDescriptor>, DomainError>, expected: &str) {
        match result {
            Err(DomainError::SchemaError { path, .. }) => assert_eq!(path, expected),
            other => panic!("Expected SchemaError at {}, got {:?}", expected, other),
        }
    }

    #[test]
    fn test_merge_inherits_and_overrides() {
        let jobs = load(DOC).unwrap();
        assert_eq!(jobs.len(), 2);

        let mailchimp = &jobs[0];
        assert_eq!(mailchimp.name, "EL_Mailchimp");
        assert_eq!(mailchimp.el_operator, ElOperator::Mailchimp);
        assert_eq!(mailchimp.config.dwh_conn_id, "dwh");
        assert_eq!(mailchimp.config.additional_task_args.retries, 1);
        assert!(mailchimp.operator_config.tables["lists"].is_empty());
        assert_eq!(mailchimp.operator_config.tables.len(), 2);

        let ga = &jobs[1];
        assert!(ga.incremental);
        assert_eq!(ga.config.schedule.incremental, Some(Interval::from_hours(1)));
        assert_eq!(ga.config.schedule.schedule_interval, Some(Interval::from_days(1)));
        assert_eq!(ga.config.additional_task_args.retries, 5);
        assert!(ga.operator_config.general_config.is_empty());
    }

    #[test]
    fn test_duplicate_names_fail() {
        let yaml = format!(
            "{}\n  EL_GA:\n    el_operator: ga\n    target_schema_name: x\n    operator_config:\n      tables:\n        t:\n",
            DOC.trim_end()
        );
        expect_schema_path(load(&yaml), "el_dags.EL_GA");
    }

    #[test]
    fn test_empty_tables_fail() {
        let yaml = DOC.replace(
            "      tables:\n        sessions:\n          dimensions: [date]\n          metrics: [sessions]\n",
            "      tables: {}\n",
        );
        expect_schema_path(load(&yaml), "el_dags.EL_GA.operator_config.tables");
    }

    #[test]
    fn test_missing_operator_and_schema_fail() {
        let yaml = DOC.replace("    el_operator: mailchimp\n", "");
        expect_schema_path(load(&yaml), "el_dags.EL_Mailchimp.el_operator");

        let yaml = DOC.replace("    target_schema_name: raw_ga\n", "");
        expect_schema_path(load(&yaml), "el_dags.EL_GA.target_schema_name");

        let yaml = DOC.replace("el_operator: ga", "el_operator: carrier_pigeon");
        expect_schema_path(load(&yaml), "el_dags.EL_GA.el_operator");
    }

    #[test]
    fn test_backfill_shorter_than_schedule_fails() {
        let yaml = DOC.replace(
            "    schedule_interval_incremental: {hours: 1}\n",
            "    schedule_interval_incremental: {hours: 1}\n    schedule_interval_backfill: {hours: 12}\n",
        );
        expect_schema_path(load(&yaml), "el_dags.EL_GA.schedule_interval_backfill");
    }

    #[test]
    fn test_incremental_must_be_shorter_than_full_refresh() {
        let yaml = DOC.replace("schedule_interval_incremental: {hours: 1}", "schedule_interval_incremental: {days: 2}");
        expect_schema_path(load(&yaml), "el_dags.EL_GA.schedule_interval_incremental");
    }

    #[test]
    fn test_incremental_without_own_intervals_collides_with_full_refresh() {
        // both DAGs would fall back to schedule_interval and run daily
        let yaml = DOC
            .replace("    schedule_interval_incremental: {hours: 1}\n", "")
            .replace("    schedule_interval_full_refresh: {days: 1}\n", "");
        expect_schema_path(load(&yaml), "el_dags.EL_GA.schedule_interval_incremental");

        // an incremental interval alone is compared against schedule_interval
        let yaml = DOC.replace("    schedule_interval_full_refresh: {days: 1}\n", "");
        assert!(load(&yaml).is_ok());
    }

    #[test]
    fn test_database_name_is_snowflake_only() {
        let yaml = DOC.replace(
            "    target_schema_name: raw_ga\n",
            "    target_schema_name: raw_ga\n    target_database_name: RAW\n",
        );
        expect_schema_path(load(&yaml), "el_dags.EL_GA.target_database_name");

        let yaml = DOC.replace(
            "    target_schema_name: raw_ga\n",
            "    target_schema_name: raw_ga\n    dwh_engine: snowflake\n    target_database_name: RAW\n",
        );
        let jobs = load(&yaml).unwrap();
        assert_eq!(jobs[1].config.target_database_name.as_deref(), Some("RAW"));
    }

    #[test]
    fn test_incremental_needs_a_resolvable_interval() {
        let yaml = DOC
            .replace("  schedule_interval: {days: 1}\n", "")
            .replace("  schedule_interval_backfill: {days: 7}\n", "")
            .replace("    schedule_interval_incremental: {hours: 1}\n", "");
        expect_schema_path(load(&yaml), "el_dags.EL_GA.schedule_interval_incremental");
    }

    #[test]
    fn test_full_refresh_only_operator_rejects_incremental() {
        let yaml = DOC.replace(
            "    incremental: false\n    el_operator: mailchimp",
            "    incremental: true\n    el_operator: mailchimp",
        );
        expect_schema_path(load(&yaml), "el_dags.EL_Mailchimp.incremental");
    }

    #[test]
    fn test_remerging_merged_output_is_idempotent() {
        let doc: DagDocument = serde_yaml::from_str(DOC).unwrap();
        let base = BaseConfig::load(&doc.base_config).unwrap();
        let jobs = merge_jobs(&base, &doc.el_dags).unwrap();

        for job in &jobs {
            // The merged descriptor, read back as a base config, re-merged with its own entry.
            let as_base = BaseConfig::load(&job.config.to_settings()).unwrap();
            let (_, entry) = doc.el_dags.iter().find(|(n, _)| n == &job.name).unwrap();
            let again = merge_job(&as_base, &job.name, entry).unwrap();
            assert_eq!(&again, job);

            // And the fully spelled-out entry merged over the original base.
            let spelled = merge_job(&base, &job.name, &job.to_entry()).unwrap();
            assert_eq!(&spelled, job);
        }
    }

    #[test]
    fn test_merge_is_independent_of_entry_order() {
        let doc: DagDocument = serde_yaml::from_str(DOC).unwrap();
        let base = BaseConfig::load(&doc.base_config).unwrap();
        let mut reversed = doc.el_dags.clone();
        reversed.0.reverse();

        let mut forward = merge_jobs(&base, &doc.el_dags).unwrap();
        let mut backward = merge_jobs(&base, &reversed).unwrap();
        forward.sort_by(|a, b| a.name.cmp(&b.name));
        backward.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_job_level_connection_override() {
        let base = BaseConfig::load(
            &serde_yaml::from_str::<DagSettings>(
                "dwh_engine: snowflake\ndwh_conn_id: a\nairflow_conn_id: b\nstart_date: 2021-06-01T00:00:00Z\n",
            )
            .unwrap(),
        )
        .unwrap();
        let entry: JobEntry = serde_yaml::from_str(
            "el_operator: mysql\ntarget_schema_name: shop\ndwh_conn_id: dwh_shop\ntarget_database_name: RAW\noperator_config:\n  tables:\n    orders:\n",
        )
        .unwrap();
        let job = merge_job(&base, "EL_Shop", &entry).unwrap();
        assert_eq!(job.config.dwh_conn_id, "dwh_shop");
        assert_eq!(job.config.airflow_conn_id, "b");
        assert_eq!(job.config.target_database_name.as_deref(), Some("RAW"));
    }
}
