// eldag-core/src/domain/config/base.rs
//
// Base Config Loader: `base_config` -> BaseConfig.
// The same typed parsing is reused for job entries (see `SettingsPatch`).

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};
use validator::ValidateEmail;

use crate::domain::config::settings::{DagSettings, OpaqueMap, TaskArgsSpec, UserList};
use crate::domain::error::DomainError;
use crate::domain::interval::{Interval, IntervalSpec};

pub const DEFAULT_TARGET_SCHEMA_SUFFIX: &str = "_next";

/// Target warehouse engine.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DwhEngine {
    Postgres,
    Snowflake,
    BigQuery,
}

impl DwhEngine {
    pub const ACCEPTED: [&'static str; 3] = ["postgres", "snowflake", "bigquery"];

    pub fn as_str(&self) -> &'static str {
        match self {
            DwhEngine::Postgres => "postgres",
            DwhEngine::Snowflake => "snowflake",
            DwhEngine::BigQuery => "bigquery",
        }
    }
}

impl fmt::Display for DwhEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DwhEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DwhEngine::Postgres),
            "snowflake" => Ok(DwhEngine::Snowflake),
            "bigquery" => Ok(DwhEngine::BigQuery),
            other => Err(format!(
                "unknown warehouse engine '{}' (accepted: {})",
                other,
                Self::ACCEPTED.join(", ")
            )),
        }
    }
}

/// The five optional schedule intervals. Absence means "not configured for this mode".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScheduleIntervals {
    pub schedule_interval: Option<Interval>,
    pub backfill: Option<Interval>,
    pub future: Option<Interval>,
    pub full_refresh: Option<Interval>,
    pub incremental: Option<Interval>,
}

/// Default task policy handed to every task of a DAG.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskArgs {
    pub retries: u32,
    pub retry_delay: Option<Interval>,
    pub email_on_retry: bool,
    pub email_on_failure: bool,
    pub email: Vec<String>,
    pub passthrough: OpaqueMap,
}

impl TaskArgs {
    /// Flattens the policy into operator keyword arguments.
    pub fn to_args(&self) -> OpaqueMap {
        let mut args = self.passthrough.clone();
        args.insert("retries".into(), self.retries.into());
        if let Some(delay) = self.retry_delay {
            args.insert("retry_delay".into(), delay.total_seconds().into());
        }
        args.insert("email_on_retry".into(), self.email_on_retry.into());
        args.insert("email_on_failure".into(), self.email_on_failure.into());
        if !self.email.is_empty() {
            args.insert(
                "email".into(),
                serde_yaml::Value::Sequence(self.email.iter().map(|e| e.as_str().into()).collect()),
            );
        }
        args
    }

    fn to_spec(&self) -> TaskArgsSpec {
        TaskArgsSpec {
            retries: Some(i64::from(self.retries)),
            retry_delay: self.retry_delay.map(IntervalSpec::from),
            email_on_retry: Some(self.email_on_retry),
            email_on_failure: Some(self.email_on_failure),
            email: (!self.email.is_empty()).then(|| UserList::List(self.email.clone())),
            passthrough: self.passthrough.clone(),
        }
    }
}

/// Process-wide defaults for every job of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseConfig {
    pub dwh_engine: DwhEngine,
    pub dwh_conn_id: String,
    pub airflow_conn_id: String,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: Option<DateTime<FixedOffset>>,
    pub schedule: ScheduleIntervals,
    pub target_schema_suffix: String,
    pub target_database_name: Option<String>,
    pub read_right_users: Vec<String>,
    pub additional_task_args: TaskArgs,
    pub additional_dag_args: OpaqueMap,
}

impl BaseConfig {
    /// Parses `base_config`. Required: `dwh_engine`, `dwh_conn_id`,
    /// `airflow_conn_id`, `start_date`.
    #[instrument(skip(settings))]
    pub fn load(settings: &DagSettings) -> Result<BaseConfig, DomainError> {
        let patch = SettingsPatch::parse(settings, "base_config")?;

        let config = BaseConfig {
            dwh_engine: required(patch.dwh_engine, "base_config.dwh_engine")?,
            dwh_conn_id: required(patch.dwh_conn_id, "base_config.dwh_conn_id")?,
            airflow_conn_id: required(patch.airflow_conn_id, "base_config.airflow_conn_id")?,
            start_date: required(patch.start_date, "base_config.start_date")?,
            end_date: patch.end_date,
            schedule: ScheduleIntervals {
                schedule_interval: patch.schedule_interval,
                backfill: patch.schedule_interval_backfill,
                future: patch.schedule_interval_future,
                full_refresh: patch.schedule_interval_full_refresh,
                incremental: patch.schedule_interval_incremental,
            },
            target_schema_suffix: patch
                .target_schema_suffix
                .unwrap_or_else(|| DEFAULT_TARGET_SCHEMA_SUFFIX.to_string()),
            target_database_name: patch.target_database_name,
            read_right_users: patch.read_right_users.unwrap_or_default(),
            additional_task_args: patch.additional_task_args.unwrap_or_default(),
            additional_dag_args: patch.additional_dag_args.unwrap_or_default(),
        };

        check_database_name(&config, "base_config.target_database_name")?;

        debug!(engine = %config.dwh_engine, start = %config.start_date, "Base config loaded");
        Ok(config)
    }

    /// Every field present in `patch` wins; everything else is inherited.
    pub fn overlay(&self, patch: SettingsPatch) -> BaseConfig {
        let base = &self.schedule;
        BaseConfig {
            dwh_engine: patch.dwh_engine.unwrap_or(self.dwh_engine),
            dwh_conn_id: patch.dwh_conn_id.unwrap_or_else(|| self.dwh_conn_id.clone()),
            airflow_conn_id: patch
                .airflow_conn_id
                .unwrap_or_else(|| self.airflow_conn_id.clone()),
            start_date: patch.start_date.unwrap_or(self.start_date),
            end_date: patch.end_date.or(self.end_date),
            schedule: ScheduleIntervals {
                schedule_interval: patch.schedule_interval.or(base.schedule_interval),
                backfill: patch.schedule_interval_backfill.or(base.backfill),
                future: patch.schedule_interval_future.or(base.future),
                full_refresh: patch.schedule_interval_full_refresh.or(base.full_refresh),
                incremental: patch.schedule_interval_incremental.or(base.incremental),
            },
            target_schema_suffix: patch
                .target_schema_suffix
                .unwrap_or_else(|| self.target_schema_suffix.clone()),
            target_database_name: patch
                .target_database_name
                .or_else(|| self.target_database_name.clone()),
            read_right_users: patch
                .read_right_users
                .unwrap_or_else(|| self.read_right_users.clone()),
            additional_task_args: patch
                .additional_task_args
                .unwrap_or_else(|| self.additional_task_args.clone()),
            additional_dag_args: patch
                .additional_dag_args
                .unwrap_or_else(|| self.additional_dag_args.clone()),
        }
    }

    /// Writes the config back in document form, every field explicit.
    pub fn to_settings(&self) -> DagSettings {
        let s = &self.schedule;
        DagSettings {
            dwh_engine: Some(self.dwh_engine.to_string()),
            dwh_conn_id: Some(self.dwh_conn_id.clone()),
            airflow_conn_id: Some(self.airflow_conn_id.clone()),
            start_date: Some(self.start_date.to_rfc3339()),
            end_date: self.end_date.map(|d| d.to_rfc3339()),
            schedule_interval: s.schedule_interval.map(IntervalSpec::from),
            schedule_interval_backfill: s.backfill.map(IntervalSpec::from),
            schedule_interval_future: s.future.map(IntervalSpec::from),
            schedule_interval_full_refresh: s.full_refresh.map(IntervalSpec::from),
            schedule_interval_incremental: s.incremental.map(IntervalSpec::from),
            target_schema_suffix: Some(self.target_schema_suffix.clone()),
            target_database_name: self.target_database_name.clone(),
            read_right_users: Some(UserList::List(self.read_right_users.clone())),
            additional_task_args: Some(self.additional_task_args.to_spec()),
            additional_dag_args: Some(self.additional_dag_args.clone()),
        }
    }
}

/// `target_database_name` addresses a Snowflake database; other engines have
/// no such level.
pub fn check_database_name(config: &BaseConfig, path: &str) -> Result<(), DomainError> {
    if config.target_database_name.is_some() && config.dwh_engine != DwhEngine::Snowflake {
        return Err(DomainError::schema(
            path,
            format!(
                "target_database_name is only supported with dwh_engine snowflake, not {}",
                config.dwh_engine
            ),
        ));
    }
    Ok(())
}

// =============================================================================
//  TYPED PARTIAL SETTINGS
// =============================================================================

/// `DagSettings` after type checking, every field still optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub dwh_engine: Option<DwhEngine>,
    pub dwh_conn_id: Option<String>,
    pub airflow_conn_id: Option<String>,
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
    pub schedule_interval: Option<Interval>,
    pub schedule_interval_backfill: Option<Interval>,
    pub schedule_interval_future: Option<Interval>,
    pub schedule_interval_full_refresh: Option<Interval>,
    pub schedule_interval_incremental: Option<Interval>,
    pub target_schema_suffix: Option<String>,
    pub target_database_name: Option<String>,
    pub read_right_users: Option<Vec<String>>,
    pub additional_task_args: Option<TaskArgs>,
    pub additional_dag_args: Option<OpaqueMap>,
}

impl SettingsPatch {
    /// `prefix` is the document path of the mapping, used in error messages.
    pub fn parse(settings: &DagSettings, prefix: &str) -> Result<SettingsPatch, DomainError> {
        let at = |field: &str| format!("{}.{}", prefix, field);

        let dwh_engine = settings
            .dwh_engine
            .as_deref()
            .map(|raw| DwhEngine::from_str(raw).map_err(|e| DomainError::schema(at("dwh_engine"), e)))
            .transpose()?;

        let interval = |spec: &Option<IntervalSpec>, field: &str| {
            spec.as_ref().map(|s| s.to_interval(&at(field))).transpose()
        };

        Ok(SettingsPatch {
            dwh_engine,
            dwh_conn_id: non_empty(&settings.dwh_conn_id, &at("dwh_conn_id"))?,
            airflow_conn_id: non_empty(&settings.airflow_conn_id, &at("airflow_conn_id"))?,
            start_date: settings
                .start_date
                .as_deref()
                .map(|raw| parse_timestamp(raw, &at("start_date")))
                .transpose()?,
            end_date: settings
                .end_date
                .as_deref()
                .map(|raw| parse_timestamp(raw, &at("end_date")))
                .transpose()?,
            schedule_interval: interval(&settings.schedule_interval, "schedule_interval")?,
            schedule_interval_backfill: interval(
                &settings.schedule_interval_backfill,
                "schedule_interval_backfill",
            )?,
            schedule_interval_future: interval(
                &settings.schedule_interval_future,
                "schedule_interval_future",
            )?,
            schedule_interval_full_refresh: interval(
                &settings.schedule_interval_full_refresh,
                "schedule_interval_full_refresh",
            )?,
            schedule_interval_incremental: interval(
                &settings.schedule_interval_incremental,
                "schedule_interval_incremental",
            )?,
            target_schema_suffix: settings.target_schema_suffix.clone(),
            target_database_name: settings.target_database_name.clone(),
            read_right_users: settings.read_right_users.as_ref().map(UserList::to_vec),
            additional_task_args: settings
                .additional_task_args
                .as_ref()
                .map(|spec| parse_task_args(spec, &at("additional_task_args")))
                .transpose()?,
            additional_dag_args: settings.additional_dag_args.clone(),
        })
    }
}

fn required<T>(value: Option<T>, path: &str) -> Result<T, DomainError> {
    value.ok_or_else(|| DomainError::schema(path, "required field is missing"))
}

fn non_empty(value: &Option<String>, path: &str) -> Result<Option<String>, DomainError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(DomainError::schema(path, "must not be empty")),
        other => Ok(other.clone()),
    }
}

fn parse_task_args(spec: &TaskArgsSpec, prefix: &str) -> Result<TaskArgs, DomainError> {
    let retries = match spec.retries {
        None => 0,
        Some(n) => u32::try_from(n).map_err(|_| {
            DomainError::schema(
                format!("{}.retries", prefix),
                format!("must be a non-negative integer, got {}", n),
            )
        })?,
    };

    let email = spec.email.as_ref().map(UserList::to_vec).unwrap_or_default();
    if let Some(bad) = email.iter().find(|address| !address.validate_email()) {
        return Err(DomainError::schema(
            format!("{}.email", prefix),
            format!("'{}' is not a valid e-mail address", bad),
        ));
    }

    Ok(TaskArgs {
        retries,
        retry_delay: spec
            .retry_delay
            .as_ref()
            .map(|d| d.to_interval(&format!("{}.retry_delay", prefix)))
            .transpose()?,
        email_on_retry: spec.email_on_retry.unwrap_or(false),
        email_on_failure: spec.email_on_failure.unwrap_or(false),
        email,
        passthrough: spec.passthrough.clone(),
    })
}

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
];

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// ISO-8601 with an explicit offset (`Z` counts). Naive values are rejected.
pub fn parse_timestamp(raw: &str, path: &str) -> Result<DateTime<FixedOffset>, DomainError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts);
    }
    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }

    let is_naive = NAIVE_FORMATS
        .iter()
        .any(|f| NaiveDateTime::parse_from_str(raw, f).is_ok())
        || NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok();

    if is_naive {
        Err(DomainError::schema(
            path,
            format!("'{}' must be timezone aware (add an offset such as +00:00)", raw),
        ))
    } else {
        Err(DomainError::schema(
            path,
            format!("'{}' is not an ISO-8601 timestamp", raw),
        ))
    }
}
