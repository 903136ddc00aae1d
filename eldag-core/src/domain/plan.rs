// eldag-core/src/domain/plan.rs
//
// Static DAG/task layout the orchestrator registers for a job.

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::domain::config::{ElOperator, JobDescriptor, LoadStrategy, OpaqueMap};
use crate::domain::error::DomainError;
use crate::domain::interval::Interval;
use crate::domain::schedule::{ScheduleMode, ScheduleResolver};

pub const FULL_REFRESH_SUFFIX: &str = "_Periodic_Full_Refresh";
pub const INCREMENTAL_SUFFIX: &str = "_Intraperiod_Incremental";
const TASK_PREFIX: &str = "extract_load_";

fn re_task_id_forbidden() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[^a-zA-Z0-9_]").unwrap_or_else(|_| Regex::new("$^").unwrap_or_else(|_| unreachable!()))
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DagPlan {
    pub dag_id: String,
    pub strategy: LoadStrategy,
    pub schedule_interval: Interval,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: Option<DateTime<FixedOffset>>,
    /// Users granted read access on the target schema once a run is loaded.
    pub read_right_users: Vec<String>,
    pub catchup: bool,
    pub max_active_runs: u32,
    pub dag_args: OpaqueMap,
    pub tasks: Vec<TaskPlan>,
}

/// One extract-load task: a table handed to the job's operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskPlan {
    pub task_id: String,
    pub table: String,
    pub operator: ElOperator,
    pub args: OpaqueMap,
}

pub struct DagPlanner;

impl DagPlanner {
    /// Full-refresh jobs get one DAG. Incremental jobs get a periodic full
    /// refresh DAG plus an intraperiod incremental DAG, with start dates aligned
    /// so that exactly one full-refresh run is due at `now`.
    pub fn plan(job: &JobDescriptor, now: DateTime<Utc>) -> Result<Vec<DagPlan>, DomainError> {
        if !job.incremental {
            let interval = ScheduleResolver::resolve(job, ScheduleMode::Standard)?;
            return Ok(vec![Self::dag(
                job,
                job.name.clone(),
                LoadStrategy::FullRefresh,
                interval,
                job.config.start_date,
            )]);
        }

        let full_refresh = ScheduleResolver::full_refresh(job)?;
        let incremental = ScheduleResolver::resolve(job, ScheduleMode::Standard)?;
        let (start_fr, start_inc) =
            align_start_dates(job.config.start_date, full_refresh, incremental, now).ok_or_else(
                || DomainError::DateOutOfRange {
                    job: job.name.clone(),
                },
            )?;

        Ok(vec![
            Self::dag(
                job,
                format!("{}{}", job.name, FULL_REFRESH_SUFFIX),
                LoadStrategy::FullRefresh,
                full_refresh,
                start_fr,
            ),
            Self::dag(
                job,
                format!("{}{}", job.name, INCREMENTAL_SUFFIX),
                LoadStrategy::Incremental,
                incremental,
                start_inc,
            ),
        ])
    }

    fn dag(
        job: &JobDescriptor,
        dag_id: String,
        strategy: LoadStrategy,
        schedule_interval: Interval,
        start_date: DateTime<FixedOffset>,
    ) -> DagPlan {
        DagPlan {
            dag_id,
            strategy,
            schedule_interval,
            start_date,
            end_date: job.config.end_date,
            read_right_users: job.config.read_right_users.clone(),
            catchup: true,
            max_active_runs: 1,
            dag_args: job.config.additional_dag_args.clone(),
            tasks: Self::tasks(job, strategy),
        }
    }

    /// Argument layering, later wins: task args, general config, table
    /// overrides, then the keys the planner owns.
    pub fn tasks(job: &JobDescriptor, strategy: LoadStrategy) -> Vec<TaskPlan> {
        let config = &job.config;
        job.operator_config
            .tables
            .iter()
            .map(|(table, overrides)| {
                let mut args = config.additional_task_args.to_args();
                args.extend(job.operator_config.general_config.clone());
                args.extend(overrides.clone());

                let target_table = overrides
                    .get("target_table_name")
                    .and_then(|v| v.as_str())
                    .unwrap_or(table)
                    .to_string();

                let owned: [(&str, serde_yaml::Value); 7] = [
                    ("extract_strategy", strategy.to_string().into()),
                    ("dwh_engine", config.dwh_engine.as_str().into()),
                    ("dwh_conn_id", config.dwh_conn_id.as_str().into()),
                    ("target_table_name", target_table.into()),
                    ("target_schema_name", job.target_schema_name.as_str().into()),
                    ("target_schema_suffix", config.target_schema_suffix.as_str().into()),
                    (
                        "target_database_name",
                        config
                            .target_database_name
                            .as_deref()
                            .map_or(serde_yaml::Value::Null, Into::into),
                    ),
                ];
                for (key, value) in owned {
                    args.insert(key.to_string(), value);
                }

                TaskPlan {
                    task_id: task_id(table),
                    table: table.clone(),
                    operator: job.el_operator,
                    args,
                }
            })
            .collect()
    }
}

pub fn task_id(table: &str) -> String {
    format!("{}{}", TASK_PREFIX, re_task_id_forbidden().replace_all(table, ""))
}

/// Returns `(full_refresh_start, incremental_start)`, or `None` when a start
/// date would leave chrono's calendar.
pub fn align_start_dates(
    start_date: DateTime<FixedOffset>,
    full_refresh: Interval,
    incremental: Interval,
    now: DateTime<Utc>,
) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let horizon = now
        .fixed_offset()
        .checked_add_signed(incremental.half().as_time_delta())?;
    if start_date > horizon {
        return Some((start_date, start_date));
    }

    let period = full_refresh.total_seconds().max(1);
    let elapsed = horizon.signed_duration_since(start_date).num_seconds();
    let periods = elapsed / period - 1;

    let offset = TimeDelta::try_seconds(periods.checked_mul(period)?)?;
    let start_fr = start_date.checked_add_signed(offset)?;
    let start_inc = start_fr.checked_add_signed(full_refresh.as_time_delta())?;
    Some((start_fr, start_inc))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::config::{BaseConfig, DagSettings, JobEntry, merge_job};
    use chrono::TimeZone;

    const BASE: &str = r#"
dwh_engine: snowflake
dwh_conn_id: dwh
airflow_conn_id: airflow
start_date: 2020-01-01T00:00:00+00:00
schedule_interval: {days: 1}
target_database_name: RAW
read_right_users: "analyst, bi_tool"
additional_task_args:
  retries: 2
  pool: el
additional_dag_args:
  tags: [el]
"#;

    fn job(entry_yaml: &str) -> JobDescriptor {
        let settings: DagSettings = serde_yaml::from_str(BASE).unwrap();
        let base = BaseConfig::load(&settings).unwrap();
        let entry: JobEntry = serde_yaml::from_str(entry_yaml).unwrap();
        merge_job(&base, "EL_Shop", &entry).unwrap()
    }

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_full_refresh_job_has_single_dag() {
        let j = job(
            "el_operator: mysql\ntarget_schema_name: shop\noperator_config:\n  tables:\n    orders:\n    order-items:\n      target_table_name: items\n",
        );
        let now = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let dags = DagPlanner::plan(&j, now).unwrap();

        assert_eq!(dags.len(), 1);
        let dag = &dags[0];
        assert_eq!(dag.dag_id, "EL_Shop");
        assert_eq!(dag.schedule_interval, Interval::from_days(1));
        assert_eq!(dag.start_date, ts("2020-01-01T00:00:00+00:00"));
        assert_eq!(dag.max_active_runs, 1);
        assert_eq!(dag.read_right_users, vec!["analyst", "bi_tool"]);
        assert!(dag.dag_args.contains_key("tags"));

        let ids: Vec<&str> = dag.tasks.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["extract_load_orderitems", "extract_load_orders"]);

        let items = &dag.tasks[0];
        assert_eq!(items.args["target_table_name"], serde_yaml::Value::from("items"));
        assert_eq!(items.args["extract_strategy"], serde_yaml::Value::from("full-refresh"));
        assert_eq!(items.args["dwh_engine"], serde_yaml::Value::from("snowflake"));
        assert_eq!(items.args["target_database_name"], serde_yaml::Value::from("RAW"));
        assert_eq!(items.args["target_schema_suffix"], serde_yaml::Value::from("_next"));
        assert_eq!(items.args["retries"], serde_yaml::Value::from(2));
        assert_eq!(items.args["pool"], serde_yaml::Value::from("el"));

        assert_eq!(dag.tasks[1].args["target_table_name"], serde_yaml::Value::from("orders"));
    }

    #[test]
    fn test_argument_layering_order() {
        let j = job(
            r#"
el_operator: ga
target_schema_name: raw_ga
operator_config:
  general_config:
    pool: ga_pool
    view_id: "1"
  tables:
    sessions:
      view_id: "2"
      target_schema_name: sneaky
"#,
        );
        let tasks = DagPlanner::tasks(&j, LoadStrategy::FullRefresh);
        let args = &tasks[0].args;
        assert_eq!(args["pool"], serde_yaml::Value::from("ga_pool"));
        assert_eq!(args["view_id"], serde_yaml::Value::from("2"));
        // planner-owned keys cannot be overridden by a table
        assert_eq!(args["target_schema_name"], serde_yaml::Value::from("raw_ga"));
    }

    #[test]
    fn test_incremental_job_gets_aligned_pair() {
        let j = job(
            "incremental: true\nel_operator: mysql\ntarget_schema_name: shop\nschedule_interval_incremental: {hours: 1}\noperator_config:\n  tables:\n    orders:\n",
        );
        let now = Utc.with_ymd_and_hms(2020, 1, 10, 12, 0, 0).unwrap();
        let dags = DagPlanner::plan(&j, now).unwrap();

        assert_eq!(dags.len(), 2);
        let (fr, inc) = (&dags[0], &dags[1]);
        assert_eq!(fr.dag_id, "EL_Shop_Periodic_Full_Refresh");
        assert_eq!(inc.dag_id, "EL_Shop_Intraperiod_Incremental");
        assert_eq!(fr.schedule_interval, Interval::from_days(1));
        assert_eq!(inc.schedule_interval, Interval::from_hours(1));

        // horizon = Jan 10 12:30 -> 9 whole days elapsed -> k = 8
        assert_eq!(fr.start_date, ts("2020-01-09T00:00:00+00:00"));
        assert_eq!(inc.start_date, ts("2020-01-10T00:00:00+00:00"));

        assert_eq!(
            fr.tasks[0].args["extract_strategy"],
            serde_yaml::Value::from("full-refresh")
        );
        assert_eq!(
            inc.tasks[0].args["extract_strategy"],
            serde_yaml::Value::from("incremental")
        );
    }

    #[test]
    fn test_future_start_date_is_kept_for_both_dags() {
        let start = ts("2030-01-01T00:00:00+00:00");
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let (fr, inc) =
            align_start_dates(start, Interval::from_days(1), Interval::from_hours(1), now).unwrap();
        assert_eq!(fr, start);
        assert_eq!(inc, start);
    }

    #[test]
    fn test_huge_full_refresh_interval_is_an_error_not_a_panic() {
        let j = job(
            "incremental: true\nel_operator: mysql\ntarget_schema_name: shop\nschedule_interval: 100000000\nschedule_interval_incremental: {hours: 1}\noperator_config:\n  tables:\n    orders:\n",
        );
        let now = Utc.with_ymd_and_hms(2020, 1, 10, 12, 0, 0).unwrap();
        assert_eq!(
            DagPlanner::plan(&j, now),
            Err(DomainError::DateOutOfRange {
                job: "EL_Shop".into()
            })
        );
    }

    #[test]
    fn test_task_id_strips_forbidden_characters() {
        assert_eq!(task_id("public.users"), "extract_load_publicusers");
        assert_eq!(task_id("Sheet 1 (copy)"), "extract_load_Sheet1copy");
        assert_eq!(task_id("already_ok_9"), "extract_load_already_ok_9");
    }
}
