// eldag-core/src/domain/config/settings.rs
//
// Serde surface of a DAG document. Everything here is "as written": optional,
// untyped where the document allows several shapes. Validation happens in
// base.rs (loader) and job.rs (merger).

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use crate::domain::interval::IntervalSpec;

pub type OpaqueMap = BTreeMap<String, serde_yaml::Value>;

/// Top-level document: `base_config` + `el_dags`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DagDocument {
    #[serde(default)]
    pub base_config: DagSettings,

    #[serde(default)]
    pub el_dags: NamedEntries<JobEntry>,
}

/// Fields shared by `base_config` and every `el_dags` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DagSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dwh_engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dwh_conn_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airflow_conn_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_interval: Option<IntervalSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_interval_backfill: Option<IntervalSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_interval_future: Option<IntervalSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_interval_full_refresh: Option<IntervalSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_interval_incremental: Option<IntervalSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_schema_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_database_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_right_users: Option<UserList>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_task_args: Option<TaskArgsSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_dag_args: Option<OpaqueMap>,
}

/// `"a, b"` or `[a, b]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserList {
    Csv(String),
    List(Vec<String>),
}

impl UserList {
    pub fn to_vec(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            UserList::Csv(s) => s.split(',').collect(),
            UserList::List(items) => items.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskArgsSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<IntervalSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_on_retry: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_on_failure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<UserList>,

    /// Anything else is handed to the operator untouched.
    #[serde(flatten)]
    pub passthrough: OpaqueMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorConfigSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_config: Option<OpaqueMap>,

    /// A table may be declared with no body (`users:`), hence the inner Option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<BTreeMap<String, Option<OpaqueMap>>>,
}

/// One `el_dags` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub el_operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_config: Option<OperatorConfigSpec>,

    #[serde(flatten)]
    pub settings: DagSettings,

    /// Keys nobody consumes; reported as unused configuration.
    #[serde(flatten)]
    pub unused: OpaqueMap,
}

// =============================================================================
//  ORDERED MAP KEEPING DUPLICATES
// =============================================================================

/// A YAML mapping read as an ordered list of `(key, value)` pairs.
///
/// Duplicate keys are preserved so that the merger can reject them with a
/// proper `SchemaError` instead of silently keeping the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedEntries<T>(pub Vec<(String, T)>);

impl<T> Default for NamedEntries<T> {
    fn default() -> Self {
        NamedEntries(Vec::new())
    }
}

impl<T> NamedEntries<T> {
    pub fn iter(&self) -> impl Iterator<Item = &(String, T)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, name: impl Into<String>, value: T) {
        self.0.push((name.into(), value));
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for NamedEntries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = NamedEntries<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of job names to job entries")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(NamedEntries::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    entries.push((key, value));
                }
                Ok(NamedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

impl<T: Serialize> Serialize for NamedEntries<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
