// eldag-core/src/domain/interval.rs

use chrono::TimeDelta;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::domain::error::DomainError;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// A non-negative recurrence or delay, kept as days + seconds.
///
/// Ordering compares the total length, so `7 days > 1 day` and
/// `1 day == 0 days + 86400 seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    total_seconds: i64,
}

impl Interval {
    pub const ZERO: Interval = Interval { total_seconds: 0 };

    pub fn from_days(days: u32) -> Self {
        Self {
            total_seconds: i64::from(days) * SECONDS_PER_DAY,
        }
    }

    pub fn from_hours(hours: u32) -> Self {
        Self {
            total_seconds: i64::from(hours) * SECONDS_PER_HOUR,
        }
    }

    pub fn from_seconds(seconds: u32) -> Self {
        Self {
            total_seconds: i64::from(seconds),
        }
    }

    /// Whole days.
    pub fn days(&self) -> i64 {
        self.total_seconds.div_euclid(SECONDS_PER_DAY)
    }

    /// Remaining seconds after `days()`, always in `0..86400`.
    pub fn seconds(&self) -> i64 {
        self.total_seconds.rem_euclid(SECONDS_PER_DAY)
    }

    pub fn total_seconds(&self) -> i64 {
        self.total_seconds
    }

    pub fn is_zero(&self) -> bool {
        self.total_seconds == 0
    }

    pub fn half(&self) -> Interval {
        Interval {
            total_seconds: self.total_seconds / 2,
        }
    }

    pub fn as_time_delta(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.total_seconds).unwrap_or(TimeDelta::MAX)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0s");
        }
        let days = self.days();
        let rest = self.seconds();
        let parts = [
            (days, "d"),
            (rest / SECONDS_PER_HOUR, "h"),
            ((rest % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE, "m"),
            (rest % SECONDS_PER_MINUTE, "s"),
        ];
        let rendered: Vec<String> = parts
            .iter()
            .filter(|(value, _)| *value != 0)
            .map(|(value, unit)| format!("{}{}", value, unit))
            .collect();
        write!(f, "{}", rendered.join(" "))
    }
}

// Always written in the explicit {days, seconds} form, which the loader reads back.
impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Interval", 2)?;
        state.serialize_field("days", &self.days())?;
        state.serialize_field("seconds", &self.seconds())?;
        state.end()
    }
}

// =============================================================================
//  RAW FORMS (as written in the document)
// =============================================================================

/// Every shape a duration may take in a DAG document.
///
/// `Unsupported` swallows anything else (type-tagged values included) so that
/// the loader can report a `SchemaError` with the field path instead of a bare
/// YAML error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IntervalSpec {
    Days(i64),
    Tuple(Vec<i64>),
    Parts(IntervalParts),
    Unsupported(serde_yaml::Value),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlainInterval {
    Days(i64),
    Tuple(Vec<i64>),
    Parts(IntervalParts),
}

// Read as a Value first: a derived untagged enum would silently strip a tag
// such as `!timedelta [1]` and accept the bare sequence.
impl<'de> Deserialize<'de> for IntervalSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        if matches!(value, serde_yaml::Value::Tagged(_)) {
            return Ok(IntervalSpec::Unsupported(value));
        }
        Ok(match serde_yaml::from_value::<PlainInterval>(value.clone()) {
            Ok(PlainInterval::Days(days)) => IntervalSpec::Days(days),
            Ok(PlainInterval::Tuple(values)) => IntervalSpec::Tuple(values),
            Ok(PlainInterval::Parts(parts)) => IntervalSpec::Parts(parts),
            Err(_) => IntervalSpec::Unsupported(value),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntervalParts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weeks: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<i64>,
}

impl IntervalSpec {
    pub fn to_interval(&self, path: &str) -> Result<Interval, DomainError> {
        let components: Vec<(i64, i64)> = match self {
            IntervalSpec::Days(days) => vec![(*days, SECONDS_PER_DAY)],
            IntervalSpec::Tuple(values) => match values.as_slice() {
                [days] => vec![(*days, SECONDS_PER_DAY)],
                [days, seconds] => vec![(*days, SECONDS_PER_DAY), (*seconds, 1)],
                _ => {
                    return Err(DomainError::schema(
                        path,
                        format!(
                            "expected [days] or [days, seconds], got {} values",
                            values.len()
                        ),
                    ));
                }
            },
            IntervalSpec::Parts(parts) => vec![
                (parts.weeks.unwrap_or(0), SECONDS_PER_WEEK),
                (parts.days.unwrap_or(0), SECONDS_PER_DAY),
                (parts.hours.unwrap_or(0), SECONDS_PER_HOUR),
                (parts.minutes.unwrap_or(0), SECONDS_PER_MINUTE),
                (parts.seconds.unwrap_or(0), 1),
            ],
            IntervalSpec::Unsupported(serde_yaml::Value::Tagged(tagged)) => {
                return Err(DomainError::schema(
                    path,
                    format!(
                        "YAML type tag '{}' is not supported; write the duration as plain data",
                        tagged.tag
                    ),
                ));
            }
            IntervalSpec::Unsupported(value) => {
                return Err(DomainError::schema(
                    path,
                    format!(
                        "malformed duration {:?}; use days, [days, seconds] or {{days: .., seconds: ..}}",
                        value
                    ),
                ));
            }
        };

        let total = components
            .into_iter()
            .try_fold(0i64, |acc, (value, unit)| {
                value.checked_mul(unit).and_then(|s| acc.checked_add(s))
            })
            .ok_or_else(|| DomainError::schema(path, "duration is out of range"))?;

        if total < 0 {
            return Err(DomainError::schema(path, "duration must not be negative"));
        }
        if TimeDelta::try_seconds(total).is_none() {
            return Err(DomainError::schema(path, "duration is out of range"));
        }
        Ok(Interval {
            total_seconds: total,
        })
    }
}

impl From<Interval> for IntervalSpec {
    fn from(interval: Interval) -> Self {
        IntervalSpec::Parts(IntervalParts {
            days: Some(interval.days()),
            seconds: Some(interval.seconds()),
            ..Default::default()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Interval, DomainError> {
        let spec: IntervalSpec = serde_yaml::from_str(yaml).unwrap();
        spec.to_interval("base_config.schedule_interval")
    }

    #[test]
    fn test_accepts_every_documented_form() {
        assert_eq!(parse("7").unwrap(), Interval::from_days(7));
        assert_eq!(parse("[1]").unwrap(), Interval::from_days(1));
        assert_eq!(
            parse("[0, 3600]").unwrap(),
            Interval::from_hours(1),
        );
        assert_eq!(
            parse("{days: 1, seconds: 0}").unwrap(),
            Interval::from_days(1)
        );
        assert_eq!(parse("{hours: 2}").unwrap(), Interval::from_hours(2));
        assert_eq!(parse("{weeks: 1}").unwrap(), Interval::from_days(7));
    }

    #[test]
    fn test_seconds_are_normalised_into_days() {
        let interval = parse("[0, 90000]").unwrap();
        assert_eq!(interval.days(), 1);
        assert_eq!(interval.seconds(), 3600);
        assert_eq!(interval, parse("{days: 1, hours: 1}").unwrap());
    }

    #[test]
    fn test_negative_duration_is_a_schema_error() {
        let err = parse("{days: -1}").unwrap_err();
        match err {
            DomainError::SchemaError { path, reason } => {
                assert_eq!(path, "base_config.schedule_interval");
                assert!(reason.contains("negative"));
            }
            other => panic!("Expected SchemaError, got {:?}", other),
        }
    }

    #[test]
    fn test_mixed_sign_parts_are_summed() {
        // 1 day minus 1 hour is still a valid positive duration
        let interval = parse("{days: 1, hours: -1}").unwrap();
        assert_eq!(interval.total_seconds(), 23 * 3600);
    }

    #[test]
    fn test_negative_seconds_in_tuple_form() {
        // same rule as the mapping form: only the total must be non-negative
        let interval = parse("[1, -3600]").unwrap();
        assert_eq!(interval, Interval::from_hours(23));

        let err = parse("[0, -1]").unwrap_err();
        assert!(matches!(err, DomainError::SchemaError { ref reason, .. } if reason.contains("negative")));
    }

    #[test]
    fn test_type_tagged_duration_is_rejected() {
        let err = parse("!timedelta [1]").unwrap_err();
        match err {
            DomainError::SchemaError { path, reason } => {
                assert_eq!(path, "base_config.schedule_interval");
                assert!(reason.contains("type tag"));
            }
            other => panic!("Expected SchemaError, got {:?}", other),
        }
    }

    #[test]
    fn test_unrepresentable_duration_is_rejected() {
        let err = parse(&format!("[0, {}]", i64::MAX)).unwrap_err();
        assert!(matches!(err, DomainError::SchemaError { ref reason, .. } if reason.contains("out of range")));
    }

    #[test]
    fn test_malformed_shapes_are_rejected() {
        assert!(parse("[1, 2, 3]").is_err());
        assert!(parse("\"one day\"").is_err());
        assert!(parse("{days: 1, fortnights: 2}").is_err());
    }

    #[test]
    fn test_serializes_as_days_and_seconds() {
        let yaml = serde_yaml::to_string(&Interval::from_seconds(86_400 + 60)).unwrap();
        assert!(yaml.contains("days: 1"));
        assert!(yaml.contains("seconds: 60"));

        let back: IntervalSpec = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.to_interval("x").unwrap(), Interval::from_seconds(86_460));
    }

    #[test]
    fn test_display() {
        assert_eq!(Interval::from_days(7).to_string(), "7d");
        assert_eq!(Interval::from_seconds(90_061).to_string(), "1d 1h 1m 1s");
        assert_eq!(Interval::ZERO.to_string(), "0s");
    }
}
