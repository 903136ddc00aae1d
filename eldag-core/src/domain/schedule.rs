// eldag-core/src/domain/schedule.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::config::JobDescriptor;
use crate::domain::error::DomainError;
use crate::domain::interval::Interval;

/// Which run cadence the orchestrator is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// Steady state: full refresh or incremental, depending on the job.
    Standard,
    /// Catching up historical runs.
    Backfill,
    /// Runs after the backfill horizon.
    Future,
}

impl ScheduleMode {
    pub const ALL: [ScheduleMode; 3] = [
        ScheduleMode::Standard,
        ScheduleMode::Backfill,
        ScheduleMode::Future,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleMode::Standard => "standard",
            ScheduleMode::Backfill => "backfill",
            ScheduleMode::Future => "future",
        }
    }
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| DomainError::UnknownMode(s.to_string()))
    }
}

/// The single home of interval fallback chaining.
pub struct ScheduleResolver;

impl ScheduleResolver {
    /// `backfill` and `future` fall back to `standard`; `standard` falls back to
    /// `schedule_interval`.
    pub fn resolve(job: &JobDescriptor, mode: ScheduleMode) -> Result<Interval, DomainError> {
        let intervals = &job.config.schedule;
        let specific = match mode {
            ScheduleMode::Standard => None,
            ScheduleMode::Backfill => intervals.backfill,
            ScheduleMode::Future => intervals.future,
        };

        specific
            .or_else(|| Self::standard(job))
            .ok_or_else(|| DomainError::UnresolvedScheduleError {
                job: job.name.clone(),
                mode,
            })
    }

    /// Period of the periodic full reload, whatever the job's `incremental` flag.
    pub fn full_refresh(job: &JobDescriptor) -> Result<Interval, DomainError> {
        let intervals = &job.config.schedule;
        intervals
            .full_refresh
            .or(intervals.schedule_interval)
            .ok_or_else(|| DomainError::UnresolvedScheduleError {
                job: job.name.clone(),
                mode: ScheduleMode::Standard,
            })
    }

    fn standard(job: &JobDescriptor) -> Option<Interval> {
        let intervals = &job.config.schedule;
        let branch = if job.incremental {
            intervals.incremental
        } else {
            intervals.full_refresh
        };
        branch.or(intervals.schedule_interval)
    }
}
