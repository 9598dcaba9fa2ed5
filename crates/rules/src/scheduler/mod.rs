//! Cron scheduling of repeated alert runs.
//!
//! The engine is driven by a single cron expression; runs never overlap, so
//! the next tick is always computed after the previous run has returned.

pub(crate) mod cron;


use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Errors parsing a run schedule.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
}

/// A parsed 5- or 6-field cron schedule.
#[derive(Debug, Clone)]
pub struct RunSchedule {
    expr: String,
    schedule: ::cron::Schedule,
}

impl RunSchedule {
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let normalized = cron::normalize_cron(expr);
        let schedule =
            ::cron::Schedule::from_str(&normalized).map_err(|e| ScheduleError::InvalidCron {
                expr: expr.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            expr: expr.trim().to_string(),
            schedule,
        })
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// First tick strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        cron::next_tick(&self.schedule, now)
    }

    /// How long to wait from `now` until the next tick.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Option<Duration> {
        let next = self.next_after(now)?;
        Some((next - now).to_std().unwrap_or(Duration::ZERO))
    }
}
