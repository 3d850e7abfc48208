//! Remaining-time evaluation for time-limited components.

use serde::{Deserialize, Serialize};

use crate::route::TimeLimited;
use crate::time_point::Target;
use crate::timer::Timer;
use crate::types::NavigationMode;

/// Session-wide switches for building constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSettings {
    /// Report minimum times (linear navigation only).
    pub consider_min_time: bool,
    /// Extend maximum times with the candidate's extra time.
    pub apply_extra_time: bool,
    /// Clock used to measure elapsed durations.
    pub timer_target: Target,
}

impl Default for ConstraintSettings {
    fn default() -> Self {
        Self {
            consider_min_time: true,
            apply_extra_time: true,
            timer_target: Target::Server,
        }
    }
}

/// Time limit state of one component, built fresh on each read.
pub struct TimeConstraint<'a> {
    source: &'a dyn TimeLimited,
    duration: f64,
    navigation_mode: NavigationMode,
    settings: ConstraintSettings,
    timer: &'a Timer,
}

impl std::fmt::Debug for TimeConstraint<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeConstraint")
            .field("source", &self.source.identifier())
            .field("duration", &self.duration)
            .field("navigation_mode", &self.navigation_mode)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Extra time breakdown in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtraTime {
    pub total: f64,
    pub consumed: f64,
    pub remaining: f64,
}

/// Constraint as sent to the test runner client. Times are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTimeConstraint {
    pub label: String,
    pub source: String,
    pub qti_class_name: String,
    pub extra_time: ExtraTime,
    pub allow_late_submission: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_time_remaining: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_remaining: Option<i64>,
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "second values of time limits are far below the i64 millisecond range"
)]
fn to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

impl<'a> TimeConstraint<'a> {
    /// `duration` is the time already spent in `source`, in seconds.
    pub fn new(
        source: &'a dyn TimeLimited,
        duration: f64,
        navigation_mode: NavigationMode,
        settings: ConstraintSettings,
        timer: &'a Timer,
    ) -> Self {
        Self {
            source,
            duration,
            navigation_mode,
            settings,
            timer,
        }
    }

    pub fn source(&self) -> &'a dyn TimeLimited {
        self.source
    }

    pub const fn duration(&self) -> f64 {
        self.duration
    }

    pub const fn navigation_mode(&self) -> NavigationMode {
        self.navigation_mode
    }

    pub const fn timer_target(&self) -> Target {
        self.settings.timer_target
    }

    /// Net proctor adjustment for this source, in seconds.
    pub fn adjustment(&self) -> i64 {
        self.timer.adjustments().get(self.source.identifier())
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "adjustments are small second counts"
    )]
    fn adjustment_seconds(&self) -> f64 {
        self.adjustment() as f64
    }

    /// Extra time entitlement applying to the max time.
    pub fn total_extra_time(&self) -> f64 {
        match self.source.max_time() {
            Some(max) if self.settings.apply_extra_time => self.timer.get_extra_time(max),
            _ => 0.0,
        }
    }

    pub fn consumed_extra_time(&self) -> f64 {
        match self.source.max_time() {
            Some(max) if self.settings.apply_extra_time => {
                self.timer.consumed_extra_time_for(self.duration, max)
            }
            _ => 0.0,
        }
    }

    pub fn remaining_extra_time(&self) -> f64 {
        (self.total_extra_time() - self.consumed_extra_time()).max(0.0)
    }

    /// Seconds left before the max time, extra time included, adjustments
    /// excluded. `None` when the source has no max time.
    pub fn maximum_remaining_time(&self) -> Option<f64> {
        let max = self.source.max_time()?;
        Some((max + self.total_extra_time() - self.duration).max(0.0))
    }

    /// Seconds left before the max time once proctor adjustments apply.
    pub fn adjusted_maximum_remaining_time(&self) -> Option<f64> {
        let max = self.source.max_time()?;
        Some((max + self.total_extra_time() + self.adjustment_seconds() - self.duration).max(0.0))
    }

    /// Seconds the candidate must still spend before leaving the source.
    ///
    /// `None` unless min times are considered and navigation is linear.
    pub fn minimum_remaining_time(&self) -> Option<f64> {
        if !self.settings.consider_min_time || self.navigation_mode != NavigationMode::Linear {
            return None;
        }
        let min = self.source.min_time()?;
        Some((min - self.duration).max(0.0))
    }

    /// Whether the adjusted max time is exhausted.
    pub fn timed_out(&self) -> bool {
        self.adjusted_maximum_remaining_time()
            .is_some_and(|remaining| remaining <= 0.0)
    }

    pub fn allow_late_submission(&self) -> bool {
        self.source
            .time_limits()
            .is_some_and(|limits| limits.allow_late_submission)
    }

    /// Client representation, `None` when the source has no time limit.
    pub fn to_client(&self) -> Option<ClientTimeConstraint> {
        let limits = self.source.time_limits()?;
        if !limits.has_min_time() && !limits.has_max_time() {
            return None;
        }

        let min_time_remaining = self.minimum_remaining_time();
        let max_time = self
            .source
            .max_time()
            .map(|max| to_millis(max + self.adjustment_seconds()).max(0));

        Some(ClientTimeConstraint {
            label: self
                .source
                .label()
                .unwrap_or_else(|| self.source.identifier())
                .to_string(),
            source: self.source.identifier().to_string(),
            qti_class_name: self.source.qti_class_name().to_string(),
            extra_time: ExtraTime {
                total: self.total_extra_time(),
                consumed: self.consumed_extra_time(),
                remaining: self.remaining_extra_time(),
            },
            allow_late_submission: limits.allow_late_submission,
            min_time: min_time_remaining
                .and(self.source.min_time())
                .map(to_millis),
            min_time_remaining: min_time_remaining.map(to_millis),
            max_time,
            max_time_remaining: self.adjusted_maximum_remaining_time().map(to_millis),
        })
    }
}
