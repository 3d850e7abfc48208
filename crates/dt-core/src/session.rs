//! The test-session port used by the adjustment service.

use crate::constraint::{ConstraintSettings, TimeConstraint};
use crate::error::TimerError;
use crate::route::{RoutePosition, TimeLimited};
use crate::time_point;
use crate::timer::Timer;

/// A running test session as seen by the timing engine.
pub trait TestSession {
    fn timer(&self) -> &Timer;

    fn timer_mut(&mut self) -> &mut Timer;

    /// Current position, `None` when the candidate is not on an item.
    fn route_position(&self) -> Option<&RoutePosition>;

    fn constraint_settings(&self) -> ConstraintSettings;

    /// Reference time for open ranges.
    fn now(&self) -> f64 {
        time_point::now()
    }

    /// Constraints of the current item, section, test part and test, in
    /// that order.
    fn time_constraints(&self) -> Result<Vec<TimeConstraint<'_>>, TimerError> {
        let Some(position) = self.route_position() else {
            return Ok(Vec::new());
        };
        let settings = self.constraint_settings();
        let now = self.now();
        let timer = self.timer();

        position
            .components()
            .into_iter()
            .map(|component| {
                let duration = timer.compute_until(
                    &[component.identifier()],
                    Some(settings.timer_target),
                    now,
                )?;
                Ok(TimeConstraint::new(
                    component,
                    duration,
                    position.navigation_mode,
                    settings,
                    timer,
                ))
            })
            .collect()
    }
}

/// Session state owned by the runner for the duration of one request.
#[derive(Debug, Default)]
pub struct RunnerSession {
    timer: Timer,
    position: Option<RoutePosition>,
    settings: ConstraintSettings,
    clock: Option<f64>,
}

impl RunnerSession {
    pub fn new(timer: Timer, settings: ConstraintSettings) -> Self {
        Self {
            timer,
            position: None,
            settings,
            clock: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: RoutePosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn set_position(&mut self, position: Option<RoutePosition>) {
        self.position = position;
    }

    /// Pins the reference time instead of reading the wall clock.
    #[must_use]
    pub const fn at(mut self, now: f64) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn into_timer(self) -> Timer {
        self.timer
    }
}

impl TestSession for RunnerSession {
    fn timer(&self) -> &Timer {
        &self.timer
    }

    fn timer_mut(&mut self) -> &mut Timer {
        &mut self.timer
    }

    fn route_position(&self) -> Option<&RoutePosition> {
        self.position.as_ref()
    }

    fn constraint_settings(&self) -> ConstraintSettings {
        self.settings
    }

    fn now(&self) -> f64 {
        self.clock.unwrap_or_else(time_point::now)
    }
}
