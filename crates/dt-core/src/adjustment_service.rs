//! Proctor time adjustments.
//!
//! One adjustment is registered on every active scope that declares a max
//! time (item, section, test part and test), so that an outer limit never
//! cuts into time granted on an inner one.

use crate::adjustment::AdjustmentAction;
use crate::constraint::TimeConstraint;
use crate::error::TimerError;
use crate::session::TestSession;

/// Applies increases and bounded decreases of allotted time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerAdjustmentService;

/// What a decrease can be clamped against: a source and its current bound.
struct AdjustmentTarget {
    source: String,
    bound: f64,
}

impl AdjustmentTarget {
    fn from_constraint(constraint: &TimeConstraint<'_>) -> Option<Self> {
        let remaining = constraint.maximum_remaining_time()?;
        #[expect(
            clippy::cast_precision_loss,
            reason = "adjustments are small second counts"
        )]
        let adjustment = constraint.adjustment() as f64;
        Some(Self {
            source: constraint.source().identifier().to_string(),
            bound: remaining + adjustment,
        })
    }
}

impl TimerAdjustmentService {
    pub const fn new() -> Self {
        Self
    }

    /// Grants `seconds` more. Returns the seconds applied.
    pub fn increase<S: TestSession>(
        &self,
        session: &mut S,
        seconds: u64,
        source: Option<&str>,
    ) -> Result<u64, TimerError> {
        let targets = Self::targets(session, source)?;
        Self::register(session, &targets, AdjustmentAction::Increase, seconds)
    }

    /// Takes back up to `seconds`, never more than the smallest remaining
    /// time among the affected scopes. Returns the seconds applied.
    pub fn decrease<S: TestSession>(
        &self,
        session: &mut S,
        seconds: u64,
        source: Option<&str>,
    ) -> Result<u64, TimerError> {
        let targets = Self::targets(session, source)?;
        let limit = Self::maximum_decrease(&targets);
        let applied = limit.map_or(0, |limit| seconds.min(limit));
        if applied < seconds {
            tracing::debug!(requested = seconds, applied, "decrease clamped");
        }
        Self::register(session, &targets, AdjustmentAction::Decrease, applied)
    }

    /// Largest decrease the active constraints allow, `None` when no
    /// affected scope has a max time.
    pub fn find_maximum_possible_decrease<S: TestSession>(
        &self,
        session: &S,
        source: Option<&str>,
    ) -> Result<Option<u64>, TimerError> {
        let targets = Self::targets(session, source)?;
        Ok(Self::maximum_decrease(&targets))
    }

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "the bound is floored at zero and far below u64::MAX"
    )]
    fn maximum_decrease(targets: &[AdjustmentTarget]) -> Option<u64> {
        targets
            .iter()
            .map(|target| target.bound)
            .reduce(f64::min)
            .map(|bound| bound.max(0.0).floor() as u64)
    }

    fn targets<S: TestSession>(
        session: &S,
        source: Option<&str>,
    ) -> Result<Vec<AdjustmentTarget>, TimerError> {
        let constraints = session.time_constraints()?;
        match source {
            None => Ok(constraints
                .iter()
                .filter_map(AdjustmentTarget::from_constraint)
                .collect()),
            Some(source) => constraints
                .iter()
                .find(|c| c.source().identifier() == source)
                .and_then(AdjustmentTarget::from_constraint)
                .map(|target| vec![target])
                .ok_or_else(|| {
                    TimerError::InvalidData(format!(
                        "{source} is not an active time-limited component"
                    ))
                }),
        }
    }

    /// Records the adjustment on every target, then persists the timer.
    fn register<S: TestSession>(
        session: &mut S,
        targets: &[AdjustmentTarget],
        action: AdjustmentAction,
        seconds: u64,
    ) -> Result<u64, TimerError> {
        if seconds == 0 || targets.is_empty() {
            return Ok(0);
        }

        let timer = session.timer_mut();
        for target in targets {
            timer.adjustments_mut().put(&target.source, action, seconds);
            tracing::debug!(source = %target.source, %action, seconds, "adjustment registered");
        }
        timer.save()?;
        timer.flush()?;
        Ok(seconds)
    }
}
