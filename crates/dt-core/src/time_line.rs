//! Ordered collection of time points and duration computation.
//!
//! # Algorithm Summary
//!
//! 1. Select the points matching the tag/target filter
//! 2. Sort them chronologically ([`TimePoint::compare`])
//! 3. Group them by reference tag, since a time line interleaves the ranges
//!    of many items
//! 4. Repair each group ([`fix_range`]) and sum its start/end pairs
//!    ([`compute_range`])
//!
//! Nothing is validated when points are added: client/server interruptions
//! routinely leave the raw log inconsistent, so repair happens when reading.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TimerError;
use crate::time_point::{self, PointType, Target, TimePoint};

/// The ordered points recorded for one test session.
///
/// Insertion order is preserved; it is not necessarily chronological.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeLine {
    points: Vec<TimePoint>,
}

impl TimeLine {
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub const fn from_points(points: Vec<TimePoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimePoint> {
        self.points.iter()
    }

    /// Appends a point without any validation.
    pub fn add(&mut self, point: TimePoint) {
        self.points.push(point);
    }

    /// Removes all matching points and returns how many were removed.
    pub fn remove(&mut self, tags: &[&str], target: Option<Target>, kind: Option<PointType>) -> usize {
        self.remove_where(|point| point.matches(tags, target, kind))
    }

    pub(crate) fn remove_where(&mut self, mut predicate: impl FnMut(&TimePoint) -> bool) -> usize {
        let before = self.points.len();
        self.points.retain(|point| !predicate(point));
        before - self.points.len()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Returns the matching points in insertion order.
    pub fn find(&self, tags: &[&str], target: Option<Target>, kind: Option<PointType>) -> Vec<&TimePoint> {
        self.points
            .iter()
            .filter(|point| point.matches(tags, target, kind))
            .collect()
    }

    /// Returns a new time line holding copies of the matching points.
    pub fn filter(&self, tags: &[&str], target: Option<Target>, kind: Option<PointType>) -> Self {
        Self::from_points(
            self.points
                .iter()
                .filter(|point| point.matches(tags, target, kind))
                .cloned()
                .collect(),
        )
    }

    /// Computes the total elapsed seconds of the matching ranges.
    ///
    /// Open ranges are closed at `last_timestamp`, or at the current time
    /// when `None`.
    pub fn compute(
        &self,
        tags: &[&str],
        target: Option<Target>,
        last_timestamp: Option<f64>,
    ) -> Result<f64, TimerError> {
        let last_timestamp = last_timestamp.unwrap_or_else(time_point::now);

        let mut points: Vec<TimePoint> = self
            .points
            .iter()
            .filter(|point| point.matches(tags, target, None))
            .cloned()
            .collect();
        points.sort_by(TimePoint::compare);

        let mut ranges: BTreeMap<String, Vec<TimePoint>> = BTreeMap::new();
        for point in points {
            let reference = point.reference().unwrap_or_default().to_string();
            ranges.entry(reference).or_default().push(point);
        }

        let mut duration = 0.0;
        for (reference, range) in &ranges {
            let fixed = fix_range(range, last_timestamp);
            duration += compute_range(&fixed).map_err(|err| {
                tracing::warn!(reference = %reference, error = %err, "unable to compute time range");
                err
            })?;
        }
        Ok(duration)
    }
}

impl<'a> IntoIterator for &'a TimeLine {
    type Item = &'a TimePoint;
    type IntoIter = std::slice::Iter<'a, TimePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Repairs a chronologically sorted range so that starts and ends alternate.
///
/// - A start while the range is open gets a synthesized end at the same
///   instant, copied from the start.
/// - An end while the range is closed gets a synthesized start copied from
///   the previous point (or from the end itself when it comes first).
/// - A range left open is closed at `last_timestamp`.
///
/// Lost end markers are the common interruption artifact, so the repair
/// favors closing ranges over discarding points. The input is not modified.
pub fn fix_range(points: &[TimePoint], last_timestamp: f64) -> Vec<TimePoint> {
    let mut fixed: Vec<TimePoint> = Vec::with_capacity(points.len() + 2);
    let mut open = false;

    for point in points {
        match point.kind() {
            PointType::Start => {
                if open {
                    tracing::debug!(point = %point, "synthesizing missing end");
                    fixed.push(point.retyped(PointType::End));
                }
                open = true;
            }
            PointType::End => {
                if !open {
                    let template = fixed.last().unwrap_or(point);
                    tracing::debug!(point = %point, "synthesizing missing start");
                    fixed.push(template.retyped(PointType::Start));
                }
                open = false;
            }
        }
        fixed.push(point.clone());
    }

    if open {
        if let Some(last) = fixed.last() {
            tracing::debug!(point = %last, last_timestamp, "closing open range");
            let end = last.retyped(PointType::End).moved_to(last_timestamp);
            fixed.push(end);
        }
    }

    fixed
}

/// Sums the durations of consecutive start/end pairs.
pub fn compute_range(points: &[TimePoint]) -> Result<f64, TimerError> {
    if points.len() % 2 != 0 {
        return Err(TimerError::IncompleteRange(format!(
            "the range holds an odd number of points ({})",
            points.len()
        )));
    }

    let mut duration = 0.0;
    for pair in points.chunks_exact(2) {
        let (start, end) = (&pair[0], &pair[1]);
        if start.kind() != PointType::Start {
            return Err(TimerError::MalformedRange(format!(
                "expected a start, found two consecutive ends at {}",
                start.timestamp()
            )));
        }
        if end.kind() != PointType::End {
            return Err(TimerError::MalformedRange(format!(
                "expected an end, found two consecutive starts at {}",
                end.timestamp()
            )));
        }
        if start.target() != end.target() {
            return Err(TimerError::InconsistentRange(format!(
                "range starts on the {} clock and ends on the {} clock",
                start.target(),
                end.target()
            )));
        }
        if end.timestamp() < start.timestamp() {
            return Err(TimerError::InconsistentRange(format!(
                "range ends at {} before it starts at {}",
                end.timestamp(),
                start.timestamp()
            )));
        }
        duration += end.timestamp() - start.timestamp();
    }
    Ok(duration)
}
