//! Per-session timer.
//!
//! The timer records server-side start/end points around every item visit,
//! reconciles client-reported durations against them, and persists the
//! whole state through a [`TimeStorage`].
//!
//! Writes are validated strictly: a point that would break the item's range
//! is rejected. Reads go through [`TimeLine::compute`], which repairs
//! whatever inconsistencies the stored history already contains.

use std::fmt;

use crate::adjustment::AdjustmentMap;
use crate::error::TimerError;
use crate::format::{JsonFormat, TimeStorageFormat, TimerSnapshot};
use crate::route::ItemRef;
use crate::storage::TimeStorage;
use crate::time_line::TimeLine;
use crate::time_point::{self, PointType, Target, TimePoint};
use crate::types::{validate_duration, validate_timestamp};

/// Smallest timestamp step, one microsecond.
pub const TIMER_PRECISION: f64 = 0.000_001;

/// Time tracker for one test session.
pub struct Timer {
    time_line: TimeLine,
    adjustments: AdjustmentMap,
    extra_time: f64,
    extended_time: f64,
    consumed_extra_time: f64,
    storage: Option<Box<dyn TimeStorage>>,
    format: Box<dyn TimeStorageFormat>,
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("points", &self.time_line.len())
            .field("adjustments", &self.adjustments)
            .field("extra_time", &self.extra_time)
            .field("extended_time", &self.extended_time)
            .field("consumed_extra_time", &self.consumed_extra_time)
            .field("has_storage", &self.storage.is_some())
            .field("format", &self.format.name())
            .finish()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Creates a timer without storage, using the JSON format.
    pub fn new() -> Self {
        Self {
            time_line: TimeLine::new(),
            adjustments: AdjustmentMap::new(),
            extra_time: 0.0,
            extended_time: 0.0,
            consumed_extra_time: 0.0,
            storage: None,
            format: Box::new(JsonFormat),
        }
    }

    /// Creates a timer persisted through `storage` in the given format.
    pub fn with_storage(
        storage: Box<dyn TimeStorage>,
        format: Box<dyn TimeStorageFormat>,
    ) -> Self {
        Self {
            storage: Some(storage),
            format,
            ..Self::new()
        }
    }

    pub fn set_storage(&mut self, storage: Box<dyn TimeStorage>) {
        self.storage = Some(storage);
    }

    pub const fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    pub const fn time_line(&self) -> &TimeLine {
        &self.time_line
    }

    pub const fn adjustments(&self) -> &AdjustmentMap {
        &self.adjustments
    }

    pub const fn adjustments_mut(&mut self) -> &mut AdjustmentMap {
        &mut self.adjustments
    }

    /// Server points of the item's range, chronologically sorted.
    fn server_range(&self, item: &ItemRef) -> Vec<TimePoint> {
        let reference = item.reference();
        let mut range: Vec<TimePoint> = self
            .time_line
            .find(&[reference.as_str()], Some(Target::Server), None)
            .into_iter()
            .cloned()
            .collect();
        range.sort_by(TimePoint::compare);
        range
    }

    /// Rejects a timestamp earlier than any point already in the range.
    fn check_coherence(range: &[TimePoint], timestamp: f64) -> Result<(), TimerError> {
        if let Some(latest) = range.iter().map(TimePoint::timestamp).reduce(f64::max) {
            if timestamp < latest {
                return Err(TimerError::InconsistentRange(format!(
                    "timestamp {timestamp} precedes an existing point at {latest}"
                )));
            }
        }
        Ok(())
    }

    /// Opens the item's server range at `timestamp`.
    ///
    /// A range left open by a missed `end` is closed one precision tick
    /// before the new start.
    pub fn start(&mut self, item: &ItemRef, timestamp: f64) -> Result<(), TimerError> {
        let timestamp = validate_timestamp(timestamp)?;
        let range = self.server_range(item);
        Self::check_coherence(&range, timestamp)?;

        if range.len() % 2 == 1 {
            if let Some(last) = range.last().filter(|p| p.kind() == PointType::Start) {
                let closing = (timestamp - TIMER_PRECISION).max(last.timestamp());
                tracing::warn!(
                    item = %item.reference(),
                    open_since = last.timestamp(),
                    closing,
                    "range still open on start, closing it"
                );
                self.time_line.add(TimePoint::new(
                    item.tags(),
                    closing,
                    PointType::End,
                    Target::Server,
                )?);
            }
        }

        self.time_line.add(TimePoint::new(
            item.tags(),
            timestamp,
            PointType::Start,
            Target::Server,
        )?);
        tracing::debug!(item = %item.reference(), timestamp, "timer started");
        Ok(())
    }

    /// Closes the item's open server range at `timestamp`.
    ///
    /// `consumed_extra_time` is the extra time the client reports as used so
    /// far; the largest reported value is kept.
    pub fn end(
        &mut self,
        item: &ItemRef,
        timestamp: f64,
        consumed_extra_time: Option<f64>,
    ) -> Result<(), TimerError> {
        let timestamp = validate_timestamp(timestamp)?;
        let consumed = consumed_extra_time
            .map(|c| validate_duration("consumed extra time", c))
            .transpose()?;

        let range = self.server_range(item);
        let is_open =
            range.len() % 2 == 1 && range.last().is_some_and(|p| p.kind() == PointType::Start);
        if !is_open {
            return Err(TimerError::InconsistentRange(format!(
                "the range of {} is not open",
                item.reference()
            )));
        }
        Self::check_coherence(&range, timestamp)?;

        self.time_line.add(TimePoint::new(
            item.tags(),
            timestamp,
            PointType::End,
            Target::Server,
        )?);
        if let Some(consumed) = consumed {
            self.consumed_extra_time = self.consumed_extra_time.max(consumed);
        }
        tracing::debug!(item = %item.reference(), timestamp, "timer ended");
        Ok(())
    }

    /// Reconciles a client-measured duration with the latest server visit.
    ///
    /// The client window is centered inside the server window: both client
    /// points are inset by half the difference, which accounts for network
    /// latency on the way in and out.
    pub fn adjust(&mut self, item: &ItemRef, duration: f64) -> Result<(), TimerError> {
        let duration = validate_duration("duration", duration)?;
        let range = self.server_range(item);
        if range.is_empty() || range.len() % 2 != 0 {
            return Err(TimerError::InconsistentRange(format!(
                "the range of {} is not complete",
                item.reference()
            )));
        }

        let (start, end) = (&range[range.len() - 2], &range[range.len() - 1]);
        if start.kind() != PointType::Start || end.kind() != PointType::End {
            return Err(TimerError::MalformedRange(format!(
                "the latest visit of {} is not a start/end pair",
                item.reference()
            )));
        }
        let (start, end) = (start.timestamp(), end.timestamp());
        let server_duration = end - start;
        if duration > server_duration {
            return Err(TimerError::InconsistentRange(format!(
                "client duration {duration} exceeds server duration {server_duration}"
            )));
        }

        let delay = (server_duration - duration) / 2.0;
        let reference = item.reference();
        let replaced = self.time_line.remove_where(|p| {
            p.target() == Target::Client
                && p.reference() == Some(reference.as_str())
                && p.timestamp() >= start
                && p.timestamp() <= end
        });
        if replaced > 0 {
            tracing::debug!(item = %reference, replaced, "replacing client range");
        }

        self.time_line.add(TimePoint::new(
            item.tags(),
            start + delay,
            PointType::Start,
            Target::Client,
        )?);
        self.time_line.add(TimePoint::new(
            item.tags(),
            end - delay,
            PointType::End,
            Target::Client,
        )?);
        tracing::debug!(item = %reference, duration, server_duration, delay, "timer adjusted");
        Ok(())
    }

    /// Elapsed seconds for the tags on one clock, open ranges closed now.
    ///
    /// `target` must name a single clock: durations measured on different
    /// clocks cannot be summed.
    pub fn compute(&self, tags: &[&str], target: Option<Target>) -> Result<f64, TimerError> {
        self.compute_until(tags, target, time_point::now())
    }

    /// Like [`Timer::compute`], closing open ranges at `last_timestamp`.
    pub fn compute_until(
        &self,
        tags: &[&str],
        target: Option<Target>,
        last_timestamp: f64,
    ) -> Result<f64, TimerError> {
        let Some(target) = target else {
            return Err(TimerError::InconsistentCriteria(
                "a duration can only be computed for a single target".to_string(),
            ));
        };
        self.time_line
            .compute(tags, Some(target), Some(last_timestamp))
    }

    /// Whether the elapsed time reached `time_limit` seconds.
    pub fn timeout(
        &self,
        time_limit: f64,
        tags: &[&str],
        target: Option<Target>,
    ) -> Result<bool, TimerError> {
        Ok(self.compute(tags, target)? >= time_limit)
    }

    /// Like [`Timer::timeout`], closing open ranges at `last_timestamp`.
    pub fn timeout_at(
        &self,
        time_limit: f64,
        tags: &[&str],
        target: Option<Target>,
        last_timestamp: f64,
    ) -> Result<bool, TimerError> {
        Ok(self.compute_until(tags, target, last_timestamp)? >= time_limit)
    }

    /// Earliest matching timestamp.
    pub fn first_timestamp(&self, tags: &[&str], target: Option<Target>) -> Option<f64> {
        self.time_line
            .find(tags, target, None)
            .into_iter()
            .map(TimePoint::timestamp)
            .reduce(f64::min)
    }

    /// Latest matching timestamp.
    pub fn last_timestamp(&self, tags: &[&str], target: Option<Target>) -> Option<f64> {
        self.time_line
            .find(tags, target, None)
            .into_iter()
            .map(TimePoint::timestamp)
            .reduce(f64::max)
    }

    /// Whether the item's server range is currently open.
    pub fn is_running(&self, item: &ItemRef) -> bool {
        let range = self.server_range(item);
        range.len() % 2 == 1 && range.last().is_some_and(|p| p.kind() == PointType::Start)
    }

    pub fn set_extra_time(&mut self, seconds: f64) -> Result<(), TimerError> {
        self.extra_time = validate_duration("extra time", seconds)?;
        Ok(())
    }

    pub const fn extra_time(&self) -> f64 {
        self.extra_time
    }

    /// Sets a time multiplier; values up to 1 mean no extension.
    pub fn set_extended_time(&mut self, multiplier: f64) -> Result<(), TimerError> {
        self.extended_time = validate_duration("extended time", multiplier)?;
        Ok(())
    }

    pub const fn extended_time(&self) -> f64 {
        self.extended_time
    }

    /// Largest consumed extra time reported by the client.
    pub const fn consumed_extra_time(&self) -> f64 {
        self.consumed_extra_time
    }

    /// Extra time entitlement in seconds for a limit of `max_seconds`.
    pub fn get_extra_time(&self, max_seconds: f64) -> f64 {
        let extended = if self.extended_time > 1.0 {
            max_seconds * (self.extended_time - 1.0)
        } else {
            0.0
        };
        self.extra_time + extended
    }

    /// Extra time used once `elapsed` seconds were spent against a limit of
    /// `max_seconds`, never more than the entitlement.
    pub fn consumed_extra_time_for(&self, elapsed: f64, max_seconds: f64) -> f64 {
        let total = self.get_extra_time(max_seconds);
        let overrun = (elapsed - max_seconds).max(0.0);
        overrun.max(self.consumed_extra_time).min(total).max(0.0)
    }

    /// Extra time consumed by the tagged component.
    pub fn get_consumed_extra_time(
        &self,
        tags: &[&str],
        max_seconds: f64,
        target: Option<Target>,
    ) -> Result<f64, TimerError> {
        let elapsed = self.compute(tags, target)?;
        Ok(self.consumed_extra_time_for(elapsed, max_seconds))
    }

    /// Extra time left to the tagged component.
    pub fn get_remaining_extra_time(
        &self,
        tags: &[&str],
        max_seconds: f64,
        target: Option<Target>,
    ) -> Result<f64, TimerError> {
        let consumed = self.get_consumed_extra_time(tags, max_seconds, target)?;
        Ok((self.get_extra_time(max_seconds) - consumed).max(0.0))
    }

    /// Current state as a persistable snapshot.
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            time_line: self.time_line.clone(),
            extra_time: self.extra_time,
            extended_time: self.extended_time,
            consumed_extra_time: self.consumed_extra_time,
            adjustment_map: self.adjustments.clone(),
        }
    }

    /// Replaces the state with a snapshot. An invalid snapshot changes nothing.
    pub fn restore(&mut self, snapshot: TimerSnapshot) -> Result<(), TimerError> {
        let extra_time = validate_duration("extra time", snapshot.extra_time)?;
        let extended_time = validate_duration("extended time", snapshot.extended_time)?;
        let consumed_extra_time =
            validate_duration("consumed extra time", snapshot.consumed_extra_time)?;

        self.extra_time = extra_time;
        self.extended_time = extended_time;
        self.consumed_extra_time = consumed_extra_time;
        self.time_line = snapshot.time_line;
        self.adjustments = snapshot.adjustment_map;
        Ok(())
    }

    fn storage_mut(&mut self) -> Result<&mut Box<dyn TimeStorage>, TimerError> {
        self.storage
            .as_mut()
            .ok_or_else(|| TimerError::InvalidStorage("no storage configured for timer".to_string()))
    }

    /// Persists the whole state. Saving twice stores the same payload.
    pub fn save(&mut self) -> Result<(), TimerError> {
        let payload = self.format.encode(&self.snapshot())?;
        self.storage_mut()?.store(&payload)?;
        tracing::debug!(points = self.time_line.len(), "timer saved");
        Ok(())
    }

    /// Loads the persisted state, if any.
    ///
    /// The in-memory state is only replaced by a payload that decodes
    /// completely.
    pub fn load(&mut self) -> Result<(), TimerError> {
        let payload = self.storage_mut()?.load()?;
        let Some(payload) = payload else {
            tracing::debug!("no stored timer");
            return Ok(());
        };
        let snapshot = self.format.decode(&payload)?;
        self.restore(snapshot)?;
        tracing::debug!(points = self.time_line.len(), "timer loaded");
        Ok(())
    }

    /// Writes pending data of a batching storage.
    pub fn flush(&mut self) -> Result<(), TimerError> {
        self.storage_mut()?.flush()?;
        Ok(())
    }

    /// Deletes the stored timer and clears the in-memory state.
    pub fn delete(&mut self) -> Result<bool, TimerError> {
        let deleted = self.storage_mut()?.delete()?;
        self.time_line.clear();
        self.adjustments.clear();
        self.extra_time = 0.0;
        self.extended_time = 0.0;
        self.consumed_extra_time = 0.0;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::AdjustmentAction;
    use crate::format::PackedFormat;
    use crate::storage::MemoryTimeStorage;

    fn item() -> ItemRef {
        ItemRef::new("item-1", 0)
            .in_section("section-1")
            .in_test_part("part-1")
            .in_test("test-1")
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn start_end_compute() {
        let mut timer = Timer::new();
        timer.start(&item(), 100.0).unwrap();
        timer.end(&item(), 112.5, None).unwrap();

        let item_time = timer
            .compute_until(&["item-1"], Some(Target::Server), 500.0)
            .unwrap();
        assert!(approx(item_time, 12.5));
        let section_time = timer
            .compute_until(&["section-1"], Some(Target::Server), 500.0)
            .unwrap();
        assert!(approx(section_time, 12.5));
    }

    #[test]
    fn start_rejects_earlier_timestamp() {
        let mut timer = Timer::new();
        timer.start(&item(), 5.0).unwrap();
        let err = timer.start(&item(), 3.0).unwrap_err();
        assert!(matches!(err, TimerError::InconsistentRange(_)), "{err}");
        assert_eq!(timer.time_line().len(), 1, "rejected start must not write");
    }

    #[test]
    fn end_without_start_is_rejected() {
        let mut timer = Timer::new();
        let err = timer.end(&item(), 3.0, None).unwrap_err();
        assert!(matches!(err, TimerError::InconsistentRange(_)));
    }

    #[test]
    fn end_twice_is_rejected() {
        let mut timer = Timer::new();
        timer.start(&item(), 1.0).unwrap();
        timer.end(&item(), 2.0, None).unwrap();
        assert!(matches!(
            timer.end(&item(), 3.0, None),
            Err(TimerError::InconsistentRange(_))
        ));
    }

    #[test]
    fn end_rejects_earlier_timestamp() {
        let mut timer = Timer::new();
        timer.start(&item(), 10.0).unwrap();
        assert!(matches!(
            timer.end(&item(), 9.0, None),
            Err(TimerError::InconsistentRange(_))
        ));
    }

    #[test]
    fn negative_timestamps_are_invalid() {
        let mut timer = Timer::new();
        assert!(matches!(
            timer.start(&item(), -1.0),
            Err(TimerError::InvalidData(_))
        ));
        assert!(matches!(
            timer.end(&item(), f64::NAN, None),
            Err(TimerError::InvalidData(_))
        ));
    }

    #[test]
    fn start_closes_open_range() {
        let mut timer = Timer::new();
        timer.start(&item(), 10.0).unwrap();
        timer.start(&item(), 20.0).unwrap();
        assert_eq!(timer.time_line().len(), 3);

        let points = timer.time_line().points();
        assert_eq!(points[1].kind(), PointType::End);
        assert!(approx(points[1].timestamp(), 20.0 - TIMER_PRECISION));

        timer.end(&item(), 25.0, None).unwrap();
        let total = timer
            .compute_until(&["item-1"], Some(Target::Server), 100.0)
            .unwrap();
        assert!(approx(total, 15.0 - TIMER_PRECISION));
    }

    #[test]
    fn start_at_same_instant_closes_open_range() {
        let mut timer = Timer::new();
        timer.start(&item(), 10.0).unwrap();
        timer.start(&item(), 10.0).unwrap();
        timer.end(&item(), 14.0, None).unwrap();

        let kinds: Vec<_> = timer.time_line().iter().map(TimePoint::kind).collect();
        assert_eq!(
            kinds,
            vec![
                PointType::Start,
                PointType::End,
                PointType::Start,
                PointType::End
            ]
        );
        let total = timer
            .compute_until(&["item-1"], Some(Target::Server), 100.0)
            .unwrap();
        assert!(approx(total, 4.0));
    }

    #[test]
    fn zero_length_visit_adds_nothing() {
        let mut timer = Timer::new();
        timer.start(&item(), 5.0).unwrap();
        timer.end(&item(), 5.0, None).unwrap();
        timer.start(&item(), 10.0).unwrap();
        timer.end(&item(), 12.0, None).unwrap();

        let total = timer
            .compute_until(&["item-1"], Some(Target::Server), 100.0)
            .unwrap();
        assert!(approx(total, 2.0));
    }

    #[test]
    fn revisits_accumulate() {
        let mut timer = Timer::new();
        timer.start(&item(), 0.0).unwrap();
        timer.end(&item(), 10.0, None).unwrap();
        timer.start(&item(), 30.0).unwrap();
        timer.end(&item(), 35.0, None).unwrap();
        let total = timer
            .compute_until(&["item-1"], Some(Target::Server), 100.0)
            .unwrap();
        assert!(approx(total, 15.0));
    }

    #[test]
    fn adjust_is_bounded_by_server_duration() {
        let mut timer = Timer::new();
        timer.start(&item(), 0.0).unwrap();
        timer.end(&item(), 20.0, None).unwrap();

        assert!(matches!(
            timer.adjust(&item(), 25.0),
            Err(TimerError::InconsistentRange(_))
        ));

        timer.adjust(&item(), 10.0).unwrap();
        let client = timer
            .time_line()
            .find(&["item-1"], Some(Target::Client), None);
        assert_eq!(client.len(), 2);
        assert!(approx(client[0].timestamp(), 5.0));
        assert_eq!(client[0].kind(), PointType::Start);
        assert!(approx(client[1].timestamp(), 15.0));
        assert_eq!(client[1].kind(), PointType::End);

        let client_time = timer
            .compute_until(&["item-1"], Some(Target::Client), 100.0)
            .unwrap();
        assert!(approx(client_time, 10.0));
    }

    #[test]
    fn adjust_to_zero_closes_client_range() {
        let mut timer = Timer::new();
        timer.start(&item(), 0.0).unwrap();
        timer.end(&item(), 20.0, None).unwrap();
        timer.adjust(&item(), 0.0).unwrap();

        let client_time = timer
            .compute_until(&["item-1"], Some(Target::Client), 1000.0)
            .unwrap();
        assert!(approx(client_time, 0.0));
    }

    #[test]
    fn adjust_after_zero_length_visit() {
        let mut timer = Timer::new();
        timer.start(&item(), 5.0).unwrap();
        timer.end(&item(), 5.0, None).unwrap();
        timer.adjust(&item(), 0.0).unwrap();

        let client_time = timer
            .compute_until(&["item-1"], Some(Target::Client), 1000.0)
            .unwrap();
        assert!(approx(client_time, 0.0));
    }

    #[test]
    fn adjust_to_full_server_duration() {
        let mut timer = Timer::new();
        timer.start(&item(), 0.0).unwrap();
        timer.end(&item(), 20.0, None).unwrap();
        timer.adjust(&item(), 20.0).unwrap();

        let client = timer
            .time_line()
            .find(&["item-1"], Some(Target::Client), None);
        assert!(approx(client[0].timestamp(), 0.0));
        assert!(approx(client[1].timestamp(), 20.0));
        let client_time = timer
            .compute_until(&["item-1"], Some(Target::Client), 1000.0)
            .unwrap();
        assert!(approx(client_time, 20.0));
    }

    #[test]
    fn adjust_replaces_previous_client_range() {
        let mut timer = Timer::new();
        timer.start(&item(), 0.0).unwrap();
        timer.end(&item(), 20.0, None).unwrap();
        timer.adjust(&item(), 10.0).unwrap();
        timer.adjust(&item(), 16.0).unwrap();
        let client_time = timer
            .compute_until(&["item-1"], Some(Target::Client), 100.0)
            .unwrap();
        assert!(approx(client_time, 16.0));
        assert_eq!(timer.time_line().len(), 4);
    }

    #[test]
    fn adjust_requires_closed_range() {
        let mut timer = Timer::new();
        assert!(matches!(
            timer.adjust(&item(), 1.0),
            Err(TimerError::InconsistentRange(_))
        ));
        timer.start(&item(), 0.0).unwrap();
        assert!(matches!(
            timer.adjust(&item(), 1.0),
            Err(TimerError::InconsistentRange(_))
        ));
        timer.end(&item(), 4.0, None).unwrap();
        assert!(matches!(
            timer.adjust(&item(), -1.0),
            Err(TimerError::InvalidData(_))
        ));
    }

    #[test]
    fn compute_requires_single_target() {
        let timer = Timer::new();
        assert!(matches!(
            timer.compute(&[], None),
            Err(TimerError::InconsistentCriteria(_))
        ));
    }

    #[test]
    fn timeout_boundary_is_inclusive() {
        let mut timer = Timer::new();
        timer.start(&item(), 0.0).unwrap();
        timer.end(&item(), 10.0, None).unwrap();
        assert!(timer.timeout(10.0, &["item-1"], Some(Target::Server)).unwrap());
        assert!(!timer.timeout(10.5, &["item-1"], Some(Target::Server)).unwrap());
        assert!(timer.timeout(9.0, &["test-1"], Some(Target::Server)).unwrap());
    }

    #[test]
    fn timeout_at_closes_open_range() {
        let mut timer = Timer::new();
        timer.start(&item(), 0.0).unwrap();
        assert!(!timer.timeout_at(10.0, &["item-1"], Some(Target::Server), 9.0).unwrap());
        assert!(timer.timeout_at(10.0, &["item-1"], Some(Target::Server), 10.0).unwrap());
    }

    #[test]
    fn running_state() {
        let mut timer = Timer::new();
        assert!(!timer.is_running(&item()));
        timer.start(&item(), 0.0).unwrap();
        assert!(timer.is_running(&item()));
        timer.end(&item(), 1.0, None).unwrap();
        assert!(!timer.is_running(&item()));
    }

    #[test]
    fn first_and_last_timestamps() {
        let mut timer = Timer::new();
        assert_eq!(timer.first_timestamp(&[], None), None);
        timer.start(&item(), 3.0).unwrap();
        timer.end(&item(), 9.0, None).unwrap();
        assert_eq!(timer.first_timestamp(&["section-1"], None), Some(3.0));
        assert_eq!(timer.last_timestamp(&["section-1"], None), Some(9.0));
    }

    #[test]
    fn extra_time_entitlement() {
        let mut timer = Timer::new();
        timer.set_extra_time(60.0).unwrap();
        assert!(approx(timer.get_extra_time(600.0), 60.0));
        timer.set_extended_time(1.5).unwrap();
        assert!(approx(timer.get_extra_time(600.0), 360.0));
        assert!(timer.set_extra_time(-1.0).is_err());
    }

    #[test]
    fn consumed_extra_time_partitions_entitlement() {
        let mut timer = Timer::new();
        timer.set_extra_time(30.0).unwrap();
        assert!(approx(timer.consumed_extra_time_for(50.0, 60.0), 0.0));
        assert!(approx(timer.consumed_extra_time_for(70.0, 60.0), 10.0));
        assert!(approx(timer.consumed_extra_time_for(200.0, 60.0), 30.0));

        timer.start(&item(), 0.0).unwrap();
        timer.end(&item(), 70.0, Some(4.0)).unwrap();
        let consumed = timer
            .get_consumed_extra_time(&["item-1"], 60.0, Some(Target::Server))
            .unwrap();
        let remaining = timer
            .get_remaining_extra_time(&["item-1"], 60.0, Some(Target::Server))
            .unwrap();
        assert!(approx(consumed, 10.0));
        assert!(approx(remaining, 20.0));
    }

    #[test]
    fn reported_consumed_extra_time_is_kept() {
        let mut timer = Timer::new();
        timer.set_extra_time(30.0).unwrap();
        timer.start(&item(), 0.0).unwrap();
        timer.end(&item(), 10.0, Some(12.0)).unwrap();
        assert!(approx(timer.consumed_extra_time_for(10.0, 60.0), 12.0));
    }

    #[test]
    fn save_without_storage_fails() {
        let mut timer = Timer::new();
        assert!(matches!(timer.save(), Err(TimerError::InvalidStorage(_))));
        assert!(matches!(timer.load(), Err(TimerError::InvalidStorage(_))));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let storage = MemoryTimeStorage::new();
        let mut timer = Timer::with_storage(Box::new(storage), Box::new(PackedFormat));
        timer.start(&item(), 1.0).unwrap();
        timer.end(&item(), 4.0, Some(0.5)).unwrap();
        timer.set_extra_time(15.0).unwrap();
        timer
            .adjustments_mut()
            .put("item-1", AdjustmentAction::Increase, 20);
        timer.save().unwrap();
        timer.save().unwrap();

        let snapshot = timer.snapshot();
        timer.load().unwrap();
        assert_eq!(timer.snapshot(), snapshot);
    }

    #[test]
    fn load_keeps_state_on_corrupt_payload() {
        let storage = MemoryTimeStorage::with_data("{broken");
        let mut timer = Timer::with_storage(Box::new(storage), Box::new(JsonFormat));
        timer.start(&item(), 1.0).unwrap();
        assert!(matches!(timer.load(), Err(TimerError::InvalidData(_))));
        assert_eq!(timer.time_line().len(), 1);
    }

    #[test]
    fn load_keeps_state_on_invalid_snapshot() {
        let storage = MemoryTimeStorage::with_data(
            r#"{"timeLine":[],"extraTime":99.0,"extendedTime":-1.0}"#,
        );
        let mut timer = Timer::with_storage(Box::new(storage), Box::new(JsonFormat));
        timer.set_extra_time(5.0).unwrap();
        timer.start(&item(), 1.0).unwrap();

        assert!(matches!(timer.load(), Err(TimerError::InvalidData(_))));
        assert!(approx(timer.extra_time(), 5.0));
        assert_eq!(timer.time_line().len(), 1);
    }

    #[test]
    fn load_empty_storage_keeps_fresh_timer() {
        let mut timer =
            Timer::with_storage(Box::new(MemoryTimeStorage::new()), Box::new(JsonFormat));
        timer.load().unwrap();
        assert!(timer.time_line().is_empty());
    }

    #[test]
    fn delete_clears_state() {
        let mut timer =
            Timer::with_storage(Box::new(MemoryTimeStorage::new()), Box::new(JsonFormat));
        timer.start(&item(), 1.0).unwrap();
        timer.save().unwrap();
        assert!(timer.delete().unwrap());
        assert!(timer.time_line().is_empty());
        timer.load().unwrap();
        assert!(timer.time_line().is_empty());
    }
}
