//! Timestamped range boundaries.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{ValidationError, validate_timestamp};

/// Whether a point opens or closes a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointType {
    Start,
    End,
}

impl PointType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The clock a point was measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Client,
    #[default]
    Server,
}

impl Target {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            _ => Err(ValidationError::InvalidValue {
                field: "target",
                value: s.to_string(),
            }),
        }
    }
}

/// Current wall-clock time in seconds, with microsecond precision.
#[expect(
    clippy::cast_precision_loss,
    reason = "microsecond timestamps fit in the f64 mantissa for the next few centuries"
)]
pub fn now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// An immutable marker of a range boundary.
///
/// The tags identify the logical range a point belongs to. The first tag is
/// the point's reference: points sharing it form one range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTimePoint")]
pub struct TimePoint {
    #[serde(rename = "ts")]
    timestamp: f64,
    #[serde(rename = "type")]
    kind: PointType,
    target: Target,
    tags: Vec<String>,
}

/// Unvalidated wire form of a [`TimePoint`].
#[derive(Deserialize)]
struct RawTimePoint {
    ts: f64,
    #[serde(rename = "type")]
    kind: PointType,
    target: Target,
    #[serde(default)]
    tags: Vec<String>,
}

impl TryFrom<RawTimePoint> for TimePoint {
    type Error = ValidationError;

    fn try_from(raw: RawTimePoint) -> Result<Self, Self::Error> {
        Self::new(raw.tags, raw.ts, raw.kind, raw.target)
    }
}

impl TimePoint {
    /// Creates a point, rejecting negative or non-finite timestamps.
    pub fn new(
        tags: impl IntoIterator<Item = impl Into<String>>,
        timestamp: f64,
        kind: PointType,
        target: Target,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            timestamp: validate_timestamp(timestamp)?,
            kind,
            target,
            tags: tags.into_iter().map(Into::into).collect(),
        })
    }

    pub const fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub const fn kind(&self) -> PointType {
        self.kind
    }

    pub const fn target(&self) -> Target {
        self.target
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The tag identifying the range this point belongs to.
    pub fn reference(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    /// Checks the point against a filter.
    ///
    /// An empty tag list matches any point, otherwise at least one tag must
    /// be shared. `None` for target or kind matches both values.
    pub fn matches(&self, tags: &[&str], target: Option<Target>, kind: Option<PointType>) -> bool {
        if target.is_some_and(|t| t != self.target) {
            return false;
        }
        if kind.is_some_and(|k| k != self.kind) {
            return false;
        }
        tags.is_empty() || self.tags.iter().any(|tag| tags.contains(&tag.as_str()))
    }

    /// Chronological ordering.
    ///
    /// Points at the same instant compare equal: ranges are appended in
    /// order, so a stable sort keeps a zero-length start/end pair and a
    /// range closing as the next one opens in their recorded order.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.timestamp.total_cmp(&other.timestamp)
    }

    /// Copy of this point with another type.
    pub(crate) fn retyped(&self, kind: PointType) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }

    /// Copy of this point moved to another instant.
    pub(crate) fn moved_to(&self, timestamp: f64) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6} {} {} [{}]",
            self.timestamp,
            self.target,
            self.kind,
            self.tags.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(ts: f64, kind: PointType) -> TimePoint {
        TimePoint::new(["item-1#0", "item-1", "section-1"], ts, kind, Target::Server).unwrap()
    }

    #[test]
    fn rejects_negative_timestamp() {
        let result = TimePoint::new(["a"], -1.0, PointType::Start, Target::Server);
        assert!(result.is_err());
    }

    #[test]
    fn matches_any_tag() {
        let p = point(1.0, PointType::Start);
        assert!(p.matches(&[], None, None));
        assert!(p.matches(&["section-1"], None, None));
        assert!(p.matches(&["other", "item-1"], None, None));
        assert!(!p.matches(&["other"], None, None));
    }

    #[test]
    fn matches_target_and_type() {
        let p = point(1.0, PointType::Start);
        assert!(p.matches(&["item-1"], Some(Target::Server), Some(PointType::Start)));
        assert!(!p.matches(&["item-1"], Some(Target::Client), None));
        assert!(!p.matches(&["item-1"], None, Some(PointType::End)));
    }

    #[test]
    fn reference_is_first_tag() {
        assert_eq!(point(0.0, PointType::Start).reference(), Some("item-1#0"));
        let untagged =
            TimePoint::new(Vec::<String>::new(), 0.0, PointType::Start, Target::Client).unwrap();
        assert_eq!(untagged.reference(), None);
    }

    #[test]
    fn compare_ties_keep_recorded_order() {
        let start = point(5.0, PointType::Start);
        let end = point(5.0, PointType::End);
        assert_eq!(end.compare(&start), Ordering::Equal);
        assert_eq!(point(4.0, PointType::Start).compare(&end), Ordering::Less);

        let mut points = vec![start.clone(), end.clone()];
        points.sort_by(TimePoint::compare);
        assert_eq!(points, vec![start, end]);
    }

    #[test]
    fn serializes_to_structural_form() {
        let json = serde_json::to_string(&point(1.5, PointType::End)).unwrap();
        assert_eq!(
            json,
            r#"{"ts":1.5,"type":"end","target":"server","tags":["item-1#0","item-1","section-1"]}"#
        );
        let parsed: TimePoint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, point(1.5, PointType::End));
    }

    #[test]
    fn deserialization_validates_timestamp() {
        let json = r#"{"ts":-2.0,"type":"start","target":"client","tags":[]}"#;
        let result: Result<TimePoint, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn target_from_str() {
        assert_eq!("client".parse::<Target>().unwrap(), Target::Client);
        assert_eq!("server".parse::<Target>().unwrap(), Target::Server);
        assert!("both".parse::<Target>().is_err());
    }
}
