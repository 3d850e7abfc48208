//! Serialization strategies for persisted timers.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::adjustment::AdjustmentMap;
use crate::error::TimerError;
use crate::time_line::TimeLine;
use crate::time_point::{PointType, Target, TimePoint};
use crate::types::ValidationError;

/// Everything a timer persists, serialized as one blob on each save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub time_line: TimeLine,
    #[serde(default)]
    pub extra_time: f64,
    #[serde(default)]
    pub extended_time: f64,
    #[serde(default)]
    pub consumed_extra_time: f64,
    #[serde(default)]
    pub adjustment_map: AdjustmentMap,
}

/// Encodes and decodes timer snapshots for a [`TimeStorage`](crate::TimeStorage).
pub trait TimeStorageFormat {
    /// Short name, as used in configuration.
    fn name(&self) -> &'static str;

    fn encode(&self, snapshot: &TimerSnapshot) -> Result<String, TimerError>;

    /// Decodes a payload; anything unreadable is [`TimerError::InvalidData`].
    fn decode(&self, payload: &str) -> Result<TimerSnapshot, TimerError>;
}

/// Plain JSON of the snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl TimeStorageFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, snapshot: &TimerSnapshot) -> Result<String, TimerError> {
        serde_json::to_string(snapshot)
            .map_err(|err| TimerError::InvalidData(format!("cannot encode timer: {err}")))
    }

    fn decode(&self, payload: &str) -> Result<TimerSnapshot, TimerError> {
        serde_json::from_str(payload)
            .map_err(|err| TimerError::InvalidData(format!("cannot decode timer: {err}")))
    }
}

/// JSON with a shared tag dictionary.
///
/// Every point of a session repeats the same section, part and test tags,
/// so points store indices into `tags` instead of the strings. Point types
/// and targets are stored as codes (1 = start/client, 2 = end/server).
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedFormat;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackedSnapshot {
    tags: Vec<String>,
    points: Vec<PackedPoint>,
    #[serde(default)]
    extra_time: f64,
    #[serde(default)]
    extended_time: f64,
    #[serde(default)]
    consumed_extra_time: f64,
    #[serde(default)]
    adjustment_map: AdjustmentMap,
}

/// `[timestamp, type, target, [tag indices]]`
#[derive(Serialize, Deserialize)]
struct PackedPoint(f64, u8, u8, Vec<usize>);

const fn kind_code(kind: PointType) -> u8 {
    match kind {
        PointType::Start => 1,
        PointType::End => 2,
    }
}

const fn target_code(target: Target) -> u8 {
    match target {
        Target::Client => 1,
        Target::Server => 2,
    }
}

impl TimeStorageFormat for PackedFormat {
    fn name(&self) -> &'static str {
        "packed"
    }

    fn encode(&self, snapshot: &TimerSnapshot) -> Result<String, TimerError> {
        let mut tags: Vec<String> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut points = Vec::with_capacity(snapshot.time_line.len());

        for point in &snapshot.time_line {
            let refs = point
                .tags()
                .iter()
                .map(|tag| {
                    *index.entry(tag.as_str()).or_insert_with(|| {
                        tags.push(tag.clone());
                        tags.len() - 1
                    })
                })
                .collect();
            points.push(PackedPoint(
                point.timestamp(),
                kind_code(point.kind()),
                target_code(point.target()),
                refs,
            ));
        }

        let packed = PackedSnapshot {
            tags,
            points,
            extra_time: snapshot.extra_time,
            extended_time: snapshot.extended_time,
            consumed_extra_time: snapshot.consumed_extra_time,
            adjustment_map: snapshot.adjustment_map.clone(),
        };
        serde_json::to_string(&packed)
            .map_err(|err| TimerError::InvalidData(format!("cannot encode timer: {err}")))
    }

    fn decode(&self, payload: &str) -> Result<TimerSnapshot, TimerError> {
        let packed: PackedSnapshot = serde_json::from_str(payload)
            .map_err(|err| TimerError::InvalidData(format!("cannot decode timer: {err}")))?;

        let mut time_line = TimeLine::new();
        for PackedPoint(timestamp, kind, target, refs) in packed.points {
            let kind = match kind {
                1 => PointType::Start,
                2 => PointType::End,
                other => {
                    return Err(TimerError::InvalidData(format!(
                        "unknown point type code {other}"
                    )));
                }
            };
            let target = match target {
                1 => Target::Client,
                2 => Target::Server,
                other => {
                    return Err(TimerError::InvalidData(format!(
                        "unknown target code {other}"
                    )));
                }
            };
            let tags = refs
                .into_iter()
                .map(|i| {
                    packed.tags.get(i).cloned().ok_or_else(|| {
                        TimerError::InvalidData(format!("tag index {i} out of range"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            time_line.add(TimePoint::new(tags, timestamp, kind, target)?);
        }

        Ok(TimerSnapshot {
            time_line,
            extra_time: packed.extra_time,
            extended_time: packed.extended_time,
            consumed_extra_time: packed.consumed_extra_time,
            adjustment_map: packed.adjustment_map,
        })
    }
}

/// Configurable choice of [`TimeStorageFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
    #[default]
    Json,
    Packed,
}

impl StorageFormat {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Packed => "packed",
        }
    }

    /// Instantiates the strategy.
    pub fn build(self) -> Box<dyn TimeStorageFormat> {
        match self {
            Self::Json => Box::new(JsonFormat),
            Self::Packed => Box::new(PackedFormat),
        }
    }
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "packed" => Ok(Self::Packed),
            _ => Err(ValidationError::InvalidValue {
                field: "storage format",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::AdjustmentAction;

    fn snapshot() -> TimerSnapshot {
        let tags = ["item-1#0", "item-1", "section-1", "part-1", "test-1"];
        let mut time_line = TimeLine::new();
        time_line.add(TimePoint::new(tags, 10.5, PointType::Start, Target::Server).unwrap());
        time_line.add(TimePoint::new(tags, 20.25, PointType::End, Target::Server).unwrap());
        time_line.add(TimePoint::new(tags, 12.0, PointType::Start, Target::Client).unwrap());
        time_line.add(TimePoint::new(tags, 18.75, PointType::End, Target::Client).unwrap());

        let mut adjustment_map = AdjustmentMap::new();
        adjustment_map.put("section-1", AdjustmentAction::Increase, 60);

        TimerSnapshot {
            time_line,
            extra_time: 30.0,
            extended_time: 1.5,
            consumed_extra_time: 2.0,
            adjustment_map,
        }
    }

    #[test]
    fn json_roundtrip() {
        let format = JsonFormat;
        let encoded = format.encode(&snapshot()).unwrap();
        assert_eq!(format.decode(&encoded).unwrap(), snapshot());
    }

    #[test]
    fn packed_roundtrip_shares_tags() {
        let format = PackedFormat;
        let encoded = format.encode(&snapshot()).unwrap();
        assert_eq!(encoded.matches("section-1").count(), 2, "{encoded}");
        assert_eq!(format.decode(&encoded).unwrap(), snapshot());
    }

    #[test]
    fn packed_layout() {
        let mut time_line = TimeLine::new();
        time_line.add(TimePoint::new(["a", "b"], 1.0, PointType::Start, Target::Server).unwrap());
        time_line.add(TimePoint::new(["a"], 2.0, PointType::End, Target::Client).unwrap());
        let encoded = PackedFormat
            .encode(&TimerSnapshot {
                time_line,
                ..TimerSnapshot::default()
            })
            .unwrap();
        insta::assert_snapshot!(encoded, @r#"{"tags":["a","b"],"points":[[1.0,1,2,[0,1]],[2.0,2,1,[0]]],"extraTime":0.0,"extendedTime":0.0,"consumedExtraTime":0.0,"adjustmentMap":{}}"#);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            JsonFormat.decode("not json"),
            Err(TimerError::InvalidData(_))
        ));
        assert!(matches!(
            PackedFormat.decode(r#"{"tags":[],"points":[[1.0,1,2,[3]]]}"#),
            Err(TimerError::InvalidData(_))
        ));
        assert!(matches!(
            PackedFormat.decode(r#"{"tags":[],"points":[[1.0,7,2,[]]]}"#),
            Err(TimerError::InvalidData(_))
        ));
        assert!(matches!(
            JsonFormat.decode(r#"{"timeLine":[{"ts":-1.0,"type":"start","target":"server","tags":[]}]}"#),
            Err(TimerError::InvalidData(_))
        ));
    }

    #[test]
    fn json_accepts_minimal_payload() {
        let decoded = JsonFormat.decode(r#"{"timeLine":[]}"#).unwrap();
        assert_eq!(decoded, TimerSnapshot::default());
    }

    #[test]
    fn storage_format_selection() {
        assert_eq!("packed".parse::<StorageFormat>().unwrap(), StorageFormat::Packed);
        assert_eq!(StorageFormat::Json.build().name(), "json");
        assert_eq!(StorageFormat::Packed.build().name(), "packed");
        assert!("xml".parse::<StorageFormat>().is_err());
    }
}
