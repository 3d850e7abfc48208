//! Manual time adjustments granted per component.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

/// Direction of a manual adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentAction {
    Increase,
    Decrease,
}

impl AdjustmentAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }
}

impl fmt::Display for AdjustmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjustmentAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "increase" => Ok(Self::Increase),
            "decrease" => Ok(Self::Decrease),
            _ => Err(ValidationError::InvalidValue {
                field: "adjustment action",
                value: s.to_string(),
            }),
        }
    }
}

/// Accumulated seconds added and removed for one component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustment {
    pub increase: u64,
    pub decrease: u64,
}

impl Adjustment {
    /// Net effect in seconds, negative when more time was removed than added.
    pub fn net(&self) -> i64 {
        let increase = i64::try_from(self.increase).unwrap_or(i64::MAX);
        let decrease = i64::try_from(self.decrease).unwrap_or(i64::MAX);
        increase.saturating_sub(decrease)
    }
}

/// Proctor adjustments keyed by source identifier.
///
/// Both accumulators only grow, so every adjustment stays visible and the
/// net value is reversible by an opposite adjustment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdjustmentMap {
    entries: BTreeMap<String, Adjustment>,
}

impl AdjustmentMap {
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Adds `seconds` to the chosen accumulator of `source_id`.
    ///
    /// Returns `false` without recording anything when the source is empty
    /// or `seconds` is zero.
    pub fn put(&mut self, source_id: &str, action: AdjustmentAction, seconds: u64) -> bool {
        if source_id.is_empty() || seconds == 0 {
            return false;
        }
        let entry = self.entries.entry(source_id.to_string()).or_default();
        match action {
            AdjustmentAction::Increase => entry.increase = entry.increase.saturating_add(seconds),
            AdjustmentAction::Decrease => entry.decrease = entry.decrease.saturating_add(seconds),
        }
        true
    }

    /// Net adjustment in seconds, 0 for unknown sources.
    pub fn get(&self, source_id: &str) -> i64 {
        self.entries.get(source_id).map_or(0, Adjustment::net)
    }

    pub fn entry(&self, source_id: &str) -> Option<&Adjustment> {
        self.entries.get(source_id)
    }

    pub fn remove(&mut self, source_id: &str) -> bool {
        self.entries.remove(source_id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Adjustment)> {
        self.entries.iter().map(|(id, adjustment)| (id.as_str(), adjustment))
    }
}
