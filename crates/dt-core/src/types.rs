//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A timestamp was negative or not a finite number.
    #[error("timestamp must be a finite, non-negative number of seconds, got {value}")]
    InvalidTimestamp { value: f64 },

    /// A duration was negative or not a finite number.
    #[error("{field} must be a finite, non-negative number of seconds, got {value}")]
    InvalidDuration { field: &'static str, value: f64 },

    /// Unknown enum value in external input.
    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated test-taker identifier.
    UserId, "user ID"
);

define_string_id!(
    /// A validated test session identifier.
    ///
    /// Together with a [`UserId`] it keys one stored timer.
    SessionId, "session ID"
);

define_string_id!(
    /// A validated identifier of a time-limited component (item, section,
    /// test part or test).
    SourceId, "source ID"
);

/// Checks that a value is usable as a timestamp in seconds.
pub fn validate_timestamp(value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::InvalidTimestamp { value })
    }
}

/// Checks that a value is usable as a duration in seconds.
pub fn validate_duration(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::InvalidDuration { field, value })
    }
}

/// Test-part navigation mode.
///
/// Minimum time limits are only meaningful in linear navigation, where the
/// candidate cannot come back to a component once it has been left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    #[default]
    Linear,
    #[serde(rename = "nonlinear")]
    NonLinear,
}

impl NavigationMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::NonLinear => "nonlinear",
        }
    }
}

impl fmt::Display for NavigationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NavigationMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "nonlinear" => Ok(Self::NonLinear),
            _ => Err(ValidationError::InvalidValue {
                field: "navigation mode",
                value: s.to_string(),
            }),
        }
    }
}
