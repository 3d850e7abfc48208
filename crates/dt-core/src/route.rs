//! Test structure seen by the timer: item references and time-limited
//! components.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{NavigationMode, SourceId, ValidationError, validate_duration};

/// Position of one item occurrence in the test.
///
/// Produces the tags attached to every point recorded for the item. The
/// first tag is the occurrence-qualified item id, which delimits the item's
/// range in a time line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub item_id: String,
    pub occurrence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_part_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl ItemRef {
    pub fn new(item_id: impl Into<String>, occurrence: u32) -> Self {
        Self {
            item_id: item_id.into(),
            occurrence,
            section_id: None,
            test_part_id: None,
            test_id: None,
            href: None,
        }
    }

    #[must_use]
    pub fn in_section(mut self, section_id: impl Into<String>) -> Self {
        self.section_id = Some(section_id.into());
        self
    }

    #[must_use]
    pub fn in_test_part(mut self, test_part_id: impl Into<String>) -> Self {
        self.test_part_id = Some(test_part_id.into());
        self
    }

    #[must_use]
    pub fn in_test(mut self, test_id: impl Into<String>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }

    #[must_use]
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// The range reference, `item#occurrence`.
    pub fn reference(&self) -> String {
        format!("{}#{}", self.item_id, self.occurrence)
    }

    pub fn tags(&self) -> Vec<String> {
        let mut tags = vec![self.reference(), self.item_id.clone()];
        tags.extend(
            [
                &self.section_id,
                &self.test_part_id,
                &self.test_id,
                &self.href,
            ]
            .into_iter()
            .flatten()
            .cloned(),
        );
        tags
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference())
    }
}

/// Configured time limits of a component, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time: Option<f64>,
    #[serde(default)]
    pub allow_late_submission: bool,
}

impl TimeLimits {
    pub const fn has_min_time(&self) -> bool {
        self.min_time.is_some()
    }

    pub const fn has_max_time(&self) -> bool {
        self.max_time.is_some()
    }
}

/// A component that can carry time limits.
///
/// This trait lets constraints work with the caller's own test model.
pub trait TimeLimited {
    fn identifier(&self) -> &str;

    /// QTI class of the component, reported to the client.
    fn qti_class_name(&self) -> &str;

    fn label(&self) -> Option<&str> {
        None
    }

    fn time_limits(&self) -> Option<&TimeLimits>;

    fn max_time(&self) -> Option<f64> {
        self.time_limits().and_then(|limits| limits.max_time)
    }

    fn min_time(&self) -> Option<f64> {
        self.time_limits().and_then(|limits| limits.min_time)
    }
}

/// The four levels a time limit can be declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Item,
    Section,
    TestPart,
    Test,
}

impl Scope {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Section => "section",
            Self::TestPart => "test_part",
            Self::Test => "test",
        }
    }

    #[must_use]
    pub const fn qti_class_name(&self) -> &'static str {
        match self {
            Self::Item => "assessmentItemRef",
            Self::Section => "assessmentSection",
            Self::TestPart => "testPart",
            Self::Test => "assessmentTest",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plain time-limited component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedComponent {
    pub identifier: SourceId,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limits: Option<TimeLimits>,
}

impl ScopedComponent {
    pub fn new(scope: Scope, identifier: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            identifier: SourceId::new(identifier)?,
            scope,
            label: None,
            time_limits: None,
        })
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_max_time(mut self, seconds: f64) -> Result<Self, ValidationError> {
        let seconds = validate_duration("max time", seconds)?;
        self.time_limits.get_or_insert_with(TimeLimits::default).max_time = Some(seconds);
        Ok(self)
    }

    pub fn with_min_time(mut self, seconds: f64) -> Result<Self, ValidationError> {
        let seconds = validate_duration("min time", seconds)?;
        self.time_limits.get_or_insert_with(TimeLimits::default).min_time = Some(seconds);
        Ok(self)
    }

    #[must_use]
    pub fn allowing_late_submission(mut self) -> Self {
        self.time_limits
            .get_or_insert_with(TimeLimits::default)
            .allow_late_submission = true;
        self
    }
}

impl TimeLimited for ScopedComponent {
    fn identifier(&self) -> &str {
        self.identifier.as_str()
    }

    fn qti_class_name(&self) -> &str {
        self.scope.qti_class_name()
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn time_limits(&self) -> Option<&TimeLimits> {
        self.time_limits.as_ref()
    }
}

/// Where the candidate currently is: the item occurrence and its enclosing
/// section, test part and test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePosition {
    pub item_ref: ItemRef,
    pub item: ScopedComponent,
    pub section: ScopedComponent,
    pub test_part: ScopedComponent,
    pub test: ScopedComponent,
    #[serde(default)]
    pub navigation_mode: NavigationMode,
}

impl RoutePosition {
    /// Builds a position; the item reference is derived from the components.
    pub fn new(
        item: ScopedComponent,
        occurrence: u32,
        section: ScopedComponent,
        test_part: ScopedComponent,
        test: ScopedComponent,
        navigation_mode: NavigationMode,
    ) -> Self {
        let item_ref = ItemRef::new(item.identifier.as_str(), occurrence)
            .in_section(section.identifier.as_str())
            .in_test_part(test_part.identifier.as_str())
            .in_test(test.identifier.as_str());
        Self {
            item_ref,
            item,
            section,
            test_part,
            test,
            navigation_mode,
        }
    }

    /// Components from the innermost (item) to the outermost (test).
    pub const fn components(&self) -> [&ScopedComponent; 4] {
        [&self.item, &self.section, &self.test_part, &self.test]
    }

    pub fn component(&self, identifier: &str) -> Option<&ScopedComponent> {
        self.components()
            .into_iter()
            .find(|component| component.identifier.as_str() == identifier)
    }
}
