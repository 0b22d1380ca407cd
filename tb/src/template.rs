//! Thought template domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one storage slot (the record's file name, e.g. `3.json`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A generalized problem-solving strategy distilled from one question/answer pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThoughtTemplate {
    /// Short searchable label
    pub title: String,
    /// Free-text strategy
    pub content: String,
    /// Storage slot; `None` for a candidate that has not been persisted
    pub slot: Option<SlotId>,
}

impl ThoughtTemplate {
    /// Create an unsaved candidate
    pub fn candidate(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            slot: None,
        }
    }

    /// Create a template that lives in `slot`
    pub fn stored(title: impl Into<String>, content: impl Into<String>, slot: SlotId) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            slot: Some(slot),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.slot.is_some()
    }

    /// The at-rest shape of this template
    pub fn to_record(&self) -> TemplateRecord {
        TemplateRecord {
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }
}

/// On-disk record: exactly a title and a content string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub title: String,
    pub content: String,
}

impl TemplateRecord {
    pub fn into_template(self, slot: SlotId) -> ThoughtTemplate {
        ThoughtTemplate::stored(self.title, self.content, slot)
    }
}
