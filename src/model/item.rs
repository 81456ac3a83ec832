use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::partition::Partition;

/// Built-in status lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStatus {
    Wait,
    InProgress,
    Complete,
}

impl BuiltinStatus {
    /// Display label for the lane header
    pub fn label(self) -> &'static str {
        match self {
            BuiltinStatus::Wait => "Waiting",
            BuiltinStatus::InProgress => "In Progress",
            BuiltinStatus::Complete => "Complete",
        }
    }
}

/// Item priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

/// A board item with all its display fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Opaque unique ID assigned by the store
    pub id: String,
    pub title: String,
    /// The lane this item belongs to — exactly one kind at a time
    pub partition: Partition,
    pub priority: Priority,
    /// Ascending display order within the partition. Unique per partition;
    /// gaps are fine, only order matters.
    pub position: i64,
    pub due_date: Option<DateTime<Utc>>,
    /// Inclusion in the "today" view, independent of the due date
    pub today_pinned: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Create a new item in the Wait lane with default priority.
    /// The position is assigned when the item is inserted into a board.
    pub fn new(id: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Item {
            id: id.into(),
            title: title.into(),
            partition: Partition::Builtin(BuiltinStatus::Wait),
            priority: Priority::Medium,
            position: 0,
            due_date: None,
            today_pinned: None,
            tags: Vec::new(),
            created_at: now,
        }
    }

    /// True when the item sits in the built-in Complete lane
    pub fn is_complete(&self) -> bool {
        self.partition == Partition::Builtin(BuiltinStatus::Complete)
    }
}
