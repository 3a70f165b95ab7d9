//! Task domain type
//!
//! A Task owns its subtasks and attached resources outright; dropping the
//! Task drops them with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::id::{self, generate_id};
use super::priority::Priority;
use super::status::Status;

/// Category used when none (or a blank one) is supplied
pub const DEFAULT_CATEGORY: &str = "General";

/// A user-visible unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, stable for the task's lifetime
    pub id: String,

    /// Non-empty title (`text` on the wire for older clients)
    #[serde(alias = "text")]
    pub title: String,

    /// Free-form category label
    pub category: String,

    pub priority: Priority,

    pub status: Status,

    /// Set once at creation
    pub created_at: DateTime<Utc>,

    /// User-set due date (not validated against `created_at`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Checklist items in display order
    #[serde(default)]
    pub subtasks: Vec<Subtask>,

    /// Attached references in insertion order
    #[serde(default)]
    pub information: Vec<ResourceItem>,
}

impl Task {
    /// Create a new Task with defaults and a generated ID
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: generate_id(id::TASK),
            title: title.into(),
            category: DEFAULT_CATEGORY.to_string(),
            priority: Priority::default(),
            status: Status::default(),
            created_at: Utc::now(),
            due_date: None,
            notes: None,
            description: None,
            subtasks: Vec::new(),
            information: Vec::new(),
        }
    }

    /// Build a Task from partial fields, applying defaults
    ///
    /// Returns None when the title is blank.
    pub fn from_new(new: NewTask) -> Option<Self> {
        if new.title.trim().is_empty() {
            return None;
        }

        let mut task = Self::new(new.title).with_category(new.category.unwrap_or_default());
        task.priority = new.priority.unwrap_or_default();
        task.notes = new.notes;
        task.description = new.description;
        task.due_date = new.due_date;
        Some(task)
    }

    /// Builder method to set the category (blank falls back to "General")
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = normalize_category(category.into());
        self
    }

    /// Builder method to set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder method to set notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builder method to set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Merge a patch into this Task; `id` and `created_at` never change
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title
            && !title.trim().is_empty()
        {
            self.title = title;
        }
        if let Some(category) = patch.category {
            self.category = normalize_category(category);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes);
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
    }

    /// Advance status along `todo -> in-progress -> done -> todo`
    pub fn cycle_status(&mut self) {
        self.status = self.status.next();
    }

    /// Append a subtask; blank text is rejected
    pub fn add_subtask(&mut self, text: &str) -> Option<&Subtask> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.subtasks.push(Subtask::new(text));
        self.subtasks.last()
    }

    /// Flip a subtask's completion flag
    pub fn toggle_subtask(&mut self, subtask_id: &str) -> bool {
        match self.subtasks.iter_mut().find(|s| s.id == subtask_id) {
            Some(subtask) => {
                subtask.completed = !subtask.completed;
                true
            }
            None => false,
        }
    }

    /// Remove a subtask
    pub fn delete_subtask(&mut self, subtask_id: &str) -> bool {
        let before = self.subtasks.len();
        self.subtasks.retain(|s| s.id != subtask_id);
        self.subtasks.len() != before
    }

    /// Attach a resource; blank title or content is rejected
    pub fn add_resource(&mut self, resource: NewResource) -> Option<&ResourceItem> {
        let item = ResourceItem::from_new(resource)?;
        self.information.push(item);
        self.information.last()
    }

    /// Remove a resource
    pub fn delete_resource(&mut self, resource_id: &str) -> bool {
        let before = self.information.len();
        self.information.retain(|r| r.id != resource_id);
        self.information.len() != before
    }

    /// Completed/total subtask counts
    pub fn subtask_progress(&self) -> SubtaskProgress {
        let completed = self.subtasks.iter().filter(|s| s.completed).count();
        SubtaskProgress {
            completed,
            total: self.subtasks.len(),
        }
    }
}

fn normalize_category(category: String) -> String {
    if category.trim().is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        category
    }
}

/// Child checklist item owned by one Task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: generate_id(id::SUBTASK),
            text: text.into(),
            completed: false,
        }
    }
}

/// Subtask completion summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubtaskProgress {
    pub completed: usize,
    pub total: usize,
}

impl SubtaskProgress {
    /// Completion percentage; 0 when there are no subtasks
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }
}

/// Kind of supplementary reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[default]
    Note,
    Link,
    Document,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Note => write!(f, "note"),
            Self::Link => write!(f, "link"),
            Self::Document => write!(f, "document"),
        }
    }
}

/// Supplementary reference attached to a Task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceItem {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    /// Only present for `link` resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ResourceItem {
    /// Validate and build a resource; trims title and content, drops `url` unless it is a link
    pub fn from_new(new: NewResource) -> Option<Self> {
        let title = new.title.trim();
        let content = new.content.trim();
        if title.is_empty() || content.is_empty() {
            return None;
        }

        let url = match new.kind {
            ResourceKind::Link => new.url,
            _ => None,
        };

        Some(Self {
            id: generate_id(id::RESOURCE),
            title: title.to_string(),
            content: content.to_string(),
            kind: new.kind,
            url,
        })
    }
}

/// Fields accepted when creating a Task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(alias = "text")]
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update for a Task; absent fields are left unchanged
///
/// `due_date: Some(None)` (JSON `null`) clears the due date.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, alias = "text")]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Distinguish an explicit `null` from an absent field
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Fields accepted when attaching a resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewResource {
    pub title: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: ResourceKind,
    #[serde(default)]
    pub url: Option<String>,
}
