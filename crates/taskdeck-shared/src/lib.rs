use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{
  Deserialize,
  Serialize
};

pub type TaskId = i64;
pub type SubtaskId = i64;
pub type TagId = i64;

/// Color the backend assigns to a tag
/// created without one.
pub const BACKEND_TAG_COLOR: &str =
  "#007AFF";

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  Low,
  #[default]
  Medium,
  High
}

impl Priority {
  pub const ALL: [Priority; 3] = [
    Priority::Low,
    Priority::Medium,
    Priority::High
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | Priority::Low => "low",
      | Priority::Medium => "medium",
      | Priority::High => "high"
    }
  }
}

impl fmt::Display for Priority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Priority {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "low" | "l" => Ok(Priority::Low),
      | "medium" | "m" => {
        Ok(Priority::Medium)
      }
      | "high" | "h" => {
        Ok(Priority::High)
      }
      | other => Err(format!(
        "unknown priority: {other} \
         (expected low, medium or \
         high)"
      ))
    }
  }
}

fn backend_tag_color() -> String {
  BACKEND_TAG_COLOR.to_string()
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct Tag {
  pub id:    TagId,
  pub name:  String,
  #[serde(default = "backend_tag_color")]
  pub color: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct Subtask {
  /// `None` until the backend has
  /// persisted the subtask.
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub id:             Option<SubtaskId>,
  #[serde(default)]
  pub title:          String,
  #[serde(default)]
  pub completed:      bool,
  #[serde(default)]
  pub position:       i64,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub parent_todo_id: Option<TaskId>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub created_at:     Option<NaiveDateTime>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct Task {
  pub id:          TaskId,
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub completed:   bool,
  #[serde(default)]
  pub priority:    Priority,
  #[serde(default)]
  pub due_date:    Option<NaiveDateTime>,
  #[serde(default)]
  pub position:    i64,
  #[serde(default)]
  pub tags:        Vec<Tag>,
  #[serde(default)]
  pub subtasks:    Vec<Subtask>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub created_at:  Option<NaiveDateTime>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub updated_at:  Option<NaiveDateTime>
}

impl Task {
  pub fn has_tag(
    &self,
    tag_id: TagId
  ) -> bool {
    self
      .tags
      .iter()
      .any(|tag| tag.id == tag_id)
  }

  pub fn tag_ids(&self) -> Vec<TagId> {
    self
      .tags
      .iter()
      .map(|tag| tag.id)
      .collect()
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct SubtaskPayload {
  pub title:     String,
  pub completed: bool,
  pub position:  i64
}

impl From<&Subtask> for SubtaskPayload {
  fn from(subtask: &Subtask) -> Self {
    Self {
      title:     subtask.title.clone(),
      completed: subtask.completed,
      position:  subtask.position
    }
  }
}

/// Body of `POST /todos/` and
/// `PUT /todos/{id}`.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskPayload {
  pub title:       String,
  pub description: Option<String>,
  pub priority:    Priority,
  pub due_date:    Option<NaiveDateTime>,
  pub tag_ids:     Vec<TagId>,
  pub subtasks:    Vec<SubtaskPayload>
}

/// Body of `POST /tags/`.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TagPayload {
  pub name:  String,
  pub color: String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct HealthStatus {
  pub status: String
}
