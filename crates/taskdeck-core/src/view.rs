use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDateTime;
use taskdeck_shared::{
  Priority,
  Tag,
  TagId,
  Task
};
use tracing::trace;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum StatusFilter {
  #[default]
  All,
  Active,
  Completed
}

impl StatusFilter {
  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | StatusFilter::All => true,
      | StatusFilter::Active => {
        !task.completed
      }
      | StatusFilter::Completed => {
        task.completed
      }
    }
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(match self {
      | StatusFilter::All => "all",
      | StatusFilter::Active => "active",
      | StatusFilter::Completed => {
        "completed"
      }
    })
  }
}

impl FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(StatusFilter::All),
      | "active" | "open" => {
        Ok(StatusFilter::Active)
      }
      | "completed" | "done" => {
        Ok(StatusFilter::Completed)
      }
      | other => Err(anyhow!(
        "unknown status filter: \
         {other}"
      ))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum PriorityFilter {
  #[default]
  All,
  Only(Priority)
}

impl PriorityFilter {
  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | PriorityFilter::All => true,
      | PriorityFilter::Only(p) => {
        task.priority == p
      }
    }
  }
}

impl fmt::Display for PriorityFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | PriorityFilter::All => {
        f.write_str("all")
      }
      | PriorityFilter::Only(p) => {
        write!(f, "{p}")
      }
    }
  }
}

impl FromStr for PriorityFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all")
    {
      return Ok(PriorityFilter::All);
    }
    s.parse::<Priority>()
      .map(PriorityFilter::Only)
      .map_err(|e| anyhow!(e))
  }
}

/// Inputs of the visible task list.
/// Every field at its default value
/// leaves the collection untouched
/// apart from the position sort.
#[derive(Debug, Clone, Default)]
pub struct ViewFilter<'a> {
  pub status:   StatusFilter,
  pub priority: PriorityFilter,
  pub tag:      Option<&'a Tag>,
  pub search:   &'a str
}

impl ViewFilter<'_> {
  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    if !self.status.matches(task) {
      return false;
    }

    if !self.priority.matches(task) {
      return false;
    }

    if let Some(tag) = self.tag
      && !task.has_tag(tag.id)
    {
      return false;
    }

    if !self.search.is_empty() {
      let q = self.search.to_lowercase();
      let title_match = task
        .title
        .to_lowercase()
        .contains(&q);
      let description_match = task
        .description
        .as_deref()
        .is_some_and(|d| {
          d.to_lowercase().contains(&q)
        });
      if !title_match
        && !description_match
      {
        return false;
      }
    }

    true
  }
}

#[tracing::instrument(
  level = "trace",
  skip(tasks, filter)
)]
pub fn visible_tasks<'t>(
  tasks: &'t [Task],
  filter: &ViewFilter<'_>
) -> Vec<&'t Task> {
  let mut visible: Vec<&Task> = tasks
    .iter()
    .filter(|task| filter.matches(task))
    .collect();
  visible.sort_by_key(|task| task.position);

  trace!(
    total = tasks.len(),
    visible = visible.len(),
    status = %filter.status,
    priority = %filter.priority,
    tag = ?filter.tag.map(|t| t.id),
    "recomputed visible tasks"
  );
  visible
}

pub fn active_count(
  tasks: &[Task]
) -> usize {
  tasks
    .iter()
    .filter(|task| !task.completed)
    .count()
}

pub fn completed_count(
  tasks: &[Task]
) -> usize {
  tasks
    .iter()
    .filter(|task| task.completed)
    .count()
}

pub fn task_count_by_tag(
  tasks: &[Task],
  tag_id: TagId
) -> usize {
  tasks
    .iter()
    .filter(|task| task.has_tag(tag_id))
    .count()
}

pub fn priority_label(
  priority: Priority
) -> &'static str {
  match priority {
    | Priority::Low => "Low",
    | Priority::Medium => "Medium",
    | Priority::High => "High"
  }
}

pub fn is_overdue(
  due: Option<NaiveDateTime>,
  now: NaiveDateTime
) -> bool {
  due.is_some_and(|due| due < now)
}

/// `Feb 16, 2026, 05:00 AM`; empty when
/// there is no due date.
pub fn format_due(
  due: Option<NaiveDateTime>
) -> String {
  due
    .map(|due| {
      due
        .format("%b %-d, %Y, %I:%M %p")
        .to_string()
    })
    .unwrap_or_default()
}
