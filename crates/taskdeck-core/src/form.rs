use anyhow::anyhow;
use chrono::NaiveDateTime;
use taskdeck_shared::{
    Priority, Subtask, SubtaskPayload, TagId, TagPayload, Task, TaskId, TaskPayload,
};

pub const DEFAULT_TAG_COLOR: &str = "#6366f1";

/// Edit buffer behind the task editor. Tags are held as ids; full tag
/// objects only come back with the next fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskForm {
    pub id: Option<TaskId>,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDateTime>,
    pub tag_ids: Vec<TagId>,
    pub subtasks: Vec<Subtask>,
}

impl TaskForm {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: Some(task.id),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            priority: task.priority,
            due_date: task.due_date,
            tag_ids: task.tag_ids(),
            subtasks: task.subtasks.clone(),
        }
    }

    pub fn add_subtask(&mut self) {
        let position = self.subtasks.len() as i64;
        self.subtasks.push(Subtask {
            position,
            ..Subtask::default()
        });
    }

    pub fn remove_subtask(&mut self, index: usize) -> Option<Subtask> {
        if index < self.subtasks.len() {
            Some(self.subtasks.remove(index))
        } else {
            None
        }
    }

    /// Checkbox semantics: adds the id when absent, removes it otherwise.
    pub fn toggle_tag(&mut self, tag_id: TagId) {
        if let Some(idx) = self.tag_ids.iter().position(|id| *id == tag_id) {
            self.tag_ids.remove(idx);
        } else {
            self.tag_ids.push(tag_id);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.title.trim().is_empty() {
            return Err(anyhow!("task title is required"));
        }
        Ok(())
    }

    pub fn to_payload(&self) -> TaskPayload {
        let description = if self.description.is_empty() {
            None
        } else {
            Some(self.description.clone())
        };

        TaskPayload {
            title: self.title.clone(),
            description,
            priority: self.priority,
            due_date: self.due_date,
            tag_ids: self.tag_ids.clone(),
            subtasks: self.subtasks.iter().map(SubtaskPayload::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagForm {
    pub name: String,
    pub color: String,
}

impl Default for TagForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            color: DEFAULT_TAG_COLOR.to_string(),
        }
    }
}

impl TagForm {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("tag name is required"));
        }
        if self.name.chars().count() > 50 {
            return Err(anyhow!("tag name is longer than 50 characters"));
        }
        Ok(())
    }

    pub fn to_payload(&self) -> TagPayload {
        TagPayload {
            name: self.name.clone(),
            color: self.color.clone(),
        }
    }
}
