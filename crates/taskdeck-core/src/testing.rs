//! In-memory backend and scripted host shared by the store and command tests.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};

use anyhow::anyhow;
use taskdeck_shared::{
    HealthStatus, Priority, Subtask, SubtaskId, Tag, TagId, TagPayload, Task, TaskId, TaskPayload,
};

use crate::api::Backend;
use crate::host::Host;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ListTasks,
    GetTask(TaskId),
    CreateTask(TaskPayload),
    UpdateTask(TaskId, TaskPayload),
    ToggleTask(TaskId),
    DeleteTask(TaskId),
    ToggleSubtask(TaskId, SubtaskId),
    Reorder(Vec<TaskId>),
    ListTags,
    CreateTag(TagPayload),
    DeleteTag(TagId),
    Health,
}

impl Request {
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Request::ListTasks
                | Request::GetTask(_)
                | Request::ListTags
                | Request::Health
        )
    }
}

#[derive(Debug, Default)]
struct FakeState {
    tasks: Vec<Task>,
    tags: Vec<Tag>,
    next_id: i64,
    requests: Vec<Request>,
    failing: HashSet<&'static str>,
}

/// Behaves like the real service: assigns ids and positions, resolves tag ids
/// into full tags, and serves the current state on every list call.
#[derive(Debug, Default)]
pub struct FakeBackend {
    state: RefCell<FakeState>,
}

impl FakeBackend {
    pub fn with_data(tasks: Vec<Task>, tags: Vec<Tag>) -> Self {
        let next_id = tasks
            .iter()
            .map(|t| t.id)
            .chain(tags.iter().map(|t| t.id))
            .chain(tasks.iter().flat_map(|t| t.subtasks.iter().filter_map(|s| s.id)))
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            state: RefCell::new(FakeState {
                tasks,
                tags,
                next_id,
                ..FakeState::default()
            }),
        }
    }

    /// Makes every call of the named operation fail until cleared.
    pub fn fail(&self, operation: &'static str) {
        self.state.borrow_mut().failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.state.borrow_mut().failing.remove(operation);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.borrow().requests.clone()
    }

    pub fn mutations(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(Request::is_mutation)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state.borrow_mut().requests.clear();
    }

    pub fn server_tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    fn record(&self, operation: &'static str, request: Request) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        state.requests.push(request);
        if state.failing.contains(operation) {
            return Err(anyhow!("{operation}: connection refused"));
        }
        Ok(())
    }

    fn build_task(state: &mut FakeState, id: TaskId, payload: &TaskPayload) -> Task {
        let tags = state
            .tags
            .iter()
            .filter(|tag| payload.tag_ids.contains(&tag.id))
            .cloned()
            .collect();
        let mut subtasks = Vec::with_capacity(payload.subtasks.len());
        for sub in &payload.subtasks {
            let sub_id = state.next_id;
            state.next_id += 1;
            subtasks.push(Subtask {
                id: Some(sub_id),
                title: sub.title.clone(),
                completed: sub.completed,
                position: sub.position,
                parent_todo_id: Some(id),
                created_at: None,
            });
        }
        Task {
            id,
            title: payload.title.clone(),
            description: payload.description.clone(),
            completed: false,
            priority: payload.priority,
            due_date: payload.due_date,
            position: 0,
            tags,
            subtasks,
            created_at: None,
            updated_at: None,
        }
    }
}

fn not_found(what: &str, id: i64) -> anyhow::Error {
    anyhow!("HTTP 404 Not Found: {what} {id} not found")
}

impl Backend for FakeBackend {
    async fn list_tasks(&self) -> anyhow::Result<Vec<Task>> {
        self.record("list_tasks", Request::ListTasks)?;
        let mut tasks = self.state.borrow().tasks.clone();
        tasks.sort_by_key(|t| t.position);
        Ok(tasks)
    }

    async fn get_task(&self, id: TaskId) -> anyhow::Result<Task> {
        self.record("get_task", Request::GetTask(id))?;
        self.state
            .borrow()
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| not_found("task", id))
    }

    async fn create_task(&self, payload: &TaskPayload) -> anyhow::Result<()> {
        self.record("create_task", Request::CreateTask(payload.clone()))?;
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let mut task = Self::build_task(&mut state, id, payload);
        task.position = state.tasks.len() as i64 + 1;
        state.tasks.push(task);
        Ok(())
    }

    async fn update_task(&self, id: TaskId, payload: &TaskPayload) -> anyhow::Result<()> {
        self.record("update_task", Request::UpdateTask(id, payload.clone()))?;
        let mut state = self.state.borrow_mut();
        let idx = state
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| not_found("task", id))?;
        let rebuilt = Self::build_task(&mut state, id, payload);
        let task = &mut state.tasks[idx];
        task.title = rebuilt.title;
        task.description = rebuilt.description;
        task.priority = rebuilt.priority;
        task.due_date = rebuilt.due_date;
        task.tags = rebuilt.tags;
        Ok(())
    }

    async fn toggle_task(&self, id: TaskId) -> anyhow::Result<()> {
        self.record("toggle_task", Request::ToggleTask(id))?;
        let mut state = self.state.borrow_mut();
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("task", id))?;
        task.completed = !task.completed;
        Ok(())
    }

    async fn delete_task(&self, id: TaskId) -> anyhow::Result<()> {
        self.record("delete_task", Request::DeleteTask(id))?;
        let mut state = self.state.borrow_mut();
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        if state.tasks.len() == before {
            return Err(not_found("task", id));
        }
        Ok(())
    }

    async fn toggle_subtask(&self, task_id: TaskId, subtask_id: SubtaskId) -> anyhow::Result<()> {
        self.record("toggle_subtask", Request::ToggleSubtask(task_id, subtask_id))?;
        let mut state = self.state.borrow_mut();
        let subtask = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| not_found("task", task_id))?
            .subtasks
            .iter_mut()
            .find(|s| s.id == Some(subtask_id))
            .ok_or_else(|| not_found("subtask", subtask_id))?;
        subtask.completed = !subtask.completed;
        Ok(())
    }

    async fn reorder_tasks(&self, ordered_ids: &[TaskId]) -> anyhow::Result<()> {
        self.record("reorder_tasks", Request::Reorder(ordered_ids.to_vec()))?;
        let mut state = self.state.borrow_mut();
        for (position, id) in ordered_ids.iter().enumerate() {
            if let Some(task) = state.tasks.iter_mut().find(|t| t.id == *id) {
                task.position = position as i64;
            }
        }
        Ok(())
    }

    async fn list_tags(&self) -> anyhow::Result<Vec<Tag>> {
        self.record("list_tags", Request::ListTags)?;
        Ok(self.state.borrow().tags.clone())
    }

    async fn create_tag(&self, payload: &TagPayload) -> anyhow::Result<()> {
        self.record("create_tag", Request::CreateTag(payload.clone()))?;
        let mut state = self.state.borrow_mut();
        if state.tags.iter().any(|t| t.name == payload.name) {
            return Err(anyhow!("HTTP 400 Bad Request: Tag already exists"));
        }
        let id = state.next_id;
        state.next_id += 1;
        state.tags.push(Tag {
            id,
            name: payload.name.clone(),
            color: payload.color.clone(),
        });
        Ok(())
    }

    async fn delete_tag(&self, id: TagId) -> anyhow::Result<()> {
        self.record("delete_tag", Request::DeleteTag(id))?;
        let mut state = self.state.borrow_mut();
        let before = state.tags.len();
        state.tags.retain(|t| t.id != id);
        if state.tags.len() == before {
            return Err(not_found("tag", id));
        }
        for task in &mut state.tasks {
            task.tags.retain(|t| t.id != id);
        }
        Ok(())
    }

    async fn health(&self) -> anyhow::Result<HealthStatus> {
        self.record("health", Request::Health)?;
        Ok(HealthStatus {
            status: "healthy".to_string(),
        })
    }
}

/// Answers confirmations from a queue (yes once it runs dry) and keeps every
/// prompt and alert for inspection.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    pub answers: VecDeque<bool>,
    pub confirmations: Vec<String>,
    pub alerts: Vec<String>,
}

impl ScriptedHost {
    pub fn declining() -> Self {
        Self {
            answers: VecDeque::from([false]),
            ..Self::default()
        }
    }
}

impl Host for ScriptedHost {
    fn confirm(&mut self, message: &str) -> bool {
        self.confirmations.push(message.to_string());
        self.answers.pop_front().unwrap_or(true)
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

pub fn tag(id: TagId, name: &str) -> Tag {
    Tag {
        id,
        name: name.to_string(),
        color: "#6366f1".to_string(),
    }
}

pub fn task(id: TaskId, title: &str, priority: Priority, completed: bool, position: i64) -> Task {
    Task {
        id,
        title: title.to_string(),
        description: None,
        completed,
        priority,
        due_date: None,
        position,
        tags: vec![],
        subtasks: vec![],
        created_at: None,
        updated_at: None,
    }
}
