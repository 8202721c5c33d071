use taskdeck_shared::{SubtaskId, Tag, TagId, Task, TaskId};
use tracing::{debug, error, info, warn};

use crate::api::Backend;
use crate::drag::reordered_ids;
use crate::form::{TagForm, TaskForm};
use crate::host::Host;
use crate::view::{self, PriorityFilter, StatusFilter, ViewFilter};

const CONFIRM_DELETE_TASK: &str = "Are you sure you want to delete this task?";
const CONFIRM_DELETE_TAG: &str = "Are you sure you want to delete this tag?";
const ALERT_SAVE_TASK: &str = "Failed to save task. Please try again.";
const ALERT_DELETE_TASK: &str = "Failed to delete task. Please try again.";
const ALERT_SAVE_TAG: &str = "Failed to create tag. Please try again.";
const ALERT_DELETE_TAG: &str = "Failed to delete tag. Please try again.";

/// What a store operation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The request went through and the affected collections were reloaded.
    Applied,
    /// The user declined the confirmation; nothing was sent.
    Cancelled,
    /// The request failed; the store keeps its last loaded state.
    Failed,
    /// Nothing to do (invalid form, no drag source, drop onto itself).
    Skipped,
}

/// Client-side state for the task views: the server collections, the filter
/// inputs of the visible list, editor buffers and the drag source.
///
/// Collections are only ever replaced by a fetch. Mutations go to the
/// backend first and are observed through the reload that follows.
#[derive(Debug)]
pub struct Store<B, H> {
    backend: B,
    host: H,
    tasks: Vec<Task>,
    tags: Vec<Tag>,
    current_filter: StatusFilter,
    current_priority: PriorityFilter,
    current_tag: Option<Tag>,
    search_query: String,
    dragging_task: Option<Task>,
    show_task_editor: bool,
    show_tag_editor: bool,
    editing_task: Option<Task>,
    task_form: TaskForm,
    tag_form: TagForm,
}

impl<B: Backend, H: Host> Store<B, H> {
    pub fn new(backend: B, host: H) -> Self {
        Self {
            backend,
            host,
            tasks: Vec::new(),
            tags: Vec::new(),
            current_filter: StatusFilter::default(),
            current_priority: PriorityFilter::default(),
            current_tag: None,
            search_query: String::new(),
            dragging_task: None,
            show_task_editor: false,
            show_tag_editor: false,
            editing_task: None,
            task_form: TaskForm::default(),
            tag_form: TagForm::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn current_filter(&self) -> StatusFilter {
        self.current_filter
    }

    pub fn current_priority(&self) -> PriorityFilter {
        self.current_priority
    }

    pub fn current_tag(&self) -> Option<&Tag> {
        self.current_tag.as_ref()
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn dragging_task(&self) -> Option<&Task> {
        self.dragging_task.as_ref()
    }

    pub fn is_task_editor_open(&self) -> bool {
        self.show_task_editor
    }

    pub fn is_tag_editor_open(&self) -> bool {
        self.show_tag_editor
    }

    pub fn editing_task(&self) -> Option<&Task> {
        self.editing_task.as_ref()
    }

    pub fn task_form(&self) -> &TaskForm {
        &self.task_form
    }

    pub fn task_form_mut(&mut self) -> &mut TaskForm {
        &mut self.task_form
    }

    pub fn tag_form(&self) -> &TagForm {
        &self.tag_form
    }

    pub fn tag_form_mut(&mut self) -> &mut TagForm {
        &mut self.tag_form
    }

    pub fn find_task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Looks a tag up by id when `key` is numeric, by case-insensitive name
    /// otherwise.
    pub fn find_tag(&self, key: &str) -> Option<&Tag> {
        let key = key.trim();
        if let Ok(id) = key.parse::<TagId>() {
            return self.tags.iter().find(|tag| tag.id == id);
        }
        self.tags
            .iter()
            .find(|tag| tag.name.eq_ignore_ascii_case(key))
    }

    pub fn view_filter(&self) -> ViewFilter<'_> {
        ViewFilter {
            status: self.current_filter,
            priority: self.current_priority,
            tag: self.current_tag.as_ref(),
            search: &self.search_query,
        }
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        view::visible_tasks(&self.tasks, &self.view_filter())
    }

    pub fn active_count(&self) -> usize {
        view::active_count(&self.tasks)
    }

    pub fn completed_count(&self) -> usize {
        view::completed_count(&self.tasks)
    }

    pub fn task_count_by_tag(&self, tag_id: TagId) -> usize {
        view::task_count_by_tag(&self.tasks, tag_id)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_tasks(&mut self) -> SyncOutcome {
        match self.backend.list_tasks().await {
            Ok(tasks) => {
                debug!(count = tasks.len(), "loaded tasks");
                self.tasks = tasks;
                SyncOutcome::Applied
            }
            Err(err) => {
                error!(error = %format!("{err:#}"), "error fetching tasks");
                SyncOutcome::Failed
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_tags(&mut self) -> SyncOutcome {
        match self.backend.list_tags().await {
            Ok(tags) => {
                debug!(count = tags.len(), "loaded tags");
                self.tags = tags;
                SyncOutcome::Applied
            }
            Err(err) => {
                error!(error = %format!("{err:#}"), "error fetching tags");
                SyncOutcome::Failed
            }
        }
    }

    /// Initial population: tags first, then tasks.
    #[tracing::instrument(skip(self))]
    pub async fn init(&mut self) -> SyncOutcome {
        let tags = self.load_tags().await;
        let tasks = self.load_tasks().await;
        if tags == SyncOutcome::Applied && tasks == SyncOutcome::Applied {
            SyncOutcome::Applied
        } else {
            SyncOutcome::Failed
        }
    }

    /// Filter setters refetch the collection, but only when the value
    /// actually changes.
    #[tracing::instrument(skip(self))]
    pub async fn set_filter(&mut self, filter: StatusFilter) -> SyncOutcome {
        if filter == self.current_filter {
            return SyncOutcome::Skipped;
        }
        self.current_filter = filter;
        self.load_tasks().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_priority(&mut self, priority: PriorityFilter) -> SyncOutcome {
        if priority == self.current_priority {
            return SyncOutcome::Skipped;
        }
        self.current_priority = priority;
        self.load_tasks().await
    }

    #[tracing::instrument(skip(self, tag), fields(tag_id = ?tag.as_ref().map(|t| t.id)))]
    pub async fn set_tag(&mut self, tag: Option<Tag>) -> SyncOutcome {
        if tag.as_ref().map(|t| t.id) == self.current_tag.as_ref().map(|t| t.id) {
            return SyncOutcome::Skipped;
        }
        self.current_tag = tag;
        self.load_tasks().await
    }

    /// Search is resolved locally; no fetch.
    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn open_editor(&mut self, task: Option<Task>) {
        match task {
            Some(task) => {
                debug!(id = task.id, "editing task");
                self.task_form = TaskForm::from_task(&task);
                self.editing_task = Some(task);
            }
            None => {
                self.task_form = TaskForm::default();
                self.editing_task = None;
            }
        }
        self.show_task_editor = true;
    }

    pub fn close_editor(&mut self) {
        self.show_task_editor = false;
        self.editing_task = None;
        self.task_form = TaskForm::default();
    }

    pub fn open_tag_editor(&mut self) {
        self.tag_form = TagForm::default();
        self.show_tag_editor = true;
    }

    pub fn close_tag_editor(&mut self) {
        self.show_tag_editor = false;
        self.tag_form = TagForm::default();
    }

    pub fn add_subtask(&mut self) {
        self.task_form.add_subtask();
    }

    pub fn remove_subtask(&mut self, index: usize) {
        if self.task_form.remove_subtask(index).is_none() {
            warn!(index, "no subtask at index");
        }
    }

    #[tracing::instrument(skip(self), fields(id = ?self.task_form.id))]
    pub async fn save_task(&mut self) -> SyncOutcome {
        if let Err(err) = self.task_form.validate() {
            warn!(error = %err, "task form rejected");
            self.host.alert(&capitalize(&err.to_string()));
            return SyncOutcome::Skipped;
        }

        let payload = self.task_form.to_payload();
        let result = match self.task_form.id {
            Some(id) => self.backend.update_task(id, &payload).await,
            None => self.backend.create_task(&payload).await,
        };

        if let Err(err) = result {
            error!(error = %format!("{err:#}"), "error saving task");
            self.host.alert(ALERT_SAVE_TASK);
            return SyncOutcome::Failed;
        }

        info!(title = %payload.title, "saved task");
        self.load_tasks().await;
        self.close_editor();
        SyncOutcome::Applied
    }

    #[tracing::instrument(skip(self))]
    pub async fn toggle_task(&mut self, id: TaskId) -> SyncOutcome {
        if let Err(err) = self.backend.toggle_task(id).await {
            error!(error = %format!("{err:#}"), "error toggling task");
            return SyncOutcome::Failed;
        }
        self.load_tasks().await;
        SyncOutcome::Applied
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&mut self, id: TaskId) -> SyncOutcome {
        if !self.host.confirm(CONFIRM_DELETE_TASK) {
            debug!("task deletion declined");
            return SyncOutcome::Cancelled;
        }

        if let Err(err) = self.backend.delete_task(id).await {
            error!(error = %format!("{err:#}"), "error deleting task");
            self.host.alert(ALERT_DELETE_TASK);
            return SyncOutcome::Failed;
        }

        info!("deleted task");
        self.load_tasks().await;
        SyncOutcome::Applied
    }

    #[tracing::instrument(skip(self))]
    pub async fn toggle_subtask(&mut self, task_id: TaskId, subtask_id: SubtaskId) -> SyncOutcome {
        if let Err(err) = self.backend.toggle_subtask(task_id, subtask_id).await {
            error!(error = %format!("{err:#}"), "error toggling subtask");
            return SyncOutcome::Failed;
        }
        self.load_tasks().await;
        SyncOutcome::Applied
    }

    #[tracing::instrument(skip(self), fields(name = %self.tag_form.name))]
    pub async fn save_tag(&mut self) -> SyncOutcome {
        if let Err(err) = self.tag_form.validate() {
            warn!(error = %err, "tag form rejected");
            self.host.alert(&capitalize(&err.to_string()));
            return SyncOutcome::Skipped;
        }

        let payload = self.tag_form.to_payload();
        if let Err(err) = self.backend.create_tag(&payload).await {
            error!(error = %format!("{err:#}"), "error creating tag");
            self.host.alert(ALERT_SAVE_TAG);
            return SyncOutcome::Failed;
        }

        info!("created tag");
        self.load_tags().await;
        self.close_tag_editor();
        SyncOutcome::Applied
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_tag(&mut self, id: TagId) -> SyncOutcome {
        if !self.host.confirm(CONFIRM_DELETE_TAG) {
            debug!("tag deletion declined");
            return SyncOutcome::Cancelled;
        }

        if let Err(err) = self.backend.delete_tag(id).await {
            error!(error = %format!("{err:#}"), "error deleting tag");
            self.host.alert(ALERT_DELETE_TAG);
            return SyncOutcome::Failed;
        }

        info!("deleted tag");
        self.load_tags().await;
        if self.current_tag.as_ref().is_some_and(|tag| tag.id == id) {
            debug!("cleared active tag filter");
            self.current_tag = None;
        }
        self.load_tasks().await;
        SyncOutcome::Applied
    }

    #[tracing::instrument(skip(self))]
    pub async fn reorder(&mut self, ordered_ids: &[TaskId]) -> SyncOutcome {
        if let Err(err) = self.backend.reorder_tasks(ordered_ids).await {
            error!(error = %format!("{err:#}"), "error reordering tasks");
            return SyncOutcome::Failed;
        }
        self.load_tasks().await;
        SyncOutcome::Applied
    }

    pub fn drag_start(&mut self, task: Task) {
        debug!(id = task.id, "drag started");
        self.dragging_task = Some(task);
    }

    /// A drop target must always suppress the host's default drag handling.
    pub fn drag_over(&self) -> bool {
        true
    }

    /// Moves the drag source to the target's slot in the visible list. The
    /// drag source stays recorded until `drag_end`.
    ///
    /// A source or target missing from the visible list skips the drop
    /// instead of reordering, so a filter change mid-drag can never move an
    /// unrelated task.
    #[tracing::instrument(skip(self))]
    pub async fn drop_on(&mut self, target_id: TaskId) -> SyncOutcome {
        let Some(source_id) = self.dragging_task.as_ref().map(|task| task.id) else {
            debug!("drop without a drag source");
            return SyncOutcome::Skipped;
        };
        if source_id == target_id {
            return SyncOutcome::Skipped;
        }

        let visible: Vec<TaskId> = self.visible_tasks().iter().map(|task| task.id).collect();
        let Some(order) = reordered_ids(&visible, source_id, target_id) else {
            warn!(source_id, target_id, "drop outside the visible list");
            return SyncOutcome::Skipped;
        };

        self.reorder(&order).await
    }

    pub fn drag_end(&mut self) {
        self.dragging_task = None;
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}
