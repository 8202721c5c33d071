use std::future::Future;
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use taskdeck_shared::{
  HealthStatus,
  SubtaskId,
  Tag,
  TagId,
  TagPayload,
  Task,
  TaskId,
  TaskPayload
};
use tracing::{
  debug,
  warn
};

/// The REST collaborator that owns
/// tasks and tags. Mutations report only
/// success or failure; callers re-fetch
/// to observe the new state.
pub trait Backend {
  fn list_tasks(
    &self
  ) -> impl Future<
    Output = anyhow::Result<Vec<Task>>
  >;

  fn get_task(
    &self,
    id: TaskId
  ) -> impl Future<
    Output = anyhow::Result<Task>
  >;

  fn create_task(
    &self,
    payload: &TaskPayload
  ) -> impl Future<
    Output = anyhow::Result<()>
  >;

  fn update_task(
    &self,
    id: TaskId,
    payload: &TaskPayload
  ) -> impl Future<
    Output = anyhow::Result<()>
  >;

  fn toggle_task(
    &self,
    id: TaskId
  ) -> impl Future<
    Output = anyhow::Result<()>
  >;

  fn delete_task(
    &self,
    id: TaskId
  ) -> impl Future<
    Output = anyhow::Result<()>
  >;

  fn toggle_subtask(
    &self,
    task_id: TaskId,
    subtask_id: SubtaskId
  ) -> impl Future<
    Output = anyhow::Result<()>
  >;

  fn reorder_tasks(
    &self,
    ordered_ids: &[TaskId]
  ) -> impl Future<
    Output = anyhow::Result<()>
  >;

  fn list_tags(
    &self
  ) -> impl Future<
    Output = anyhow::Result<Vec<Tag>>
  >;

  fn create_tag(
    &self,
    payload: &TagPayload
  ) -> impl Future<
    Output = anyhow::Result<()>
  >;

  fn delete_tag(
    &self,
    id: TagId
  ) -> impl Future<
    Output = anyhow::Result<()>
  >;

  fn health(
    &self
  ) -> impl Future<
    Output = anyhow::Result<HealthStatus>
  >;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
  client:   reqwest::Client,
  base_url: String
}

impl HttpBackend {
  #[tracing::instrument]
  pub fn new(
    base_url: &str,
    timeout: Option<Duration>
  ) -> anyhow::Result<Self> {
    let base_url =
      base_url.trim().trim_end_matches('/');
    if base_url.is_empty() {
      anyhow::bail!(
        "backend URL is empty"
      );
    }

    let mut builder =
      reqwest::Client::builder();
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    let client = builder.build().context(
      "failed building HTTP client for \
       task backend"
    )?;

    debug!(base_url, "created backend client");
    Ok(Self {
      client,
      base_url: base_url.to_string()
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.base_url)
  }

  /// `/health` is served next to the
  /// `/api` prefix, not under it.
  fn health_url(&self) -> String {
    let root = self
      .base_url
      .strip_suffix("/api")
      .unwrap_or(&self.base_url);
    format!("{root}/health")
  }

  async fn send(
    &self,
    request: reqwest::RequestBuilder,
    what: &str
  ) -> anyhow::Result<reqwest::Response>
  {
    let response = request
      .send()
      .await
      .with_context(|| {
        format!("failed to {what}")
      })?;

    let status = response.status();
    if status.is_success() {
      debug!(%status, what, "backend request succeeded");
      return Ok(response);
    }

    let body = response
      .text()
      .await
      .unwrap_or_default();
    let body = error_detail(&body);
    warn!(
      %status,
      what,
      body = %body,
      "backend rejected request"
    );
    Err(anyhow!(
      "failed to {what}: HTTP {status}: \
       {body}"
    ))
  }

  async fn send_json<T>(
    &self,
    request: reqwest::RequestBuilder,
    what: &str
  ) -> anyhow::Result<T>
  where
    T: DeserializeOwned
  {
    self
      .send(request, what)
      .await?
      .json::<T>()
      .await
      .with_context(|| {
        format!(
          "failed to decode response \
           to {what}"
        )
      })
  }

  async fn send_unit(
    &self,
    request: reqwest::RequestBuilder,
    what: &str
  ) -> anyhow::Result<()> {
    self.send(request, what).await?;
    Ok(())
  }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  detail: serde_json::Value
}

/// The service reports failures as
/// `{"detail": ...}`; fall back to the raw
/// body for anything else.
fn error_detail(body: &str) -> String {
  match serde_json::from_str::<ErrorBody>(
    body
  ) {
    Ok(ErrorBody {
      detail: serde_json::Value::String(text)
    }) => text,
    Ok(ErrorBody { detail }) => {
      detail.to_string()
    }
    Err(_) => body.trim().to_string()
  }
}

impl Backend for HttpBackend {
  #[tracing::instrument(skip(self))]
  async fn list_tasks(
    &self
  ) -> anyhow::Result<Vec<Task>> {
    self
      .send_json(
        self.client.get(self.url("/todos/")),
        "list tasks"
      )
      .await
  }

  #[tracing::instrument(skip(self))]
  async fn get_task(
    &self,
    id: TaskId
  ) -> anyhow::Result<Task> {
    self
      .send_json(
        self
          .client
          .get(self.url(&format!("/todos/{id}"))),
        "fetch task"
      )
      .await
  }

  #[tracing::instrument(skip(self, payload), fields(title = %payload.title))]
  async fn create_task(
    &self,
    payload: &TaskPayload
  ) -> anyhow::Result<()> {
    self
      .send_unit(
        self
          .client
          .post(self.url("/todos/"))
          .json(payload),
        "create task"
      )
      .await
  }

  #[tracing::instrument(skip(self, payload))]
  async fn update_task(
    &self,
    id: TaskId,
    payload: &TaskPayload
  ) -> anyhow::Result<()> {
    self
      .send_unit(
        self
          .client
          .put(self.url(&format!("/todos/{id}")))
          .json(payload),
        "update task"
      )
      .await
  }

  #[tracing::instrument(skip(self))]
  async fn toggle_task(
    &self,
    id: TaskId
  ) -> anyhow::Result<()> {
    self
      .send_unit(
        self.client.patch(
          self.url(&format!(
            "/todos/{id}/toggle"
          ))
        ),
        "toggle task"
      )
      .await
  }

  #[tracing::instrument(skip(self))]
  async fn delete_task(
    &self,
    id: TaskId
  ) -> anyhow::Result<()> {
    self
      .send_unit(
        self
          .client
          .delete(self.url(&format!("/todos/{id}"))),
        "delete task"
      )
      .await
  }

  #[tracing::instrument(skip(self))]
  async fn toggle_subtask(
    &self,
    task_id: TaskId,
    subtask_id: SubtaskId
  ) -> anyhow::Result<()> {
    self
      .send_unit(
        self.client.patch(self.url(
          &format!(
            "/todos/{task_id}/subtasks/\
             {subtask_id}/toggle"
          )
        )),
        "toggle subtask"
      )
      .await
  }

  #[tracing::instrument(skip(self))]
  async fn reorder_tasks(
    &self,
    ordered_ids: &[TaskId]
  ) -> anyhow::Result<()> {
    self
      .send_unit(
        self
          .client
          .post(self.url("/todos/reorder"))
          .json(ordered_ids),
        "reorder tasks"
      )
      .await
  }

  #[tracing::instrument(skip(self))]
  async fn list_tags(
    &self
  ) -> anyhow::Result<Vec<Tag>> {
    self
      .send_json(
        self.client.get(self.url("/tags/")),
        "list tags"
      )
      .await
  }

  #[tracing::instrument(skip(self, payload), fields(name = %payload.name))]
  async fn create_tag(
    &self,
    payload: &TagPayload
  ) -> anyhow::Result<()> {
    self
      .send_unit(
        self
          .client
          .post(self.url("/tags/"))
          .json(payload),
        "create tag"
      )
      .await
  }

  #[tracing::instrument(skip(self))]
  async fn delete_tag(
    &self,
    id: TagId
  ) -> anyhow::Result<()> {
    self
      .send_unit(
        self
          .client
          .delete(self.url(&format!("/tags/{id}"))),
        "delete tag"
      )
      .await
  }

  #[tracing::instrument(skip(self))]
  async fn health(
    &self
  ) -> anyhow::Result<HealthStatus> {
    self
      .send_json(
        self.client.get(self.health_url()),
        "check backend health"
      )
      .await
  }
}
