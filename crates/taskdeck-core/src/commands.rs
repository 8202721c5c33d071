use std::io::Write;

use anyhow::{Context, anyhow};
use chrono::NaiveDateTime;
use taskdeck_shared::{Priority, SubtaskId, TagId, TaskId};
use tracing::{debug, info, instrument};

use crate::api::Backend;
use crate::cli::{Command, ListArgs, TaskFields};
use crate::datetime::parse_due_arg;
use crate::host::Host;
use crate::render::{Renderer, hex_to_rgb};
use crate::store::{Store, SyncOutcome};
use crate::view::{is_overdue, priority_label};

/// Everything a command needs besides the store itself.
pub struct Session<'a, W> {
    pub renderer: &'a Renderer,
    pub out: &'a mut W,
    pub now: NaiveDateTime,
}

#[instrument(skip_all, fields(command = ?command))]
pub async fn dispatch<B, H, W>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
    command: Command,
) -> anyhow::Result<()>
where
    B: Backend,
    H: Host,
    W: Write,
{
    debug!("dispatching command");

    match command {
        Command::List(args) => cmd_list(store, session, &args).await,
        Command::Show { id } => cmd_show(store, session, id).await,
        Command::Add { title, fields } => cmd_add(store, session, title, &fields).await,
        Command::Edit {
            id,
            title,
            fields,
            drop_subtasks,
        } => cmd_edit(store, session, id, title, &fields, drop_subtasks).await,
        Command::Done { id } => cmd_done(store, session, id).await,
        Command::Delete { id } => cmd_delete(store, session, id).await,
        Command::Subtask {
            task_id,
            subtask_id,
        } => cmd_subtask(store, session, task_id, subtask_id).await,
        Command::Move { id, onto, list } => cmd_move(store, session, id, onto, &list).await,
        Command::Tags => cmd_tags(store, session).await,
        Command::TagAdd { name, color } => cmd_tag_add(store, session, name, color).await,
        Command::TagDelete { tag } => cmd_tag_delete(store, session, &tag).await,
        Command::Stats => cmd_stats(store, session).await,
        Command::Ping => cmd_ping(store, session).await,
    }
}

/// Mount-time population. A CLI run has nothing to show without it, so a
/// failed load ends the command here.
async fn init_store<B: Backend, H: Host>(store: &mut Store<B, H>) -> anyhow::Result<()> {
    match store.init().await {
        SyncOutcome::Applied => Ok(()),
        _ => Err(anyhow!(
            "could not load tasks and tags from the backend; rerun with -v for details"
        )),
    }
}

/// Applies list flags through the same setters a UI filter control uses.
async fn apply_filters<B: Backend, H: Host>(
    store: &mut Store<B, H>,
    args: &ListArgs,
) -> anyhow::Result<()> {
    store.set_filter(args.status).await;
    store.set_priority(args.priority).await;

    let tag = match args.tag.as_deref() {
        Some(key) => Some(
            store
                .find_tag(key)
                .cloned()
                .ok_or_else(|| anyhow!("unknown tag: {key}"))?,
        ),
        None => None,
    };
    store.set_tag(tag).await;

    if let Some(search) = &args.search {
        store.set_search(search.clone());
    }
    Ok(())
}

fn resolve_tag_ids<B: Backend, H: Host>(
    store: &Store<B, H>,
    keys: &[String],
) -> anyhow::Result<Vec<TagId>> {
    let mut ids = Vec::with_capacity(keys.len());
    for key in keys {
        let tag = store
            .find_tag(key)
            .ok_or_else(|| anyhow!("unknown tag: {key}"))?;
        if !ids.contains(&tag.id) {
            ids.push(tag.id);
        }
    }
    Ok(ids)
}

/// Copies command-line fields into the open task editor. Tags toggle like
/// the editor's checkboxes, so on `edit` a listed tag the task already has is
/// removed.
fn fill_task_form<B: Backend, H: Host>(
    store: &mut Store<B, H>,
    fields: &TaskFields,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    let due = fields
        .due
        .as_deref()
        .map(|raw| parse_due_arg(raw, now))
        .transpose()?;
    let tag_ids = resolve_tag_ids(store, &fields.tags)?;

    let form = store.task_form_mut();
    if let Some(description) = &fields.description {
        form.description = description.clone();
    }
    if let Some(priority) = fields.priority {
        form.priority = priority;
    }
    if let Some(due) = due {
        form.due_date = due;
    }
    for tag_id in tag_ids {
        form.toggle_tag(tag_id);
    }

    for title in &fields.subtasks {
        store.add_subtask();
        if let Some(subtask) = store.task_form_mut().subtasks.last_mut() {
            subtask.title = title.clone();
        }
    }
    Ok(())
}

fn saved_or_err(outcome: SyncOutcome, what: &str) -> anyhow::Result<()> {
    match outcome {
        SyncOutcome::Applied => Ok(()),
        SyncOutcome::Cancelled => Ok(()),
        SyncOutcome::Failed => Err(anyhow!("{what} failed")),
        SyncOutcome::Skipped => Err(anyhow!("{what} was not sent")),
    }
}

#[instrument(skip(store, session, args))]
async fn cmd_list<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
    args: &ListArgs,
) -> anyhow::Result<()> {
    info!("command list");
    init_store(store).await?;
    apply_filters(store, args).await?;

    let visible = store.visible_tasks();
    session
        .renderer
        .write_task_table(session.out, &visible, session.now)?;
    writeln!(
        session.out,
        "\n{} shown, {} active, {} completed",
        visible.len(),
        store.active_count(),
        store.completed_count()
    )?;
    Ok(())
}

#[instrument(skip(store, session))]
async fn cmd_show<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
    id: TaskId,
) -> anyhow::Result<()> {
    info!("command show");
    let task = store
        .backend()
        .get_task(id)
        .await
        .with_context(|| format!("failed to fetch task {id}"))?;
    session
        .renderer
        .write_task_info(session.out, &task, session.now)
}

#[instrument(skip(store, session, fields))]
async fn cmd_add<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
    title: String,
    fields: &TaskFields,
) -> anyhow::Result<()> {
    info!("command add");
    store.load_tags().await;

    store.open_editor(None);
    store.task_form_mut().title = title;
    fill_task_form(store, fields, session.now)?;

    saved_or_err(store.save_task().await, "creating the task")?;
    writeln!(session.out, "Created task.")?;
    Ok(())
}

#[instrument(skip(store, session, title, fields))]
async fn cmd_edit<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
    id: TaskId,
    title: Option<String>,
    fields: &TaskFields,
    mut drop_subtasks: Vec<usize>,
) -> anyhow::Result<()> {
    info!("command edit");
    init_store(store).await?;

    let task = store
        .find_task(id)
        .cloned()
        .ok_or_else(|| anyhow!("no task with id {id}"))?;
    store.open_editor(Some(task));

    if let Some(title) = title {
        store.task_form_mut().title = title;
    }

    drop_subtasks.sort_unstable();
    drop_subtasks.dedup();
    for index in drop_subtasks.into_iter().rev() {
        store.remove_subtask(index);
    }
    fill_task_form(store, fields, session.now)?;

    saved_or_err(store.save_task().await, "saving the task")?;
    writeln!(session.out, "Updated task {id}.")?;
    Ok(())
}

#[instrument(skip(store, session))]
async fn cmd_done<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
    id: TaskId,
) -> anyhow::Result<()> {
    info!("command done");
    if store.toggle_task(id).await != SyncOutcome::Applied {
        return Err(anyhow!(
            "could not toggle task {id}; rerun with -v for details"
        ));
    }

    match store.find_task(id) {
        Some(task) if task.completed => writeln!(session.out, "Completed task {id}.")?,
        Some(_) => writeln!(session.out, "Reopened task {id}.")?,
        None => writeln!(session.out, "Toggled task {id}.")?,
    }
    Ok(())
}

#[instrument(skip(store, session))]
async fn cmd_delete<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
    id: TaskId,
) -> anyhow::Result<()> {
    info!("command delete");
    match store.delete_task(id).await {
        SyncOutcome::Applied => writeln!(session.out, "Deleted task {id}.")?,
        SyncOutcome::Cancelled => writeln!(session.out, "Nothing deleted.")?,
        outcome => saved_or_err(outcome, "deleting the task")?,
    }
    Ok(())
}

#[instrument(skip(store, session))]
async fn cmd_subtask<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
    task_id: TaskId,
    subtask_id: SubtaskId,
) -> anyhow::Result<()> {
    info!("command subtask");
    if store.toggle_subtask(task_id, subtask_id).await != SyncOutcome::Applied {
        return Err(anyhow!(
            "could not toggle subtask {subtask_id} of task {task_id}; rerun with -v for details"
        ));
    }
    writeln!(session.out, "Toggled subtask {subtask_id}.")?;
    Ok(())
}

/// Drag-and-drop from the command line: `id` is dragged onto `onto` within
/// the list the filter flags select.
#[instrument(skip(store, session, list))]
async fn cmd_move<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
    id: TaskId,
    onto: TaskId,
    list: &ListArgs,
) -> anyhow::Result<()> {
    info!("command move");
    init_store(store).await?;
    apply_filters(store, list).await?;

    let source = store
        .find_task(id)
        .cloned()
        .ok_or_else(|| anyhow!("no task with id {id}"))?;
    store.drag_start(source);
    store.drag_over();
    let outcome = store.drop_on(onto).await;
    store.drag_end();

    match outcome {
        SyncOutcome::Applied => {}
        SyncOutcome::Skipped => {
            return Err(anyhow!(
                "tasks {id} and {onto} must be different and both part of the listed order"
            ));
        }
        _ => {
            return Err(anyhow!(
                "could not reorder tasks; rerun with -v for details"
            ));
        }
    }

    let visible = store.visible_tasks();
    session
        .renderer
        .write_task_table(session.out, &visible, session.now)
}

#[instrument(skip(store, session))]
async fn cmd_tags<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
) -> anyhow::Result<()> {
    info!("command tags");
    init_store(store).await?;
    session
        .renderer
        .write_tag_table(session.out, store.tags(), |tag| {
            store.task_count_by_tag(tag.id)
        })
}

#[instrument(skip(store, session))]
async fn cmd_tag_add<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
    name: String,
    color: Option<String>,
) -> anyhow::Result<()> {
    info!("command tag-add");
    store.open_tag_editor();
    store.tag_form_mut().name = name;
    if let Some(color) = color {
        if hex_to_rgb(&color).is_none() {
            store.close_tag_editor();
            return Err(anyhow!("invalid color {color}; expected #rrggbb"));
        }
        store.tag_form_mut().color = color;
    }

    saved_or_err(store.save_tag().await, "creating the tag")?;
    writeln!(session.out, "Created tag.")?;
    Ok(())
}

#[instrument(skip(store, session))]
async fn cmd_tag_delete<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
    key: &str,
) -> anyhow::Result<()> {
    info!("command tag-delete");
    store.load_tags().await;
    let tag = store
        .find_tag(key)
        .cloned()
        .ok_or_else(|| anyhow!("unknown tag: {key}"))?;

    match store.delete_tag(tag.id).await {
        SyncOutcome::Applied => writeln!(session.out, "Deleted tag {}.", tag.name)?,
        SyncOutcome::Cancelled => writeln!(session.out, "Nothing deleted.")?,
        outcome => saved_or_err(outcome, "deleting the tag")?,
    }
    Ok(())
}

#[instrument(skip(store, session))]
async fn cmd_stats<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
) -> anyhow::Result<()> {
    info!("command stats");
    init_store(store).await?;

    let tasks = store.tasks();
    let overdue = tasks
        .iter()
        .filter(|task| !task.completed && is_overdue(task.due_date, session.now))
        .count();

    writeln!(session.out, "total      {}", tasks.len())?;
    writeln!(session.out, "active     {}", store.active_count())?;
    writeln!(session.out, "completed  {}", store.completed_count())?;
    writeln!(session.out, "overdue    {overdue}")?;
    for priority in Priority::ALL {
        let count = tasks
            .iter()
            .filter(|task| !task.completed && task.priority == priority)
            .count();
        writeln!(
            session.out,
            "{:<10} {count}",
            priority_label(priority).to_ascii_lowercase()
        )?;
    }
    Ok(())
}

#[instrument(skip(store, session))]
async fn cmd_ping<B: Backend, H: Host, W: Write>(
    store: &mut Store<B, H>,
    session: &mut Session<'_, W>,
) -> anyhow::Result<()> {
    info!("command ping");
    let health = store
        .backend()
        .health()
        .await
        .context("backend is not reachable")?;
    writeln!(session.out, "backend {}", health.status)?;
    Ok(())
}
