use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use taskdeck_shared::{Priority, SubtaskId, TaskId};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::view::{PriorityFilter, StatusFilter};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "deck",
    version,
    about = "taskdeck: terminal client for a REST task board",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "deckrc", global = true)]
    pub deckrc: Option<PathBuf>,

    /// Answer yes to every confirmation.
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// all, active or completed
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// all, low, medium or high
    #[arg(long, short = 'p', default_value = "all")]
    pub priority: PriorityFilter,

    /// Tag name or id
    #[arg(long, short = 't')]
    pub tag: Option<String>,

    /// Case-insensitive text matched against title and description
    #[arg(long = "search", short = 'f')]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TaskFields {
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, short = 'p')]
    pub priority: Option<Priority>,

    /// YYYY-MM-DD[THH:MM], today, tomorrow, a weekday, +3d, or none
    #[arg(long)]
    pub due: Option<String>,

    /// Tag name or id; repeatable. On edit, a tag the task already has is removed
    #[arg(long = "tag", short = 't', action = ArgAction::Append)]
    pub tags: Vec<String>,

    /// Subtask title; repeatable
    #[arg(long = "subtask", action = ArgAction::Append)]
    pub subtasks: Vec<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the visible task list
    List(ListArgs),
    /// Show one task with its subtasks
    Show { id: TaskId },
    /// Create a task
    Add {
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Update a task; omitted fields keep their value
    Edit {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
        /// Remove the subtask at this index (0-based); repeatable
        #[arg(long = "drop-subtask", action = ArgAction::Append)]
        drop_subtasks: Vec<usize>,
    },
    /// Flip a task's completion
    Done { id: TaskId },
    /// Delete a task
    Delete { id: TaskId },
    /// Flip a subtask's completion
    Subtask {
        task_id: TaskId,
        subtask_id: SubtaskId,
    },
    /// Move a task onto another task's slot in the listed order
    Move {
        id: TaskId,
        #[arg(long)]
        onto: TaskId,
        #[command(flatten)]
        list: ListArgs,
    },
    /// List tags with their task counts
    Tags,
    /// Create a tag
    TagAdd {
        name: String,
        #[arg(long, short = 'c')]
        color: Option<String>,
    },
    /// Delete a tag by name or id
    TagDelete { tag: String },
    /// Task totals
    Stats,
    /// Check that the backend is reachable
    Ping,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let pre = preprocess_args(&os(&["deck", "rc.color=off", "list", "rc.api.url:http://x/api"]))
            .unwrap();

        assert_eq!(pre.cleaned_args, os(&["deck", "list"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.api.url".to_string(), "http://x/api".to_string()),
            ]
        );
    }

    #[test]
    fn list_flags_parse_into_filters() {
        let cli = GlobalCli::parse_from([
            "deck", "list", "--status", "active", "-p", "high", "--tag", "work", "-f", "wash",
        ]);

        match cli.command {
            Some(Command::List(args)) => {
                assert_eq!(args.status, StatusFilter::Active);
                assert_eq!(args.priority, PriorityFilter::Only(Priority::High));
                assert_eq!(args.tag.as_deref(), Some("work"));
                assert_eq!(args.search.as_deref(), Some("wash"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_collects_repeated_tags_and_subtasks() {
        let cli = GlobalCli::parse_from([
            "deck", "-y", "add", "Pack", "--tag", "travel", "-t", "2", "--subtask", "socks",
            "--subtask", "charger", "--priority", "low",
        ]);

        assert!(cli.yes);
        match cli.command {
            Some(Command::Add { title, fields }) => {
                assert_eq!(title, "Pack");
                assert_eq!(fields.tags, vec!["travel", "2"]);
                assert_eq!(fields.subtasks, vec!["socks", "charger"]);
                assert_eq!(fields.priority, Some(Priority::Low));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn keyval_requires_equals() {
        assert!("api.url".parse::<KeyVal>().is_err());
        let kv = "color = off".parse::<KeyVal>().unwrap();
        assert_eq!((kv.key.as_str(), kv.value.as_str()), ("color", "off"));
    }
}
