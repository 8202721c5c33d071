use std::io::{IsTerminal, Write, stdout};

use chrono::NaiveDateTime;
use taskdeck_shared::{Priority, Tag, Task};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::view::{format_due, is_overdue, priority_label};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color() && stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, tasks, now))]
    pub fn write_task_table<W: Write>(
        &self,
        out: &mut W,
        tasks: &[&Task],
        now: NaiveDateTime,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            " ".to_string(),
            "Pri".to_string(),
            "Due".to_string(),
            "Title".to_string(),
            "Tags".to_string(),
            "Sub".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = self.paint(&task.id.to_string(), "33");
            let done = if task.completed { "[x]" } else { "[ ]" }.to_string();
            let priority = self.paint_priority(task.priority);

            let due = format_due(task.due_date);
            let due = if !task.completed && is_overdue(task.due_date, now) {
                self.paint(&due, "31")
            } else {
                due
            };

            let tags = task
                .tags
                .iter()
                .map(|tag| self.paint_tag(tag))
                .collect::<Vec<_>>()
                .join(" ");

            let subtasks = if task.subtasks.is_empty() {
                String::new()
            } else {
                let finished = task.subtasks.iter().filter(|s| s.completed).count();
                format!("{finished}/{}", task.subtasks.len())
            };

            rows.push(vec![id, done, priority, due, task.title.clone(), tags, subtasks]);
        }

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, out, task, now), fields(id = task.id))]
    pub fn write_task_info<W: Write>(
        &self,
        out: &mut W,
        task: &Task,
        now: NaiveDateTime,
    ) -> anyhow::Result<()> {
        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        writeln!(
            out,
            "status    {}",
            if task.completed { "completed" } else { "active" }
        )?;
        writeln!(out, "priority  {}", self.paint_priority(task.priority))?;
        writeln!(out, "position  {}", task.position)?;
        if let Some(description) = task.description.as_deref() {
            writeln!(out, "desc      {description}")?;
        }
        if task.due_date.is_some() {
            let overdue = !task.completed && is_overdue(task.due_date, now);
            writeln!(
                out,
                "due       {}{}",
                format_due(task.due_date),
                if overdue { " (overdue)" } else { "" }
            )?;
        }
        if !task.tags.is_empty() {
            let tags = task
                .tags
                .iter()
                .map(|tag| self.paint_tag(tag))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(out, "tags      {tags}")?;
        }
        if let Some(created) = task.created_at {
            writeln!(out, "created   {}", created.format("%Y-%m-%d %H:%M"))?;
        }
        if let Some(updated) = task.updated_at {
            writeln!(out, "modified  {}", updated.format("%Y-%m-%d %H:%M"))?;
        }

        if !task.subtasks.is_empty() {
            writeln!(out, "subtasks")?;
            let mut subtasks: Vec<_> = task.subtasks.iter().collect();
            subtasks.sort_by_key(|s| s.position);
            for subtask in subtasks {
                let id = subtask
                    .id
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    out,
                    "  {} {:>4}  {}",
                    if subtask.completed { "[x]" } else { "[ ]" },
                    id,
                    subtask.title
                )?;
            }
        }

        Ok(())
    }

    pub fn write_tag_table<W: Write>(
        &self,
        out: &mut W,
        tags: &[Tag],
        count: impl Fn(&Tag) -> usize,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Name".to_string(),
            "Color".to_string(),
            "Tasks".to_string(),
        ];
        let rows = tags
            .iter()
            .map(|tag| {
                vec![
                    self.paint(&tag.id.to_string(), "33"),
                    self.paint_tag(tag),
                    tag.color.clone(),
                    count(tag).to_string(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    fn paint_priority(&self, priority: Priority) -> String {
        let code = match priority {
            Priority::High => "31",
            Priority::Medium => "33",
            Priority::Low => "32",
        };
        self.paint(priority_label(priority), code)
    }

    fn paint_tag(&self, tag: &Tag) -> String {
        match hex_to_rgb(&tag.color) {
            Some((r, g, b)) => self.paint(&tag.name, &format!("38;2;{r};{g};{b}")),
            None => tag.name.clone(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// `#rrggbb` or `#rgb`.
pub fn hex_to_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some((
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        3 => {
            let mut channels = hex
                .chars()
                .map(|c| c.to_digit(16).map(|v| (v * 17) as u8));
            Some((channels.next()??, channels.next()??, channels.next()??))
        }
        _ => None,
    }
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let mut line = String::new();
    for idx in 0..column_count {
        line.push_str(&format!("{:width$} ", headers[idx], width = widths[idx]));
    }
    writeln!(writer, "{}", line.trim_end())?;

    line.clear();
    for width in &widths {
        line.push_str(&format!("{:-<width$} ", "", width = *width));
    }
    writeln!(writer, "{}", line.trim_end())?;

    for row in rows {
        line.clear();
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            line.push_str(cell);
            line.push_str(&" ".repeat(padding + 1));
        }
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use taskdeck_shared::{Priority, Subtask, Tag, Task};

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 16)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    fn sample() -> Task {
        Task {
            id: 4,
            title: "Wash car".to_string(),
            description: Some("before sunday".to_string()),
            completed: false,
            priority: Priority::High,
            due_date: NaiveDate::from_ymd_opt(2026, 2, 16).and_then(|d| d.and_hms_opt(5, 0, 0)),
            position: 0,
            tags: vec![Tag {
                id: 1,
                name: "home".to_string(),
                color: "#ff0000".to_string(),
            }],
            subtasks: vec![
                Subtask {
                    id: Some(7),
                    title: "vacuum".to_string(),
                    completed: true,
                    position: 0,
                    ..Subtask::default()
                },
                Subtask {
                    id: Some(8),
                    title: "rinse".to_string(),
                    position: 1,
                    ..Subtask::default()
                },
            ],
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn task_table_aligns_columns() {
        let task = sample();
        let mut out = Vec::new();
        Renderer::plain()
            .write_task_table(&mut out, &[&task], now())
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].contains("[ ]"));
        assert!(lines[2].contains("High"));
        assert!(lines[2].contains("Feb 16, 2026, 05:00 AM"));
        assert!(lines[2].ends_with("1/2"));
        assert_eq!(lines[0].find("Title"), lines[2].find("Wash car"));
    }

    #[test]
    fn task_info_marks_overdue_and_lists_subtasks() {
        let mut out = Vec::new();
        Renderer::plain()
            .write_task_info(&mut out, &sample(), now())
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("(overdue)"));
        assert!(text.contains("[x]    7  vacuum"));
        assert!(text.contains("[ ]    8  rinse"));
    }

    #[test]
    fn colored_tags_use_truecolor_escapes() {
        let renderer = Renderer { color: true };
        let painted = renderer.paint_tag(&sample().tags[0]);
        assert_eq!(painted, "\x1b[38;2;255;0;0mhome\x1b[0m");
        assert_eq!(strip_ansi(&painted), "home");
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(hex_to_rgb("#6366f1"), Some((0x63, 0x66, 0xf1)));
        assert_eq!(hex_to_rgb("#fff"), Some((255, 255, 255)));
        assert_eq!(hex_to_rgb("6366f1"), None);
        assert_eq!(hex_to_rgb("#zzzzzz"), None);
    }
}
