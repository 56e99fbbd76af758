use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Local, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::Config;
use crate::grouping::ColumnGrouping;
use crate::task::{Board, Column, Priority, Task};

const CARD_WIDTH: usize = 30;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    /// Prints the board as side-by-side columns, one card line per task.
    #[tracing::instrument(skip(self, board, columns, grouping, now))]
    pub fn print_board(
        &mut self,
        board: &Board,
        columns: &[Column],
        grouping: &ColumnGrouping,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "{}", self.paint(&board.title, "1"))?;
        if !board.description.is_empty() {
            writeln!(out, "{}", board.description)?;
        }
        writeln!(out)?;

        let mut lanes: Vec<Vec<String>> = Vec::with_capacity(columns.len());
        for column in columns {
            let tasks = grouping.tasks_in(&column.id);
            let mut lane = Vec::with_capacity(tasks.len() + 2);
            lane.push(clip(&format!("{} ({})", column.title, tasks.len()), CARD_WIDTH));
            lane.push("-".repeat(CARD_WIDTH));
            for task in tasks {
                lane.push(clip(&card_line(task), CARD_WIDTH));
            }
            lanes.push(lane);
        }

        let height = lanes.iter().map(Vec::len).max().unwrap_or(0);
        for row in 0..height {
            for (idx, lane) in lanes.iter().enumerate() {
                let cell = lane.get(row).map(String::as_str).unwrap_or("");
                let painted = if row >= 2 {
                    self.paint_card(cell, columns.get(idx), grouping, row, now)
                } else {
                    cell.to_string()
                };
                let padding = CARD_WIDTH.saturating_sub(UnicodeWidthStr::width(cell));
                write!(out, "{}{}  ", painted, " ".repeat(padding))?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, boards))]
    pub fn print_board_list(&mut self, boards: &[Board]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Title".to_string(),
            "Members".to_string(),
        ];
        let rows = boards
            .iter()
            .map(|board| {
                vec![
                    self.paint(&board.id, "33"),
                    board.title.clone(),
                    board.member_emails.len().to_string(),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, columns))]
    pub fn print_column_list(&mut self, columns: &[Column]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec!["ID".to_string(), "Order".to_string(), "Title".to_string()];
        let rows = columns
            .iter()
            .map(|column| {
                vec![
                    self.paint(&column.id, "33"),
                    column.order.to_string(),
                    column.title.clone(),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_detail(&mut self, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        writeln!(
            out,
            "description {}",
            task.description.clone().unwrap_or_default()
        )?;
        writeln!(out, "board       {}", task.board_id)?;
        writeln!(out, "column      {}", task.column_id)?;
        writeln!(out, "priority    {}", task.priority.as_str())?;
        if let Some(profession) = task.profession {
            writeln!(out, "profession  {}", profession.as_str())?;
        }
        if !task.labels.is_empty() {
            writeln!(out, "labels      {}", task.labels.join(", "))?;
        }
        if let Some(assignee) = &task.assignee {
            writeln!(out, "assignee    {} <{}>", assignee.name, assignee.email)?;
        }
        if let Some(due) = task.due_date {
            writeln!(
                out,
                "due         {}",
                due.with_timezone(&Local).format("%Y-%m-%d")
            )?;
        }
        writeln!(
            out,
            "created     {}",
            task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )?;
        writeln!(
            out,
            "updated     {}",
            task.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )?;

        Ok(())
    }

    fn paint_card(
        &self,
        cell: &str,
        column: Option<&Column>,
        grouping: &ColumnGrouping,
        row: usize,
        now: DateTime<Utc>,
    ) -> String {
        let Some(column) = column else {
            return cell.to_string();
        };
        let Some(task) = grouping.tasks_in(&column.id).get(row - 2) else {
            return cell.to_string();
        };

        if task.is_overdue(now) {
            return self.paint(cell, "31");
        }
        match task.priority {
            Priority::Urgent => self.paint(cell, "35"),
            Priority::High => self.paint(cell, "33"),
            _ => cell.to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn card_line(task: &Task) -> String {
    let short_id: String = task.id.chars().take(8).collect();
    format!("{short_id} {}", task.title)
}

fn clip(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut width = 0usize;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width > max_width {
            break;
        }
        width += ch_width;
        out.push(ch);
    }
    out
}

fn write_table<W: Write>(
    mut writer: W,
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

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
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
