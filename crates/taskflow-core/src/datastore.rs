//! JSON Lines file-backed implementation of [`BoardStore`].
//!
//! One document per line, one file per collection, written atomically via
//! a temp file. An in-process listener registry stands in for the hosted
//! document store's push channel: every task mutation re-reads the
//! affected board's tasks and hands them to its subscribers.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::{BoardStore, SubscriptionToken, TaskListener};
use crate::task::{Board, Column, Task, User};

const DEFAULT_COLUMN_TITLES: [&str; 3] = ["Planned", "In Progress", "Done"];

pub struct FileStore {
    pub data_dir: PathBuf,
    pub boards_path: PathBuf,
    pub columns_path: PathBuf,
    pub tasks_path: PathBuf,
    pub session_path: PathBuf,
    listeners: RefCell<Vec<BoardListener>>,
    next_token: Cell<u64>,
}

struct BoardListener {
    token: u64,
    board_id: String,
    callback: Rc<dyn Fn(&[Task])>,
}

impl fmt::Debug for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore")
            .field("data_dir", &self.data_dir)
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let boards_path = data_dir.join("boards.data");
        let columns_path = data_dir.join("columns.data");
        let tasks_path = data_dir.join("tasks.data");
        let session_path = data_dir.join("session.data");

        for path in [&boards_path, &columns_path, &tasks_path, &session_path] {
            if !path.exists() {
                fs::write(path, "")?;
            }
        }

        info!(
            data_dir = %data_dir.display(),
            boards = %boards_path.display(),
            columns = %columns_path.display(),
            tasks = %tasks_path.display(),
            session = %session_path.display(),
            "opened store"
        );

        Ok(Self {
            data_dir,
            boards_path,
            columns_path,
            tasks_path,
            session_path,
            listeners: RefCell::new(vec![]),
            next_token: Cell::new(1),
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_boards(&self) -> anyhow::Result<Vec<Board>> {
        load_jsonl(&self.boards_path).context("failed to load boards.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_board(&self, board_id: &str) -> anyhow::Result<Option<Board>> {
        Ok(self.load_boards()?.into_iter().find(|b| b.id == board_id))
    }

    #[tracing::instrument(skip(self, board), fields(board_id = %board.id))]
    pub fn save_board(&self, board: &Board) -> anyhow::Result<()> {
        let mut boards = self.load_boards()?;
        match boards.iter_mut().find(|b| b.id == board.id) {
            Some(existing) => *existing = board.clone(),
            None => boards.push(board.clone()),
        }
        save_jsonl_atomic(&self.boards_path, &boards).context("failed to save boards.data")
    }

    #[tracing::instrument(skip(self, column), fields(column_id = %column.id))]
    pub fn save_column(&self, column: &Column) -> anyhow::Result<()> {
        let mut columns = self.load_columns()?;
        match columns.iter_mut().find(|c| c.id == column.id) {
            Some(existing) => *existing = column.clone(),
            None => columns.push(column.clone()),
        }
        save_jsonl_atomic(&self.columns_path, &columns).context("failed to save columns.data")
    }

    /// Deletes a board together with all of its columns and tasks.
    #[tracing::instrument(skip(self))]
    pub fn delete_board(&self, board_id: &str) -> anyhow::Result<()> {
        let boards: Vec<Board> = self
            .load_boards()?
            .into_iter()
            .filter(|b| b.id != board_id)
            .collect();
        save_jsonl_atomic(&self.boards_path, &boards).context("failed to save boards.data")?;

        let columns: Vec<Column> = self
            .load_columns()?
            .into_iter()
            .filter(|c| c.board_id != board_id)
            .collect();
        save_jsonl_atomic(&self.columns_path, &columns).context("failed to save columns.data")?;

        let tasks: Vec<Task> = self
            .load_tasks()?
            .into_iter()
            .filter(|t| t.board_id != board_id)
            .collect();
        save_jsonl_atomic(&self.tasks_path, &tasks).context("failed to save tasks.data")?;

        info!(board_id, "deleted board with its columns and tasks");
        self.notify_board_listeners(board_id)
    }

    /// Creates a board owned by `user`, with the given column titles or
    /// the standard three when none are supplied.
    #[tracing::instrument(skip(self, user, now), fields(user_id = %user.id))]
    pub fn create_board(
        &self,
        user: &User,
        title: &str,
        column_titles: &[String],
        now: DateTime<Utc>,
    ) -> anyhow::Result<Board> {
        let board_id = Uuid::new_v4().to_string();
        let board = Board {
            id: board_id.clone(),
            title: title.to_string(),
            description: String::new(),
            members: vec![user.clone()],
            member_emails: vec![user.email.clone()],
            created_at: now,
            updated_at: now,
        };
        self.save_board(&board)?;

        let titles: Vec<String> = if column_titles.is_empty() {
            DEFAULT_COLUMN_TITLES.iter().map(|t| t.to_string()).collect()
        } else {
            column_titles.to_vec()
        };
        self.save_columns_for_new_board(&board_id, &titles)?;

        info!(board_id = %board.id, columns = titles.len(), "created board");
        Ok(board)
    }

    /// Creates the personal three-column board a fresh profile starts with.
    #[tracing::instrument(skip(self, user, now), fields(user_id = %user.id))]
    pub fn initialize_default_board(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Board> {
        let board_id = format!("personal_{}", user.id);
        let board = Board {
            id: board_id.clone(),
            title: format!("Personal tasks - {}", user.name),
            description: "Personal tasks".to_string(),
            members: vec![user.clone()],
            member_emails: vec![user.email.clone()],
            created_at: now,
            updated_at: now,
        };
        self.save_board(&board)?;

        let titles: Vec<String> = DEFAULT_COLUMN_TITLES.iter().map(|t| t.to_string()).collect();
        self.save_columns_for_new_board(&board_id, &titles)?;

        info!(board_id = %board.id, "initialized default personal board");
        Ok(board)
    }

    fn save_columns_for_new_board(&self, board_id: &str, titles: &[String]) -> anyhow::Result<()> {
        for (idx, title) in titles.iter().enumerate() {
            self.save_column(&Column {
                id: format!("{}_col{}", board_id, idx + 1),
                title: title.clone(),
                board_id: board_id.to_string(),
                order: idx as i64,
            })?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn find_task(&self, task_id: &str) -> anyhow::Result<Option<Task>> {
        Ok(self.load_tasks()?.into_iter().find(|t| t.id == task_id))
    }

    #[tracing::instrument(skip(self))]
    pub fn load_session_user(&self) -> anyhow::Result<Option<User>> {
        let raw = fs::read_to_string(&self.session_path)
            .with_context(|| format!("failed reading {}", self.session_path.display()))?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let user: User = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {}", self.session_path.display()))?;
        Ok(Some(user))
    }

    #[tracing::instrument(skip(self, user), fields(email = %user.email))]
    pub fn save_session_user(&self, user: &User) -> anyhow::Result<()> {
        let payload = serde_json::to_string(user)?;
        fs::write(&self.session_path, payload)
            .with_context(|| format!("failed writing {}", self.session_path.display()))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_session(&self) -> anyhow::Result<()> {
        fs::write(&self.session_path, "")
            .with_context(|| format!("failed writing {}", self.session_path.display()))?;
        Ok(())
    }

    fn load_columns(&self) -> anyhow::Result<Vec<Column>> {
        load_jsonl(&self.columns_path).context("failed to load columns.data")
    }

    fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.tasks_path).context("failed to load tasks.data")
    }

    fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, tasks).context("failed to save tasks.data")
    }

    fn notify_board_listeners(&self, board_id: &str) -> anyhow::Result<()> {
        // The registry borrow must be released before any callback runs:
        // a listener may subscribe or unsubscribe from inside its own
        // notification.
        let callbacks: Vec<Rc<dyn Fn(&[Task])>> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.board_id == board_id)
            .map(|l| Rc::clone(&l.callback))
            .collect();
        if callbacks.is_empty() {
            return Ok(());
        }

        let tasks = self.load_tasks_for_board(board_id)?;
        debug!(
            board_id,
            count = tasks.len(),
            "notifying board subscribers"
        );
        for callback in callbacks {
            callback(&tasks);
        }
        Ok(())
    }
}

impl BoardStore for FileStore {
    #[tracing::instrument(skip(self))]
    fn boards_for_member(&self, email: &str) -> anyhow::Result<Vec<Board>> {
        Ok(self
            .load_boards()?
            .into_iter()
            .filter(|b| b.has_member(email))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    fn load_columns_for_board(&self, board_id: &str) -> anyhow::Result<Vec<Column>> {
        let mut columns: Vec<Column> = self
            .load_columns()?
            .into_iter()
            .filter(|c| c.board_id == board_id)
            .collect();
        columns.sort_by_key(|c| c.order);
        Ok(columns)
    }

    #[tracing::instrument(skip(self))]
    fn load_tasks_for_column(&self, column_id: &str) -> anyhow::Result<Vec<Task>> {
        Ok(self
            .load_tasks()?
            .into_iter()
            .filter(|t| t.column_id == column_id)
            .collect())
    }

    #[tracing::instrument(skip(self))]
    fn load_tasks_for_board(&self, board_id: &str) -> anyhow::Result<Vec<Task>> {
        Ok(self
            .load_tasks()?
            .into_iter()
            .filter(|t| t.board_id == board_id)
            .collect())
    }

    #[tracing::instrument(skip(self, task), fields(task_id = %task.id))]
    fn create_task(&self, task: &Task) -> anyhow::Result<()> {
        let mut tasks = self.load_tasks()?;
        if tasks.iter().any(|t| t.id == task.id) {
            return Err(anyhow!("task already exists: {}", task.id));
        }
        tasks.push(task.clone());
        self.save_tasks(&tasks)?;
        self.notify_board_listeners(&task.board_id)
    }

    #[tracing::instrument(skip(self, task), fields(task_id = %task.id, column_id = %task.column_id))]
    fn update_task(&self, task: &Task) -> anyhow::Result<()> {
        let mut tasks = self.load_tasks()?;
        let existing = tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| anyhow!("task not found: {}", task.id))?;
        *existing = task.clone();
        self.save_tasks(&tasks)?;
        self.notify_board_listeners(&task.board_id)
    }

    #[tracing::instrument(skip(self))]
    fn delete_task(&self, task_id: &str) -> anyhow::Result<()> {
        let mut tasks = self.load_tasks()?;
        let Some(idx) = tasks.iter().position(|t| t.id == task_id) else {
            debug!(task_id, "delete for unknown task; ignoring");
            return Ok(());
        };
        let removed = tasks.remove(idx);
        self.save_tasks(&tasks)?;
        self.notify_board_listeners(&removed.board_id)
    }

    fn subscribe_to_board_tasks(
        &self,
        board_id: &str,
        listener: TaskListener,
    ) -> SubscriptionToken {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        self.listeners.borrow_mut().push(BoardListener {
            token,
            board_id: board_id.to_string(),
            callback: Rc::from(listener),
        });
        debug!(board_id, token, "subscribed to board tasks");
        SubscriptionToken(token)
    }

    fn unsubscribe(&self, token: SubscriptionToken) {
        self.listeners.borrow_mut().retain(|l| l.token != token.0);
        debug!(token = token.0, "unsubscribed from board tasks");
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let item: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(item);
    }

    debug!(count = out.len(), "loaded documents from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, items))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, items: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = items.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for item in items {
        let serialized = serde_json::to_string(item)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
