//! Persistence collaborator interface for the board view.
//!
//! The drag coordinator and the command layer only talk to storage through
//! this trait, so the file-backed store can be swapped for a recording or
//! failure-injecting one in tests.

use crate::task::{Board, Column, Task};

/// Callback invoked with the full task set of a board after any task
/// mutation on that board.
pub type TaskListener = Box<dyn Fn(&[Task])>;

/// Handle returned by [`BoardStore::subscribe_to_board_tasks`], used to
/// detach the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionToken(pub(crate) u64);

pub trait BoardStore {
    /// Boards the given member email belongs to.
    fn boards_for_member(&self, email: &str) -> anyhow::Result<Vec<Board>>;

    /// Columns of a board in ascending display order.
    fn load_columns_for_board(&self, board_id: &str) -> anyhow::Result<Vec<Column>>;

    fn load_tasks_for_column(&self, column_id: &str) -> anyhow::Result<Vec<Task>>;

    fn load_tasks_for_board(&self, board_id: &str) -> anyhow::Result<Vec<Task>>;

    fn create_task(&self, task: &Task) -> anyhow::Result<()>;

    /// Replace the stored task with the same id. Fails cleanly: on error
    /// nothing is persisted and no listener fires.
    fn update_task(&self, task: &Task) -> anyhow::Result<()>;

    fn delete_task(&self, task_id: &str) -> anyhow::Result<()>;

    fn subscribe_to_board_tasks(&self, board_id: &str, listener: TaskListener)
    -> SubscriptionToken;

    fn unsubscribe(&self, token: SubscriptionToken);
}
