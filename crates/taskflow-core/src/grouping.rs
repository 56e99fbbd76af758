//! In-memory grouping of tasks by column: the board view's single source
//! of truth for on-screen placement.

use std::collections::BTreeMap;

use tracing::debug;

use crate::task::{Column, Task};

/// Mapping from column id to that column's ordered task sequence.
///
/// Ordering within a column is display order: most recently updated first
/// when built from a load, insertion order after that.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnGrouping {
    by_column: BTreeMap<String, Vec<Task>>,
}

impl ColumnGrouping {
    /// Groups `tasks` under the known columns, keeping a (possibly empty)
    /// entry for every column and sorting each bucket most recently
    /// updated first. Tasks pointing at a column that does not exist on
    /// this board are dropped.
    pub fn from_tasks(columns: &[Column], tasks: Vec<Task>) -> Self {
        let mut by_column: BTreeMap<String, Vec<Task>> = columns
            .iter()
            .map(|col| (col.id.clone(), Vec::new()))
            .collect();

        for task in tasks {
            match by_column.get_mut(&task.column_id) {
                Some(bucket) => bucket.push(task),
                None => {
                    debug!(
                        task_id = %task.id,
                        column_id = %task.column_id,
                        "dropping task for unknown column"
                    );
                }
            }
        }

        for bucket in by_column.values_mut() {
            bucket.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        }

        Self { by_column }
    }

    pub fn column_of_task(&self, task_id: &str) -> Option<&str> {
        self.by_column
            .iter()
            .find(|(_, tasks)| tasks.iter().any(|t| t.id == task_id))
            .map(|(column_id, _)| column_id.as_str())
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.by_column
            .values()
            .flatten()
            .find(|t| t.id == task_id)
    }

    pub fn tasks_in(&self, column_id: &str) -> &[Task] {
        self.by_column
            .get(column_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn remove_task(&mut self, task_id: &str) -> Option<Task> {
        for tasks in self.by_column.values_mut() {
            if let Some(idx) = tasks.iter().position(|t| t.id == task_id) {
                return Some(tasks.remove(idx));
            }
        }
        None
    }

    /// Appends the task to the end of the column's sequence, creating the
    /// column entry if it is not present yet.
    pub fn append_task(&mut self, column_id: &str, task: Task) {
        self.by_column
            .entry(column_id.to_string())
            .or_default()
            .push(task);
    }

    pub fn total_tasks(&self) -> usize {
        self.by_column.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_tasks() == 0
    }
}

/// Whether `id` names a column (as opposed to a task) on this board.
pub fn is_column_id(columns: &[Column], id: &str) -> bool {
    columns.iter().any(|col| col.id == id)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{ColumnGrouping, is_column_id};
    use crate::task::{Column, Priority, Task};

    fn column(id: &str, order: i64) -> Column {
        Column {
            id: id.to_string(),
            title: id.to_string(),
            board_id: "b1".to_string(),
            order,
        }
    }

    fn task(id: &str, column_id: &str, age_secs: i64) -> Task {
        let now = Utc::now();
        let mut t = Task::new(
            format!("task {id}"),
            "b1".to_string(),
            column_id.to_string(),
            Priority::Medium,
            now - Duration::seconds(age_secs),
        );
        t.id = id.to_string();
        t
    }

    #[test]
    fn groups_with_recently_updated_first_and_keeps_empty_columns() {
        let columns = vec![column("backlog", 0), column("doing", 1), column("done", 2)];
        let tasks = vec![
            task("t2", "backlog", 60),
            task("t1", "backlog", 0),
            task("t3", "doing", 30),
        ];

        let grouping = ColumnGrouping::from_tasks(&columns, tasks);

        let backlog: Vec<&str> = grouping
            .tasks_in("backlog")
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(backlog, vec!["t1", "t2"]);
        assert_eq!(grouping.tasks_in("doing").len(), 1);
        assert!(grouping.tasks_in("done").is_empty());
    }

    #[test]
    fn drops_tasks_for_unknown_columns() {
        let columns = vec![column("backlog", 0)];
        let tasks = vec![task("t1", "backlog", 0), task("ghost", "no-such-column", 0)];

        let grouping = ColumnGrouping::from_tasks(&columns, tasks);

        assert_eq!(grouping.total_tasks(), 1);
        assert_eq!(grouping.column_of_task("ghost"), None);
    }

    #[test]
    fn finds_column_of_task() {
        let columns = vec![column("backlog", 0), column("doing", 1)];
        let grouping =
            ColumnGrouping::from_tasks(&columns, vec![task("t1", "backlog", 0), task("t3", "doing", 0)]);

        assert_eq!(grouping.column_of_task("t1"), Some("backlog"));
        assert_eq!(grouping.column_of_task("t3"), Some("doing"));
        assert_eq!(grouping.column_of_task("missing"), None);
    }

    #[test]
    fn remove_then_append_moves_a_task() {
        let columns = vec![column("backlog", 0), column("doing", 1)];
        let mut grouping =
            ColumnGrouping::from_tasks(&columns, vec![task("t1", "backlog", 0), task("t3", "doing", 0)]);

        let moved = grouping.remove_task("t1").expect("t1 present");
        grouping.append_task("doing", moved);

        assert!(grouping.tasks_in("backlog").is_empty());
        let doing: Vec<&str> = grouping
            .tasks_in("doing")
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(doing, vec!["t3", "t1"]);
    }

    #[test]
    fn distinguishes_column_ids_from_task_ids() {
        let columns = vec![column("backlog", 0)];
        assert!(is_column_id(&columns, "backlog"));
        assert!(!is_column_id(&columns, "t1"));
    }
}
