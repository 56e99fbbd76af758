//! Drag-and-drop coordinator for the board view.
//!
//! Owns the live [`ColumnGrouping`] and mediates the drag lifecycle:
//! a snapshot of the grouping is captured when a drag begins, every
//! subsequent event recomputes its move from that immutable snapshot (so
//! repeated or out-of-order hover events cannot drift), and the drop
//! either commits exactly one `update_task` call or rolls the grouping
//! back to the snapshot. Storage failures are absorbed here; the view
//! layer only ever sees a consistent grouping.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::grouping::{ColumnGrouping, is_column_id};
use crate::store::BoardStore;
use crate::task::{Column, Task};

/// Transient record of the task currently being dragged.
#[derive(Debug, Clone)]
pub struct ActiveDrag {
    pub task_id: String,
    pub task: Task,
}

/// Terminal state of a drag gesture. Only `Committed` leaves the grouping
/// different from its pre-drag state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Cross-column move persisted; the task now lives in the target column.
    Committed,
    /// Drop resolved to the origin column; nothing was persisted.
    SameColumn,
    /// No drop target, or the task/target could not be resolved.
    Cancelled,
    /// The persistence call failed; the grouping snapped back.
    RolledBack,
}

enum DropResolution {
    Cancel,
    SameColumn,
    Move { task: Task, target: String },
}

pub struct DragCoordinator {
    columns: Vec<Column>,
    grouping: ColumnGrouping,
    snapshot: Option<ColumnGrouping>,
    active: Option<ActiveDrag>,
    deferred_push: Option<Vec<Task>>,
    on_change: Option<Box<dyn Fn(&ColumnGrouping)>>,
}

impl DragCoordinator {
    pub fn new(columns: Vec<Column>, grouping: ColumnGrouping) -> Self {
        Self {
            columns,
            grouping,
            snapshot: None,
            active: None,
            deferred_push: None,
            on_change: None,
        }
    }

    pub fn grouping(&self) -> &ColumnGrouping {
        &self.grouping
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn active_drag(&self) -> Option<&ActiveDrag> {
        self.active.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Registers a callback fired whenever the live grouping is replaced.
    pub fn set_on_change(&mut self, callback: impl Fn(&ColumnGrouping) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    /// Entry point for pushed board snapshots from the store subscription.
    ///
    /// While a drag is in flight the push is stashed (latest wins) and
    /// replayed once the gesture reaches a terminal state, so an active
    /// gesture is never clobbered mid-flight.
    pub fn apply_board_tasks(&mut self, tasks: Vec<Task>) {
        if self.snapshot.is_some() {
            debug!(
                count = tasks.len(),
                "drag in progress; deferring pushed board snapshot"
            );
            self.deferred_push = Some(tasks);
            return;
        }
        let grouping = ColumnGrouping::from_tasks(&self.columns, tasks);
        self.set_grouping(grouping);
    }

    /// Starts a drag gesture for `task_id`.
    ///
    /// Captures the rollback snapshot and records the active drag. If the
    /// task is not in any column this is a silent no-op.
    pub fn begin_drag(&mut self, task_id: &str) {
        let Some(task) = self.grouping.task(task_id).cloned() else {
            debug!(task_id, "drag started for unknown task; ignoring");
            return;
        };

        debug!(task_id, "drag started");
        self.snapshot = Some(self.grouping.clone());
        self.active = Some(ActiveDrag {
            task_id: task_id.to_string(),
            task,
        });
    }

    /// Handles a hover event over `over` (a column id, a task id, or
    /// nothing when the pointer is over empty space).
    ///
    /// Purely in-memory: the live grouping is rebuilt from the snapshot
    /// with the dragged task appended to the candidate column, or restored
    /// to the snapshot when hovering back over the origin.
    pub fn drag_over(&mut self, over: Option<&str>) {
        let Some(over_id) = over else { return };
        let (Some(snapshot), Some(active)) = (&self.snapshot, &self.active) else {
            return;
        };

        let Some(source) = snapshot.column_of_task(&active.task_id) else {
            return;
        };
        let Some(candidate) = resolve_column(&self.columns, snapshot, over_id) else {
            return;
        };

        if candidate == source {
            // Back over the origin: undo any pending speculative move.
            let restored = snapshot.clone();
            self.set_grouping(restored);
            return;
        }

        let task_id = active.task_id.clone();
        let candidate = candidate.to_string();
        let mut working = snapshot.clone();
        let Some(task) = working.remove_task(&task_id) else {
            return;
        };
        working.append_task(&candidate, task);
        self.set_grouping(working);
    }

    /// Ends the gesture. `over` is the element the pointer was released
    /// on; `None` means the drop was cancelled.
    ///
    /// At most one persisted write happens here, and only for a resolved
    /// cross-column move. Every path clears the active drag and the
    /// snapshot, then replays any board push that arrived mid-gesture.
    pub fn end_drag(
        &mut self,
        over: Option<&str>,
        store: &dyn BoardStore,
        now: DateTime<Utc>,
    ) -> DragOutcome {
        let active = self.active.take();
        let Some(snapshot) = self.snapshot.take() else {
            return DragOutcome::Cancelled;
        };

        let resolution = resolve_drop(&self.columns, &snapshot, active.as_ref(), over);
        let outcome = match resolution {
            DropResolution::Cancel => {
                debug!("drag cancelled; restoring pre-drag grouping");
                self.set_grouping(snapshot);
                DragOutcome::Cancelled
            }
            DropResolution::SameColumn => {
                debug!("drop resolved to origin column; nothing to persist");
                self.set_grouping(snapshot);
                DragOutcome::SameColumn
            }
            DropResolution::Move { mut task, target } => {
                task.column_id = target.clone();
                task.updated_at = now;

                match store.update_task(&task) {
                    Ok(()) => {
                        info!(task_id = %task.id, target = %target, "task moved");
                        // Recompute the committed grouping from the snapshot
                        // rather than trusting whatever the last hover left
                        // behind, so the final state matches the write even
                        // if no hover event fired over the target.
                        let mut committed = snapshot;
                        committed.remove_task(&task.id);
                        committed.append_task(&target, task.clone());
                        self.set_grouping(committed);
                        DragOutcome::Committed
                    }
                    Err(err) => {
                        warn!(
                            task_id = %task.id,
                            target = %target,
                            error = %err,
                            "task move failed; rolling back"
                        );
                        self.set_grouping(snapshot);
                        DragOutcome::RolledBack
                    }
                }
            }
        };

        if let Some(tasks) = self.deferred_push.take() {
            debug!("replaying board snapshot deferred during drag");
            self.apply_board_tasks(tasks);
        }

        outcome
    }

    fn set_grouping(&mut self, grouping: ColumnGrouping) {
        self.grouping = grouping;
        if let Some(callback) = &self.on_change {
            callback(&self.grouping);
        }
    }
}

/// Resolves `over_id` to a column: either it names a column directly, or
/// it is a task id and the snapshot column holding that task wins.
fn resolve_column<'a>(
    columns: &'a [Column],
    snapshot: &'a ColumnGrouping,
    over_id: &'a str,
) -> Option<&'a str> {
    if is_column_id(columns, over_id) {
        return Some(over_id);
    }
    snapshot.column_of_task(over_id)
}

fn resolve_drop(
    columns: &[Column],
    snapshot: &ColumnGrouping,
    active: Option<&ActiveDrag>,
    over: Option<&str>,
) -> DropResolution {
    let Some(over_id) = over else {
        return DropResolution::Cancel;
    };
    let Some(active) = active else {
        return DropResolution::Cancel;
    };
    let Some(source) = snapshot.column_of_task(&active.task_id) else {
        return DropResolution::Cancel;
    };
    let Some(target) = resolve_column(columns, snapshot, over_id) else {
        return DropResolution::Cancel;
    };

    if target == source {
        DropResolution::SameColumn
    } else {
        DropResolution::Move {
            task: active.task.clone(),
            target: target.to_string(),
        }
    }
}
