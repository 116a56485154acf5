//! Task list controller.
//!
//! # Responsibility
//! - Hold the signed-in user's tasks in repository order.
//! - Project pending/done views without copying the list.
//! - Forward completion and delete intents to the repository.
//!
//! # Invariants
//! - `tasks` only contains tasks whose `owner_id` equals `owner_id`.
//! - Completion is applied optimistically and rolled back on a failed write.
//! - At most one mutation per task id is in flight; overlaps get `Busy`.
//! - A failed load leaves an empty list, never a partial one.

use crate::controller::ControllerError;
use crate::model::task::{Task, TaskId};
use crate::repo::task_repo::TaskRepository;
use log::{error, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;

/// Which half of the list a view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    /// `is_finished != Some(true)` ("TO DO" tab).
    Pending,
    /// `is_finished == Some(true)` ("DONE" tab).
    Done,
}

impl TaskFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::Pending => !task.is_done(),
            Self::Done => task.is_done(),
        }
    }
}

/// Observable list state rendered by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListState {
    /// User whose tasks are (being) loaded.
    pub owner_id: Option<String>,
    pub tasks: Vec<Task>,
    pub loading: bool,
    /// Failure of the most recent intent, cleared by the next success.
    pub last_error: Option<ControllerError>,
}

impl TaskListState {
    /// Lazily iterates the tasks matching `filter`, in list order.
    pub fn filtered(&self, filter: TaskFilter) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter().filter(move |task| filter.matches(task))
    }

    pub fn find(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }
}

/// Non-owning projection of the current list through one filter.
///
/// Holds a read lock on the controller state; drop it before issuing
/// further intents on the same controller.
pub struct FilteredView<'a> {
    state: watch::Ref<'a, TaskListState>,
    filter: TaskFilter,
}

impl FilteredView<'_> {
    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.state.filtered(self.filter)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.iter().map(|task| task.id.clone()).collect()
    }
}

/// Owner of the in-memory task sequence for one user session.
pub struct TaskListController<R: TaskRepository + ?Sized> {
    repo: Arc<R>,
    state: watch::Sender<TaskListState>,
    in_flight: Mutex<HashSet<TaskId>>,
}

impl<R: TaskRepository + ?Sized> TaskListController<R> {
    pub fn new(repo: Arc<R>) -> Self {
        let (state, _) = watch::channel(TaskListState::default());
        Self {
            repo,
            state,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Subscribes to state changes for rendering.
    pub fn subscribe(&self) -> watch::Receiver<TaskListState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> TaskListState {
        self.state.borrow().clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    pub fn filtered_view(&self, filter: TaskFilter) -> FilteredView<'_> {
        FilteredView {
            state: self.state.borrow(),
            filter,
        }
    }

    /// Returns `(pending, done)` counts.
    pub fn counts(&self) -> (usize, usize) {
        let state = self.state.borrow();
        let done = state.filtered(TaskFilter::Done).count();
        (state.tasks.len() - done, done)
    }

    pub fn last_error(&self) -> Option<ControllerError> {
        self.state.borrow().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.last_error.take().is_some());
    }

    /// Replaces the list with every task owned by `user_id`.
    ///
    /// Returns the number of tasks loaded. A backend failure empties the
    /// list and records `LoadFailed`; no retry is attempted. Results of a
    /// load superseded by a load for another user are discarded.
    pub async fn load_tasks_for_user(&self, user_id: &str) -> usize {
        if user_id.trim().is_empty() {
            warn!("event=tasks_load module=task_list status=error error_code=unauthenticated");
            self.state.send_modify(|state| {
                state.owner_id = None;
                state.tasks.clear();
                state.loading = false;
                state.last_error = Some(ControllerError::Unauthenticated);
            });
            return 0;
        }

        let started_at = Instant::now();
        info!("event=tasks_load module=task_list status=start");
        self.state.send_modify(|state| {
            if state.owner_id.as_deref() != Some(user_id) {
                state.tasks.clear();
            }
            state.owner_id = Some(user_id.to_string());
            state.loading = true;
        });

        let result = self.repo.list_tasks_for_owner(user_id).await;
        let (tasks, failure) = match result {
            Ok(mut tasks) => {
                let fetched = tasks.len();
                tasks.retain(|task| task.owner_id == user_id);
                if tasks.len() != fetched {
                    warn!(
                        "event=tasks_load module=task_list status=ok dropped_foreign={}",
                        fetched - tasks.len()
                    );
                }
                info!(
                    "event=tasks_load module=task_list status=ok count={} duration_ms={}",
                    tasks.len(),
                    started_at.elapsed().as_millis()
                );
                (tasks, None)
            }
            Err(err) => {
                error!(
                    "event=tasks_load module=task_list status=error duration_ms={} error_code=load_failed error={err}",
                    started_at.elapsed().as_millis()
                );
                (Vec::new(), Some(ControllerError::load_failed(&err)))
            }
        };

        let loaded = tasks.len();
        let applied = self.state.send_if_modified(|state| {
            if state.owner_id.as_deref() != Some(user_id) {
                return false;
            }
            state.tasks = tasks;
            state.loading = false;
            state.last_error = failure;
            true
        });
        if applied {
            loaded
        } else {
            info!("event=tasks_load module=task_list status=stale");
            0
        }
    }

    /// Marks a task done or pending.
    ///
    /// The list shows the new value immediately; the full document is then
    /// written and the entry is restored if the write fails.
    pub async fn set_completion(&self, task_id: &str, is_done: bool) -> Result<(), ControllerError> {
        let Some(previous) = self.find_task(task_id) else {
            return Err(self.fail(ControllerError::NotFound(task_id.to_string())));
        };
        let _guard = self.begin_mutation(task_id)?;

        let mut updated = previous.clone();
        updated.is_finished = Some(is_done);
        self.state.send_modify(|state| {
            if let Some(entry) = state.tasks.iter_mut().find(|task| task.id == task_id) {
                *entry = updated.clone();
            }
        });

        match self.repo.upsert_task(&updated).await {
            Ok(()) => {
                info!("event=task_complete module=task_list status=ok is_done={is_done}");
                self.succeed();
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=task_complete module=task_list status=error error_code=write_failed error={err}"
                );
                self.state.send_modify(|state| {
                    if let Some(entry) = state.tasks.iter_mut().find(|task| task.id == task_id) {
                        if *entry == updated {
                            *entry = previous;
                        }
                    }
                });
                Err(self.fail(ControllerError::write_failed(&err)))
            }
        }
    }

    /// Deletes a task from the store, then from the list.
    ///
    /// Ids missing from the list are looked up first: a task stored for
    /// another owner is rejected as `NotFound`, an absent one is still sent
    /// to the store, which treats it as a successful no-op.
    pub async fn delete_task(&self, task_id: &str, user_id: &str) -> Result<(), ControllerError> {
        if !self.is_loaded_owner(user_id) {
            warn!("event=task_delete module=task_list status=error error_code=unauthenticated");
            return Err(self.fail(ControllerError::Unauthenticated));
        }
        let _guard = self.begin_mutation(task_id)?;

        if self.find_task(task_id).is_none() {
            match self.repo.get_task(task_id).await {
                Ok(Some(stored)) if stored.owner_id != user_id => {
                    warn!("event=task_delete module=task_list status=error error_code=foreign_task");
                    return Err(self.fail(ControllerError::NotFound(task_id.to_string())));
                }
                Ok(_) => {}
                Err(err) => {
                    error!(
                        "event=task_delete module=task_list status=error error_code=write_failed error={err}"
                    );
                    return Err(self.fail(ControllerError::write_failed(&err)));
                }
            }
        }

        match self.repo.delete_task(task_id).await {
            Ok(()) => {
                info!("event=task_delete module=task_list status=ok");
                self.state.send_modify(|state| {
                    state.tasks.retain(|task| task.id != task_id);
                    state.last_error = None;
                });
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=task_delete module=task_list status=error error_code=write_failed error={err}"
                );
                Err(self.fail(ControllerError::write_failed(&err)))
            }
        }
    }

    /// Merges a task whose write the store already confirmed.
    ///
    /// Returns `false` (and changes nothing) when the task belongs to
    /// someone other than the loaded owner.
    pub fn record_saved(&self, task: Task) -> bool {
        self.state.send_if_modified(|state| {
            if state.owner_id.as_deref() != Some(task.owner_id.as_str()) {
                return false;
            }
            match state.tasks.iter_mut().find(|entry| entry.id == task.id) {
                Some(entry) => *entry = task,
                None => state.tasks.push(task),
            }
            true
        })
    }

    fn find_task(&self, task_id: &str) -> Option<Task> {
        self.state.borrow().find(task_id).cloned()
    }

    fn is_loaded_owner(&self, user_id: &str) -> bool {
        if user_id.trim().is_empty() {
            return false;
        }
        match self.state.borrow().owner_id.as_deref() {
            Some(owner) => owner == user_id,
            None => true,
        }
    }

    fn begin_mutation(&self, task_id: &str) -> Result<InFlightGuard<'_>, ControllerError> {
        let inserted = match self.in_flight.lock() {
            Ok(mut in_flight) => in_flight.insert(task_id.to_string()),
            Err(_) => {
                return Err(self.fail(ControllerError::WriteFailed(
                    "mutation tracker poisoned".to_string(),
                )))
            }
        };
        if !inserted {
            warn!("event=task_mutation module=task_list status=rejected error_code=busy");
            return Err(self.fail(ControllerError::Busy(task_id.to_string())));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            task_id: task_id.to_string(),
        })
    }

    fn succeed(&self) {
        self.state
            .send_if_modified(|state| state.last_error.take().is_some());
    }

    fn fail(&self, err: ControllerError) -> ControllerError {
        let recorded = err.clone();
        self.state.send_modify(|state| state.last_error = Some(recorded));
        err
    }
}

/// Releases a task id from the in-flight set when the mutation ends.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<TaskId>>,
    task_id: TaskId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.task_id);
        }
    }
}
