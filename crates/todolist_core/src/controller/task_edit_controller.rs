//! Task edit controller.
//!
//! # Responsibility
//! - Own the draft of one task being created or edited.
//! - Load drafts by id and save them as full-document upserts.
//!
//! # Invariants
//! - Setters never validate; empty strings are accepted.
//! - `save` never panics or propagates an error; it returns `false`.
//! - A generated id is kept in the draft, so retries overwrite one document.
//! - `Saved` only returns to `Empty` through `reset()`.
//! - Untouched (`Empty`) or already saved drafts are never written.

use crate::controller::ControllerError;
use crate::model::task::{generate_task_id, Task, TaskId};
use crate::repo::task_repo::TaskRepository;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Editable working copy of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    /// Empty until the first save of a new task.
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub due_date: Option<String>,
    pub is_finished: bool,
    pub owner_id: String,
}

impl TaskDraft {
    /// Builds a draft from a stored task, applying empty fallbacks.
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            name: task.name.clone().unwrap_or_default(),
            description: task.description.clone().unwrap_or_default(),
            due_date: task.due_date.clone(),
            is_finished: task.is_finished.unwrap_or(false),
            owner_id: task.owner_id.clone(),
        }
    }

    /// Full task document for this draft.
    pub fn to_task(&self) -> Task {
        Task {
            id: self.id.clone(),
            owner_id: self.owner_id.clone(),
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            due_date: self.due_date.clone(),
            is_finished: Some(self.is_finished),
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }
}

/// Lifecycle of the draft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditPhase {
    #[default]
    Empty,
    Loading,
    Populated,
    Editing,
    Saving,
    Saved,
    SaveFailed,
}

/// Observable edit state rendered by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEditState {
    pub draft: TaskDraft,
    pub phase: EditPhase,
    pub last_error: Option<ControllerError>,
}

/// Result of `load_for_edit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Populated,
    /// Informational: the draft stays at defaults.
    NotFound,
    Failed,
}

pub struct TaskEditController<R: TaskRepository + ?Sized> {
    repo: Arc<R>,
    state: watch::Sender<TaskEditState>,
    /// When set, tasks owned by anyone else load as `NotFound`.
    owner_scope: Option<String>,
}

impl<R: TaskRepository + ?Sized> TaskEditController<R> {
    pub fn new(repo: Arc<R>) -> Self {
        let (state, _) = watch::channel(TaskEditState::default());
        Self {
            repo,
            state,
            owner_scope: None,
        }
    }

    /// Editor that only loads tasks owned by `owner_id`.
    pub fn for_owner(repo: Arc<R>, owner_id: impl Into<String>) -> Self {
        Self {
            owner_scope: Some(owner_id.into()),
            ..Self::new(repo)
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskEditState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> TaskEditState {
        self.state.borrow().clone()
    }

    pub fn draft(&self) -> TaskDraft {
        self.state.borrow().draft.clone()
    }

    pub fn phase(&self) -> EditPhase {
        self.state.borrow().phase
    }

    pub fn last_error(&self) -> Option<ControllerError> {
        self.state.borrow().last_error.clone()
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.edit(|draft| draft.name = value);
    }

    pub fn set_description(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.edit(|draft| draft.description = value);
    }

    pub fn set_due_date(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.edit(|draft| draft.due_date = Some(value));
    }

    pub fn set_finished(&mut self, value: bool) {
        self.edit(|draft| draft.is_finished = value);
    }

    /// Replaces the draft with the stored task `task_id`.
    ///
    /// A scoped editor reports tasks of other owners as `NotFound`.
    pub async fn load_for_edit(&mut self, task_id: &str) -> LoadOutcome {
        let started_at = Instant::now();
        self.state.send_modify(|state| {
            state.phase = EditPhase::Loading;
            state.last_error = None;
        });

        let fetched = self
            .repo
            .get_task(task_id)
            .await
            .map(|found| found.filter(|task| self.in_scope(task)));

        match fetched {
            Ok(Some(task)) => {
                info!(
                    "event=draft_load module=task_edit status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                self.state.send_replace(TaskEditState {
                    draft: TaskDraft::from_task(&task),
                    phase: EditPhase::Populated,
                    last_error: None,
                });
                LoadOutcome::Populated
            }
            Ok(None) => {
                info!("event=draft_load module=task_edit status=not_found");
                self.state.send_replace(TaskEditState {
                    last_error: Some(ControllerError::NotFound(task_id.to_string())),
                    ..TaskEditState::default()
                });
                LoadOutcome::NotFound
            }
            Err(err) => {
                error!(
                    "event=draft_load module=task_edit status=error duration_ms={} error_code=load_failed error={err}",
                    started_at.elapsed().as_millis()
                );
                self.state.send_replace(TaskEditState {
                    last_error: Some(ControllerError::load_failed(&err)),
                    ..TaskEditState::default()
                });
                LoadOutcome::Failed
            }
        }
    }

    /// Writes the whole draft for `owner_id`; returns whether it was stored.
    ///
    /// Only `Populated`, `Editing` and `SaveFailed` drafts are written; any
    /// other phase records `NothingToSave` without a store call.
    pub async fn save(&mut self, owner_id: &str) -> bool {
        if !matches!(
            self.phase(),
            EditPhase::Populated | EditPhase::Editing | EditPhase::SaveFailed
        ) {
            warn!("event=draft_save module=task_edit status=error error_code=nothing_to_save");
            self.state.send_modify(|state| {
                state.last_error = Some(ControllerError::NothingToSave);
            });
            return false;
        }
        if owner_id.trim().is_empty() {
            warn!("event=draft_save module=task_edit status=error error_code=unauthenticated");
            self.state.send_modify(|state| {
                state.phase = EditPhase::SaveFailed;
                state.last_error = Some(ControllerError::Unauthenticated);
            });
            return false;
        }

        let started_at = Instant::now();
        let mut draft = self.draft();
        if draft.is_new() {
            draft.id = generate_task_id();
        }
        draft.owner_id = owner_id.to_string();
        let task = draft.to_task();
        self.state.send_modify(|state| {
            state.draft = draft;
            state.phase = EditPhase::Saving;
            state.last_error = None;
        });

        match self.repo.upsert_task(&task).await {
            Ok(()) => {
                info!(
                    "event=draft_save module=task_edit status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                self.state.send_modify(|state| state.phase = EditPhase::Saved);
                true
            }
            Err(err) => {
                error!(
                    "event=draft_save module=task_edit status=error duration_ms={} error_code=write_failed error={err}",
                    started_at.elapsed().as_millis()
                );
                self.state.send_modify(|state| {
                    state.phase = EditPhase::SaveFailed;
                    state.last_error = Some(ControllerError::write_failed(&err));
                });
                false
            }
        }
    }

    /// Restores an empty draft, e.g. when leaving the edit screen.
    pub fn reset(&mut self) {
        self.state.send_replace(TaskEditState::default());
    }

    fn in_scope(&self, task: &Task) -> bool {
        match self.owner_scope.as_deref() {
            Some(owner) => task.owner_id == owner,
            None => true,
        }
    }

    fn edit(&mut self, apply: impl FnOnce(&mut TaskDraft)) {
        self.state.send_modify(|state| {
            apply(&mut state.draft);
            state.phase = EditPhase::Editing;
        });
    }
}
