//! View-state controllers driven by presentation intents.
//!
//! # Responsibility
//! - Own in-memory task state for the signed-in user.
//! - Convert repository failures into observable, non-panicking results.
//!
//! # Invariants
//! - No repository error crosses a controller boundary as a panic.
//! - Every failed intent is mirrored into the controller's `last_error`.

use crate::model::task::TaskId;
use crate::repo::task_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod task_edit_controller;
pub mod task_list_controller;

/// Failure reported by a controller intent.
///
/// Carries messages rather than source errors so it can live in
/// observable (cloneable) state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// Target task is absent. Informational, not a hard failure.
    NotFound(TaskId),
    /// Loading from the store failed; state fell back to empty.
    LoadFailed(String),
    /// Write or delete was rejected or the store was unreachable.
    WriteFailed(String),
    /// No signed-in user, or the caller is not the loaded owner.
    Unauthenticated,
    /// Another mutation for the same task is still in flight.
    Busy(TaskId),
    /// Save requested for a draft with no pending changes.
    NothingToSave,
}

impl ControllerError {
    pub(crate) fn load_failed(err: &RepoError) -> Self {
        Self::LoadFailed(err.to_string())
    }

    pub(crate) fn write_failed(err: &RepoError) -> Self {
        Self::WriteFailed(err.to_string())
    }

    /// Stable machine-readable code for logs and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::LoadFailed(_) => "load_failed",
            Self::WriteFailed(_) => "write_failed",
            Self::Unauthenticated => "unauthenticated",
            Self::Busy(_) => "busy",
            Self::NothingToSave => "nothing_to_save",
        }
    }
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::LoadFailed(message) => write!(f, "failed to load tasks: {message}"),
            Self::WriteFailed(message) => write!(f, "task write failed: {message}"),
            Self::Unauthenticated => write!(f, "no signed-in user"),
            Self::Busy(id) => write!(f, "task `{id}` already has an operation in flight"),
            Self::NothingToSave => write!(f, "draft has no changes to save"),
        }
    }
}

impl Error for ControllerError {}
