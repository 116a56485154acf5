//! Core domain logic for the to-do list app.
//! This crate is the single source of truth for task state and invariants;
//! the UI only renders controller state and issues intents.

pub mod config;
pub mod controller;
pub mod db;
pub mod identity;
pub mod logging;
pub mod model;
pub mod repo;
pub mod session;
pub mod swipe;

pub use config::{ConfigError, CoreConfig};
pub use controller::task_edit_controller::{
    EditPhase, LoadOutcome, TaskDraft, TaskEditController, TaskEditState,
};
pub use controller::task_list_controller::{
    FilteredView, TaskFilter, TaskListController, TaskListState,
};
pub use controller::ControllerError;
pub use identity::{CurrentUser, IdentityProvider, LocalIdentityProvider};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::task::{generate_task_id, Task, TaskId, TaskValidationError, NO_DUE_DATE, NO_TITLE};
pub use repo::memory_repo::InMemoryTaskRepository;
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use session::{SessionDriver, SessionEvent, UserSession};
pub use swipe::{
    parse_swipe_direction, SwipeAction, SwipeDirection, SwipeIntent, SwipeState, SwipeTracker,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
