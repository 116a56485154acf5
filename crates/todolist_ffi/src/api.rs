//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the session controllers as flat, use-case level functions.
//! - Translate controller state into plain data envelopes for Dart.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - One process-wide session driver follows the local identity provider.
//! - Every call that needs a signed-in user reports `unauthenticated`
//!   instead of touching the store when nobody is signed in.

use futures::executor::block_on;
use once_cell::sync::{Lazy, OnceCell};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use todolist_core::{
    core_version as core_version_inner, init_logging as init_logging_inner,
    init_logging_from_config, logging_status, parse_swipe_direction, ping as ping_inner,
    ControllerError, CoreConfig, CurrentUser, IdentityProvider, LocalIdentityProvider,
    SessionDriver, SessionEvent, SqliteTaskRepository, SwipeAction, SwipeTracker, Task, TaskDraft,
    TaskFilter, UserSession,
};

static DB_PATH: OnceCell<PathBuf> = OnceCell::new();
static APP: Lazy<Mutex<Option<AppState>>> = Lazy::new(|| Mutex::new(None));

struct AppState {
    identity: LocalIdentityProvider,
    driver: SessionDriver<SqliteTaskRepository>,
}

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory for rolling logs.
/// - Idempotent for the same inputs; returns empty string on success and an
///   error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Pins the task store path for this process.
///
/// Must run before the first sign-in. Returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_db_path(path: String) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return "db path cannot be empty".to_string();
    }
    let requested = PathBuf::from(trimmed);
    match DB_PATH.set(requested.clone()) {
        Ok(()) => String::new(),
        Err(_) if DB_PATH.get() == Some(&requested) => String::new(),
        Err(_) => format!(
            "db path already configured at `{}`",
            resolve_db_path().display()
        ),
    }
}

/// Signed-in user projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserItem {
    pub user_id: String,
    pub display_name: String,
}

/// Session response envelope for auth flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResponse {
    pub ok: bool,
    /// `true` when the UI should navigate to the sign-in screen.
    pub requires_sign_in: bool,
    pub user: Option<UserItem>,
    pub message: String,
}

/// Task row projection with display fallbacks applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub task_id: String,
    pub title: String,
    pub due_label: String,
    pub description: Option<String>,
    pub is_finished: bool,
}

/// List response envelope for the home screen tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub items: Vec<TaskItem>,
    pub pending_count: u32,
    pub done_count: u32,
    /// Stable code of the last failed list intent, if any.
    pub error_code: Option<String>,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub task_id: Option<String>,
    pub error_code: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, task_id: Option<String>) -> Self {
        Self {
            ok: true,
            task_id,
            error_code: None,
            message: message.into(),
        }
    }

    fn failure(err: &ControllerError) -> Self {
        Self {
            ok: false,
            task_id: None,
            error_code: Some(err.code().to_string()),
            message: err.to_string(),
        }
    }
}

/// Draft projection for the add/edit screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftResponse {
    pub task_id: String,
    pub name: String,
    pub description: String,
    pub due_date: Option<String>,
    pub is_finished: bool,
    /// Edit phase (`empty|loading|populated|editing|saving|saved|save_failed`).
    pub phase: String,
    pub error_code: Option<String>,
    pub message: String,
}

/// Result of a swipe gesture on a task row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeResponse {
    /// `edit` (navigate to the edit screen) or `delete`.
    pub action: String,
    pub result: ActionResponse,
}

/// Signs `user_id` in and starts their session.
#[flutter_rust_bridge::frb(sync)]
pub fn auth_sign_in(user_id: String, display_name: String) -> SessionResponse {
    with_app(|app| {
        app.identity
            .sign_in(CurrentUser::new(user_id.trim(), display_name.trim()));
        let event = block_on(app.driver.sync());
        let message = match event {
            SessionEvent::Started { .. } => "Signed in.",
            SessionEvent::Ended => "Signed out.",
            SessionEvent::Unchanged => "Session unchanged.",
        };
        session_response(app, message)
    })
    .unwrap_or_else(session_failure)
}

/// Signs out and drops the session controllers.
#[flutter_rust_bridge::frb(sync)]
pub fn auth_sign_out() -> SessionResponse {
    with_app(|app| {
        app.identity.sign_out();
        block_on(app.driver.sync());
        session_response(app, "Signed out.")
    })
    .unwrap_or_else(session_failure)
}

#[flutter_rust_bridge::frb(sync)]
pub fn auth_current_user() -> Option<UserItem> {
    with_app(|app| app.driver.session().map(|session| user_item(session.user())))
        .ok()
        .flatten()
}

/// Reloads the signed-in user's tasks and returns the pending tab.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_reload() -> TaskListResponse {
    with_session(|session| {
        block_on(session.refresh());
        list_response(session, TaskFilter::Pending)
    })
    .unwrap_or_else(|err| list_failure(&err))
}

/// Returns one tab of the current list without hitting the store.
///
/// `filter` is `pending` (default) or `done`.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_list(filter: String) -> TaskListResponse {
    let filter = match filter.trim() {
        "done" => TaskFilter::Done,
        _ => TaskFilter::Pending,
    };
    with_session(|session| list_response(session, filter)).unwrap_or_else(|err| list_failure(&err))
}

#[flutter_rust_bridge::frb(sync)]
pub fn tasks_set_completion(task_id: String, is_done: bool) -> ActionResponse {
    with_session(|session| {
        match block_on(session.task_list().set_completion(task_id.as_str(), is_done)) {
            Ok(()) => ActionResponse::success("Task updated.", Some(task_id.clone())),
            Err(err) => ActionResponse::failure(&err),
        }
    })
    .unwrap_or_else(|err| ActionResponse::failure(&err))
}

#[flutter_rust_bridge::frb(sync)]
pub fn tasks_delete(task_id: String) -> ActionResponse {
    with_session(|session| delete_in_session(session, &task_id))
        .unwrap_or_else(|err| ActionResponse::failure(&err))
}

/// Applies a confirmed swipe on a task row.
///
/// `direction` is `start_to_end` (edit) or `end_to_start` (delete). Edit
/// swipes load the task into the draft; delete swipes delete it.
#[flutter_rust_bridge::frb(sync)]
pub fn task_swipe(task_id: String, direction: String) -> SwipeResponse {
    let direction = match parse_swipe_direction(&direction) {
        Ok(direction) => direction,
        Err(err) => {
            return SwipeResponse {
                action: String::new(),
                result: ActionResponse {
                    ok: false,
                    task_id: None,
                    error_code: Some("invalid_direction".to_string()),
                    message: err.to_string(),
                },
            }
        }
    };

    apply_swipe(&task_id, direction.action())
}

/// Action a release at `offset` would trigger: `edit`, `delete` or empty.
///
/// Lets the row paint its background hint while the drag is in progress.
#[flutter_rust_bridge::frb(sync)]
pub fn swipe_preview(offset: f32, row_width: f32) -> String {
    let mut tracker = SwipeTracker::new(String::new());
    tracker.drag(offset, row_width);
    tracker
        .pending_action()
        .map(swipe_action_label)
        .unwrap_or_default()
        .to_string()
}

/// Releases a drag on a task row at `offset` out of `row_width`.
///
/// Past the threshold the settled action is applied as in `task_swipe`;
/// otherwise the row snaps back and `action` is empty.
#[flutter_rust_bridge::frb(sync)]
pub fn task_swipe_release(task_id: String, offset: f32, row_width: f32) -> SwipeResponse {
    let mut tracker = SwipeTracker::new(task_id);
    tracker.drag(offset, row_width);
    match tracker.release() {
        Some(intent) => apply_swipe(&intent.task_id, intent.action),
        None => SwipeResponse {
            action: String::new(),
            result: ActionResponse::success("Swipe cancelled.", None),
        },
    }
}

/// Loads a task into the draft for editing.
#[flutter_rust_bridge::frb(sync)]
pub fn draft_load(task_id: String) -> DraftResponse {
    with_session(|session| {
        block_on(session.task_edit_mut().load_for_edit(&task_id));
        draft_response(session)
    })
    .unwrap_or_else(|err| draft_failure(&err))
}

/// Updates the provided draft fields; `None` leaves a field unchanged.
#[flutter_rust_bridge::frb(sync)]
pub fn draft_update(
    name: Option<String>,
    description: Option<String>,
    due_date: Option<String>,
    is_finished: Option<bool>,
) -> DraftResponse {
    with_session(|session| {
        let editor = session.task_edit_mut();
        if let Some(name) = name {
            editor.set_name(name);
        }
        if let Some(description) = description {
            editor.set_description(description);
        }
        if let Some(due_date) = due_date {
            editor.set_due_date(due_date);
        }
        if let Some(is_finished) = is_finished {
            editor.set_finished(is_finished);
        }
        draft_response(session)
    })
    .unwrap_or_else(|err| draft_failure(&err))
}

/// Saves the draft for the signed-in user.
#[flutter_rust_bridge::frb(sync)]
pub fn draft_save() -> ActionResponse {
    with_session(|session| {
        if block_on(session.save_draft()) {
            let task_id = session.task_edit().draft().id;
            ActionResponse::success("Task saved.", Some(task_id))
        } else {
            let err = session
                .task_edit()
                .last_error()
                .unwrap_or_else(|| ControllerError::WriteFailed("save failed".to_string()));
            ActionResponse::failure(&err)
        }
    })
    .unwrap_or_else(|err| ActionResponse::failure(&err))
}

/// Clears the draft, e.g. when leaving the add/edit screen.
#[flutter_rust_bridge::frb(sync)]
pub fn draft_reset() -> DraftResponse {
    with_session(|session| {
        session.task_edit_mut().reset();
        draft_response(session)
    })
    .unwrap_or_else(|err| draft_failure(&err))
}

fn apply_swipe(task_id: &str, action: SwipeAction) -> SwipeResponse {
    let result = with_session(|session| match action {
        SwipeAction::Edit => {
            let outcome = block_on(session.task_edit_mut().load_for_edit(task_id));
            match session.task_edit().last_error() {
                Some(err) => ActionResponse::failure(&err),
                None => ActionResponse::success(format!("{outcome:?}"), Some(task_id.to_string())),
            }
        }
        SwipeAction::Delete => delete_in_session(session, task_id),
    })
    .unwrap_or_else(|err| ActionResponse::failure(&err));

    SwipeResponse {
        action: swipe_action_label(action).to_string(),
        result,
    }
}

fn swipe_action_label(action: SwipeAction) -> &'static str {
    match action {
        SwipeAction::Edit => "edit",
        SwipeAction::Delete => "delete",
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH.get_or_init(|| CoreConfig::from_env().db_path).clone()
}

/// Starts logging from `TODOLIST_LOG_*` unless the host already did.
fn init_env_logging() {
    if logging_status().is_some() {
        return;
    }
    if let Err(err) = init_logging_from_config(&CoreConfig::from_env()) {
        log::warn!("event=ffi_init module=ffi status=error error_code=logging_env_invalid error={err}");
    }
}

fn lock_app() -> Result<MutexGuard<'static, Option<AppState>>, ControllerError> {
    APP.lock()
        .map_err(|_| ControllerError::WriteFailed("app state lock poisoned".to_string()))
}

fn with_app<T>(f: impl FnOnce(&mut AppState) -> T) -> Result<T, ControllerError> {
    let mut guard = lock_app()?;
    if guard.is_none() {
        init_env_logging();
        let db_path = resolve_db_path();
        let repo = SqliteTaskRepository::open(&db_path).map_err(|err| {
            log::error!(
                "event=ffi_init module=ffi status=error error_code=store_open_failed error={err}"
            );
            ControllerError::LoadFailed(format!("task store open failed: {err}"))
        })?;
        let identity = LocalIdentityProvider::new();
        let driver = SessionDriver::new(Arc::new(repo), identity.current_user());
        *guard = Some(AppState { identity, driver });
    }
    match guard.as_mut() {
        Some(app) => Ok(f(app)),
        None => Err(ControllerError::Unauthenticated),
    }
}

fn with_session<T>(
    f: impl FnOnce(&mut UserSession<SqliteTaskRepository>) -> T,
) -> Result<T, ControllerError> {
    with_app(|app| app.driver.session_mut().map(f))?.ok_or(ControllerError::Unauthenticated)
}

fn delete_in_session(session: &UserSession<SqliteTaskRepository>, task_id: &str) -> ActionResponse {
    match block_on(session.task_list().delete_task(task_id, &session.user().id)) {
        Ok(()) => ActionResponse::success("Task deleted.", Some(task_id.to_string())),
        Err(err) => ActionResponse::failure(&err),
    }
}

fn session_response(app: &AppState, message: &str) -> SessionResponse {
    let user = app.driver.session().map(|session| user_item(session.user()));
    SessionResponse {
        ok: true,
        requires_sign_in: app.driver.requires_sign_in(),
        user,
        message: message.to_string(),
    }
}

fn session_failure(err: ControllerError) -> SessionResponse {
    SessionResponse {
        ok: false,
        requires_sign_in: true,
        user: None,
        message: err.to_string(),
    }
}

fn user_item(user: &CurrentUser) -> UserItem {
    UserItem {
        user_id: user.id.clone(),
        display_name: user.display_name.clone(),
    }
}

fn list_response(session: &UserSession<SqliteTaskRepository>, filter: TaskFilter) -> TaskListResponse {
    let controller = session.task_list();
    let (pending, done) = controller.counts();
    let items = controller
        .filtered_view(filter)
        .iter()
        .map(task_item)
        .collect::<Vec<_>>();
    let error = controller.last_error();
    let message = match &error {
        Some(err) => err.to_string(),
        None if items.is_empty() => "No tasks".to_string(),
        None => format!("{} task(s).", items.len()),
    };
    TaskListResponse {
        items,
        pending_count: count_u32(pending),
        done_count: count_u32(done),
        error_code: error.map(|err| err.code().to_string()),
        message,
    }
}

fn list_failure(err: &ControllerError) -> TaskListResponse {
    TaskListResponse {
        items: Vec::new(),
        pending_count: 0,
        done_count: 0,
        error_code: Some(err.code().to_string()),
        message: err.to_string(),
    }
}

fn task_item(task: &Task) -> TaskItem {
    TaskItem {
        task_id: task.id.clone(),
        title: task.display_name().to_string(),
        due_label: task.due_label(),
        description: task.description.clone(),
        is_finished: task.is_done(),
    }
}

fn draft_response(session: &UserSession<SqliteTaskRepository>) -> DraftResponse {
    let state = session.task_edit().snapshot();
    let TaskDraft {
        id,
        name,
        description,
        due_date,
        is_finished,
        ..
    } = state.draft;
    DraftResponse {
        task_id: id,
        name,
        description,
        due_date,
        is_finished,
        phase: phase_label(state.phase).to_string(),
        error_code: state.last_error.as_ref().map(|err| err.code().to_string()),
        message: state
            .last_error
            .map(|err| err.to_string())
            .unwrap_or_default(),
    }
}

fn draft_failure(err: &ControllerError) -> DraftResponse {
    DraftResponse {
        task_id: String::new(),
        name: String::new(),
        description: String::new(),
        due_date: None,
        is_finished: false,
        phase: phase_label(Default::default()).to_string(),
        error_code: Some(err.code().to_string()),
        message: err.to_string(),
    }
}

fn phase_label(phase: todolist_core::EditPhase) -> &'static str {
    use todolist_core::EditPhase;
    match phase {
        EditPhase::Empty => "empty",
        EditPhase::Loading => "loading",
        EditPhase::Populated => "populated",
        EditPhase::Editing => "editing",
        EditPhase::Saving => "saving",
        EditPhase::Saved => "saved",
        EditPhase::SaveFailed => "save_failed",
    }
}

fn count_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
