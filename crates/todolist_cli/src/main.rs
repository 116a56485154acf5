//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `todolist_core` linkage.
//! - Drive one session end to end: in memory by default, or against the
//!   SQLite store named by a JSON config file passed as the only argument.
//! - Keep output deterministic for quick local sanity checks.

use futures::executor::block_on;
use std::process::ExitCode;
use std::sync::Arc;
use todolist_core::{
    init_logging_from_config, logging_status, CoreConfig, CurrentUser, IdentityProvider,
    InMemoryTaskRepository, LocalIdentityProvider, SessionDriver, SessionEvent,
    SqliteTaskRepository, SwipeAction, SwipeTracker, TaskFilter, TaskRepository,
};

fn main() -> ExitCode {
    println!("todolist_core ping={}", todolist_core::ping());
    println!("todolist_core version={}", todolist_core::core_version());

    let outcome = match std::env::args().nth(1) {
        Some(config_path) => load_config(&config_path).and_then(|config| {
            let repo = SqliteTaskRepository::open(&config.db_path)
                .map_err(|err| format!("task store open failed: {err}"))?;
            println!("store=sqlite path={}", config.db_path.display());
            block_on(smoke_session(Arc::new(repo)))
        }),
        None => {
            println!("store=memory");
            block_on(smoke_session(Arc::new(InMemoryTaskRepository::new())))
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("smoke failed: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Reads a JSON config, applies `TODOLIST_*` overrides and starts logging.
fn load_config(path: &str) -> Result<CoreConfig, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read config `{path}`: {err}"))?;
    let mut config = CoreConfig::from_json(&raw).map_err(|err| err.to_string())?;
    config.apply_overrides(|key| std::env::var(key).ok());
    init_logging_from_config(&config).map_err(|err| err.to_string())?;
    match logging_status() {
        Some((level, dir)) => println!("logging level={level} dir={}", dir.display()),
        None => println!("logging=off"),
    }
    Ok(config)
}

async fn smoke_session<R: TaskRepository + ?Sized>(repo: Arc<R>) -> Result<(), String> {
    let identity = LocalIdentityProvider::new();
    let mut driver = SessionDriver::new(repo, identity.current_user());

    identity.sign_in(CurrentUser::new("smoke-user", "Smoke"));
    match driver.sync().await {
        SessionEvent::Started { user_id } => println!("session started user={user_id}"),
        other => return Err(format!("unexpected session event {other:?}")),
    }
    let session = driver
        .session_mut()
        .ok_or_else(|| "session missing after sign-in".to_string())?;

    for name in ["Buy milk", "Water plants"] {
        let editor = session.task_edit_mut();
        editor.reset();
        editor.set_name(name);
        if !session.save_draft().await {
            return Err(format!("save failed for `{name}`"));
        }
    }

    let first = session
        .task_list()
        .filtered_view(TaskFilter::Pending)
        .ids()
        .into_iter()
        .next()
        .ok_or_else(|| "pending list is empty".to_string())?;
    session
        .task_list()
        .set_completion(&first, true)
        .await
        .map_err(|err| err.to_string())?;

    let mut swipe = SwipeTracker::new(first.clone());
    swipe.drag(-300.0, 400.0);
    if let Some(intent) = swipe.release() {
        if intent.action == SwipeAction::Delete && !session.delete_task(&intent.task_id).await {
            return Err(format!("delete failed for `{}`", intent.task_id));
        }
    }

    let (pending, done) = session.task_list().counts();
    println!("tasks pending={pending} done={done}");

    identity.sign_out();
    driver.sync().await;
    println!("session ended requires_sign_in={}", driver.requires_sign_in());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load_config, smoke_session};
    use futures::executor::block_on;
    use std::sync::Arc;
    use todolist_core::{SqliteTaskRepository, TaskRepository};

    #[test]
    fn config_file_drives_the_sqlite_smoke_run() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("smoke.sqlite3");
        let config_path = dir.path().join("todolist.json");
        let document = format!(
            r#"{{"db_path":{},"log_level":"warn"}}"#,
            json_string(&db_path.to_string_lossy())
        );
        std::fs::write(&config_path, document).unwrap();

        let config = load_config(&config_path.to_string_lossy()).unwrap();
        assert_eq!(config.log_level, "warn");
        assert!(config.log_dir.is_none());

        let repo = Arc::new(SqliteTaskRepository::open(&config.db_path).unwrap());
        block_on(smoke_session(Arc::clone(&repo))).unwrap();
        let remaining = block_on(repo.list_tasks_for_owner("smoke-user")).unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn unreadable_config_is_reported() {
        let err = load_config("/nonexistent/todolist.json").unwrap_err();
        assert!(err.contains("failed to read config"));
    }

    fn json_string(value: &str) -> String {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}
