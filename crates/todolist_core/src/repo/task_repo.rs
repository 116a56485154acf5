//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the four-operation boundary controllers depend on.
//! - Keep SQL details inside the local store implementation.
//!
//! # Invariants
//! - Write paths call `Task::validate()` before any mutation.
//! - `upsert_task` is a full-document overwrite keyed by id.
//! - An upsert never changes the owner of an existing task.
//! - Deleting an absent id succeeds.

use crate::db::migrations::ensure_current;
use crate::db::{open_db, DbError};
use crate::model::task::{Task, TaskId, TaskValidationError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Mutex;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    name,
    description,
    due_date,
    is_finished
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    /// Stored document could not be decoded into a `Task`.
    InvalidData(String),
    /// Backend is unreachable (connectivity loss, poisoned connection).
    Unavailable(String),
    /// Upsert attempted to move an existing task to another owner.
    OwnershipConflict {
        task_id: TaskId,
        stored_owner: String,
    },
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid stored task data: {message}"),
            Self::Unavailable(message) => write!(f, "task store unavailable: {message}"),
            Self::OwnershipConflict {
                task_id,
                stored_owner,
            } => write!(
                f,
                "task `{task_id}` belongs to `{stored_owner}` and cannot change owner"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Async boundary to the task document store.
///
/// Every operation may fail for connectivity reasons; callers treat any
/// error as "operation did not take effect".
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn get_task(&self, id: &str) -> RepoResult<Option<Task>>;
    /// Returns every task owned by `owner_id`, in backend order.
    async fn list_tasks_for_owner(&self, owner_id: &str) -> RepoResult<Vec<Task>>;
    async fn upsert_task(&self, task: &Task) -> RepoResult<()>;
    async fn delete_task(&self, id: &str) -> RepoResult<()>;
}

/// SQLite-backed task store used as the on-device document store.
///
/// List order is insertion order; overwrites keep a task's position.
pub struct SqliteTaskRepository {
    conn: Mutex<Connection>,
}

impl SqliteTaskRepository {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        match ensure_current(&conn) {
            Ok(()) => {}
            Err(DbError::SchemaBehind {
                db_version,
                expected,
            }) => {
                return Err(RepoError::UninitializedConnection {
                    expected_version: expected,
                    actual_version: db_version,
                })
            }
            Err(err) => return Err(err.into()),
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens the store file at `path`, applying migrations first.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RepoError::Unavailable("task store connection lock poisoned".into()))?;
        f(&conn)
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn get_task(&self, id: &str) -> RepoResult<Option<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            let task = match rows.next()? {
                Some(row) => Some(parse_task_row(row)?),
                None => None,
            };
            Ok(task)
        })
    }

    async fn list_tasks_for_owner(&self, owner_id: &str) -> RepoResult<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{TASK_SELECT_SQL} WHERE owner_id = ?1 ORDER BY rowid ASC;"
            ))?;
            let mut rows = stmt.query([owner_id])?;
            let mut tasks = Vec::new();
            while let Some(row) = rows.next()? {
                tasks.push(parse_task_row(row)?);
            }
            Ok(tasks)
        })
    }

    async fn upsert_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        self.with_conn(|conn| {
            let stored_owner: Option<String> = conn
                .query_row(
                    "SELECT owner_id FROM tasks WHERE id = ?1;",
                    [task.id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(stored_owner) = stored_owner {
                if stored_owner != task.owner_id {
                    return Err(RepoError::OwnershipConflict {
                        task_id: task.id.clone(),
                        stored_owner,
                    });
                }
            }

            conn.execute(
                "INSERT INTO tasks (id, owner_id, name, description, due_date, is_finished)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    due_date = excluded.due_date,
                    is_finished = excluded.is_finished,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![
                    task.id.as_str(),
                    task.owner_id.as_str(),
                    task.name.as_deref(),
                    task.description.as_deref(),
                    task.due_date.as_deref(),
                    task.is_finished.map(bool_to_int),
                ],
            )?;
            Ok(())
        })
    }

    async fn delete_task(&self, id: &str) -> RepoResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
            Ok(())
        })
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let is_finished = match row.get::<_, Option<i64>>("is_finished")? {
        None => None,
        Some(0) => Some(false),
        Some(1) => Some(true),
        Some(other) => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_finished value `{other}` in tasks.is_finished"
            )));
        }
    };

    let task = Task {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        due_date: row.get("due_date")?,
        is_finished,
    };
    task.validate()?;
    Ok(task)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
