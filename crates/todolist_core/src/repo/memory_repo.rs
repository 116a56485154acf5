//! In-memory task document store.
//!
//! Mirrors a remote document store: each task is kept as its serialized JSON
//! document and decoded on every read, so writes are full-document
//! overwrites by construction. Reachability can be toggled to exercise the
//! offline paths of the controllers.

use crate::model::task::{Task, TaskId};
use crate::repo::task_repo::{RepoError, RepoResult, TaskRepository};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Document store kept in process memory, ordered by first insertion.
pub struct InMemoryTaskRepository {
    documents: Mutex<Vec<(TaskId, Value)>>,
    reachable: AtomicBool,
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(Vec::new()),
            reachable: AtomicBool::new(true),
        }
    }

    /// Creates a store pre-populated with `tasks`.
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> RepoResult<Self> {
        let repo = Self::new();
        {
            let mut documents = repo.lock_documents()?;
            for task in tasks {
                task.validate()?;
                write_document(&mut documents, &task)?;
            }
        }
        Ok(repo)
    }

    /// Simulates connectivity loss (`false`) or recovery (`true`).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of stored documents, regardless of owner.
    pub fn document_count(&self) -> usize {
        self.documents.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    fn ensure_reachable(&self) -> RepoResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepoError::Unavailable("document store is offline".into()))
        }
    }

    fn lock_documents(&self) -> RepoResult<std::sync::MutexGuard<'_, Vec<(TaskId, Value)>>> {
        self.documents
            .lock()
            .map_err(|_| RepoError::Unavailable("document store lock poisoned".into()))
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn get_task(&self, id: &str) -> RepoResult<Option<Task>> {
        self.ensure_reachable()?;
        let documents = self.lock_documents()?;
        let found = documents
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, doc)| decode_document(doc))
            .transpose();
        found
    }

    async fn list_tasks_for_owner(&self, owner_id: &str) -> RepoResult<Vec<Task>> {
        self.ensure_reachable()?;
        let documents = self.lock_documents()?;
        let mut tasks = Vec::new();
        for (_, doc) in documents.iter() {
            let task = decode_document(doc)?;
            if task.owner_id == owner_id {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    async fn upsert_task(&self, task: &Task) -> RepoResult<()> {
        self.ensure_reachable()?;
        task.validate()?;
        let mut documents = self.lock_documents()?;
        write_document(&mut documents, task)
    }

    async fn delete_task(&self, id: &str) -> RepoResult<()> {
        self.ensure_reachable()?;
        let mut documents = self.lock_documents()?;
        documents.retain(|(doc_id, _)| doc_id != id);
        Ok(())
    }
}

fn write_document(documents: &mut Vec<(TaskId, Value)>, task: &Task) -> RepoResult<()> {
    let encoded = serde_json::to_value(task)
        .map_err(|err| RepoError::InvalidData(format!("failed to encode task: {err}")))?;

    match documents.iter_mut().find(|(doc_id, _)| *doc_id == task.id) {
        Some((_, existing)) => {
            let stored = decode_document(existing)?;
            if stored.owner_id != task.owner_id {
                return Err(RepoError::OwnershipConflict {
                    task_id: task.id.clone(),
                    stored_owner: stored.owner_id,
                });
            }
            *existing = encoded;
        }
        None => documents.push((task.id.clone(), encoded)),
    }
    Ok(())
}

fn decode_document(doc: &Value) -> RepoResult<Task> {
    serde_json::from_value(doc.clone())
        .map_err(|err| RepoError::InvalidData(format!("failed to decode task document: {err}")))
}
