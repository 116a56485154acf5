use todolist_core::db::open_db_in_memory;
use todolist_core::{
    InMemoryTaskRepository, RepoError, SqliteTaskRepository, Task, TaskRepository,
    TaskValidationError,
};

fn sqlite_repo() -> SqliteTaskRepository {
    SqliteTaskRepository::try_new(open_db_in_memory().unwrap()).unwrap()
}

fn stores() -> Vec<(&'static str, Box<dyn TaskRepository>)> {
    vec![
        ("sqlite", Box::new(sqlite_repo())),
        ("memory", Box::new(InMemoryTaskRepository::new())),
    ]
}

fn named_task(id: &str, owner: &str, name: &str) -> Task {
    let mut task = Task::with_id(id, owner);
    task.name = Some(name.to_string());
    task
}

#[tokio::test]
async fn upsert_then_get_returns_last_written_document() {
    for (store, repo) in stores() {
        let mut task = named_task("t1", "u1", "Buy milk");
        task.due_date = Some("2024-05-01".into());
        repo.upsert_task(&task).await.unwrap();

        task.name = Some("Buy oat milk".into());
        task.description = Some("two cartons".into());
        task.due_date = None;
        task.is_finished = Some(true);
        repo.upsert_task(&task).await.unwrap();

        let loaded = repo.get_task("t1").await.unwrap().unwrap();
        assert_eq!(loaded, task, "store={store}");
    }
}

#[tokio::test]
async fn upsert_is_idempotent() {
    for (store, repo) in stores() {
        let task = named_task("t1", "u1", "Water plants");
        repo.upsert_task(&task).await.unwrap();
        repo.upsert_task(&task).await.unwrap();

        let listed = repo.list_tasks_for_owner("u1").await.unwrap();
        assert_eq!(listed, vec![task], "store={store}");
    }
}

#[tokio::test]
async fn sparse_document_round_trips_absent_fields() {
    for (store, repo) in stores() {
        let mut task = Task::with_id("t1", "u1");
        task.is_finished = None;
        repo.upsert_task(&task).await.unwrap();

        let loaded = repo.get_task("t1").await.unwrap().unwrap();
        assert_eq!(loaded.name, None, "store={store}");
        assert_eq!(loaded.is_finished, None, "store={store}");
        assert_eq!(loaded.display_name(), "No title");
    }
}

#[tokio::test]
async fn delete_then_get_is_not_found_even_for_unknown_ids() {
    for (store, repo) in stores() {
        repo.upsert_task(&named_task("t1", "u1", "a")).await.unwrap();

        repo.delete_task("t1").await.unwrap();
        repo.delete_task("t1").await.unwrap();
        repo.delete_task("never-created").await.unwrap();

        assert!(repo.get_task("t1").await.unwrap().is_none(), "store={store}");
        assert!(repo.get_task("never-created").await.unwrap().is_none());
        assert!(repo.list_tasks_for_owner("u1").await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn list_is_scoped_by_owner_and_keeps_insertion_order() {
    for (store, repo) in stores() {
        repo.upsert_task(&named_task("c", "u1", "third")).await.unwrap();
        repo.upsert_task(&named_task("x", "u2", "other")).await.unwrap();
        repo.upsert_task(&named_task("a", "u1", "first")).await.unwrap();
        // Overwrite keeps position.
        repo.upsert_task(&named_task("c", "u1", "third again")).await.unwrap();

        let ids: Vec<_> = repo
            .list_tasks_for_owner("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|task| task.id)
            .collect();
        assert_eq!(ids, vec!["c", "a"], "store={store}");
        assert!(repo.list_tasks_for_owner("nobody").await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn upsert_rejects_owner_change() {
    for (store, repo) in stores() {
        repo.upsert_task(&named_task("t1", "u1", "mine")).await.unwrap();

        let err = repo
            .upsert_task(&named_task("t1", "u2", "stolen"))
            .await
            .unwrap_err();
        assert!(
            matches!(&err, RepoError::OwnershipConflict { stored_owner, .. } if stored_owner == "u1"),
            "store={store} err={err}"
        );
        let kept = repo.get_task("t1").await.unwrap().unwrap();
        assert_eq!(kept.name.as_deref(), Some("mine"));
    }
}

#[tokio::test]
async fn upsert_validates_id_and_owner() {
    for (store, repo) in stores() {
        let no_id = Task::with_id("  ", "u1");
        let no_owner = Task::with_id("t1", "");

        assert!(
            matches!(
                repo.upsert_task(&no_id).await,
                Err(RepoError::Validation(TaskValidationError::EmptyId))
            ),
            "store={store}"
        );
        assert!(matches!(
            repo.upsert_task(&no_owner).await,
            Err(RepoError::Validation(TaskValidationError::EmptyOwner(_)))
        ));
    }
}

#[tokio::test]
async fn sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.sqlite3");

    {
        let repo = SqliteTaskRepository::open(&path).unwrap();
        repo.upsert_task(&named_task("t1", "u1", "persisted"))
            .await
            .unwrap();
    }

    let reopened = SqliteTaskRepository::open(&path).unwrap();
    let loaded = reopened.get_task("t1").await.unwrap().unwrap();
    assert_eq!(loaded.name.as_deref(), Some("persisted"));
}

#[tokio::test]
async fn memory_store_recovers_after_going_offline() {
    let repo = InMemoryTaskRepository::with_tasks([named_task("t1", "u1", "a")]).unwrap();

    repo.set_reachable(false);
    assert!(matches!(
        repo.list_tasks_for_owner("u1").await,
        Err(RepoError::Unavailable(_))
    ));
    assert!(repo.delete_task("t1").await.is_err());

    repo.set_reachable(true);
    assert_eq!(repo.list_tasks_for_owner("u1").await.unwrap().len(), 1);
}
