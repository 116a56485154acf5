use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use todolist_core::{
    ControllerError, InMemoryTaskRepository, RepoResult, Task, TaskFilter, TaskListController,
    TaskRepository,
};

fn task(id: &str, owner: &str, finished: bool) -> Task {
    let mut task = Task::with_id(id, owner);
    task.name = Some(format!("task {id}"));
    task.is_finished = Some(finished);
    task
}

fn seeded_repo() -> Arc<InMemoryTaskRepository> {
    Arc::new(
        InMemoryTaskRepository::with_tasks([
            task("t1", "u1", false),
            task("t2", "u1", true),
            task("t3", "u2", false),
            task("t4", "u1", false),
        ])
        .unwrap(),
    )
}

/// Yields once before every write so overlapping intents interleave.
struct SlowWrites {
    inner: InMemoryTaskRepository,
}

#[async_trait]
impl TaskRepository for SlowWrites {
    async fn get_task(&self, id: &str) -> RepoResult<Option<Task>> {
        self.inner.get_task(id).await
    }

    async fn list_tasks_for_owner(&self, owner_id: &str) -> RepoResult<Vec<Task>> {
        self.inner.list_tasks_for_owner(owner_id).await
    }

    async fn upsert_task(&self, task: &Task) -> RepoResult<()> {
        tokio::task::yield_now().await;
        self.inner.upsert_task(task).await
    }

    async fn delete_task(&self, id: &str) -> RepoResult<()> {
        tokio::task::yield_now().await;
        self.inner.delete_task(id).await
    }
}

/// Ignores the owner filter, like a misconfigured backend query.
struct LeakyOwnerScope {
    tasks: Vec<Task>,
}

#[async_trait]
impl TaskRepository for LeakyOwnerScope {
    async fn get_task(&self, id: &str) -> RepoResult<Option<Task>> {
        Ok(self.tasks.iter().find(|task| task.id == id).cloned())
    }

    async fn list_tasks_for_owner(&self, _owner_id: &str) -> RepoResult<Vec<Task>> {
        Ok(self.tasks.clone())
    }

    async fn upsert_task(&self, _task: &Task) -> RepoResult<()> {
        Ok(())
    }

    async fn delete_task(&self, _id: &str) -> RepoResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn load_keeps_only_the_users_tasks_in_store_order() {
    let controller = TaskListController::new(seeded_repo());

    let loaded = controller.load_tasks_for_user("u1").await;

    let state = controller.snapshot();
    assert_eq!(loaded, 3);
    assert_eq!(state.owner_id.as_deref(), Some("u1"));
    assert!(!state.loading);
    assert!(state.last_error.is_none());
    let ids: Vec<_> = state.tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2", "t4"]);
}

#[tokio::test]
async fn load_drops_tasks_owned_by_someone_else() {
    let repo = Arc::new(LeakyOwnerScope {
        tasks: vec![task("t1", "u1", false), task("t9", "intruder", false)],
    });
    let controller = TaskListController::new(repo);

    controller.load_tasks_for_user("u1").await;

    assert!(controller.tasks().iter().all(|t| t.owner_id == "u1"));
    assert_eq!(controller.tasks().len(), 1);
}

#[tokio::test]
async fn failed_load_leaves_empty_list_and_flags_error() {
    let repo = seeded_repo();
    let controller = TaskListController::new(Arc::clone(&repo));
    controller.load_tasks_for_user("u1").await;

    repo.set_reachable(false);
    let loaded = controller.load_tasks_for_user("u1").await;

    assert_eq!(loaded, 0);
    assert!(controller.tasks().is_empty());
    assert!(matches!(
        controller.last_error(),
        Some(ControllerError::LoadFailed(_))
    ));

    repo.set_reachable(true);
    assert_eq!(controller.load_tasks_for_user("u1").await, 3);
    assert!(controller.last_error().is_none());
}

#[tokio::test]
async fn empty_user_is_unauthenticated() {
    let controller = TaskListController::new(seeded_repo());

    assert_eq!(controller.load_tasks_for_user("").await, 0);
    assert_eq!(
        controller.last_error(),
        Some(ControllerError::Unauthenticated)
    );
}

#[tokio::test]
async fn pending_and_done_views_partition_the_list() {
    let controller = TaskListController::new(seeded_repo());
    controller.load_tasks_for_user("u1").await;

    let pending = controller.filtered_view(TaskFilter::Pending).ids();
    let done = controller.filtered_view(TaskFilter::Done).ids();

    assert_eq!(pending, vec!["t1", "t4"]);
    assert_eq!(done, vec!["t2"]);
    assert_eq!(controller.counts(), (2, 1));
    assert!(pending.iter().all(|id| !done.contains(id)));
}

#[tokio::test]
async fn completion_is_persisted_and_visible_after_reload() {
    let repo = seeded_repo();
    let controller = TaskListController::new(Arc::clone(&repo));
    controller.load_tasks_for_user("u1").await;

    controller.set_completion("t1", true).await.unwrap();
    assert!(controller.snapshot().find("t1").unwrap().is_done());

    let fresh = TaskListController::new(repo);
    fresh.load_tasks_for_user("u1").await;
    assert_eq!(fresh.snapshot().find("t1").unwrap().is_finished, Some(true));
    // Full-document write keeps the other fields.
    assert_eq!(
        fresh.snapshot().find("t1").unwrap().name.as_deref(),
        Some("task t1")
    );
}

#[tokio::test]
async fn failed_completion_rolls_back_the_optimistic_update() {
    let repo = seeded_repo();
    let controller = TaskListController::new(Arc::clone(&repo));
    controller.load_tasks_for_user("u1").await;
    let updates = controller.subscribe();

    repo.set_reachable(false);
    let err = controller.set_completion("t1", true).await.unwrap_err();

    assert!(matches!(err, ControllerError::WriteFailed(_)));
    assert!(updates.has_changed().unwrap());
    assert!(!controller.snapshot().find("t1").unwrap().is_done());
    assert_eq!(controller.last_error(), Some(err));
}

#[tokio::test]
async fn completion_of_unknown_task_is_not_found() {
    let controller = TaskListController::new(seeded_repo());
    controller.load_tasks_for_user("u1").await;

    let err = controller.set_completion("t3", true).await.unwrap_err();
    assert_eq!(err, ControllerError::NotFound("t3".into()));
}

#[tokio::test]
async fn overlapping_mutations_on_one_task_are_rejected_as_busy() {
    let repo = Arc::new(SlowWrites {
        inner: InMemoryTaskRepository::with_tasks([
            task("t1", "u1", false),
            task("t2", "u1", false),
        ])
        .unwrap(),
    });
    let controller = TaskListController::new(Arc::clone(&repo));
    controller.load_tasks_for_user("u1").await;

    let (first, second, other) = tokio::join!(
        controller.set_completion("t1", true),
        controller.delete_task("t1", "u1"),
        controller.set_completion("t2", true),
    );

    assert_eq!(first, Ok(()));
    assert_eq!(second, Err(ControllerError::Busy("t1".into())));
    assert_eq!(other, Ok(()));
    assert!(repo.inner.get_task("t1").await.unwrap().is_some());

    // The guard is released once the first write resolves.
    controller.delete_task("t1", "u1").await.unwrap();
    assert!(controller.snapshot().find("t1").is_none());
}

#[tokio::test]
async fn delete_removes_the_task_and_repeating_it_is_a_no_op() {
    let repo = seeded_repo();
    let controller = TaskListController::new(Arc::clone(&repo));
    controller.load_tasks_for_user("u1").await;

    controller.delete_task("t1", "u1").await.unwrap();
    let after_first = controller.snapshot();
    controller.delete_task("t1", "u1").await.unwrap();

    assert_eq!(controller.snapshot(), after_first);
    assert!(after_first.find("t1").is_none());
    assert!(repo.get_task("t1").await.unwrap().is_none());
}

#[tokio::test]
async fn failed_delete_keeps_state_and_flags_error() {
    let repo = seeded_repo();
    let controller = TaskListController::new(Arc::clone(&repo));
    controller.load_tasks_for_user("u1").await;
    let before = controller.tasks();

    repo.set_reachable(false);
    let err = controller.delete_task("t1", "u1").await.unwrap_err();

    assert!(matches!(err, ControllerError::WriteFailed(_)));
    assert_eq!(controller.tasks(), before);
    controller.clear_error();
    assert!(controller.last_error().is_none());
}

#[tokio::test]
async fn delete_for_another_user_is_unauthenticated() {
    let repo = seeded_repo();
    let controller = TaskListController::new(Arc::clone(&repo));
    controller.load_tasks_for_user("u1").await;

    let err = controller.delete_task("t1", "u2").await.unwrap_err();

    assert_eq!(err, ControllerError::Unauthenticated);
    assert!(repo.get_task("t1").await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_another_users_task_by_id_is_not_found() {
    let repo = seeded_repo();
    let controller = TaskListController::new(Arc::clone(&repo));
    controller.load_tasks_for_user("u1").await;
    let before = controller.tasks();

    let err = controller.delete_task("t3", "u1").await.unwrap_err();

    assert_eq!(err, ControllerError::NotFound("t3".into()));
    assert_eq!(controller.tasks(), before);
    let kept = repo.get_task("t3").await.unwrap().unwrap();
    assert_eq!(kept.owner_id, "u2");
}

#[tokio::test]
async fn deleting_an_unknown_id_outside_the_list_still_succeeds() {
    let repo = seeded_repo();
    let controller = TaskListController::new(Arc::clone(&repo));
    controller.load_tasks_for_user("u1").await;

    controller.delete_task("never-created", "u1").await.unwrap();

    assert_eq!(controller.tasks().len(), 3);
    assert!(controller.last_error().is_none());
}

/// Holds u1's list call until u2's load has been applied.
struct GatedLoads {
    inner: InMemoryTaskRepository,
    release: Notify,
}

#[async_trait]
impl TaskRepository for GatedLoads {
    async fn get_task(&self, id: &str) -> RepoResult<Option<Task>> {
        self.inner.get_task(id).await
    }

    async fn list_tasks_for_owner(&self, owner_id: &str) -> RepoResult<Vec<Task>> {
        if owner_id == "u1" {
            self.release.notified().await;
            return self.inner.list_tasks_for_owner(owner_id).await;
        }
        let tasks = self.inner.list_tasks_for_owner(owner_id).await;
        self.release.notify_one();
        tasks
    }

    async fn upsert_task(&self, task: &Task) -> RepoResult<()> {
        self.inner.upsert_task(task).await
    }

    async fn delete_task(&self, id: &str) -> RepoResult<()> {
        self.inner.delete_task(id).await
    }
}

#[tokio::test]
async fn superseded_load_for_previous_user_is_discarded() {
    let repo = Arc::new(GatedLoads {
        inner: InMemoryTaskRepository::with_tasks([
            task("t1", "u1", false),
            task("t2", "u1", true),
            task("t3", "u2", false),
        ])
        .unwrap(),
        release: Notify::new(),
    });
    let controller = TaskListController::new(repo);

    let (stale, current) = tokio::join!(
        controller.load_tasks_for_user("u1"),
        controller.load_tasks_for_user("u2"),
    );

    assert_eq!(stale, 0);
    assert_eq!(current, 1);
    let state = controller.snapshot();
    assert_eq!(state.owner_id.as_deref(), Some("u2"));
    assert!(!state.loading);
    let ids: Vec<_> = state.tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t3"]);
}

#[tokio::test]
async fn record_saved_merges_only_the_owners_tasks() {
    let controller = TaskListController::new(seeded_repo());
    controller.load_tasks_for_user("u1").await;

    let mut renamed = task("t1", "u1", false);
    renamed.name = Some("renamed".into());
    assert!(controller.record_saved(renamed));
    assert!(controller.record_saved(task("t5", "u1", false)));
    assert!(!controller.record_saved(task("t6", "u2", false)));

    let state = controller.snapshot();
    assert_eq!(state.find("t1").unwrap().name.as_deref(), Some("renamed"));
    assert_eq!(state.tasks.last().unwrap().id, "t5");
    assert!(state.find("t6").is_none());
}
