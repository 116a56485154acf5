//! User session lifetime.
//!
//! # Responsibility
//! - Construct both controllers when a user signs in.
//! - Drop them when the user signs out or another user signs in.
//! - Follow the identity provider's observable user.
//!
//! # Invariants
//! - At most one session exists per driver.
//! - A session's controllers only ever see the session user's tasks.

use crate::controller::task_edit_controller::TaskEditController;
use crate::controller::task_list_controller::TaskListController;
use crate::identity::CurrentUser;
use crate::repo::task_repo::TaskRepository;
use log::info;
use std::sync::Arc;
use tokio::sync::watch;

/// Controllers scoped to one signed-in user.
pub struct UserSession<R: TaskRepository + ?Sized> {
    user: CurrentUser,
    task_list: TaskListController<R>,
    task_edit: TaskEditController<R>,
}

impl<R: TaskRepository + ?Sized> UserSession<R> {
    /// Creates the session and loads the user's tasks.
    pub async fn start(repo: Arc<R>, user: CurrentUser) -> Self {
        let session = Self {
            task_list: TaskListController::new(Arc::clone(&repo)),
            task_edit: TaskEditController::for_owner(repo, user.id.clone()),
            user,
        };
        session.task_list.load_tasks_for_user(&session.user.id).await;
        session
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn task_list(&self) -> &TaskListController<R> {
        &self.task_list
    }

    pub fn task_edit(&self) -> &TaskEditController<R> {
        &self.task_edit
    }

    pub fn task_edit_mut(&mut self) -> &mut TaskEditController<R> {
        &mut self.task_edit
    }

    /// Reloads the list from the store.
    pub async fn refresh(&self) -> usize {
        self.task_list.load_tasks_for_user(&self.user.id).await
    }

    /// Saves the draft for the session user and merges it into the list.
    pub async fn save_draft(&mut self) -> bool {
        if !self.task_edit.save(&self.user.id).await {
            return false;
        }
        self.task_list.record_saved(self.task_edit.draft().to_task());
        true
    }

    /// Deletes `task_id` on behalf of the session user.
    pub async fn delete_task(&self, task_id: &str) -> bool {
        self.task_list
            .delete_task(task_id, &self.user.id)
            .await
            .is_ok()
    }
}

/// Identity transition applied by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started { user_id: String },
    Ended,
    Unchanged,
}

/// Keeps a `UserSession` in step with the identity provider.
pub struct SessionDriver<R: TaskRepository + ?Sized> {
    repo: Arc<R>,
    identity: watch::Receiver<Option<CurrentUser>>,
    session: Option<UserSession<R>>,
}

impl<R: TaskRepository + ?Sized> SessionDriver<R> {
    pub fn new(repo: Arc<R>, identity: watch::Receiver<Option<CurrentUser>>) -> Self {
        Self {
            repo,
            identity,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&UserSession<R>> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut UserSession<R>> {
        self.session.as_mut()
    }

    /// True when no user is signed in; the host should show sign-in.
    pub fn requires_sign_in(&self) -> bool {
        self.session.is_none()
    }

    /// Applies the identity value currently published.
    pub async fn sync(&mut self) -> SessionEvent {
        let current = self
            .identity
            .borrow_and_update()
            .clone()
            .filter(|user| !user.id.trim().is_empty());

        let active_id = self.session.as_ref().map(|session| session.user.id.clone());

        match (current, active_id) {
            (None, None) => SessionEvent::Unchanged,
            (None, Some(_)) => {
                self.session = None;
                info!("event=session_end module=session status=ok");
                SessionEvent::Ended
            }
            (Some(user), Some(active_id)) if active_id == user.id => {
                if let Some(session) = self.session.as_mut() {
                    session.user.display_name = user.display_name;
                }
                SessionEvent::Unchanged
            }
            (Some(user), _) => {
                let user_id = user.id.clone();
                self.session = None;
                self.session = Some(UserSession::start(Arc::clone(&self.repo), user).await);
                info!("event=session_start module=session status=ok");
                SessionEvent::Started { user_id }
            }
        }
    }

    /// Waits for the next identity change and applies it.
    ///
    /// Returns `None` once the identity provider is gone.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        self.identity.changed().await.ok()?;
        Some(self.sync().await)
    }
}
