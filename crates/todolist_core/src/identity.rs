//! Identity boundary.
//!
//! # Responsibility
//! - Expose the signed-in user as an observable value.
//! - Provide a local provider for hosts that authenticate elsewhere.
//!
//! # Invariants
//! - A user with a blank id is never published; it reads as signed out.
//! - After `sign_out()` every observer sees `None`.

use log::info;
use tokio::sync::watch;

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub display_name: String,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Read-only source of the current user.
pub trait IdentityProvider: Send + Sync {
    /// Subscribes to the current user; `None` means signed out.
    fn current_user(&self) -> watch::Receiver<Option<CurrentUser>>;
    fn sign_out(&self);
}

/// In-process identity provider fed by the host's auth flow.
pub struct LocalIdentityProvider {
    current: watch::Sender<Option<CurrentUser>>,
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdentityProvider {
    /// Creates a provider in the signed-out state.
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    /// Publishes `user` as signed in; a blank id signs out instead.
    pub fn sign_in(&self, user: CurrentUser) {
        if user.id.trim().is_empty() {
            self.sign_out();
            return;
        }
        info!("event=auth_sign_in module=identity status=ok");
        self.current.send_replace(Some(user));
    }

    /// Snapshot of the current user.
    pub fn user(&self) -> Option<CurrentUser> {
        self.current.borrow().clone()
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn current_user(&self) -> watch::Receiver<Option<CurrentUser>> {
        self.current.subscribe()
    }

    fn sign_out(&self) {
        info!("event=auth_sign_out module=identity status=ok");
        self.current.send_replace(None);
    }
}
