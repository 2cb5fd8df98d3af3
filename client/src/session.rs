use log::info;
use shared::models::auth::Role;
use std::sync::{Arc, PoisonError, RwLock};

/// Signed-in admin as known to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub token: String,
    pub role: Role,
    pub user: Option<String>,
}

/// Shared handle on the current login. Cloning shares the same state, so a
/// logout is seen by every controller holding a clone.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<Option<SessionState>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(token: impl Into<String>, role: Role) -> Self {
        let session = Self::new();
        session.login(token, role, None);
        session
    }

    pub fn login(&self, token: impl Into<String>, role: Role, user: Option<String>) {
        let state = SessionState {
            token: token.into(),
            role,
            user,
        };
        info!(
            "Session started for {} ({})",
            state.user.as_deref().unwrap_or("anonymous"),
            state.role
        );
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(state);
    }

    pub fn logout(&self) {
        if self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            info!("Session cleared");
        }
    }

    /// Bearer token, if signed in with a non-blank one.
    pub fn token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|state| state.token.clone())
            .filter(|token| !token.trim().is_empty())
    }

    /// Role of the signed-in user; signed-out sessions see the list as viewers.
    pub fn role(&self) -> Role {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|state| state.role)
            .unwrap_or_default()
    }

    pub fn is_signed_in(&self) -> bool {
        self.token().is_some()
    }
}
