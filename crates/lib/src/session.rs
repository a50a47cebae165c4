//! Local identity of the chat participant and the store that hands it from login to chat.
//!
//! A [`Session`] can only be built with a non-empty id and name. The [`SessionStore`] keeps
//! the identity under the `userId` / `userName` keys in process memory; a chat view reads it
//! on mount and redirects to the entry screen when it is missing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Store key holding the session's user id.
pub const USER_ID_KEY: &str = "userId";
/// Store key holding the session's display name.
pub const USER_NAME_KEY: &str = "userName";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session id must not be empty")]
    EmptyId,
    #[error("session name must not be empty")]
    EmptyName,
}

/// The locally held identity (id, display name) of the current participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: String,
    name: String,
}

impl Session {
    /// Build a session; both fields must be non-empty after trimming.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self, SessionError> {
        let id = id.into();
        let name = name.into();
        if id.trim().is_empty() {
            return Err(SessionError::EmptyId);
        }
        if name.trim().is_empty() {
            return Err(SessionError::EmptyName);
        }
        Ok(Self { id, name })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Process-scoped, ephemeral key/value store for the current identity.
///
/// Cloning shares the same underlying storage, so the login screen and the chat screen can
/// each hold a handle.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist the identity under the user id / user name keys, replacing any previous one.
    pub fn save(&self, session: &Session) {
        let Ok(mut g) = self.inner.write() else {
            log::warn!("session store lock poisoned; session not saved");
            return;
        };
        g.insert(USER_ID_KEY.to_string(), session.id.clone());
        g.insert(USER_NAME_KEY.to_string(), session.name.clone());
        log::debug!("session saved for user {}", session.id);
    }

    /// Read the identity back. `None` when either key is missing or empty.
    pub fn load(&self) -> Option<Session> {
        let g = self.inner.read().ok()?;
        let id = g.get(USER_ID_KEY)?;
        let name = g.get(USER_NAME_KEY)?;
        Session::new(id.clone(), name.clone()).ok()
    }

    /// Raw value for one key (e.g. [`USER_ID_KEY`]).
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.read().ok()?.get(key).cloned()
    }

    pub fn clear(&self) {
        if let Ok(mut g) = self.inner.write() {
            g.clear();
        }
    }
}
