//! Session store - typed session persistence over a storage backend
//!
//! A local session occupies three keys: the serialized user, the auth-type
//! marker and the synthetic bearer token. They are written together, read
//! back to verify, and rolled back to their previous values if anything fails.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::result::{Error, Result};
use crate::domain::{local_token, AuthType, SessionRecord, User};
use crate::ports::StorageBackend;

/// Storage keys shared with the web client
pub mod keys {
    pub const CURRENT_USER: &str = "currentUser";
    pub const AUTH_TYPE: &str = "authType";
    pub const ACCESS_TOKEN: &str = "sb-access-token";
    pub const PREFERRED_AUTH_TYPE: &str = "preferredAuthType";
    pub const PREFERRED_API_SERVICE: &str = "preferredApiService";
    pub const HAS_SEEN_AUTH_CONFIG: &str = "hasSeenAuthConfig";
    pub const SELECTED_PLAN: &str = "selectedPlan";
    pub const SERVER_HEALTH: &str = "server-health";
    pub const REMOTE_SESSION: &str = "firebaseUser";

    /// Keys that make up a local session
    pub const SESSION_KEYS: [&str; 3] = [CURRENT_USER, AUTH_TYPE, ACCESS_TOKEN];
}

const WRITE_CHECK_KEY: &str = "__storage_test__";

const STORAGE_HINT: &str = "storage may be full or disabled";

/// Typed access to the local session keys
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn StorageBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Check that the backend accepts a write and returns it unchanged
    pub fn check_writable(&self) -> Result<()> {
        let value = Utc::now().timestamp_millis().to_string();
        self.backend
            .set(WRITE_CHECK_KEY, &value)
            .map_err(|e| Error::storage_unavailable(format!("{} ({})", STORAGE_HINT, e)))?;
        let read_back = self.backend.get(WRITE_CHECK_KEY);
        let _ = self.backend.remove(WRITE_CHECK_KEY);

        match read_back {
            Ok(Some(v)) if v == value => Ok(()),
            Ok(_) => Err(Error::storage_unavailable(format!(
                "{} (value did not persist)",
                STORAGE_HINT
            ))),
            Err(e) => Err(Error::storage_unavailable(format!("{} ({})", STORAGE_HINT, e))),
        }
    }

    /// Whether a local session marker is present (without parsing it)
    pub fn has_session(&self) -> Result<bool> {
        self.backend.contains(keys::CURRENT_USER)
    }

    /// Restore the persisted local session.
    ///
    /// A user entry that does not parse clears all session keys and yields
    /// `Error::SessionCorrupted`.
    pub fn load(&self) -> Result<Option<SessionRecord>> {
        let raw_user = self.backend.get(keys::CURRENT_USER)?;
        let auth_type = self.backend.get(keys::AUTH_TYPE)?;

        let Some(raw_user) = raw_user else {
            return Ok(None);
        };
        if auth_type.as_deref() != Some(AuthType::Local.as_str()) {
            return Ok(None);
        }

        let user: User = match serde_json::from_str(&raw_user) {
            Ok(user) => user,
            Err(_) => {
                self.clear()?;
                return Err(Error::SessionCorrupted);
            }
        };

        let token = self
            .backend
            .get(keys::ACCESS_TOKEN)?
            .unwrap_or_else(|| local_token(&user.id));
        let logged_in_at = user.last_login.unwrap_or_else(Utc::now);

        Ok(Some(SessionRecord {
            user,
            logged_in_at,
            auth_type: AuthType::Local,
            token,
        }))
    }

    /// Persist a session, verifying the write.
    ///
    /// On failure the three keys hold exactly what they held before the call.
    pub fn save(&self, record: &SessionRecord) -> Result<()> {
        let serialized = serde_json::to_string(&record.user)?;
        let entries = [
            (keys::CURRENT_USER, serialized.as_str()),
            (keys::AUTH_TYPE, record.auth_type.as_str()),
            (keys::ACCESS_TOKEN, record.token.as_str()),
        ];

        let previous = self.snapshot()?;

        for (key, value) in entries {
            if let Err(e) = self.backend.set(key, value) {
                self.restore(&previous);
                return Err(Error::storage_unavailable(format!("{} ({})", STORAGE_HINT, e)));
            }
        }

        let verified = entries
            .iter()
            .all(|(key, value)| matches!(self.backend.get(key), Ok(Some(v)) if v == *value));
        if !verified {
            self.restore(&previous);
            return Err(Error::storage_unavailable(format!(
                "{} (session did not persist)",
                STORAGE_HINT
            )));
        }

        Ok(())
    }

    /// Remove all session keys
    pub fn clear(&self) -> Result<()> {
        for key in keys::SESSION_KEYS {
            self.backend.remove(key)?;
        }
        Ok(())
    }

    fn snapshot(&self) -> Result<Vec<(&'static str, Option<String>)>> {
        keys::SESSION_KEYS
            .iter()
            .map(|key| Ok((*key, self.backend.get(key)?)))
            .collect()
    }

    /// Best-effort rollback to a snapshot
    fn restore(&self, previous: &[(&'static str, Option<String>)]) {
        for (key, value) in previous {
            let _ = match value {
                Some(v) => self.backend.set(key, v),
                None => self.backend.remove(key),
            };
        }
    }
}
