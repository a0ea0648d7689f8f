//! Remote session manager - Firebase-backed authentication
//!
//! Identity checks are delegated to a `RemoteAuthProvider`; the staff profile
//! (role, department) comes from the provider's profile documents. The
//! session is cached under its own storage key, separate from local sessions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{AuthType, ProfileUpdate, SignUpRequest, User};
use crate::ports::{RemoteAccount, RemoteAuthProvider, SessionProvider, StorageBackend};

use super::local_auth::validate_sign_up;
use super::session_store::keys;

/// Cached remote session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSession {
    pub user: User,
    pub account: RemoteAccount,
    pub signed_in_at: DateTime<Utc>,
}

pub struct RemoteSessionManager {
    provider: Arc<dyn RemoteAuthProvider>,
    backend: Arc<dyn StorageBackend>,
    session: Option<RemoteSession>,
    error: Option<String>,
}

impl RemoteSessionManager {
    pub fn new(provider: Arc<dyn RemoteAuthProvider>, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            provider,
            backend,
            session: None,
            error: None,
        }
    }

    pub fn provider(&self) -> &Arc<dyn RemoteAuthProvider> {
        &self.provider
    }

    fn fail<T>(&mut self, error: Error) -> Result<T> {
        self.error = Some(error.to_string());
        Err(error)
    }

    fn persist(&mut self, session: RemoteSession) -> Result<User> {
        let serialized = serde_json::to_string(&session)?;
        if let Err(e) = self.backend.set(keys::REMOTE_SESSION, &serialized) {
            return self.fail(Error::storage_unavailable(e.to_string()));
        }
        let user = session.user.clone();
        self.session = Some(session);
        self.error = None;
        Ok(user)
    }

    fn establish(&mut self, account: RemoteAccount, user: User) -> Result<User> {
        let now = Utc::now();
        self.persist(RemoteSession {
            user: user.logged_in_at(now),
            account,
            signed_in_at: now,
        })
    }
}

impl SessionProvider for RemoteSessionManager {
    fn auth_type(&self) -> AuthType {
        AuthType::Firebase
    }

    fn initialize(&mut self) -> Result<Option<User>> {
        let raw = match self.backend.get(keys::REMOTE_SESSION) {
            Ok(raw) => raw,
            Err(e) => return self.fail(e),
        };
        let Some(raw) = raw else {
            self.session = None;
            return Ok(None);
        };

        match serde_json::from_str::<RemoteSession>(&raw) {
            Ok(session) => {
                let user = session.user.clone();
                self.session = Some(session);
                self.error = None;
                Ok(Some(user))
            }
            Err(_) => {
                let _ = self.backend.remove(keys::REMOTE_SESSION);
                self.session = None;
                self.fail(Error::SessionCorrupted)
            }
        }
    }

    fn sign_in(&mut self, email: &str, password: &str) -> Result<User> {
        let account = match self.provider.sign_in_with_password(email.trim(), password) {
            Ok(account) => account,
            Err(e) => return self.fail(e),
        };
        let profile = match self.provider.fetch_profile(&account) {
            Ok(Some(profile)) => profile,
            Ok(None) => return self.fail(Error::remote("No staff profile found for this account")),
            Err(e) => return self.fail(e),
        };
        self.establish(account, profile)
    }

    fn sign_up(&mut self, request: &SignUpRequest) -> Result<User> {
        if let Err(e) = validate_sign_up(request) {
            return self.fail(e);
        }
        let account = match self
            .provider
            .create_account(request.email.trim(), &request.password)
        {
            Ok(account) => account,
            Err(e) => return self.fail(e),
        };

        let mut user = User::new(
            account.uid.clone(),
            account.email.clone(),
            request.name.trim(),
            request.role,
        );
        user.specialization = request.specialization.clone();
        user.department = request.department.clone();
        user.is_active = Some(true);

        if let Err(e) = self.provider.save_profile(&account, &user) {
            return self.fail(e);
        }
        self.establish(account, user)
    }

    fn sign_out(&mut self) -> Result<()> {
        let _ = self.backend.remove(keys::REMOTE_SESSION);
        self.session = None;
        self.error = None;
        Ok(())
    }

    fn reset_password(&mut self, email: &str) -> Result<()> {
        match self.provider.send_password_reset(email.trim()) {
            Ok(()) => {
                self.error = None;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    fn update_password(&mut self, new_password: &str) -> Result<()> {
        let Some(session) = self.session.clone() else {
            return self.fail(Error::NotAuthenticated);
        };
        let account = match self.provider.update_password(&session.account, new_password) {
            Ok(account) => account,
            Err(e) => return self.fail(e),
        };
        self.persist(RemoteSession { account, ..session })?;
        Ok(())
    }

    fn update_profile(&mut self, update: &ProfileUpdate) -> Result<User> {
        let Some(mut session) = self.session.clone() else {
            return self.fail(Error::NotAuthenticated);
        };
        session.user.apply(update);
        if let Err(e) = self.provider.save_profile(&session.account, &session.user) {
            return self.fail(e);
        }
        self.persist(session)
    }

    fn current_user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
