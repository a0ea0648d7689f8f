//! Auth-mode selection - choose between local and remote session providers
//!
//! `AuthModeState` holds the transition rules and has no I/O. The selector
//! wires it to the storage backend and the two providers: it persists the
//! preference, migrates the legacy tag, and signs out of the provider being
//! abandoned so at most one session is live.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{AuthType, ProfileUpdate, SignUpRequest, User};
use crate::ports::{SessionProvider, StorageBackend};

use super::session_store::keys;

/// How the active mode was decided at start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSource {
    /// Read from the stored preference
    Stored,
    /// Stored preference held the legacy tag and was rewritten
    Migrated,
    /// No preference; picked from which session key is present
    Detected,
    /// Changed by an explicit switch
    Switched,
    /// Preferred provider is not configured; running locally without
    /// touching the stored preference
    Unavailable,
}

/// Pure auth-mode state machine: two states, explicit transitions only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthModeState {
    current: AuthType,
    source: ModeSource,
}

impl AuthModeState {
    /// Decide the start-up mode.
    ///
    /// A recognised stored preference wins (the legacy tag maps to Firebase).
    /// Otherwise a local session key selects local, a remote session key
    /// selects Firebase, and local is the default.
    pub fn resolve(stored: Option<&str>, has_local_session: bool, has_remote_session: bool) -> Self {
        if let Some((current, migrated)) = stored.and_then(AuthType::from_preference) {
            let source = if migrated { ModeSource::Migrated } else { ModeSource::Stored };
            return Self { current, source };
        }

        let current = if has_local_session {
            AuthType::Local
        } else if has_remote_session {
            AuthType::Firebase
        } else {
            AuthType::Local
        };
        Self {
            current,
            source: ModeSource::Detected,
        }
    }

    pub fn current(&self) -> AuthType {
        self.current
    }

    pub fn source(&self) -> ModeSource {
        self.source
    }

    /// Whether the stored preference needs (re)writing
    pub fn needs_persist(&self) -> bool {
        matches!(self.source, ModeSource::Migrated | ModeSource::Detected)
    }

    /// Fall back to local for this run when Firebase was resolved but is
    /// not configured
    pub fn without_remote(self) -> Self {
        if self.current == AuthType::Local {
            return self;
        }
        Self {
            current: AuthType::Local,
            source: ModeSource::Unavailable,
        }
    }

    /// Move to `target`; returns the abandoned mode, `None` when already there.
    ///
    /// Choosing the mode a fallback already runs in still counts as an
    /// explicit choice.
    pub fn switch_to(&mut self, target: AuthType) -> Option<AuthType> {
        if self.current == target {
            if self.source == ModeSource::Unavailable {
                self.source = ModeSource::Switched;
            }
            return None;
        }
        self.current = target;
        self.source = ModeSource::Switched;
        Some(target.other())
    }
}

/// Independent state of one provider, for diagnostics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDiagnostics {
    pub auth_type: AuthType,
    pub available: bool,
    pub active: bool,
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub role: Option<String>,
    pub last_error: Option<String>,
}

/// Snapshot of the selector and both providers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthDiagnostics {
    pub auth_type: AuthType,
    pub source: ModeSource,
    pub local: ProviderDiagnostics,
    pub firebase: ProviderDiagnostics,
}

/// Strategy over the local and (optional) remote session providers
pub struct AuthModeSelector {
    backend: Arc<dyn StorageBackend>,
    state: AuthModeState,
    local: Box<dyn SessionProvider>,
    remote: Option<Box<dyn SessionProvider>>,
}

impl AuthModeSelector {
    /// Resolve the start-up mode and restore the active provider's session.
    ///
    /// Restoring a corrupted session is not fatal here: the provider clears
    /// it, records the error, and the selector starts unauthenticated.
    pub fn initialize(
        backend: Arc<dyn StorageBackend>,
        local: Box<dyn SessionProvider>,
        remote: Option<Box<dyn SessionProvider>>,
    ) -> Result<Self> {
        let stored = backend.get(keys::PREFERRED_AUTH_TYPE)?;
        let has_local = backend.contains(keys::CURRENT_USER)?;
        let has_remote = backend.contains(keys::REMOTE_SESSION)?;

        let mut state = AuthModeState::resolve(stored.as_deref(), has_local, has_remote);
        if remote.is_none() {
            state = state.without_remote();
        }

        let mut selector = Self {
            backend,
            state,
            local,
            remote,
        };

        if selector.state.needs_persist() {
            selector.persist_preference(selector.state.current())?;
        }

        let _ = selector.local.initialize();
        if let Some(remote) = selector.remote.as_mut() {
            let _ = remote.initialize();
        }

        Ok(selector)
    }

    fn persist_preference(&self, auth_type: AuthType) -> Result<()> {
        self.backend.set(keys::PREFERRED_AUTH_TYPE, auth_type.as_str())?;
        self.backend.set(keys::PREFERRED_API_SERVICE, auth_type.as_str())?;
        Ok(())
    }

    pub fn auth_type(&self) -> AuthType {
        self.state.current()
    }

    pub fn state(&self) -> &AuthModeState {
        &self.state
    }

    pub fn remote_available(&self) -> bool {
        self.remote.is_some()
    }

    /// The provider currently in charge
    pub fn active(&self) -> &dyn SessionProvider {
        match (self.state.current(), self.remote.as_deref()) {
            (AuthType::Firebase, Some(remote)) => remote,
            _ => self.local.as_ref(),
        }
    }

    pub fn active_mut(&mut self) -> &mut dyn SessionProvider {
        match (self.state.current(), self.remote.as_deref_mut()) {
            (AuthType::Firebase, Some(remote)) => remote,
            _ => self.local.as_mut(),
        }
    }

    fn provider_mut(&mut self, auth_type: AuthType) -> Option<&mut (dyn SessionProvider + 'static)> {
        match auth_type {
            AuthType::Local => Some(self.local.as_mut()),
            AuthType::Firebase => self.remote.as_deref_mut(),
        }
    }

    /// Persist a new preference and sign out of the abandoned provider.
    ///
    /// Returns `false` when `target` was already active. User identity is not
    /// carried across providers. Picking local while running on the local
    /// fallback persists `local` but changes nothing else.
    pub fn switch_auth_type(&mut self, target: AuthType) -> Result<bool> {
        if target == AuthType::Firebase && self.remote.is_none() {
            return Err(Error::config(
                "Firebase is not configured. Set firebase.apiKey and firebase.projectId in settings.json",
            ));
        }

        let was_fallback = self.state.source() == ModeSource::Unavailable;
        let mut next = self.state;
        let abandoned = next.switch_to(target);
        if abandoned.is_none() && !was_fallback {
            return Ok(false);
        }

        self.persist_preference(target)?;
        self.state = next;

        let Some(abandoned) = abandoned else {
            return Ok(false);
        };
        if let Some(provider) = self.provider_mut(abandoned) {
            provider.sign_out()?;
        }
        Ok(true)
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<User> {
        self.active_mut().sign_in(email, password)
    }

    pub fn sign_up(&mut self, request: &SignUpRequest) -> Result<User> {
        self.active_mut().sign_up(request)
    }

    pub fn sign_out(&mut self) -> Result<()> {
        self.active_mut().sign_out()
    }

    pub fn reset_password(&mut self, email: &str) -> Result<()> {
        self.active_mut().reset_password(email)
    }

    pub fn update_password(&mut self, new_password: &str) -> Result<()> {
        self.active_mut().update_password(new_password)
    }

    pub fn update_profile(&mut self, update: &ProfileUpdate) -> Result<User> {
        self.active_mut().update_profile(update)
    }

    pub fn current_user(&self) -> Option<&User> {
        self.active().current_user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.active().is_authenticated()
    }

    /// Whether the onboarding screen for auth configuration was dismissed
    pub fn has_seen_auth_config(&self) -> Result<bool> {
        Ok(self.backend.get(keys::HAS_SEEN_AUTH_CONFIG)?.as_deref() == Some("true"))
    }

    pub fn mark_auth_config_seen(&self) -> Result<()> {
        self.backend.set(keys::HAS_SEEN_AUTH_CONFIG, "true")
    }

    pub fn diagnostics(&self) -> AuthDiagnostics {
        let current = self.state.current();
        let describe = |auth_type: AuthType, provider: Option<&dyn SessionProvider>| {
            let user = provider.and_then(|p| p.current_user());
            ProviderDiagnostics {
                auth_type,
                available: provider.is_some(),
                active: auth_type == current,
                authenticated: user.is_some(),
                user_id: user.map(|u| u.id.clone()),
                role: user.map(|u| u.role.to_string()),
                last_error: provider.and_then(|p| p.last_error()).map(str::to_string),
            }
        };

        AuthDiagnostics {
            auth_type: current,
            source: self.state.source(),
            local: describe(AuthType::Local, Some(self.local.as_ref())),
            firebase: describe(AuthType::Firebase, self.remote.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStorage;
    use crate::domain::Role;
    use crate::services::local_auth::LocalSessionManager;
    use crate::services::remote_auth::testing::FakeRemote;
    use crate::services::remote_auth::RemoteSessionManager;
    use crate::services::session_store::SessionStore;

    const REMOTE_EMAIL: &str = "lab@clinic.org";
    const REMOTE_PASSWORD: &str = "pw123456";

    #[test]
    fn test_resolve_prefers_stored_value() {
        let state = AuthModeState::resolve(Some("firebase"), true, false);
        assert_eq!(state.current(), AuthType::Firebase);
        assert_eq!(state.source(), ModeSource::Stored);
        assert!(!state.needs_persist());
    }

    #[test]
    fn test_resolve_migrates_legacy_tag() {
        let state = AuthModeState::resolve(Some("supabase"), false, false);
        assert_eq!(state.current(), AuthType::Firebase);
        assert_eq!(state.source(), ModeSource::Migrated);
        assert!(state.needs_persist());
    }

    #[test]
    fn test_resolve_detects_from_session_keys() {
        assert_eq!(
            AuthModeState::resolve(None, false, true).current(),
            AuthType::Firebase
        );
        assert_eq!(
            AuthModeState::resolve(None, true, true).current(),
            AuthType::Local
        );
        let default = AuthModeState::resolve(Some("garbage"), false, false);
        assert_eq!(default.current(), AuthType::Local);
        assert_eq!(default.source(), ModeSource::Detected);
    }

    #[test]
    fn test_switch_to_same_mode_is_noop() {
        let mut state = AuthModeState::resolve(None, false, false);
        assert_eq!(state.switch_to(AuthType::Local), None);
        assert_eq!(state.switch_to(AuthType::Firebase), Some(AuthType::Local));
        assert_eq!(state.source(), ModeSource::Switched);
    }

    #[test]
    fn test_without_remote_keeps_local_states() {
        let stored = AuthModeState::resolve(Some("local"), false, false);
        assert_eq!(stored.without_remote(), stored);

        let fallback = AuthModeState::resolve(Some("firebase"), false, false).without_remote();
        assert_eq!(fallback.current(), AuthType::Local);
        assert_eq!(fallback.source(), ModeSource::Unavailable);
        assert!(!fallback.needs_persist());
    }

    fn local_only(backend: Arc<MemoryStorage>) -> AuthModeSelector {
        let local = LocalSessionManager::new(SessionStore::new(backend.clone()));
        AuthModeSelector::initialize(backend, Box::new(local), None).unwrap()
    }

    fn with_remote(backend: Arc<MemoryStorage>) -> AuthModeSelector {
        let local = LocalSessionManager::new(SessionStore::new(backend.clone()));
        let remote = RemoteSessionManager::new(
            Arc::new(FakeRemote::with_account(REMOTE_EMAIL, REMOTE_PASSWORD, Role::LabTech)),
            backend.clone(),
        );
        AuthModeSelector::initialize(backend, Box::new(local), Some(Box::new(remote))).unwrap()
    }

    fn assert_preference(backend: &MemoryStorage, expected: &str) {
        assert_eq!(
            backend.get(keys::PREFERRED_AUTH_TYPE).unwrap().as_deref(),
            Some(expected)
        );
        assert_eq!(
            backend.get(keys::PREFERRED_API_SERVICE).unwrap().as_deref(),
            Some(expected)
        );
    }

    #[test]
    fn test_switch_to_firebase_signs_out_of_local() {
        let backend = Arc::new(MemoryStorage::new());
        let mut selector = with_remote(backend.clone());
        selector.sign_in("admin@clinic.com", "admin123").unwrap();
        assert!(backend.get(keys::CURRENT_USER).unwrap().is_some());

        assert!(selector.switch_auth_type(AuthType::Firebase).unwrap());

        assert_eq!(selector.auth_type(), AuthType::Firebase);
        assert_eq!(selector.state().source(), ModeSource::Switched);
        assert!(!selector.is_authenticated());
        for key in keys::SESSION_KEYS {
            assert!(backend.get(key).unwrap().is_none(), "{} left behind", key);
        }
        assert_preference(&backend, "firebase");

        // The remote provider now serves sign-in; local keys stay empty
        let user = selector.sign_in(REMOTE_EMAIL, REMOTE_PASSWORD).unwrap();
        assert_eq!(user.role, Role::LabTech);
        assert!(backend.get(keys::REMOTE_SESSION).unwrap().is_some());
        assert!(backend.get(keys::CURRENT_USER).unwrap().is_none());
        assert!(!selector.diagnostics().local.authenticated);
    }

    #[test]
    fn test_switch_to_local_signs_out_of_firebase() {
        let backend = Arc::new(MemoryStorage::new());
        let mut selector = with_remote(backend.clone());
        selector.switch_auth_type(AuthType::Firebase).unwrap();
        selector.sign_in(REMOTE_EMAIL, REMOTE_PASSWORD).unwrap();

        assert!(selector.switch_auth_type(AuthType::Local).unwrap());

        assert_eq!(selector.auth_type(), AuthType::Local);
        assert!(backend.get(keys::REMOTE_SESSION).unwrap().is_none());
        assert!(!selector.is_authenticated());
        assert!(!selector.diagnostics().firebase.authenticated);
        assert_preference(&backend, "local");

        // Switching again to the active mode changes nothing
        assert!(!selector.switch_auth_type(AuthType::Local).unwrap());
    }

    #[test]
    fn test_remote_session_key_selects_firebase() {
        let backend = Arc::new(MemoryStorage::new());
        {
            let mut selector = with_remote(backend.clone());
            selector.switch_auth_type(AuthType::Firebase).unwrap();
            selector.sign_in(REMOTE_EMAIL, REMOTE_PASSWORD).unwrap();
        }
        backend.remove(keys::PREFERRED_AUTH_TYPE).unwrap();
        backend.remove(keys::PREFERRED_API_SERVICE).unwrap();

        let selector = with_remote(backend.clone());
        assert_eq!(selector.auth_type(), AuthType::Firebase);
        assert_eq!(selector.state().source(), ModeSource::Detected);
        assert_eq!(
            selector.current_user().map(|u| u.email.as_str()),
            Some(REMOTE_EMAIL)
        );
        assert_preference(&backend, "firebase");
    }

    #[test]
    fn test_stored_firebase_preference_survives_missing_config() {
        let backend = Arc::new(MemoryStorage::new());
        backend.set(keys::PREFERRED_AUTH_TYPE, "firebase").unwrap();
        backend.set(keys::PREFERRED_API_SERVICE, "firebase").unwrap();

        let mut selector = local_only(backend.clone());
        assert_eq!(selector.auth_type(), AuthType::Local);
        assert_eq!(selector.state().source(), ModeSource::Unavailable);
        assert_preference(&backend, "firebase");

        // An explicit choice of local is persisted even though nothing switches
        assert!(!selector.switch_auth_type(AuthType::Local).unwrap());
        assert_eq!(selector.state().source(), ModeSource::Switched);
        assert_preference(&backend, "local");
    }

    #[test]
    fn test_first_run_persists_detected_preference() {
        let backend = Arc::new(MemoryStorage::new());
        let selector = local_only(backend.clone());

        assert_eq!(selector.auth_type(), AuthType::Local);
        assert_eq!(
            backend.get(keys::PREFERRED_AUTH_TYPE).unwrap().as_deref(),
            Some("local")
        );
        assert_eq!(
            backend.get(keys::PREFERRED_API_SERVICE).unwrap().as_deref(),
            Some("local")
        );
    }

    #[test]
    fn test_unconfigured_firebase_falls_back_to_local() {
        let backend = Arc::new(MemoryStorage::new());
        backend.set(keys::PREFERRED_AUTH_TYPE, "supabase").unwrap();

        let mut selector = local_only(backend.clone());
        assert_eq!(selector.auth_type(), AuthType::Local);
        assert!(matches!(
            selector.switch_auth_type(AuthType::Firebase),
            Err(Error::Config(_))
        ));
        // The legacy tag is left for a run where Firebase is configured
        assert_eq!(
            backend.get(keys::PREFERRED_AUTH_TYPE).unwrap().as_deref(),
            Some("supabase")
        );
        assert!(backend.get(keys::PREFERRED_API_SERVICE).unwrap().is_none());
    }

    #[test]
    fn test_corrupted_session_does_not_block_start_up() {
        let backend = Arc::new(MemoryStorage::new());
        backend.set(keys::CURRENT_USER, "{broken").unwrap();
        backend.set(keys::AUTH_TYPE, "local").unwrap();

        let selector = local_only(backend.clone());
        assert!(!selector.is_authenticated());
        assert_eq!(
            selector.diagnostics().local.last_error.as_deref(),
            Some("Session data corrupted")
        );
        assert!(backend.get(keys::CURRENT_USER).unwrap().is_none());
    }

    #[test]
    fn test_onboarding_flag() {
        let backend = Arc::new(MemoryStorage::new());
        let selector = local_only(backend);
        assert!(!selector.has_seen_auth_config().unwrap());
        selector.mark_auth_config_seen().unwrap();
        assert!(selector.has_seen_auth_config().unwrap());
    }
}
