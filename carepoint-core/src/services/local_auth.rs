//! Local session manager - demo-registry authentication
//!
//! Credentials are checked against the compiled-in demo registry and the
//! session lives in the storage backend. Sign-ups are session-only: the new
//! account disappears on sign-out.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use regex::Regex;

use crate::adapters::demo_accounts;
use crate::domain::result::{Error, Result};
use crate::domain::{AuthType, ProfileUpdate, SessionRecord, SignUpRequest, User};
use crate::ports::SessionProvider;

use super::session_store::SessionStore;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Minimum password length accepted at sign-up
pub const MIN_PASSWORD_LEN: usize = 6;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Timestamp-derived user id, unique per call within a process
fn generate_user_id() -> String {
    let timestamp = Utc::now().timestamp_millis().max(0) as u64;
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    ((timestamp << 16) | counter).to_string()
}

/// Check the registration fields shared by both auth modes
pub fn validate_sign_up(request: &SignUpRequest) -> Result<()> {
    let email_re = Regex::new(EMAIL_PATTERN).map_err(|e| Error::Other(e.to_string()))?;
    if !email_re.is_match(request.email.trim()) {
        return Err(Error::validation("Invalid email address"));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if request.name.trim().is_empty() {
        return Err(Error::validation("Name is required"));
    }
    Ok(())
}

/// Session provider backed by the demo registry
pub struct LocalSessionManager {
    store: SessionStore,
    user: Option<User>,
    error: Option<String>,
}

impl LocalSessionManager {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            user: None,
            error: None,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn fail<T>(&mut self, error: Error) -> Result<T> {
        self.error = Some(error.to_string());
        Err(error)
    }

    /// Stamp the login, persist it and make it the in-memory session
    fn activate(&mut self, user: User) -> Result<User> {
        let now = Utc::now();
        let user = user.logged_in_at(now);
        let record = SessionRecord::local(user.clone(), now);

        if let Err(e) = self.store.check_writable().and_then(|_| self.store.save(&record)) {
            return self.fail(e);
        }

        self.user = Some(user.clone());
        self.error = None;
        Ok(user)
    }
}

impl SessionProvider for LocalSessionManager {
    fn auth_type(&self) -> AuthType {
        AuthType::Local
    }

    fn initialize(&mut self) -> Result<Option<User>> {
        match self.store.load() {
            Ok(record) => {
                self.user = record.map(|r| r.user);
                self.error = None;
                Ok(self.user.clone())
            }
            Err(e) => {
                self.user = None;
                self.fail(e)
            }
        }
    }

    fn sign_in(&mut self, email: &str, password: &str) -> Result<User> {
        match demo_accounts::find_by_credentials(email, password) {
            Some(account) => self.activate(account.to_user()),
            None => self.fail(Error::InvalidCredentials),
        }
    }

    fn sign_up(&mut self, request: &SignUpRequest) -> Result<User> {
        if demo_accounts::email_registered(&request.email) {
            return self.fail(Error::EmailAlreadyRegistered);
        }
        if let Err(e) = validate_sign_up(request) {
            return self.fail(e);
        }

        let mut user = User::new(
            generate_user_id(),
            request.email.trim(),
            request.name.trim(),
            request.role,
        );
        user.specialization = request.specialization.clone();
        user.department = request.department.clone();

        self.activate(user)
    }

    fn sign_out(&mut self) -> Result<()> {
        let _ = self.store.clear();
        self.user = None;
        self.error = None;
        Ok(())
    }

    fn reset_password(&mut self, _email: &str) -> Result<()> {
        self.fail(Error::NotAvailableInLocalMode("Password reset".to_string()))
    }

    fn update_password(&mut self, _new_password: &str) -> Result<()> {
        self.fail(Error::NotAvailableInLocalMode("Password update".to_string()))
    }

    fn update_profile(&mut self, update: &ProfileUpdate) -> Result<User> {
        let Some(mut updated) = self.user.clone() else {
            return self.fail(Error::NotAuthenticated);
        };

        updated.apply(update);
        let logged_in_at = updated.last_login.unwrap_or_else(Utc::now);
        let record = SessionRecord::local(updated.clone(), logged_in_at);

        if let Err(e) = self.store.save(&record) {
            return self.fail(e);
        }

        self.user = Some(updated.clone());
        self.error = None;
        Ok(updated)
    }

    fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::memory::MemoryStorage;
    use crate::domain::Role;
    use crate::ports::StorageBackend;
    use crate::services::session_store::keys;

    fn manager() -> (LocalSessionManager, Arc<MemoryStorage>) {
        let backend = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(backend.clone());
        (LocalSessionManager::new(store), backend)
    }

    fn sign_up_request(email: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.to_string(),
            password: "secret99".to_string(),
            name: "New Hire".to_string(),
            role: Role::Nurse,
            specialization: None,
            department: Some("Pediatrics".to_string()),
        }
    }

    #[test]
    fn test_sign_in_sets_login_fields() {
        let (mut auth, _) = manager();
        let user = auth.sign_in("doctor@clinic.com", "doctor123").unwrap();

        assert_eq!(user.role, Role::Doctor);
        assert_eq!(user.is_active, Some(true));
        assert!(user.last_login.is_some());
        assert!(auth.is_doctor());
        assert!(!auth.is_admin());
        assert!(auth.last_error().is_none());
    }

    #[test]
    fn test_wrong_password_does_not_touch_storage() {
        let (mut auth, backend) = manager();
        let err = auth.sign_in("admin@clinic.com", "nope").unwrap_err();

        assert_eq!(err.to_string(), "Invalid login credentials");
        assert_eq!(auth.last_error(), Some("Invalid login credentials"));
        assert!(backend.is_empty());
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_sign_up_rejects_registry_email() {
        let (mut auth, _) = manager();
        let err = auth.sign_up(&sign_up_request("ADMIN@clinic.com")).unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[test]
    fn test_sign_up_validates_fields() {
        let (mut auth, _) = manager();

        let mut request = sign_up_request("not-an-email");
        assert!(matches!(auth.sign_up(&request), Err(Error::Validation(_))));

        request.email = "new@clinic.com".into();
        request.password = "123".into();
        assert!(matches!(auth.sign_up(&request), Err(Error::Validation(_))));
    }

    #[test]
    fn test_sign_up_ids_are_unique() {
        let (mut auth, _) = manager();
        let first = auth.sign_up(&sign_up_request("one@clinic.com")).unwrap();
        let second = auth.sign_up(&sign_up_request("two@clinic.com")).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(second.department.as_deref(), Some("Pediatrics"));
        assert_eq!(auth.current_user().unwrap().email, "two@clinic.com");
    }

    #[test]
    fn test_sign_out_clears_keys() {
        let (mut auth, backend) = manager();
        auth.sign_in("nurse@clinic.com", "nurse123").unwrap();
        auth.sign_out().unwrap();

        for key in keys::SESSION_KEYS {
            assert!(backend.get(key).unwrap().is_none());
        }
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_password_operations_unavailable() {
        let (mut auth, _) = manager();
        assert!(matches!(
            auth.reset_password("admin@clinic.com"),
            Err(Error::NotAvailableInLocalMode(_))
        ));
        assert!(matches!(
            auth.update_password("newpass"),
            Err(Error::NotAvailableInLocalMode(_))
        ));
    }

    #[test]
    fn test_update_profile_requires_session() {
        let (mut auth, _) = manager();
        let err = auth.update_profile(&ProfileUpdate::default()).unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
    }

    #[test]
    fn test_update_profile_persists() {
        let (mut auth, backend) = manager();
        auth.sign_in("lab@clinic.com", "lab123").unwrap();

        let updated = auth
            .update_profile(&ProfileUpdate {
                specialization: Some("Microbiology".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.specialization.as_deref(), Some("Microbiology"));

        let stored = backend.get(keys::CURRENT_USER).unwrap().unwrap();
        let stored: User = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored.specialization.as_deref(), Some("Microbiology"));
        assert_eq!(stored.name, "Dr. Lisa Park");
    }

    #[test]
    fn test_has_permission_is_open_for_any_session() {
        let (mut auth, _) = manager();
        assert!(!auth.has_permission("patients:write"));

        auth.sign_in("reception@clinic.com", "reception123").unwrap();
        assert!(auth.has_permission("patients:write"));
        assert!(auth.has_permission("billing:refund"));
    }
}
