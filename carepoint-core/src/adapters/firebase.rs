//! Firebase REST client
//!
//! Email/password accounts go through the Identity Toolkit REST API and staff
//! profiles live in the Firestore `users/{uid}` collection.
//!
//! API Documentation: https://firebase.google.com/docs/reference/rest/auth

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::domain::result::{Error, Result};
use crate::domain::{Role, User};
use crate::ports::{RemoteAccount, RemoteAuthProvider};

// =============================================================================
// API Response Models
// =============================================================================

/// Identity Toolkit sign-in / sign-up / update response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Firestore document with typed field values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: HashMap<String, JsonValue>,
}

impl FirestoreDocument {
    fn string(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|v| v.get("stringValue"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    fn boolean(&self, name: &str) -> Option<bool> {
        self.fields
            .get(name)
            .and_then(|v| v.get("booleanValue"))
            .and_then(|v| v.as_bool())
    }

    fn from_user(user: &User) -> Self {
        let mut fields = HashMap::new();
        fields.insert("email".to_string(), json!({ "stringValue": user.email }));
        fields.insert("name".to_string(), json!({ "stringValue": user.name }));
        fields.insert("role".to_string(), json!({ "stringValue": user.role.as_str() }));
        if let Some(s) = &user.specialization {
            fields.insert("specialization".to_string(), json!({ "stringValue": s }));
        }
        if let Some(d) = &user.department {
            fields.insert("department".to_string(), json!({ "stringValue": d }));
        }
        fields.insert(
            "isActive".to_string(),
            json!({ "booleanValue": user.is_active.unwrap_or(true) }),
        );
        Self { fields }
    }

    fn to_user(&self, uid: &str, fallback_email: &str) -> Result<User> {
        let role_tag = self
            .string("role")
            .ok_or_else(|| Error::remote("Profile document has no role"))?;
        let role: Role = role_tag.parse()?;
        let email = self.string("email").unwrap_or_else(|| fallback_email.to_string());
        let name = self.string("name").unwrap_or_else(|| email.clone());

        let mut user = User::new(uid, email, name, role);
        user.specialization = self.string("specialization");
        user.department = self.string("department");
        user.is_active = self.boolean("isActive");
        Ok(user)
    }
}

// =============================================================================
// Firebase HTTP Client
// =============================================================================

/// Default Identity Toolkit URL
pub const FIREBASE_AUTH_URL: &str = "https://identitytoolkit.googleapis.com";

/// Default Firestore URL
pub const FIRESTORE_URL: &str = "https://firestore.googleapis.com";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Firebase Auth + Firestore client
#[derive(Debug)]
pub struct FirebaseAuthClient {
    client: Client,
    api_key: String,
    project_id: String,
    auth_base_url: String,
    firestore_base_url: String,
}

impl FirebaseAuthClient {
    /// Client against the production Firebase endpoints
    pub fn new(api_key: &str, project_id: &str) -> Result<Self> {
        Self::new_with_base_urls(api_key, project_id, FIREBASE_AUTH_URL, FIRESTORE_URL)
    }

    /// Client against custom endpoints (emulator, mock server)
    pub fn new_with_base_urls(
        api_key: &str,
        project_id: &str,
        auth_base_url: &str,
        firestore_base_url: &str,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::config("Firebase API key cannot be empty"));
        }
        if project_id.is_empty() {
            return Err(Error::config("Firebase project id cannot be empty"));
        }
        for base in [auth_base_url, firestore_base_url] {
            url::Url::parse(base)
                .map_err(|e| Error::config(format!("Invalid Firebase URL {}: {}", base, e)))?;
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            project_id: project_id.to_string(),
            auth_base_url: auth_base_url.trim_end_matches('/').to_string(),
            firestore_base_url: firestore_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn accounts_url(&self, action: &str) -> String {
        format!("{}/v1/accounts:{}?key={}", self.auth_base_url, action, self.api_key)
    }

    fn profile_url(&self, uid: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/users/{}",
            self.firestore_base_url, self.project_id, uid
        )
    }

    fn post_accounts(&self, action: &str, body: &JsonValue) -> Result<Response> {
        let response = self
            .client
            .post(self.accounts_url(action))
            .json(body)
            .send()
            .map_err(map_request_error)?;
        check_response(response)
    }

    fn account_from(response: Response, fallback_email: &str) -> Result<RemoteAccount> {
        let parsed: AccountResponse = response
            .json()
            .map_err(|e| Error::remote(format!("Failed to parse Firebase response: {}", e)))?;
        Ok(RemoteAccount {
            uid: parsed.local_id,
            email: parsed.email.unwrap_or_else(|| fallback_email.to_string()),
            id_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
        })
    }
}

impl RemoteAuthProvider for FirebaseAuthClient {
    fn name(&self) -> &str {
        "firebase"
    }

    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<RemoteAccount> {
        let response = self.post_accounts(
            "signInWithPassword",
            &json!({ "email": email, "password": password, "returnSecureToken": true }),
        )?;
        Self::account_from(response, email)
    }

    fn create_account(&self, email: &str, password: &str) -> Result<RemoteAccount> {
        let response = self.post_accounts(
            "signUp",
            &json!({ "email": email, "password": password, "returnSecureToken": true }),
        )?;
        Self::account_from(response, email)
    }

    fn send_password_reset(&self, email: &str) -> Result<()> {
        self.post_accounts(
            "sendOobCode",
            &json!({ "requestType": "PASSWORD_RESET", "email": email }),
        )?;
        Ok(())
    }

    fn update_password(&self, account: &RemoteAccount, new_password: &str) -> Result<RemoteAccount> {
        let response = self.post_accounts(
            "update",
            &json!({
                "idToken": account.id_token,
                "password": new_password,
                "returnSecureToken": true
            }),
        )?;
        Self::account_from(response, &account.email)
    }

    fn fetch_profile(&self, account: &RemoteAccount) -> Result<Option<User>> {
        let response = self
            .client
            .get(self.profile_url(&account.uid))
            .bearer_auth(&account.id_token)
            .send()
            .map_err(map_request_error)?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        let response = check_response(response)?;

        let document: FirestoreDocument = response
            .json()
            .map_err(|e| Error::remote(format!("Failed to parse profile document: {}", e)))?;
        document.to_user(&account.uid, &account.email).map(Some)
    }

    fn save_profile(&self, account: &RemoteAccount, user: &User) -> Result<()> {
        let document = FirestoreDocument::from_user(user);
        let response = self
            .client
            .patch(self.profile_url(&account.uid))
            .bearer_auth(&account.id_token)
            .json(&document)
            .send()
            .map_err(map_request_error)?;
        check_response(response)?;
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        // Any HTTP answer means the service is reachable
        self.client
            .get(&self.auth_base_url)
            .send()
            .map(|_| ())
            .map_err(map_request_error)
    }
}

fn map_request_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::remote(format!(
            "Connection timed out after {} seconds",
            REQUEST_TIMEOUT_SECS
        ))
    } else if error.is_connect() {
        Error::remote("Unable to connect to Firebase")
    } else {
        Error::remote(format!("Firebase request failed: {}", error))
    }
}

/// Pass through 2xx responses, map everything else into the error taxonomy
fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = response
        .json::<ErrorEnvelope>()
        .map(|e| e.error.message)
        .unwrap_or_default();
    Err(map_error_code(status.as_u16(), &code))
}

/// Map an Identity Toolkit error code (e.g. `EMAIL_EXISTS`) to a domain error
fn map_error_code(status: u16, code: &str) -> Error {
    // Codes may carry a suffix: "WEAK_PASSWORD : Password should be at least 6 characters"
    let head = code.split(':').next().unwrap_or("").trim();
    match head {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            Error::InvalidCredentials
        }
        "EMAIL_EXISTS" => Error::EmailAlreadyRegistered,
        "INVALID_EMAIL" => Error::validation("Invalid email address"),
        "WEAK_PASSWORD" => Error::validation("Password is too weak"),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => {
            Error::remote("Too many attempts. Please wait a moment and try again.")
        }
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => {
            Error::remote("Your session has expired. Please sign in again.")
        }
        _ => match status {
            401 | 403 => Error::remote("Firebase access denied. Check the API key and project."),
            404 => Error::remote("Firebase resource not found."),
            _ if head.is_empty() => Error::remote(format!("Firebase API error: HTTP {}", status)),
            _ => Error::remote(format!("Firebase API error: {}", head)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_settings() {
        assert!(matches!(
            FirebaseAuthClient::new("", "proj"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            FirebaseAuthClient::new("key", ""),
            Err(Error::Config(_))
        ));
        assert!(FirebaseAuthClient::new_with_base_urls("key", "proj", "not a url", FIRESTORE_URL).is_err());
    }

    #[test]
    fn test_error_codes_collapse_credential_failures() {
        assert!(matches!(map_error_code(400, "EMAIL_NOT_FOUND"), Error::InvalidCredentials));
        assert!(matches!(map_error_code(400, "INVALID_PASSWORD"), Error::InvalidCredentials));
        assert!(matches!(map_error_code(400, "EMAIL_EXISTS"), Error::EmailAlreadyRegistered));
        assert!(matches!(
            map_error_code(400, "WEAK_PASSWORD : Password should be at least 6 characters"),
            Error::Validation(_)
        ));
        assert!(matches!(map_error_code(500, ""), Error::Remote(_)));
    }

    #[test]
    fn test_profile_document_round_trip() {
        let mut user = User::new("uid-1", "doc@clinic.com", "Dr. Who", Role::Radiologist);
        user.department = Some("Imaging".into());

        let doc = FirestoreDocument::from_user(&user);
        let parsed = doc.to_user("uid-1", "ignored@clinic.com").unwrap();

        assert_eq!(parsed.role, Role::Radiologist);
        assert_eq!(parsed.department.as_deref(), Some("Imaging"));
        assert_eq!(parsed.email, "doc@clinic.com");
        assert_eq!(parsed.is_active, Some(true));
    }

    #[test]
    fn test_profile_document_with_unknown_role_is_rejected() {
        let mut doc = FirestoreDocument::default();
        doc.fields
            .insert("role".into(), json!({ "stringValue": "janitor" }));
        assert!(doc.to_user("uid", "a@clinic.com").is_err());
    }

    mod http {
        use super::*;
        use crate::adapters::mock_server::{
            MockConfig, MockServer, KNOWN_EMAIL, KNOWN_PASSWORD, KNOWN_UID,
        };

        fn client(server: &MockServer) -> FirebaseAuthClient {
            let base = server.base_url();
            FirebaseAuthClient::new_with_base_urls("test_key", "carepoint", &base, &base).unwrap()
        }

        #[test]
        fn test_sign_in_and_fetch_profile() {
            let server = MockServer::start(MockConfig::default()).unwrap();
            let client = client(&server);

            let account = client
                .sign_in_with_password(KNOWN_EMAIL, KNOWN_PASSWORD)
                .unwrap();
            assert_eq!(account.uid, KNOWN_UID);

            let profile = client.fetch_profile(&account).unwrap().unwrap();
            assert_eq!(profile.role, Role::Doctor);
            assert_eq!(profile.department.as_deref(), Some("Cardiology"));
        }

        #[test]
        fn test_wrong_password_is_invalid_credentials() {
            let server = MockServer::start(MockConfig::default()).unwrap();
            let err = client(&server)
                .sign_in_with_password(KNOWN_EMAIL, "nope")
                .unwrap_err();
            assert!(matches!(err, Error::InvalidCredentials));
        }

        #[test]
        fn test_sign_up_saves_profile() {
            let server = MockServer::start(MockConfig::default()).unwrap();
            let client = client(&server);

            assert!(matches!(
                client.create_account(KNOWN_EMAIL, "whatever1"),
                Err(Error::EmailAlreadyRegistered)
            ));

            let account = client.create_account("new@clinic.com", "secret99").unwrap();
            assert!(client.fetch_profile(&account).unwrap().is_none());

            let user = User::new(&account.uid, "new@clinic.com", "New Nurse", Role::Nurse);
            client.save_profile(&account, &user).unwrap();
            let stored = client.fetch_profile(&account).unwrap().unwrap();
            assert_eq!(stored.name, "New Nurse");
            assert_eq!(stored.role, Role::Nurse);
        }

        #[test]
        fn test_password_reset_and_ping() {
            let server = MockServer::start(MockConfig::default()).unwrap();
            let client = client(&server);
            client.send_password_reset(KNOWN_EMAIL).unwrap();
            client.ping().unwrap();
        }
    }
}
