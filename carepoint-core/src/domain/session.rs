//! Session and auth-mode domain types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::Error;
use super::user::User;

/// Which session provider is authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Demo registry, session kept in local storage
    Local,
    /// Firebase-backed remote identity
    Firebase,
}

/// Stored preference value that predates the Firebase migration
pub const LEGACY_REMOTE_TAG: &str = "supabase";

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Local => "local",
            AuthType::Firebase => "firebase",
        }
    }

    /// Parse a stored preference value.
    ///
    /// Returns the auth type and whether the value was a legacy tag that
    /// should be rewritten. Unrecognised values count as no preference.
    pub fn from_preference(value: &str) -> Option<(AuthType, bool)> {
        match value.trim() {
            "local" => Some((AuthType::Local, false)),
            "firebase" => Some((AuthType::Firebase, false)),
            LEGACY_REMOTE_TAG => Some((AuthType::Firebase, true)),
            _ => None,
        }
    }

    /// The provider that is not this one
    pub fn other(&self) -> AuthType {
        match self {
            AuthType::Local => AuthType::Firebase,
            AuthType::Firebase => AuthType::Local,
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuthType::from_preference(&s.to_lowercase())
            .map(|(t, _)| t)
            .ok_or_else(|| Error::validation(format!("Unknown auth type: {} (use local or firebase)", s)))
    }
}

/// The persisted single-session identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user: User,
    pub logged_in_at: DateTime<Utc>,
    pub auth_type: AuthType,
    pub token: String,
}

impl SessionRecord {
    /// Build a local session with its synthetic bearer token
    pub fn local(user: User, logged_in_at: DateTime<Utc>) -> Self {
        let token = local_token(&user.id);
        Self {
            user,
            logged_in_at,
            auth_type: AuthType::Local,
            token,
        }
    }
}

/// Synthetic bearer token for local sessions
pub fn local_token(user_id: &str) -> String {
    format!("local-token-{}", user_id)
}
