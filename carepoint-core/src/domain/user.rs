//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;

/// Represents an authenticated staff member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            role,
            specialization: None,
            department: None,
            is_active: None,
            last_login: None,
            permissions: None,
        }
    }

    /// Copy of this profile stamped as an active login at `now`
    pub fn logged_in_at(&self, now: DateTime<Utc>) -> Self {
        Self {
            is_active: Some(true),
            last_login: Some(now),
            ..self.clone()
        }
    }

    /// Merge the mutable profile fields
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(specialization) = &update.specialization {
            self.specialization = Some(specialization.clone());
        }
        if let Some(department) = &update.department {
            self.department = Some(department.clone());
        }
    }
}

/// Registration fields submitted by a new staff member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

/// Partial profile update (name, specialization, department only)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.specialization.is_none() && self.department.is_none()
    }
}
