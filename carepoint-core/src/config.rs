//! Configuration management
//!
//! settings.json in the data directory:
//! ```json
//! {
//!   "clinicId": "clinic-1",
//!   "billing": { "baseUrl": "https://billing.example.com/api", "apiKey": "..." },
//!   "firebase": { "apiKey": "...", "projectId": "carepoint-prod" }
//! }
//! ```
//! Keys this crate does not manage are kept as-is when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILENAME: &str = "settings.json";

/// Clinic used when none is configured
pub const DEFAULT_CLINIC_ID: &str = "default-clinic";

pub const ENV_CLINIC_ID: &str = "CAREPOINT_CLINIC_ID";
pub const ENV_BILLING_URL: &str = "CAREPOINT_BILLING_URL";
pub const ENV_BILLING_API_KEY: &str = "CAREPOINT_BILLING_API_KEY";
pub const ENV_FIREBASE_API_KEY: &str = "CAREPOINT_FIREBASE_API_KEY";
pub const ENV_FIREBASE_PROJECT_ID: &str = "CAREPOINT_FIREBASE_PROJECT_ID";
pub const ENV_FIREBASE_AUTH_URL: &str = "CAREPOINT_FIREBASE_AUTH_URL";
pub const ENV_FIREBASE_FIRESTORE_URL: &str = "CAREPOINT_FIREBASE_FIRESTORE_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firestore_base_url: Option<String>,
}

impl FirebaseSettings {
    /// Both the API key and the project id are present
    pub fn is_configured(&self) -> bool {
        non_empty(&self.api_key).is_some() && non_empty(&self.project_id).is_some()
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    clinic_id: Option<String>,
    #[serde(default)]
    billing: BillingSettings,
    #[serde(default)]
    firebase: FirebaseSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Effective configuration: settings.json with environment overrides applied
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub clinic_id: String,
    pub billing: BillingSettings,
    pub firebase: FirebaseSettings,
    // What the file holds, so overrides never get written back
    raw: SettingsFile,
}

impl Config {
    /// Load from the data directory, applying `CAREPOINT_*` overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |key| std::env::var(key).ok())
    }

    /// Load with an explicit environment lookup
    pub fn load_with_env(data_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let clinic_id = env(ENV_CLINIC_ID)
            .or_else(|| non_empty(&raw.clinic_id))
            .unwrap_or_else(|| DEFAULT_CLINIC_ID.to_string());

        let billing = BillingSettings {
            base_url: env(ENV_BILLING_URL).or_else(|| non_empty(&raw.billing.base_url)),
            api_key: env(ENV_BILLING_API_KEY).or_else(|| non_empty(&raw.billing.api_key)),
        };

        let firebase = FirebaseSettings {
            api_key: env(ENV_FIREBASE_API_KEY).or_else(|| non_empty(&raw.firebase.api_key)),
            project_id: env(ENV_FIREBASE_PROJECT_ID)
                .or_else(|| non_empty(&raw.firebase.project_id)),
            auth_base_url: env(ENV_FIREBASE_AUTH_URL)
                .or_else(|| non_empty(&raw.firebase.auth_base_url)),
            firestore_base_url: env(ENV_FIREBASE_FIRESTORE_URL)
                .or_else(|| non_empty(&raw.firebase.firestore_base_url)),
        };

        Ok(Self {
            clinic_id,
            billing,
            firebase,
            raw,
        })
    }

    /// Persist the clinic id; other keys in the file are left untouched
    pub fn set_clinic_id(&mut self, clinic_id: impl Into<String>) {
        let clinic_id = clinic_id.into();
        self.raw.clinic_id = Some(clinic_id.clone());
        self.clinic_id = clinic_id;
    }

    /// Save managed fields, preserving everything else in settings.json
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;
        settings.clinic_id = self.raw.clinic_id.clone();
        settings.billing = self.raw.billing.clone();
        settings.firebase = self.raw.firebase.clone();

        let path = data_dir.join(SETTINGS_FILENAME);
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn billing_url(&self) -> Option<&str> {
        self.billing.base_url.as_deref()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let path = data_dir.join(SETTINGS_FILENAME);
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    // A malformed file behaves like an empty one
    Ok(serde_json::from_str(&content).unwrap_or_default())
}
