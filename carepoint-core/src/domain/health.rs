//! Connectivity snapshot written at start-up

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub message: String,
}

impl CheckResult {
    pub fn pass(message: impl Into<String>) -> Self {
        Self { status: CheckStatus::Pass, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { status: CheckStatus::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: CheckStatus::Error, message: message.into() }
    }
}

/// Stored under the `server-health` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerHealth {
    pub checked_at: DateTime<Utc>,
    pub storage: CheckResult,
    pub billing: CheckResult,
    pub remote_auth: CheckResult,
}

impl ServerHealth {
    /// Worst status across all checks
    pub fn overall(&self) -> CheckStatus {
        [&self.storage, &self.billing, &self.remote_auth]
            .iter()
            .map(|c| c.status)
            .fold(CheckStatus::Pass, |acc, s| match (acc, s) {
                (CheckStatus::Error, _) | (_, CheckStatus::Error) => CheckStatus::Error,
                (CheckStatus::Warning, _) | (_, CheckStatus::Warning) => CheckStatus::Warning,
                _ => CheckStatus::Pass,
            })
    }
}
