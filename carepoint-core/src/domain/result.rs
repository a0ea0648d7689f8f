//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Display strings are the messages shown to the person at the keyboard, so
/// credential failures never reveal whether the email or the password was wrong.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("No user logged in")]
    NotAuthenticated,

    #[error("Session data corrupted")]
    SessionCorrupted,

    #[error("Unable to save session: {0}")]
    StorageUnavailable(String),

    #[error("{0} is not available in local mode")]
    NotAvailableInLocalMode(String),

    #[error("Remote auth error: {0}")]
    Remote(String),

    #[error("Billing error: {0}")]
    Billing(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a storage-unavailable error
    pub fn storage_unavailable(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Create a remote auth error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Create a billing error
    pub fn billing(msg: impl Into<String>) -> Self {
        Self::Billing(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a storage backend error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result envelope (`{data, error}`) for JSON consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Attach a context value
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_operation_result_fail() {
        let result: OperationResult<i32> = OperationResult::fail("Something went wrong");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error, Some("Something went wrong".to_string()));
    }

    #[test]
    fn test_from_result_keeps_user_facing_message() {
        let err: Result<i32> = Err(Error::InvalidCredentials);
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Invalid login credentials"));
    }

    #[test]
    fn test_local_mode_message() {
        let err = Error::NotAvailableInLocalMode("Password reset".into());
        assert_eq!(err.to_string(), "Password reset is not available in local mode");
    }

    #[test]
    fn test_context_is_skipped_when_empty() {
        let json = serde_json::to_value(OperationResult::ok(1)).unwrap();
        assert!(json.get("context").is_none());

        let json = serde_json::to_value(
            OperationResult::ok(1).with_context("authType", serde_json::json!("local")),
        )
        .unwrap();
        assert_eq!(json["context"]["authType"], "local");
    }
}
