//! Remote identity port

use serde::{Deserialize, Serialize};

use crate::domain::result::Result;
use crate::domain::User;

/// Credentials returned by the remote identity service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAccount {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Remote identity collaborator (email/password accounts plus profile documents)
pub trait RemoteAuthProvider: Send + Sync {
    /// Provider name (e.g., "firebase")
    fn name(&self) -> &str;

    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<RemoteAccount>;

    fn create_account(&self, email: &str, password: &str) -> Result<RemoteAccount>;

    fn send_password_reset(&self, email: &str) -> Result<()>;

    /// Change the password of the signed-in account; returns refreshed credentials
    fn update_password(&self, account: &RemoteAccount, new_password: &str) -> Result<RemoteAccount>;

    /// Read the staff profile stored for `account`, `None` if it does not exist
    fn fetch_profile(&self, account: &RemoteAccount) -> Result<Option<User>>;

    /// Create or replace the staff profile stored for `account`
    fn save_profile(&self, account: &RemoteAccount, user: &User) -> Result<()>;

    /// Cheap reachability check
    fn ping(&self) -> Result<()>;
}
