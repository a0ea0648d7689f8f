//! Health service - connectivity checks for storage and collaborators
//!
//! Results are stored as JSON under `server-health` so the next start can show
//! the last known state before any network call returns.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::result::Result;
use crate::domain::{CheckResult, ServerHealth};
use crate::ports::{BillingProvider, RemoteAuthProvider, StorageBackend};

use super::session_store::{keys, SessionStore};

pub struct HealthService {
    backend: Arc<dyn StorageBackend>,
    billing: Arc<dyn BillingProvider>,
    remote: Option<Arc<dyn RemoteAuthProvider>>,
}

impl HealthService {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        billing: Arc<dyn BillingProvider>,
        remote: Option<Arc<dyn RemoteAuthProvider>>,
    ) -> Self {
        Self {
            backend,
            billing,
            remote,
        }
    }

    /// Run every check and record the snapshot
    pub fn run_checks(&self) -> Result<ServerHealth> {
        let storage = match SessionStore::new(self.backend.clone()).check_writable() {
            Ok(()) => CheckResult::pass("Storage is writable"),
            Err(e) => CheckResult::error(e.to_string()),
        };

        let billing = match self.billing.get_subscription_plans() {
            Ok(plans) => CheckResult::pass(format!(
                "Billing ({}) reachable, {} plan(s) available",
                self.billing.name(),
                plans.len()
            )),
            Err(e) => CheckResult::error(e.to_string()),
        };

        let remote_auth = match &self.remote {
            None => CheckResult::warning("Firebase is not configured; local mode only"),
            Some(remote) => match remote.ping() {
                Ok(()) => CheckResult::pass(format!("{} reachable", remote.name())),
                Err(e) => CheckResult::error(e.to_string()),
            },
        };

        let health = ServerHealth {
            checked_at: Utc::now(),
            storage,
            billing,
            remote_auth,
        };

        // A broken store is already reported in the snapshot itself
        let _ = self
            .backend
            .set(keys::SERVER_HEALTH, &serde_json::to_string(&health)?);

        Ok(health)
    }

    /// Last recorded snapshot, ignoring unreadable data
    pub fn last_snapshot(&self) -> Result<Option<ServerHealth>> {
        Ok(self
            .backend
            .get(keys::SERVER_HEALTH)?
            .and_then(|raw| serde_json::from_str(&raw).ok()))
    }
}
