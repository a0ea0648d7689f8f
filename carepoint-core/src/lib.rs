//! CarePoint Core - session, auth-mode and plan entitlement logic
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (User, Role, SessionRecord, LimitsSnapshot, etc.)
//! - **ports**: Trait definitions for external dependencies (storage, remote auth, billing)
//! - **services**: Session managers, auth-mode selector, entitlements, billing, health, logging
//! - **adapters**: Concrete implementations (file storage, Firebase REST, billing HTTP, demo data)

pub mod adapters;
pub mod config;
pub mod domain;
mod log_migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::billing_demo::DemoBillingProvider;
use adapters::billing_http::HttpBillingClient;
use adapters::file::FileStorage;
use adapters::firebase::{FirebaseAuthClient, FIREBASE_AUTH_URL, FIRESTORE_URL};
use config::Config;
use ports::{BillingProvider, RemoteAuthProvider, SessionProvider, StorageBackend};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    AuthType, EntitlementCheck, LimitsSnapshot, Role, SessionRecord, TrialStatus, UsageKind, User,
};
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Main context for CarePoint operations
///
/// Holds the configuration, the storage backend and every service, wired
/// against the collaborators the configuration selects.
pub struct CarepointContext {
    pub data_dir: PathBuf,
    pub config: Config,
    pub backend: Arc<dyn StorageBackend>,
    pub auth: AuthModeSelector,
    pub entitlements: EntitlementService,
    pub billing: BillingService,
    pub health: HealthService,
}

impl CarepointContext {
    /// Create a context backed by `storage.json` in `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let config = Config::load(data_dir)?;
        let backend: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(data_dir));
        Self::with_backend(data_dir, config, backend)
    }

    /// Create a context over an explicit storage backend
    pub fn with_backend(
        data_dir: &Path,
        config: Config,
        backend: Arc<dyn StorageBackend>,
    ) -> Result<Self> {
        let remote = build_remote(&config)?;
        let billing_provider = build_billing(&config)?;

        let local: Box<dyn SessionProvider> =
            Box::new(LocalSessionManager::new(SessionStore::new(backend.clone())));
        let remote_session: Option<Box<dyn SessionProvider>> = remote.clone().map(|provider| {
            Box::new(RemoteSessionManager::new(provider, backend.clone())) as Box<dyn SessionProvider>
        });

        let auth = AuthModeSelector::initialize(backend.clone(), local, remote_session)
            .context("Failed to restore session")?;

        let entitlements = EntitlementService::new(billing_provider.clone(), &config.clinic_id);
        let billing = BillingService::new(billing_provider.clone(), backend.clone(), &config.clinic_id);
        let health = HealthService::new(backend.clone(), billing_provider, remote);

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            config,
            backend,
            auth,
            entitlements,
            billing,
            health,
        })
    }
}

/// Firebase client when both the API key and the project id are configured
pub fn build_remote(config: &Config) -> Result<Option<Arc<dyn RemoteAuthProvider>>> {
    let settings = &config.firebase;
    let (Some(api_key), Some(project_id)) = (&settings.api_key, &settings.project_id) else {
        return Ok(None);
    };
    if !settings.is_configured() {
        return Ok(None);
    }

    let client = FirebaseAuthClient::new_with_base_urls(
        api_key,
        project_id,
        settings.auth_base_url.as_deref().unwrap_or(FIREBASE_AUTH_URL),
        settings.firestore_base_url.as_deref().unwrap_or(FIRESTORE_URL),
    )
    .context("Invalid Firebase settings")?;
    Ok(Some(Arc::new(client)))
}

/// HTTP billing client when a base URL is configured, the demo provider otherwise
pub fn build_billing(config: &Config) -> Result<Arc<dyn BillingProvider>> {
    match config.billing_url() {
        Some(url) => {
            let client = HttpBillingClient::new(url, config.billing.api_key.as_deref())
                .context("Invalid billing settings")?;
            Ok(Arc::new(client))
        }
        None => Ok(Arc::new(DemoBillingProvider::new())),
    }
}
