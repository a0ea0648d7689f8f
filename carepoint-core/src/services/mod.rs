//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod auth_mode;
mod billing;
mod entitlements;
mod health;
pub mod local_auth;
pub mod logging;
pub mod remote_auth;
pub mod session_store;

pub use auth_mode::{AuthDiagnostics, AuthModeSelector, AuthModeState, ModeSource, ProviderDiagnostics};
pub use billing::BillingService;
pub use entitlements::EntitlementService;
pub use health::HealthService;
pub use local_auth::LocalSessionManager;
pub use logging::{ContextCount, EntryPoint, EventCount, LogEntry, LogEvent, LogFilter, LoggingService};
pub use remote_auth::{RemoteSession, RemoteSessionManager};
pub use session_store::SessionStore;
