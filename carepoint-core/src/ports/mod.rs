//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod billing;
mod remote_auth;
mod session_provider;
mod storage;

pub use billing::BillingProvider;
pub use remote_auth::{RemoteAccount, RemoteAuthProvider};
pub use session_provider::SessionProvider;
pub use storage::StorageBackend;
