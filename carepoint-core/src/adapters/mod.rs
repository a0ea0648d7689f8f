//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - JSON file and in-memory stores for StorageBackend
//! - Firebase REST client for RemoteAuthProvider
//! - Billing HTTP client and an in-process demo for BillingProvider
//! - The compiled-in demo account registry

pub mod billing_demo;
pub mod billing_http;
pub mod demo_accounts;
pub mod file;
pub mod firebase;
pub mod memory;

#[cfg(test)]
pub mod mock_server;
