//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

pub mod billing;
pub mod health;
pub mod limits;
pub mod result;
mod role;
mod session;
mod user;

pub use billing::{
    BillingDashboard, BillingInterval, CancellationResult, CheckoutSession, Invoice,
    PaymentMethodUpdate, SubscriptionPlan,
};
pub use health::{CheckResult, CheckStatus, ServerHealth};
pub use limits::{
    CurrentUsage, EntitlementCheck, LimitsSnapshot, PlanLimits, SubscriptionStatus, TrialStatus,
    UsageKind,
};
pub use role::Role;
pub use session::{local_token, AuthType, SessionRecord, LEGACY_REMOTE_TAG};
pub use user::{ProfileUpdate, SignUpRequest, User};
