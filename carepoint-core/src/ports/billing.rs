//! Billing collaborator port

use crate::domain::result::Result;
use crate::domain::{
    BillingDashboard, CancellationResult, CheckoutSession, LimitsSnapshot, PaymentMethodUpdate,
    SubscriptionPlan,
};

/// Billing collaborator scoped by clinic id
pub trait BillingProvider: Send + Sync {
    /// Provider name (e.g., "http", "demo")
    fn name(&self) -> &str;

    fn get_billing_dashboard(&self, clinic_id: &str) -> Result<BillingDashboard>;

    fn get_subscription_plans(&self) -> Result<Vec<SubscriptionPlan>>;

    fn check_limits(&self, clinic_id: &str) -> Result<LimitsSnapshot>;

    fn create_checkout_session(&self, plan_id: &str, clinic_id: &str) -> Result<CheckoutSession>;

    fn cancel_subscription(&self, clinic_id: &str) -> Result<CancellationResult>;

    fn update_payment_method(&self, clinic_id: &str) -> Result<PaymentMethodUpdate>;
}
