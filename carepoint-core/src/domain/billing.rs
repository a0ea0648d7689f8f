//! Billing collaborator shapes

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::limits::{CurrentUsage, PlanLimits, SubscriptionStatus};

/// Billing interval of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Month,
    Year,
}

/// A purchasable subscription plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub interval: BillingInterval,
    pub limits: PlanLimits,
    #[serde(default)]
    pub features: HashMap<String, bool>,
    #[serde(default)]
    pub popular: bool,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// An issued invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub issued_on: NaiveDate,
}

/// Everything the billing screen shows for one clinic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingDashboard {
    pub clinic_id: String,
    #[serde(default)]
    pub plan: Option<SubscriptionPlan>,
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_billing_date: Option<NaiveDate>,
    pub current_usage: CurrentUsage,
    pub plan_limits: PlanLimits,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
}

/// Hosted checkout session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

/// Result of cancelling a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationResult {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub effective_at: Option<DateTime<Utc>>,
}

/// Hosted page where the payment method can be changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodUpdate {
    pub url: String,
}
