//! Demo billing provider
//!
//! In-process stand-in for the billing service so the app works without one:
//! - three plans (Basic, Professional, Enterprise with no limits)
//! - every clinic starts on a 14-day trial with the Basic limits
//! - checkout activates the plan immediately, cancel ends access

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::limits::UNLIMITED;
use crate::domain::result::{Error, Result};
use crate::domain::{
    BillingDashboard, BillingInterval, CancellationResult, CheckoutSession, CurrentUsage,
    LimitsSnapshot, PaymentMethodUpdate, PlanLimits, SubscriptionPlan, SubscriptionStatus,
};
use crate::ports::BillingProvider;

pub const DEMO_TRIAL_DAYS: i64 = 14;

const TRIAL_PLAN_ID: &str = "basic";

/// Generate the demo plan catalogue
pub fn demo_plans() -> Vec<SubscriptionPlan> {
    let features = |on: &[&str]| -> HashMap<String, bool> {
        ["reports", "telemedicine", "lab_integration", "api_access"]
            .iter()
            .map(|f| (f.to_string(), on.contains(f)))
            .collect()
    };

    vec![
        SubscriptionPlan {
            id: "basic".to_string(),
            name: "Basic".to_string(),
            description: Some("Small practices getting started".to_string()),
            price: Decimal::new(4900, 2), // $49.00
            currency: "USD".to_string(),
            interval: BillingInterval::Month,
            limits: PlanLimits {
                max_users: 10,
                max_patients: 500,
            },
            features: features(&["lab_integration"]),
            popular: false,
        },
        SubscriptionPlan {
            id: "professional".to_string(),
            name: "Professional".to_string(),
            description: Some("Growing clinics with several departments".to_string()),
            price: Decimal::new(14900, 2), // $149.00
            currency: "USD".to_string(),
            interval: BillingInterval::Month,
            limits: PlanLimits {
                max_users: 50,
                max_patients: 5000,
            },
            features: features(&["reports", "telemedicine", "lab_integration"]),
            popular: true,
        },
        SubscriptionPlan {
            id: "enterprise".to_string(),
            name: "Enterprise".to_string(),
            description: Some("Hospitals and multi-site groups".to_string()),
            price: Decimal::new(49900, 2), // $499.00
            currency: "USD".to_string(),
            interval: BillingInterval::Month,
            limits: PlanLimits {
                max_users: UNLIMITED,
                max_patients: UNLIMITED,
            },
            features: features(&["reports", "telemedicine", "lab_integration", "api_access"]),
            popular: false,
        },
    ]
}

#[derive(Debug, Clone)]
struct ClinicAccount {
    plan_id: String,
    status: SubscriptionStatus,
    trial_ends_at: Option<DateTime<Utc>>,
    activated_at: Option<DateTime<Utc>>,
    usage: CurrentUsage,
}

impl ClinicAccount {
    fn trial(now: DateTime<Utc>) -> Self {
        Self {
            plan_id: TRIAL_PLAN_ID.to_string(),
            status: SubscriptionStatus::Trial,
            trial_ends_at: Some(now + Duration::days(DEMO_TRIAL_DAYS)),
            activated_at: None,
            usage: CurrentUsage {
                users: 3,
                patients: 25,
            },
        }
    }

    fn has_access(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SubscriptionStatus::Active => true,
            SubscriptionStatus::Trial => self.trial_ends_at.map(|t| t > now).unwrap_or(false),
            _ => false,
        }
    }
}

/// Demo billing provider holding per-clinic state in memory
pub struct DemoBillingProvider {
    plans: Vec<SubscriptionPlan>,
    clinics: Mutex<HashMap<String, ClinicAccount>>,
}

impl DemoBillingProvider {
    pub fn new() -> Self {
        Self {
            plans: demo_plans(),
            clinics: Mutex::new(HashMap::new()),
        }
    }

    fn plan(&self, plan_id: &str) -> Result<&SubscriptionPlan> {
        self.plans
            .iter()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| Error::billing(format!("Unknown plan: {}", plan_id)))
    }

    /// Run `f` against the clinic's account, creating a trial on first sight
    fn with_clinic<T>(
        &self,
        clinic_id: &str,
        f: impl FnOnce(&mut ClinicAccount) -> Result<T>,
    ) -> Result<T> {
        if clinic_id.trim().is_empty() {
            return Err(Error::validation("Clinic id cannot be empty"));
        }
        let mut clinics = self
            .clinics
            .lock()
            .map_err(|_| Error::billing("Demo billing state is unavailable"))?;
        let account = clinics
            .entry(clinic_id.to_string())
            .or_insert_with(|| ClinicAccount::trial(Utc::now()));
        f(account)
    }

    /// Overwrite a clinic's usage counters
    pub fn set_usage(&self, clinic_id: &str, usage: CurrentUsage) -> Result<()> {
        self.with_clinic(clinic_id, |account| {
            account.usage = usage;
            Ok(())
        })
    }

    /// Move a clinic's trial end, e.g. into the past
    pub fn set_trial_end(&self, clinic_id: &str, ends_at: DateTime<Utc>) -> Result<()> {
        self.with_clinic(clinic_id, |account| {
            account.trial_ends_at = Some(ends_at);
            Ok(())
        })
    }
}

impl Default for DemoBillingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl BillingProvider for DemoBillingProvider {
    fn name(&self) -> &str {
        "demo"
    }

    fn get_billing_dashboard(&self, clinic_id: &str) -> Result<BillingDashboard> {
        let account = self.with_clinic(clinic_id, |a| Ok(a.clone()))?;
        let plan = self.plan(&account.plan_id)?.clone();
        let next_billing_date = account
            .activated_at
            .filter(|_| account.status == SubscriptionStatus::Active)
            .and_then(|t| t.checked_add_months(Months::new(1)))
            .map(|t| t.date_naive());

        Ok(BillingDashboard {
            clinic_id: clinic_id.to_string(),
            plan_limits: plan.limits,
            plan: Some(plan),
            subscription_status: account.status,
            trial_ends_at: account.trial_ends_at,
            next_billing_date,
            current_usage: account.usage,
            invoices: Vec::new(),
        })
    }

    fn get_subscription_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        Ok(self.plans.clone())
    }

    fn check_limits(&self, clinic_id: &str) -> Result<LimitsSnapshot> {
        let now = Utc::now();
        let account = self.with_clinic(clinic_id, |a| Ok(a.clone()))?;
        let plan = self.plan(&account.plan_id)?;
        let has_access = account.has_access(now);
        let room = |current: i64, max: i64| max == UNLIMITED || current < max;

        Ok(LimitsSnapshot {
            has_access,
            can_add_users: has_access && room(account.usage.users, plan.limits.max_users),
            can_add_patients: has_access
                && room(account.usage.patients, plan.limits.max_patients),
            subscription_status: account.status,
            trial_ends_at: account.trial_ends_at,
            current_usage: account.usage,
            plan_limits: plan.limits,
            features: plan.features.clone(),
        })
    }

    fn create_checkout_session(&self, plan_id: &str, clinic_id: &str) -> Result<CheckoutSession> {
        let plan_id = self.plan(plan_id)?.id.clone();
        let session_id = format!("cs_demo_{}", Uuid::new_v4().simple());
        self.with_clinic(clinic_id, |account| {
            account.plan_id = plan_id.clone();
            account.status = SubscriptionStatus::Active;
            account.activated_at = Some(Utc::now());
            Ok(())
        })?;

        Ok(CheckoutSession {
            url: format!(
                "https://checkout.demo.carepoint.local/{}?session={}",
                plan_id, session_id
            ),
            session_id,
        })
    }

    fn cancel_subscription(&self, clinic_id: &str) -> Result<CancellationResult> {
        self.with_clinic(clinic_id, |account| {
            if account.status == SubscriptionStatus::Canceled {
                return Ok(CancellationResult {
                    success: false,
                    message: Some("Subscription is already canceled".to_string()),
                    effective_at: None,
                });
            }
            account.status = SubscriptionStatus::Canceled;
            Ok(CancellationResult {
                success: true,
                message: Some("Subscription canceled".to_string()),
                effective_at: Some(Utc::now()),
            })
        })
    }

    fn update_payment_method(&self, clinic_id: &str) -> Result<PaymentMethodUpdate> {
        self.with_clinic(clinic_id, |_| Ok(()))?;
        Ok(PaymentMethodUpdate {
            url: format!("https://billing.demo.carepoint.local/{}/payment-method", clinic_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clinic_starts_on_trial() {
        let provider = DemoBillingProvider::new();
        let limits = provider.check_limits("clinic-1").unwrap();

        assert_eq!(limits.subscription_status, SubscriptionStatus::Trial);
        assert!(limits.has_access);
        assert!(limits.can_add_users);
        assert_eq!(limits.plan_limits.max_users, 10);
        assert!(limits.trial_ends_at.is_some());
    }

    #[test]
    fn test_expired_trial_loses_access() {
        let provider = DemoBillingProvider::new();
        provider
            .set_trial_end("clinic-1", Utc::now() - Duration::days(1))
            .unwrap();

        let limits = provider.check_limits("clinic-1").unwrap();
        assert!(!limits.has_access);
        assert!(!limits.can_add_patients);
    }

    #[test]
    fn test_full_counter_clears_flag() {
        let provider = DemoBillingProvider::new();
        provider
            .set_usage("clinic-1", CurrentUsage { users: 10, patients: 0 })
            .unwrap();

        let limits = provider.check_limits("clinic-1").unwrap();
        assert!(!limits.can_add_users);
        assert!(limits.can_add_patients);
    }

    #[test]
    fn test_checkout_activates_and_cancel_ends_access() {
        let provider = DemoBillingProvider::new();
        provider.create_checkout_session("enterprise", "clinic-1").unwrap();

        let limits = provider.check_limits("clinic-1").unwrap();
        assert_eq!(limits.subscription_status, SubscriptionStatus::Active);
        assert_eq!(limits.plan_limits.max_users, UNLIMITED);

        let dashboard = provider.get_billing_dashboard("clinic-1").unwrap();
        assert!(dashboard.next_billing_date.is_some());

        assert!(provider.cancel_subscription("clinic-1").unwrap().success);
        assert!(!provider.cancel_subscription("clinic-1").unwrap().success);
        assert!(!provider.check_limits("clinic-1").unwrap().has_access);
    }

    #[test]
    fn test_unknown_plan_and_empty_clinic() {
        let provider = DemoBillingProvider::new();
        assert!(matches!(
            provider.create_checkout_session("platinum", "clinic-1"),
            Err(Error::Billing(_))
        ));
        assert!(matches!(provider.check_limits(""), Err(Error::Validation(_))));
    }

    #[test]
    fn test_clinics_are_isolated() {
        let provider = DemoBillingProvider::new();
        provider.cancel_subscription("clinic-a").unwrap();
        assert!(provider.check_limits("clinic-b").unwrap().has_access);
    }
}
