//! Plan usage/limits snapshot and entitlement results

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Plan maximum meaning "no limit"
pub const UNLIMITED: i64 = -1;

/// Usage percentage above which a counter is "approaching" its limit
pub const APPROACHING_LIMIT_PERCENT: f64 = 80.0;

/// Usage percentage at which a counter is "at" its limit
pub const AT_LIMIT_PERCENT: f64 = 100.0;

/// Subscription lifecycle tag reported by the billing collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    PastDue,
    Canceled,
    Expired,
    Inactive,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Unknown => "unknown",
        }
    }
}

/// Current usage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUsage {
    pub users: i64,
    pub patients: i64,
}

/// Plan maximums; `-1` means unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_users: i64,
    pub max_patients: i64,
}

/// Point-in-time read of a clinic's plan, usage counters and feature flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsSnapshot {
    pub has_access: bool,
    pub can_add_users: bool,
    pub can_add_patients: bool,
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub current_usage: CurrentUsage,
    pub plan_limits: PlanLimits,
    #[serde(default)]
    pub features: HashMap<String, bool>,
}

/// Counter an entitlement question is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Users,
    Patients,
}

impl UsageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageKind::Users => "users",
            UsageKind::Patients => "patients",
        }
    }

    fn singular(&self) -> &'static str {
        match self {
            UsageKind::Users => "User",
            UsageKind::Patients => "Patient",
        }
    }
}

impl LimitsSnapshot {
    /// (current, max) for a counter
    pub fn counter(&self, kind: UsageKind) -> (i64, i64) {
        match kind {
            UsageKind::Users => (self.current_usage.users, self.plan_limits.max_users),
            UsageKind::Patients => (self.current_usage.patients, self.plan_limits.max_patients),
        }
    }

    /// Server flag for the counter, and room left under a finite maximum
    fn can_add(&self, kind: UsageKind) -> bool {
        let flag = match kind {
            UsageKind::Users => self.can_add_users,
            UsageKind::Patients => self.can_add_patients,
        };
        let (current, max) = self.counter(kind);
        flag && (max == UNLIMITED || current < max)
    }

    /// Blocked-access message, worded by subscription status
    fn access_denied_reason(&self) -> String {
        match self.subscription_status {
            SubscriptionStatus::Trial | SubscriptionStatus::Expired => {
                "Your trial has expired. Please upgrade to continue.".to_string()
            }
            SubscriptionStatus::PastDue => {
                "Your subscription payment is past due. Please update your payment method.".to_string()
            }
            _ => "An active subscription is required. Please choose a plan to continue.".to_string(),
        }
    }

    /// Can one more user or patient be added
    pub fn check_add(&self, kind: UsageKind) -> EntitlementCheck {
        if !self.has_access {
            return EntitlementCheck::upgrade(self.access_denied_reason());
        }
        if !self.can_add(kind) {
            let (current, max) = self.counter(kind);
            return EntitlementCheck::upgrade(format!(
                "{} limit reached ({}/{}). Upgrade your plan to add more {}.",
                kind.singular(),
                current,
                max,
                kind.as_str()
            ));
        }
        EntitlementCheck::allowed()
    }

    /// Is a named feature enabled on the current plan
    pub fn check_feature(&self, feature: &str) -> EntitlementCheck {
        if !self.has_access {
            return EntitlementCheck::upgrade(self.access_denied_reason());
        }
        if self.features.get(feature).copied().unwrap_or(false) {
            EntitlementCheck::allowed()
        } else {
            EntitlementCheck::upgrade(format!(
                "The {} feature requires a plan upgrade.",
                feature
            ))
        }
    }

    /// Usage of a counter as a percentage of its plan maximum, clamped to 100
    pub fn usage_percentage(&self, kind: UsageKind) -> f64 {
        let (current, max) = self.counter(kind);
        usage_percentage(current, max)
    }

    /// Trial state relative to `now`
    pub fn trial_status_at(&self, now: DateTime<Utc>) -> TrialStatus {
        let on_trial = self.subscription_status == SubscriptionStatus::Trial;
        let Some(ends_at) = self.trial_ends_at else {
            return TrialStatus {
                is_trial_active: false,
                days_remaining: 0,
                is_expired: false,
            };
        };

        let days_remaining = days_until(now, ends_at);
        TrialStatus {
            is_trial_active: on_trial && days_remaining > 0,
            days_remaining,
            is_expired: on_trial && days_remaining == 0,
        }
    }
}

/// `current / max * 100`, clamped to 100; the unlimited sentinel yields 0
pub fn usage_percentage(current: i64, max: i64) -> f64 {
    if max == UNLIMITED {
        return 0.0;
    }
    if max <= 0 {
        return if current > 0 { AT_LIMIT_PERCENT } else { 0.0 };
    }
    let pct = current.max(0) as f64 / max as f64 * 100.0;
    pct.min(AT_LIMIT_PERCENT)
}

/// Whole days from `now` until `ends_at`, rounded up, never negative
fn days_until(now: DateTime<Utc>, ends_at: DateTime<Utc>) -> i64 {
    let remaining_ms = (ends_at - now).num_milliseconds();
    if remaining_ms <= 0 {
        return 0;
    }
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    (remaining_ms + DAY_MS - 1) / DAY_MS
}

/// Answer to "may this clinic do X"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementCheck {
    pub can_access: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub upgrade_required: bool,
}

impl EntitlementCheck {
    pub fn allowed() -> Self {
        Self {
            can_access: true,
            reason: None,
            upgrade_required: false,
        }
    }

    /// Blocked without an upgrade prompt (e.g. limits still loading)
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            can_access: false,
            reason: Some(reason.into()),
            upgrade_required: false,
        }
    }

    /// Blocked until the clinic upgrades
    pub fn upgrade(reason: impl Into<String>) -> Self {
        Self {
            can_access: false,
            reason: Some(reason.into()),
            upgrade_required: true,
        }
    }
}

/// Derived trial state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialStatus {
    pub is_trial_active: bool,
    pub days_remaining: i64,
    pub is_expired: bool,
}
