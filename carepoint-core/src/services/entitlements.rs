//! Entitlement service - plan limits and feature gates for one clinic
//!
//! Every answer is advisory and computed from the last fetched snapshot;
//! nothing here is enforced server-side.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::limits::{APPROACHING_LIMIT_PERCENT, AT_LIMIT_PERCENT};
use crate::domain::result::Result;
use crate::domain::{EntitlementCheck, LimitsSnapshot, TrialStatus, UsageKind};
use crate::ports::BillingProvider;

const LOADING_REASON: &str = "Loading limits...";

pub struct EntitlementService {
    billing: Arc<dyn BillingProvider>,
    clinic_id: String,
    limits: Option<LimitsSnapshot>,
    error: Option<String>,
}

impl EntitlementService {
    pub fn new(billing: Arc<dyn BillingProvider>, clinic_id: impl Into<String>) -> Self {
        Self {
            billing,
            clinic_id: clinic_id.into(),
            limits: None,
            error: None,
        }
    }

    pub fn clinic_id(&self) -> &str {
        &self.clinic_id
    }

    pub fn limits(&self) -> Option<&LimitsSnapshot> {
        self.limits.as_ref()
    }

    /// Message of the last failed load
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fetch the snapshot, replacing the previous one wholesale.
    ///
    /// On failure the error is recorded and `limits` is left empty; there is
    /// no retry.
    pub fn load_limits(&mut self) -> Result<&LimitsSnapshot> {
        match self.billing.check_limits(&self.clinic_id) {
            Ok(snapshot) => {
                self.error = None;
                Ok(self.limits.insert(snapshot))
            }
            Err(e) => {
                self.limits = None;
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Use an already fetched snapshot
    pub fn set_limits(&mut self, snapshot: LimitsSnapshot) {
        self.limits = Some(snapshot);
        self.error = None;
    }

    pub fn can_add_user(&self) -> EntitlementCheck {
        self.can_add(UsageKind::Users)
    }

    pub fn can_add_patient(&self) -> EntitlementCheck {
        self.can_add(UsageKind::Patients)
    }

    pub fn can_add(&self, kind: UsageKind) -> EntitlementCheck {
        match &self.limits {
            Some(limits) => limits.check_add(kind),
            None => EntitlementCheck::blocked(LOADING_REASON),
        }
    }

    pub fn can_use_feature(&self, feature: &str) -> EntitlementCheck {
        match &self.limits {
            Some(limits) => limits.check_feature(feature),
            None => EntitlementCheck::blocked(LOADING_REASON),
        }
    }

    pub fn trial_status(&self) -> TrialStatus {
        self.trial_status_at(Utc::now())
    }

    pub fn trial_status_at(&self, now: DateTime<Utc>) -> TrialStatus {
        match &self.limits {
            Some(limits) => limits.trial_status_at(now),
            None => TrialStatus {
                is_trial_active: false,
                days_remaining: 0,
                is_expired: false,
            },
        }
    }

    /// Percentage of the plan maximum in use; 0 when unloaded or unlimited
    pub fn usage_percentage(&self, kind: UsageKind) -> f64 {
        self.limits
            .as_ref()
            .map(|l| l.usage_percentage(kind))
            .unwrap_or(0.0)
    }

    pub fn is_approaching_limit(&self, kind: UsageKind) -> bool {
        self.usage_percentage(kind) > APPROACHING_LIMIT_PERCENT
    }

    pub fn is_at_limit(&self, kind: UsageKind) -> bool {
        self.usage_percentage(kind) >= AT_LIMIT_PERCENT
    }
}
