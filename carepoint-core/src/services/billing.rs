//! Billing service - plans, checkout and subscription management

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{
    BillingDashboard, CancellationResult, CheckoutSession, PaymentMethodUpdate, SubscriptionPlan,
};
use crate::ports::{BillingProvider, StorageBackend};

use super::session_store::keys;

pub struct BillingService {
    billing: Arc<dyn BillingProvider>,
    backend: Arc<dyn StorageBackend>,
    clinic_id: String,
}

impl BillingService {
    pub fn new(
        billing: Arc<dyn BillingProvider>,
        backend: Arc<dyn StorageBackend>,
        clinic_id: impl Into<String>,
    ) -> Self {
        Self {
            billing,
            backend,
            clinic_id: clinic_id.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.billing.name()
    }

    pub fn plans(&self) -> Result<Vec<SubscriptionPlan>> {
        self.billing.get_subscription_plans()
    }

    pub fn dashboard(&self) -> Result<BillingDashboard> {
        self.billing.get_billing_dashboard(&self.clinic_id)
    }

    /// Remember the plan picked on the pricing screen
    pub fn select_plan(&self, plan_id: &str) -> Result<SubscriptionPlan> {
        let plan = self
            .plans()?
            .into_iter()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| Error::validation(format!("Unknown plan: {}", plan_id)))?;
        self.backend.set(keys::SELECTED_PLAN, &plan.id)?;
        Ok(plan)
    }

    pub fn selected_plan(&self) -> Result<Option<String>> {
        self.backend.get(keys::SELECTED_PLAN)
    }

    /// Start checkout for `plan_id`, or for the remembered plan when `None`
    pub fn checkout(&self, plan_id: Option<&str>) -> Result<CheckoutSession> {
        let plan_id = match plan_id {
            Some(id) => self.select_plan(id)?.id,
            None => self
                .selected_plan()?
                .ok_or_else(|| Error::validation("No plan selected"))?,
        };
        self.billing.create_checkout_session(&plan_id, &self.clinic_id)
    }

    pub fn cancel_subscription(&self) -> Result<CancellationResult> {
        self.billing.cancel_subscription(&self.clinic_id)
    }

    pub fn update_payment_method(&self) -> Result<PaymentMethodUpdate> {
        self.billing.update_payment_method(&self.clinic_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::billing_demo::DemoBillingProvider;
    use crate::adapters::memory::MemoryStorage;

    fn service() -> (BillingService, Arc<MemoryStorage>) {
        let backend = Arc::new(MemoryStorage::new());
        let service = BillingService::new(
            Arc::new(DemoBillingProvider::new()),
            backend.clone(),
            "clinic-1",
        );
        (service, backend)
    }

    #[test]
    fn test_select_plan_persists_choice() {
        let (service, backend) = service();
        service.select_plan("professional").unwrap();
        assert_eq!(
            backend.get(keys::SELECTED_PLAN).unwrap().as_deref(),
            Some("professional")
        );
        assert!(service.select_plan("platinum").is_err());
    }

    #[test]
    fn test_checkout_uses_remembered_plan() {
        let (service, _) = service();
        assert!(matches!(service.checkout(None), Err(Error::Validation(_))));

        service.select_plan("basic").unwrap();
        let session = service.checkout(None).unwrap();
        assert!(session.url.contains("basic"));
    }
}
