//! Billing API client
//!
//! Talks to the clinic billing service over JSON/HTTP. Every route is scoped
//! by clinic id except the public plan catalogue:
//! - GET  /plans                              -> { plans: [...] }
//! - GET  /clinics/{id}/billing               -> BillingDashboard
//! - GET  /clinics/{id}/limits                -> LimitsSnapshot
//! - POST /clinics/{id}/checkout              -> CheckoutSession
//! - POST /clinics/{id}/subscription/cancel   -> CancellationResult
//! - POST /clinics/{id}/payment-method        -> PaymentMethodUpdate

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::domain::result::{Error, Result};
use crate::domain::{
    BillingDashboard, CancellationResult, CheckoutSession, LimitsSnapshot, PaymentMethodUpdate,
    SubscriptionPlan,
};
use crate::ports::BillingProvider;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct PlansResponse {
    plans: Vec<SubscriptionPlan>,
}

/// Billing API client
#[derive(Debug)]
pub struct HttpBillingClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBillingClient {
    /// Client for `base_url`; the API key, when present, is sent as a bearer token
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid billing URL {}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Billing URL must be http or https: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn clinic_url(&self, clinic_id: &str, path: &str) -> Result<String> {
        if clinic_id.trim().is_empty() {
            return Err(Error::validation("Clinic id cannot be empty"));
        }
        Ok(format!("{}/clinics/{}/{}", self.base_url, clinic_id, path))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let response = self
            .authorized(self.client.get(url))
            .send()
            .map_err(map_request_error)?;
        parse_json(check_response_status(response)?, what)
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: serde_json::Value,
        what: &str,
    ) -> Result<T> {
        let response = self
            .authorized(self.client.post(url).json(&body))
            .send()
            .map_err(map_request_error)?;
        parse_json(check_response_status(response)?, what)
    }
}

impl BillingProvider for HttpBillingClient {
    fn name(&self) -> &str {
        "http"
    }

    fn get_billing_dashboard(&self, clinic_id: &str) -> Result<BillingDashboard> {
        let url = self.clinic_url(clinic_id, "billing")?;
        self.get_json(&url, "billing dashboard")
    }

    fn get_subscription_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        let url = format!("{}/plans", self.base_url);
        let response: PlansResponse = self.get_json(&url, "plans")?;
        Ok(response.plans)
    }

    fn check_limits(&self, clinic_id: &str) -> Result<LimitsSnapshot> {
        let url = self.clinic_url(clinic_id, "limits")?;
        self.get_json(&url, "limits")
    }

    fn create_checkout_session(&self, plan_id: &str, clinic_id: &str) -> Result<CheckoutSession> {
        let url = self.clinic_url(clinic_id, "checkout")?;
        self.post_json(&url, json!({ "planId": plan_id }), "checkout session")
    }

    fn cancel_subscription(&self, clinic_id: &str) -> Result<CancellationResult> {
        let url = self.clinic_url(clinic_id, "subscription/cancel")?;
        self.post_json(&url, json!({}), "cancellation")
    }

    fn update_payment_method(&self, clinic_id: &str) -> Result<PaymentMethodUpdate> {
        let url = self.clinic_url(clinic_id, "payment-method")?;
        self.post_json(&url, json!({}), "payment method update")
    }
}

fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    response
        .json()
        .map_err(|e| Error::billing(format!("Failed to parse billing {} response: {}", what, e)))
}

fn map_request_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::billing(format!(
            "Connection timed out after {} seconds",
            REQUEST_TIMEOUT_SECS
        ))
    } else if error.is_connect() {
        Error::billing("Unable to connect to the billing service")
    } else {
        Error::billing(format!("Billing request failed: {}", error))
    }
}

fn check_response_status(response: Response) -> Result<Response> {
    match response.status().as_u16() {
        200..=299 => Ok(response),
        401 => Err(Error::billing(
            "Billing authentication failed. The API key may be invalid or revoked.",
        )),
        402 => Err(Error::billing(
            "Payment required. Please update the clinic's payment method.",
        )),
        403 => Err(Error::billing(
            "Billing access denied for this clinic.",
        )),
        404 => Err(Error::billing("Billing resource not found.")),
        429 => Err(Error::billing(
            "Billing rate limit exceeded. Please wait a moment and try again.",
        )),
        status => Err(Error::billing(format!("Billing API error: HTTP {}", status))),
    }
}
