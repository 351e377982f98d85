//! Thin client for the NOWPayments REST API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::GatewayConfig;
use crate::gateway::{PaymentError, Result};

/// Production API root.
pub const PRODUCTION_API_URL: &str = "https://api.nowpayments.io/v1";
/// Sandbox API root with isolated state, selected via `gateway.sandbox_mode`.
pub const SANDBOX_API_URL: &str = "https://api-sandbox.nowpayments.io/v1";

/// NOWPayments API client.
///
/// Holds a reqwest client with the configured request timeout and attaches
/// the `x-api-key` header to every call.
#[derive(Debug, Clone)]
pub struct NowPaymentsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Request body for `POST /invoice`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateInvoiceRequest {
    /// Invoice total in the pricing (fiat) currency. Serialized as a
    /// 2-decimal string, which is what the API expects.
    pub price_amount: Decimal,
    pub price_currency: String,
    pub order_id: String,
    pub order_description: String,
    pub ipn_callback_url: String,
    pub success_url: String,
    pub cancel_url: String,
    pub is_fixed_rate: bool,
    pub is_fee_paid_by_user: bool,
}

/// The fields we use from a successful `POST /invoice` response.
#[derive(Debug, Clone)]
pub struct CreatedInvoice {
    /// External payment/invoice id.
    pub id: String,
    /// Hosted checkout page the customer is redirected to.
    pub invoice_url: Url,
}

/// Response from `GET /min-amount`.
#[derive(Debug, Clone, Deserialize)]
pub struct MinAmount {
    #[serde(default)]
    pub min_amount: Option<Decimal>,
}

impl NowPaymentsClient {
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        let base_url = match &config.api_url {
            Some(url) => url.as_str().trim_end_matches('/').to_string(),
            None if config.sandbox_mode => SANDBOX_API_URL.to_string(),
            None => PRODUCTION_API_URL.to_string(),
        };

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Query the minimum payable amount for a currency pair.
    ///
    /// Used as a sanity precondition before creating a payment: a non-2xx
    /// response means the API (or the merchant account) is not in a state
    /// where payments can be created.
    pub async fn min_amount(&self, currency_from: &str) -> Result<MinAmount> {
        let response = self
            .http
            .get(format!("{}/min-amount", self.base_url))
            .header("x-api-key", &self.api_key)
            .query(&[("currency_from", currency_from.to_lowercase().as_str()), ("currency_to", "btc")])
            .send()
            .await
            .map_err(|e| PaymentError::ProviderApi(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::error!(%status, response = body.as_str(), "NOWPayments min-amount check failed");
            return Err(PaymentError::ProviderApi(format!("min-amount returned HTTP {status}")));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, response = body.as_str(), "NOWPayments min-amount response was not valid JSON");
            PaymentError::ProviderApi("min-amount response was not valid JSON".to_string())
        })
    }

    /// Create a hosted payment invoice.
    ///
    /// On any HTTP failure or a response missing `invoice_url`, the full
    /// response body, status and request payload are logged and an error is
    /// returned — the caller surfaces only "payment cannot be initiated".
    pub async fn create_invoice(&self, request: &CreateInvoiceRequest) -> Result<CreatedInvoice> {
        let response = self
            .http
            .post(format!("{}/invoice", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| PaymentError::ProviderApi(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::error!(%status, response = body.as_str(), payload = ?request, "NOWPayments invoice creation failed");
            return Err(PaymentError::ProviderApi(format!("invoice creation returned HTTP {status}")));
        }

        let parsed: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, response = body.as_str(), "NOWPayments invoice response was not valid JSON");
            PaymentError::ProviderApi("invoice response was not valid JSON".to_string())
        })?;

        let invoice_url = parsed
            .get("invoice_url")
            .and_then(|v| v.as_str())
            .and_then(|s| Url::parse(s).ok())
            .ok_or_else(|| {
                tracing::error!(%status, response = body.as_str(), payload = ?request, "NOWPayments invoice response missing invoice_url");
                PaymentError::ProviderApi("invoice response missing invoice_url".to_string())
            })?;

        // The id comes back as a number or a string depending on endpoint version
        let id = match parsed.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                tracing::error!(%status, response = body.as_str(), payload = ?request, "NOWPayments invoice response missing id");
                return Err(PaymentError::ProviderApi("invoice response missing id".to_string()));
            }
        };

        Ok(CreatedInvoice { id, invoice_url })
    }
}
