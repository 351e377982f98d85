//! HTTP invoice store backed by the host billing system's REST API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use url::Url;

use crate::billing::{Invoice, InvoiceStore, PaymentRecord, Result, StoreError};
use crate::config::HttpBillingConfig;

/// [`InvoiceStore`] backend that talks to the billing system over HTTPS.
///
/// Expects the billing API to expose:
/// - `GET {base}/api/invoices/{id}` returning the invoice, 404 if unknown
/// - `POST {base}/api/invoices/{id}/payments` recording a payment,
///   409 if the transaction id was already recorded
pub struct HttpInvoiceStore {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct RecordPaymentRequest<'a> {
    gateway: &'a str,
    amount: rust_decimal::Decimal,
    transaction_id: &'a str,
}

impl HttpInvoiceStore {
    pub fn new(config: &HttpBillingConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

#[async_trait]
impl InvoiceStore for HttpInvoiceStore {
    async fn invoice(&self, id: &str) -> Result<Option<Invoice>> {
        let response = self
            .http
            .get(self.endpoint(&format!("api/invoices/{id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| StoreError::Api(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let invoice = response.json::<Invoice>().await.map_err(|e| StoreError::Api(e.to_string()))?;
                Ok(Some(invoice))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(%status, body = body.as_str(), invoice_id = id, "Billing invoice lookup failed");
                Err(StoreError::Api(format!("invoice lookup returned HTTP {status}")))
            }
        }
    }

    async fn record_payment(&self, payment: &PaymentRecord) -> Result<()> {
        let request = RecordPaymentRequest {
            gateway: &payment.gateway,
            amount: payment.amount,
            transaction_id: &payment.transaction_id,
        };

        let response = self
            .http
            .post(self.endpoint(&format!("api/invoices/{}/payments", payment.invoice_id)))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| StoreError::Api(e.to_string()))?;

        match response.status() {
            // The billing system enforces transaction-id uniqueness
            StatusCode::CONFLICT => Err(StoreError::DuplicateTransaction {
                transaction_id: payment.transaction_id.clone(),
            }),
            status if status.is_success() => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(
                    %status,
                    body = body.as_str(),
                    invoice_id = %payment.invoice_id,
                    transaction_id = %payment.transaction_id,
                    "Billing payment record failed"
                );
                Err(StoreError::Api(format!("payment record returned HTTP {status}")))
            }
        }
    }
}
