//! IPN status reconciliation: translate a verified webhook notification
//! into an invoice-state update, or a log line for statuses we don't act on.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::billing::{InvoiceStore, PaymentRecord, StoreError};
use crate::errors::Error;
use crate::gateway::GATEWAY_NAME;
use crate::gateway::status::PaymentStatus;

/// A parsed IPN notification.
///
/// Inbound and untrusted: every field is optional and type-tolerant — ids
/// and statuses may arrive as strings or numbers, amounts that are not
/// numeric are treated as absent. `order_id` and `payment_status` are
/// checked by [`reconcile`]; everything else degrades to a default.
/// Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookNotification {
    #[serde(default, deserialize_with = "string_or_number")]
    pub payment_id: Option<String>,
    /// Maps to the invoice identifier in the billing system.
    #[serde(default, deserialize_with = "string_or_number")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub payment_status: Option<String>,
    /// Amount the customer actually sent, in the pricing currency.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub actually_paid: Option<Decimal>,
    /// Amount the invoice was priced at.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub pay_currency: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub payment_extra_id: Option<String>,
}

/// NOWPayments is inconsistent about whether ids arrive as JSON strings or
/// numbers, so accept both.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}

/// Amounts arrive as JSON numbers or numeric strings; anything else is
/// treated as absent rather than failing the whole notification.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl WebhookNotification {
    /// Transaction identifier recorded in the billing system.
    ///
    /// Upstream format: `{payment_id}_{payment_extra_id}`, with a trailing
    /// underscore when the extra id is absent. Preserved as-is so ids stay
    /// comparable with payments recorded by earlier deployments.
    pub fn transaction_id(&self) -> String {
        format!(
            "{}_{}",
            self.payment_id.as_deref().unwrap_or_default(),
            self.payment_extra_id.as_deref().unwrap_or_default()
        )
    }
}

/// Dispatch a verified notification against the billing system.
///
/// Caller guarantees the payload parsed and the signature checked out; this
/// function enforces the required-field rule and the status dispatch table.
/// Per the processor's delivery contract the response is 200 for every
/// status once the required fields are present, so store failures on the
/// record call are logged rather than surfaced — the processor's own
/// redelivery plus the duplicate-transaction guard make that safe.
pub async fn reconcile(store: &dyn InvoiceStore, notification: &WebhookNotification, payload: &serde_json::Value) -> Result<(), Error> {
    let (Some(invoice_id), Some(raw_status)) = (notification.order_id.as_deref(), notification.payment_status.as_deref()) else {
        tracing::warn!(%payload, "Missing required fields in NOWPayments webhook");
        return Err(Error::MissingRequiredFields);
    };

    let payment_id = notification.payment_id.as_deref().unwrap_or_default();
    let status = PaymentStatus::parse(raw_status);

    match &status {
        PaymentStatus::Finished | PaymentStatus::Confirmed => {
            let record = PaymentRecord {
                invoice_id: invoice_id.to_string(),
                gateway: GATEWAY_NAME.to_string(),
                amount: notification.price_amount.unwrap_or(Decimal::ZERO),
                transaction_id: notification.transaction_id(),
            };

            match store.record_payment(&record).await {
                Ok(()) => {
                    tracing::info!(
                        invoice_id,
                        payment_id,
                        amount = %record.amount,
                        currency = notification.pay_currency.as_deref().unwrap_or_default(),
                        "NOWPayments payment completed"
                    );
                }
                Err(StoreError::DuplicateTransaction { transaction_id }) => {
                    tracing::debug!(invoice_id, transaction_id = %transaction_id, "Payment already recorded, skipping (idempotent redelivery)");
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        invoice_id,
                        payment_id,
                        "Failed to record completed payment against invoice"
                    );
                }
            }
        }
        PaymentStatus::PartiallyPaid => {
            tracing::warn!(
                invoice_id,
                payment_id,
                expected = %notification.price_amount.unwrap_or(Decimal::ZERO),
                received = %notification.actually_paid.unwrap_or(Decimal::ZERO),
                "NOWPayments partial payment received"
            );
        }
        PaymentStatus::Expired | PaymentStatus::Failed | PaymentStatus::Refunded => {
            tracing::warn!(invoice_id, payment_id, %status, "NOWPayments payment failed");
        }
        PaymentStatus::Waiting | PaymentStatus::Confirming | PaymentStatus::Sending => {
            tracing::info!(invoice_id, payment_id, %status, "NOWPayments payment processing");
        }
        PaymentStatus::Unknown(raw) => {
            tracing::warn!(status = raw.as_str(), %payload, "Unknown NOWPayments payment status");
        }
    }

    Ok(())
}
