//! Payment initiation: create (or reuse) a hosted checkout session for an
//! invoice.

use rust_decimal::Decimal;
use url::Url;

use crate::billing::Invoice;
use crate::config::Config;
use crate::gateway::nowpayments::{CreateInvoiceRequest, NowPaymentsClient};
use crate::gateway::{PaymentError, Result};
use crate::sessions::SessionCache;

/// Creates NOWPayments checkout sessions for invoices.
///
/// Idempotent within the session cache TTL: a second call for the same
/// invoice returns the cached checkout URL without contacting the processor.
/// There is no retry logic — a failed attempt surfaces immediately and the
/// caller is expected to re-invoke later, which the cache check keeps cheap.
pub struct PaymentInitiator {
    client: NowPaymentsClient,
    sessions: SessionCache,
    default_currency: String,
    ipn_callback_url: String,
    invoice_page_url: Url,
}

impl PaymentInitiator {
    pub fn new(client: NowPaymentsClient, sessions: SessionCache, config: &Config) -> Self {
        let ipn_callback_url = format!(
            "{}/extensions/gateways/nowpayments/webhook",
            config.public_url.as_str().trim_end_matches('/')
        );

        Self {
            client,
            sessions,
            default_currency: config.gateway.currency.clone(),
            ipn_callback_url,
            invoice_page_url: config.invoice_page_url.clone(),
        }
    }

    /// Create a payment session for an invoice and return the hosted
    /// checkout URL the customer should be redirected to.
    ///
    /// `amount` must already be validated as positive by the caller.
    pub async fn create_payment(&self, invoice: &Invoice, amount: Decimal) -> Result<Url> {
        if let Some(cached) = self.sessions.checkout_url(&invoice.id).await {
            tracing::debug!(invoice_id = %invoice.id, "Reusing cached NOWPayments checkout session");
            return Url::parse(&cached).map_err(|e| PaymentError::InvalidData(format!("cached checkout URL is invalid: {e}")));
        }

        let currency = invoice.currency_code.clone().unwrap_or_else(|| self.default_currency.clone());

        // Sanity precondition: if the min-amount endpoint is unreachable or
        // rejects us, payment creation would fail anyway.
        self.client.min_amount(&currency).await?;

        let invoice_page = format!(
            "{}/{}",
            self.invoice_page_url.as_str().trim_end_matches('/'),
            invoice.id
        );

        let request = CreateInvoiceRequest {
            price_amount: amount.round_dp(2),
            price_currency: currency.to_lowercase(),
            order_id: invoice.id.clone(),
            order_description: format!("Invoice #{}", invoice.id),
            ipn_callback_url: self.ipn_callback_url.clone(),
            success_url: invoice_page.clone(),
            cancel_url: invoice_page,
            is_fixed_rate: false,
            is_fee_paid_by_user: false,
        };

        let created = self.client.create_invoice(&request).await?;

        self.sessions.store_checkout_url(&invoice.id, created.invoice_url.as_str()).await;
        self.sessions.store_payment_id(&invoice.id, &created.id).await;

        tracing::info!(
            invoice_id = %invoice.id,
            payment_id = %created.id,
            checkout_url = %created.invoice_url,
            "Created NOWPayments checkout session"
        );

        Ok(created.invoice_url)
    }
}
