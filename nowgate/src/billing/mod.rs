//! Host billing system collaborator interface.
//!
//! This module defines the [`InvoiceStore`] trait which abstracts the host
//! billing system the gateway settles payments against. The gateway never
//! owns invoice state: it looks invoices up to resolve their currency and
//! records completed payments against them, nothing more.
//!
//! Duplicate-payment detection lives behind this boundary. Recording the
//! same transaction id twice yields [`StoreError::DuplicateTransaction`],
//! which callers treat as a successful no-op so redelivered webhooks stay
//! idempotent.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::BillingConfig;

pub mod http;
pub mod memory;

/// Create an invoice store from configuration.
///
/// This is the single point where we convert config into store instances.
/// Adding a new backend requires adding a match arm here.
pub fn create_store(config: &BillingConfig) -> anyhow::Result<Arc<dyn InvoiceStore>> {
    match config {
        BillingConfig::Http(http_config) => Ok(Arc::new(http::HttpInvoiceStore::new(http_config)?)),
        BillingConfig::Memory(memory_config) => Ok(Arc::new(memory::MemoryInvoiceStore::from(memory_config))),
    }
}

/// Result type for billing store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur talking to the host billing system
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transaction {transaction_id} already recorded")]
    DuplicateTransaction { transaction_id: String },

    #[error("billing API error: {0}")]
    Api(String),
}

/// An invoice as known to the host billing system.
///
/// Only the fields this gateway needs: the identifier used as the payment
/// `order_id` and the currency the invoice is priced in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    /// Currency the invoice is priced in; falls back to the configured
    /// gateway currency when absent.
    #[serde(default)]
    pub currency_code: Option<String>,
}

/// A payment recorded against an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub invoice_id: String,
    /// Gateway name tag, e.g. "NowPayments"
    pub gateway: String,
    pub amount: Decimal,
    pub transaction_id: String,
}

/// Abstract interface to the host billing system.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Look up an invoice by identifier. Returns `None` if it doesn't exist.
    async fn invoice(&self, id: &str) -> Result<Option<Invoice>>;

    /// Record a completed payment against an invoice.
    ///
    /// Must reject duplicate transaction ids with
    /// [`StoreError::DuplicateTransaction`] so webhook redelivery never
    /// produces two distinct payments.
    async fn record_payment(&self, payment: &PaymentRecord) -> Result<()>;
}
