//! In-memory invoice store for local development and tests.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::billing::{Invoice, InvoiceStore, PaymentRecord, Result, StoreError};
use crate::config::MemoryBillingConfig;

/// In-memory [`InvoiceStore`] backend.
///
/// Holds invoices and recorded payments in process memory. Enforces the
/// same transaction-id uniqueness contract as a real billing backend, which
/// makes it suitable for exercising webhook idempotency in tests.
#[derive(Debug, Default)]
pub struct MemoryInvoiceStore {
    invoices: DashMap<String, Invoice>,
    /// Recorded payments keyed by transaction id.
    payments: DashMap<String, PaymentRecord>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an invoice.
    pub fn insert_invoice(&self, invoice: Invoice) {
        self.invoices.insert(invoice.id.clone(), invoice);
    }

    /// All payments recorded against an invoice, in no particular order.
    pub fn payments_for(&self, invoice_id: &str) -> Vec<PaymentRecord> {
        self.payments
            .iter()
            .filter(|entry| entry.value().invoice_id == invoice_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl From<&MemoryBillingConfig> for MemoryInvoiceStore {
    fn from(config: &MemoryBillingConfig) -> Self {
        let store = Self::new();
        for invoice in &config.invoices {
            store.insert_invoice(invoice.clone());
        }
        store
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn invoice(&self, id: &str) -> Result<Option<Invoice>> {
        Ok(self.invoices.get(id).map(|entry| entry.value().clone()))
    }

    async fn record_payment(&self, payment: &PaymentRecord) -> Result<()> {
        match self.payments.entry(payment.transaction_id.clone()) {
            dashmap::Entry::Occupied(_) => Err(StoreError::DuplicateTransaction {
                transaction_id: payment.transaction_id.clone(),
            }),
            dashmap::Entry::Vacant(entry) => {
                entry.insert(payment.clone());
                Ok(())
            }
        }
    }
}
