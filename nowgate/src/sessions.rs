//! Short-lived payment session cache.
//!
//! Correlates an invoice id with the hosted checkout URL and external
//! payment id created for it. Nothing here is durable: entries expire on
//! their TTL and a fresh session is simply created when one is missing.
//! Written only by the payment initiator; the webhook path never reads it.

use moka::future::Cache;

use crate::config::SessionCacheConfig;

/// Cache of ephemeral payment sessions, keyed by invoice id.
///
/// Two TTL classes per the processor's lifetimes: hosted checkout URLs stay
/// valid for about an hour, external payment ids for a day. Writes are
/// last-write-wins; no stronger atomicity is assumed of the store.
#[derive(Clone)]
pub struct SessionCache {
    checkout_urls: Cache<String, String>,
    payment_ids: Cache<String, String>,
}

impl SessionCache {
    pub fn new(config: &SessionCacheConfig) -> Self {
        Self {
            checkout_urls: Cache::builder().time_to_live(config.checkout_url_ttl).build(),
            payment_ids: Cache::builder().time_to_live(config.payment_id_ttl).build(),
        }
    }

    /// Hosted checkout URL cached for an invoice, if the session is live.
    pub async fn checkout_url(&self, invoice_id: &str) -> Option<String> {
        self.checkout_urls.get(invoice_id).await
    }

    pub async fn store_checkout_url(&self, invoice_id: &str, url: &str) {
        self.checkout_urls.insert(invoice_id.to_string(), url.to_string()).await;
    }

    /// External payment id cached for an invoice, if the session is live.
    pub async fn payment_id(&self, invoice_id: &str) -> Option<String> {
        self.payment_ids.get(invoice_id).await
    }

    pub async fn store_payment_id(&self, invoice_id: &str, payment_id: &str) {
        self.payment_ids.insert(invoice_id.to_string(), payment_id.to_string()).await;
    }
}
