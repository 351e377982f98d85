//! Shared helpers for handler and router tests.

use std::sync::Arc;

use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::billing::Invoice;
use crate::billing::memory::MemoryInvoiceStore;
use crate::config::Config;
use crate::gateway::initiator::PaymentInitiator;
use crate::gateway::nowpayments::NowPaymentsClient;
use crate::sessions::SessionCache;
use crate::{AppState, build_router};

pub const IPN_SECRET: &str = "test-ipn-secret";

/// A full application wired against a mock NOWPayments server and an
/// in-memory billing store.
pub struct TestApp {
    pub server: axum_test::TestServer,
    pub gateway: MockServer,
    pub store: Arc<MemoryInvoiceStore>,
}

/// Install the rustls crypto provider for tests that build a reqwest client.
/// Harmless when called more than once.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

impl TestApp {
    pub async fn spawn() -> Self {
        install_crypto_provider();
        let gateway = MockServer::start().await;

        let mut config = Config::default();
        config.public_url = Url::parse("https://gateway.example.com").unwrap();
        config.invoice_page_url = Url::parse("https://billing.example.com/invoices").unwrap();
        config.gateway.api_key = "np-key".to_string();
        config.gateway.ipn_secret = IPN_SECRET.to_string();
        config.gateway.api_url = Some(Url::parse(&gateway.uri()).unwrap());

        let store = Arc::new(MemoryInvoiceStore::new());
        let client = NowPaymentsClient::new(&config.gateway).unwrap();
        let sessions = SessionCache::new(&config.sessions);
        let initiator = Arc::new(PaymentInitiator::new(client, sessions, &config));

        let state = AppState::builder()
            .config(config)
            .store(store.clone())
            .initiator(initiator)
            .build();

        let server = axum_test::TestServer::new(build_router(state)).expect("Failed to create test server");

        Self { server, gateway, store }
    }

    pub fn seed_invoice(&self, id: &str, currency_code: Option<&str>) {
        self.store.insert_invoice(Invoice {
            id: id.to_string(),
            currency_code: currency_code.map(str::to_string),
        });
    }
}

pub async fn mount_min_amount(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/min-amount"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"min_amount": 0.0001})))
        .mount(server)
        .await;
}

pub async fn mount_invoice_creation(server: &MockServer, id: &str, invoice_url: &str) {
    Mock::given(method("POST"))
        .and(path("/invoice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": id,
            "invoice_url": invoice_url
        })))
        .mount(server)
        .await;
}
