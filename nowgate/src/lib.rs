//! # nowgate: NOWPayments gateway sidecar
//!
//! `nowgate` sits between a billing system and the NOWPayments cryptocurrency
//! payment processor. It exposes a small REST API with two jobs:
//!
//! - **Payment initiation**: `POST /payments` creates a hosted checkout
//!   session at NOWPayments for an invoice and returns the URL the customer
//!   should be redirected to. Sessions are cached so repeated requests for
//!   the same invoice reuse the existing checkout page instead of creating a
//!   new one.
//! - **Webhook reconciliation**: `POST /extensions/gateways/nowpayments/webhook`
//!   receives IPN (Instant Payment Notification) deliveries, authenticates
//!   them with HMAC-SHA512 over the raw body, and records completed payments
//!   against the billing system's invoices. All other statuses are logged.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer. Invoice lookups and payment records go through the
//! [`billing::InvoiceStore`] trait, with an HTTP backend for the real billing
//! system and an in-memory backend for development and tests. Outbound
//! NOWPayments calls live in [`gateway::nowpayments`]; the webhook dispatch
//! table lives in [`gateway::reconciler`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use nowgate::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = nowgate::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     nowgate::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod billing;
pub mod config;
pub mod errors;
pub mod gateway;
mod openapi;
pub mod sessions;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::billing::InvoiceStore;
use crate::gateway::initiator::PaymentInitiator;
use crate::gateway::nowpayments::NowPaymentsClient;
use crate::openapi::ApiDoc;
use crate::sessions::SessionCache;

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    /// Application configuration loaded from environment/files
    pub config: Config,
    /// Billing system backend for invoice lookups and payment records
    pub store: Arc<dyn InvoiceStore>,
    /// Checkout session creation (NOWPayments client + session cache)
    pub initiator: Arc<PaymentInitiator>,
}

/// Build the application router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/payments", post(api::handlers::payments::create_payment))
        .route(
            "/extensions/gateways/nowpayments/webhook",
            post(api::handlers::webhooks::handle_webhook),
        )
        .route("/healthz", get(|| async { "OK" }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .with_state(state);

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// The gateway application: a configured router ready to serve.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] wires the billing backend, the
///    NOWPayments client and the session cache into the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts
///    handling requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests
///    drain before the server exits
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = billing::create_store(&config.billing)?;
        let client = NowPaymentsClient::new(&config.gateway)?;
        let sessions = SessionCache::new(&config.sessions);
        let initiator = Arc::new(PaymentInitiator::new(client, sessions, &config));

        let state = AppState::builder()
            .config(config.clone())
            .store(store)
            .initiator(initiator)
            .build();

        let router = build_router(state);

        Ok(Self { router, config })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Payment gateway listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
