//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Payments** (`POST /payments`): Create a hosted checkout session for an invoice
//! - **Webhooks** (`POST /extensions/gateways/nowpayments/webhook`): NOWPayments
//!   IPN delivery endpoint
//! - **Health** (`GET /healthz`): Liveness probe
//!
//! # OpenAPI Documentation
//!
//! Endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/docs` when the server is running.

pub mod handlers;
pub mod models;
