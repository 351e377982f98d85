//! Axum route handlers.

pub mod payments;
pub mod webhooks;
