//! HTTP handlers for payment initiation.

use axum::{extract::State, response::Json};
use rust_decimal::Decimal;
use tracing::instrument;

use crate::{
    AppState,
    api::models::payments::{PaymentCreateRequest, PaymentCreateResponse},
    errors::{Error, Result},
};

/// Create a checkout session for an invoice.
#[utoipa::path(
    post,
    path = "/payments",
    tag = "payments",
    summary = "Create payment",
    description = "Create (or reuse) a NOWPayments hosted checkout session for an invoice and return the URL to redirect the customer to.",
    request_body = PaymentCreateRequest,
    responses(
        (status = 200, description = "Checkout session ready", body = PaymentCreateResponse),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Invoice not found"),
        (status = 502, description = "Payment processor unavailable"),
    )
)]
#[instrument(skip_all, fields(invoice_id = %request.invoice_id))]
pub async fn create_payment(State(state): State<AppState>, Json(request): Json<PaymentCreateRequest>) -> Result<Json<PaymentCreateResponse>> {
    if request.amount <= Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "amount must be positive".to_string(),
        });
    }

    let invoice = state
        .store
        .invoice(&request.invoice_id)
        .await
        .map_err(|e| Error::Internal {
            operation: format!("look up invoice: {e}"),
        })?
        .ok_or_else(|| Error::NotFound {
            resource: "Invoice".to_string(),
            id: request.invoice_id.clone(),
        })?;

    let url = state.initiator.create_payment(&invoice, request.amount).await.map_err(|e| {
        tracing::warn!(error = %e, invoice_id = %invoice.id, "Payment initiation failed");
        Error::PaymentUnavailable
    })?;

    Ok(Json(PaymentCreateResponse { url }))
}
