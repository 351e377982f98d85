//! HTTP handler for the NOWPayments IPN webhook.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde_json::json;
use tracing::instrument;

use crate::{
    AppState,
    errors::{Error, Result},
    gateway::{reconciler, signing},
};

/// Signature header attached to every IPN delivery.
pub const SIGNATURE_HEADER: &str = "x-nowpayments-sig";

/// Receive a NOWPayments IPN notification.
///
/// The signature is computed over the raw request body, so the handler takes
/// [`Bytes`] rather than a typed JSON extractor and only deserializes after
/// authentication. Returns 200 for every authenticated, well-formed delivery
/// regardless of payment status; anything else would trigger redelivery.
#[utoipa::path(
    post,
    path = "/extensions/gateways/nowpayments/webhook",
    tag = "webhooks",
    summary = "NOWPayments IPN webhook",
    description = "Receives payment status notifications from NOWPayments, authenticated via HMAC-SHA512 over the raw body.",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Notification processed"),
        (status = 400, description = "Malformed payload or missing signature/fields"),
        (status = 401, description = "Signature mismatch"),
    )
)]
#[instrument(skip_all)]
pub async fn handle_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<serde_json::Value>> {
    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|_| Error::InvalidJson)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::MissingSignature)?;

    if !signing::verify_signature(&body, signature, &state.config.gateway.ipn_secret) {
        return Err(Error::InvalidSignature);
    }

    // Past this point the sender holds the IPN secret. Notification fields
    // are type-tolerant, so this only fails for non-object bodies.
    let notification: reconciler::WebhookNotification = serde_json::from_value(payload.clone()).map_err(|_| Error::MissingRequiredFields)?;

    reconciler::reconcile(state.store.as_ref(), &notification, &payload).await?;

    Ok(Json(json!({"success": true})))
}

#[cfg(test)]
mod tests {
    use crate::gateway::signing::sign_payload;
    use crate::test_utils::{IPN_SECRET, TestApp};
    use serde_json::json;

    async fn deliver(app: &TestApp, payload: &serde_json::Value) -> axum_test::TestResponse {
        let body = serde_json::to_vec(payload).unwrap();
        app.server
            .post("/extensions/gateways/nowpayments/webhook")
            .add_header("x-nowpayments-sig", sign_payload(&body, IPN_SECRET))
            .bytes(body.into())
            .content_type("application/json")
            .await
    }

    #[tokio::test]
    async fn test_finished_payment_is_recorded() {
        let app = TestApp::spawn().await;
        app.seed_invoice("42", None);

        let response = deliver(
            &app,
            &json!({"order_id": "42", "payment_status": "finished", "payment_id": "abc123", "price_amount": 10.5}),
        )
        .await;

        assert_eq!(response.status_code().as_u16(), 200);
        let body: serde_json::Value = response.json();
        assert_eq!(body, json!({"success": true}));

        let payments = app.store.payments_for("42");
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].transaction_id, "abc123_");
    }

    #[tokio::test]
    async fn test_invalid_json_is_400() {
        let app = TestApp::spawn().await;
        let body = b"{not json".to_vec();

        let response = app
            .server
            .post("/extensions/gateways/nowpayments/webhook")
            .add_header("x-nowpayments-sig", sign_payload(&body, IPN_SECRET))
            .bytes(body.into())
            .content_type("application/json")
            .await;

        assert_eq!(response.status_code().as_u16(), 400);
        let body: serde_json::Value = response.json();
        assert_eq!(body, json!({"error": "Invalid JSON"}));
    }

    #[tokio::test]
    async fn test_missing_signature_is_400() {
        let app = TestApp::spawn().await;

        let response = app
            .server
            .post("/extensions/gateways/nowpayments/webhook")
            .json(&json!({"order_id": "42", "payment_status": "finished"}))
            .await;

        assert_eq!(response.status_code().as_u16(), 400);
        let body: serde_json::Value = response.json();
        assert_eq!(body, json!({"error": "Missing signature"}));
    }

    #[tokio::test]
    async fn test_wrong_signature_is_401_and_records_nothing() {
        let app = TestApp::spawn().await;
        let payload = json!({"order_id": "42", "payment_status": "finished", "payment_id": "abc123", "price_amount": 10.5});
        let body = serde_json::to_vec(&payload).unwrap();

        let response = app
            .server
            .post("/extensions/gateways/nowpayments/webhook")
            .add_header("x-nowpayments-sig", sign_payload(&body, "wrong-secret"))
            .bytes(body.into())
            .content_type("application/json")
            .await;

        assert_eq!(response.status_code().as_u16(), 401);
        let body: serde_json::Value = response.json();
        assert_eq!(body, json!({"error": "Invalid signature"}));
        assert!(app.store.payments_for("42").is_empty());
    }

    #[tokio::test]
    async fn test_signature_over_different_body_is_rejected() {
        let app = TestApp::spawn().await;
        let signed = serde_json::to_vec(&json!({"order_id": "42", "payment_status": "waiting"})).unwrap();
        let sent = serde_json::to_vec(&json!({"order_id": "42", "payment_status": "finished", "price_amount": 999})).unwrap();

        let response = app
            .server
            .post("/extensions/gateways/nowpayments/webhook")
            .add_header("x-nowpayments-sig", sign_payload(&signed, IPN_SECRET))
            .bytes(sent.into())
            .content_type("application/json")
            .await;

        assert_eq!(response.status_code().as_u16(), 401);
    }

    #[tokio::test]
    async fn test_missing_required_fields_is_400() {
        let app = TestApp::spawn().await;

        let response = deliver(&app, &json!({"payment_id": "abc123", "price_amount": 10.5})).await;

        assert_eq!(response.status_code().as_u16(), 400);
        let body: serde_json::Value = response.json();
        assert_eq!(body, json!({"error": "Missing required fields"}));
    }

    #[tokio::test]
    async fn test_non_terminal_status_is_acknowledged_without_recording() {
        let app = TestApp::spawn().await;
        app.seed_invoice("42", None);

        for status in ["waiting", "confirming", "sending", "partially_paid", "expired", "failed", "refunded"] {
            let response = deliver(
                &app,
                &json!({"order_id": "42", "payment_status": status, "payment_id": "abc123", "price_amount": 10.5}),
            )
            .await;
            assert_eq!(response.status_code().as_u16(), 200);
        }

        assert!(app.store.payments_for("42").is_empty());
    }

    #[tokio::test]
    async fn test_numeric_status_is_acknowledged_without_recording() {
        let app = TestApp::spawn().await;
        app.seed_invoice("42", None);

        let response = deliver(&app, &json!({"order_id": "42", "payment_status": 5, "payment_id": "abc123"})).await;

        assert_eq!(response.status_code().as_u16(), 200);
        let body: serde_json::Value = response.json();
        assert_eq!(body, json!({"success": true}));
        assert!(app.store.payments_for("42").is_empty());
    }

    #[tokio::test]
    async fn test_non_object_body_is_missing_fields() {
        // Valid JSON, correctly signed, but not an object: authenticated,
        // then rejected for lacking the required fields.
        let app = TestApp::spawn().await;

        let response = deliver(&app, &json!([1, 2, 3])).await;

        assert_eq!(response.status_code().as_u16(), 400);
        let body: serde_json::Value = response.json();
        assert_eq!(body, json!({"error": "Missing required fields"}));
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let app = TestApp::spawn().await;
        app.seed_invoice("42", None);
        let payload = json!({"order_id": "42", "payment_status": "confirmed", "payment_id": "abc123", "price_amount": 10.5});

        assert_eq!(deliver(&app, &payload).await.status_code().as_u16(), 200);
        assert_eq!(deliver(&app, &payload).await.status_code().as_u16(), 200);

        assert_eq!(app.store.payments_for("42").len(), 1);
    }

    #[tokio::test]
    async fn test_uppercase_status_is_normalized() {
        let app = TestApp::spawn().await;
        app.seed_invoice("42", None);

        let response = deliver(
            &app,
            &json!({"order_id": "42", "payment_status": "FINISHED", "payment_id": "abc123", "price_amount": 10.5}),
        )
        .await;

        assert_eq!(response.status_code().as_u16(), 200);
        assert_eq!(app.store.payments_for("42").len(), 1);
    }
}
