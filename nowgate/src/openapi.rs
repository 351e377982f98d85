//! OpenAPI documentation for the payment gateway API.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "nowgate",
        description = "NOWPayments gateway sidecar: hosted checkout creation and IPN webhook reconciliation for a billing system."
    ),
    paths(api::handlers::payments::create_payment, api::handlers::webhooks::handle_webhook),
    components(schemas(
        api::models::payments::PaymentCreateRequest,
        api::models::payments::PaymentCreateResponse,
    )),
    tags(
        (name = "payments", description = "Checkout session creation"),
        (name = "webhooks", description = "Inbound NOWPayments IPN notifications"),
    )
)]
pub struct ApiDoc;
