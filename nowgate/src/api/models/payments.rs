//! API request and response models for payment endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

/// Request to create a checkout session for an invoice.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentCreateRequest {
    /// Identifier of the invoice being paid
    pub invoice_id: String,
    /// Amount due, in the invoice's pricing currency
    #[schema(value_type = f64)]
    pub amount: Decimal,
}

/// Response carrying the hosted checkout page to redirect the customer to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentCreateResponse {
    #[schema(value_type = String, format = "uri")]
    pub url: Url,
}
