//! NOWPayments gateway core: outbound payment creation and inbound IPN
//! reconciliation.
//!
//! The two halves are independent. The [`initiator`] runs synchronously
//! during invoice checkout and caches the session it creates; the
//! [`reconciler`] runs whenever the processor delivers an IPN callback,
//! possibly long after the initiating process is gone, and never consults
//! the session cache.

pub mod initiator;
pub mod nowpayments;
pub mod reconciler;
pub mod signing;
pub mod status;

/// Gateway name tag recorded against payments in the billing system.
pub const GATEWAY_NAME: &str = "NowPayments";

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that can occur during payment initiation
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The processor API returned a failure or an unusable response.
    /// Details are logged at the failure site; callers only learn that the
    /// payment cannot be initiated right now.
    #[error("NOWPayments API error: {0}")]
    ProviderApi(String),

    #[error("Invalid payment data: {0}")]
    InvalidData(String),
}
