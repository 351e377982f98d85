//! Payment status values reported by NOWPayments.

use std::fmt;

/// Payment status as reported in IPN callbacks.
///
/// The upstream set is open-ended; values we don't recognize are preserved
/// in [`PaymentStatus::Unknown`] so they can be logged verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Waiting for the customer to send funds.
    Waiting,
    /// Transaction seen on-chain, awaiting confirmations.
    Confirming,
    /// Funds are being sent to the merchant.
    Sending,
    /// Customer sent less than the requested amount.
    PartiallyPaid,
    /// Payment complete; funds settled.
    Finished,
    /// Payment confirmed on-chain.
    Confirmed,
    Failed,
    Refunded,
    Expired,
    /// Any status value we don't recognize, preserved as received.
    Unknown(String),
}

impl PaymentStatus {
    /// Parse a status string as reported by the processor.
    ///
    /// Upstream documents lowercase values; case is normalized before
    /// matching, and unrecognized values are preserved verbatim.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "waiting" => PaymentStatus::Waiting,
            "confirming" => PaymentStatus::Confirming,
            "sending" => PaymentStatus::Sending,
            "partially_paid" => PaymentStatus::PartiallyPaid,
            "finished" => PaymentStatus::Finished,
            "confirmed" => PaymentStatus::Confirmed,
            "failed" => PaymentStatus::Failed,
            "refunded" => PaymentStatus::Refunded,
            "expired" => PaymentStatus::Expired,
            _ => PaymentStatus::Unknown(raw.to_string()),
        }
    }

    /// Whether this status means the payment is complete.
    ///
    /// Only `finished` and `confirmed` may ever trigger a payment record
    /// against an invoice.
    pub fn is_complete(&self) -> bool {
        matches!(self, PaymentStatus::Finished | PaymentStatus::Confirmed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Waiting => "waiting",
            PaymentStatus::Confirming => "confirming",
            PaymentStatus::Sending => "sending",
            PaymentStatus::PartiallyPaid => "partially_paid",
            PaymentStatus::Finished => "finished",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Unknown(raw) => raw,
        };
        write!(f, "{}", s)
    }
}
