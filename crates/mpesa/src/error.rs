//! Payment gateway error taxonomy.

use common::PhoneNumberError;
use orders::OrderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MpesaError {
    /// Token exchange, transport, or timeout failure. The caller should
    /// retry later; nothing was recorded.
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The gateway understood the request and declined it.
    #[error("payment push rejected ({code}): {description}")]
    PushRejected { code: String, description: String },

    /// The callback payload could not be parsed.
    #[error("malformed callback payload: {0}")]
    MalformedCallback(String),

    #[error(transparent)]
    InvalidPhone(#[from] PhoneNumberError),

    #[error(transparent)]
    Order(#[from] OrderError),
}
