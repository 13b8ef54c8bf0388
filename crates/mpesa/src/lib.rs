//! M-Pesa Daraja STK-push adapter.
//!
//! The [`gateway::StkGateway`] trait isolates the HTTP client; the
//! [`processor::PaymentProcessor`] owns the initiate / poll / callback
//! reconciliation against the order service. Amounts always come from
//! the order, never from the caller.

pub mod callback;
pub mod config;
pub mod error;
pub mod gateway;
pub mod processor;

pub use callback::{parse_callback, CallbackEnvelope, PaymentConfirmation, StkCallback};
pub use config::MpesaConfig;
pub use error::MpesaError;
pub use gateway::{
    DarajaGateway, MockGateway, StkGateway, StkPushAccepted, StkPushRequest, StkQueryOutcome,
};
pub use processor::{CallbackAck, PaymentProcessor, PushReceipt};
