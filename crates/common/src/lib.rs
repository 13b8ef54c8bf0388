//! Shared identifiers and value objects used across the commerce backend.

pub mod context;
pub mod money;
pub mod phone;
pub mod types;

pub use context::RequestContext;
pub use money::Money;
pub use phone::{PhoneNumber, PhoneNumberError};
pub use types::{CartId, OrderId, ProductId, UserId};
