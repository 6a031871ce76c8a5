//! Message delivery for Herald.
//!
//! This crate provides the delivery engine:
//! - [`MessageSender`] hands messages to a transport, retrying failures
//!   with a linearly growing delay up to a fixed attempt bound
//! - [`Transport`] is the boundary to the external messaging channel;
//!   [`HttpGatewayTransport`] implements it against an HTTP gateway

mod error;
mod sender;
mod transport;

pub use error::TransportError;
pub use sender::MessageSender;
pub use transport::{DEFAULT_ADDRESS_SUFFIX, HttpGatewayTransport, Transport};
