//! Transport for bbslink.
//!
//! One tokio task owns each connection's stream. Everything the task reads is
//! pushed onto a [`DeliveryQueue`] for the consumer loop; everything to be
//! written goes through a [`Dispatcher`]. The task performs telnet
//! negotiation and CP437 decoding itself, so consumers only ever see text.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod link;
pub mod transport;

pub use link::Link;
pub use transport::{
    DeliveryQueue, DeliverySender, Dispatcher, Inbound, SessionHandle, TransportConfig,
    TransportError, delivery_channel, open, open_with, spawn_with_stream,
};
