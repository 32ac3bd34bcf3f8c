//! Duplex channel - the data plane between a session and its handler.
//!
//! Provides:
//! - [`Inbound`] - per-session registrar of message and close callbacks ("In")
//! - [`Outbound`] - fire-and-forget write side ("Out")
//! - [`OutboundReceiver`] - what the transport drains
//!
//! # Example
//!
//! ```
//! use sockjs_handler::channel::{outbound_channel, Inbound, OutboundEvent};
//!
//! let mut inbound = Inbound::new();
//! let (out, mut rx) = outbound_channel(16);
//!
//! let echo = out.clone();
//! inbound.on_message(move |msg| {
//!     let _ = echo.write(msg);
//! });
//!
//! inbound.deliver("ping");
//! assert_eq!(rx.try_recv(), Some(OutboundEvent::Message("ping".into())));
//! ```

mod inbound;
mod outbound;

pub use inbound::{CloseCallback, Inbound, MessageCallback};
pub use outbound::{outbound_channel, Outbound, OutboundEvent, OutboundReceiver};
