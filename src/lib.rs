//! # sockjs-handler
//!
//! Handler contract between a SockJS-style transport session and application
//! code.
//!
//! The transport owns framing, timers and buffering. This crate defines what
//! it plugs into:
//!
//! - **Handler definitions**: reject the request, run an inline procedure, or
//!   hand the session to an actor
//! - **Duplex channel**: `Inbound` callbacks and a fire-and-forget `Outbound`
//! - **Session settings**: heartbeat, timeouts and buffer limits the transport
//!   must honor
//! - **Dispatch runtime**: failure containment and a host session routine
//!
//! ## Example
//!
//! ```
//! use sockjs_handler::{HandlerDefinition, SessionSettings};
//!
//! let echo = HandlerDefinition::when_ready(|inbound, out| {
//!     let reply = out.clone();
//!     inbound.on_message(move |msg| {
//!         let _ = reply.write(msg);
//!     });
//!     inbound.on_close(|| tracing::info!("session closed"));
//!     Ok(())
//! })
//! .with_settings(SessionSettings::builder().heartbeat_ms(10_000).build());
//!
//! assert!(!echo.is_actor_backed());
//! assert_eq!(echo.settings().heartbeat_ms(), 10_000);
//! ```

pub mod channel;
pub mod error;
pub mod handler;
pub mod runtime;
pub mod settings;

pub use channel::{Inbound, Outbound};
pub use error::{HandlerResult, SockJsError};
pub use handler::{ActorProps, HandlerDefinition, Rejection, SessionActor};
pub use runtime::{open_session, ReadyOutcome, Session};
pub use settings::SessionSettings;
