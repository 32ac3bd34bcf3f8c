//! Handler module - handler definitions and actor descriptions.
//!
//! Provides:
//! - [`HandlerDefinition`] - reject, inline-callback or actor-backed handler
//! - [`ActorProps`] / [`SessionActor`] - what an actor-backed handler builds
//!
//! # Example
//!
//! ```
//! use sockjs_handler::handler::{ActorProps, HandlerDefinition, Rejection};
//!
//! // Refuse connections outright
//! let closed = HandlerDefinition::reject(Rejection::forbidden());
//! assert!(closed.rejection().is_some());
//!
//! // Hand each session to its own actor
//! let chat = HandlerDefinition::with_actor(|_out| {
//!     Ok(ActorProps::from_fn(|msg, out| {
//!         out.write(msg.to_uppercase())?;
//!         Ok(())
//!     }))
//! });
//! assert!(chat.is_actor_backed());
//! ```

mod actor;
mod definition;

pub use actor::{ActorMailbox, ActorProps, SessionActor, DEFAULT_ACTOR_NAME};
pub use definition::{ActorFactory, HandlerDefinition, HandlerKind, ReadyFn, Rejection};
