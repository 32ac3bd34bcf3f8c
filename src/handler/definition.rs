//! Handler definitions - the three ways a session can be served.
//!
//! A [`HandlerDefinition`] is built once, typically at startup, and shared by
//! every session it serves. Exactly one variant is active:
//!
//! - **Reject**: answer the connection attempt with a fixed [`Rejection`]
//! - **Inline**: run a procedure on the host's dispatch path
//! - **Actor**: hand the session to an independently scheduled [`ActorProps`]
//!
//! # Example
//!
//! ```
//! use sockjs_handler::handler::HandlerDefinition;
//!
//! let echo = HandlerDefinition::when_ready(|inbound, out| {
//!     let echo = out.clone();
//!     inbound.on_message(move |msg| {
//!         let _ = echo.write(msg);
//!     });
//!     Ok(())
//! });
//!
//! assert!(!echo.is_actor_backed());
//! ```

use std::fmt;
use std::sync::Arc;

use http::StatusCode;

use super::ActorProps;
use crate::channel::{Inbound, Outbound};
use crate::error::{BoxError, HandlerResult, Result, SockJsError};
use crate::runtime::{self, ReadyOutcome};
use crate::settings::SessionSettings;

/// Procedure run once per session by inline handlers.
pub type ReadyFn = Arc<dyn Fn(&mut Inbound, Outbound) -> HandlerResult + Send + Sync + 'static>;

/// Factory producing the actor description for one session.
pub type ActorFactory =
    Arc<dyn Fn(Outbound) -> std::result::Result<ActorProps, BoxError> + Send + Sync + 'static>;

/// HTTP-style outcome returned instead of establishing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    status: StatusCode,
    body: Option<String>,
}

impl Rejection {
    /// Reject with the given status and no body.
    pub fn new(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    /// `403 Forbidden`.
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN)
    }

    /// Attach a response body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Response status.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response body, if one was attached.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// Discriminant of a [`HandlerDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Answers every attempt with a [`Rejection`].
    Reject,
    /// Runs a procedure on the dispatch path.
    Inline,
    /// Spawns an actor per session.
    Actor,
}

impl HandlerKind {
    /// Lowercase name, as used in log events.
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Reject => "reject",
            HandlerKind::Inline => "inline",
            HandlerKind::Actor => "actor",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Variant {
    Reject(Rejection),
    Inline(ReadyFn),
    Actor(ActorFactory),
}

/// Immutable handler definition plus its session settings.
///
/// Cloning is cheap; the procedure or factory is shared.
#[derive(Clone)]
pub struct HandlerDefinition {
    variant: Arc<Variant>,
    settings: SessionSettings,
}

impl HandlerDefinition {
    fn from_variant(variant: Variant) -> Self {
        Self {
            variant: Arc::new(variant),
            settings: SessionSettings::default(),
        }
    }

    /// Reject every connection attempt with `outcome`.
    pub fn reject(outcome: Rejection) -> Self {
        Self::from_variant(Variant::Reject(outcome))
    }

    /// Serve each session by running `procedure` once when it is ready.
    pub fn when_ready<F>(procedure: F) -> Self
    where
        F: Fn(&mut Inbound, Outbound) -> HandlerResult + Send + Sync + 'static,
    {
        Self::from_variant(Variant::Inline(Arc::new(procedure)))
    }

    /// Like [`when_ready`](Self::when_ready) for procedures looked up at
    /// runtime.
    ///
    /// Fails with `InvalidArgument` if `procedure` is `None`.
    pub fn try_when_ready(procedure: Option<ReadyFn>) -> Result<Self> {
        let procedure = procedure.ok_or_else(|| {
            SockJsError::InvalidArgument("on_ready procedure cannot be absent".to_string())
        })?;
        Ok(Self::from_variant(Variant::Inline(procedure)))
    }

    /// Serve each session with an actor built by `factory`.
    ///
    /// The factory receives the session's outbound handle.
    pub fn with_actor<F>(factory: F) -> Self
    where
        F: Fn(Outbound) -> std::result::Result<ActorProps, BoxError> + Send + Sync + 'static,
    {
        Self::from_variant(Variant::Actor(Arc::new(factory)))
    }

    /// Attach session settings.
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The settings the transport must honor for this handler.
    #[inline]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Which of the three variants this definition is.
    pub fn kind(&self) -> HandlerKind {
        match *self.variant {
            Variant::Reject(_) => HandlerKind::Reject,
            Variant::Inline(_) => HandlerKind::Inline,
            Variant::Actor(_) => HandlerKind::Actor,
        }
    }

    /// Whether the host must take the actor dispatch path.
    #[inline]
    pub fn is_actor_backed(&self) -> bool {
        matches!(*self.variant, Variant::Actor(_))
    }

    /// The outcome to return instead of a session, for reject handlers.
    pub fn rejection(&self) -> Option<&Rejection> {
        match &*self.variant {
            Variant::Reject(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Run the inline procedure for a freshly established session.
    ///
    /// Never fails: errors and panics from the procedure are logged and
    /// reported as [`ReadyOutcome::Failed`]. Non-inline handlers return
    /// [`ReadyOutcome::Skipped`] without touching `inbound`.
    pub fn on_ready(&self, inbound: &mut Inbound, outbound: Outbound) -> ReadyOutcome {
        match &*self.variant {
            Variant::Inline(procedure) => runtime::run_inline(procedure, inbound, outbound),
            _ => ReadyOutcome::Skipped,
        }
    }

    /// Build the actor description for one session.
    ///
    /// Factory errors and ordinary panics become
    /// [`SockJsError::HandlerConstructionFailed`]; an
    /// [`Unrecoverable`](crate::error::Unrecoverable) panic is re-raised.
    ///
    /// # Panics
    ///
    /// Panics if this definition is not actor-backed.
    pub fn resolve_actor_config(&self, outbound: Outbound) -> Result<ActorProps> {
        match &*self.variant {
            Variant::Actor(factory) => runtime::build_actor(factory, outbound),
            _ => panic!("resolve_actor_config called on {} handler", self.kind()),
        }
    }
}

impl fmt::Debug for HandlerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDefinition")
            .field("kind", &self.kind())
            .field("rejection", &self.rejection())
            .field("settings", &self.settings)
            .finish()
    }
}
