//! Actor-backed sessions.
//!
//! An actor factory only builds an [`ActorProps`] description. The host then
//! spawns it with [`ActorProps::spawn`], which runs the [`SessionActor`] on its
//! own Tokio task:
//!
//! ```text
//! Transport ─► ActorMailbox ─► mpsc ─► actor task ─► SessionActor::on_message
//!                                          │
//!                                          └─► Outbound ─► Transport
//! ```
//!
//! The task owns the actor exclusively. When the mailbox closes the actor's
//! `on_close` runs once and the task ends.

use std::fmt;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channel::Outbound;
use crate::error::{HandlerResult, Result, SockJsError};

/// Name used when a description is not given one.
pub const DEFAULT_ACTOR_NAME: &str = "session-actor";

/// An entity that owns one session.
pub trait SessionActor: Send + 'static {
    /// Handle one inbound message.
    ///
    /// Returning an error stops the actor and closes the session.
    fn on_message(&mut self, message: String, out: &Outbound) -> HandlerResult;

    /// Called once after the last message.
    fn on_close(&mut self) {}
}

/// Adapter turning a message closure into a [`SessionActor`].
struct FnActor<F> {
    f: F,
}

impl<F> SessionActor for FnActor<F>
where
    F: FnMut(String, &Outbound) -> HandlerResult + Send + 'static,
{
    fn on_message(&mut self, message: String, out: &Outbound) -> HandlerResult {
        (self.f)(message, out)
    }
}

/// Description of the actor to spawn for one session.
pub struct ActorProps {
    actor: Box<dyn SessionActor>,
    name: String,
}

impl ActorProps {
    /// Describe an actor from a [`SessionActor`] value.
    pub fn new<A: SessionActor>(actor: A) -> Self {
        Self {
            actor: Box::new(actor),
            name: DEFAULT_ACTOR_NAME.to_string(),
        }
    }

    /// Describe an actor that only handles messages.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnMut(String, &Outbound) -> HandlerResult + Send + 'static,
    {
        Self::new(FnActor { f })
    }

    /// Name the actor (used in log events).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Name used in log events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the actor on the current Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `out` - Outbound handle the actor writes to
    /// * `mailbox_capacity` - Inbound queue size (raised to at least one)
    ///
    /// # Returns
    ///
    /// A tuple of `(ActorMailbox, JoinHandle)`. Dropping every mailbox clone
    /// ends the actor.
    pub fn spawn(self, out: Outbound, mailbox_capacity: usize) -> (ActorMailbox, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
        let task = tokio::spawn(actor_loop(self.actor, self.name, rx, out));

        (ActorMailbox { tx }, task)
    }
}

impl fmt::Debug for ActorProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorProps").field("name", &self.name).finish()
    }
}

/// Sender half for delivering inbound messages to a spawned actor.
#[derive(Clone, Debug)]
pub struct ActorMailbox {
    tx: mpsc::Sender<String>,
}

impl ActorMailbox {
    /// Deliver a message, waiting for mailbox space.
    pub async fn send(&self, message: impl Into<String>) -> Result<()> {
        self.tx
            .send(message.into())
            .await
            .map_err(|_| SockJsError::SessionClosed)
    }

    /// Deliver a message without waiting.
    pub fn try_send(&self, message: impl Into<String>) -> Result<()> {
        self.tx.try_send(message.into()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SockJsError::SendBufferFull,
            mpsc::error::TrySendError::Closed(_) => SockJsError::SessionClosed,
        })
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Main actor loop - feeds messages in order until the mailbox closes.
async fn actor_loop(
    mut actor: Box<dyn SessionActor>,
    name: String,
    mut rx: mpsc::Receiver<String>,
    out: Outbound,
) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = actor.on_message(message, &out) {
            tracing::warn!(actor = %name, error = %e, "Session actor failed, closing session");
            out.close();
            break;
        }
    }

    // Refuse further deliveries before running the close hook
    rx.close();
    actor.on_close();
    tracing::debug!(actor = %name, "Session actor stopped");
}
