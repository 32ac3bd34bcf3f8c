//! Dispatch runtime - failure containment and the host session routine.
//!
//! This is the only place user code is called under `catch_unwind`. The
//! policy is the same for both handler styles:
//! - an `Err` or an ordinary panic is a handler failure
//! - a panic carrying [`Unrecoverable`] is re-raised untouched
//!
//! Inline failures are logged and swallowed so one bad handler cannot take
//! down the dispatch thread. Actor construction failures are returned to the
//! host as [`SockJsError::HandlerConstructionFailed`].
//!
//! # Host workflow
//!
//! 1. Resolve the [`HandlerDefinition`] for the incoming request
//! 2. Call [`open_session`]
//! 3. Rejected: answer with the [`Rejection`]
//! 4. Inline / Actor: feed inbound frames with `deliver`, drain `outbound()`,
//!    and `close` when the transport session ends
//!
//! # Example
//!
//! ```
//! use sockjs_handler::handler::HandlerDefinition;
//! use sockjs_handler::runtime::{open_session, Session};
//! use sockjs_handler::channel::OutboundEvent;
//!
//! let echo = HandlerDefinition::when_ready(|inbound, out| {
//!     inbound.on_message(move |msg| {
//!         let _ = out.write(msg);
//!     });
//!     Ok(())
//! });
//!
//! let Ok(Session::Inline(mut session)) = open_session(&echo) else {
//!     panic!("expected an inline session");
//! };
//! session.deliver("hi");
//! assert_eq!(
//!     session.outbound().try_recv(),
//!     Some(OutboundEvent::Message("hi".into()))
//! );
//! session.close();
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tokio::task::JoinHandle;

use crate::channel::{outbound_channel, Inbound, Outbound, OutboundReceiver};
use crate::error::{BoxError, PanicError, Result, SockJsError, Unrecoverable};
use crate::handler::{
    ActorFactory, ActorMailbox, ActorProps, HandlerDefinition, ReadyFn, Rejection,
};

/// Tracing target of the event emitted when an inline procedure fails.
pub const INLINE_FAILURE_TARGET: &str = "sockjs_handler::inline";

/// What happened when an inline procedure ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// The procedure returned `Ok`.
    Completed,
    /// The procedure failed; the detail was logged and suppressed.
    Failed(String),
    /// The definition is not inline; nothing ran.
    Skipped,
}

impl ReadyOutcome {
    /// Check whether the procedure failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, ReadyOutcome::Failed(_))
    }
}

/// Run `f`, turning ordinary panics into errors.
///
/// # Panics
///
/// Resumes any panic whose payload is [`Unrecoverable`].
fn contain<T, F>(f: F) -> std::result::Result<T, BoxError>
where
    F: FnOnce() -> std::result::Result<T, BoxError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            if payload.is::<Unrecoverable>() {
                panic::resume_unwind(payload);
            }
            Err(Box::new(PanicError(panic_message(&*payload))))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Invoke an inline procedure, logging and suppressing its failure.
pub(crate) fn run_inline(
    procedure: &ReadyFn,
    inbound: &mut Inbound,
    outbound: Outbound,
) -> ReadyOutcome {
    match contain(|| procedure(inbound, outbound)) {
        Ok(()) => ReadyOutcome::Completed,
        Err(e) => {
            tracing::error!(target: INLINE_FAILURE_TARGET, error = %e, "Exception in on_ready");
            ReadyOutcome::Failed(e.to_string())
        }
    }
}

/// Invoke an actor factory, normalizing its failure.
pub(crate) fn build_actor(factory: &ActorFactory, outbound: Outbound) -> Result<ActorProps> {
    contain(|| factory(outbound)).map_err(SockJsError::construction_failed)
}

/// A session as seen by the transport after dispatch.
#[derive(Debug)]
pub enum Session {
    /// Answer the connection attempt with this outcome; nothing else exists.
    Rejected(Rejection),
    /// Served by an inline procedure.
    Inline(InlineSession),
    /// Served by a spawned actor.
    Actor(ActorSession),
}

/// Live session served by an inline procedure.
#[derive(Debug)]
pub struct InlineSession {
    inbound: Inbound,
    receiver: OutboundReceiver,
    /// Keeps the session open after the procedure returns.
    handle: Outbound,
    ready: ReadyOutcome,
}

impl InlineSession {
    /// Result of running the procedure.
    pub fn ready_outcome(&self) -> &ReadyOutcome {
        &self.ready
    }

    /// Deliver one inbound frame to the registered callbacks.
    pub fn deliver(&mut self, message: &str) {
        self.inbound.deliver(message);
    }

    /// Outbound events for the transport to send.
    pub fn outbound(&mut self) -> &mut OutboundReceiver {
        &mut self.receiver
    }

    /// The session's outbound handle, for transport-initiated writes or close.
    pub fn outbound_handle(&self) -> &Outbound {
        &self.handle
    }

    /// End the session; close callbacks fire once, after the last delivery.
    pub fn close(self) {
        self.inbound.close();
    }
}

/// Live session owned by a spawned actor.
#[derive(Debug)]
pub struct ActorSession {
    mailbox: ActorMailbox,
    receiver: OutboundReceiver,
    task: JoinHandle<()>,
}

impl ActorSession {
    /// Deliver one inbound frame to the actor.
    pub async fn deliver(&self, message: impl Into<String>) -> Result<()> {
        self.mailbox.send(message).await
    }

    /// Outbound events for the transport to send.
    pub fn outbound(&mut self) -> &mut OutboundReceiver {
        &mut self.receiver
    }

    /// End the session and wait for the actor to stop.
    pub async fn close(self) {
        drop(self.mailbox);
        if let Err(e) = self.task.await {
            tracing::warn!("Session actor task ended abnormally: {}", e);
        }
    }
}

/// Dispatch a new connection against `definition`.
///
/// A failing inline procedure still yields a session; a failing actor factory
/// yields `Err(HandlerConstructionFailed)` and no session. An actor-backed
/// definition opened outside a Tokio runtime yields `Err(RuntimeUnavailable)`
/// without running the factory.
pub fn open_session(definition: &HandlerDefinition) -> Result<Session> {
    if let Some(rejection) = definition.rejection() {
        tracing::debug!("Rejecting session with status {}", rejection.status());
        return Ok(Session::Rejected(rejection.clone()));
    }

    let capacity = definition.settings().send_buffer_capacity();
    let (outbound, receiver) = outbound_channel(capacity);

    if definition.is_actor_backed() {
        tokio::runtime::Handle::try_current().map_err(|_| SockJsError::RuntimeUnavailable)?;
        let props = definition.resolve_actor_config(outbound.clone())?;
        tracing::debug!("Spawning session actor {}", props.name());
        let (mailbox, task) = props.spawn(outbound, capacity);
        return Ok(Session::Actor(ActorSession {
            mailbox,
            receiver,
            task,
        }));
    }

    let mut inbound = Inbound::new();
    let ready = definition.on_ready(&mut inbound, outbound.clone());

    Ok(Session::Inline(InlineSession {
        inbound,
        receiver,
        handle: outbound,
        ready,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::OutboundEvent;
    use crate::error::{raise_unrecoverable, HandlerResult};
    use std::error::Error as _;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Captured (target, level, error field) of every event.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<(String, Level, String)>>>);

    struct ErrorField(String);

    impl Visit for ErrorField {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "error" {
                self.0 = format!("{value:?}");
            }
        }
    }

    impl<S: Subscriber> Layer<S> for Captured {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = ErrorField(String::new());
            event.record(&mut visitor);
            self.0.lock().unwrap().push((
                event.metadata().target().to_string(),
                *event.metadata().level(),
                visitor.0,
            ));
        }
    }

    fn with_capture<R>(f: impl FnOnce() -> R) -> (R, Vec<(String, Level, String)>) {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        let result = tracing::subscriber::with_default(subscriber, f);
        let events = captured.0.lock().unwrap().clone();
        (result, events)
    }

    fn inline_failures(events: &[(String, Level, String)]) -> Vec<String> {
        events
            .iter()
            .filter(|(target, level, _)| target == INLINE_FAILURE_TARGET && *level == Level::ERROR)
            .map(|(_, _, error)| error.clone())
            .collect()
    }

    #[test]
    fn test_inline_error_is_contained_and_logged() {
        let handler = HandlerDefinition::when_ready(|_, _| Err("procedure failed".into()));
        let mut inbound = Inbound::new();
        let (out, _rx) = outbound_channel(1);

        let (outcome, events) = with_capture(|| handler.on_ready(&mut inbound, out));

        assert_eq!(outcome, ReadyOutcome::Failed("procedure failed".into()));
        assert_eq!(inline_failures(&events), vec!["procedure failed"]);
    }

    #[test]
    fn test_inline_panic_is_contained_and_logged() {
        let handler = HandlerDefinition::when_ready(|_, _| -> HandlerResult {
            panic!("handler blew up");
        });
        let mut inbound = Inbound::new();
        let (out, _rx) = outbound_channel(1);

        let (outcome, events) = with_capture(|| handler.on_ready(&mut inbound, out));

        assert!(outcome.is_failed());
        assert_eq!(inline_failures(&events), vec!["panic: handler blew up"]);
    }

    #[test]
    fn test_inline_success_logs_nothing() {
        let handler = HandlerDefinition::when_ready(|_, _| Ok(()));
        let mut inbound = Inbound::new();
        let (out, _rx) = outbound_channel(1);

        let (outcome, events) = with_capture(|| handler.on_ready(&mut inbound, out));

        assert_eq!(outcome, ReadyOutcome::Completed);
        assert!(inline_failures(&events).is_empty());
    }

    #[test]
    fn test_inline_unrecoverable_propagates() {
        let handler = HandlerDefinition::when_ready(|_, _| -> HandlerResult {
            raise_unrecoverable("out of memory");
        });
        let mut inbound = Inbound::new();
        let (out, _rx) = outbound_channel(1);

        let payload = panic::catch_unwind(AssertUnwindSafe(|| handler.on_ready(&mut inbound, out)))
            .unwrap_err();
        assert_eq!(
            payload.downcast_ref::<Unrecoverable>(),
            Some(&Unrecoverable::new("out of memory"))
        );
    }

    #[test]
    fn test_factory_error_is_wrapped() {
        let handler = HandlerDefinition::with_actor(|_| Err("no backend".into()));
        let (out, _rx) = outbound_channel(1);

        let err = handler.resolve_actor_config(out).unwrap_err();

        assert!(matches!(err, SockJsError::HandlerConstructionFailed { .. }));
        assert_eq!(err.source().unwrap().to_string(), "no backend");
    }

    #[test]
    fn test_factory_panic_is_wrapped() {
        let handler = HandlerDefinition::with_actor(
            |_| -> std::result::Result<ActorProps, BoxError> { panic!("factory bug") },
        );
        let (out, _rx) = outbound_channel(1);

        let err = handler.resolve_actor_config(out).unwrap_err();

        let source = err.source().unwrap();
        assert!(source.downcast_ref::<PanicError>().is_some());
        assert_eq!(source.to_string(), "panic: factory bug");
    }

    #[test]
    fn test_factory_unrecoverable_propagates_unchanged() {
        let handler = HandlerDefinition::with_actor(
            |_| -> std::result::Result<ActorProps, BoxError> {
                raise_unrecoverable("stack exhausted")
            },
        );
        let (out, _rx) = outbound_channel(1);

        let payload = panic::catch_unwind(AssertUnwindSafe(|| handler.resolve_actor_config(out)))
            .unwrap_err();
        assert_eq!(
            payload.downcast_ref::<Unrecoverable>().map(Unrecoverable::reason),
            Some("stack exhausted")
        );
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u32), "non-string panic payload");
    }

    #[test]
    fn test_open_session_reject_creates_nothing() {
        let outcome = Rejection::forbidden().with_body("maintenance");
        let handler = HandlerDefinition::reject(outcome.clone());

        match open_session(&handler).unwrap() {
            Session::Rejected(rejection) => assert_eq!(rejection, outcome),
            other => panic!("unexpected session: {other:?}"),
        }
    }

    #[test]
    fn test_open_session_inline_failure_keeps_session() {
        let handler = HandlerDefinition::when_ready(|_, _| Err("bad".into()));

        let Session::Inline(mut session) = open_session(&handler).unwrap() else {
            panic!("expected inline session");
        };

        assert!(session.ready_outcome().is_failed());
        session.deliver("still open");
        assert_eq!(session.outbound().try_recv(), None);
        session.close();
    }

    #[test]
    fn test_open_session_inline_without_callbacks_stays_open() {
        let handler = HandlerDefinition::when_ready(|_, _| Ok(()));

        let Session::Inline(mut session) = open_session(&handler).unwrap() else {
            panic!("expected inline session");
        };

        assert_eq!(session.ready_outcome(), &ReadyOutcome::Completed);
        assert_eq!(session.outbound().try_recv(), None);

        session.outbound_handle().close();
        assert_eq!(session.outbound().try_recv(), Some(OutboundEvent::Closed));
    }

    #[tokio::test]
    async fn test_open_session_actor_echo() {
        let handler = HandlerDefinition::with_actor(|_| {
            Ok(ActorProps::from_fn(|msg, out| {
                out.write(format!("echo:{msg}"))?;
                Ok(())
            }))
        });

        let Session::Actor(mut session) = open_session(&handler).unwrap() else {
            panic!("expected actor session");
        };

        session.deliver("one").await.unwrap();
        assert_eq!(
            session.outbound().recv().await,
            Some(OutboundEvent::Message("echo:one".into()))
        );
        session.close().await;
    }

    #[tokio::test]
    async fn test_open_session_actor_factory_failure() {
        let handler = HandlerDefinition::with_actor(|_| Err("refused".into()));

        let err = open_session(&handler).unwrap_err();
        assert!(matches!(err, SockJsError::HandlerConstructionFailed { .. }));
    }

    #[test]
    fn test_open_session_actor_without_runtime() {
        let calls = Arc::new(Mutex::new(0));
        let seen = calls.clone();
        let handler = HandlerDefinition::with_actor(move |_| {
            *seen.lock().unwrap() += 1;
            Ok(ActorProps::from_fn(|_, _| Ok(())))
        });

        let err = open_session(&handler).unwrap_err();

        assert!(matches!(err, SockJsError::RuntimeUnavailable));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_open_session_inline_without_runtime() {
        let handler = HandlerDefinition::when_ready(|_, _| Ok(()));
        assert!(matches!(open_session(&handler), Ok(Session::Inline(_))));
    }
}
