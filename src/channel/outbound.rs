//! Outbound write capability ("Out") and its host-side receiver.
//!
//! Handlers hold a cloneable [`Outbound`]; the transport drains the matching
//! [`OutboundReceiver`].
//!
//! # Architecture
//!
//! ```text
//! Handler ─┐
//! Actor   ─┼─► mpsc::Sender<String> ─────► OutboundReceiver ─► Transport
//! Callback─┘   watch::Sender<bool> (close) ┘
//! ```
//!
//! Writes are fire-and-forget: `write` only reports whether the message could
//! be queued, never whether it was delivered.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::error::{Result, SockJsError};

/// Event yielded to the transport for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// A message the handler wrote.
    Message(String),
    /// The handler closed the session.
    Closed,
}

/// Write side handed to handlers and actors.
///
/// Cheaply cloneable; all clones feed the same session.
#[derive(Clone, Debug)]
pub struct Outbound {
    /// Message queue into the transport.
    tx: mpsc::Sender<String>,
    /// Close signal, shared by all clones.
    closed: Arc<watch::Sender<bool>>,
}

impl Outbound {
    /// Queue a message for the transport.
    ///
    /// Returns `Err(SendBufferFull)` immediately if the send buffer is at
    /// capacity, and `Err(SessionClosed)` once `close` has been called or the
    /// transport dropped the session.
    pub fn write(&self, message: impl Into<String>) -> Result<()> {
        if self.is_closed() {
            return Err(SockJsError::SessionClosed);
        }

        self.tx.try_send(message.into()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SockJsError::SendBufferFull,
            mpsc::error::TrySendError::Closed(_) => SockJsError::SessionClosed,
        })
    }

    /// Ask the transport to terminate the session.
    ///
    /// Idempotent. Messages written before the close are still delivered.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Check whether `close` has been called on any clone.
    #[inline]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Remaining send buffer slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

/// Transport side of an outbound channel.
#[derive(Debug)]
pub struct OutboundReceiver {
    rx: mpsc::Receiver<String>,
    closed: watch::Receiver<bool>,
    /// Set once `Closed` has been yielded.
    finished: bool,
}

impl OutboundReceiver {
    /// Receive the next outbound event.
    ///
    /// Yields every message queued before the close, then a single
    /// [`OutboundEvent::Closed`], then `None`. Also returns `None` once every
    /// [`Outbound`] clone has been dropped without closing.
    pub async fn recv(&mut self) -> Option<OutboundEvent> {
        if self.finished {
            return None;
        }

        loop {
            if let Ok(message) = self.rx.try_recv() {
                return Some(OutboundEvent::Message(message));
            }

            if *self.closed.borrow_and_update() {
                return self.finish();
            }

            tokio::select! {
                biased;
                message = self.rx.recv() => {
                    return match message {
                        Some(message) => Some(OutboundEvent::Message(message)),
                        None if *self.closed.borrow() => self.finish(),
                        None => {
                            self.finished = true;
                            None
                        }
                    };
                }
                changed = self.closed.changed() => {
                    if changed.is_err() {
                        // Every handle gone without closing; drain what is left.
                        return match self.rx.recv().await {
                            Some(message) => Some(OutboundEvent::Message(message)),
                            None => {
                                self.finished = true;
                                None
                            }
                        };
                    }
                }
            }
        }
    }

    /// Receive the next event without waiting.
    pub fn try_recv(&mut self) -> Option<OutboundEvent> {
        if self.finished {
            return None;
        }

        if let Ok(message) = self.rx.try_recv() {
            return Some(OutboundEvent::Message(message));
        }

        if *self.closed.borrow() {
            return self.finish();
        }

        None
    }

    fn finish(&mut self) -> Option<OutboundEvent> {
        self.finished = true;
        // Late writes are refused from here on.
        self.rx.close();
        Some(OutboundEvent::Closed)
    }
}

/// Create a connected outbound pair with room for `capacity` messages.
///
/// A capacity of zero is raised to one.
pub fn outbound_channel(capacity: usize) -> (Outbound, OutboundReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (closed_tx, closed_rx) = watch::channel(false);

    let outbound = Outbound {
        tx,
        closed: Arc::new(closed_tx),
    };
    let receiver = OutboundReceiver {
        rx,
        closed: closed_rx,
        finished: false,
    };

    (outbound, receiver)
}
