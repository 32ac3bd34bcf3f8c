//! Inbound callback registrar ("In").
//!
//! Handlers register message and close callbacks; the host delivers frames
//! through [`Inbound::deliver`] and ends the session with [`Inbound::close`].
//!
//! # Example
//!
//! ```
//! use sockjs_handler::channel::Inbound;
//!
//! let mut inbound = Inbound::new();
//! inbound.on_message(|msg| println!("got {msg}"));
//! inbound.on_close(|| println!("closed"));
//!
//! inbound.deliver("hello");
//! inbound.close();
//! ```

use std::fmt;

/// Callback invoked for every inbound message.
pub type MessageCallback = Box<dyn FnMut(&str) + Send + 'static>;

/// Callback invoked once when the session closes.
pub type CloseCallback = Box<dyn FnOnce() + Send + 'static>;

/// Per-session registry of message and close callbacks.
///
/// Owned by exactly one session. Delivery takes `&mut self`, so a callback
/// list can never be extended while it is being iterated.
///
/// Dropping a registrar without calling [`close`](Inbound::close) fires the
/// close callbacks, except while the thread is unwinding from a panic: a
/// second panic there would abort the process, so the callbacks are discarded.
#[derive(Default)]
pub struct Inbound {
    /// Callbacks to invoke at each frame, in registration order.
    message_callbacks: Vec<MessageCallback>,
    /// Callbacks to invoke on close, in registration order.
    close_callbacks: Vec<CloseCallback>,
}

impl Inbound {
    /// Create an empty registrar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message callback.
    pub fn on_message<F>(&mut self, callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.message_callbacks.push(Box::new(callback));
    }

    /// Register a close callback.
    pub fn on_close<F>(&mut self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.close_callbacks.push(Box::new(callback));
    }

    /// Number of registered message callbacks.
    #[inline]
    pub fn message_callback_count(&self) -> usize {
        self.message_callbacks.len()
    }

    /// Number of registered close callbacks.
    #[inline]
    pub fn close_callback_count(&self) -> usize {
        self.close_callbacks.len()
    }

    /// Deliver one inbound frame to every message callback, in order.
    pub fn deliver(&mut self, message: &str) {
        for callback in self.message_callbacks.iter_mut() {
            callback(message);
        }
    }

    /// End the session, firing every close callback exactly once.
    pub fn close(mut self) {
        self.fire_close();
    }

    fn fire_close(&mut self) {
        self.message_callbacks.clear();

        // Taking the list makes a second call a no-op.
        for callback in std::mem::take(&mut self.close_callbacks) {
            callback();
        }
    }
}

impl Drop for Inbound {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        // A host that forgets to close still owes the handler its close event.
        self.fire_close();
    }
}

impl fmt::Debug for Inbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbound")
            .field("message_callbacks", &self.message_callbacks.len())
            .field("close_callbacks", &self.close_callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(String) + Clone) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let log = log.clone();
            move |entry: String| log.lock().unwrap().push(entry)
        };
        (log, sink)
    }

    #[test]
    fn test_message_callbacks_fire_in_registration_order() {
        let (log, sink) = recorder();
        let mut inbound = Inbound::new();

        let s1 = sink.clone();
        inbound.on_message(move |m| s1(format!("c1({m})")));
        let s2 = sink.clone();
        inbound.on_message(move |m| s2(format!("c2({m})")));

        for frame in ["a", "b", "c"] {
            inbound.deliver(frame);
        }

        assert_eq!(
            *log.lock().unwrap(),
            vec!["c1(a)", "c2(a)", "c1(b)", "c2(b)", "c1(c)", "c2(c)"]
        );
    }

    #[test]
    fn test_close_callbacks_fire_once_after_messages() {
        let (log, sink) = recorder();
        let mut inbound = Inbound::new();

        let s = sink.clone();
        inbound.on_message(move |m| s(format!("msg({m})")));
        let k1 = sink.clone();
        inbound.on_close(move || k1("k1".to_string()));
        let k2 = sink.clone();
        inbound.on_close(move || k2("k2".to_string()));

        inbound.deliver("x");
        inbound.close();

        assert_eq!(*log.lock().unwrap(), vec!["msg(x)", "k1", "k2"]);
    }

    #[test]
    fn test_drop_fires_close_callbacks() {
        let (log, sink) = recorder();
        {
            let mut inbound = Inbound::new();
            inbound.on_close(move || sink("closed".to_string()));
        }

        assert_eq!(*log.lock().unwrap(), vec!["closed"]);
    }

    #[test]
    fn test_drop_while_unwinding_skips_close_callbacks() {
        let (log, sink) = recorder();

        let result = std::panic::catch_unwind(move || {
            let mut inbound = Inbound::new();
            inbound.on_close(move || {
                sink("closed".to_string());
                panic!("close callback failed");
            });
            panic!("session failed");
        });

        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"session failed"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_registrar() {
        let mut inbound = Inbound::new();
        assert_eq!(inbound.message_callback_count(), 0);
        assert_eq!(inbound.close_callback_count(), 0);

        // Should not panic with nothing registered
        inbound.deliver("ignored");
        inbound.close();
    }

    #[test]
    fn test_callback_counts() {
        let mut inbound = Inbound::new();
        inbound.on_message(|_| {});
        inbound.on_message(|_| {});
        inbound.on_close(|| {});

        assert_eq!(inbound.message_callback_count(), 2);
        assert_eq!(inbound.close_callback_count(), 1);
    }
}
