//! Retry notifications.
//!
//! Hosts that want to surface retries (an operator-visible status line, a
//! warning in a log panel) inject a [`RetryListener`] at construction time.
//! Closures and tokio unbounded senders both implement it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

/// Which operation is being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOperation {
    /// A refresh-token exchange against the token endpoint.
    TokenRefresh,
    /// An authenticated request against a target API.
    Dispatch,
}

impl RetryOperation {
    /// Returns a stable name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenRefresh => "token_refresh",
            Self::Dispatch => "dispatch",
        }
    }
}

impl fmt::Display for RetryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted before each backoff wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
    /// The operation being retried.
    pub operation: RetryOperation,
    /// The 1-based number of the attempt that just failed.
    pub attempt: u32,
    /// How long the operation waits before the next attempt.
    pub delay: Duration,
    /// Why the attempt failed. Never contains secrets.
    pub reason: String,
}

impl RetryEvent {
    /// Returns the delay in whole milliseconds.
    pub fn delay_ms(&self) -> u128 {
        self.delay.as_millis()
    }
}

/// Receives [`RetryEvent`]s.
pub trait RetryListener: Send + Sync {
    /// Called once per scheduled retry, before the wait starts.
    fn on_retry(&self, event: &RetryEvent);
}

impl<F> RetryListener for F
where
    F: Fn(&RetryEvent) + Send + Sync,
{
    fn on_retry(&self, event: &RetryEvent) {
        self(event)
    }
}

impl RetryListener for mpsc::UnboundedSender<RetryEvent> {
    fn on_retry(&self, event: &RetryEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.send(event.clone());
    }
}

/// Cheaply cloneable handle to an optional listener.
#[derive(Clone, Default)]
pub struct RetryNotifier {
    listener: Option<Arc<dyn RetryListener>>,
}

impl RetryNotifier {
    /// Creates a notifier that drops every event.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a notifier forwarding to `listener`.
    pub fn new(listener: Arc<dyn RetryListener>) -> Self {
        Self {
            listener: Some(listener),
        }
    }

    /// Creates a notifier backed by an unbounded channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RetryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(Arc::new(tx)), rx)
    }

    /// Forwards an event to the listener, if any.
    pub fn notify(&self, event: &RetryEvent) {
        if let Some(ref listener) = self.listener {
            listener.on_retry(event);
        }
    }
}

impl fmt::Debug for RetryNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryNotifier")
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
