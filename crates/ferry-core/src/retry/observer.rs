//! Retry events.
//!
//! Executors report what they decide through a [`RetryObserver`]; where the
//! events end up is up to the implementation. [`TracingObserver`] is the
//! default and logs through `tracing`.

use std::fmt::Display;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::error::RetryError;

/// Receives structured events from retry runs.
///
/// `attempt` is 1-based. Errors are passed as `&dyn Display` so the observer
/// does not need to know the operation's error type.
pub trait RetryObserver: Send + Sync {
    /// A retryable failure is about to be followed by a sleep of `delay`.
    fn on_retry(&self, attempt: u32, error: &dyn Display, delay: Duration);

    /// The run completed: a single-shot call returned a value or a stream ended cleanly.
    fn on_success(&self, attempts: u32, elapsed: Duration) {
        let _ = (attempts, elapsed);
    }

    /// The predicate rejected an error; the run ends with it.
    fn on_fatal(&self, attempt: u32, error: &dyn Display) {
        let _ = (attempt, error);
    }

    /// The run ran out of budget.
    fn on_deadline_exceeded(&self, attempts: u32, timeout: Duration) {
        let _ = (attempts, timeout);
    }
}

/// Report a deadline error to the observer and hand it back.
pub(crate) fn notify_deadline<E>(
    observer: &dyn RetryObserver,
    attempts: u32,
    err: RetryError<E>,
) -> RetryError<E> {
    if let RetryError::DeadlineExceeded { timeout, .. } = &err {
        observer.on_deadline_exceeded(attempts, *timeout);
    }
    err
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_retry(&self, _attempt: u32, _error: &dyn Display, _delay: Duration) {}
}

/// Logs retry events with the `tracing` crate.
///
/// - `on_retry`: WARN
/// - `on_success`: INFO after retries, DEBUG on the first attempt
/// - `on_fatal`: WARN
/// - `on_deadline_exceeded`: ERROR
#[derive(Debug, Clone)]
pub struct TracingObserver {
    operation: String,
}

impl TracingObserver {
    /// `operation` names the retried call in every log line.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_retry(&self, attempt: u32, error: &dyn Display, delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, will retry"
        );
    }

    fn on_success(&self, attempts: u32, elapsed: Duration) {
        if attempts > 1 {
            tracing::info!(
                operation = %self.operation,
                attempts = attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                elapsed_ms = elapsed.as_millis() as u64,
                "succeeded on first attempt"
            );
        }
    }

    fn on_fatal(&self, attempt: u32, error: &dyn Display) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            error = %error,
            "non-retryable error, giving up"
        );
    }

    fn on_deadline_exceeded(&self, attempts: u32, timeout: Duration) {
        tracing::error!(
            operation = %self.operation,
            attempts = attempts,
            timeout_ms = timeout.as_millis() as u64,
            "retry deadline exceeded"
        );
    }
}

/// Counts events. Useful for tests and simple metrics.
#[derive(Debug, Default)]
pub struct StatsObserver {
    retries: AtomicU32,
    successes: AtomicU32,
    fatals: AtomicU32,
    deadlines: AtomicU32,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn fatals(&self) -> u32 {
        self.fatals.load(Ordering::SeqCst)
    }

    pub fn deadlines(&self) -> u32 {
        self.deadlines.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_retry(&self, _attempt: u32, _error: &dyn Display, _delay: Duration) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _attempts: u32, _elapsed: Duration) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_fatal(&self, _attempt: u32, _error: &dyn Display) {
        self.fatals.fetch_add(1, Ordering::SeqCst);
    }

    fn on_deadline_exceeded(&self, _attempts: u32, _timeout: Duration) {
        self.deadlines.fetch_add(1, Ordering::SeqCst);
    }
}
