//! Time budget of a single retry run.
//!
//! Tracks how much of the configured timeout is left and the most recent
//! retryable failure, so a deadline error can always chain its cause. Only
//! time spent awaiting an attempt (or a stream pull) and sleeping between
//! retries is charged; the budget is decremented by measured elapsed time,
//! not nominal delays.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::error::{AttemptError, RetryError};

#[derive(Debug)]
pub struct Budget<E> {
    timeout: Option<Duration>,
    remaining: Option<Duration>,
    last_error: Option<AttemptError<E>>,
}

impl<E> Budget<E> {
    /// `None` (or a zero timeout) means unlimited.
    pub fn new(timeout: Option<Duration>) -> Self {
        let timeout = timeout.filter(|t| !t.is_zero());
        Self {
            timeout,
            remaining: timeout,
            last_error: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Time left, or `None` when unlimited.
    pub fn remaining(&self) -> Option<Duration> {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_some_and(|r| r.is_zero())
    }

    pub fn consume(&mut self, elapsed: Duration) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(elapsed);
        }
    }

    /// Remember the latest retryable failure; it becomes the deadline error's cause.
    pub fn record(&mut self, failure: AttemptError<E>) {
        self.last_error = Some(failure);
    }

    pub fn last_error(&self) -> Option<&AttemptError<E>> {
        self.last_error.as_ref()
    }

    /// Fails with a deadline error if no attempt may start.
    pub fn ensure_open(&mut self) -> Result<(), RetryError<E>> {
        if self.is_exhausted() {
            return Err(self.exceeded());
        }
        Ok(())
    }

    /// The sleep that fits before the deadline, or a deadline error if `sleep`
    /// would reach it.
    pub fn clip_sleep(&mut self, sleep: Duration) -> Result<Duration, RetryError<E>> {
        match self.remaining {
            Some(remaining) if remaining <= sleep => Err(self.exceeded()),
            Some(remaining) => Ok(sleep.min(remaining)),
            None => Ok(sleep),
        }
    }

    /// Await `fut`, bounded by the remaining time.
    ///
    /// Returns `Err(bound)` if the future was cancelled for exceeding `bound`.
    /// The measured wall-clock time is charged either way.
    pub async fn timed<F>(&mut self, fut: F) -> Result<F::Output, Duration>
    where
        F: Future,
    {
        let started = Instant::now();
        let result = match self.remaining {
            Some(bound) => tokio::time::timeout(bound, fut).await.map_err(|_| bound),
            None => Ok(fut.await),
        };
        self.consume(started.elapsed());
        result
    }

    /// Sleep for `delay` and charge the measured time.
    pub async fn sleep(&mut self, delay: Duration) {
        let started = Instant::now();
        tokio::time::sleep(delay).await;
        self.consume(started.elapsed());
    }

    fn exceeded(&mut self) -> RetryError<E> {
        RetryError::deadline_exceeded(self.timeout.unwrap_or_default(), self.last_error.take())
    }
}
