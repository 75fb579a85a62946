//! Error types for retry runs.
//!
//! A run ends with exactly one of: the operation's own error when the
//! predicate rejects it, a deadline error chaining the last transient
//! failure, a broken backoff sequence, or a failing error hook.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Error returned by an error hook. Never caught by the executors.
pub type HookError = Box<dyn StdError + Send + Sync + 'static>;

/// Observational hook invoked with every retryable failure.
pub type ErrorHook<E> = Arc<dyn Fn(&AttemptError<E>) -> Result<(), HookError> + Send + Sync>;

/// Streaming hook: a returned value is surfaced to the consumer as a synthetic item.
pub type MarkerHook<E, T> =
    Arc<dyn Fn(&AttemptError<E>) -> Result<Option<T>, HookError> + Send + Sync>;

/// A retryable failure observed during one attempt.
#[derive(Debug)]
pub enum AttemptError<E> {
    /// The operation failed and the predicate accepted the error.
    Failed(E),
    /// The attempt was cancelled because it would have outlived the remaining budget.
    /// Always retryable; the predicate is not consulted.
    TimedOut {
        /// The bound that was exceeded.
        after: Duration,
    },
}

impl<E> AttemptError<E> {
    /// The operation error, if this was not a timeout.
    pub fn error(&self) -> Option<&E> {
        match self {
            AttemptError::Failed(e) => Some(e),
            AttemptError::TimedOut { .. } => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AttemptError::TimedOut { .. })
    }
}

impl<E: fmt::Display> fmt::Display for AttemptError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Failed(e) => write!(f, "{}", e),
            AttemptError::TimedOut { after } => {
                write!(f, "attempt timed out after {:.1}s", after.as_secs_f64())
            }
        }
    }
}

impl<E: StdError + 'static> StdError for AttemptError<E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AttemptError::Failed(e) => e.source(),
            AttemptError::TimedOut { .. } => None,
        }
    }
}

/// Terminal error of a retry run, generic over the operation's error `E`.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The predicate rejected the error (or the stream raised it in response to an
    /// injected error). Carried unmodified; `Display` and `source` are transparent.
    Fatal(E),

    /// No further attempt or wait fits in the remaining budget.
    DeadlineExceeded {
        /// The configured timeout for the whole run.
        timeout: Duration,
        /// The most recent retryable failure, if any attempt failed.
        source: Option<AttemptError<E>>,
    },

    /// The backoff sequence stopped producing delays.
    SleepExhausted,

    /// The error hook failed.
    Hook(HookError),
}

impl<E> RetryError<E> {
    pub fn deadline_exceeded(timeout: Duration, source: Option<AttemptError<E>>) -> Self {
        RetryError::DeadlineExceeded { timeout, source }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, RetryError::Fatal(_))
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, RetryError::DeadlineExceeded { .. })
    }

    pub fn is_sleep_exhausted(&self) -> bool {
        matches!(self, RetryError::SleepExhausted)
    }

    pub fn is_hook(&self) -> bool {
        matches!(self, RetryError::Hook(_))
    }

    /// The operation error of a fatal failure, consuming this error.
    pub fn into_fatal(self) -> Option<E> {
        match self {
            RetryError::Fatal(e) => Some(e),
            _ => None,
        }
    }

    /// The last retryable failure chained to a deadline error.
    pub fn last_error(&self) -> Option<&AttemptError<E>> {
        match self {
            RetryError::DeadlineExceeded { source, .. } => source.as_ref(),
            _ => None,
        }
    }

    /// Map the operation error type using a closure.
    pub fn map_err<F, E2>(self, f: F) -> RetryError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            RetryError::Fatal(e) => RetryError::Fatal(f(e)),
            RetryError::DeadlineExceeded { timeout, source } => RetryError::DeadlineExceeded {
                timeout,
                source: source.map(|failure| match failure {
                    AttemptError::Failed(e) => AttemptError::Failed(f(e)),
                    AttemptError::TimedOut { after } => AttemptError::TimedOut { after },
                }),
            },
            RetryError::SleepExhausted => RetryError::SleepExhausted,
            RetryError::Hook(e) => RetryError::Hook(e),
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Fatal(e) => write!(f, "{}", e),
            RetryError::DeadlineExceeded { timeout, .. } => {
                write!(f, "timeout of {:.1}s exceeded", timeout.as_secs_f64())
            }
            RetryError::SleepExhausted => write!(f, "sleep generator stopped yielding sleep values"),
            RetryError::Hook(e) => write!(f, "error hook failed: {}", e),
        }
    }
}

impl<E: StdError + 'static> StdError for RetryError<E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            RetryError::Fatal(e) => e.source(),
            RetryError::DeadlineExceeded { source, .. } => {
                source.as_ref().map(|s| s as &(dyn StdError + 'static))
            }
            RetryError::SleepExhausted => None,
            RetryError::Hook(e) => {
                let source: &(dyn StdError + 'static) = &**e;
                Some(source)
            }
        }
    }
}

/// Invalid backoff parameters or config values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("initial delay must be greater than zero")]
    ZeroInitialDelay,

    #[error("delay multiplier must be a finite number >= 1.0, got {0}")]
    InvalidMultiplier(f64),

    #[error("maximum delay ({maximum:?}) is less than initial delay ({initial:?})")]
    MaximumBelowInitial { initial: Duration, maximum: Duration },

    #[error("{field} must be a non-negative finite number of seconds, got {value}")]
    InvalidSeconds { field: &'static str, value: f64 },
}
