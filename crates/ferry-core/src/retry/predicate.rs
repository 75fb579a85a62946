//! Failure classification.
//!
//! The executors only need a synchronous, side-effect-free yes/no answer for
//! each error. Any `Fn(&E) -> bool` closure qualifies.

use std::sync::Arc;

/// Decides whether an error is transient and the operation should be retried.
///
/// # Example
///
/// ```rust
/// use ferry_core::retry::RetryPredicate;
/// use std::io::{Error, ErrorKind};
///
/// struct TransientIo;
///
/// impl RetryPredicate<Error> for TransientIo {
///     fn should_retry(&self, error: &Error) -> bool {
///         matches!(
///             error.kind(),
///             ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::TimedOut
///         )
///     }
/// }
/// ```
pub trait RetryPredicate<E: ?Sized>: Send + Sync {
    fn should_retry(&self, error: &E) -> bool;
}

impl<E: ?Sized, F> RetryPredicate<E> for F
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &E) -> bool {
        self(error)
    }
}

/// Every error is retryable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E: ?Sized> RetryPredicate<E> for AlwaysRetry {
    fn should_retry(&self, _error: &E) -> bool {
        true
    }
}

/// No error is retryable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl<E: ?Sized> RetryPredicate<E> for NeverRetry {
    fn should_retry(&self, _error: &E) -> bool {
        false
    }
}

/// Retries when any of the inner predicates accepts the error.
pub struct AnyOf<E: ?Sized> {
    predicates: Vec<Arc<dyn RetryPredicate<E>>>,
}

impl<E: ?Sized> AnyOf<E> {
    pub fn new(predicates: Vec<Arc<dyn RetryPredicate<E>>>) -> Self {
        Self { predicates }
    }

    pub fn or<P>(mut self, predicate: P) -> Self
    where
        P: RetryPredicate<E> + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }
}

impl<E: ?Sized> RetryPredicate<E> for AnyOf<E> {
    fn should_retry(&self, error: &E) -> bool {
        self.predicates.iter().any(|p| p.should_retry(error))
    }
}

/// Shorthand for [`AnyOf::new`].
pub fn any_of<E: ?Sized>(predicates: Vec<Arc<dyn RetryPredicate<E>>>) -> AnyOf<E> {
    AnyOf::new(predicates)
}
