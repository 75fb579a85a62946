//! Retry execution with exponential backoff and an overall deadline.
//!
//! A [`RetryPolicy`] decides which failures are transient (through a
//! [`RetryPredicate`]), how long to wait between attempts
//! ([`ExponentialBackoff`]) and how long a whole run may take. It drives two
//! kinds of operations:
//!
//! - single-result operations, re-invoked until they succeed ([`retry_call`],
//!   [`RetryPolicy::wrap_call`]);
//! - streaming operations, transparently reopened when a pull fails
//!   ([`RetryStream`], [`RetryPolicy::wrap_stream`]).
//!
//! Only time spent waiting on the operation or sleeping between attempts is
//! charged against the deadline.

mod backoff;
mod budget;
mod call;
mod error;
mod observer;
mod policy;
mod predicate;
mod stream;

pub use backoff::{
    Delays, ExponentialBackoff, DEFAULT_INITIAL_DELAY, DEFAULT_MAXIMUM_DELAY, DEFAULT_MULTIPLIER,
};
pub use budget::Budget;
pub use call::retry_call;
pub use error::{AttemptError, ConfigError, ErrorHook, HookError, MarkerHook, RetryError};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use policy::{RetryPolicy, RetryingCall, RetryingStream, DEFAULT_TIMEOUT};
pub use predicate::{any_of, AlwaysRetry, AnyOf, NeverRetry, RetryPredicate};
pub use stream::{AttemptStream, FromStream, RetryStream};
