use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetryConfig;

use super::backoff::{Delays, ExponentialBackoff};
use super::call::retry_call;
use super::error::{AttemptError, ConfigError, ErrorHook, HookError, MarkerHook, RetryError};
use super::observer::{RetryObserver, TracingObserver};
use super::predicate::{AlwaysRetry, RetryPredicate};
use super::stream::{AttemptStream, RetryStream};

/// Default budget for a whole retry run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Immutable retry configuration: which errors are transient, how long to
/// back off, how long to keep trying, and who hears about it.
///
/// The `with_*` methods return a modified copy and leave `self` untouched.
/// A policy holds no per-run state and can be shared across tasks; every
/// invocation of a wrapped operation gets its own backoff sequence and budget.
///
/// # Example
///
/// ```rust,no_run
/// use ferry_core::retry::RetryPolicy;
/// use std::io;
/// use std::time::Duration;
///
/// async fn example() -> Result<String, ferry_core::retry::RetryError<io::Error>> {
///     let policy = RetryPolicy::new()
///         .with_predicate(|e: &io::Error| e.kind() == io::ErrorKind::ConnectionReset)
///         .with_timeout(Some(Duration::from_secs(30)));
///
///     policy.call(|| async { Ok("pong".to_string()) }).await
/// }
/// ```
pub struct RetryPolicy<E> {
    predicate: Arc<dyn RetryPredicate<E>>,
    backoff: ExponentialBackoff,
    timeout: Option<Duration>,
    on_error: Option<ErrorHook<E>>,
    observer: Arc<dyn RetryObserver>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            backoff: self.backoff,
            timeout: self.timeout,
            on_error: self.on_error.clone(),
            observer: Arc::clone(&self.observer),
        }
    }
}

impl<E: 'static> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self {
            predicate: Arc::new(AlwaysRetry),
            backoff: ExponentialBackoff::default(),
            timeout: Some(DEFAULT_TIMEOUT),
            on_error: None,
            observer: Arc::new(TracingObserver::default()),
        }
    }
}

impl<E: 'static> RetryPolicy<E> {
    /// Retry every error, 1s initial delay doubling up to 60s, for at most 120s.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a policy from the `[retry]` config section; the predicate stays
    /// at its default.
    pub fn from_config(config: &RetryConfig) -> Result<Self, ConfigError> {
        Ok(Self::new()
            .with_backoff(config.backoff()?)
            .with_timeout(config.timeout()?))
    }

    /// Copy with a new overall timeout. `None` (or zero) retries without limit.
    pub fn with_timeout(&self, timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    /// Copy with a new failure classifier.
    pub fn with_predicate<P>(&self, predicate: P) -> Self
    where
        P: RetryPredicate<E> + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            ..self.clone()
        }
    }

    /// Copy with the given backoff parameters replaced; `None` keeps the
    /// current value. The merged parameters are validated as a whole.
    pub fn with_delay(
        &self,
        initial: Option<Duration>,
        maximum: Option<Duration>,
        multiplier: Option<f64>,
    ) -> Result<Self, ConfigError> {
        let backoff = ExponentialBackoff::new(
            initial.unwrap_or(self.backoff.initial()),
            maximum.unwrap_or(self.backoff.maximum()),
            multiplier.unwrap_or(self.backoff.multiplier()),
        )?;
        Ok(self.with_backoff(backoff))
    }

    /// Copy with a whole new backoff.
    pub fn with_backoff(&self, backoff: ExponentialBackoff) -> Self {
        Self {
            backoff,
            ..self.clone()
        }
    }

    /// Copy with a hook invoked for every retryable failure. An error returned
    /// by the hook ends the run as [`RetryError::Hook`].
    pub fn with_on_error<H>(&self, hook: H) -> Self
    where
        H: Fn(&AttemptError<E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        Self {
            on_error: Some(Arc::new(hook)),
            ..self.clone()
        }
    }

    /// Copy with a different event sink.
    pub fn with_observer(&self, observer: Arc<dyn RetryObserver>) -> Self {
        Self {
            observer,
            ..self.clone()
        }
    }
}

impl<E> RetryPolicy<E> {
    pub fn predicate(&self) -> &dyn RetryPredicate<E> {
        &*self.predicate
    }

    pub fn backoff(&self) -> ExponentialBackoff {
        self.backoff
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn on_error(&self) -> Option<&ErrorHook<E>> {
        self.on_error.as_ref()
    }

    pub fn observer(&self) -> &dyn RetryObserver {
        &*self.observer
    }
}

impl<E: fmt::Display + 'static> RetryPolicy<E> {
    /// Run `target` once under this policy.
    pub async fn call<F, Fut, T>(&self, target: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        retry_call(
            target,
            &*self.predicate,
            self.backoff.delays(),
            self.timeout,
            self.on_error.as_ref(),
            &*self.observer,
        )
        .await
    }

    /// Open a streaming run over `factory` under this policy.
    pub fn stream<F, S>(&self, factory: F) -> RetryStream<F, S, Delays>
    where
        F: FnMut() -> S,
        S: AttemptStream<Error = E>,
        S::Item: 'static,
    {
        let markers = self.on_error.clone().map(observe_only);
        self.open_stream(factory, markers)
    }

    /// Wrap a single-result operation. Each [`RetryingCall::call`] is an
    /// independent run.
    pub fn wrap_call<F, Fut, T>(&self, target: F) -> RetryingCall<F, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        RetryingCall {
            policy: self.clone(),
            target,
        }
    }

    /// Wrap a stream factory. Each [`RetryingStream::open`] is an independent run.
    pub fn wrap_stream<F, S>(&self, factory: F) -> RetryingStream<F, S>
    where
        F: Fn() -> S,
        S: AttemptStream<Error = E>,
        S::Item: 'static,
    {
        let markers = self.on_error.clone().map(observe_only);
        RetryingStream {
            policy: self.clone(),
            factory: Arc::new(factory),
            markers,
        }
    }

    /// Like [`wrap_stream`](Self::wrap_stream), but every `Some` returned by
    /// `hook` for a retryable failure is yielded to the consumer before the
    /// stream is restarted. Replaces the policy's own error hook for these runs.
    pub fn wrap_stream_with_markers<F, S, H>(&self, factory: F, hook: H) -> RetryingStream<F, S>
    where
        F: Fn() -> S,
        S: AttemptStream<Error = E>,
        H: Fn(&AttemptError<E>) -> Result<Option<S::Item>, HookError> + Send + Sync + 'static,
    {
        RetryingStream {
            policy: self.clone(),
            factory: Arc::new(factory),
            markers: Some(Arc::new(hook)),
        }
    }

    fn open_stream<F, S>(
        &self,
        factory: F,
        markers: Option<MarkerHook<E, S::Item>>,
    ) -> RetryStream<F, S, Delays>
    where
        F: FnMut() -> S,
        S: AttemptStream<Error = E>,
    {
        RetryStream::new(
            factory,
            Arc::clone(&self.predicate),
            self.backoff.delays(),
            self.timeout,
            markers,
            Arc::clone(&self.observer),
        )
    }
}

/// Turn an observational hook into a streaming hook that never yields.
fn observe_only<E: 'static, T: 'static>(hook: ErrorHook<E>) -> MarkerHook<E, T> {
    Arc::new(move |failure: &AttemptError<E>| hook(failure).map(|()| None))
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("backoff", &self.backoff)
            .field("timeout", &self.timeout)
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

impl<E> fmt::Display for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<RetryPolicy initial={:.1}s, maximum={:.1}s, multiplier={:.1}, timeout=",
            self.backoff.initial().as_secs_f64(),
            self.backoff.maximum().as_secs_f64(),
            self.backoff.multiplier(),
        )?;
        match self.timeout {
            Some(t) => write!(f, "{:.1}s", t.as_secs_f64())?,
            None => write!(f, "none")?,
        }
        write!(
            f,
            ", on_error={}>",
            if self.on_error.is_some() { "set" } else { "none" }
        )
    }
}

/// A single-result operation bound to a retry policy.
pub struct RetryingCall<F, E> {
    policy: RetryPolicy<E>,
    target: F,
}

impl<F, Fut, T, E> RetryingCall<F, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display + 'static,
{
    /// Run the operation with a fresh backoff sequence and budget.
    pub async fn call(&self) -> Result<T, RetryError<E>> {
        self.policy.call(|| (self.target)()).await
    }

    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }
}

/// A stream factory bound to a retry policy.
pub struct RetryingStream<F, S>
where
    S: AttemptStream,
{
    policy: RetryPolicy<S::Error>,
    factory: Arc<F>,
    markers: Option<MarkerHook<S::Error, S::Item>>,
}

impl<F, S> RetryingStream<F, S>
where
    F: Fn() -> S,
    S: AttemptStream,
    S::Error: fmt::Display + 'static,
{
    /// Start a new run with a fresh backoff sequence and budget.
    pub fn open(&self) -> RetryStream<impl FnMut() -> S, S, Delays> {
        let factory = Arc::clone(&self.factory);
        self.policy
            .open_stream(move || factory(), self.markers.clone())
    }

    pub fn policy(&self) -> &RetryPolicy<S::Error> {
        &self.policy
    }
}
