//! Retry loop for single-result operations.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::budget::Budget;
use super::error::{AttemptError, ErrorHook, RetryError};
use super::observer::{notify_deadline, RetryObserver};
use super::predicate::RetryPredicate;

/// Await `target` until it succeeds, fails with an error `predicate` rejects, or
/// `timeout` runs out.
///
/// Each attempt is bounded by the remaining budget. An attempt cancelled for
/// running over is retried without consulting `predicate`; running out of the
/// whole budget ends the run with [`RetryError::DeadlineExceeded`], chained to
/// the last failure. `on_error` sees every retryable failure before the sleep;
/// an error it returns ends the run immediately.
pub async fn retry_call<F, Fut, T, E, I>(
    mut target: F,
    predicate: &dyn RetryPredicate<E>,
    mut delays: I,
    timeout: Option<Duration>,
    on_error: Option<&ErrorHook<E>>,
    observer: &dyn RetryObserver,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    I: Iterator<Item = Duration>,
{
    let started = Instant::now();
    let mut budget = Budget::new(timeout);
    let mut attempt = 0u32;

    loop {
        budget
            .ensure_open()
            .map_err(|err| notify_deadline(observer, attempt, err))?;

        attempt += 1;
        let failure = match budget.timed(target()).await {
            Ok(Ok(value)) => {
                observer.on_success(attempt, started.elapsed());
                return Ok(value);
            }
            Ok(Err(error)) => {
                if !predicate.should_retry(&error) {
                    observer.on_fatal(attempt, &error);
                    return Err(RetryError::Fatal(error));
                }
                AttemptError::Failed(error)
            }
            Err(bound) => AttemptError::TimedOut { after: bound },
        };

        if let Some(hook) = on_error {
            hook(&failure).map_err(RetryError::Hook)?;
        }
        budget.record(failure);

        let delay = delays.next().ok_or(RetryError::SleepExhausted)?;
        let delay = budget
            .clip_sleep(delay)
            .map_err(|err| notify_deadline(observer, attempt, err))?;

        if let Some(failure) = budget.last_error() {
            observer.on_retry(attempt, failure, delay);
            tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying due to {}, sleeping {:.1}s ...",
                failure,
                delay.as_secs_f64()
            );
        }
        budget.sleep(delay).await;
    }
}
