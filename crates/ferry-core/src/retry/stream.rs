//! Retry driver for streaming operations.
//!
//! A [`RetryStream`] presents one continuous sequence to its consumer while
//! underneath it opens an [`AttemptStream`] from a factory, forwards its items,
//! and on a retryable failure closes it, backs off and opens a fresh one. The
//! new stream starts from its own beginning; resuming mid-sequence is the
//! factory's business.
//!
//! The consumer drives the run with three requests (next, close, throw) that
//! are dispatched through an explicit state machine:
//!
//! ```text
//! Starting -> Forwarding -> RetryWait -> Starting
//!                        \-> Closed | Failed
//! ```
//!
//! At most one underlying stream is alive at a time, and it is closed before a
//! replacement is opened and before the run ends. A run that is dropped
//! mid-stream drops the active stream without closing it.

use std::fmt::Display;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use tokio::time::Instant;

use super::budget::Budget;
use super::error::{AttemptError, MarkerHook, RetryError};
use super::observer::{notify_deadline, RetryObserver};
use super::predicate::RetryPredicate;

/// One underlying stream instance, as produced by a factory.
///
/// Besides pulling items it can be closed early by the consumer and can
/// receive an error injected by the consumer.
#[async_trait]
pub trait AttemptStream: Send {
    type Item: Send;
    type Error: Send;

    /// The next item, an error, or `None` once exhausted.
    async fn next(&mut self) -> Option<Result<Self::Item, Self::Error>>;

    /// Release the underlying resource. Called at most once per instance.
    ///
    /// Skipped when the run is dropped while this stream is active, so anything
    /// that must not leak has to be released on `Drop` too.
    async fn close(&mut self) {}

    /// React to an error injected by the consumer. `Ok(())` means the error was
    /// handled and the stream keeps producing; an error that comes back ends
    /// the run. The default hands the injected error straight back.
    async fn inject(&mut self, error: Self::Error) -> Result<(), Self::Error> {
        Err(error)
    }
}

/// Adapts any `futures::Stream` of results into an [`AttemptStream`].
///
/// Closing drops nothing early; the inner stream is released when the adapter
/// is dropped right after.
#[derive(Debug)]
pub struct FromStream<S>(pub S);

#[async_trait]
impl<S, T, E> AttemptStream for FromStream<S>
where
    S: Stream<Item = Result<T, E>> + Unpin + Send,
    T: Send,
    E: Send,
{
    type Item = T;
    type Error = E;

    async fn next(&mut self) -> Option<Result<T, E>> {
        self.0.next().await
    }
}

enum State<S> {
    Starting,
    Forwarding(S),
    RetryWait,
    Closed,
    Failed,
}

impl<S> State<S> {
    fn name(&self) -> &'static str {
        match self {
            State::Starting => "starting",
            State::Forwarding(_) => "forwarding",
            State::RetryWait => "retry-wait",
            State::Closed => "closed",
            State::Failed => "failed",
        }
    }
}

enum Event<E> {
    NextRequested,
    CloseRequested,
    ErrorInjected(E),
}

enum Reply<T, E> {
    Item(T),
    Done,
    Failed(RetryError<E>),
}

/// Consumer handle of a streaming retry run.
///
/// Not restartable: once closed or failed, `next` keeps returning `None`.
/// Dropping the handle, or an [`into_stream`](Self::into_stream) adapter cut
/// short by `take` and friends, drops the active underlying stream without
/// calling [`AttemptStream::close`]. Call [`close`](Self::close) first when
/// the release must run.
pub struct RetryStream<F, S, I>
where
    S: AttemptStream,
{
    factory: F,
    predicate: Arc<dyn RetryPredicate<S::Error>>,
    delays: I,
    budget: Budget<S::Error>,
    on_error: Option<MarkerHook<S::Error, S::Item>>,
    observer: Arc<dyn RetryObserver>,
    state: State<S>,
    attempt: u32,
    started: Instant,
}

impl<F, S, I> RetryStream<F, S, I>
where
    F: FnMut() -> S,
    S: AttemptStream,
    S::Error: Display,
    I: Iterator<Item = Duration>,
{
    /// Build a run. Nothing is opened until the first [`next`](Self::next).
    pub fn new(
        factory: F,
        predicate: Arc<dyn RetryPredicate<S::Error>>,
        delays: I,
        timeout: Option<Duration>,
        on_error: Option<MarkerHook<S::Error, S::Item>>,
        observer: Arc<dyn RetryObserver>,
    ) -> Self {
        Self {
            factory,
            predicate,
            delays,
            budget: Budget::new(timeout),
            on_error,
            observer,
            state: State::Starting,
            attempt: 0,
            started: Instant::now(),
        }
    }

    /// Pull the next item, transparently restarting the underlying stream on
    /// retryable failures.
    pub async fn next(&mut self) -> Option<Result<S::Item, RetryError<S::Error>>> {
        match self.dispatch(Event::NextRequested).await {
            Reply::Item(item) => Some(Ok(item)),
            Reply::Done => None,
            Reply::Failed(err) => Some(Err(err)),
        }
    }

    /// End the run early, closing the active underlying stream.
    pub async fn close(&mut self) {
        self.dispatch(Event::CloseRequested).await;
    }

    /// Inject `error` into the active underlying stream.
    ///
    /// If the stream handles it, the run carries on with the same stream and
    /// `Ok(())` is returned. An error it hands back closes the stream, ends the
    /// run and is returned as [`RetryError::Fatal`] without consulting the
    /// predicate. With no active stream the injected error itself is returned.
    pub async fn throw(&mut self, error: S::Error) -> Result<(), RetryError<S::Error>> {
        match self.dispatch(Event::ErrorInjected(error)).await {
            Reply::Failed(err) => Err(err),
            Reply::Item(_) | Reply::Done => Ok(()),
        }
    }

    /// True once the run is closed or failed.
    pub fn is_terminated(&self) -> bool {
        matches!(self.state, State::Closed | State::Failed)
    }

    /// Attempts started so far (underlying streams opened).
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Adapt into a `futures::Stream`. The underlying stream is closed when
    /// the run ends on its own, not when the adapter is dropped early.
    pub fn into_stream(self) -> impl Stream<Item = Result<S::Item, RetryError<S::Error>>> {
        futures::stream::unfold(self, |mut this| async move {
            let item = this.next().await?;
            Some((item, this))
        })
    }

    async fn dispatch(&mut self, event: Event<S::Error>) -> Reply<S::Item, S::Error> {
        match event {
            Event::NextRequested => self.advance().await,
            Event::CloseRequested => {
                if !self.is_terminated() {
                    tracing::debug!(state = self.state.name(), "stream closed by consumer");
                    self.release(State::Closed).await;
                }
                Reply::Done
            }
            Event::ErrorInjected(error) => self.inject(error).await,
        }
    }

    async fn advance(&mut self) -> Reply<S::Item, S::Error> {
        loop {
            match &mut self.state {
                State::Closed | State::Failed => return Reply::Done,
                State::Starting => {
                    self.attempt += 1;
                    tracing::trace!(attempt = self.attempt, "opening stream");
                    self.state = State::Forwarding((self.factory)());
                }
                State::RetryWait => match self.wait().await {
                    Ok(()) => self.state = State::Starting,
                    Err(err) => {
                        self.state = State::Failed;
                        return Reply::Failed(err);
                    }
                },
                State::Forwarding(stream) => {
                    if let Err(err) = self.budget.ensure_open() {
                        self.release(State::Failed).await;
                        return Reply::Failed(notify_deadline(&*self.observer, self.attempt, err));
                    }

                    let failure = match self.budget.timed(stream.next()).await {
                        Ok(Some(Ok(item))) => return Reply::Item(item),
                        Ok(None) => {
                            self.release(State::Closed).await;
                            self.observer.on_success(self.attempt, self.started.elapsed());
                            return Reply::Done;
                        }
                        Ok(Some(Err(error))) => {
                            self.release(State::RetryWait).await;
                            if !self.predicate.should_retry(&error) {
                                self.state = State::Failed;
                                self.observer.on_fatal(self.attempt, &error);
                                return Reply::Failed(RetryError::Fatal(error));
                            }
                            AttemptError::Failed(error)
                        }
                        Err(bound) => {
                            self.release(State::RetryWait).await;
                            AttemptError::TimedOut { after: bound }
                        }
                    };

                    let marker = match &self.on_error {
                        Some(hook) => match hook(&failure) {
                            Ok(marker) => marker,
                            Err(err) => {
                                self.state = State::Failed;
                                return Reply::Failed(RetryError::Hook(err));
                            }
                        },
                        None => None,
                    };
                    self.budget.record(failure);
                    if let Some(marker) = marker {
                        return Reply::Item(marker);
                    }
                }
            }
        }
    }

    async fn inject(&mut self, error: S::Error) -> Reply<S::Item, S::Error> {
        match mem::replace(&mut self.state, State::Failed) {
            State::Forwarding(mut stream) => match stream.inject(error).await {
                Ok(()) => {
                    tracing::debug!(attempt = self.attempt, "injected error handled by stream");
                    self.state = State::Forwarding(stream);
                    Reply::Done
                }
                Err(err) => {
                    stream.close().await;
                    Reply::Failed(RetryError::Fatal(err))
                }
            },
            _ => Reply::Failed(RetryError::Fatal(error)),
        }
    }

    async fn wait(&mut self) -> Result<(), RetryError<S::Error>> {
        let delay = self.delays.next().ok_or(RetryError::SleepExhausted)?;
        let delay = self
            .budget
            .clip_sleep(delay)
            .map_err(|err| notify_deadline(&*self.observer, self.attempt, err))?;

        if let Some(failure) = self.budget.last_error() {
            self.observer.on_retry(self.attempt, failure, delay);
            tracing::debug!(
                attempt = self.attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying due to {}, sleeping {:.1}s ...",
                failure,
                delay.as_secs_f64()
            );
        }
        self.budget.sleep(delay).await;
        Ok(())
    }

    /// Move to `next`, closing the active stream if there is one.
    async fn release(&mut self, next: State<S>) {
        if let State::Forwarding(mut stream) = mem::replace(&mut self.state, next) {
            stream.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::backoff::ExponentialBackoff;
    use crate::retry::error::HookError;
    use crate::retry::observer::StatsObserver;
    use crate::retry::predicate::AlwaysRetry;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Transient(&'static str),
        Permanent(&'static str),
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient(m) => write!(f, "transient: {}", m),
                TestError::Permanent(m) => write!(f, "permanent: {}", m),
            }
        }
    }

    fn is_transient(e: &TestError) -> bool {
        matches!(e, TestError::Transient(_))
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Step {
        Value(u32),
        Fail(TestError),
        Hang,
    }

    /// Event log shared by all scripted streams of one test.
    #[derive(Default)]
    struct Journal(Mutex<Vec<String>>);

    impl Journal {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.entries().iter().filter(|e| e.starts_with(prefix)).count()
        }
    }

    struct Scripted {
        id: usize,
        steps: VecDeque<Step>,
        journal: Arc<Journal>,
        swallow_injected: bool,
    }

    #[async_trait]
    impl AttemptStream for Scripted {
        type Item = u32;
        type Error = TestError;

        async fn next(&mut self) -> Option<Result<u32, TestError>> {
            match self.steps.pop_front()? {
                Step::Value(v) => Some(Ok(v)),
                Step::Fail(e) => Some(Err(e)),
                Step::Hang => {
                    std::future::pending::<()>().await;
                    None
                }
            }
        }

        async fn close(&mut self) {
            self.journal.push(format!("close {}", self.id));
        }

        async fn inject(&mut self, error: TestError) -> Result<(), TestError> {
            self.journal.push(format!("inject {}", self.id));
            if self.swallow_injected {
                Ok(())
            } else {
                Err(error)
            }
        }
    }

    /// Scripted stream that also journals being dropped.
    struct DropLogged(Scripted);

    impl Drop for DropLogged {
        fn drop(&mut self) {
            self.0.journal.push(format!("drop {}", self.0.id));
        }
    }

    #[async_trait]
    impl AttemptStream for DropLogged {
        type Item = u32;
        type Error = TestError;

        async fn next(&mut self) -> Option<Result<u32, TestError>> {
            self.0.next().await
        }

        async fn close(&mut self) {
            self.0.close().await
        }
    }

    fn drop_logged_run(
        scripts: Vec<Vec<Step>>,
        journal: &Arc<Journal>,
    ) -> RetryStream<impl FnMut() -> DropLogged, DropLogged, crate::retry::backoff::Delays> {
        let mut open = factory(scripts, Arc::clone(journal), false);
        RetryStream::new(
            move || DropLogged(open()),
            Arc::new(is_transient),
            delays(),
            None,
            None,
            Arc::new(StatsObserver::new()),
        )
    }

    /// Factory handing out one scripted stream per attempt.
    fn factory(
        scripts: Vec<Vec<Step>>,
        journal: Arc<Journal>,
        swallow_injected: bool,
    ) -> impl FnMut() -> Scripted {
        let mut scripts: VecDeque<Vec<Step>> = scripts.into();
        let mut id = 0;
        move || {
            id += 1;
            journal.push(format!("open {}", id));
            Scripted {
                id,
                steps: scripts.pop_front().unwrap_or_default().into(),
                journal: Arc::clone(&journal),
                swallow_injected,
            }
        }
    }

    fn delays() -> crate::retry::backoff::Delays {
        ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60), 2.0)
            .unwrap()
            .delays()
    }

    fn run(
        scripts: Vec<Vec<Step>>,
        journal: &Arc<Journal>,
        timeout: Option<Duration>,
        on_error: Option<MarkerHook<TestError, u32>>,
    ) -> RetryStream<impl FnMut() -> Scripted, Scripted, crate::retry::backoff::Delays> {
        RetryStream::new(
            factory(scripts, Arc::clone(journal), false),
            Arc::new(is_transient),
            delays(),
            timeout,
            on_error,
            Arc::new(StatsObserver::new()),
        )
    }

    async fn drain<F, I>(stream: &mut RetryStream<F, Scripted, I>) -> Vec<Result<u32, String>>
    where
        F: FnMut() -> Scripted,
        I: Iterator<Item = Duration>,
    {
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.map_err(|e| e.to_string()));
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn restarts_after_transient_failure_and_closes_first_stream_before_second() {
        let journal = Arc::new(Journal::default());
        let mut stream = run(
            vec![
                vec![
                    Step::Value(1),
                    Step::Value(2),
                    Step::Fail(TestError::Transient("reset")),
                ],
                vec![Step::Value(3)],
            ],
            &journal,
            None,
            None,
        );

        let started = Instant::now();
        assert_eq!(drain(&mut stream).await, vec![Ok(1), Ok(2), Ok(3)]);
        assert_eq!(
            journal.entries(),
            vec!["open 1", "close 1", "open 2", "close 2"]
        );
        assert_eq!(started.elapsed(), Duration::from_secs(1));
        assert_eq!(stream.attempts(), 2);
        assert!(stream.is_terminated());
    }

    #[tokio::test(start_paused = true)]
    async fn consumer_close_closes_active_stream_exactly_once() {
        let journal = Arc::new(Journal::default());
        let mut stream = run(
            vec![vec![Step::Value(1), Step::Value(2), Step::Value(3)]],
            &journal,
            None,
            None,
        );

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        stream.close().await;
        stream.close().await;

        assert!(stream.next().await.is_none());
        assert_eq!(journal.count("close"), 1);
        assert_eq!(journal.count("open"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_ends_the_run_with_the_original_error() {
        let journal = Arc::new(Journal::default());
        let mut stream = run(
            vec![
                vec![Step::Value(1), Step::Fail(TestError::Permanent("bad request"))],
                vec![Step::Value(2)],
            ],
            &journal,
            None,
            None,
        );

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.into_fatal(), Some(TestError::Permanent("bad request")));
        assert!(stream.next().await.is_none());
        assert_eq!(journal.entries(), vec!["open 1", "close 1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_pull_is_retried_until_the_deadline() {
        let journal = Arc::new(Journal::default());
        let mut stream = run(
            vec![vec![Step::Value(1), Step::Hang]],
            &journal,
            Some(Duration::from_secs(5)),
            None,
        );

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.is_deadline_exceeded());
        assert!(err.last_error().unwrap().is_timeout());
        assert_eq!(journal.entries(), vec!["open 1", "close 1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_counts_only_pulls_and_sleeps() {
        let journal = Arc::new(Journal::default());
        let mut stream = run(
            vec![
                vec![Step::Fail(TestError::Transient("a"))],
                vec![Step::Fail(TestError::Transient("b"))],
                vec![Step::Fail(TestError::Transient("c"))],
            ],
            &journal,
            Some(Duration::from_secs(4)),
            None,
        );

        // 1s then 2s fit in 4s; the 4s sleep does not.
        let out = drain(&mut stream).await;
        assert_eq!(out, vec![Err("timeout of 4.0s exceeded".to_string())]);
        assert_eq!(journal.count("open"), 3);
        assert_eq!(journal.count("close"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn consumer_time_between_pulls_is_not_charged() {
        let journal = Arc::new(Journal::default());
        let mut stream = run(
            vec![
                vec![Step::Value(1), Step::Fail(TestError::Transient("reset"))],
                vec![Step::Value(2)],
            ],
            &journal,
            Some(Duration::from_secs(2)),
            None,
        );

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert_eq!(stream.next().await.unwrap().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn marker_hook_values_are_surfaced_between_attempts() {
        let journal = Arc::new(Journal::default());
        let hook: MarkerHook<TestError, u32> =
            Arc::new(|_failure: &AttemptError<TestError>| -> Result<Option<u32>, HookError> {
                Ok(Some(0))
            });
        let mut stream = run(
            vec![
                vec![Step::Value(1), Step::Fail(TestError::Transient("reset"))],
                vec![Step::Value(2)],
            ],
            &journal,
            None,
            Some(hook),
        );

        assert_eq!(drain(&mut stream).await, vec![Ok(1), Ok(0), Ok(2)]);
        // The failed stream is already closed when the marker is yielded.
        assert_eq!(
            journal.entries(),
            vec!["open 1", "close 1", "open 2", "close 2"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failing_marker_hook_ends_the_run() {
        let journal = Arc::new(Journal::default());
        let hook: MarkerHook<TestError, u32> =
            Arc::new(|_failure: &AttemptError<TestError>| -> Result<Option<u32>, HookError> {
                Err("hook refused".into())
            });
        let mut stream = run(
            vec![vec![Step::Fail(TestError::Transient("reset"))]],
            &journal,
            None,
            Some(hook),
        );

        assert!(stream.next().await.unwrap().unwrap_err().is_hook());
        assert!(stream.next().await.is_none());
        assert_eq!(journal.entries(), vec!["open 1", "close 1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn injected_error_reaches_the_stream_and_ends_the_run() {
        let journal = Arc::new(Journal::default());
        let mut stream = run(
            vec![vec![Step::Value(1), Step::Value(2)]],
            &journal,
            None,
            None,
        );

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        let err = stream
            .throw(TestError::Transient("consumer gave up"))
            .await
            .unwrap_err();

        // Not retried even though the predicate would accept it.
        assert_eq!(err.into_fatal(), Some(TestError::Transient("consumer gave up")));
        assert_eq!(journal.entries(), vec!["open 1", "inject 1", "close 1"]);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stream_may_absorb_injected_error() {
        let journal = Arc::new(Journal::default());
        let mut stream = RetryStream::new(
            factory(vec![vec![Step::Value(1), Step::Value(2)]], Arc::clone(&journal), true),
            Arc::new(AlwaysRetry),
            delays(),
            None,
            None,
            Arc::new(StatsObserver::new()),
        );

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        assert!(stream.throw(TestError::Permanent("stop")).await.is_ok());
        assert!(!stream.is_terminated());
        assert_eq!(journal.entries(), vec!["open 1", "inject 1"]);

        // Same stream, picked up where it left off.
        assert_eq!(stream.next().await.unwrap().unwrap(), 2);
        assert!(stream.next().await.is_none());
        assert_eq!(stream.attempts(), 1);
        assert_eq!(journal.entries(), vec!["open 1", "inject 1", "close 1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_a_run_mid_stream_drops_the_active_stream_unclosed() {
        let journal = Arc::new(Journal::default());
        let mut stream = drop_logged_run(
            vec![vec![Step::Value(1), Step::Value(2)]],
            &journal,
        );

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        drop(stream);
        assert_eq!(journal.entries(), vec!["open 1", "drop 1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn adapter_cut_short_drops_the_active_stream_unclosed() {
        let journal = Arc::new(Journal::default());
        let stream = drop_logged_run(
            vec![vec![Step::Value(1), Step::Value(2), Step::Value(3)]],
            &journal,
        );

        let items: Vec<u32> = stream
            .into_stream()
            .take(1)
            .map(|item| item.expect("no terminal error"))
            .collect()
            .await;
        assert_eq!(items, vec![1]);
        assert_eq!(journal.entries(), vec!["open 1", "drop 1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_before_drop_runs_the_release() {
        let journal = Arc::new(Journal::default());
        let mut stream = drop_logged_run(
            vec![vec![Step::Value(1), Step::Value(2)]],
            &journal,
        );

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        stream.close().await;
        drop(stream);
        assert_eq!(journal.entries(), vec!["open 1", "close 1", "drop 1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn throw_before_start_returns_the_error() {
        let journal = Arc::new(Journal::default());
        let mut stream = run(vec![vec![Step::Value(1)]], &journal, None, None);

        let err = stream.throw(TestError::Permanent("early")).await.unwrap_err();
        assert_eq!(err.into_fatal(), Some(TestError::Permanent("early")));
        assert!(journal.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn futures_stream_adapter() {
        let journal = Arc::new(Journal::default());
        let stream = run(
            vec![
                vec![Step::Value(1), Step::Fail(TestError::Transient("reset"))],
                vec![Step::Value(2), Step::Value(3)],
            ],
            &journal,
            None,
            None,
        );

        let items: Vec<u32> = stream
            .into_stream()
            .map(|item| item.expect("no terminal error"))
            .collect()
            .await;
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn from_stream_wraps_plain_streams() {
        let attempts = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&attempts);
        let mut stream = RetryStream::new(
            move || {
                let mut n = counter.lock().unwrap();
                *n += 1;
                let items: Vec<Result<u32, TestError>> = if *n == 1 {
                    vec![Ok(10), Err(TestError::Transient("reset"))]
                } else {
                    vec![Ok(20)]
                };
                FromStream(futures::stream::iter(items))
            },
            Arc::new(is_transient),
            delays(),
            Some(Duration::from_secs(30)),
            None,
            Arc::new(StatsObserver::new()),
        );

        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.unwrap());
        }
        assert_eq!(out, vec![10, 20]);
        assert_eq!(*attempts.lock().unwrap(), 2);
    }
}
