use std::time::Duration;

use super::error::ConfigError;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
/// Default upper bound on any single delay.
pub const DEFAULT_MAXIMUM_DELAY: Duration = Duration::from_secs(60);
/// Default growth factor between consecutive delays.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Exponential backoff parameters.
///
/// Delays start at `initial` and grow by `multiplier` on every retry, capped at
/// `maximum`. No jitter is applied; callers wanting jitter wrap [`Delays`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    initial: Duration,
    maximum: Duration,
    multiplier: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_DELAY,
            maximum: DEFAULT_MAXIMUM_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl ExponentialBackoff {
    /// Validate and build backoff parameters.
    ///
    /// Requires `initial > 0`, a finite `multiplier >= 1.0`, and `maximum >= initial`.
    pub fn new(initial: Duration, maximum: Duration, multiplier: f64) -> Result<Self, ConfigError> {
        if initial.is_zero() {
            return Err(ConfigError::ZeroInitialDelay);
        }
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ConfigError::InvalidMultiplier(multiplier));
        }
        if maximum < initial {
            return Err(ConfigError::MaximumBelowInitial { initial, maximum });
        }
        Ok(Self {
            initial,
            maximum,
            multiplier,
        })
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn maximum(&self) -> Duration {
        self.maximum
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// A fresh delay sequence starting at `initial`.
    pub fn delays(&self) -> Delays {
        Delays {
            next: self.initial,
            maximum: self.maximum,
            multiplier: self.multiplier,
        }
    }
}

/// Infinite sequence of backoff delays. Never returns `None`.
#[derive(Debug, Clone)]
pub struct Delays {
    next: Duration,
    maximum: Duration,
    multiplier: f64,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = scale(current, self.multiplier).min(self.maximum);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

/// `delay * multiplier`, rounded to the nanosecond; saturates instead of overflowing.
fn scale(delay: Duration, multiplier: f64) -> Duration {
    let nanos = (delay.as_nanos() as f64 * multiplier).round();
    if nanos >= u64::MAX as f64 {
        Duration::MAX
    } else {
        Duration::from_nanos(nanos as u64)
    }
}
