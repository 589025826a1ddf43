// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::config::consts::{DEFAULT_RETRY_INTERVAL_MS, DEFAULT_RETRY_TIMES};
use crate::engine::defer::next_turn;
use crate::errors::ConfigError;
use crate::observability::messages::resilience::{RetriesExhausted, RetryScheduled};
use crate::observability::messages::StructuredLog;

type Backoff = Arc<dyn Fn(u32) -> Duration + Send + Sync>;
type ErrorFilter<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Delay between a failed attempt and the next one.
#[derive(Clone)]
pub enum Interval {
    Fixed(Duration),
    /// Computed from the number of the attempt that just failed, starting at 1.
    Computed(Backoff),
}

impl Interval {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Interval::Fixed(delay) => *delay,
            Interval::Computed(backoff) => backoff(attempt),
        }
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            Interval::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// How many attempts [`retry`] makes and how long it waits between them.
///
/// ```rust
/// use std::time::Duration;
/// use the_cadence::engine::resilience::RetryOptions;
///
/// let options = RetryOptions::<String>::new(3)
///     .unwrap()
///     .with_backoff(|attempt| Duration::from_millis(10 * 2u64.pow(attempt)))
///     .with_error_filter(|error| error.contains("transient"));
///
/// assert_eq!(options.times(), 3);
/// assert_eq!(options.delay_for(2), Duration::from_millis(40));
/// assert!(!options.should_retry(&"fatal".to_string()));
/// ```
pub struct RetryOptions<E> {
    times: u32,
    interval: Interval,
    error_filter: Option<ErrorFilter<E>>,
}

impl<E> RetryOptions<E> {
    /// At most `times` attempts in total. Zero attempts is rejected.
    pub fn new(times: u32) -> Result<Self, ConfigError> {
        if times == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(Self {
            times,
            ..Self::default()
        })
    }

    pub fn with_interval(mut self, delay: Duration) -> Self {
        self.interval = Interval::Fixed(delay);
        self
    }

    pub fn with_backoff(mut self, backoff: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        self.interval = Interval::Computed(Arc::new(backoff));
        self
    }

    /// Only errors for which `filter` returns `true` are retried.
    pub fn with_error_filter(mut self, filter: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.error_filter = Some(Arc::new(filter));
        self
    }

    pub fn times(&self) -> u32 {
        self.times
    }

    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.interval.delay_for(attempt)
    }

    pub fn should_retry(&self, error: &E) -> bool {
        self.error_filter.as_ref().map_or(true, |filter| filter(error))
    }
}

impl<E> Default for RetryOptions<E> {
    fn default() -> Self {
        Self {
            times: DEFAULT_RETRY_TIMES,
            interval: Interval::Fixed(Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS)),
            error_filter: None,
        }
    }
}

impl<E> Clone for RetryOptions<E> {
    fn clone(&self) -> Self {
        Self {
            times: self.times,
            interval: self.interval.clone(),
            error_filter: self.error_filter.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("times", &self.times)
            .field("interval", &self.interval)
            .field("error_filter", &self.error_filter.is_some())
            .finish()
    }
}

/// Run `unit` until it succeeds, the error filter refuses, or the attempts run out.
///
/// The last attempt's error is returned. A zero interval still waits one
/// scheduling turn between attempts.
pub async fn retry<T, E, F, Fut>(options: &RetryOptions<E>, mut unit: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        let error = match unit().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let retryable = options.should_retry(&error);
        if attempt >= options.times || !retryable {
            RetriesExhausted {
                attempts: attempt,
                retryable,
            }
            .log();
            return Err(error);
        }

        let delay = options.delay_for(attempt);
        RetryScheduled {
            attempt,
            times: options.times,
            delay,
        }
        .log();

        if delay.is_zero() {
            next_turn().await;
        } else {
            sleep(delay).await;
        }
        attempt += 1;
    }
}

/// A unit that retries itself on every [`call`](Retryable::call).
#[derive(Debug, Clone)]
pub struct Retryable<E, F> {
    options: RetryOptions<E>,
    unit: F,
}

impl<E, F> Retryable<E, F> {
    pub async fn call<A, T, Fut>(&self, arg: A) -> Result<T, E>
    where
        A: Clone,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        retry(&self.options, || (self.unit)(arg.clone())).await
    }

    pub fn options(&self) -> &RetryOptions<E> {
        &self.options
    }
}

pub fn retryable<E, F>(options: RetryOptions<E>, unit: F) -> Retryable<E, F> {
    Retryable { options, unit }
}
