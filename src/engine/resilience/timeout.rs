// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::future::Future;
use std::time::Duration;

use crate::errors::TimeoutError;
use crate::observability::messages::resilience::DeadlineExceeded;
use crate::observability::messages::StructuredLog;

/// Await `future` for at most `after`.
///
/// When the deadline passes first, [`TimeoutError::Elapsed`] is returned with
/// `info` attached. The future is not cancelled: it is moved onto its own task
/// and runs to completion there, and its late outcome is discarded.
pub async fn with_deadline<T, E, Fut>(
    future: Fut,
    after: Duration,
    info: Option<&str>,
) -> Result<T, TimeoutError<E>>
where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let mut pending = Box::pin(future);
    let settled = tokio::time::timeout(after, &mut pending).await;

    match settled {
        Ok(outcome) => outcome.map_err(TimeoutError::Failed),
        Err(_) => {
            DeadlineExceeded { after, info }.log();
            tokio::spawn(async move {
                let _ = pending.await;
            });
            Err(TimeoutError::Elapsed {
                after,
                info: info.map(str::to_string),
            })
        }
    }
}

/// A unit with a time limit applied to every call.
#[derive(Debug, Clone)]
pub struct Timed<F> {
    unit: F,
    after: Duration,
    info: Option<String>,
}

impl<F> Timed<F> {
    /// Attach diagnostic text to the elapsed error.
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn after(&self) -> Duration {
        self.after
    }

    pub async fn call<A, T, E, Fut>(&self, arg: A) -> Result<T, TimeoutError<E>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        with_deadline((self.unit)(arg), self.after, self.info.as_deref()).await
    }

    pub fn into_inner(self) -> F {
        self.unit
    }
}

/// Wrap `unit` so each call fails with [`TimeoutError::Elapsed`] after `after`.
pub fn timeout<F>(unit: F, after: Duration) -> Timed<F> {
    Timed {
        unit,
        after,
        info: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::{sleep, Instant};

    #[tokio::test(start_paused = true)]
    async fn slow_unit_times_out_at_deadline() {
        let slow = timeout(
            |ms: u64| async move {
                sleep(Duration::from_millis(ms)).await;
                Ok::<_, String>(ms)
            },
            Duration::from_millis(50),
        )
        .with_info("fetching profile");
        let began = Instant::now();

        let outcome = slow.call(100).await;

        assert_eq!(began.elapsed(), Duration::from_millis(50));
        assert_eq!(
            outcome,
            Err(TimeoutError::Elapsed {
                after: Duration::from_millis(50),
                info: Some("fetching profile".to_string()),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_unit_still_runs_to_completion() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let slow = timeout(
            move |ms: u64| {
                let flag = flag.clone();
                async move {
                    sleep(Duration::from_millis(ms)).await;
                    flag.store(true, Ordering::SeqCst);
                    Ok::<_, String>(ms)
                }
            },
            Duration::from_millis(50),
        );

        let outcome = slow.call(100).await;

        assert!(outcome.unwrap_err().is_elapsed());
        assert!(!finished.load(Ordering::SeqCst));
        sleep(Duration::from_millis(100)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_unit_passes_through() {
        let fast = timeout(
            |ms: u64| async move {
                sleep(Duration::from_millis(ms)).await;
                if ms == 0 {
                    Err("zero")
                } else {
                    Ok(ms)
                }
            },
            Duration::from_millis(50),
        );

        assert_eq!(fast.call(10).await, Ok(10));
        assert_eq!(fast.call(0).await, Err(TimeoutError::Failed("zero")));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_without_info_displays_duration() {
        let err = with_deadline(
            async {
                sleep(Duration::from_secs(1)).await;
                Ok::<(), String>(())
            },
            Duration::from_millis(5),
            None,
        )
        .await
        .unwrap_err();

        assert!(err.is_elapsed());
        assert_eq!(err.to_string(), "operation timed out after 5ms");
    }
}
