//! Tick scheduler aligned to wall-clock second boundaries.
//!
//! Each tick re-arms a one-shot sleep for the time left in the current
//! second (plus a small epsilon) instead of using a fixed interval, so the
//! seconds digit stays on real seconds and drift never accumulates.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::clock::Clock;

/// Default slack added after each boundary so the tick lands just past it.
pub const DEFAULT_TICK_EPSILON: Duration = Duration::from_millis(20);

/// Sleep needed to land `epsilon` past the next second boundary.
pub fn delay_until_next_second(now_ms: i64, epsilon: Duration) -> Duration {
    let into_second = now_ms.rem_euclid(1000) as u64;
    Duration::from_millis(1000 - into_second) + epsilon
}

/// Owns the background tick task; cancelled on [`stop`](Self::stop) or drop.
#[derive(Debug)]
pub struct TickScheduler {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TickScheduler {
    /// Spawn the tick loop on the current tokio runtime.
    ///
    /// `on_tick` runs once per boundary, never concurrently with itself.
    pub fn spawn<C, F>(clock: C, epsilon: Duration, mut on_tick: F) -> Self
    where
        C: Clock + 'static,
        F: FnMut() + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            tracing::debug!("tick scheduler started");
            loop {
                let delay = delay_until_next_second(clock.now_ms(), epsilon);
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(delay) => {
                        if token.is_cancelled() {
                            break;
                        }
                        on_tick();
                    }
                }
            }
            tracing::debug!("tick scheduler stopped");
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Cancel the pending timer. No new tick starts after this returns; a
    /// tick already running on another worker is not interrupted.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Cancel and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Wall clock that follows tokio's (pausable) clock from a fixed base.
    struct PausedClock {
        base_ms: i64,
        origin: tokio::time::Instant,
    }

    impl PausedClock {
        fn at_ms(base_ms: i64) -> Self {
            Self {
                base_ms,
                origin: tokio::time::Instant::now(),
            }
        }
    }

    impl Clock for PausedClock {
        fn now_ms(&self) -> i64 {
            self.base_ms + self.origin.elapsed().as_millis() as i64
        }
    }

    const T0: i64 = 1_737_779_400_000;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn counting_scheduler(clock: PausedClock, epsilon: Duration) -> (TickScheduler, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let scheduler = TickScheduler::spawn(clock, epsilon, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (scheduler, ticks)
    }

    #[test]
    fn delay_covers_rest_of_second() {
        let eps = Duration::from_millis(5);
        assert_eq!(delay_until_next_second(T0 + 250, eps), Duration::from_millis(755));
        assert_eq!(delay_until_next_second(T0, eps), Duration::from_millis(1005));
        assert_eq!(delay_until_next_second(T0 + 999, eps), Duration::from_millis(6));
    }

    #[test]
    fn delay_handles_pre_epoch_times() {
        assert_eq!(
            delay_until_next_second(-250, Duration::ZERO),
            Duration::from_millis(250)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_aligns_to_second_boundary() {
        let eps = Duration::from_millis(10);
        let (_scheduler, ticks) = counting_scheduler(PausedClock::at_ms(T0 + 250), eps);
        settle().await;

        tokio::time::advance(Duration::from_millis(749)).await;
        settle().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(1) + eps).await;
        settle().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn subsequent_ticks_stay_on_boundaries() {
        let eps = Duration::from_millis(10);
        let (_scheduler, ticks) = counting_scheduler(PausedClock::at_ms(T0 + 250), eps);
        settle().await;

        // 760ms to the first tick, then one per second.
        tokio::time::advance(Duration::from_millis(760)).await;
        settle().await;
        for expected in 2..=4 {
            tokio::time::advance(Duration::from_millis(1000)).await;
            settle().await;
            assert_eq!(ticks.load(Ordering::SeqCst), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_ticks() {
        let (mut scheduler, ticks) =
            counting_scheduler(PausedClock::at_ms(T0), DEFAULT_TICK_EPSILON);
        settle().await;

        tokio::time::advance(Duration::from_millis(1100)).await;
        settle().await;
        let before = ticks.load(Ordering::SeqCst);
        assert_eq!(before, 1);

        scheduler.stop();
        assert!(!scheduler.is_running());
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(1)).await;
            settle().await;
        }
        assert_eq!(ticks.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_scheduler_cancels_timer() {
        let (scheduler, ticks) = counting_scheduler(PausedClock::at_ms(T0), DEFAULT_TICK_EPSILON);
        drop(scheduler);
        tokio::time::advance(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn shutdown_waits_for_task() {
        let (scheduler, _ticks) =
            counting_scheduler(PausedClock::at_ms(T0), DEFAULT_TICK_EPSILON);
        tokio::time::timeout(Duration::from_secs(5), scheduler.shutdown())
            .await
            .expect("scheduler should stop promptly");
    }
}
