//! Time source: local clock plus a learned server offset.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ApiError;

/// A source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;

    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_ms()).unwrap_or_default()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::at_ms(now.timestamp_millis())
    }

    pub fn at_ms(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Learned correction from the local clock to the backend clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClockState {
    pub offset_ms: i64,
    pub synced: bool,
}

/// Local clock corrected by the last successful sync.
///
/// Offset and synced flag live under one lock and are always written together.
pub struct TimeSource {
    clock: Arc<dyn Clock>,
    state: Mutex<ClockState>,
}

impl TimeSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(ClockState::default()),
        }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Uncorrected local time.
    pub fn local_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn state(&self) -> ClockState {
        *self.lock_state()
    }

    pub fn offset_ms(&self) -> i64 {
        self.state().offset_ms
    }

    pub fn is_synced(&self) -> bool {
        self.state().synced
    }

    /// Record the outcome of one server-time probe.
    ///
    /// `local_at_receipt_ms` is the local clock reading taken when the
    /// response arrived. Failure keeps the previous offset and clears
    /// `synced`. Returns the resulting state.
    pub fn apply_sync(
        &self,
        outcome: Result<DateTime<Utc>, &ApiError>,
        local_at_receipt_ms: i64,
    ) -> ClockState {
        let mut state = self.lock_state();
        match outcome {
            Ok(server_time) => {
                state.offset_ms = server_time.timestamp_millis() - local_at_receipt_ms;
                state.synced = true;
                tracing::info!(offset_ms = state.offset_ms, "clock synced with backend");
            }
            Err(err) => {
                state.synced = false;
                tracing::warn!(error = %err, offset_ms = state.offset_ms, "clock sync failed, keeping local time");
            }
        }
        *state
    }

    fn lock_state(&self) -> MutexGuard<'_, ClockState> {
        // ClockState is plain data; a poisoned guard still holds a consistent value.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for TimeSource {
    fn now_ms(&self) -> i64 {
        self.local_ms() + self.offset_ms()
    }
}

impl std::fmt::Debug for TimeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeSource")
            .field("local_ms", &self.local_ms())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_at(ms: i64) -> (Arc<ManualClock>, TimeSource) {
        let clock = Arc::new(ManualClock::at_ms(ms));
        let source = TimeSource::new(clock.clone());
        (clock, source)
    }

    fn missing_date() -> ApiError {
        ApiError::MissingDate {
            endpoint: "/health".into(),
        }
    }

    #[test]
    fn unsynced_source_reports_local_time() {
        let (_, source) = source_at(1_000_000);
        assert_eq!(source.now_ms(), 1_000_000);
        assert_eq!(source.state(), ClockState::default());
    }

    #[test]
    fn successful_sync_sets_offset_and_flag() {
        let (clock, source) = source_at(1_000_000);
        let server = DateTime::from_timestamp_millis(1_005_000).unwrap();

        let state = source.apply_sync(Ok(server), clock.now_ms());
        assert_eq!(
            state,
            ClockState {
                offset_ms: 5_000,
                synced: true
            }
        );

        clock.advance_ms(250);
        assert_eq!(source.now_ms(), 1_005_250);
    }

    #[test]
    fn failed_sync_keeps_offset_and_clears_flag() {
        let (clock, source) = source_at(1_000_000);
        let server = DateTime::from_timestamp_millis(998_000).unwrap();
        source.apply_sync(Ok(server), clock.now_ms());

        let err = missing_date();
        let state = source.apply_sync(Err(&err), clock.now_ms());
        assert_eq!(state.offset_ms, -2_000);
        assert!(!state.synced);
        assert_eq!(source.now_ms(), 998_000);
    }

    #[test]
    fn failed_first_sync_leaves_defaults() {
        let (clock, source) = source_at(42);
        let err = missing_date();
        let state = source.apply_sync(Err(&err), clock.now_ms());
        assert_eq!(state, ClockState::default());
    }
}
