//! Phase calculator.
//!
//! Pure functions of `(now, window)`: no clock reads, no side effects. The
//! engine and the CLI both derive everything they display from
//! [`compute_phase`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::window::EventWindow;

const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_MINUTE: u64 = 60;

/// Lifecycle stage of the event window.
///
/// ```text
/// Pre -> Live -> Ended
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pre,
    Live,
    Ended,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Live => "live",
            Phase::Ended => "ended",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Days/hours/minutes/seconds left until the event starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemainingDuration {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl RemainingDuration {
    pub const ZERO: Self = Self {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Split a second count; negative input clamps to zero.
    pub fn from_secs(total: i64) -> Self {
        let s = total.max(0) as u64;
        Self {
            days: s / SECS_PER_DAY,
            hours: (s % SECS_PER_DAY) / SECS_PER_HOUR,
            minutes: (s % SECS_PER_HOUR) / SECS_PER_MINUTE,
            seconds: s % SECS_PER_MINUTE,
        }
    }

    pub fn total_secs(&self) -> u64 {
        self.days * SECS_PER_DAY
            + self.hours * SECS_PER_HOUR
            + self.minutes * SECS_PER_MINUTE
            + self.seconds
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl std::fmt::Display for RemainingDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}d {:02}h {:02}m {:02}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Countdown banner shown while the event has not started yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownNotice {
    UnderOneDay,
    UnderOneHour,
    UnderOneMinute,
}

impl CountdownNotice {
    /// Tightest threshold `secs_to_start` has crossed, if any.
    pub fn for_secs_to_start(secs_to_start: i64) -> Option<Self> {
        match secs_to_start {
            s if s <= SECS_PER_MINUTE as i64 => Some(Self::UnderOneMinute),
            s if s <= SECS_PER_HOUR as i64 => Some(Self::UnderOneHour),
            s if s <= SECS_PER_DAY as i64 => Some(Self::UnderOneDay),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::UnderOneDay => "Less than 24 hours to go!",
            Self::UnderOneHour => "Starting in less than an hour!",
            Self::UnderOneMinute => "Starting in less than a minute!",
        }
    }
}

/// Whole seconds from `now_ms` to `target_ms`, rounded up.
///
/// Any instant strictly before the target counts as at least one second.
pub fn secs_until(now_ms: i64, target_ms: i64) -> i64 {
    let delta = target_ms.saturating_sub(now_ms);
    delta.div_euclid(1000) + i64::from(delta.rem_euclid(1000) != 0)
}

/// Phase and remaining time at `now_ms` (epoch milliseconds).
pub fn compute_phase_ms(now_ms: i64, window: &EventWindow) -> (Phase, RemainingDuration) {
    let to_start = secs_until(now_ms, window.start_ms());
    let to_end = secs_until(now_ms, window.end_ms());

    if to_start > 0 {
        (Phase::Pre, RemainingDuration::from_secs(to_start))
    } else if to_end > 0 {
        (Phase::Live, RemainingDuration::ZERO)
    } else {
        (Phase::Ended, RemainingDuration::ZERO)
    }
}

/// Phase and remaining time at `now`.
pub fn compute_phase(now: DateTime<Utc>, window: &EventWindow) -> (Phase, RemainingDuration) {
    compute_phase_ms(now.timestamp_millis(), window)
}

/// Notice for `now_ms`; only ever `Some` while the event is upcoming.
pub fn notice_at_ms(now_ms: i64, window: &EventWindow) -> Option<CountdownNotice> {
    let to_start = secs_until(now_ms, window.start_ms());
    if to_start <= 0 {
        return None;
    }
    CountdownNotice::for_secs_to_start(to_start)
}
