//! Live registration counts and their change between refreshes.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of totals kept for the sparkline.
pub const HISTORY_LEN: usize = 30;

/// Registration counts per track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub blitz: u64,
    #[serde(default)]
    pub ignite: u64,
    #[serde(default)]
    pub both: u64,
}

/// Signed change between two readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsDelta {
    pub total: i64,
    pub blitz: i64,
    pub ignite: i64,
    pub both: i64,
}

impl StatsDelta {
    pub fn between(previous: &LiveStats, current: &LiveStats) -> Self {
        let diff = |a: u64, b: u64| {
            (i128::from(b) - i128::from(a)).clamp(i64::MIN.into(), i64::MAX.into()) as i64
        };
        Self {
            total: diff(previous.total, current.total),
            blitz: diff(previous.blitz, current.blitz),
            ignite: diff(previous.ignite, current.ignite),
            both: diff(previous.both, current.both),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Last [`HISTORY_LEN`] totals plus the most recent reading.
#[derive(Debug, Clone, Default)]
pub struct StatsHistory {
    totals: VecDeque<u64>,
    latest: Option<LiveStats>,
}

impl StatsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading; returns the delta from the previous one, if any.
    pub fn record(&mut self, stats: LiveStats) -> Option<StatsDelta> {
        let delta = self
            .latest
            .as_ref()
            .map(|prev| StatsDelta::between(prev, &stats));
        if self.totals.len() == HISTORY_LEN {
            self.totals.pop_front();
        }
        self.totals.push_back(stats.total);
        self.latest = Some(stats);
        delta
    }

    pub fn latest(&self) -> Option<&LiveStats> {
        self.latest.as_ref()
    }

    pub fn totals(&self) -> impl Iterator<Item = u64> + '_ {
        self.totals.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}
