use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::countdown::{CountdownNotice, Phase, RemainingDuration};

/// Every countdown state change produces an Event.
/// The CLI prints them; tests assert on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    CountdownStarted {
        phase: Phase,
        at: DateTime<Utc>,
    },
    CountdownStopped {
        at: DateTime<Utc>,
    },
    CountdownTick {
        phase: Phase,
        remaining: RemainingDuration,
        synced: bool,
        notice: Option<CountdownNotice>,
        at: DateTime<Utc>,
    },
    /// `from` is `None` on the first observation after start.
    PhaseChanged {
        from: Option<Phase>,
        to: Phase,
        at: DateTime<Utc>,
    },
    /// The go-live effect ran. Emitted at most once per engine.
    MilestoneFired {
        at: DateTime<Utc>,
    },
    ClockSynced {
        offset_ms: i64,
        at: DateTime<Utc>,
    },
    /// Sync failed; the engine keeps running on its previous offset.
    ClockSyncFailed {
        reason: String,
        offset_ms: i64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::CountdownStarted { at, .. }
            | Event::CountdownStopped { at }
            | Event::CountdownTick { at, .. }
            | Event::PhaseChanged { at, .. }
            | Event::MilestoneFired { at }
            | Event::ClockSynced { at, .. }
            | Event::ClockSyncFailed { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::PhaseChanged {
            from: Some(Phase::Pre),
            to: Phase::Live,
            at: DateTime::from_timestamp(1_737_779_400, 0).unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "phase_changed");
        assert_eq!(json["from"], "pre");
        assert_eq!(json["to"], "live");
    }
}
