use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::ValidationError;

/// The fixed start/end pair the countdown runs against.
///
/// Construction validates `end > start`; a window can never describe a
/// negative or empty event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl EventWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// `end = start + duration_hours`.
    pub fn from_duration_hours(
        start: DateTime<Utc>,
        duration_hours: u32,
    ) -> Result<Self, ValidationError> {
        let end = start
            .checked_add_signed(Duration::hours(i64::from(duration_hours)))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "duration_hours".into(),
                message: format!("{duration_hours}h overflows the calendar"),
            })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
