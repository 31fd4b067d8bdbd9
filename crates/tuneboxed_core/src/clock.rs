//! Wall-clock source and timestamp text format.
//!
//! # Responsibility
//! - Provide the `now()` used for `createdAt` and page-view timestamps.
//! - Render timestamps as RFC 3339 UTC text with millisecond precision.
//!
//! # Invariants
//! - Rendered timestamps always end in `Z` and carry exactly three
//!   fractional digits, so two events in the same millisecond render equal.

use std::sync::{Mutex, PoisonError};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;

    /// Current time rendered with [`format_timestamp`].
    fn now_timestamp(&self) -> String {
        format_timestamp(self.now())
    }
}

/// Real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Manually driven clock for tests and replay tooling.
#[derive(Debug)]
pub struct FixedClock {
    current: Mutex<OffsetDateTime>,
}

impl FixedClock {
    pub fn new(at: OffsetDateTime) -> Self {
        Self {
            current: Mutex::new(at),
        }
    }

    /// Builds a clock from an RFC 3339 string; `None` when it does not parse.
    pub fn at(timestamp: &str) -> Option<Self> {
        parse_timestamp(timestamp).map(Self::new)
    }

    pub fn set(&self, at: OffsetDateTime) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Renders `at` as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let utc = at.to_offset(UtcOffset::UTC);
    let format =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");
    utc.format(&format)
        .or_else(|_| utc.format(&Rfc3339))
        .unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

/// Parses RFC 3339 text; returns `None` for anything else.
pub fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value.trim(), &Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::{format_timestamp, parse_timestamp, Clock, FixedClock};
    use time::macros::datetime;
    use time::Duration;

    #[test]
    fn format_uses_millisecond_precision_and_zulu_suffix() {
        let rendered = format_timestamp(datetime!(2024-05-01 12:00:00.123456 UTC));
        assert_eq!(rendered, "2024-05-01T12:00:00.123Z");
    }

    #[test]
    fn format_normalizes_offsets_to_utc() {
        let rendered = format_timestamp(datetime!(2024-05-01 14:00:00 +02:00));
        assert_eq!(rendered, "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn parse_rejects_non_rfc3339_text() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-05-01T12:00:00.000Z").is_some());
    }

    #[test]
    fn fixed_clock_only_moves_when_told() {
        let clock = FixedClock::at("2024-05-01T12:00:00.000Z").unwrap();
        assert_eq!(clock.now_timestamp(), clock.now_timestamp());

        clock.advance(Duration::milliseconds(5));
        assert_eq!(clock.now_timestamp(), "2024-05-01T12:00:00.005Z");
    }
}
