//! Wall clocks for timestamping and bucketing.
//!
//! Every "now" in this crate goes through a [`Clock`] so that tests can pin
//! time. The real clock is the system clock, a fixed clock always returns the
//! same instant.

use std::fmt;

use time::{OffsetDateTime, UtcOffset};

/// Default zone of every model, UTC+8.
pub const DEFAULT_UTC_OFFSET_SECONDS: i32 = 8 * 60 * 60;

/// The default zone as a [`UtcOffset`].
///
/// # Panics
///
/// None are known, the default offset is well within range.
#[must_use]
pub fn default_offset() -> UtcOffset {
    UtcOffset::from_whole_seconds(DEFAULT_UTC_OFFSET_SECONDS)
        .expect("default UTC offset is in range")
}

/// The `Clock` used for every timestamp
pub trait Clock: fmt::Debug + Send + Sync {
    /// The current instant
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
/// A clock that reads the system time.
pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A clock stuck at a single instant.
pub struct FixedClock(pub OffsetDateTime);

impl FixedClock {
    /// Create a clock stuck at `unix_seconds`.
    ///
    /// # Panics
    ///
    /// Function will panic if `unix_seconds` is outside the range `time` can
    /// represent.
    #[must_use]
    pub fn at_unix(unix_seconds: i64) -> Self {
        Self(
            OffsetDateTime::from_unix_timestamp(unix_seconds)
                .expect("unix timestamp out of range"),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}
