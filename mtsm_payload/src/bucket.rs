//! Historical time buckets for backfilling.
//!
//! [`Buckets`] walks backward through time in fixed steps. Construction reads
//! the clock exactly once and truncates that instant toward the past to a
//! multiple of the step, measured from the unix epoch. The first call to
//! `next` yields that anchor, every later call yields the previous instant
//! minus one step. There is no reset; build a new [`Buckets`] to start over.
//!
//! Truncation is absolute, not zone-local. A step that does not evenly divide
//! the zone offset will not land on local boundaries: a 24 hour step in UTC+8
//! yields 08:00 local time, and callers wanting local midnight must subtract
//! the offset themselves.

use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{Error, clock::Clock};

/// Infinite, strictly decreasing sequence of step-aligned instants.
#[derive(Debug, Clone, Copy)]
pub struct Buckets {
    current: OffsetDateTime,
    step: Duration,
    started: bool,
}

impl Buckets {
    /// Create a new [`Buckets`] anchored at `clock`'s now, presented in
    /// `offset`.
    ///
    /// # Errors
    ///
    /// Function will error if `step` is zero or so large that the anchor
    /// cannot be represented.
    pub fn new<C>(clock: &C, offset: UtcOffset, step: std::time::Duration) -> Result<Self, Error>
    where
        C: Clock + ?Sized,
    {
        if step.is_zero() {
            return Err(Error::ZeroStep);
        }
        let step_nanos = i128::try_from(step.as_nanos()).map_err(|_| Error::StepOutOfRange)?;
        let step = Duration::try_from(step).map_err(|_| Error::StepOutOfRange)?;

        let now = clock.now().unix_timestamp_nanos();
        let base = now.div_euclid(step_nanos) * step_nanos;
        let current = OffsetDateTime::from_unix_timestamp_nanos(base)
            .map_err(|_| Error::StepOutOfRange)?
            .to_offset(offset);

        Ok(Self {
            current,
            step,
            started: false,
        })
    }

    /// The distance between two consecutive instants.
    #[must_use]
    pub fn step(&self) -> Duration {
        self.step
    }
}

impl Iterator for Buckets {
    type Item = OffsetDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        if self.started {
            self.current = self.current.checked_sub(self.step)?;
        } else {
            self.started = true;
        }
        Some(self.current)
    }
}
