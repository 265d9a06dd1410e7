//! The remote-write time-series model.
//!
//! A [`TimeSeries`] is one label set plus an append-only list of samples. It
//! is what a remote-write push transmits: the whole list, as a single series,
//! every time. Callers give timestamps in unix seconds; samples hold
//! milliseconds, which is what the wire wants.

use std::{fmt, sync::Arc};

use serde::Serialize;
use time::UtcOffset;
use tracing::warn;

use crate::{
    Error,
    bucket::Buckets,
    clock::{self, Clock, RealClock},
    labels::LabelSet,
    remote_write::{Label, Sample},
};

/// One series and its samples, built up in memory before a push.
#[derive(Clone)]
pub struct TimeSeries {
    labels: LabelSet,
    samples: Vec<Sample>,
    offset: UtcOffset,
    clock: Arc<dyn Clock>,
}

#[derive(Serialize)]
struct Diagnostic<'a> {
    labels: &'a [Label],
    samples: &'a [Sample],
}

impl TimeSeries {
    /// Create a new [`TimeSeries`] in the default UTC+8 zone.
    #[must_use]
    pub fn new(labels: LabelSet) -> Self {
        Self::with_offset(labels, clock::default_offset())
    }

    /// Create a new [`TimeSeries`] whose "now" is presented in `offset`.
    #[must_use]
    pub fn with_offset(labels: LabelSet, offset: UtcOffset) -> Self {
        Self::with_clock(labels, offset, Arc::new(RealClock))
    }

    /// Create a new [`TimeSeries`] reading time from `clock`.
    #[must_use]
    pub fn with_clock(labels: LabelSet, offset: UtcOffset, clock: Arc<dyn Clock>) -> Self {
        Self {
            labels,
            samples: Vec::new(),
            offset,
            clock,
        }
    }

    /// Append one sample. `timestamp` is in unix seconds; when absent the
    /// current second is used.
    pub fn add_value(&mut self, value: f64, timestamp: Option<i64>) {
        let timestamp = timestamp.unwrap_or_else(|| self.now_unix(0));
        self.samples.push(Sample {
            value,
            timestamp: timestamp.saturating_mul(1_000),
        });
    }

    /// Append `values[i]` at `timestamps[i]` for every `i`.
    ///
    /// # Errors
    ///
    /// Function will error if the two slices differ in length, in which case
    /// nothing is appended.
    pub fn add_multi(&mut self, values: &[f64], timestamps: &[i64]) -> Result<(), Error> {
        if values.len() != timestamps.len() {
            return Err(Error::LengthMismatch {
                values: values.len(),
                timestamps: timestamps.len(),
            });
        }
        self.samples.reserve(values.len());
        for (value, timestamp) in values.iter().zip(timestamps) {
            self.add_value(*value, Some(*timestamp));
        }
        Ok(())
    }

    /// Append one sample per `(timestamp, value)` entry.
    pub fn add_map<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (i64, f64)>,
    {
        for (timestamp, value) in values {
            self.add_value(value, Some(timestamp));
        }
    }

    /// Set label `name` to `value`, see [`LabelSet::set`].
    pub fn set_label<N, V>(&mut self, name: N, value: V)
    where
        N: Into<String> + AsRef<str>,
        V: Into<String>,
    {
        self.labels.set(name, value);
    }

    /// The labels of this series.
    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// The samples of this series, in append order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The zone "now" is presented in.
    #[must_use]
    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    /// Current unix second plus `offset` seconds.
    #[must_use]
    pub fn now_unix(&self, offset: i64) -> i64 {
        self.clock.now().to_offset(self.offset).unix_timestamp() + offset
    }

    /// A [`Buckets`] generator anchored at this series' now.
    ///
    /// # Errors
    ///
    /// See [`Buckets::new`].
    pub fn now_truncate(&self, step: std::time::Duration) -> Result<Buckets, Error> {
        Buckets::new(self.clock.as_ref(), self.offset, step)
    }

    /// Diagnostic form, `{labels: [{name, value}], samples: [{value, timestamp}]}`.
    ///
    /// # Errors
    ///
    /// Function will error if the series cannot be represented as JSON.
    pub fn to_object(&self) -> Result<serde_json::Value, Error> {
        Ok(serde_json::to_value(self.diagnostic())?)
    }

    /// [`TimeSeries::to_object`] as a string, or the empty string if that
    /// fails.
    #[must_use]
    pub fn to_json(&self) -> String {
        match serde_json::to_string(&self.diagnostic()) {
            Ok(s) => s,
            Err(err) => {
                warn!("failed to render time series as json: {err}");
                String::new()
            }
        }
    }

    fn diagnostic(&self) -> Diagnostic<'_> {
        Diagnostic {
            labels: self.labels.as_slice(),
            samples: &self.samples,
        }
    }
}

impl fmt::Debug for TimeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeSeries")
            .field("labels", &self.labels)
            .field("samples", &self.samples.len())
            .field("offset", &self.offset)
            .field("clock", &self.clock)
            .finish()
    }
}
