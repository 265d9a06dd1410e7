//! The bulk import model.
//!
//! A [`BulkMetric`] is the JSON line accepted by a VictoriaMetrics style
//! `/api/v1/import` endpoint:
//!
//! ```json
//! {"metric": {"__name__": "cpu"}, "values": [1.0, 2.0], "timestamps": [1700000000000, 1700000060000]}
//! ```
//!
//! Values and timestamps are parallel arrays and are only ever changed in
//! lockstep. Timestamps are passed through untouched; the import endpoint
//! expects milliseconds.

use serde::{Deserialize, Serialize};

use crate::{Error, labels::LabelSet};

/// One series with index-aligned values and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBulkMetric")]
pub struct BulkMetric {
    metric: LabelSet,
    values: Vec<f64>,
    timestamps: Vec<i64>,
}

/// Decoded import line before the parity check.
#[derive(Deserialize)]
struct RawBulkMetric {
    #[serde(default)]
    metric: LabelSet,
    #[serde(default)]
    values: Vec<f64>,
    #[serde(default)]
    timestamps: Vec<i64>,
}

impl TryFrom<RawBulkMetric> for BulkMetric {
    type Error = Error;

    fn try_from(raw: RawBulkMetric) -> Result<Self, Self::Error> {
        let mut metric = BulkMetric::new(raw.metric);
        metric.set_values(raw.values, raw.timestamps)?;
        Ok(metric)
    }
}

impl BulkMetric {
    /// Create a new, empty [`BulkMetric`].
    #[must_use]
    pub fn new(labels: LabelSet) -> Self {
        Self {
            metric: labels,
            values: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    /// Append a single value at `timestamp`.
    pub fn add_value(&mut self, value: f64, timestamp: i64) {
        self.values.push(value);
        self.timestamps.push(timestamp);
    }

    /// Append `values[i]` at `timestamps[i]` for every `i`.
    ///
    /// # Errors
    ///
    /// Function will error if the two slices differ in length, in which case
    /// nothing is appended.
    pub fn add_multi(&mut self, values: &[f64], timestamps: &[i64]) -> Result<(), Error> {
        check_parity(values.len(), timestamps.len())?;
        self.values.extend_from_slice(values);
        self.timestamps.extend_from_slice(timestamps);
        Ok(())
    }

    /// Replace all values and timestamps.
    ///
    /// # Errors
    ///
    /// Function will error if the two vectors differ in length, in which case
    /// the model is unchanged.
    pub fn set_values(&mut self, values: Vec<f64>, timestamps: Vec<i64>) -> Result<(), Error> {
        check_parity(values.len(), timestamps.len())?;
        self.values = values;
        self.timestamps = timestamps;
        Ok(())
    }

    /// Set label `name` to `value`, see [`LabelSet::set`].
    pub fn set_label<N, V>(&mut self, name: N, value: V)
    where
        N: Into<String> + AsRef<str>,
        V: Into<String>,
    {
        self.metric.set(name, value);
    }

    /// The labels of this metric.
    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.metric
    }

    /// The values, index-aligned with [`BulkMetric::timestamps`].
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The timestamps, index-aligned with [`BulkMetric::values`].
    #[must_use]
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no point has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Serialize as an import line.
    ///
    /// # Errors
    ///
    /// Function will error if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }
}

fn check_parity(values: usize, timestamps: usize) -> Result<(), Error> {
    if values == timestamps {
        Ok(())
    } else {
        Err(Error::LengthMismatch { values, timestamps })
    }
}
