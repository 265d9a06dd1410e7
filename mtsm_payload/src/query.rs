//! Query API results.
//!
//! Instant queries answer with a vector, one `(timestamp, value)` pair per
//! series, range queries with a matrix, a list of such pairs per series. Both
//! pairs arrive loosely typed, a float timestamp and a string value, and are
//! decoded into [`Scalar`]s. `value_to_tv` turns the raw pairs into parallel
//! `dts`/`val` float arrays and drops the raw field, so calling it again does
//! nothing.

use serde::{Deserialize, Serialize};

use crate::{Clean, coerce::Scalar, labels::LabelSet};

/// A raw `[timestamp, value]` pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplePair(pub Scalar, pub Scalar);

impl SamplePair {
    /// The timestamp half, coerced.
    #[must_use]
    pub fn timestamp(&self) -> f64 {
        self.0.to_f64()
    }

    /// The value half, coerced.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.1.to_f64()
    }
}

/// One row of an instant query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TsVector {
    /// Labels of the series
    #[serde(default)]
    pub metric: LabelSet,
    /// Raw pair, absent once converted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<SamplePair>,
    /// Timestamps, filled by [`TsVector::value_to_tv`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dts: Vec<f64>,
    /// Values, filled by [`TsVector::value_to_tv`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub val: Vec<f64>,
}

impl TsVector {
    /// Move the raw pair into one-element `dts`/`val` arrays. A row that has
    /// no raw pair is left as is.
    pub fn value_to_tv(&mut self) {
        if let Some(pair) = self.value.take() {
            self.dts = vec![pair.timestamp()];
            self.val = vec![pair.value()];
        }
    }
}

/// One row of a range query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TsMatrix {
    /// Labels of the series
    #[serde(default)]
    pub metric: LabelSet,
    /// Raw pairs, absent once converted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<SamplePair>>,
    /// Timestamps, filled by [`TsMatrix::value_to_tv`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dts: Vec<f64>,
    /// Values, filled by [`TsMatrix::value_to_tv`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub val: Vec<f64>,
}

impl TsMatrix {
    /// Move the raw pairs into `dts`/`val` arrays, preserving order. A row
    /// that has no raw pairs is left as is.
    pub fn value_to_tv(&mut self) {
        if let Some(pairs) = self.values.take() {
            self.dts = pairs.iter().map(SamplePair::timestamp).collect();
            self.val = pairs.iter().map(SamplePair::value).collect();
        }
    }
}

/// Envelope of an instant or range query response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse<T> {
    /// `success` or `error`
    pub status: String,
    /// The result payload
    #[serde(default = "QueryData::empty")]
    pub data: QueryData<T>,
    /// Error class, set when `status` is `error`
    #[serde(default, rename = "errorType", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Error message, set when `status` is `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Query statistics, when the backend reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<QueryStats>,
}

/// `data` member of a [`QueryResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryData<T> {
    /// `vector`, `matrix`, `scalar` or `string`
    #[serde(rename = "resultType", default)]
    pub result_type: String,
    /// The rows
    #[serde(default = "Vec::new")]
    pub result: Vec<T>,
}

impl<T> QueryData<T> {
    fn empty() -> Self {
        Self {
            result_type: String::new(),
            result: Vec::new(),
        }
    }
}

/// Statistics VictoriaMetrics attaches to query responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStats {
    /// Number of series the backend touched, reported as a string
    #[serde(rename = "seriesFetched", default)]
    pub series_fetched: String,
    /// Server side execution time
    #[serde(rename = "executionTimeMsec", default)]
    pub execution_time_msec: u64,
}

impl QueryResponse<TsVector> {
    /// Hand the rows to a fresh [`Clean`].
    #[must_use]
    pub fn into_clean(self) -> Clean {
        Clean::new().with_vector(self.data.result)
    }
}

impl QueryResponse<TsMatrix> {
    /// Hand the rows to a fresh [`Clean`].
    #[must_use]
    pub fn into_clean(self) -> Clean {
        Clean::new().with_matrix(self.data.result)
    }
}

/// Response of a label values lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelValues {
    /// `success` or `error`
    pub status: String,
    /// The values
    #[serde(default)]
    pub data: Vec<String>,
}
