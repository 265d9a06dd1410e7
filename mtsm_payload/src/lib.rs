//! The mtsm payloads
//!
//! This library holds the I/O free half of the mtsm project: the time-series
//! and bulk-import models, the remote-write codec and the normalizer that
//! reshapes instant/range query results. Nothing in here touches the network,
//! see the `mtsm` crate for that.

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub use bucket::Buckets;
pub use bulk::BulkMetric;
pub use clean::Clean;
pub use clock::{Clock, FixedClock, RealClock};
pub use coerce::Scalar;
pub use labels::LabelSet;
pub use query::{TsMatrix, TsVector};
pub use series::TimeSeries;

pub mod bucket;
pub mod bulk;
pub mod clean;
pub mod clock;
pub mod coerce;
pub mod labels;
pub mod query;
pub mod remote_write;
pub mod series;

/// Label holding the metric name of a series.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Errors related to building and encoding payloads
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Parallel value and timestamp sequences differ in length
    #[error("values and timestamps length mismatch: {values} values, {timestamps} timestamps")]
    LengthMismatch {
        /// Number of values supplied
        values: usize,
        /// Number of timestamps supplied
        timestamps: usize,
    },
    /// A bucket step of zero would never move
    #[error("bucket step must be greater than zero")]
    ZeroStep,
    /// Bucket step or anchor falls outside the representable time range
    #[error("bucket step is out of the representable time range")]
    StepOutOfRange,
    /// See [`prost::EncodeError`]
    #[error(transparent)]
    Encode(#[from] prost::EncodeError),
    /// See [`prost::DecodeError`]
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),
    /// Snappy block could not be compressed or decompressed
    #[error("Snappy block error: {0}")]
    Snappy(#[from] snap::Error),
    /// Json payload could not be encoded
    #[error("Json payload could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
}
