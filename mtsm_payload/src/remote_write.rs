//! Prometheus remote-write payload.
//!
//! [Specification](https://prometheus.io/docs/specs/prw/remote_write_spec/)
//!
//! The body of a remote-write request is a protobuf encoded `WriteRequest`
//! compressed with the snappy *block* format, not the framed streaming format.
//! We only ever write a single series per request.
//!
//! ```protobuf
//! message WriteRequest { repeated TimeSeries timeseries = 1; }
//! message TimeSeries   { repeated Label labels = 1; repeated Sample samples = 2; }
//! message Label        { string name = 1; string value = 2; }
//! message Sample       { double value = 1; int64 timestamp = 2; }
//! ```

use prost::Message;
use serde::Serialize;

use crate::{Error, series};

/// Content type of a remote-write body.
pub const CONTENT_TYPE: &str = "application/x-protobuf";
/// Content encoding of a remote-write body.
pub const CONTENT_ENCODING: &str = "snappy";
/// Header carrying the protocol version.
pub const VERSION_HEADER: &str = "X-Prometheus-Remote-Write-Version";
/// Protocol version we speak.
pub const VERSION: &str = "0.1.0";

/// A batch of series, the top-level remote-write message.
#[derive(Clone, PartialEq, Message)]
pub struct WriteRequest {
    /// Series carried by this request
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
}

/// One series: its labels and its samples.
#[derive(Clone, PartialEq, Message)]
pub struct TimeSeries {
    /// Labels identifying the series
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    /// Samples in append order
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,
}

/// A label name/value pair.
#[derive(Clone, Hash, PartialEq, Eq, Message, Serialize)]
pub struct Label {
    /// Label name
    #[prost(string, tag = "1")]
    pub name: String,
    /// Label value
    #[prost(string, tag = "2")]
    pub value: String,
}

/// A single observation.
#[derive(Clone, Copy, PartialEq, Message, Serialize)]
pub struct Sample {
    /// Observed value
    #[prost(double, tag = "1")]
    pub value: f64,
    /// Milliseconds since the epoch
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

impl WriteRequest {
    /// Build a single-series request from `series`, labels and samples
    /// verbatim.
    #[must_use]
    pub fn from_series(series: &series::TimeSeries) -> Self {
        Self {
            timeseries: vec![TimeSeries {
                labels: series.labels().as_slice().to_vec(),
                samples: series.samples().to_vec(),
            }],
        }
    }

    /// Encode as protobuf.
    ///
    /// # Errors
    ///
    /// Function will error if the buffer cannot hold the message, which in
    /// practice does not happen with a growable buffer.
    pub fn encode_proto(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Encode as protobuf then compress, producing a request body.
    ///
    /// # Errors
    ///
    /// See [`WriteRequest::encode_proto`] and [`compress`].
    pub fn to_body(&self) -> Result<Vec<u8>, Error> {
        compress(&self.encode_proto()?)
    }

    /// Reverse of [`WriteRequest::to_body`].
    ///
    /// # Errors
    ///
    /// Function will error if `body` is not a snappy block or does not hold a
    /// `WriteRequest`.
    pub fn from_body(body: &[u8]) -> Result<Self, Error> {
        let raw = decompress(body)?;
        Ok(Self::decode(raw.as_slice())?)
    }
}

/// Compress `bytes` with the snappy block format.
///
/// # Errors
///
/// Function will error if `bytes` exceeds the maximum block size.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    Ok(snap::raw::Encoder::new().compress_vec(bytes)?)
}

/// Decompress a snappy block.
///
/// # Errors
///
/// Function will error if `bytes` is not a valid snappy block.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    Ok(snap::raw::Decoder::new().decompress_vec(bytes)?)
}
