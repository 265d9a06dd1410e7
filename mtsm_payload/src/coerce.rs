//! Best-effort numeric coercion.
//!
//! Query responses mix JSON numbers and numeric strings freely: timestamps
//! arrive as floats, sample values as strings such as `"42"` or `"NaN"`.
//! [`Scalar`] is decoded at that boundary and [`Scalar::to_f64`] turns it into
//! a float. The conversion is total: anything that is not a number or a
//! parseable string becomes `0.0`. Callers that care about data quality must
//! check for that themselves.

use serde::{Deserialize, Serialize};

/// A loosely typed scalar as found in backend JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// A signed integer, 64 bits wide
    Int(i64),
    /// A signless integer too wide for [`Scalar::Int`]
    UInt(u64),
    /// A floating point, 64 bits wide
    Float(f64),
    /// A string, parsed as a decimal float on conversion, surrounding
    /// whitespace making it unparsable
    Str(String),
    /// Anything else: `null`, booleans, arrays, objects
    Other(serde_json::Value),
}

impl Scalar {
    /// Convert to `f64`, degrading to `0.0` where no number can be had.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        match self {
            Scalar::Int(v) => *v as f64,
            Scalar::UInt(v) => *v as f64,
            Scalar::Float(v) => *v,
            Scalar::Str(s) => s.parse::<f64>().unwrap_or(0.0),
            Scalar::Other(_) => 0.0,
        }
    }
}

/// Free-function form of [`Scalar::to_f64`].
#[must_use]
pub fn to_f64(value: &Scalar) -> f64 {
    value.to_f64()
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::UInt(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Other(serde_json::Value::Null)
    }
}
