//! Query result normalization.
//!
//! [`Clean`] takes the rows of one query response and reshapes them:
//!
//! * raw `(timestamp, value)` pairs become parallel `dts`/`val` arrays, see
//!   [`Clean::to_tv_vector`] and [`Clean::to_tv_matrix`];
//! * labels prefixed `g_` are promoted out of every row into a shared global
//!   label set under the unprefixed name, and `__name__` is pulled out of every
//!   row into [`Clean::metrics`], see [`Clean::clip_labels`].
//!
//! Name extraction differs between the two row kinds and the difference is
//! kept on purpose. For vector rows every row that carries a `__name__`
//! overwrites `metrics`, so the last such row wins. For matrix rows only the
//! first row is consulted. Both strategies still strip `__name__` from every
//! row.
//!
//! Every pass can be repeated and the passes can run in any order.

use serde::Serialize;

use crate::{
    METRIC_NAME_LABEL,
    labels::LabelSet,
    query::{TsMatrix, TsVector},
};

/// Prefix marking a label for promotion into the global set.
pub const GLOBAL_LABEL_PREFIX: &str = "g_";

/// Row counts captured when rows are handed to [`Clean`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Number of vector rows
    pub vector_len: usize,
    /// Number of matrix rows
    pub matrix_len: usize,
}

/// A normalized query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Clean {
    global: LabelSet,
    metrics: String,
    vector: Vec<TsVector>,
    matrix: Vec<TsMatrix>,
    stats: Stats,
}

impl Clean {
    /// Create an empty [`Clean`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of instant query rows.
    #[must_use]
    pub fn with_vector(mut self, vector: Vec<TsVector>) -> Self {
        self.stats.vector_len = vector.len();
        self.vector = vector;
        self
    }

    /// Take ownership of range query rows.
    #[must_use]
    pub fn with_matrix(mut self, matrix: Vec<TsMatrix>) -> Self {
        self.stats.matrix_len = matrix.len();
        self.matrix = matrix;
        self
    }

    /// Convert every vector row's raw pair, see [`TsVector::value_to_tv`].
    pub fn to_tv_vector(&mut self) {
        self.vector.iter_mut().for_each(TsVector::value_to_tv);
    }

    /// Convert every matrix row's raw pairs, see [`TsMatrix::value_to_tv`].
    pub fn to_tv_matrix(&mut self) {
        self.matrix.iter_mut().for_each(TsMatrix::value_to_tv);
    }

    /// Promote global labels and extract the metric name from all rows.
    pub fn clip_labels(&mut self) {
        self.clip_vector_labels();
        self.clip_matrix_labels();
    }

    /// Vector strategy: every row's `__name__` overwrites `metrics`.
    pub fn clip_vector_labels(&mut self) {
        for row in &mut self.vector {
            if let Some(name) = promote_labels(&mut row.metric, &mut self.global) {
                self.metrics = name;
            }
        }
    }

    /// Matrix strategy: only the first row's `__name__` is taken.
    pub fn clip_matrix_labels(&mut self) {
        for (idx, row) in self.matrix.iter_mut().enumerate() {
            if let (0, Some(name)) = (idx, promote_labels(&mut row.metric, &mut self.global)) {
                self.metrics = name;
            }
        }
    }

    /// Run every pass: both conversions then [`Clean::clip_labels`].
    #[must_use]
    pub fn normalize(mut self) -> Self {
        self.to_tv_vector();
        self.to_tv_matrix();
        self.clip_labels();
        self
    }

    /// Labels promoted out of the rows.
    #[must_use]
    pub fn global(&self) -> &LabelSet {
        &self.global
    }

    /// The extracted metric name, empty if none was found.
    #[must_use]
    pub fn metrics(&self) -> &str {
        &self.metrics
    }

    /// Instant query rows.
    #[must_use]
    pub fn vector(&self) -> &[TsVector] {
        &self.vector
    }

    /// Range query rows.
    #[must_use]
    pub fn matrix(&self) -> &[TsMatrix] {
        &self.matrix
    }

    /// Row counts.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.stats
    }
}

/// Move every `g_` label of `labels` into `global` under its unprefixed name,
/// the last write winning, and remove `__name__` from `labels`, returning its
/// value.
pub fn promote_labels(labels: &mut LabelSet, global: &mut LabelSet) -> Option<String> {
    for label in labels.extract_if(|l| l.name.starts_with(GLOBAL_LABEL_PREFIX)) {
        let name = &label.name[GLOBAL_LABEL_PREFIX.len()..];
        global.set(name, label.value);
    }
    labels.remove(METRIC_NAME_LABEL)
}
