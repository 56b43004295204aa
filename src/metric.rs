//! Metric Model
//!
//! Minimal, encoding-agnostic metric types shared by collectors and the
//! scrape orchestrator. Rendering samples into an exposition format is left
//! to the transport layer.
//!
//! # Architecture
//!
//! - [`Desc`] / [`TypedDesc`]: metric descriptors (name, help, labels, type)
//! - [`Sample`]: one measured value with its label pairs
//! - [`MetricSink`]: per-task output buffer that collectors push into
//! - [`ToMetricValue`]: conversion of primitive values into `f64`
//!
//! # Example
//!
//! ```rust
//! use exporter_core::metric::{MetricSink, TypedDesc, ValueType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let desc = TypedDesc::new("node", "cpu", "seconds_total", "CPU time.", &["mode"], ValueType::Counter)?;
//! let mut sink = MetricSink::new();
//! desc.push(&mut sink, 12.5_f64, &["user"])?;
//! desc.push(&mut sink, None::<u64>, &["idle"])?; // skipped
//! assert_eq!(sink.len(), 1);
//! # Ok(())
//! # }
//! ```

mod desc;
mod sink;
mod value;

pub use desc::{Desc, TypedDesc, build_fq_name, validate_label_name, validate_metric_name};
pub use sink::{MetricSink, Sample};
pub use value::ToMetricValue;

use thiserror::Error;

/// Errors raised while describing or recording metrics.
#[derive(Debug, Error)]
pub enum MetricError {
    /// Metric or label name does not match the allowed syntax.
    #[error("invalid metric name: '{0}'")]
    InvalidName(String),

    /// Number of label values does not match the descriptor.
    #[error("metric '{name}' expects {expected} label values, got {actual}")]
    LabelCardinality {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Value could not be converted to a float.
    #[error("invalid metric value: {0}")]
    InvalidValue(String),
}

/// Kind of a metric, as understood by pull-based collectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// Monotonically increasing value.
    Counter,
    /// Value that can go up and down.
    #[default]
    Gauge,
    /// Value of unknown kind.
    Untyped,
}

impl ValueType {
    /// Lowercase type name (`counter`, `gauge`, `untyped`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Untyped => "untyped",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
