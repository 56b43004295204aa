//! Samples and the per-task sample buffer.

use super::ValueType;

/// One measured value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Fully-qualified metric name.
    pub name: String,
    /// Help text of the metric family.
    pub help: String,
    /// Metric type.
    pub value_type: ValueType,
    /// Label pairs, constant labels first.
    pub labels: Vec<(String, String)>,
    /// Sample value.
    pub value: f64,
}

impl Sample {
    /// Look up a label value by name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Append-only buffer of samples.
///
/// Every collector task owns its own sink, so no synchronization is needed
/// while collectors run. Buffers are merged after the scrape barrier.
#[derive(Debug, Default)]
pub struct MetricSink {
    samples: Vec<Sample>,
}

impl MetricSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}
