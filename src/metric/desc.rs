//! Metric descriptors.

use std::sync::OnceLock;

use regex::Regex;

use super::{MetricError, MetricSink, Sample, ToMetricValue, ValueType};

fn metric_name_regex() -> &'static Regex {
    static METRIC_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    METRIC_NAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("failed to compile metric name regex")
    })
}

fn label_name_regex() -> &'static Regex {
    static LABEL_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    LABEL_NAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("failed to compile label name regex")
    })
}

/// Validate a fully-qualified metric name.
pub fn validate_metric_name(name: &str) -> Result<(), MetricError> {
    if metric_name_regex().is_match(name) {
        Ok(())
    } else {
        Err(MetricError::InvalidName(name.to_string()))
    }
}

/// Validate a label name. Names starting with `__` are reserved.
pub fn validate_label_name(name: &str) -> Result<(), MetricError> {
    if label_name_regex().is_match(name) && !name.starts_with("__") {
        Ok(())
    } else {
        Err(MetricError::InvalidName(name.to_string()))
    }
}

/// Join namespace, subsystem and name with `_`, skipping empty parts.
///
/// ```
/// use exporter_core::metric::build_fq_name;
///
/// assert_eq!(build_fq_name("node", "scrape", "collector_success"), "node_scrape_collector_success");
/// assert_eq!(build_fq_name("", "scrape", "duration"), "scrape_duration");
/// assert_eq!(build_fq_name("node", "", ""), "node");
/// ```
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Immutable metric descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Desc {
    fq_name: String,
    help: String,
    variable_labels: Vec<String>,
    const_labels: Vec<(String, String)>,
}

impl Desc {
    /// Create a descriptor, validating the metric and label names.
    pub fn new(
        fq_name: impl Into<String>,
        help: impl Into<String>,
        variable_labels: &[&str],
    ) -> Result<Self, MetricError> {
        let fq_name = fq_name.into();
        validate_metric_name(&fq_name)?;
        for label in variable_labels {
            validate_label_name(label)?;
        }

        Ok(Self {
            fq_name,
            help: help.into(),
            variable_labels: variable_labels.iter().map(|l| l.to_string()).collect(),
            const_labels: Vec::new(),
        })
    }

    /// Attach a constant label emitted with every sample.
    pub fn with_const_label(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, MetricError> {
        let name = name.into();
        validate_label_name(&name)?;
        self.const_labels.push((name, value.into()));
        Ok(self)
    }

    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn variable_labels(&self) -> &[String] {
        &self.variable_labels
    }

    /// Build a sample from a value and the variable label values, in order.
    pub fn sample(
        &self,
        value_type: ValueType,
        value: f64,
        label_values: &[&str],
    ) -> Result<Sample, MetricError> {
        if label_values.len() != self.variable_labels.len() {
            return Err(MetricError::LabelCardinality {
                name: self.fq_name.clone(),
                expected: self.variable_labels.len(),
                actual: label_values.len(),
            });
        }

        let labels = self
            .const_labels
            .iter()
            .cloned()
            .chain(
                self.variable_labels
                    .iter()
                    .zip(label_values)
                    .map(|(name, value)| (name.clone(), value.to_string())),
            )
            .collect();

        Ok(Sample {
            name: self.fq_name.clone(),
            help: self.help.clone(),
            value_type,
            labels,
            value,
        })
    }
}

/// Descriptor paired with the type of the values it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedDesc {
    pub desc: Desc,
    pub value_type: ValueType,
}

impl TypedDesc {
    /// Build a typed descriptor from name parts (see [`build_fq_name`]).
    pub fn new(
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: impl Into<String>,
        variable_labels: &[&str],
        value_type: ValueType,
    ) -> Result<Self, MetricError> {
        let desc = Desc::new(
            build_fq_name(namespace, subsystem, name),
            help,
            variable_labels,
        )?;
        Ok(Self { desc, value_type })
    }

    /// Convert `value` and push one sample into `sink`.
    ///
    /// Values that convert to nothing (e.g. `None`) are skipped without error.
    pub fn push<V: ToMetricValue>(
        &self,
        sink: &mut MetricSink,
        value: V,
        label_values: &[&str],
    ) -> Result<(), MetricError> {
        let Some(value) = value.to_metric_value()? else {
            return Ok(());
        };
        sink.push(self.desc.sample(self.value_type, value, label_values)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_fq_name_skips_empty_parts() {
        assert_eq!(build_fq_name("a", "b", "c"), "a_b_c");
        assert_eq!(build_fq_name("a", "", "c"), "a_c");
        assert_eq!(build_fq_name("", "", "c"), "c");
        assert_eq!(build_fq_name("", "", ""), "");
    }

    #[test]
    fn test_desc_rejects_invalid_names() {
        assert!(Desc::new("1bad", "help", &[]).is_err());
        assert!(Desc::new("has-dash", "help", &[]).is_err());
        assert!(Desc::new("ok_name", "help", &["bad-label"]).is_err());
        assert!(Desc::new("ok_name", "help", &["__reserved"]).is_err());
        assert!(Desc::new("ok:name", "help", &["collector"]).is_ok());
    }

    #[test]
    fn test_sample_label_cardinality() {
        let desc = Desc::new("node_up", "Up.", &["collector"]).unwrap();
        let err = desc.sample(ValueType::Gauge, 1.0, &[]).unwrap_err();
        assert!(matches!(
            err,
            MetricError::LabelCardinality {
                expected: 1,
                actual: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_const_labels_come_first() {
        let desc = Desc::new("node_info", "Info.", &["mode"])
            .unwrap()
            .with_const_label("host", "h1")
            .unwrap();
        let sample = desc.sample(ValueType::Gauge, 1.0, &["user"]).unwrap();
        assert_eq!(
            sample.labels,
            vec![
                ("host".to_string(), "h1".to_string()),
                ("mode".to_string(), "user".to_string()),
            ]
        );
    }

    #[test]
    fn test_typed_desc_push_skips_none() {
        let desc =
            TypedDesc::new("node", "mem", "free_bytes", "Free.", &[], ValueType::Gauge).unwrap();
        let mut sink = MetricSink::new();
        desc.push(&mut sink, None::<u64>, &[]).unwrap();
        assert!(sink.is_empty());
        desc.push(&mut sink, Some(1024_u64), &[]).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.samples()[0].name, "node_mem_free_bytes");
        assert_eq!(sink.samples()[0].value, 1024.0);
    }

    #[test]
    fn test_typed_desc_push_invalid_string() {
        let desc = TypedDesc::new("node", "", "load", "Load.", &[], ValueType::Gauge).unwrap();
        let mut sink = MetricSink::new();
        assert!(desc.push(&mut sink, "abc", &[]).is_err());
        assert!(sink.is_empty());
    }
}
