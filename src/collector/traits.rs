//! Core collector traits and types.

use std::sync::Arc;

use thiserror::Error;

use crate::metric::{MetricError, MetricSink, TypedDesc, ValueType};

/// Errors that a collector can report from `update()` or construction.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Nothing to report this time. Expected, logged at low severity.
    #[error("collector returned no data")]
    NoData,

    /// Failed to describe or record a metric.
    #[error("metric error: {0}")]
    Metric(#[from] MetricError),

    /// I/O error while reading the source.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Collection failed with a message.
    #[error("collection failed: {0}")]
    Failed(String),

    /// Any other error raised by the collector.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl CollectorError {
    /// Build a [`CollectorError::Failed`] from any displayable message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Whether this is the "nothing to report" signal.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

/// Core collector trait.
///
/// A collector produces fresh measurements each time it is asked. One
/// instance is shared by every concurrent scrape, so state that changes
/// between calls needs interior mutability.
///
/// # Returns
///
/// - `Ok(())`: measurements were pushed (possibly none)
/// - `Err(CollectorError::NoData)`: nothing to report, not a failure of the source
/// - `Err(_)`: anything else; recorded as a failed collection
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Push current measurements into `sink`.
    async fn update(&self, sink: &mut MetricSink) -> Result<(), CollectorError>;
}

/// Information handed to a factory when a collector is constructed.
#[derive(Debug, Clone)]
pub struct FactoryContext {
    /// Metric namespace shared by every collector of the exporter.
    pub namespace: String,
    /// Registered collector name.
    pub collector: String,
}

impl FactoryContext {
    pub fn new(namespace: impl Into<String>, collector: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            collector: collector.into(),
        }
    }

    /// Build a descriptor in this exporter's namespace.
    pub fn desc(
        &self,
        subsystem: &str,
        name: &str,
        help: impl Into<String>,
        variable_labels: &[&str],
        value_type: ValueType,
    ) -> Result<TypedDesc, MetricError> {
        TypedDesc::new(
            &self.namespace,
            subsystem,
            name,
            help,
            variable_labels,
            value_type,
        )
    }
}

/// Shared, type-erased collector instance.
pub type SharedCollector = Arc<dyn Collector>;

/// Constructor registered for a collector name.
pub type CollectorFactory =
    Arc<dyn Fn(&FactoryContext) -> Result<SharedCollector, CollectorError> + Send + Sync>;

/// Erase a typed constructor into a [`CollectorFactory`].
pub fn factory<C, F>(f: F) -> CollectorFactory
where
    C: Collector,
    F: Fn(&FactoryContext) -> Result<C, CollectorError> + Send + Sync + 'static,
{
    Arc::new(move |ctx| f(ctx).map(|c| Arc::new(c) as SharedCollector))
}
