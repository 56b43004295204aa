//! exporter-core - Collector Engine for Pull-Based Exporters
//!
//! This crate provides the in-process machinery behind a metrics exporter:
//! a registry of named collectors, lazy shared construction, and a scrape
//! orchestrator that runs every active collector concurrently and reports
//! per-collector duration and success.
//!
//! # Architecture
//!
//! - **Collectors**: [`Collector`] trait, [`CollectorRegistry`], construction cache
//! - **Scrape**: request filters (`collect[]` / `exclude[]`) and concurrent collection
//! - **Metric**: descriptors and samples; encoding is left to the transport layer
//! - **Config**: YAML configuration of namespace, overrides and scrape limits
//!
//! # Example
//!
//! ```rust
//! use exporter_core::{
//!     Collector, CollectorError, CollectorRegistry, Exporter, FilterRequest, factory,
//!     metric::{MetricSink, TypedDesc, ValueType},
//! };
//!
//! struct Answer(TypedDesc);
//!
//! #[async_trait::async_trait]
//! impl Collector for Answer {
//!     async fn update(&self, sink: &mut MetricSink) -> Result<(), CollectorError> {
//!         self.0.push(sink, 42_u32, &[])?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = CollectorRegistry::new();
//!     registry.register(
//!         "answer",
//!         true,
//!         factory(|ctx| Ok(Answer(ctx.desc("", "answer", "The answer.", &[], ValueType::Gauge)?))),
//!     )?;
//!
//!     let exporter = Exporter::new("demo_exporter", "demo", registry)?;
//!     let samples = exporter.scrape(&FilterRequest::from_query("collect[]=answer")).await?;
//!     // demo_answer, then the duration/success pair for "answer"
//!     assert_eq!(samples.len(), 3);
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod config;
pub mod exporter;
pub mod metric;
pub mod scrape;

pub use collector::{
    Collector, CollectorError, CollectorRegistry, CollectorState, RegistryError, factory,
};
pub use config::{ConfigError, ExporterConfig};
pub use exporter::Exporter;
pub use metric::{MetricSink, Sample};
pub use scrape::{Collection, Filter, FilterRequest, ScrapeError};
