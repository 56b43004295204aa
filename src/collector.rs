//! Collector Layer
//!
//! Pluggable collectors registered by name, constructed lazily and shared by
//! every scrape.
//!
//! # Architecture
//!
//! - [`Collector`]: core trait, "push fresh measurements now"
//! - [`CollectorRegistry`]: factories plus enabled/disabled state
//! - [`ConstructionCache`]: constructs each collector at most once
//!
//! # Example
//!
//! ```rust
//! use exporter_core::collector::{Collector, CollectorError, CollectorRegistry, factory};
//! use exporter_core::metric::MetricSink;
//!
//! struct Uptime;
//!
//! #[async_trait::async_trait]
//! impl Collector for Uptime {
//!     async fn update(&self, _sink: &mut MetricSink) -> Result<(), CollectorError> {
//!         Err(CollectorError::NoData)
//!     }
//! }
//!
//! let mut registry = CollectorRegistry::new();
//! registry.register("uptime", true, factory(|_ctx| Ok(Uptime))).unwrap();
//! assert!(registry.register("uptime", true, factory(|_ctx| Ok(Uptime))).is_err());
//! ```

mod cache;
mod registry;
mod traits;

pub use cache::ConstructionCache;
pub use registry::{CollectorRegistry, CollectorState, CollectorToggle, FLAG_PREFIX, RegistryError};
pub use traits::{
    Collector, CollectorError, CollectorFactory, FactoryContext, SharedCollector, factory,
};
