//! Scrape orchestrator.
//!
//! [`Exporter`] owns the frozen collector registry and the construction
//! cache, and answers scrape requests. A transport layer calls
//! [`Exporter::scrape`] per request and encodes the returned samples.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::collector::{
    CollectorError, CollectorRegistry, ConstructionCache, FactoryContext, SharedCollector,
};
use crate::config::{ConfigError, DEFAULT_MAX_CONCURRENT_SCRAPES, ExporterConfig};
use crate::metric::{Desc, MetricError, Sample, ValueType};
use crate::scrape::{Collection, Filter, FilterRequest, MetaDescs, ScrapeError};

/// Collector registry plus everything needed to serve scrapes.
pub struct Exporter {
    name: String,
    namespace: String,
    version: Option<String>,
    registry: CollectorRegistry,
    cache: ConstructionCache,
    meta: Arc<MetaDescs>,
    build_info: Desc,
    startup_enabled: Vec<String>,
    limiter: Option<Semaphore>,
    max_concurrent_scrapes: usize,
    slow_scrape_warning: Option<Duration>,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("version", &self.version)
            .field("enabled", &self.startup_enabled)
            .field("max_concurrent_scrapes", &self.max_concurrent_scrapes)
            .finish_non_exhaustive()
    }
}

impl Exporter {
    /// Create an exporter serving the collectors of `registry`.
    ///
    /// The registry's state is final from here on; the enabled set is
    /// recorded and logged. At most [`DEFAULT_MAX_CONCURRENT_SCRAPES`] scrapes
    /// are served in parallel unless changed with
    /// [`with_max_concurrent_scrapes`](Self::with_max_concurrent_scrapes).
    ///
    /// # Errors
    /// Returns `MetricError::InvalidName` if `namespace` or `exporter_name`
    /// cannot form metric names.
    pub fn new(
        exporter_name: impl Into<String>,
        namespace: impl Into<String>,
        registry: CollectorRegistry,
    ) -> Result<Self, MetricError> {
        let name = exporter_name.into();
        let namespace = namespace.into();
        let meta = MetaDescs::new(&namespace, &name)?;
        let build_info = Desc::new(
            format!("{name}_build_info"),
            format!("A metric with a constant '1' value labeled by version from which {name} was built."),
            &["version"],
        )?;

        let startup_enabled = registry.enabled_names();
        tracing::info!(
            exporter = %name,
            registered = registry.len(),
            count = startup_enabled.len(),
            "Enabled collectors"
        );
        for collector in &startup_enabled {
            tracing::info!(collector = %collector, "Collector enabled");
        }

        Ok(Self {
            name,
            namespace,
            version: None,
            registry,
            cache: ConstructionCache::new(),
            meta: Arc::new(meta),
            build_info,
            startup_enabled,
            limiter: None,
            max_concurrent_scrapes: 0,
            slow_scrape_warning: None,
        }
        .with_max_concurrent_scrapes(DEFAULT_MAX_CONCURRENT_SCRAPES))
    }

    /// Apply `config` to `registry` and create the exporter.
    ///
    /// # Errors
    /// Returns `ConfigError` if the config is invalid or names unknown collectors.
    pub fn from_config(
        config: &ExporterConfig,
        mut registry: CollectorRegistry,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        config.apply(&mut registry)?;

        let mut exporter = Self::new(&config.exporter_name, &config.namespace, registry)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?
            .with_max_concurrent_scrapes(config.scrape.max_concurrent_scrapes);
        if let Some(version) = &config.version {
            exporter = exporter.with_version(version);
        }
        if let Some(after) = config.scrape.slow_warning {
            exporter = exporter.with_slow_scrape_warning(after);
        }
        Ok(exporter)
    }

    /// Report `version` through the build info metric.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Limit the number of scrapes served in parallel; 0 disables the limit.
    pub fn with_max_concurrent_scrapes(mut self, limit: usize) -> Self {
        self.max_concurrent_scrapes = limit;
        self.limiter = (limit > 0).then(|| Semaphore::new(limit));
        self
    }

    /// Log a warning when a scrape runs longer than `after`.
    pub fn with_slow_scrape_warning(mut self, after: Duration) -> Self {
        self.slow_scrape_warning = Some(after);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Limit of scrapes served in parallel; 0 means unlimited.
    pub fn max_concurrent_scrapes(&self) -> usize {
        self.max_concurrent_scrapes
    }

    pub fn registry(&self) -> &CollectorRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ConstructionCache {
        &self.cache
    }

    /// Collectors enabled when the exporter was created, sorted.
    pub fn enabled_collectors(&self) -> &[String] {
        &self.startup_enabled
    }

    /// Build the active set for `filter`.
    ///
    /// Instances come from the construction cache; the first request for a
    /// collector constructs it.
    ///
    /// # Errors
    /// - `ScrapeError::MissingCollector` / `DisabledCollector` for bad filter names
    /// - `ScrapeError::Construction` if any factory fails; nothing runs then
    pub async fn build(&self, filter: &Filter) -> Result<Collection, ScrapeError> {
        let active = self.active_set(filter)?;

        let mut collectors = BTreeMap::new();
        for name in active {
            let collector = self.get_or_create(&name).await.map_err(|source| {
                tracing::error!(collector = %name, error = %source, "Collector construction failed");
                ScrapeError::Construction {
                    name: name.clone(),
                    source,
                }
            })?;
            collectors.insert(name, collector);
        }

        Ok(Collection::new(
            collectors,
            Arc::clone(&self.meta),
            self.slow_scrape_warning,
        ))
    }

    /// Serve one scrape: resolve the filter, build, collect and append the
    /// build info sample.
    ///
    /// # Errors
    /// Returns `ScrapeError` when the request is rejected before collection.
    pub async fn scrape(&self, request: &FilterRequest) -> Result<Vec<Sample>, ScrapeError> {
        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.try_acquire().map_err(|_| {
                tracing::warn!(limit = self.max_concurrent_scrapes, "Scrape rejected, limit reached");
                ScrapeError::TooManyRequests(self.max_concurrent_scrapes)
            })?),
            None => None,
        };

        tracing::debug!(collect = ?request.collect, exclude = ?request.exclude, "Scrape requested");
        let filter = request.resolve(&self.startup_enabled)?;
        let collection = self.build(&filter).await.inspect_err(|e| {
            tracing::warn!(error = %e, "Couldn't create filtered collection");
        })?;

        let mut samples = collection.collect().await;
        if let Some(version) = &self.version {
            match self.build_info.sample(ValueType::Gauge, 1.0, &[version.as_str()]) {
                Ok(sample) => samples.push(sample),
                Err(e) => tracing::warn!(error = %e, "Failed to record build info"),
            }
        }
        Ok(samples)
    }

    fn active_set(&self, filter: &Filter) -> Result<Vec<String>, ScrapeError> {
        let names = match filter {
            Filter::All => return Ok(self.registry.enabled_names()),
            Filter::Only(names) => names,
        };

        let mut active = BTreeSet::new();
        for name in names {
            match self.registry.state(name) {
                None => return Err(ScrapeError::MissingCollector(name.clone())),
                Some(state) if !state.enabled => {
                    return Err(ScrapeError::DisabledCollector(name.clone()));
                }
                Some(_) => {
                    active.insert(name.clone());
                }
            }
        }
        Ok(active.into_iter().collect())
    }

    async fn get_or_create(&self, name: &str) -> Result<SharedCollector, CollectorError> {
        let ctx = FactoryContext::new(&self.namespace, name);
        self.cache
            .get_or_create(name, || {
                self.registry.construct(name, &ctx).unwrap_or_else(|| {
                    Err(CollectorError::failed(format!(
                        "no factory registered for {name}"
                    )))
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{Collector, factory};
    use crate::metric::MetricSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Noop;

    #[async_trait::async_trait]
    impl Collector for Noop {
        async fn update(&self, _sink: &mut MetricSink) -> Result<(), CollectorError> {
            Ok(())
        }
    }

    struct Blocking(Arc<tokio::sync::Notify>);

    #[async_trait::async_trait]
    impl Collector for Blocking {
        async fn update(&self, _sink: &mut MetricSink) -> Result<(), CollectorError> {
            self.0.notified().await;
            Ok(())
        }
    }

    fn exporter() -> Exporter {
        let mut registry = CollectorRegistry::new();
        registry.register("cpu", true, factory(|_| Ok(Noop))).unwrap();
        registry.register("mem", true, factory(|_| Ok(Noop))).unwrap();
        registry.register("disk", false, factory(|_| Ok(Noop))).unwrap();
        Exporter::new("node_exporter", "node", registry).unwrap()
    }

    fn collectors(collection: &Collection) -> Vec<&str> {
        collection.names().collect()
    }

    #[tokio::test]
    async fn test_build_without_filter() {
        let exporter = exporter();
        let collection = exporter.build(&Filter::All).await.unwrap();
        assert_eq!(collectors(&collection), vec!["cpu", "mem"]);
        assert_eq!(exporter.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_build_rejects_bad_filters() {
        let exporter = exporter();
        let err = exporter
            .build(&Filter::Only(vec!["disk".to_string()]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "disabled collector: disk");

        let err = exporter
            .build(&Filter::Only(vec!["cpu".to_string(), "gpu".to_string()]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "missing collector: gpu");
        // Rejected before anything was constructed
        assert!(exporter.cache().is_empty());
    }

    #[tokio::test]
    async fn test_build_deduplicates_filter() {
        let exporter = exporter();
        let collection = exporter
            .build(&Filter::Only(vec!["mem".to_string(), "mem".to_string()]))
            .await
            .unwrap();
        assert_eq!(collectors(&collection), vec!["mem"]);
    }

    #[tokio::test]
    async fn test_construction_failure_aborts_and_retries() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let mut registry = CollectorRegistry::new();
        registry.register("cpu", true, factory(|_| Ok(Noop))).unwrap();
        registry
            .register(
                "flaky",
                true,
                factory(move |_| {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(CollectorError::failed("device busy"))
                    } else {
                        Ok(Noop)
                    }
                }),
            )
            .unwrap();
        let exporter = Exporter::new("node_exporter", "node", registry).unwrap();

        let err = exporter.scrape(&FilterRequest::new()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Construction { ref name, .. } if name == "flaky"));
        assert_eq!(err.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);

        let samples = exporter.scrape(&FilterRequest::new()).await.unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_build_info_sample() {
        let exporter = exporter().with_version("1.2.3");
        let samples = exporter
            .scrape(&FilterRequest::new().with_collect(["cpu"]))
            .await
            .unwrap();
        let info = samples
            .iter()
            .find(|s| s.name == "node_exporter_build_info")
            .unwrap();
        assert_eq!(info.value, 1.0);
        assert_eq!(info.label("version"), Some("1.2.3"));
    }

    #[tokio::test]
    async fn test_scrape_limit() {
        let notify = Arc::new(tokio::sync::Notify::new());
        let blocker = Arc::clone(&notify);

        let mut registry = CollectorRegistry::new();
        registry
            .register(
                "blocking",
                true,
                factory(move |_| Ok(Blocking(Arc::clone(&blocker)))),
            )
            .unwrap();
        let exporter = Arc::new(
            Exporter::new("app_exporter", "app", registry)
                .unwrap()
                .with_max_concurrent_scrapes(1),
        );

        let first = tokio::spawn({
            let exporter = Arc::clone(&exporter);
            async move { exporter.scrape(&FilterRequest::new()).await }
        });
        // Let the first scrape take the permit and block
        while !exporter.cache().contains("blocking") {
            tokio::task::yield_now().await;
        }

        let err = exporter.scrape(&FilterRequest::new()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::TooManyRequests(1)));

        notify.notify_one();
        let samples = first.await.unwrap().unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[tokio::test]
    async fn test_from_config() {
        let mut registry = CollectorRegistry::new();
        registry.register("cpu", true, factory(|_| Ok(Noop))).unwrap();
        registry.register("disk", false, factory(|_| Ok(Noop))).unwrap();

        let config = ExporterConfig::new("node", "node_exporter")
            .with_collector("disk", true)
            .with_disable_defaults(true)
            .with_version("0.1.0");
        let exporter = Exporter::from_config(&config, registry).unwrap();
        assert_eq!(exporter.enabled_collectors().to_vec(), vec!["disk".to_string()]);
        assert!(!exporter.registry().state("cpu").unwrap().enabled);
    }

    #[test]
    fn test_constructors_share_scrape_limit_default() {
        assert_eq!(exporter().max_concurrent_scrapes(), DEFAULT_MAX_CONCURRENT_SCRAPES);

        let mut registry = CollectorRegistry::new();
        registry.register("cpu", true, factory(|_| Ok(Noop))).unwrap();
        let config = ExporterConfig::new("node", "node_exporter");
        let exporter = Exporter::from_config(&config, registry).unwrap();
        assert_eq!(exporter.max_concurrent_scrapes(), DEFAULT_MAX_CONCURRENT_SCRAPES);

        assert_eq!(exporter.with_max_concurrent_scrapes(0).max_concurrent_scrapes(), 0);
    }
}
