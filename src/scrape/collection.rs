//! Concurrent execution of one scrape.

use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::Instrument;

use crate::collector::{Collector, CollectorError, SharedCollector};
use crate::metric::{MetricError, MetricSink, Sample, TypedDesc, ValueType};

/// Subsystem of the per-collector meta metrics.
const SCRAPE_SUBSYSTEM: &str = "scrape";

/// Label carrying the collector name on meta metrics.
const COLLECTOR_LABEL: &str = "collector";

/// How one collector run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeStatus {
    /// Measurements produced.
    Success,
    /// Collector reported it had nothing to collect.
    NoData,
    /// Collector returned an error or panicked.
    Failed(String),
}

/// Result of running one collector during a scrape.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub name: String,
    pub duration: Duration,
    pub status: ScrapeStatus,
}

impl ScrapeOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ScrapeStatus::Success
    }
}

/// Descriptors of the two meta metrics emitted for every collector.
#[derive(Debug)]
pub(crate) struct MetaDescs {
    duration: TypedDesc,
    success: TypedDesc,
}

impl MetaDescs {
    pub(crate) fn new(namespace: &str, exporter_name: &str) -> Result<Self, MetricError> {
        Ok(Self {
            duration: TypedDesc::new(
                namespace,
                SCRAPE_SUBSYSTEM,
                "collector_duration_seconds",
                format!("{exporter_name}: Duration of a collector scrape."),
                &[COLLECTOR_LABEL],
                ValueType::Gauge,
            )?,
            success: TypedDesc::new(
                namespace,
                SCRAPE_SUBSYSTEM,
                "collector_success",
                format!("{exporter_name}: Whether a collector succeeded."),
                &[COLLECTOR_LABEL],
                ValueType::Gauge,
            )?,
        })
    }

    /// Push the duration and success samples for `outcome`, both or neither.
    fn record(&self, sink: &mut MetricSink, outcome: &ScrapeOutcome) -> Result<(), MetricError> {
        let labels = [outcome.name.as_str()];
        let duration = self.duration.desc.sample(
            self.duration.value_type,
            outcome.duration.as_secs_f64(),
            &labels,
        )?;
        let success = self.success.desc.sample(
            self.success.value_type,
            if outcome.is_success() { 1.0 } else { 0.0 },
            &labels,
        )?;
        sink.push(duration);
        sink.push(success);
        Ok(())
    }
}

/// The active set of one scrape, ready to run.
///
/// Built per request by [`Exporter::build`](crate::Exporter::build) and
/// dropped after [`collect`](Self::collect).
pub struct Collection {
    collectors: BTreeMap<String, SharedCollector>,
    meta: Arc<MetaDescs>,
    slow_scrape_warning: Option<Duration>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("collectors", &self.collectors.keys().collect::<Vec<_>>())
            .field("slow_scrape_warning", &self.slow_scrape_warning)
            .finish_non_exhaustive()
    }
}

impl Collection {
    pub(crate) fn new(
        collectors: BTreeMap<String, SharedCollector>,
        meta: Arc<MetaDescs>,
        slow_scrape_warning: Option<Duration>,
    ) -> Self {
        Self {
            collectors,
            meta,
            slow_scrape_warning,
        }
    }

    /// Names in the active set, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collectors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Run every collector concurrently and gather their samples.
    ///
    /// Waits for all collectors. Each contributes its own samples followed by
    /// its duration/success pair; order across collectors follows completion.
    /// A collector error or panic only sets its success sample to 0.
    ///
    /// Collectors run on detached tasks: dropping the returned future stops
    /// waiting but lets every `update` run to completion.
    pub async fn collect(&self) -> Vec<Sample> {
        let began = Instant::now();
        let mut running: FuturesUnordered<_> = self
            .collectors
            .iter()
            .map(|(name, collector)| {
                let task_name = name.clone();
                let collector = Arc::clone(collector);
                let meta = Arc::clone(&self.meta);
                let span = tracing::debug_span!("collector", collector = %name);
                let handle = tokio::spawn(
                    async move { execute(&task_name, collector.as_ref(), &meta).await }
                        .instrument(span),
                );
                let name = name.clone();
                handle.map(move |joined| (name, joined))
            })
            .collect();

        let mut pending: BTreeSet<&str> = self.names().collect();
        let mut samples = Vec::new();
        let mut warn_deadline = self
            .slow_scrape_warning
            .map(|after| tokio::time::Instant::now() + after);

        loop {
            let next = match warn_deadline {
                Some(deadline) => tokio::select! {
                    next = running.next() => next,
                    () = tokio::time::sleep_until(deadline) => {
                        tracing::warn!(
                            pending = ?pending,
                            "Scrape still waiting on collectors"
                        );
                        warn_deadline = None;
                        continue;
                    }
                },
                None => running.next().await,
            };

            let Some((name, joined)) = next else {
                break;
            };
            pending.remove(name.as_str());
            match joined {
                Ok(sink) => samples.extend(sink.into_samples()),
                Err(e) => {
                    tracing::error!(collector = %name, error = %e, "Collector task did not complete");
                    let sink = abandoned(&self.meta, name, began.elapsed(), e.to_string());
                    samples.extend(sink.into_samples());
                }
            }
        }

        samples
    }
}

/// Run one collector, time it and append its meta samples.
async fn execute(name: &str, collector: &dyn Collector, meta: &MetaDescs) -> MetricSink {
    let mut sink = MetricSink::new();
    let begin = Instant::now();
    let result = AssertUnwindSafe(collector.update(&mut sink))
        .catch_unwind()
        .await;
    let duration = begin.elapsed();
    let duration_seconds = duration.as_secs_f64();

    let status = match result {
        Ok(Ok(())) => {
            tracing::debug!(collector = %name, duration_seconds, "Collector succeeded");
            ScrapeStatus::Success
        }
        Ok(Err(CollectorError::NoData)) => {
            tracing::debug!(collector = %name, duration_seconds, "Collector returned no data");
            ScrapeStatus::NoData
        }
        Ok(Err(e)) => {
            tracing::error!(collector = %name, duration_seconds, error = %e, "Collector failed");
            ScrapeStatus::Failed(e.to_string())
        }
        Err(panic) => {
            let message = panic_message(&*panic);
            tracing::error!(collector = %name, duration_seconds, error = %message, "Collector panicked");
            ScrapeStatus::Failed(message)
        }
    };

    let outcome = ScrapeOutcome {
        name: name.to_string(),
        duration,
        status,
    };
    if let Err(e) = meta.record(&mut sink, &outcome) {
        tracing::warn!(collector = %name, error = %e, "Failed to record scrape metrics");
    }
    sink
}

/// Meta samples for a collector whose task never reported back.
fn abandoned(meta: &MetaDescs, name: String, duration: Duration, reason: String) -> MetricSink {
    let mut sink = MetricSink::new();
    let outcome = ScrapeOutcome {
        name,
        duration,
        status: ScrapeStatus::Failed(reason),
    };
    if let Err(e) = meta.record(&mut sink, &outcome) {
        tracing::warn!(collector = %outcome.name, error = %e, "Failed to record scrape metrics");
    }
    sink
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}
