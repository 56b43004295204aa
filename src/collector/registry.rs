//! Collector registry: factories plus enabled/disabled state.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::collector::{CollectorError, CollectorFactory, FactoryContext, SharedCollector};

/// Prefix of the toggle flag installed for every collector.
pub const FLAG_PREFIX: &str = "collector.";

/// Registry configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A collector with this name is already registered.
    #[error("collector already registered: {0}")]
    Duplicate(String),

    /// No collector with this name is registered.
    #[error("unknown collector: {0}")]
    Unknown(String),
}

/// Effective on/off state of a registered collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorState {
    /// Whether the collector takes part in scrapes.
    pub enabled: bool,
    /// Whether a user explicitly set `enabled`.
    pub forced: bool,
    /// State the collector was registered with.
    pub default_enabled: bool,
}

/// Toggle metadata for installing a `--collector.<name>` style switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorToggle {
    /// Collector name.
    pub name: String,
    /// Flag name, e.g. `collector.cpu`.
    pub flag: String,
    /// Help text describing the default.
    pub help: String,
    /// Default state.
    pub default_enabled: bool,
}

struct Entry {
    factory: CollectorFactory,
    state: CollectorState,
}

/// Table of collector factories and their enabled state.
///
/// Configuration methods take `&mut self`. Once the registry is handed to an
/// [`Exporter`](crate::Exporter) it is shared immutably, so state cannot
/// change while scrapes are served.
#[derive(Default)]
pub struct CollectorRegistry {
    entries: BTreeMap<String, Entry>,
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field(
                "collectors",
                &self
                    .entries
                    .iter()
                    .map(|(name, entry)| (name, entry.state))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CollectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector exactly once.
    ///
    /// # Errors
    /// Returns `RegistryError::Duplicate` if `name` is already registered.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        default_enabled: bool,
        factory: CollectorFactory,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        tracing::debug!(collector = %name, default_enabled, "Collector registered");
        self.entries.insert(
            name,
            Entry {
                factory,
                state: CollectorState {
                    enabled: default_enabled,
                    forced: false,
                    default_enabled,
                },
            },
        );
        Ok(())
    }

    /// Record an explicit user choice for a collector.
    ///
    /// # Errors
    /// Returns `RegistryError::Unknown` if `name` is not registered.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))?;
        entry.state.enabled = enabled;
        entry.state.forced = true;
        Ok(())
    }

    /// Disable every collector whose state was not set explicitly.
    ///
    /// Afterwards only collectors enabled through [`set_enabled`](Self::set_enabled) run.
    pub fn disable_defaults(&mut self) {
        for (name, entry) in self.entries.iter_mut() {
            if !entry.state.forced {
                entry.state.enabled = false;
                tracing::trace!(collector = %name, "Default collector disabled");
            }
        }
    }

    /// State of a registered collector.
    pub fn state(&self, name: &str) -> Option<CollectorState> {
        self.entries.get(name).map(|e| e.state)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Names of currently enabled collectors, sorted.
    pub fn enabled_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.state.enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Number of registered collectors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Toggle metadata for every collector, sorted by name.
    pub fn toggles(&self) -> Vec<CollectorToggle> {
        self.entries
            .iter()
            .map(|(name, entry)| {
                let default_state = if entry.state.default_enabled {
                    "enabled"
                } else {
                    "disabled"
                };
                CollectorToggle {
                    name: name.clone(),
                    flag: format!("{FLAG_PREFIX}{name}"),
                    help: format!("Enable the {name} collector (default: {default_state})."),
                    default_enabled: entry.state.default_enabled,
                }
            })
            .collect()
    }

    /// Run the factory registered for `name`.
    pub(crate) fn construct(
        &self,
        name: &str,
        ctx: &FactoryContext,
    ) -> Option<Result<SharedCollector, CollectorError>> {
        self.entries.get(name).map(|e| (e.factory)(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{Collector, factory};
    use crate::metric::MetricSink;

    struct Noop;

    #[async_trait::async_trait]
    impl Collector for Noop {
        async fn update(&self, _sink: &mut MetricSink) -> Result<(), CollectorError> {
            Ok(())
        }
    }

    fn registry_with(entries: &[(&str, bool)]) -> CollectorRegistry {
        let mut registry = CollectorRegistry::new();
        for (name, enabled) in entries {
            registry
                .register(*name, *enabled, factory(|_| Ok(Noop)))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        for name in ["cpu", "mem", "disk", ""] {
            let mut registry = registry_with(&[(name, true)]);
            let err = registry
                .register(name, false, factory(|_| Ok(Noop)))
                .unwrap_err();
            assert_eq!(err, RegistryError::Duplicate(name.to_string()));
            // First registration untouched
            assert!(registry.state(name).unwrap().enabled);
        }
    }

    #[test]
    fn test_enabled_names_sorted() {
        let registry = registry_with(&[("mem", true), ("disk", false), ("cpu", true)]);
        assert_eq!(registry.enabled_names(), vec!["cpu", "mem"]);
        assert_eq!(registry.names(), vec!["cpu", "disk", "mem"]);
        assert_eq!(registry.len(), 3);
        assert!(CollectorRegistry::new().is_empty());
    }

    #[test]
    fn test_set_enabled_marks_forced() {
        let mut registry = registry_with(&[("cpu", true), ("disk", false)]);
        registry.set_enabled("disk", true).unwrap();
        let state = registry.state("disk").unwrap();
        assert!(state.enabled && state.forced && !state.default_enabled);

        assert_eq!(
            registry.set_enabled("gpu", true),
            Err(RegistryError::Unknown("gpu".to_string()))
        );
    }

    #[test]
    fn test_disable_defaults_keeps_forced() {
        let mut registry = registry_with(&[("cpu", true), ("mem", true), ("disk", false)]);
        registry.set_enabled("mem", true).unwrap();
        registry.set_enabled("disk", true).unwrap();
        registry.disable_defaults();
        assert_eq!(registry.enabled_names(), vec!["disk", "mem"]);

        // Forced off stays off
        let mut registry = registry_with(&[("cpu", true)]);
        registry.set_enabled("cpu", false).unwrap();
        registry.disable_defaults();
        assert!(registry.enabled_names().is_empty());
    }

    #[test]
    fn test_toggles() {
        let registry = registry_with(&[("mem", true), ("disk", false)]);
        let toggles = registry.toggles();
        assert_eq!(toggles.len(), 2);
        assert_eq!(toggles[0].flag, "collector.disk");
        assert_eq!(
            toggles[0].help,
            "Enable the disk collector (default: disabled)."
        );
        assert_eq!(toggles[1].help, "Enable the mem collector (default: enabled).");
    }
}
