//! Construction cache for collector instances.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use crate::collector::{CollectorError, SharedCollector};

type Cell = Arc<OnceCell<SharedCollector>>;

/// Memoizes constructed collectors so state-bearing instances survive
/// across scrapes.
///
/// Each name gets its own initialize-once cell. The map lock is held only to
/// look up or insert a cell, never while a factory runs, so slow constructors
/// do not block unrelated names. A failed construction leaves the cell empty
/// and the next caller tries again.
#[derive(Default)]
pub struct ConstructionCache {
    cells: Mutex<HashMap<String, Cell>>,
}

impl std::fmt::Debug for ConstructionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructionCache")
            .field("constructed", &self.len())
            .finish_non_exhaustive()
    }
}

impl ConstructionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached instance for `name`, running `init` on a miss.
    ///
    /// Concurrent callers for the same name wait for the first construction.
    ///
    /// # Errors
    /// Returns the factory error unchanged; nothing is cached in that case.
    pub async fn get_or_create<F>(
        &self,
        name: &str,
        init: F,
    ) -> Result<SharedCollector, CollectorError>
    where
        F: FnOnce() -> Result<SharedCollector, CollectorError> + Send,
    {
        let cell = self.cell(name);
        let collector = cell
            .get_or_try_init(|| async move {
                let collector = init()?;
                tracing::debug!(collector = %name, "Collector constructed");
                Ok::<_, CollectorError>(collector)
            })
            .await?;
        Ok(Arc::clone(collector))
    }

    /// Whether an instance for `name` has been constructed.
    pub fn contains(&self, name: &str) -> bool {
        self.lock()
            .get(name)
            .is_some_and(|cell| cell.initialized())
    }

    /// Number of constructed instances.
    pub fn len(&self) -> usize {
        self.lock().values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, name: &str) -> Cell {
        Arc::clone(self.lock().entry(name.to_string()).or_default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Cell>> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
