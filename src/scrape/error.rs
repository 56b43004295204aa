//! Scrape request errors.

use http::StatusCode;
use thiserror::Error;

use crate::collector::CollectorError;

/// Errors that reject a scrape request before any collector runs.
///
/// Failures inside a running collector never surface here; they are
/// reported through the per-collector success metric instead.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Both `collect[]` and `exclude[]` were supplied.
    #[error("collect[] and exclude[] filters are mutually exclusive")]
    ConflictingFilters,

    /// Filter names a collector that is not registered.
    #[error("missing collector: {0}")]
    MissingCollector(String),

    /// Filter names a registered collector that is disabled.
    #[error("disabled collector: {0}")]
    DisabledCollector(String),

    /// A collector factory failed.
    #[error("couldn't create collector {name}: {source}")]
    Construction {
        name: String,
        #[source]
        source: CollectorError,
    },

    /// The in-flight scrape limit is reached.
    #[error("too many concurrent scrape requests (limit {0})")]
    TooManyRequests(usize),
}

impl ScrapeError {
    /// HTTP status the transport layer should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ConflictingFilters | Self::MissingCollector(_) | Self::DisabledCollector(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Construction { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::TooManyRequests(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
