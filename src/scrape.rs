//! Scrape Layer
//!
//! Turns a scrape request into a set of collectors and runs them.
//!
//! - [`FilterRequest`]: `collect[]` / `exclude[]` parameters and their resolution
//! - [`Collection`]: active set of one request, executed concurrently
//! - [`ScrapeError`]: request-level rejections

mod collection;
mod error;
mod filter;

pub(crate) use collection::MetaDescs;
pub use collection::{Collection, ScrapeOutcome, ScrapeStatus};
pub use error::ScrapeError;
pub use filter::{COLLECT_PARAM, EXCLUDE_PARAM, Filter, FilterRequest};
