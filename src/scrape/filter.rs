//! Request filter resolution (`collect[]` / `exclude[]`).

use std::collections::HashSet;

use super::ScrapeError;

/// Query parameter holding the allow-list.
pub const COLLECT_PARAM: &str = "collect[]";

/// Query parameter holding the deny-list.
pub const EXCLUDE_PARAM: &str = "exclude[]";

/// Collector filter as supplied by a scrape request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRequest {
    /// Collectors to run (allow-list).
    pub collect: Vec<String>,
    /// Collectors to skip (deny-list).
    pub exclude: Vec<String>,
}

/// Resolved filter for one scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every enabled collector.
    All,
    /// Exactly these collectors. May be empty.
    Only(Vec<String>),
}

impl FilterRequest {
    /// Request without any filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse repeated `collect[]` and `exclude[]` parameters from a raw query
    /// string. Other parameters and empty values are ignored.
    ///
    /// ```
    /// use exporter_core::scrape::FilterRequest;
    ///
    /// let req = FilterRequest::from_query("collect[]=cpu&collect%5B%5D=mem&debug=1");
    /// assert_eq!(req.collect, vec!["cpu", "mem"]);
    /// assert!(req.exclude.is_empty());
    /// ```
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut request = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                COLLECT_PARAM => request.collect.push(value.into_owned()),
                EXCLUDE_PARAM => request.exclude.push(value.into_owned()),
                _ => {}
            }
        }
        request
    }

    /// Set the allow-list.
    pub fn with_collect<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collect = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the deny-list.
    pub fn with_exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.collect.is_empty() && self.exclude.is_empty()
    }

    /// Resolve against the collectors enabled at startup.
    ///
    /// Names in `exclude` that are not enabled are ignored. Names in
    /// `collect` are passed through and validated when the collection is
    /// built.
    ///
    /// # Errors
    /// Returns `ScrapeError::ConflictingFilters` if both lists are set.
    pub fn resolve(&self, startup_enabled: &[String]) -> Result<Filter, ScrapeError> {
        match (self.collect.is_empty(), self.exclude.is_empty()) {
            (true, true) => Ok(Filter::All),
            (false, false) => Err(ScrapeError::ConflictingFilters),
            (false, true) => Ok(Filter::Only(self.collect.clone())),
            (true, false) => {
                let excluded: HashSet<&str> = self.exclude.iter().map(String::as_str).collect();
                Ok(Filter::Only(
                    startup_enabled
                        .iter()
                        .filter(|name| !excluded.contains(name.as_str()))
                        .cloned()
                        .collect(),
                ))
            }
        }
    }
}
