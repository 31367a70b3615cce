//! Fan-in querier over a set of store shards.
//!
//! The querier asks every [`StoreClient`] for its series, wraps each answer in
//! a [`StoreSeriesSet`] and merges them with [`merge_all_series_sets`]. Label
//! name and value lookups are unioned across stores with [`dedup_strings`].
//!
//! # Partial responses
//!
//! With [`QuerierConfig::partial_response`] enabled, a failing store is logged
//! and skipped, and its error is recorded in [`Querier::warnings`]. Otherwise
//! the first failure aborts the query.

use crate::error::Result;
use crate::merge::merge_all_series_sets;
use crate::series::{ErrSeriesSet, SeriesRecord, SeriesSet, StoreSeriesSet};
use crate::strings::dedup_strings;
use crate::window::TimeWindow;
use tracing::{debug, warn};

/// Client for one store shard.
///
/// Implementations own transport, retries and shard discovery. Returned
/// series must be sorted by label set and their chunks by time.
pub trait StoreClient {
    /// Name used in logs and warnings.
    fn name(&self) -> &str;

    /// Returns all series with samples in `window`.
    fn series(&self, window: TimeWindow) -> Result<Vec<SeriesRecord>>;

    /// Returns the sorted label names known to the store.
    fn label_names(&self) -> Result<Vec<String>>;

    /// Returns the sorted values of the named label.
    fn label_values(&self, name: &str) -> Result<Vec<String>>;
}

/// Configuration for a [`Querier`].
#[derive(Debug, Clone, Default)]
pub struct QuerierConfig {
    /// Skip failing stores instead of failing the whole query.
    pub partial_response: bool,
}

impl QuerierConfig {
    /// Creates a configuration with custom settings.
    pub fn new(partial_response: bool) -> Self {
        Self { partial_response }
    }
}

/// Queries several stores and merges their answers.
pub struct Querier {
    stores: Vec<Box<dyn StoreClient>>,
    config: QuerierConfig,
    warnings: Vec<String>,
}

impl Querier {
    /// Creates a querier over `stores`.
    pub fn new(stores: Vec<Box<dyn StoreClient>>, config: QuerierConfig) -> Self {
        Self {
            stores,
            config,
            warnings: Vec::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &QuerierConfig {
        &self.config
    }

    /// Warnings collected by the last query.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Selects every series in `window` from all stores.
    ///
    /// Without partial responses, a store failure yields an [`ErrSeriesSet`]
    /// carrying that failure.
    pub fn select(&mut self, window: TimeWindow) -> Box<dyn SeriesSet> {
        self.warnings.clear();
        if window.mint > window.maxt {
            debug!(mint = window.mint, maxt = window.maxt, "empty query window");
            return Box::new(ErrSeriesSet::empty());
        }

        let mut sets: Vec<Box<dyn SeriesSet>> = Vec::with_capacity(self.stores.len());
        for store in &self.stores {
            match store.series(window) {
                Ok(series) => {
                    debug!(store = store.name(), series = series.len(), "received series");
                    sets.push(Box::new(StoreSeriesSet::new(series, window)));
                }
                Err(err) if self.config.partial_response => {
                    warn!(store = store.name(), %err, "store failed, returning partial response");
                    self.warnings.push(err.to_string());
                }
                Err(err) => return Box::new(ErrSeriesSet::new(err)),
            }
        }
        merge_all_series_sets(sets)
    }

    /// Returns the union of label names across stores.
    pub fn label_names(&mut self) -> Result<Vec<String>> {
        self.collect_strings(|store| store.label_names())
    }

    /// Returns the union of values of the named label across stores.
    pub fn label_values(&mut self, name: &str) -> Result<Vec<String>> {
        self.collect_strings(|store| store.label_values(name))
    }

    fn collect_strings<F>(&mut self, fetch: F) -> Result<Vec<String>>
    where
        F: Fn(&dyn StoreClient) -> Result<Vec<String>>,
    {
        self.warnings.clear();
        let mut all = Vec::new();
        for store in &self.stores {
            match fetch(store.as_ref()) {
                Ok(values) => all.extend(values),
                Err(err) if self.config.partial_response => {
                    warn!(store = store.name(), %err, "store failed, returning partial response");
                    self.warnings.push(err.to_string());
                }
                Err(err) => return Err(err),
            }
        }
        all.sort_unstable();
        Ok(dedup_strings(&all))
    }
}
