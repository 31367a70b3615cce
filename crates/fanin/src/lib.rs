//! Alopex Fan-in - query-time merge of series from store shards
//!
//! This crate takes chunk-encoded series fetched from one or more store
//! shards and exposes them to the query layer as a single label-sorted,
//! deduplicated series set whose samples are clipped to the query window.
//!
//! # Components
//!
//! - [`chunk`]: wire chunk records, XOR chunk codec, [`translate_chunk`]
//! - [`ChunkSeriesIterator`]: samples across a series' chunks with seek
//! - [`StoreSeriesSet`]: sorted set over one store's series
//! - [`merge_all_series_sets`]: balanced merge tree over many sets
//! - [`dedup_strings`] / [`merge_strings`]: sorted string set union
//! - [`Querier`]: fan-in over [`StoreClient`]s with partial responses
//!
//! # Example
//!
//! ```rust
//! use alopex_fanin::{
//!     merge_all_series_sets, ChunkRecord, LabelPair, Series, SeriesIterator, SeriesRecord,
//!     SeriesSet, StoreSeriesSet, TimeWindow,
//! };
//!
//! let window = TimeWindow::new(0, 100);
//! let shard = |value: f64| {
//!     let series = vec![SeriesRecord {
//!         labels: vec![LabelPair::new("__name__", "up")],
//!         chunks: vec![ChunkRecord::xor(&[(10, value), (20, value)])],
//!     }];
//!     Box::new(StoreSeriesSet::new(series, window)) as Box<dyn SeriesSet>
//! };
//!
//! let mut merged = merge_all_series_sets(vec![shard(1.0), shard(2.0)]);
//! while merged.next() {
//!     let series = merged.at().unwrap();
//!     let mut it = series.iterator();
//!     while it.next() {
//!         let (t, v) = it.at();
//!         assert!(window.contains(t));
//!         assert_eq!(v, 1.0);
//!     }
//!     assert!(it.err().is_none());
//! }
//! assert!(merged.err().is_none());
//! ```

#![deny(missing_docs)]

pub mod chunk;
pub mod error;
pub mod labels;
pub mod merge;
pub mod querier;
pub mod series;
pub mod strings;
pub mod window;

/// Sample timestamp.
pub type Timestamp = i64;

pub use chunk::{translate_chunk, ChunkEncoding, ChunkMeta, ChunkRecord, XorChunk};
pub use error::{QueryError, Result};
pub use labels::{Label, LabelPair, Labels};
pub use merge::{merge_all_series_sets, MergedSeries, MergedSeriesIterator, MergedSeriesSet};
pub use querier::{Querier, QuerierConfig, StoreClient};
pub use series::{
    chunk_series_iterator, collect_samples, ChunkSeriesIterator, ErrSeriesIterator, ErrSeriesSet,
    Series, SeriesIterator, SeriesRecord, SeriesSet, StoreSeries, StoreSeriesSet,
};
pub use strings::{dedup_strings, merge_strings};
pub use window::TimeWindow;
