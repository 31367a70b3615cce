//! Series and series sets built from store responses.
//!
//! # Consumer protocol
//!
//! ```text
//! while set.next() {
//!     let series = set.at();        // current series
//!     let mut it = series.iterator();
//!     while it.next() { it.at() }    // samples in [mint, maxt]
//!     it.err()                       // None on clean exhaustion
//! }
//! set.err()
//! ```

pub mod iterator;

pub use iterator::{
    chunk_series_iterator, collect_samples, ChunkSeriesIterator, ErrSeriesIterator,
    SeriesIterator,
};

use crate::chunk::ChunkRecord;
use crate::error::QueryError;
use crate::labels::{LabelPair, Labels};
use crate::window::TimeWindow;
use std::sync::Arc;

/// A series as returned by a store shard.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesRecord {
    /// Labels, sorted by name.
    pub labels: Vec<LabelPair>,
    /// Chunks, sorted by time and non-overlapping.
    pub chunks: Vec<ChunkRecord>,
}

/// A labelled series that can produce sample iterators.
pub trait Series {
    /// Returns the label set identifying the series.
    fn labels(&self) -> &Labels;

    /// Returns a fresh iterator over the series' samples.
    fn iterator(&self) -> Box<dyn SeriesIterator>;
}

/// A pull-based sequence of series ordered by label set.
pub trait SeriesSet {
    /// Advances to the next series.
    fn next(&mut self) -> bool;

    /// Returns the current series, or `None` before the first successful
    /// `next` and after exhaustion.
    fn at(&self) -> Option<Arc<dyn Series>>;

    /// Returns the error that stopped the set, if any.
    fn err(&self) -> Option<&QueryError>;
}

impl<S: SeriesSet + ?Sized> SeriesSet for Box<S> {
    fn next(&mut self) -> bool {
        (**self).next()
    }

    fn at(&self) -> Option<Arc<dyn Series>> {
        (**self).at()
    }

    fn err(&self) -> Option<&QueryError> {
        (**self).err()
    }
}

/// A series set that yields nothing, optionally reporting an error.
#[derive(Debug, Clone, Default)]
pub struct ErrSeriesSet {
    err: Option<QueryError>,
}

impl ErrSeriesSet {
    /// Creates a failed set.
    pub fn new(err: QueryError) -> Self {
        Self { err: Some(err) }
    }

    /// Creates a set that is exhausted without error.
    pub fn empty() -> Self {
        Self { err: None }
    }
}

impl SeriesSet for ErrSeriesSet {
    fn next(&mut self) -> bool {
        false
    }

    fn at(&self) -> Option<Arc<dyn Series>> {
        None
    }

    fn err(&self) -> Option<&QueryError> {
        self.err.as_ref()
    }
}

/// A series retrieved from a store, viewed through a query window.
///
/// Holds the record by reference count; chunk data is not copied until an
/// iterator decodes it.
#[derive(Debug)]
pub struct StoreSeries {
    record: Arc<SeriesRecord>,
    labels: Labels,
    window: TimeWindow,
}

impl StoreSeries {
    /// Wraps a record and window.
    pub fn new(record: Arc<SeriesRecord>, window: TimeWindow) -> Self {
        let labels = Labels::from_wire(&record.labels);
        Self {
            record,
            labels,
            window,
        }
    }

    /// Number of wire chunks backing the series.
    pub fn num_chunks(&self) -> usize {
        self.record.chunks.len()
    }
}

impl Series for StoreSeries {
    fn labels(&self) -> &Labels {
        &self.labels
    }

    fn iterator(&self) -> Box<dyn SeriesIterator> {
        chunk_series_iterator(&self.record.chunks, self.window)
    }
}

/// Series set over an already label-sorted list of store series.
///
/// Records without chunks are skipped.
#[derive(Debug)]
pub struct StoreSeriesSet {
    series: Vec<Arc<SeriesRecord>>,
    window: TimeWindow,

    pos: usize,
    cur: Option<Arc<StoreSeries>>,
}

impl StoreSeriesSet {
    /// Creates a set over `series` clipped to `window`.
    pub fn new(series: Vec<SeriesRecord>, window: TimeWindow) -> Self {
        Self {
            series: series.into_iter().map(Arc::new).collect(),
            window,
            pos: 0,
            cur: None,
        }
    }
}

impl SeriesSet for StoreSeriesSet {
    fn next(&mut self) -> bool {
        while let Some(record) = self.series.get(self.pos) {
            self.pos += 1;
            if record.chunks.is_empty() {
                continue;
            }
            self.cur = Some(Arc::new(StoreSeries::new(Arc::clone(record), self.window)));
            return true;
        }
        self.cur = None;
        false
    }

    fn at(&self) -> Option<Arc<dyn Series>> {
        self.cur.clone().map(|series| series as Arc<dyn Series>)
    }

    fn err(&self) -> Option<&QueryError> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, chunks: Vec<ChunkRecord>) -> SeriesRecord {
        SeriesRecord {
            labels: vec![LabelPair::new("__name__", name)],
            chunks,
        }
    }

    fn names(set: &mut dyn SeriesSet) -> Vec<String> {
        let mut out = Vec::new();
        while set.next() {
            let series = set.at().unwrap();
            out.push(series.labels().get("__name__").unwrap().to_string());
        }
        out
    }

    #[test]
    fn test_store_series_set_skips_empty_series() {
        let series = vec![
            record("a", Vec::new()),
            record("b", vec![ChunkRecord::xor(&[(1, 1.0)])]),
            record("c", Vec::new()),
            record("d", Vec::new()),
            record("e", vec![ChunkRecord::xor(&[(2, 2.0)])]),
            record("f", Vec::new()),
        ];
        let mut set = StoreSeriesSet::new(series, TimeWindow::all());
        assert_eq!(names(&mut set), vec!["b", "e"]);
        assert!(set.err().is_none());
        assert!(set.at().is_none());
    }

    #[test]
    fn test_store_series_set_empty_input() {
        let mut set = StoreSeriesSet::new(Vec::new(), TimeWindow::all());
        assert!(!set.next());
        assert!(set.at().is_none());
        assert!(set.err().is_none());
    }

    #[test]
    fn test_store_series_iterator_uses_window() {
        let series = vec![record(
            "up",
            vec![
                ChunkRecord::xor(&[(10, 1.0), (20, 2.0)]),
                ChunkRecord::xor(&[(30, 3.0), (40, 4.0)]),
            ],
        )];
        let mut set = StoreSeriesSet::new(series, TimeWindow::new(15, 35));
        assert!(set.next());
        let series = set.at().unwrap();
        let mut it = series.iterator();
        assert_eq!(
            collect_samples(&mut it).unwrap(),
            vec![(20, 2.0), (30, 3.0)]
        );
        // Iterators are independent of each other.
        let mut again = series.iterator();
        assert!(again.next());
        assert_eq!(again.at(), (20, 2.0));
    }

    #[test]
    fn test_store_series_decode_error_surfaces_on_iterator() {
        let mut bad = ChunkRecord::xor(&[(10, 1.0)]);
        bad.encoding = 99;
        let mut set = StoreSeriesSet::new(vec![record("up", vec![bad])], TimeWindow::all());

        assert!(set.next());
        assert!(set.err().is_none());
        let mut it = set.at().unwrap().iterator();
        assert!(!it.next());
        assert_eq!(it.err(), Some(&QueryError::UnsupportedEncoding(99)));
    }

    #[test]
    fn test_store_series_labels_copied_from_wire() {
        let record = Arc::new(SeriesRecord {
            labels: vec![LabelPair::new("job", "api"), LabelPair::new("env", "prod")],
            chunks: vec![ChunkRecord::xor(&[(1, 1.0)])],
        });
        let series = StoreSeries::new(record, TimeWindow::all());
        assert_eq!(series.labels(), &Labels::new([("env", "prod"), ("job", "api")]));
        assert_eq!(series.num_chunks(), 1);
    }

    #[test]
    fn test_err_series_set() {
        let mut empty = ErrSeriesSet::empty();
        assert!(!empty.next());
        assert!(empty.at().is_none());
        assert!(empty.err().is_none());

        let err = QueryError::Store {
            store: "s1".to_string(),
            message: "unavailable".to_string(),
        };
        let mut failed = ErrSeriesSet::new(err.clone());
        assert!(!failed.next());
        assert_eq!(failed.err(), Some(&err));
        assert_eq!(failed.err(), Some(&err));
    }
}
