//! Sample iterators over the chunks of one series.

use crate::chunk::{translate_chunk, ChunkMeta, ChunkRecord, XorIterator};
use crate::error::{QueryError, Result};
use crate::window::TimeWindow;
use crate::Timestamp;
use tracing::{debug, warn};

/// Pull-based iterator over the samples of a series.
///
/// Call [`next`](Self::next) or [`seek`](Self::seek); when either returns
/// true, [`at`](Self::at) yields the current sample. When they return false,
/// [`err`](Self::err) tells clean exhaustion (`None`) from failure.
pub trait SeriesIterator {
    /// Moves to the first sample with timestamp `>= t`.
    fn seek(&mut self, t: Timestamp) -> bool;

    /// Advances to the next sample.
    fn next(&mut self) -> bool;

    /// Returns the current sample. Unspecified before a successful
    /// `next`/`seek`.
    fn at(&self) -> (Timestamp, f64);

    /// Returns the error that stopped iteration, if any.
    fn err(&self) -> Option<&QueryError>;
}

impl<I: SeriesIterator + ?Sized> SeriesIterator for Box<I> {
    fn seek(&mut self, t: Timestamp) -> bool {
        (**self).seek(t)
    }

    fn next(&mut self) -> bool {
        (**self).next()
    }

    fn at(&self) -> (Timestamp, f64) {
        (**self).at()
    }

    fn err(&self) -> Option<&QueryError> {
        (**self).err()
    }
}

/// Drains an iterator into a vector, surfacing its error if it stopped early.
pub fn collect_samples<I: SeriesIterator + ?Sized>(it: &mut I) -> Result<Vec<(Timestamp, f64)>> {
    let mut samples = Vec::new();
    while it.next() {
        samples.push(it.at());
    }
    match it.err() {
        Some(err) => Err(err.clone()),
        None => Ok(samples),
    }
}

/// An iterator that yields nothing and reports a fixed error.
///
/// Stands in for a series whose chunks could not be translated, so callers
/// that skip `err()` still see an empty series instead of a crash.
#[derive(Debug, Clone, Default)]
pub struct ErrSeriesIterator {
    err: Option<QueryError>,
}

impl ErrSeriesIterator {
    /// Creates a failed iterator.
    pub fn new(err: QueryError) -> Self {
        Self { err: Some(err) }
    }

    /// Creates an iterator that is exhausted without error.
    pub fn empty() -> Self {
        Self { err: None }
    }
}

impl SeriesIterator for ErrSeriesIterator {
    fn seek(&mut self, _t: Timestamp) -> bool {
        false
    }

    fn next(&mut self) -> bool {
        false
    }

    fn at(&self) -> (Timestamp, f64) {
        (0, 0.0)
    }

    fn err(&self) -> Option<&QueryError> {
        self.err.as_ref()
    }
}

/// Iterates samples across time-sorted, non-overlapping chunks, clipped to a
/// query window.
///
/// Chunk order and non-overlap are trusted, not verified.
#[derive(Debug)]
pub struct ChunkSeriesIterator {
    chunks: Vec<ChunkMeta>,
    window: TimeWindow,

    i: usize,
    cur: XorIterator,
}

impl ChunkSeriesIterator {
    /// Creates an iterator over decoded chunks. Returns `None` for an empty
    /// chunk list.
    pub fn new(chunks: Vec<ChunkMeta>, window: TimeWindow) -> Option<Self> {
        let cur = chunks.first()?.chunk.iter();
        Some(Self {
            chunks,
            window,
            i: 0,
            cur,
        })
    }

    /// Index of the chunk currently being read.
    pub fn chunk_index(&self) -> usize {
        self.i
    }
}

impl SeriesIterator for ChunkSeriesIterator {
    fn seek(&mut self, t: Timestamp) -> bool {
        if t > self.window.maxt {
            return false;
        }
        let t = t.max(self.window.mint);

        while self.chunks[self.i].max_time < t {
            if self.i == self.chunks.len() - 1 {
                return false;
            }
            self.i += 1;
        }

        self.cur = self.chunks[self.i].chunk.iter();
        while self.cur.next() {
            let (t0, _) = self.cur.at();
            if t0 >= t {
                return true;
            }
        }
        if self.cur.err().is_none() {
            debug!(
                seek_to = t,
                chunk = self.i,
                max_time = self.chunks[self.i].max_time,
                "seek exhausted landing chunk"
            );
        }
        false
    }

    fn next(&mut self) -> bool {
        loop {
            if self.cur.next() {
                let (t, _) = self.cur.at();
                if t < self.window.mint {
                    if !self.seek(self.window.mint) {
                        return false;
                    }
                    let (t, _) = self.at();
                    return t <= self.window.maxt;
                }
                return t <= self.window.maxt;
            }
            if self.cur.err().is_some() || self.i == self.chunks.len() - 1 {
                return false;
            }
            self.i += 1;
            self.cur = self.chunks[self.i].chunk.iter();
        }
    }

    fn at(&self) -> (Timestamp, f64) {
        self.cur.at()
    }

    fn err(&self) -> Option<&QueryError> {
        self.cur.err()
    }
}

/// Builds the sample iterator for a series' wire chunks.
///
/// If any chunk fails to translate, the result is an [`ErrSeriesIterator`]
/// carrying that error. An empty chunk list yields an exhausted iterator.
pub fn chunk_series_iterator(records: &[ChunkRecord], window: TimeWindow) -> Box<dyn SeriesIterator> {
    let chunks = match records.iter().map(translate_chunk).collect::<Result<Vec<_>>>() {
        Ok(chunks) => chunks,
        Err(err) => {
            warn!(%err, chunks = records.len(), "failed to translate series chunks");
            return Box::new(ErrSeriesIterator::new(err));
        }
    };
    match ChunkSeriesIterator::new(chunks, window) {
        Some(it) => Box::new(it),
        None => Box::new(ErrSeriesIterator::empty()),
    }
}
