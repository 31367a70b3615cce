//! Merging of series sets from multiple stores.
//!
//! [`merge_all_series_sets`] builds a balanced binary tree of pairwise
//! [`MergedSeriesSet`]s over its inputs. Series with identical label sets are
//! combined into a [`MergedSeries`] whose samples are the time-ordered union
//! of both sides.

use crate::error::QueryError;
use crate::labels::Labels;
use crate::series::{ErrSeriesSet, Series, SeriesIterator, SeriesSet};
use crate::Timestamp;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Combines `items` into one value with a balanced binary tree of `pair`
/// calls. The left half receives `⌈n/2⌉` items.
pub(crate) fn merge_tree<T>(mut items: Vec<T>, pair: &mut impl FnMut(T, T) -> T) -> Option<T> {
    match items.len() {
        0 => None,
        1 => items.pop(),
        n => {
            let right = items.split_off(n.div_ceil(2));
            let left = merge_tree(items, pair)?;
            let right = merge_tree(right, pair)?;
            Some(pair(left, right))
        }
    }
}

/// Merges label-sorted series sets into one label-sorted set.
///
/// No sets yields an exhausted set with no error; a single set is returned
/// unchanged.
pub fn merge_all_series_sets(sets: Vec<Box<dyn SeriesSet>>) -> Box<dyn SeriesSet> {
    let count = sets.len();
    let mut merges = 0usize;
    let merged = merge_tree(sets, &mut |a, b| {
        merges += 1;
        Box::new(MergedSeriesSet::new(a, b)) as Box<dyn SeriesSet>
    });
    debug!(sets = count, merges, "built series set merge tree");
    merged.unwrap_or_else(|| Box::new(ErrSeriesSet::empty()))
}

/// Pairwise merge of two label-sorted series sets.
pub struct MergedSeriesSet {
    a: Box<dyn SeriesSet>,
    b: Box<dyn SeriesSet>,

    started: bool,
    adone: bool,
    bdone: bool,
    cur: Option<Arc<dyn Series>>,
}

impl MergedSeriesSet {
    /// Creates a merge of `a` and `b`. Neither side is advanced until the
    /// first call to `next`.
    pub fn new(a: Box<dyn SeriesSet>, b: Box<dyn SeriesSet>) -> Self {
        Self {
            a,
            b,
            started: false,
            adone: false,
            bdone: false,
            cur: None,
        }
    }
}

impl SeriesSet for MergedSeriesSet {
    fn next(&mut self) -> bool {
        if !self.started {
            self.started = true;
            self.adone = !self.a.next();
            self.bdone = !self.b.next();
        }
        if self.err().is_some() {
            self.cur = None;
            return false;
        }

        let a = if self.adone { None } else { self.a.at() };
        let b = if self.bdone { None } else { self.b.at() };

        let (cur, advance_a, advance_b) = match (a, b) {
            (Some(a), Some(b)) => match a.labels().cmp(b.labels()) {
                Ordering::Less => (a, true, false),
                Ordering::Greater => (b, false, true),
                Ordering::Equal => (Arc::new(MergedSeries::new(a, b)) as Arc<dyn Series>, true, true),
            },
            (Some(a), None) => (a, true, false),
            (None, Some(b)) => (b, false, true),
            (None, None) => {
                self.cur = None;
                return false;
            }
        };

        self.cur = Some(cur);
        if advance_a {
            self.adone = !self.a.next();
        }
        if advance_b {
            self.bdone = !self.b.next();
        }
        true
    }

    fn at(&self) -> Option<Arc<dyn Series>> {
        self.cur.clone()
    }

    fn err(&self) -> Option<&QueryError> {
        self.a.err().or_else(|| self.b.err())
    }
}

/// Two series with the same label set viewed as one.
pub struct MergedSeries {
    a: Arc<dyn Series>,
    b: Arc<dyn Series>,
}

impl MergedSeries {
    /// Combines two series. Both must carry the same labels.
    pub fn new(a: Arc<dyn Series>, b: Arc<dyn Series>) -> Self {
        Self { a, b }
    }
}

impl Series for MergedSeries {
    fn labels(&self) -> &Labels {
        self.a.labels()
    }

    fn iterator(&self) -> Box<dyn SeriesIterator> {
        Box::new(MergedSeriesIterator::new(self.a.iterator(), self.b.iterator()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    A,
    B,
    Both,
}

/// Time-ordered merge of two sample iterators.
///
/// Samples sharing a timestamp are emitted once, taking the value from the
/// first iterator. A decode error on either side ends the merge.
pub struct MergedSeriesIterator {
    a: Box<dyn SeriesIterator>,
    b: Box<dyn SeriesIterator>,

    started: bool,
    a_ok: bool,
    b_ok: bool,
    cur: Option<Side>,
}

impl MergedSeriesIterator {
    /// Creates a merge of `a` and `b`.
    pub fn new(a: Box<dyn SeriesIterator>, b: Box<dyn SeriesIterator>) -> Self {
        Self {
            a,
            b,
            started: false,
            a_ok: false,
            b_ok: false,
            cur: None,
        }
    }

    fn failed(&self) -> bool {
        (!self.a_ok && self.a.err().is_some()) || (!self.b_ok && self.b.err().is_some())
    }

    fn pick(&mut self) -> bool {
        self.cur = if self.failed() {
            None
        } else {
            match (self.a_ok, self.b_ok) {
                (true, true) => {
                    let (ta, _) = self.a.at();
                    let (tb, _) = self.b.at();
                    Some(match ta.cmp(&tb) {
                        Ordering::Less => Side::A,
                        Ordering::Greater => Side::B,
                        Ordering::Equal => Side::Both,
                    })
                }
                (true, false) => Some(Side::A),
                (false, true) => Some(Side::B),
                (false, false) => None,
            }
        };
        self.cur.is_some()
    }
}

impl SeriesIterator for MergedSeriesIterator {
    fn seek(&mut self, t: Timestamp) -> bool {
        self.started = true;
        self.a_ok = self.a.seek(t);
        self.b_ok = self.b.seek(t);
        self.pick()
    }

    fn next(&mut self) -> bool {
        if !self.started {
            self.started = true;
            self.a_ok = self.a.next();
            self.b_ok = self.b.next();
            return self.pick();
        }
        match self.cur {
            Some(Side::A) => self.a_ok = self.a.next(),
            Some(Side::B) => self.b_ok = self.b.next(),
            Some(Side::Both) => {
                self.a_ok = self.a.next();
                self.b_ok = self.b.next();
            }
            None => return false,
        }
        self.pick()
    }

    fn at(&self) -> (Timestamp, f64) {
        match self.cur {
            Some(Side::B) => self.b.at(),
            _ => self.a.at(),
        }
    }

    fn err(&self) -> Option<&QueryError> {
        self.a.err().or_else(|| self.b.err())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkRecord;
    use crate::labels::LabelPair;
    use crate::series::{collect_samples, ErrSeriesIterator, SeriesRecord, StoreSeriesSet};
    use crate::window::TimeWindow;

    fn depth(n: usize) -> usize {
        merge_tree(vec![0usize; n], &mut |a, b| a.max(b) + 1).unwrap_or(0)
    }

    fn leaves_in_order(n: usize) -> Vec<usize> {
        merge_tree(
            (0..n).map(|i| vec![i]).collect(),
            &mut |mut a: Vec<usize>, b| {
                a.extend(b);
                a
            },
        )
        .unwrap_or_default()
    }

    fn store_set(series: &[(&str, &[(Timestamp, f64)])]) -> Box<dyn SeriesSet> {
        let records = series
            .iter()
            .map(|(name, samples)| SeriesRecord {
                labels: vec![LabelPair::new("__name__", *name)],
                chunks: vec![ChunkRecord::xor(samples)],
            })
            .collect();
        Box::new(StoreSeriesSet::new(records, TimeWindow::all()))
    }

    fn drain(set: &mut dyn SeriesSet) -> Vec<(String, Vec<(Timestamp, f64)>)> {
        let mut out = Vec::new();
        while set.next() {
            let series = set.at().unwrap();
            let mut it = series.iterator();
            out.push((
                series.labels().get("__name__").unwrap().to_string(),
                collect_samples(&mut it).unwrap(),
            ));
        }
        out
    }

    #[test]
    fn test_merge_tree_depth_is_logarithmic() {
        assert_eq!(depth(0), 0);
        assert_eq!(depth(1), 0);
        assert_eq!(depth(2), 1);
        assert_eq!(depth(3), 2);
        assert_eq!(depth(4), 2);
        assert_eq!(depth(5), 3);
        assert_eq!(depth(1024), 10);
        assert_eq!(depth(1025), 11);
        for n in 1..=300usize {
            let expected = (n as f64).log2().ceil() as usize;
            assert_eq!(depth(n), expected, "n = {n}");
        }
    }

    #[test]
    fn test_merge_tree_preserves_input_order() {
        for n in 0..20 {
            assert_eq!(leaves_in_order(n), (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_merge_zero_sets() {
        let mut merged = merge_all_series_sets(Vec::new());
        assert!(!merged.next());
        assert!(merged.at().is_none());
        assert!(merged.err().is_none());
    }

    #[test]
    fn test_merge_single_set_passthrough() {
        let mut merged = merge_all_series_sets(vec![store_set(&[("a", &[(1, 1.0)])])]);
        let out = drain(&mut merged);
        assert_eq!(out, vec![("a".to_string(), vec![(1, 1.0)])]);
    }

    #[test]
    fn test_merge_interleaves_by_labels() {
        let mut merged = merge_all_series_sets(vec![
            store_set(&[("a", &[(1, 1.0)]), ("c", &[(3, 3.0)])]),
            store_set(&[("b", &[(2, 2.0)]), ("d", &[(4, 4.0)])]),
        ]);
        let names: Vec<_> = drain(&mut merged).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert!(merged.err().is_none());
    }

    #[test]
    fn test_merge_identical_labels_combines_samples() {
        let mut merged = merge_all_series_sets(vec![
            store_set(&[("a", &[(1, 1.0), (3, 3.0), (5, 5.0)])]),
            store_set(&[("a", &[(2, 2.0), (3, 30.0), (6, 6.0)])]),
            store_set(&[("a", &[(4, 4.0)])]),
        ]);
        let out = drain(&mut merged);
        assert_eq!(
            out,
            vec![(
                "a".to_string(),
                vec![(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0), (5, 5.0), (6, 6.0)]
            )]
        );
    }

    #[test]
    fn test_merge_propagates_error() {
        let err = QueryError::Store {
            store: "broken".to_string(),
            message: "timeout".to_string(),
        };
        let mut merged = merge_all_series_sets(vec![
            store_set(&[("a", &[(1, 1.0)])]),
            Box::new(ErrSeriesSet::new(err.clone())),
            store_set(&[("b", &[(1, 1.0)])]),
        ]);
        assert!(!merged.next());
        assert_eq!(merged.err(), Some(&err));
        assert_eq!(merged.err(), Some(&err));
    }

    #[test]
    fn test_merged_iterator_seek() {
        let a = crate::series::chunk_series_iterator(
            &[ChunkRecord::xor(&[(10, 1.0), (30, 3.0), (50, 5.0)])],
            TimeWindow::all(),
        );
        let b = crate::series::chunk_series_iterator(
            &[ChunkRecord::xor(&[(20, 2.0), (40, 4.0)])],
            TimeWindow::all(),
        );
        let mut it = MergedSeriesIterator::new(a, b);
        assert!(it.seek(25));
        assert_eq!(it.at(), (30, 3.0));
        assert!(it.next());
        assert_eq!(it.at(), (40, 4.0));
        assert!(it.next());
        assert_eq!(it.at(), (50, 5.0));
        assert!(!it.next());
        assert!(it.err().is_none());
    }

    #[test]
    fn test_merged_iterator_stops_on_error() {
        let a = crate::series::chunk_series_iterator(
            &[ChunkRecord::xor(&[(1, 1.0), (2, 2.0)])],
            TimeWindow::all(),
        );
        let b: Box<dyn SeriesIterator> =
            Box::new(ErrSeriesIterator::new(QueryError::UnsupportedEncoding(3)));
        let mut it = MergedSeriesIterator::new(a, b);
        assert!(!it.next());
        assert_eq!(it.err(), Some(&QueryError::UnsupportedEncoding(3)));
    }

    #[test]
    fn test_merged_iterator_one_side_empty() {
        let a: Box<dyn SeriesIterator> = Box::new(ErrSeriesIterator::empty());
        let b = crate::series::chunk_series_iterator(
            &[ChunkRecord::xor(&[(7, 7.0)])],
            TimeWindow::all(),
        );
        let mut it = MergedSeriesIterator::new(a, b);
        assert_eq!(collect_samples(&mut it).unwrap(), vec![(7, 7.0)]);
    }
}
