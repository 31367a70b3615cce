//! Label sets identifying a series.
//!
//! Store shards send labels as a list of [`LabelPair`]s. The domain type
//! [`Labels`] is built from that list by copying it through
//! [`Labels::from_wire`], which also restores the name ordering the merge
//! comparisons depend on.

use std::cmp::Ordering;
use std::fmt;
use tracing::warn;

/// A single name/value pair as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelPair {
    /// Label name.
    pub name: String,
    /// Label value.
    pub value: String,
}

impl LabelPair {
    /// Creates a new pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A label of a domain series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    /// Label name.
    pub name: String,
    /// Label value.
    pub value: String,
}

/// A set of labels sorted by name.
///
/// Ordering between label sets compares pairs left to right, name first and
/// then value; a set that is a prefix of another sorts first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Labels(Vec<Label>);

impl Labels {
    /// Builds a label set from (name, value) pairs, sorting by name.
    pub fn new<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let mut labels: Vec<Label> = pairs
            .into_iter()
            .map(|(name, value)| Label {
                name: name.into(),
                value: value.into(),
            })
            .collect();
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        Self(labels)
    }

    /// Copies wire labels into a domain label set.
    ///
    /// Stores are expected to send labels sorted by name. Unsorted input is
    /// sorted here so that set comparisons stay consistent.
    pub fn from_wire(pairs: &[LabelPair]) -> Self {
        let mut labels: Vec<Label> = pairs
            .iter()
            .map(|pair| Label {
                name: pair.name.clone(),
                value: pair.value.clone(),
            })
            .collect();
        if !labels.windows(2).all(|w| w[0].name <= w[1].name) {
            warn!(labels = labels.len(), "store returned unsorted label set");
            labels.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Self(labels)
    }

    /// Returns the value of the named label.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.value.as_str())
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set has no labels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over labels in name order.
    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.0.iter()
    }

    /// Converts back into wire pairs.
    pub fn to_wire(&self) -> Vec<LabelPair> {
        self.0
            .iter()
            .map(|label| LabelPair::new(label.name.clone(), label.value.clone()))
            .collect()
    }
}

impl Ord for Labels {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.name.cmp(&b.name).then_with(|| a.value.cmp(&b.value)) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl PartialOrd for Labels {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={:?}", label.name, label.value)?;
        }
        write!(f, "}}")
    }
}

impl<'a> IntoIterator for &'a Labels {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
