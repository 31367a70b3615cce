//! Union of sorted string sets, used for label names and values gathered
//! from several stores.

use std::cmp::Ordering;

/// Removes duplicates from a sorted slice.
///
/// The slice is split at its midpoint, each half is deduplicated recursively
/// and the halves are combined with [`merge_strings`].
pub fn dedup_strings(a: &[String]) -> Vec<String> {
    match a.len() {
        0 => Vec::new(),
        1 => a.to_vec(),
        n => {
            let (left, right) = a.split_at(n / 2);
            merge_strings(&dedup_strings(left), &dedup_strings(right))
        }
    }
}

/// Merges two sorted, duplicate-free slices into one sorted, duplicate-free
/// vector.
pub fn merge_strings(a: &[String], b: &[String]) -> Vec<String> {
    let maxl = a.len().max(b.len());
    let mut res = Vec::with_capacity(maxl * 10 / 9);

    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Equal => {
                res.push(a[i].clone());
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                res.push(a[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                res.push(b[j].clone());
                j += 1;
            }
        }
    }

    res.extend_from_slice(&a[i..]);
    res.extend_from_slice(&b[j..]);
    res
}
