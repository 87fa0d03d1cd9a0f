//! Stable ordering helpers.

use alloc::collections::{BTreeMap, BTreeSet};

/// Build a canonical order index `key -> position`. Duplicate keys are a
/// logic error (debug-asserted); the first occurrence wins in release.
pub fn build_order_index<K: Ord + Clone>(order: &[K]) -> BTreeMap<K, usize> {
    let mut seen = BTreeSet::new();
    let mut idx = BTreeMap::new();
    for (i, key) in order.iter().enumerate() {
        let first = seen.insert(key.clone());
        debug_assert!(first, "duplicate key in canonical order slice");
        idx.entry(key.clone()).or_insert(i);
    }
    idx
}

/// Position in a canonical order, keys absent from the slice sorting last.
#[inline]
pub fn order_rank<K: Ord>(index: &BTreeMap<K, usize>, key: &K) -> usize {
    index.get(key).copied().unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn first_occurrence_wins() {
        let order = vec!["b", "a", "c"];
        let idx = build_order_index(&order);
        assert_eq!(order_rank(&idx, &"b"), 0);
        assert_eq!(order_rank(&idx, &"c"), 2);
        assert_eq!(order_rank(&idx, &"zzz"), usize::MAX);
    }
}
