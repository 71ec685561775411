//! Reconciliation - rewrite a collection to match a target sequence
//!
//! The pipeline has two stages:
//! 1. Plan: key every target value, reusing the cached key wherever the
//!    current value at that position is already equal, and reject targets
//!    whose keys collide. Nothing is mutated here.
//! 2. Apply: release keys that leave the collection, rewrite changed
//!    positions, drop the surplus tail and append the missing one.
//!
//! A key that moves from one position to another keeps its index entry;
//! only the stored position is updated.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use keyseq_core::{Key, KeyFunction, KeyseqError, KeyseqResult};

use crate::store::{Slot, Store};

/// What a reconciliation did to each position
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Positions whose value already matched the target
    pub kept: usize,
    /// Positions rewritten in place
    pub replaced: usize,
    /// Values appended past the old length
    pub appended: usize,
    /// Values dropped from the old tail
    pub removed: usize,
}

impl ReconcileSummary {
    /// True if the collection already matched the target
    pub fn is_unchanged(&self) -> bool {
        self.replaced == 0 && self.appended == 0 && self.removed == 0
    }
}

/// Validated reconciliation plan
struct Plan<K> {
    /// New key per target position; `None` where the current value is kept
    changes: Vec<Option<K>>,
    /// Every key the target will hold
    keys: HashMap<K, usize>,
}

impl<K: Key, V: PartialEq> Store<K, V> {
    pub(crate) fn reconcile(
        &mut self,
        key_fn: &KeyFunction<K, V>,
        target: Vec<V>,
    ) -> KeyseqResult<ReconcileSummary> {
        let plan = self.plan(key_fn, &target)?;
        Ok(self.apply(plan, target))
    }

    fn plan(&self, key_fn: &KeyFunction<K, V>, target: &[V]) -> KeyseqResult<Plan<K>> {
        let mut keys: HashMap<K, usize> = HashMap::with_capacity(target.len());
        let mut changes = Vec::with_capacity(target.len());

        for (pos, value) in target.iter().enumerate() {
            let (key, change) = match self.slots.get(pos) {
                Some(slot) if slot.value == *value => (slot.key.clone(), None),
                _ => {
                    let key = key_fn.key_of(value);
                    (key.clone(), Some(key))
                }
            };

            match keys.entry(key) {
                Entry::Occupied(entry) => {
                    return Err(KeyseqError::duplicate_key(entry.key(), *entry.get(), pos));
                }
                Entry::Vacant(entry) => {
                    entry.insert(pos);
                }
            }
            changes.push(change);
        }

        Ok(Plan { changes, keys })
    }

    fn apply(&mut self, plan: Plan<K>, target: Vec<V>) -> ReconcileSummary {
        let Plan { changes, keys } = plan;
        let mut summary = ReconcileSummary::default();
        let shared = self.len().min(target.len());

        // Release keys leaving the collection. Keys that reappear elsewhere in
        // the target keep their entry and get a new position below.
        let outgoing = (0..shared)
            .filter(|&pos| changes[pos].is_some())
            .chain(target.len()..self.len());
        for pos in outgoing {
            let key = &self.slots[pos].key;
            if !keys.contains_key(key) {
                self.index.remove(key);
            }
        }

        summary.removed = self.len() - shared;
        self.slots.truncate(shared);

        for (pos, (change, value)) in changes.into_iter().zip(target).enumerate() {
            let Some(key) = change else {
                summary.kept += 1;
                continue;
            };

            self.index.insert(key.clone(), pos);
            let slot = Slot { key, value };
            if pos < shared {
                self.slots[pos] = slot;
                summary.replaced += 1;
            } else {
                self.slots.push(slot);
                summary.appended += 1;
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type Item = (&'static str, u32);

    fn key_fn() -> KeyFunction<&'static str, Item> {
        KeyFunction::new(|v: &Item| v.0)
    }

    fn store_of(values: &[Item]) -> Store<&'static str, Item> {
        let mut store = Store::with_capacity(values.len());
        store.insert_batch(&key_fn(), 0, values.to_vec()).unwrap();
        store
    }

    fn values_of(store: &Store<&'static str, Item>) -> Vec<Item> {
        store.values().copied().collect()
    }

    #[test]
    fn test_reconcile_drops_middle_and_appends() {
        let key_fn = key_fn();
        let mut store = store_of(&[("A", 1), ("B", 2), ("C", 3)]);

        let summary = store
            .reconcile(&key_fn, vec![("A", 1), ("C", 3), ("D", 4)])
            .unwrap();

        assert_eq!(values_of(&store), vec![("A", 1), ("C", 3), ("D", 4)]);
        assert_eq!(store.position_of(&"B"), None);
        assert_eq!(store.position_of(&"C"), Some(1));
        assert_eq!(store.position_of(&"D"), Some(2));
        assert_eq!(
            summary,
            ReconcileSummary {
                kept: 1,
                replaced: 2,
                appended: 0,
                removed: 0
            }
        );
        assert!(store.is_consistent(&key_fn));
    }

    #[test]
    fn test_reconcile_grows_and_indexes_tail() {
        let key_fn = key_fn();
        let mut store = store_of(&[("A", 1)]);

        let summary = store
            .reconcile(&key_fn, vec![("A", 1), ("B", 2), ("C", 3)])
            .unwrap();

        assert_eq!(summary.appended, 2);
        assert_eq!(store.index.len(), 3);
        assert_eq!(store.get_by_key(&"C"), Some(&("C", 3)));
        assert!(store.is_consistent(&key_fn));
    }

    #[test]
    fn test_reconcile_shrinks_and_unindexes_tail() {
        let key_fn = key_fn();
        let mut store = store_of(&[("A", 1), ("B", 2), ("C", 3), ("D", 4)]);

        let summary = store.reconcile(&key_fn, vec![("A", 1)]).unwrap();

        assert_eq!(summary.removed, 3);
        assert_eq!(values_of(&store), vec![("A", 1)]);
        for gone in ["B", "C", "D"] {
            assert_eq!(store.position_of(&gone), None);
        }
        assert!(store.is_consistent(&key_fn));
    }

    #[test]
    fn test_reconcile_swaps_positions() {
        let key_fn = key_fn();
        let mut store = store_of(&[("A", 1), ("B", 2)]);

        store.reconcile(&key_fn, vec![("B", 2), ("A", 1)]).unwrap();

        assert_eq!(store.position_of(&"A"), Some(1));
        assert_eq!(store.position_of(&"B"), Some(0));
        assert!(store.is_consistent(&key_fn));
    }

    #[test]
    fn test_reconcile_same_key_new_value() {
        let key_fn = key_fn();
        let mut store = store_of(&[("A", 1), ("B", 2)]);

        let summary = store.reconcile(&key_fn, vec![("A", 10), ("B", 2)]).unwrap();

        assert_eq!(summary.replaced, 1);
        assert_eq!(store.get_by_key(&"A"), Some(&("A", 10)));
        assert!(store.is_consistent(&key_fn));
    }

    #[test]
    fn test_reconcile_to_empty_and_back() {
        let key_fn = key_fn();
        let mut store = store_of(&[("A", 1), ("B", 2)]);

        store.reconcile(&key_fn, Vec::new()).unwrap();
        assert_eq!(store.len(), 0);
        assert!(store.index.is_empty());

        store.reconcile(&key_fn, vec![("B", 2)]).unwrap();
        assert_eq!(values_of(&store), vec![("B", 2)]);
        assert!(store.is_consistent(&key_fn));
    }

    #[test]
    fn test_reconcile_rejects_target_collision_unchanged() {
        let key_fn = key_fn();
        let mut store = store_of(&[("A", 1), ("B", 2), ("C", 3)]);

        let err = store
            .reconcile(&key_fn, vec![("X", 1), ("Y", 2), ("X", 3), ("Z", 4)])
            .unwrap_err();

        assert_eq!(err, KeyseqError::duplicate_key(&"X", 0, 2));
        assert_eq!(values_of(&store), vec![("A", 1), ("B", 2), ("C", 3)]);
        assert!(store.is_consistent(&key_fn));
    }

    #[test]
    fn test_reconcile_skips_key_function_for_kept_positions() {
        let calls: Arc<std::sync::Mutex<Vec<&'static str>>> = Arc::default();
        let log = Arc::clone(&calls);
        let counting = KeyFunction::new(move |v: &Item| {
            log.lock().unwrap().push(v.0);
            v.0
        });

        let mut store = Store::with_capacity(3);
        store
            .insert_batch(&counting, 0, vec![("A", 1), ("B", 2), ("C", 3)])
            .unwrap();
        calls.lock().unwrap().clear();

        store
            .reconcile(&counting, vec![("A", 1), ("C", 3), ("D", 4)])
            .unwrap();

        let seen = calls.lock().unwrap().clone();
        assert!(!seen.contains(&"A"));
        assert!(!seen.contains(&"B"));
        assert_eq!(seen, vec!["C", "D"]);
    }

    #[test]
    fn test_reconcile_identical_target_is_noop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let counting = KeyFunction::new(move |v: &Item| {
            counter.fetch_add(1, Ordering::Relaxed);
            v.0
        });

        let mut store = Store::with_capacity(2);
        store
            .insert_batch(&counting, 0, vec![("A", 1), ("B", 2)])
            .unwrap();
        calls.store(0, Ordering::Relaxed);

        let summary = store.reconcile(&counting, vec![("A", 1), ("B", 2)]).unwrap();

        assert!(summary.is_unchanged());
        assert_eq!(summary.kept, 2);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    fn arb_items(max: usize) -> impl Strategy<Value = Vec<(u8, u8)>> {
        prop::collection::hash_map(0u8..32, 0u8..4, 0..max)
            .prop_map(|map| map.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    }

    proptest! {
        #[test]
        fn prop_reconcile_matches_target(current in arb_items(12), target in arb_items(12)) {
            let key_fn = KeyFunction::new(|v: &(u8, u8)| v.0);
            let mut store = Store::with_capacity(current.len());
            store.insert_batch(&key_fn, 0, current).unwrap();

            store.reconcile(&key_fn, target.clone()).unwrap();

            let values: Vec<(u8, u8)> = store.values().copied().collect();
            prop_assert_eq!(&values, &target);
            prop_assert!(store.is_consistent(&key_fn));
            for (pos, value) in target.iter().enumerate() {
                prop_assert_eq!(store.position_of(&value.0), Some(pos));
            }
        }

        #[test]
        fn prop_reconcile_keeps_matching_positions(current in arb_items(12), target in arb_items(12)) {
            let touched: Arc<std::sync::Mutex<Vec<(u8, u8)>>> = Arc::default();
            let log = Arc::clone(&touched);
            let key_fn = KeyFunction::new(move |v: &(u8, u8)| {
                log.lock().unwrap().push(*v);
                v.0
            });
            let mut store = Store::with_capacity(current.len());
            store.insert_batch(&key_fn, 0, current.clone()).unwrap();
            touched.lock().unwrap().clear();

            store.reconcile(&key_fn, target.clone()).unwrap();

            let touched = touched.lock().unwrap().clone();
            for (pos, value) in target.iter().enumerate() {
                if current.get(pos) == Some(value) {
                    prop_assert!(!touched.contains(value));
                }
            }
        }
    }
}
