//! Indexed collection - an ordered sequence with a unique-key index
//!
//! Every operation takes `&self` and runs under the collection's guard for
//! its whole duration, so a synchronized collection can be shared behind an
//! `Arc`. Mutations validate before they move anything: a rejected call
//! leaves both the sequence and the index exactly as they were.

use std::cmp::Ordering;
use std::fmt;

use keyseq_core::{CollectionConfig, Key, KeyFunction, KeyseqResult, SyncMode};
use tracing::{debug, trace};

use crate::builder::CollectionBuilder;
use crate::guard::Guard;
use crate::reconcile::ReconcileSummary;
use crate::store::{require_values, Store, Values};

/// Ordered sequence of values, each reachable by position and by key
pub struct IndexedCollection<K, V> {
    key_fn: KeyFunction<K, V>,
    store: Guard<Store<K, V>>,
}

fn logged<T>(op: &'static str, result: KeyseqResult<T>) -> KeyseqResult<T> {
    if let Err(err) = &result {
        debug!(op, error = %err, "collection mutation rejected");
    }
    result
}

impl<K: Key, V> IndexedCollection<K, V> {
    /// Create an empty, unsynchronized collection
    pub fn new<F>(key: F) -> Self
    where
        F: Fn(&V) -> K + Send + Sync + 'static,
    {
        Self::with_config(KeyFunction::new(key), CollectionConfig::default())
    }

    pub fn with_capacity<F>(key: F, capacity: usize) -> Self
    where
        F: Fn(&V) -> K + Send + Sync + 'static,
    {
        Self::with_config(
            KeyFunction::new(key),
            CollectionConfig::new().with_capacity(capacity),
        )
    }

    pub fn with_config(key_fn: KeyFunction<K, V>, config: CollectionConfig) -> Self {
        trace!(capacity = config.capacity, sync = ?config.sync, "creating indexed collection");
        IndexedCollection {
            key_fn,
            store: Guard::new(config.sync, Store::with_capacity(config.capacity)),
        }
    }

    /// Create a collection holding `values`, rejecting the whole seed if two
    /// values share a key.
    pub fn from_seed<I>(key_fn: KeyFunction<K, V>, config: CollectionConfig, values: I) -> KeyseqResult<Self>
    where
        I: IntoIterator<Item = V>,
    {
        let values: Vec<V> = values.into_iter().collect();
        let capacity = config.capacity.max(values.len());
        let config = config.with_capacity(capacity);
        let collection = Self::with_config(key_fn, config);
        collection.add_range(values)?;
        Ok(collection)
    }

    /// Like [`from_seed`](Self::from_seed), rejecting absent values
    pub fn from_seed_nullable<I>(
        key_fn: KeyFunction<K, V>,
        config: CollectionConfig,
        values: I,
    ) -> KeyseqResult<Self>
    where
        I: IntoIterator<Item = Option<V>>,
    {
        let values = logged("from_seed", require_values(values))?;
        Self::from_seed(key_fn, config, values)
    }

    pub fn builder() -> CollectionBuilder<K, V> {
        CollectionBuilder::new()
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.store.lock().capacity()
    }

    pub fn reserve(&self, additional: usize) {
        self.store.lock().reserve(additional);
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.store.mode()
    }

    pub fn is_synchronized(&self) -> bool {
        self.store.mode().is_synchronized()
    }

    pub fn key_function(&self) -> &KeyFunction<K, V> {
        &self.key_fn
    }

    /// Re-derive the key index from the stored values and compare it with
    /// the maintained one. Calls the key function once per value.
    pub fn is_consistent(&self) -> bool {
        self.store.lock().is_consistent(&self.key_fn)
    }

    // ---------------------------------------------------------------------
    // Key-based access
    // ---------------------------------------------------------------------

    pub fn contains_key(&self, key: &K) -> bool {
        self.store.lock().position_of(key).is_some()
    }

    /// Check for a value with the same key as `value`.
    ///
    /// Membership is by key: a different value sharing the key counts.
    pub fn contains(&self, value: &V) -> bool {
        let store = self.store.lock();
        store.position_of(&self.key_fn.key_of(value)).is_some()
    }

    pub fn position_of_key(&self, key: &K) -> Option<usize> {
        self.store.lock().position_of(key)
    }

    /// Keys in sequence order
    pub fn keys(&self) -> Vec<K> {
        self.store.lock().keys().cloned().collect()
    }

    /// Remove the value held under `key`
    pub fn remove_key(&self, key: &K) -> Option<V> {
        self.store.lock().remove_key(key)
    }

    // ---------------------------------------------------------------------
    // Insertion
    // ---------------------------------------------------------------------

    /// Append a value
    pub fn add(&self, value: V) -> KeyseqResult<()> {
        self.add_range(std::iter::once(value))
    }

    /// Append values; the whole batch is rejected on any key collision
    pub fn add_range<I>(&self, values: I) -> KeyseqResult<()>
    where
        I: IntoIterator<Item = V>,
    {
        let values: Vec<V> = values.into_iter().collect();
        let mut store = self.store.lock();
        let at = store.len();
        logged("add_range", store.insert_batch(&self.key_fn, at, values))
    }

    pub fn add_range_nullable<I>(&self, values: I) -> KeyseqResult<()>
    where
        I: IntoIterator<Item = Option<V>>,
    {
        let values = logged("add_range", require_values(values))?;
        self.add_range(values)
    }

    pub fn insert(&self, index: usize, value: V) -> KeyseqResult<()> {
        self.insert_range(index, std::iter::once(value))
    }

    /// Insert values starting at `index`, shifting later values back
    pub fn insert_range<I>(&self, index: usize, values: I) -> KeyseqResult<()>
    where
        I: IntoIterator<Item = V>,
    {
        let values: Vec<V> = values.into_iter().collect();
        let mut store = self.store.lock();
        logged("insert_range", store.insert_batch(&self.key_fn, index, values))
    }

    pub fn insert_range_nullable<I>(&self, index: usize, values: I) -> KeyseqResult<()>
    where
        I: IntoIterator<Item = Option<V>>,
    {
        let values = logged("insert_range", require_values(values))?;
        self.insert_range(index, values)
    }

    // ---------------------------------------------------------------------
    // Removal
    // ---------------------------------------------------------------------

    pub fn remove_at(&self, index: usize) -> KeyseqResult<V> {
        logged("remove_at", self.store.lock().remove_at(index))
    }

    /// Remove `count` values starting at `index`.
    ///
    /// A window reaching past the end is rejected, never truncated.
    pub fn remove_range(&self, index: usize, count: usize) -> KeyseqResult<Vec<V>> {
        let mut store = self.store.lock();
        let range = logged("remove_range", store.check_range(index, count))?;
        let removed = store.drain(range);
        trace!(index, count, "removed range");
        Ok(removed)
    }

    /// Remove every value matching `predicate`; returns how many were removed
    pub fn remove_all<P>(&self, predicate: P) -> usize
    where
        P: FnMut(&V) -> bool,
    {
        let removed = self.store.lock().remove_where(predicate);
        trace!(removed, "removed matching values");
        removed
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }

    // ---------------------------------------------------------------------
    // Ordering
    // ---------------------------------------------------------------------

    pub fn reverse(&self) {
        let mut store = self.store.lock();
        let range = 0..store.len();
        store.reorder(range, |_, order| order.reverse());
    }

    pub fn reverse_range(&self, index: usize, count: usize) -> KeyseqResult<()> {
        let mut store = self.store.lock();
        let range = store.check_range(index, count)?;
        store.reorder(range, |_, order| order.reverse());
        Ok(())
    }

    /// Stable sort by a comparator over values
    pub fn sort_by<F>(&self, mut compare: F)
    where
        F: FnMut(&V, &V) -> Ordering,
    {
        let mut store = self.store.lock();
        let range = 0..store.len();
        store.reorder(range, |slots, order| {
            order.sort_by(|&a, &b| compare(&slots[a].value, &slots[b].value))
        });
    }

    pub fn sort_by_key<T, F>(&self, mut f: F)
    where
        T: Ord,
        F: FnMut(&V) -> T,
    {
        self.sort_by(|a, b| f(a).cmp(&f(b)));
    }

    /// Stable sort of the window `[index, index + count)`
    pub fn sort_range_by<F>(&self, index: usize, count: usize, mut compare: F) -> KeyseqResult<()>
    where
        F: FnMut(&V, &V) -> Ordering,
    {
        let mut store = self.store.lock();
        let range = store.check_range(index, count)?;
        store.reorder(range, |slots, order| {
            order.sort_by(|&a, &b| compare(&slots[a].value, &slots[b].value))
        });
        Ok(())
    }

    /// Binary search assuming the caller keeps the sequence sorted by `f`
    pub fn binary_search_by<F>(&self, f: F) -> Result<usize, usize>
    where
        F: FnMut(&V) -> Ordering,
    {
        let store = self.store.lock();
        store.binary_search_by(0..store.len(), f)
    }

    /// Binary search within `[index, index + count)`; positions are absolute
    pub fn binary_search_in<F>(&self, index: usize, count: usize, f: F) -> KeyseqResult<Result<usize, usize>>
    where
        F: FnMut(&V) -> Ordering,
    {
        let store = self.store.lock();
        let range = store.check_range(index, count)?;
        Ok(store.binary_search_by(range, f))
    }

    // ---------------------------------------------------------------------
    // Bulk access
    // ---------------------------------------------------------------------

    /// Run `f` over the stored values while holding the guard
    pub fn with_values<R, F>(&self, f: F) -> R
    where
        F: FnOnce(Values<'_, K, V>) -> R,
    {
        let store = self.store.lock();
        f(store.values())
    }

    pub fn into_vec(self) -> Vec<V> {
        self.store.into_inner().into_values()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&Store<K, V>) -> R) -> R {
        let store = self.store.lock();
        f(&store)
    }
}

impl<K: Key, V: Clone> IndexedCollection<K, V> {
    pub fn get(&self, index: usize) -> KeyseqResult<V> {
        self.store.lock().value(index).cloned()
    }

    pub fn try_get(&self, key: &K) -> Option<V> {
        self.store.lock().get_by_key(key).cloned()
    }

    pub fn get_range(&self, index: usize, count: usize) -> KeyseqResult<Vec<V>> {
        let store = self.store.lock();
        let range = store.check_range(index, count)?;
        Ok(store.values().skip(range.start).take(range.len()).cloned().collect())
    }

    /// Snapshot of the sequence
    pub fn to_vec(&self) -> Vec<V> {
        self.store.lock().values().cloned().collect()
    }
}

impl<K: Key, V: PartialEq> IndexedCollection<K, V> {
    /// Replace the value at `index`, returning the value it held.
    ///
    /// Storing an equal value is a no-op.
    pub fn set(&self, index: usize, value: V) -> KeyseqResult<V> {
        logged("set", self.store.lock().replace(&self.key_fn, index, value))
    }

    /// Rewrite the contents to match `target` in values and order.
    ///
    /// Positions whose value already matches are left alone. The target is
    /// validated first: a key collision inside it fails the whole call and
    /// leaves the collection unchanged.
    pub fn set_all<I>(&self, target: I) -> KeyseqResult<ReconcileSummary>
    where
        I: IntoIterator<Item = V>,
    {
        let target: Vec<V> = target.into_iter().collect();
        let mut store = self.store.lock();
        let summary = logged("set_all", store.reconcile(&self.key_fn, target))?;
        debug!(
            kept = summary.kept,
            replaced = summary.replaced,
            appended = summary.appended,
            removed = summary.removed,
            "reconciled collection"
        );
        Ok(summary)
    }

    pub fn set_all_nullable<I>(&self, target: I) -> KeyseqResult<ReconcileSummary>
    where
        I: IntoIterator<Item = Option<V>>,
    {
        let target = logged("set_all", require_values(target))?;
        self.set_all(target)
    }

    pub fn index_of(&self, value: &V) -> Option<usize> {
        self.store.lock().values().position(|v| v == value)
    }

    pub fn last_index_of(&self, value: &V) -> Option<usize> {
        self.store.lock().values().rposition(|v| v == value)
    }

    /// First position of `value` within `[index, index + count)`
    pub fn index_of_in(&self, value: &V, index: usize, count: usize) -> KeyseqResult<Option<usize>> {
        let store = self.store.lock();
        let range = store.check_range(index, count)?;
        Ok(range.into_iter().find(|&pos| store.slots[pos].value == *value))
    }

    /// Last position of `value` within `[index, index + count)`
    pub fn last_index_of_in(&self, value: &V, index: usize, count: usize) -> KeyseqResult<Option<usize>> {
        let store = self.store.lock();
        let range = store.check_range(index, count)?;
        Ok(range.rev().find(|&pos| store.slots[pos].value == *value))
    }
}

impl<K: Key, V: Ord> IndexedCollection<K, V> {
    pub fn sort(&self) {
        self.sort_by(|a, b| a.cmp(b));
    }

    pub fn binary_search(&self, value: &V) -> Result<usize, usize> {
        self.binary_search_by(|probe| probe.cmp(value))
    }
}

impl<K: Key, V: Clone> Clone for IndexedCollection<K, V> {
    fn clone(&self) -> Self {
        IndexedCollection {
            key_fn: self.key_fn.clone(),
            store: Guard::new(self.store.mode(), self.store.lock().clone()),
        }
    }
}

impl<K: Key, V: fmt::Debug> fmt::Debug for IndexedCollection<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store.lock();
        f.debug_struct("IndexedCollection")
            .field("sync", &self.store.mode())
            .field("values", &store.values().collect::<Vec<_>>())
            .finish()
    }
}
