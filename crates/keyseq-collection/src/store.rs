//! Slot storage and the key -> position index
//!
//! Values live exactly once, in `slots`. Each slot caches the key its value
//! was indexed under, so shifting or reordering slots only rewrites
//! positions in `index` and never calls the key function again.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::Range;
use std::slice;

use keyseq_core::{Key, KeyFunction, KeyseqError, KeyseqResult};

/// One stored value with the key it was indexed under
#[derive(Debug, Clone)]
pub(crate) struct Slot<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

/// Ordered slots plus the index mapping each key to its slot position
#[derive(Debug, Clone)]
pub(crate) struct Store<K, V> {
    pub(crate) slots: Vec<Slot<K, V>>,
    pub(crate) index: HashMap<K, usize>,
}

/// Iterator over stored values in sequence order
pub struct Values<'a, K, V> {
    inner: slice::Iter<'a, Slot<K, V>>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|slot| &slot.value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Values<'a, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a V> {
        self.inner.next_back().map(|slot| &slot.value)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// Reject absent values, reporting the first offending position
pub(crate) fn require_values<V>(values: impl IntoIterator<Item = Option<V>>) -> KeyseqResult<Vec<V>> {
    values
        .into_iter()
        .enumerate()
        .map(|(position, value)| value.ok_or(KeyseqError::NullValue { position }))
        .collect()
}

impl<K: Key, V> Store<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Store {
            slots: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
        self.index.reserve(additional);
    }

    pub(crate) fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.slots.iter(),
        }
    }

    pub(crate) fn value(&self, pos: usize) -> KeyseqResult<&V> {
        self.check_position(pos)?;
        Ok(&self.slots[pos].value)
    }

    #[inline]
    pub(crate) fn position_of(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub(crate) fn get_by_key(&self, key: &K) -> Option<&V> {
        self.position_of(key).map(|pos| &self.slots[pos].value)
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.slots.iter().map(|slot| &slot.key)
    }

    pub(crate) fn check_position(&self, pos: usize) -> KeyseqResult<()> {
        if pos < self.len() {
            Ok(())
        } else {
            Err(KeyseqError::out_of_range(pos, 1, self.len()))
        }
    }

    /// Validate the window `[index, index + count)`
    pub(crate) fn check_range(&self, index: usize, count: usize) -> KeyseqResult<Range<usize>> {
        match index.checked_add(count) {
            Some(end) if end <= self.len() => Ok(index..end),
            _ => Err(KeyseqError::out_of_range(index, count, self.len())),
        }
    }

    /// Key a batch destined for positions `base..` and reject any key that is
    /// already indexed or repeats inside the batch.
    pub(crate) fn prepare(
        &self,
        key_fn: &KeyFunction<K, V>,
        values: Vec<V>,
        base: usize,
    ) -> KeyseqResult<Vec<Slot<K, V>>> {
        let mut batch: HashMap<K, usize> = HashMap::with_capacity(values.len());
        let mut slots = Vec::with_capacity(values.len());

        for (offset, value) in values.into_iter().enumerate() {
            let key = key_fn.key_of(&value);
            let incoming = base + offset;

            if let Some(&existing) = self.index.get(&key) {
                return Err(KeyseqError::duplicate_key(&key, existing, incoming));
            }
            match batch.entry(key.clone()) {
                Entry::Occupied(entry) => {
                    return Err(KeyseqError::duplicate_key(entry.key(), *entry.get(), incoming));
                }
                Entry::Vacant(entry) => {
                    entry.insert(incoming);
                }
            }
            slots.push(Slot { key, value });
        }

        Ok(slots)
    }

    /// Insert a batch at `at`, validating before anything moves
    pub(crate) fn insert_batch(
        &mut self,
        key_fn: &KeyFunction<K, V>,
        at: usize,
        values: Vec<V>,
    ) -> KeyseqResult<()> {
        if at > self.len() {
            return Err(KeyseqError::out_of_range(at, 0, self.len()));
        }
        let batch = self.prepare(key_fn, values, at)?;
        self.splice(at, batch);
        Ok(())
    }

    fn splice(&mut self, at: usize, batch: Vec<Slot<K, V>>) {
        let count = batch.len();
        for (offset, slot) in batch.iter().enumerate() {
            self.index.insert(slot.key.clone(), at + offset);
        }
        if at == self.len() {
            self.slots.extend(batch);
        } else {
            self.slots.splice(at..at, batch);
            self.reindex(at + count..self.len());
        }
    }

    /// Replace the value at `pos`.
    ///
    /// An equal value is a no-op and is handed back unchanged. A value whose
    /// key is held by another position is rejected.
    pub(crate) fn replace(
        &mut self,
        key_fn: &KeyFunction<K, V>,
        pos: usize,
        value: V,
    ) -> KeyseqResult<V>
    where
        V: PartialEq,
    {
        self.check_position(pos)?;
        if self.slots[pos].value == value {
            return Ok(value);
        }

        let key = key_fn.key_of(&value);
        match self.index.get(&key) {
            Some(&existing) if existing != pos => {
                return Err(KeyseqError::duplicate_key(&key, existing, pos));
            }
            // Same key, different value: the index entry stays as it is
            Some(_) => return Ok(std::mem::replace(&mut self.slots[pos].value, value)),
            None => {}
        }

        let old = std::mem::replace(&mut self.slots[pos], Slot { key: key.clone(), value });
        self.index.remove(&old.key);
        self.index.insert(key, pos);
        Ok(old.value)
    }

    pub(crate) fn remove_at(&mut self, pos: usize) -> KeyseqResult<V> {
        self.check_position(pos)?;
        let slot = self.slots.remove(pos);
        self.index.remove(&slot.key);
        self.reindex(pos..self.len());
        Ok(slot.value)
    }

    pub(crate) fn remove_key(&mut self, key: &K) -> Option<V> {
        let pos = self.index.remove(key)?;
        let slot = self.slots.remove(pos);
        self.reindex(pos..self.len());
        Some(slot.value)
    }

    pub(crate) fn drain(&mut self, range: Range<usize>) -> Vec<V> {
        let start = range.start;
        let removed: Vec<Slot<K, V>> = self.slots.drain(range).collect();
        for slot in &removed {
            self.index.remove(&slot.key);
        }
        self.reindex(start..self.len());
        removed.into_iter().map(|slot| slot.value).collect()
    }

    /// Remove every matching value, visiting positions back to front.
    ///
    /// The predicate sees every value before anything is removed, so a
    /// panicking predicate leaves the store untouched.
    pub(crate) fn remove_where(&mut self, mut predicate: impl FnMut(&V) -> bool) -> usize {
        let mut keep: Vec<bool> = self.slots.iter().rev().map(|slot| !predicate(&slot.value)).collect();
        keep.reverse();

        let Some(lowest) = keep.iter().position(|&kept| !kept) else {
            return 0;
        };
        for (slot, &kept) in self.slots.iter().zip(&keep) {
            if !kept {
                self.index.remove(&slot.key);
            }
        }

        let before = self.len();
        let mut mask = keep.into_iter();
        self.slots.retain(|_| mask.next().unwrap_or(true));
        self.reindex(lowest..self.len());
        before - self.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    /// Permute the slots in `range`; key membership is unchanged.
    ///
    /// `arrange` reorders the absolute positions of `range` while the slots
    /// stay in place; the resulting order is applied only once it returns.
    pub(crate) fn reorder(&mut self, range: Range<usize>, arrange: impl FnOnce(&[Slot<K, V>], &mut [usize])) {
        let start = range.start;
        let mut order: Vec<usize> = range.clone().collect();
        arrange(&self.slots, &mut order);

        let mut moved: Vec<Option<Slot<K, V>>> = self.slots.drain(range.clone()).map(Some).collect();
        let arranged: Vec<Slot<K, V>> = order.iter().filter_map(|&pos| moved[pos - start].take()).collect();
        self.slots.splice(start..start, arranged);
        self.reindex(range);
    }

    pub(crate) fn binary_search_by(
        &self,
        range: Range<usize>,
        mut f: impl FnMut(&V) -> Ordering,
    ) -> Result<usize, usize> {
        let start = range.start;
        self.slots[range]
            .binary_search_by(|slot| f(&slot.value))
            .map(|pos| pos + start)
            .map_err(|pos| pos + start)
    }

    /// Rewrite index positions for the slots in `range` from cached keys
    pub(crate) fn reindex(&mut self, range: Range<usize>) {
        for pos in range {
            if let Some(entry) = self.index.get_mut(&self.slots[pos].key) {
                *entry = pos;
            }
        }
    }

    /// Re-derive the index from the sequence through the key function and
    /// compare it with the stored one.
    pub(crate) fn is_consistent(&self, key_fn: &KeyFunction<K, V>) -> bool {
        self.index.len() == self.slots.len()
            && self.slots.iter().enumerate().all(|(pos, slot)| {
                let key = key_fn.key_of(&slot.value);
                key == slot.key && self.index.get(&key) == Some(&pos)
            })
    }

    pub(crate) fn into_values(self) -> Vec<V> {
        self.slots.into_iter().map(|slot| slot.value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_fn() -> KeyFunction<u32, (u32, char)> {
        KeyFunction::new(|v: &(u32, char)| v.0)
    }

    fn store_of(values: &[(u32, char)]) -> Store<u32, (u32, char)> {
        let mut store = Store::with_capacity(values.len());
        store.insert_batch(&key_fn(), 0, values.to_vec()).unwrap();
        store
    }

    #[test]
    fn test_insert_batch_shifts_positions() {
        let key_fn = key_fn();
        let mut store = store_of(&[(1, 'a'), (2, 'b')]);

        store.insert_batch(&key_fn, 1, vec![(7, 'x'), (8, 'y')]).unwrap();

        let order: Vec<u32> = store.keys().copied().collect();
        assert_eq!(order, vec![1, 7, 8, 2]);
        assert_eq!(store.position_of(&2), Some(3));
        assert!(store.is_consistent(&key_fn));
    }

    #[test]
    fn test_prepare_rejects_batch_collision() {
        let store = store_of(&[(1, 'a')]);
        let err = store
            .prepare(&key_fn(), vec![(5, 'x'), (6, 'y'), (5, 'z')], 1)
            .unwrap_err();
        assert_eq!(err, KeyseqError::duplicate_key(&5u32, 1, 3));
    }

    #[test]
    fn test_prepare_rejects_indexed_key() {
        let store = store_of(&[(1, 'a'), (2, 'b')]);
        let err = store.prepare(&key_fn(), vec![(2, 'z')], 2).unwrap_err();
        assert_eq!(err, KeyseqError::duplicate_key(&2u32, 1, 2));
    }

    #[test]
    fn test_replace_same_key_keeps_index_entry() {
        let key_fn = key_fn();
        let mut store = store_of(&[(1, 'a'), (2, 'b')]);

        let old = store.replace(&key_fn, 1, (2, 'z')).unwrap();
        assert_eq!(old, (2, 'b'));
        assert_eq!(store.get_by_key(&2), Some(&(2, 'z')));
        assert!(store.is_consistent(&key_fn));
    }

    #[test]
    fn test_remove_where_reindexes_survivors() {
        let key_fn = key_fn();
        let mut store = store_of(&[(1, 'a'), (2, 'b'), (3, 'a'), (4, 'b')]);

        let removed = store.remove_where(|v| v.1 == 'a');
        assert_eq!(removed, 2);
        assert_eq!(store.position_of(&2), Some(0));
        assert_eq!(store.position_of(&4), Some(1));
        assert_eq!(store.position_of(&1), None);
        assert!(store.is_consistent(&key_fn));
    }

    #[test]
    fn test_reorder_applies_arranged_positions() {
        let key_fn = key_fn();
        let mut store = store_of(&[(1, 'c'), (2, 'a'), (3, 'b'), (4, 'a')]);

        store.reorder(1..4, |slots, order| {
            order.sort_by(|&a, &b| slots[a].value.1.cmp(&slots[b].value.1))
        });

        assert_eq!(
            store.values().copied().collect::<Vec<_>>(),
            vec![(1, 'c'), (2, 'a'), (4, 'a'), (3, 'b')]
        );
        assert_eq!(store.position_of(&4), Some(2));
        assert!(store.is_consistent(&key_fn));
    }

    #[test]
    fn test_panicking_callbacks_leave_store_intact() {
        let key_fn = key_fn();
        let mut store = store_of(&[(1, 'a'), (2, 'b'), (3, 'a')]);

        let sorted = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.reorder(0..3, |_, order| {
                order.swap(0, 2);
                panic!("comparator failed");
            })
        }));
        assert!(sorted.is_err());

        let mut seen = 0;
        let removed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.remove_where(|_| {
                seen += 1;
                if seen == 2 {
                    panic!("predicate failed");
                }
                true
            })
        }));
        assert!(removed.is_err());

        assert_eq!(
            store.values().copied().collect::<Vec<_>>(),
            vec![(1, 'a'), (2, 'b'), (3, 'a')]
        );
        assert!(store.is_consistent(&key_fn));
    }

    #[test]
    fn test_check_range_rejects_overflow() {
        let store = store_of(&[(1, 'a')]);
        assert_eq!(store.check_range(1, 0), Ok(1..1));
        assert!(store.check_range(usize::MAX, 2).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_require_values_reports_first_gap() {
        assert_eq!(require_values(vec![Some(1), Some(2)]), Ok(vec![1, 2]));
        assert_eq!(
            require_values(vec![Some(1), None, None]),
            Err(KeyseqError::NullValue { position: 1 })
        );
    }

    #[test]
    fn test_is_consistent_detects_stale_position() {
        let key_fn = key_fn();
        let mut store = store_of(&[(1, 'a'), (2, 'b')]);
        store.index.insert(1, 1);
        assert!(!store.is_consistent(&key_fn));
    }
}
