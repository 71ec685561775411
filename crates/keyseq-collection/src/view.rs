//! Read-only converter views
//!
//! A [`ConvertedView`] borrows a collection and hands out values passed
//! through a converter, one call at a time. Every read runs under the
//! collection's guard, so a view never observes a half-applied mutation.
//! Mutations through a view are refused with `UnsupportedOperation`.

use keyseq_core::{Key, KeyseqError, KeyseqResult};

use crate::IndexedCollection;

/// Mutating sequence operations shared by collections and views
pub trait SequenceSink<T> {
    fn push(&self, value: T) -> KeyseqResult<()>;

    fn insert_at(&self, index: usize, value: T) -> KeyseqResult<()>;

    fn remove_at(&self, index: usize) -> KeyseqResult<T>;

    fn clear(&self) -> KeyseqResult<()>;
}

impl<K: Key, V> SequenceSink<V> for IndexedCollection<K, V> {
    fn push(&self, value: V) -> KeyseqResult<()> {
        self.add(value)
    }

    fn insert_at(&self, index: usize, value: V) -> KeyseqResult<()> {
        self.insert(index, value)
    }

    fn remove_at(&self, index: usize) -> KeyseqResult<V> {
        IndexedCollection::remove_at(self, index)
    }

    fn clear(&self) -> KeyseqResult<()> {
        IndexedCollection::clear(self);
        Ok(())
    }
}

/// Lazy, read-only view converting each value on access
pub struct ConvertedView<'a, K, V, F> {
    source: &'a IndexedCollection<K, V>,
    convert: F,
}

impl<'a, K: Key, V, F> ConvertedView<'a, K, V, F> {
    pub fn new(source: &'a IndexedCollection<K, V>, convert: F) -> Self {
        ConvertedView { source, convert }
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.source.contains_key(key)
    }

    pub fn get<U>(&self, index: usize) -> KeyseqResult<U>
    where
        F: Fn(&V) -> U,
    {
        self.source
            .read(|store| store.value(index).map(|v| (self.convert)(v)))
    }

    pub fn try_get<U>(&self, key: &K) -> Option<U>
    where
        F: Fn(&V) -> U,
    {
        self.source
            .read(|store| store.get_by_key(key).map(|v| (self.convert)(v)))
    }

    /// Convert the whole sequence under one guard acquisition
    pub fn to_vec<U>(&self) -> Vec<U>
    where
        F: Fn(&V) -> U,
    {
        self.source
            .read(|store| store.values().map(|v| (self.convert)(v)).collect())
    }
}

impl<K: Key, V, U, F> SequenceSink<U> for ConvertedView<'_, K, V, F>
where
    F: Fn(&V) -> U,
{
    fn push(&self, _value: U) -> KeyseqResult<()> {
        Err(KeyseqError::UnsupportedOperation("push"))
    }

    fn insert_at(&self, _index: usize, _value: U) -> KeyseqResult<()> {
        Err(KeyseqError::UnsupportedOperation("insert"))
    }

    fn remove_at(&self, _index: usize) -> KeyseqResult<U> {
        Err(KeyseqError::UnsupportedOperation("remove"))
    }

    fn clear(&self) -> KeyseqResult<()> {
        Err(KeyseqError::UnsupportedOperation("clear"))
    }
}

impl<K: Key, V> IndexedCollection<K, V> {
    /// Borrow the collection as a read-only view through `convert`
    pub fn view<U, F>(&self, convert: F) -> ConvertedView<'_, K, V, F>
    where
        F: Fn(&V) -> U,
    {
        ConvertedView::new(self, convert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyseq_core::{CollectionConfig, KeyFunction};

    fn scores() -> IndexedCollection<&'static str, (&'static str, u32)> {
        IndexedCollection::from_seed(
            KeyFunction::new(|v: &(&'static str, u32)| v.0),
            CollectionConfig::default(),
            vec![("ann", 7), ("bob", 3)],
        )
        .unwrap()
    }

    #[test]
    fn test_view_converts_on_access() {
        let items = scores();
        let view = items.view(|v| v.1 * 10);

        assert_eq!(view.len(), 2);
        assert_eq!(view.get(1).unwrap(), 30);
        assert_eq!(view.try_get(&"ann"), Some(70));
        assert_eq!(view.try_get(&"cat"), None);
        assert!(view.contains_key(&"bob"));
        assert!(view.get(2).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_view_tracks_source_mutations() {
        let items = scores();
        items.add(("cat", 1)).unwrap();
        let view = items.view(|v| v.0.len());
        assert_eq!(view.to_vec(), vec![3, 3, 3]);

        items.clear();
        assert!(view.is_empty());
    }

    #[test]
    fn test_view_refuses_mutation() {
        let items = scores();
        let view = items.view(|v| v.1);

        assert_eq!(
            view.push(1).unwrap_err(),
            KeyseqError::UnsupportedOperation("push")
        );
        assert!(matches!(
            view.insert_at(0, 1),
            Err(KeyseqError::UnsupportedOperation(_))
        ));
        assert!(view.remove_at(0).is_err());
        assert!(view.clear().is_err());
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_collection_as_sink() {
        fn fill<S: SequenceSink<(&'static str, u32)>>(sink: &S) -> KeyseqResult<()> {
            sink.push(("dan", 1))?;
            sink.insert_at(0, ("eve", 2))
        }

        let items = scores();
        fill(&items).unwrap();
        assert_eq!(items.keys(), vec!["eve", "ann", "bob", "dan"]);
        assert_eq!(SequenceSink::remove_at(&items, 0).unwrap(), ("eve", 2));
        SequenceSink::clear(&items).unwrap();
        assert!(items.is_empty());
    }
}
