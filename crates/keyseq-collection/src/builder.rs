//! Builder for indexed collections

use keyseq_core::{CollectionConfig, Key, KeyFunction, KeyseqError, KeyseqResult, SyncMode};

use crate::IndexedCollection;

/// Step-by-step construction of an [`IndexedCollection`].
///
/// The key function is the only required input; `build` reports
/// [`KeyseqError::InvalidArgument`] when it was never supplied.
pub struct CollectionBuilder<K, V> {
    key_fn: Option<KeyFunction<K, V>>,
    config: CollectionConfig,
    seed: Vec<Option<V>>,
}

impl<K: Key, V> Default for CollectionBuilder<K, V> {
    fn default() -> Self {
        CollectionBuilder::new()
    }
}

impl<K: Key, V> CollectionBuilder<K, V> {
    pub fn new() -> Self {
        CollectionBuilder {
            key_fn: None,
            config: CollectionConfig::default(),
            seed: Vec::new(),
        }
    }

    pub fn key_fn<F>(self, key: F) -> Self
    where
        F: Fn(&V) -> K + Send + Sync + 'static,
    {
        self.key_function(KeyFunction::new(key))
    }

    pub fn key_function(mut self, key_fn: KeyFunction<K, V>) -> Self {
        self.key_fn = Some(key_fn);
        self
    }

    pub fn config(mut self, config: CollectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn sync(mut self, sync: SyncMode) -> Self {
        self.config.sync = sync;
        self
    }

    pub fn synchronized(self, enabled: bool) -> Self {
        self.sync(if enabled {
            SyncMode::Synchronized
        } else {
            SyncMode::Unsynchronized
        })
    }

    /// Values the collection starts with, in order
    pub fn seed<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
    {
        self.seed.extend(values.into_iter().map(Some));
        self
    }

    pub fn seed_nullable<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = Option<V>>,
    {
        self.seed.extend(values);
        self
    }

    pub fn build(self) -> KeyseqResult<IndexedCollection<K, V>> {
        let key_fn = self
            .key_fn
            .ok_or(KeyseqError::InvalidArgument("key function"))?;
        IndexedCollection::from_seed_nullable(key_fn, self.config, self.seed)
    }
}
