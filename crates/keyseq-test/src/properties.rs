//! Property checks over the public collection API
//!
//! These re-derive what the collection should look like from its own
//! snapshot, so they work against any collection without internal access.

use std::collections::HashSet;

use keyseq_collection::IndexedCollection;
use keyseq_core::Key;

/// Property: every stored value is found under its own key at its own
/// position, and the index holds exactly one key per position.
pub fn lookups_consistent<K: Key, V: Clone + PartialEq>(collection: &IndexedCollection<K, V>) -> bool {
    let key_fn = collection.key_function();
    let values = collection.to_vec();

    values.iter().enumerate().all(|(pos, value)| {
        let key = key_fn.key_of(value);
        collection.position_of_key(&key) == Some(pos) && collection.try_get(&key).as_ref() == Some(value)
    }) && collection.keys().len() == values.len()
}

/// Property: no two values share a key
pub fn keys_unique<K: Key, V: Clone>(collection: &IndexedCollection<K, V>) -> bool {
    let key_fn = collection.key_function();
    let mut seen = HashSet::new();
    collection
        .to_vec()
        .iter()
        .all(|value| seen.insert(key_fn.key_of(value)))
}

/// Property: keys absent from the collection resolve to nothing
pub fn absent_keys_miss<K: Key, V: Clone>(collection: &IndexedCollection<K, V>, probes: &[K]) -> bool {
    let present: HashSet<K> = collection.keys().into_iter().collect();
    probes
        .iter()
        .filter(|key| !present.contains(*key))
        .all(|key| collection.try_get(key).is_none() && !collection.contains_key(key))
}
