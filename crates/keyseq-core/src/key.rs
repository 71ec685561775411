//! Key function contract
//!
//! A collection derives the key of every stored value through a single
//! [`KeyFunction`] fixed at construction. The function must be:
//! - Pure: no side effects observable by the collection
//! - Total: defined for every value it is handed
//! - Stable: the same value always yields the same key
//! - Non-reentrant: it must not call back into the owning collection
//!
//! These are caller obligations. A key function that breaks them produces
//! unspecified results; it is not detected.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Bounds every key type must satisfy.
///
/// Keys are hashed for O(1) lookup, cloned into the position index and
/// rendered with `Debug` in duplicate-key errors.
pub trait Key: Eq + Hash + Clone + fmt::Debug {}

impl<T: Eq + Hash + Clone + fmt::Debug> Key for T {}

/// Shared handle to a `value -> key` function.
pub struct KeyFunction<K, V> {
    f: Arc<dyn Fn(&V) -> K + Send + Sync>,
}

impl<K, V> KeyFunction<K, V> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&V) -> K + Send + Sync + 'static,
    {
        KeyFunction { f: Arc::new(f) }
    }

    /// Derive the key of a value
    #[inline]
    pub fn key_of(&self, value: &V) -> K {
        (self.f)(value)
    }

    /// Check whether two handles wrap the same function
    pub fn shares_with(&self, other: &KeyFunction<K, V>) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl<K, V> Clone for KeyFunction<K, V> {
    fn clone(&self) -> Self {
        KeyFunction {
            f: Arc::clone(&self.f),
        }
    }
}

impl<K, V> fmt::Debug for KeyFunction<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyFunction")
    }
}
