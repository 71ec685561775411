//! Error types for KEYSEQ collections

use std::fmt;

use thiserror::Error;

/// Core KEYSEQ errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyseqError {
    // Argument errors
    #[error("Invalid argument: {0} is required")]
    InvalidArgument(&'static str),

    #[error("Null value at position {position}")]
    NullValue { position: usize },

    // Index errors
    #[error("Duplicate key {key}: held at position {existing}, offered at position {incoming}")]
    DuplicateKey {
        key: String,
        existing: usize,
        incoming: usize,
    },

    #[error("Index out of range: index {index} with count {count} exceeds length {len}")]
    IndexOutOfRange { index: usize, count: usize, len: usize },

    // View errors
    #[error("Unsupported operation: {0} on a read-only view")]
    UnsupportedOperation(&'static str),
}

impl KeyseqError {
    /// Build a duplicate-key error, rendering the key with its `Debug` form.
    pub fn duplicate_key<K: fmt::Debug>(key: &K, existing: usize, incoming: usize) -> Self {
        KeyseqError::DuplicateKey {
            key: format!("{key:?}"),
            existing,
            incoming,
        }
    }

    /// Build an out-of-range error for the window `[index, index + count)`.
    pub fn out_of_range(index: usize, count: usize, len: usize) -> Self {
        KeyseqError::IndexOutOfRange { index, count, len }
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, KeyseqError::DuplicateKey { .. })
    }

    pub fn is_out_of_range(&self) -> bool {
        matches!(self, KeyseqError::IndexOutOfRange { .. })
    }
}

/// Result type for KEYSEQ operations
pub type KeyseqResult<T> = Result<T, KeyseqError>;
