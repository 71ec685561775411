//! KEYSEQ Core - Fundamental types shared by the collection crates
//!
//! This crate defines:
//! - Error kinds reported by every collection operation
//! - The key function contract (value -> unique key)
//! - Collection configuration (capacity hint, synchronization mode)

pub mod config;
pub mod error;
pub mod key;

pub use config::*;
pub use error::*;
pub use key::*;
