//! KEYSEQ Collection - Ordered sequence with a unique-key index
//!
//! This crate implements the indexed collection:
//! - Positional access, insertion and removal
//! - O(1) lookup by key
//! - Bulk reconciliation to a target sequence with minimal churn
//! - Optional coarse locking chosen at construction
//! - Read-only converter views
//!
//! ```
//! use keyseq_collection::IndexedCollection;
//!
//! let people = IndexedCollection::new(|p: &(&'static str, u32)| p.0);
//! people.add_range(vec![("A", 1), ("B", 2), ("C", 3)]).unwrap();
//!
//! let summary = people.set_all(vec![("A", 1), ("C", 3), ("D", 4)]).unwrap();
//! assert_eq!(summary.kept, 1);
//! assert_eq!(people.keys(), vec!["A", "C", "D"]);
//! assert_eq!(people.try_get(&"B"), None);
//! ```

pub mod builder;
pub mod collection;
mod guard;
pub mod reconcile;
mod store;
pub mod view;

pub use builder::*;
pub use collection::*;
pub use reconcile::*;
pub use store::Values;
pub use view::*;

pub use keyseq_core::{CollectionConfig, KeyFunction, KeyseqError, KeyseqResult, SyncMode};
