//! KEYSEQ Test Harness - Fuzzing and property checks for indexed collections
//!
//! This crate provides:
//! - Seeded random-operation fuzzing against a reference model
//! - Concurrent stress runs for synchronized collections
//! - Reusable property checks over the public API

pub mod op_fuzzer;
pub mod properties;

pub use op_fuzzer::*;
