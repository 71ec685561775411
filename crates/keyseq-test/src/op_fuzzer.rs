//! Operation Fuzzer - Randomized testing for the indexed collection
//!
//! Tests:
//! - Index/sequence consistency after every operation
//! - Agreement with a plain `Vec` reference model
//! - All-or-nothing rejection of invalid mutations
//! - Consistency under concurrent writers (synchronized mode)

use std::sync::Arc;
use std::thread;

use keyseq_collection::{IndexedCollection, KeyFunction, KeyseqResult, SyncMode};
use keyseq_core::CollectionConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::properties;

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Number of operations to generate
    pub op_count: usize,
    /// Distinct keys to draw from (smaller means more collisions)
    pub key_space: u32,
    /// Largest batch for range operations and reconciliation targets
    pub max_batch: usize,
    /// Probability that a reconciliation target is derived from the
    /// current contents rather than drawn at random
    pub derived_target_prob: f64,
    /// Synchronization mode of the collection under test
    pub sync: SyncMode,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            op_count: 1000,
            key_space: 64,
            max_batch: 8,
            derived_target_prob: 0.6,
            sync: SyncMode::Unsynchronized,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            op_count: 200,
            key_space: 16,
            max_batch: 4,
            derived_target_prob: 0.5,
            sync: SyncMode::Unsynchronized,
            seed: 42,
        }
    }

    /// Heavy fuzzing for thorough testing
    pub fn heavy() -> Self {
        FuzzerConfig {
            op_count: 10000,
            key_space: 256,
            max_batch: 32,
            derived_target_prob: 0.7,
            sync: SyncMode::Unsynchronized,
            seed: 42,
        }
    }

    /// Tiny key space: most mutations collide
    pub fn adversarial() -> Self {
        FuzzerConfig {
            op_count: 5000,
            key_space: 6,
            max_batch: 6,
            derived_target_prob: 0.3,
            sync: SyncMode::Unsynchronized,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_sync(mut self, sync: SyncMode) -> Self {
        self.sync = sync;
        self
    }
}

/// Value type used by the fuzzer; keyed by `id`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FuzzItem {
    pub id: u32,
    pub payload: u32,
}

/// Key function for [`FuzzItem`]
pub fn item_key() -> KeyFunction<u32, FuzzItem> {
    KeyFunction::new(|item: &FuzzItem| item.id)
}

/// Generated operation
#[derive(Clone, Debug)]
pub enum FuzzOp {
    Add(FuzzItem),
    AddRange(Vec<FuzzItem>),
    Insert(usize, FuzzItem),
    RemoveAt(usize),
    RemoveRange(usize, usize),
    Set(usize, FuzzItem),
    RemoveAll(u32),
    SetAll(Vec<FuzzItem>),
    Reverse,
    Clear,
}

/// A step where the collection disagreed with the reference model
#[derive(Clone, Debug)]
pub struct Mismatch {
    pub step: usize,
    pub op: FuzzOp,
    pub reason: &'static str,
}

/// Fuzzing result
#[derive(Debug, Default)]
pub struct FuzzResult {
    pub ops_accepted: u64,
    pub ops_rejected: u64,
    pub mismatches: Vec<Mismatch>,
}

impl FuzzResult {
    pub fn new() -> Self {
        FuzzResult::default()
    }

    pub fn is_valid(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Operation fuzzer
pub struct OpFuzzer {
    config: FuzzerConfig,
    collection: IndexedCollection<u32, FuzzItem>,
    model: Vec<FuzzItem>,
    rng: StdRng,
}

impl OpFuzzer {
    /// Create a new fuzzer
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let collection = IndexedCollection::with_config(
            item_key(),
            CollectionConfig::new().with_sync(config.sync),
        );

        OpFuzzer {
            config,
            collection,
            model: Vec::new(),
            rng,
        }
    }

    pub fn collection(&self) -> &IndexedCollection<u32, FuzzItem> {
        &self.collection
    }

    /// Run the fuzzer
    pub fn run(&mut self) -> FuzzResult {
        let mut result = FuzzResult::new();

        for step in 0..self.config.op_count {
            let op = self.generate_op();
            let accepted = self.apply(&op);

            match accepted {
                Ok(true) => result.ops_accepted += 1,
                Ok(false) => result.ops_rejected += 1,
                Err(reason) => {
                    debug!(step, ?op, reason, "collection diverged from model");
                    result.mismatches.push(Mismatch { step, op, reason });
                }
            }
        }

        result
    }

    /// Apply one operation to both the collection and the model.
    ///
    /// Returns whether the operation was accepted, or why the two disagree.
    fn apply(&mut self, op: &FuzzOp) -> Result<bool, &'static str> {
        let actual = self.apply_collection(op);
        let expected = self.apply_model(op);

        if actual != expected {
            return Err("acceptance differs from model");
        }
        if self.collection.to_vec() != self.model {
            return Err("contents differ from model");
        }
        if !self.collection.is_consistent() {
            return Err("key index inconsistent with sequence");
        }
        if !properties::lookups_consistent(&self.collection) {
            return Err("key lookup disagrees with sequence");
        }
        Ok(actual)
    }

    fn apply_collection(&self, op: &FuzzOp) -> bool {
        let c = &self.collection;
        let result: KeyseqResult<()> = match op.clone() {
            FuzzOp::Add(item) => c.add(item),
            FuzzOp::AddRange(items) => c.add_range(items),
            FuzzOp::Insert(i, item) => c.insert(i, item),
            FuzzOp::RemoveAt(i) => c.remove_at(i).map(|_| ()),
            FuzzOp::RemoveRange(i, n) => c.remove_range(i, n).map(|_| ()),
            FuzzOp::Set(i, item) => c.set(i, item).map(|_| ()),
            FuzzOp::RemoveAll(payload) => {
                c.remove_all(|item| item.payload == payload);
                Ok(())
            }
            FuzzOp::SetAll(target) => c.set_all(target).map(|_| ()),
            FuzzOp::Reverse => {
                c.reverse();
                Ok(())
            }
            FuzzOp::Clear => {
                c.clear();
                Ok(())
            }
        };
        result.is_ok()
    }

    /// Reference semantics over a plain vector
    fn apply_model(&mut self, op: &FuzzOp) -> bool {
        let model = &mut self.model;

        match op.clone() {
            FuzzOp::Add(item) => {
                if has_id(model, item.id) {
                    return false;
                }
                model.push(item);
            }
            FuzzOp::AddRange(items) => {
                if !all_unique(&items) || items.iter().any(|x| has_id(model.as_slice(), x.id)) {
                    return false;
                }
                model.extend(items);
            }
            FuzzOp::Insert(i, item) => {
                if i > model.len() || has_id(model, item.id) {
                    return false;
                }
                model.insert(i, item);
            }
            FuzzOp::RemoveAt(i) => {
                if i >= model.len() {
                    return false;
                }
                model.remove(i);
            }
            FuzzOp::RemoveRange(i, n) => {
                if i + n > model.len() {
                    return false;
                }
                model.drain(i..i + n);
            }
            FuzzOp::Set(i, item) => {
                if i >= model.len() {
                    return false;
                }
                if model[i] != item {
                    let taken = model
                        .iter()
                        .enumerate()
                        .any(|(j, x)| j != i && x.id == item.id);
                    if taken {
                        return false;
                    }
                    model[i] = item;
                }
            }
            FuzzOp::RemoveAll(payload) => model.retain(|x| x.payload != payload),
            FuzzOp::SetAll(target) => {
                if !all_unique(&target) {
                    return false;
                }
                *model = target;
            }
            FuzzOp::Reverse => model.reverse(),
            FuzzOp::Clear => model.clear(),
        }
        true
    }

    /// Generate a random operation
    fn generate_op(&mut self) -> FuzzOp {
        // Positions may point one past the end so out-of-range paths get exercised
        let len = self.model.len();
        match self.rng.gen_range(0..10) {
            0 => FuzzOp::Add(self.generate_item()),
            1 => {
                let n = self.rng.gen_range(0..=self.config.max_batch);
                FuzzOp::AddRange((0..n).map(|_| self.generate_item()).collect())
            }
            2 => FuzzOp::Insert(self.rng.gen_range(0..=len + 1), self.generate_item()),
            3 => FuzzOp::RemoveAt(self.rng.gen_range(0..=len)),
            4 => {
                let i = self.rng.gen_range(0..=len);
                let n = self.rng.gen_range(0..=self.config.max_batch);
                FuzzOp::RemoveRange(i, n)
            }
            5 => FuzzOp::Set(self.rng.gen_range(0..=len), self.generate_item()),
            6 => FuzzOp::RemoveAll(self.rng.gen_range(0..4)),
            7 | 8 => FuzzOp::SetAll(self.generate_target()),
            _ => {
                if self.rng.gen_bool(0.8) {
                    FuzzOp::Reverse
                } else {
                    FuzzOp::Clear
                }
            }
        }
    }

    fn generate_item(&mut self) -> FuzzItem {
        FuzzItem {
            id: self.rng.gen_range(0..self.config.key_space),
            payload: self.rng.gen_range(0..4),
        }
    }

    /// Reconciliation target: either an edit of the current contents (keeps
    /// some positions equal) or fresh random values
    fn generate_target(&mut self) -> Vec<FuzzItem> {
        if self.rng.gen::<f64>() >= self.config.derived_target_prob {
            let n = self.rng.gen_range(0..=self.config.max_batch);
            return (0..n).map(|_| self.generate_item()).collect();
        }

        let mut target = self.model.clone();
        if !target.is_empty() && self.rng.gen_bool(0.5) {
            let drop_at = self.rng.gen_range(0..target.len());
            target.remove(drop_at);
        }
        if target.len() > 1 && self.rng.gen_bool(0.3) {
            let a = self.rng.gen_range(0..target.len());
            let b = self.rng.gen_range(0..target.len());
            target.swap(a, b);
        }
        if !target.is_empty() && self.rng.gen_bool(0.3) {
            let at = self.rng.gen_range(0..target.len());
            target[at].payload = self.rng.gen_range(0..4);
        }
        if self.rng.gen_bool(0.1) {
            target.shuffle(&mut self.rng);
        }
        for _ in 0..self.rng.gen_range(0..3) {
            let item = self.generate_item();
            target.push(item);
        }
        target
    }
}

fn has_id(items: &[FuzzItem], id: u32) -> bool {
    items.iter().any(|x| x.id == id)
}

fn all_unique(items: &[FuzzItem]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(i, x)| items[..i].iter().all(|y| y.id != x.id))
}

/// Result of a concurrent stress run
#[derive(Debug)]
pub struct StressResult {
    pub operations: u64,
    pub ops_accepted: u64,
    pub ops_rejected: u64,
    pub final_len: usize,
    pub consistent: bool,
}

/// Hammer one synchronized collection from several threads, then check the
/// index against the sequence.
pub fn run_concurrent(config: &FuzzerConfig, threads: usize) -> StressResult {
    let collection = Arc::new(IndexedCollection::with_config(
        item_key(),
        CollectionConfig::synchronized(),
    ));

    let handles: Vec<_> = (0..threads)
        .map(|worker| {
            let collection = Arc::clone(&collection);
            let config = config.clone();
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(worker as u64));
                let mut accepted = 0u64;
                let mut rejected = 0u64;
                for _ in 0..config.op_count {
                    let item = FuzzItem {
                        id: rng.gen_range(0..config.key_space),
                        payload: rng.gen_range(0..4),
                    };
                    let len = collection.len();
                    let outcome = match rng.gen_range(0..6) {
                        0 | 1 => collection.add(item),
                        2 => collection.insert(rng.gen_range(0..=len), item),
                        3 => collection.remove_at(rng.gen_range(0..=len)).map(|_| ()),
                        4 => collection.set(rng.gen_range(0..=len), item).map(|_| ()),
                        _ => {
                            let mut target = collection.to_vec();
                            target.reverse();
                            collection.set_all(target).map(|_| ())
                        }
                    };
                    match outcome {
                        Ok(()) => accepted += 1,
                        Err(_) => rejected += 1,
                    }
                }
                (accepted, rejected)
            })
        })
        .collect();

    let (ops_accepted, ops_rejected) = handles
        .into_iter()
        .map(|handle| handle.join().unwrap_or((0, 0)))
        .fold((0, 0), |(a, r), (accepted, rejected)| (a + accepted, r + rejected));

    StressResult {
        operations: ops_accepted + ops_rejected,
        ops_accepted,
        ops_rejected,
        final_len: collection.len(),
        consistent: collection.is_consistent() && properties::lookups_consistent(&collection),
    }
}
