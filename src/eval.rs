//! Predicate evaluation.
//!
//! [`Predicate::test`] checks a single item. [`Evaluator::test`] checks a whole
//! [`Dataset`] at once and returns a [`BitSet`] of matching positions:
//!
//! - atomic leaves are evaluated in parallel on the evaluator's thread pool, one
//!   64-item word per task;
//! - composite nodes combine the bit sets of their operands with `&=`, `|=` and
//!   `!`, so the tree is walked once and each level is vectorized;
//! - every non-constant node's result is memoized in a bounded [`BitCache`] keyed
//!   by the predicate and the dataset *identity*.
//!
//! Rule search re-evaluates many overlapping candidate formulas against the same
//! dataset, so shared sub-formulas are computed once per dataset.
//!
//! ```
//! use predicate_rules::eval::{Dataset, EvalConfig, Evaluator};
//! use predicate_rules::predicate::Predicate;
//!
//! let even = Predicate::atomic("even", |x: &u32| x % 2 == 0);
//! let small = Predicate::atomic("small", |x: &u32| *x < 4);
//! let data = Dataset::new((0..8).collect());
//!
//! let evaluator = Evaluator::new(EvalConfig::default().with_threads(2)).unwrap();
//! let bits = evaluator.test(&(&even & &small), &data).unwrap();
//! assert_eq!(bits.iter().collect::<Vec<_>>(), vec![0, 2]);
//! ```

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;

use crate::bitset::BitSet;
use crate::cache::BitCache;
use crate::predicate::{Atomic, Predicate};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("cannot evaluate an undefined predicate")]
    Undefined,

    #[error("failed to build evaluation thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl<T> Predicate<T> {
    /// Tests a single item.
    ///
    /// # Panics
    ///
    /// Panics on [`Predicate::Undefined`]: undefined candidates must be filtered
    /// out before evaluation.
    pub fn test(&self, item: &T) -> bool {
        match self {
            Predicate::True => true,
            Predicate::False => false,
            Predicate::Undefined => panic!("cannot test an undefined predicate"),
            Predicate::Atomic(atomic) => atomic.test(item),
            Predicate::Not(unary) => !unary.operand().test(item),
            Predicate::Parentheses(unary) => unary.operand().test(item),
            Predicate::And(nary) => nary.operands().iter().all(|p| p.test(item)),
            Predicate::Or(nary) => nary.operands().iter().any(|p| p.test(item)),
        }
    }
}

static NEXT_DATASET_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a [`Dataset`], shared by its clones.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DatasetId(u64);

/// Immutable item sequence with an identity.
///
/// Evaluation results are cached per identity, never per content: two datasets
/// built from equal vectors are unrelated as far as the cache is concerned.
pub struct Dataset<T> {
    id: DatasetId,
    items: Arc<[T]>,
}

impl<T> Dataset<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            id: DatasetId(NEXT_DATASET_ID.fetch_add(1, Ordering::Relaxed)),
            items: Arc::from(items),
        }
    }

    pub fn id(&self) -> DatasetId {
        self.id
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Clone for Dataset<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> From<Vec<T>> for Dataset<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> std::fmt::Debug for Dataset<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("id", &self.id)
            .field("len", &self.items.len())
            .finish()
    }
}

/// Evaluator configuration.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Worker threads for leaf evaluation (default: hardware parallelism)
    pub threads: usize,
    /// Maximum number of cached bit sets (default: 1024)
    pub cache_capacity: NonZeroUsize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            cache_capacity: NonZeroUsize::new(1024).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl EvalConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_cache_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// Batch evaluator owning a worker pool and a result cache.
pub struct Evaluator<T> {
    pool: ThreadPool,
    cache: BitCache<(Predicate<T>, DatasetId)>,
}

impl<T> Evaluator<T> {
    pub fn new(config: EvalConfig) -> Result<Self, EvalError> {
        debug!("Evaluator::new({:?})", config);
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("predicate-eval-{}", i))
            .build()?;
        Ok(Self {
            pool,
            cache: BitCache::new(config.cache_capacity),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Returns the number of cache hits.
    pub fn hits(&self) -> usize {
        self.cache.hits()
    }

    /// Returns the number of cache misses.
    pub fn misses(&self) -> usize {
        self.cache.misses()
    }

    /// Returns the number of cached results.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl<T: Sync> Evaluator<T> {
    /// Tests every item of `dataset`; bit `i` of the result is set iff item `i`
    /// matches.
    ///
    /// Returns [`EvalError::Undefined`] for the undefined predicate. Panics raised
    /// by atomic tests propagate to the caller.
    pub fn test(&self, predicate: &Predicate<T>, dataset: &Dataset<T>) -> Result<Arc<BitSet>, EvalError> {
        if !predicate.is_defined() {
            return Err(EvalError::Undefined);
        }
        self.test_cached(predicate, dataset)
    }

    fn test_cached(&self, predicate: &Predicate<T>, dataset: &Dataset<T>) -> Result<Arc<BitSet>, EvalError> {
        match predicate {
            Predicate::True => Ok(Arc::new(BitSet::full(dataset.len()))),
            Predicate::False => Ok(Arc::new(BitSet::new(dataset.len()))),
            Predicate::Undefined => Err(EvalError::Undefined),
            // Grouping does not change the result.
            Predicate::Parentheses(unary) => self.test_cached(unary.operand(), dataset),
            _ => self
                .cache
                .get_or_compute((predicate.clone(), dataset.id()), || self.test_uncached(predicate, dataset)),
        }
    }

    fn test_uncached(&self, predicate: &Predicate<T>, dataset: &Dataset<T>) -> Result<BitSet, EvalError> {
        debug!("test_uncached({}, {:?})", predicate, dataset.id());
        match predicate {
            Predicate::Atomic(atomic) => Ok(self.test_atomic(atomic, dataset.items())),
            Predicate::Not(unary) => {
                let operand = self.test_cached(unary.operand(), dataset)?;
                Ok(!operand.as_ref())
            }
            Predicate::And(nary) => {
                let mut result = BitSet::full(dataset.len());
                for operand in nary.operands() {
                    result &= self.test_cached(operand, dataset)?.as_ref();
                    if result.is_empty() {
                        trace!("and: empty after {}", operand);
                        break;
                    }
                }
                Ok(result)
            }
            Predicate::Or(nary) => {
                let mut result = BitSet::new(dataset.len());
                for operand in nary.operands() {
                    result |= self.test_cached(operand, dataset)?.as_ref();
                }
                Ok(result)
            }
            Predicate::True | Predicate::False | Predicate::Undefined | Predicate::Parentheses(_) => {
                self.test_cached(predicate, dataset).map(|bits| bits.as_ref().clone())
            }
        }
    }

    fn test_atomic(&self, atomic: &Atomic<T>, items: &[T]) -> BitSet {
        let words: Vec<u64> = self.pool.install(|| {
            items
                .par_chunks(BitSet::BITS_PER_WORD)
                .map(|chunk| {
                    chunk
                        .iter()
                        .enumerate()
                        .filter(|(_, item)| atomic.test(item))
                        .fold(0u64, |word, (bit, _)| word | (1u64 << bit))
                })
                .collect()
        });
        BitSet::from_words(words, items.len())
    }
}
