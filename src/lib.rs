//! # predicate-rules: boolean predicate algebra for rule mining
//!
//! **`predicate-rules`** builds, prints, parses and evaluates boolean formulas over
//! caller-defined *atomic predicates*. It is meant for rule search: a driver combines
//! atomics into thousands of candidate formulas and evaluates each of them against
//! the same large, unchanging dataset.
//!
//! ## Key Features
//!
//! - **Canonical construction**: all composite formulas go through normalizing
//!   constructors that flatten, absorb constants, drop redundant parentheses and
//!   sort operands by name. `a AND b` and `b AND a` are the same value.
//! - **Soft failure**: combining anything with [`Predicate::Undefined`][crate::predicate::Predicate::Undefined]
//!   yields `Undefined`, so candidate generation can filter once instead of checking every step.
//! - **Readable text**: formulas print as `NOT (a OR b) AND c` and parse back, with
//!   atomic names free to contain spaces and punctuation.
//! - **Batch evaluation**: [`Evaluator`][crate::eval::Evaluator] returns a bit set over a
//!   whole dataset, evaluating leaves on a thread pool and caching every sub-formula per dataset.
//!
//! ## Basic Usage
//!
//! ```rust
//! use predicate_rules::eval::{Dataset, EvalConfig, Evaluator};
//! use predicate_rules::parser::{names_resolver, Parser};
//! use predicate_rules::predicate::Predicate;
//!
//! // 1. Define atomic predicates
//! let atomics = vec![
//!     Predicate::atomic("p1", |x: &i32| *x > 0),
//!     Predicate::atomic("p2", |x: &i32| x % 2 == 0),
//!     Predicate::atomic("p3", |x: &i32| *x > 100),
//! ];
//!
//! // 2. Parse a formula
//! let parser = Parser::new(names_resolver(atomics));
//! let f = parser.parse("p1 AND p2 AND NOT p3").unwrap();
//!
//! // 3. Test a single item
//! assert!(f.test(&4));
//!
//! // 4. Test a whole dataset
//! let data = Dataset::new(vec![4, -4]);
//! let evaluator = Evaluator::new(EvalConfig::default()).unwrap();
//! let bits = evaluator.test(&f, &data).unwrap();
//! assert_eq!(bits.iter().collect::<Vec<_>>(), vec![0]);
//! ```
//!
//! ## Core Components
//!
//! - **[`predicate`]**: the expression type, naming, complexity and folds.
//! - **[`ops`]**: normalizing constructors (`and`, `or`, `negate`, `parens`).
//! - **[`parser`]**: the textual grammar.
//! - **[`eval`]**: single-item and batch evaluation.

pub mod bitset;
pub mod cache;
pub mod eval;
pub mod ops;
pub mod parser;
pub mod predicate;
