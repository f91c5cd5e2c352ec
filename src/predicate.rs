//! Predicate expression trees.
//!
//! A [`Predicate`] is an immutable boolean expression over items of type `T`.
//! Leaves are the constants `TRUE`/`FALSE`, the [`Undefined`][Predicate::Undefined]
//! sentinel, and caller-supplied [`Atomic`] tests. Composite nodes (`NOT`, `AND`, `OR`
//! and explicit parentheses) can only be obtained through the normalizing
//! constructors in [`ops`][crate::ops], so every composite in existence is already
//! flattened, absorbed and sorted.
//!
//! Each node carries its printed name, computed once at construction. Names drive
//! the canonical operand order and make hashing cheap.

use std::collections::HashSet;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::parser::Keyword;

/// Boolean test over a single item.
pub type TestFn<T> = dyn Fn(&T) -> bool + Send + Sync;

/// Opaque, named test supplied by the caller.
pub struct Atomic<T> {
    name: Arc<str>,
    test: Arc<TestFn<T>>,
    negatable: bool,
}

impl<T> Atomic<T> {
    pub fn new(name: impl Into<String>, test: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: Arc::from(name.into()),
            test: Arc::new(test),
            negatable: true,
        }
    }

    /// Atomic test that refuses negation: negating it (or anything built from it)
    /// yields [`Predicate::Undefined`].
    pub fn non_negatable(name: impl Into<String>, test: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            negatable: false,
            ..Self::new(name, test)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn can_negate(&self) -> bool {
        self.negatable
    }

    #[inline]
    pub fn test(&self, item: &T) -> bool {
        (self.test)(item)
    }

    /// Address of the shared test function, which identifies the atomic among
    /// same-named ones.
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.test) as *const () as usize
    }
}

impl<T> Clone for Atomic<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            test: Arc::clone(&self.test),
            negatable: self.negatable,
        }
    }
}

// Two atomics are the same only if they share the test function.
impl<T> PartialEq for Atomic<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.test, &other.test) && self.negatable == other.negatable
    }
}

impl<T> Eq for Atomic<T> {}

impl<T> Hash for Atomic<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl<T> Debug for Atomic<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atomic")
            .field("name", &self.name)
            .field("negatable", &self.negatable)
            .finish()
    }
}

/// Single-operand composite payload (`NOT` and parentheses).
pub struct Unary<T> {
    operand: Arc<Predicate<T>>,
    name: Arc<str>,
}

impl<T> Unary<T> {
    pub(crate) fn negation(operand: Predicate<T>) -> Self {
        let name = format!("{} {}", Keyword::Not, operand.name());
        Self {
            operand: Arc::new(operand),
            name: Arc::from(name),
        }
    }

    pub(crate) fn grouping(operand: Predicate<T>) -> Self {
        let name = format!("{}{}{}", Keyword::LeftParen, operand.name(), Keyword::RightParen);
        Self {
            operand: Arc::new(operand),
            name: Arc::from(name),
        }
    }

    pub fn operand(&self) -> &Predicate<T> {
        &self.operand
    }
}

impl<T> Clone for Unary<T> {
    fn clone(&self) -> Self {
        Self {
            operand: Arc::clone(&self.operand),
            name: Arc::clone(&self.name),
        }
    }
}

/// Multi-operand composite payload (`AND` and `OR`).
///
/// Invariant: at least two operands, sorted by name, none of them undefined.
pub struct Nary<T> {
    operands: Arc<[Predicate<T>]>,
    name: Arc<str>,
}

impl<T> Nary<T> {
    pub(crate) fn new(connective: Keyword, operands: Vec<Predicate<T>>) -> Self {
        debug_assert!(operands.len() >= 2);
        let separator = format!(" {} ", connective);
        let name = operands.iter().map(|p| p.name()).collect::<Vec<_>>().join(&separator);
        Self {
            operands: Arc::from(operands),
            name: Arc::from(name),
        }
    }

    pub fn operands(&self) -> &[Predicate<T>] {
        &self.operands
    }

    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }
}

impl<T> Clone for Nary<T> {
    fn clone(&self) -> Self {
        Self {
            operands: Arc::clone(&self.operands),
            name: Arc::clone(&self.name),
        }
    }
}

/// Boolean predicate over items of type `T`.
///
/// `True`, `False` and `Undefined` are plain constants. The payloads of the
/// composite variants have no public constructors: use [`Predicate::and`],
/// [`Predicate::or`], [`Predicate::negate`] and friends.
pub enum Predicate<T> {
    True,
    False,
    /// Result cannot be determined. Infects every composite built from it.
    Undefined,
    Atomic(Atomic<T>),
    Not(Unary<T>),
    And(Nary<T>),
    Or(Nary<T>),
    /// Explicit grouping, only ever kept around `AND`/`OR`.
    Parentheses(Unary<T>),
}

impl<T> Predicate<T> {
    pub fn atomic(name: impl Into<String>, test: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Predicate::Atomic(Atomic::new(name, test))
    }

    pub fn atomic_non_negatable(name: impl Into<String>, test: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Predicate::Atomic(Atomic::non_negatable(name, test))
    }

    /// Canonical printed form.
    pub fn name(&self) -> &str {
        match self {
            Predicate::True => Keyword::True.as_str(),
            Predicate::False => Keyword::False.as_str(),
            Predicate::Undefined => "Undefined",
            Predicate::Atomic(atomic) => atomic.name(),
            Predicate::Not(unary) | Predicate::Parentheses(unary) => &unary.name,
            Predicate::And(nary) | Predicate::Or(nary) => &nary.name,
        }
    }

    /// Every predicate except the [`Undefined`][Predicate::Undefined] sentinel is
    /// defined: composites are never materialized from undefined operands.
    pub fn is_defined(&self) -> bool {
        !matches!(self, Predicate::Undefined)
    }

    pub fn can_negate(&self) -> bool {
        match self {
            Predicate::True | Predicate::False => true,
            Predicate::Undefined => false,
            Predicate::Atomic(atomic) => atomic.can_negate(),
            Predicate::Not(unary) | Predicate::Parentheses(unary) => unary.operand().can_negate(),
            Predicate::And(nary) | Predicate::Or(nary) => nary.operands().iter().all(|p| p.can_negate()),
        }
    }

    /// Operands of an `AND`/`OR` node, `None` for anything else.
    pub fn operands(&self) -> Option<&[Predicate<T>]> {
        match self {
            Predicate::And(nary) | Predicate::Or(nary) => Some(nary.operands()),
            _ => None,
        }
    }

    /// Number of atomics plus the number of `NOT`, `AND` and `OR` nodes.
    pub fn complexity(&self) -> usize {
        self.fold(&mut |layer| match layer {
            Layer::True | Layer::False | Layer::Undefined | Layer::Atomic(_) => 1,
            Layer::Not(c) => 1 + c,
            Layer::Parentheses(c) => c,
            Layer::And(cs) | Layer::Or(cs) => 1 + cs.into_iter().sum::<usize>(),
        })
    }

    /// All distinct atomic leaves of the expression.
    pub fn collect_atomics(&self) -> HashSet<Predicate<T>> {
        let mut atomics = HashSet::new();
        self.fold(&mut |layer| {
            if let Layer::Atomic(atomic) = layer {
                atomics.insert(Predicate::Atomic(atomic.clone()));
            }
        });
        atomics
    }

    /// Bottom-up structural fold: `collapse` sees each node with its children
    /// already replaced by their results.
    pub fn fold<'a, R, F>(&'a self, collapse: &mut F) -> R
    where
        F: FnMut(Layer<'a, T, R>) -> R,
    {
        let layer = match self {
            Predicate::True => Layer::True,
            Predicate::False => Layer::False,
            Predicate::Undefined => Layer::Undefined,
            Predicate::Atomic(atomic) => Layer::Atomic(atomic),
            Predicate::Not(unary) => Layer::Not(unary.operand().fold(collapse)),
            Predicate::Parentheses(unary) => Layer::Parentheses(unary.operand().fold(collapse)),
            Predicate::And(nary) => Layer::And(nary.operands().iter().map(|p| p.fold(collapse)).collect()),
            Predicate::Or(nary) => Layer::Or(nary.operands().iter().map(|p| p.fold(collapse)).collect()),
        };
        collapse(layer)
    }

    fn kind(&self) -> &'static str {
        match self {
            Predicate::True => "True",
            Predicate::False => "False",
            Predicate::Undefined => "Undefined",
            Predicate::Atomic(_) => "Atomic",
            Predicate::Not(_) => "Not",
            Predicate::And(_) => "And",
            Predicate::Or(_) => "Or",
            Predicate::Parentheses(_) => "Parentheses",
        }
    }
}

/// One level of a [`Predicate`] with children replaced by `R`.
#[derive(Debug)]
pub enum Layer<'a, T, R> {
    True,
    False,
    Undefined,
    Atomic(&'a Atomic<T>),
    Not(R),
    And(Vec<R>),
    Or(Vec<R>),
    Parentheses(R),
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        match self {
            Predicate::True => Predicate::True,
            Predicate::False => Predicate::False,
            Predicate::Undefined => Predicate::Undefined,
            Predicate::Atomic(atomic) => Predicate::Atomic(atomic.clone()),
            Predicate::Not(unary) => Predicate::Not(unary.clone()),
            Predicate::And(nary) => Predicate::And(nary.clone()),
            Predicate::Or(nary) => Predicate::Or(nary.clone()),
            Predicate::Parentheses(unary) => Predicate::Parentheses(unary.clone()),
        }
    }
}

impl<T> PartialEq for Predicate<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.name() != other.name() {
            return false;
        }
        match (self, other) {
            (Predicate::True, Predicate::True) => true,
            (Predicate::False, Predicate::False) => true,
            (Predicate::Undefined, Predicate::Undefined) => true,
            (Predicate::Atomic(a), Predicate::Atomic(b)) => a == b,
            (Predicate::Not(a), Predicate::Not(b)) | (Predicate::Parentheses(a), Predicate::Parentheses(b)) => {
                Arc::ptr_eq(&a.operand, &b.operand) || a.operand == b.operand
            }
            (Predicate::And(a), Predicate::And(b)) | (Predicate::Or(a), Predicate::Or(b)) => {
                Arc::ptr_eq(&a.operands, &b.operands) || a.operands == b.operands
            }
            _ => false,
        }
    }
}

impl<T> Eq for Predicate<T> {}

impl<T> Hash for Predicate<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl<T> Display for Predicate<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl<T> Debug for Predicate<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple(self.kind()).field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn range(i: i32) -> Predicate<i32> {
        Predicate::atomic(i.to_string(), move |x: &i32| *x == i)
    }

    #[test]
    fn test_constant_names() {
        assert_eq!(Predicate::<i32>::True.name(), "TRUE");
        assert_eq!(Predicate::<i32>::False.name(), "FALSE");
        assert_eq!(Predicate::<i32>::Undefined.name(), "Undefined");
        assert_eq!(Predicate::<i32>::True.to_string(), "TRUE");
    }

    #[test]
    fn test_constants_equal() {
        assert_eq!(Predicate::<i32>::True, Predicate::True);
        assert_eq!(Predicate::<i32>::False, Predicate::False);
        assert_eq!(Predicate::<i32>::Undefined, Predicate::Undefined);
        assert_ne!(Predicate::<i32>::True, Predicate::False);
    }

    #[test]
    fn test_atomic_identity() {
        let a = range(0);
        let b = range(0);
        assert_eq!(a, a.clone());
        // Same name, different test function.
        assert_ne!(a, b);
    }

    #[test]
    fn test_definedness() {
        assert!(range(0).is_defined());
        assert!(Predicate::<i32>::True.is_defined());
        assert!(!Predicate::<i32>::Undefined.is_defined());
        assert!(!Predicate::<i32>::Undefined.can_negate());
    }

    #[test]
    fn test_non_negatable_atomic() {
        let p = Predicate::atomic_non_negatable("coding", |x: &i32| *x > 0);
        assert!(p.is_defined());
        assert!(!p.can_negate());
        let q = p.and(&range(1));
        assert!(!q.can_negate());
    }

    #[test]
    fn test_complexity_leaves() {
        assert_eq!(range(0).complexity(), 1);
        assert_eq!(Predicate::<i32>::True.complexity(), 1);
    }

    #[test]
    fn test_collect_atomics() {
        let p: Vec<_> = (0..4).map(range).collect();
        let f = Predicate::or_all(vec![p[0].negate(), Predicate::and_all(vec![p[1].clone(), p[2].clone()])]).parens();
        let atomics = f.collect_atomics();
        assert_eq!(atomics.len(), 3);
        assert!(atomics.contains(&p[0]));
        assert!(atomics.contains(&p[1]));
        assert!(atomics.contains(&p[2]));
        assert!(!atomics.contains(&p[3]));
    }

    #[test]
    fn test_fold_depth() {
        let p: Vec<_> = (0..3).map(range).collect();
        let f = p[0].and(&p[1].or(&p[2]));
        let depth = f.fold(&mut |layer: Layer<'_, i32, usize>| match layer {
            Layer::Not(d) | Layer::Parentheses(d) => d + 1,
            Layer::And(ds) | Layer::Or(ds) => 1 + ds.into_iter().max().unwrap_or(0),
            _ => 0,
        });
        // AND -> () -> OR -> leaf
        assert_eq!(depth, 3);
    }

    #[test]
    fn test_debug_shows_kind_and_name() {
        let f = range(0).and(&range(1));
        assert_eq!(format!("{:?}", f), "And(\"0 AND 1\")");
    }
}
