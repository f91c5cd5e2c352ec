//! Normalizing constructors.
//!
//! These are the only functions that materialize composite predicates. Every
//! result satisfies the following, all at once:
//!
//! - **Definedness**: an undefined operand turns the whole result into
//!   [`Predicate::Undefined`].
//! - **Flattening**: nested `AND` inside `AND` (and `OR` inside `OR`) are merged into
//!   one operand list. An `OR` operand of an `AND` is wrapped in parentheses,
//!   parentheses around anything else are dropped.
//! - **Absorption**: `TRUE` is dropped from `AND`, `FALSE` from `OR`; `FALSE` in an
//!   `AND` (`TRUE` in an `OR`) collapses the whole node.
//! - **Degeneration**: a single surviving operand is returned as is.
//! - **Canonical order**: operands are sorted by printed name, ties broken by
//!   atomic identity.
//!
//! Negation never distributes over `AND`/`OR`: `NOT (a AND b)` stays a single
//! wrapper around the original node.

use std::ops::{BitAnd, BitOr, Not};

use log::debug;

use crate::parser::Keyword;
use crate::predicate::{Layer, Nary, Predicate, Unary};

impl<T> Predicate<T> {
    /// Conjunction of all `operands`.
    ///
    /// # Panics
    ///
    /// Panics if `operands` is empty.
    pub fn and_all(operands: impl IntoIterator<Item = Predicate<T>>) -> Self {
        let operands: Vec<_> = operands.into_iter().collect();
        assert!(!operands.is_empty(), "AND requires at least one operand");

        if operands.iter().any(|p| !p.is_defined()) {
            debug!("and: undefined operand");
            return Predicate::Undefined;
        }

        let mut flat = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                Predicate::And(nary) => flat.extend(nary.operands().iter().cloned()),
                Predicate::Or(_) => flat.push(operand.parens()),
                Predicate::Parentheses(unary) => match unary.operand().clone() {
                    Predicate::And(nary) => flat.extend(nary.operands().iter().cloned()),
                    inner => flat.push(inner.parens()),
                },
                Predicate::True => {}
                _ => flat.push(operand),
            }
        }

        if flat.iter().any(|p| matches!(p, Predicate::False)) {
            debug!("and: FALSE absorbs {} operands", flat.len());
            return Predicate::False;
        }

        materialize(Keyword::And, flat, Predicate::True)
    }

    /// Disjunction of all `operands`.
    ///
    /// # Panics
    ///
    /// Panics if `operands` is empty.
    pub fn or_all(operands: impl IntoIterator<Item = Predicate<T>>) -> Self {
        let operands: Vec<_> = operands.into_iter().collect();
        assert!(!operands.is_empty(), "OR requires at least one operand");

        if operands.iter().any(|p| !p.is_defined()) {
            debug!("or: undefined operand");
            return Predicate::Undefined;
        }

        let mut flat = Vec::with_capacity(operands.len());
        for operand in operands {
            let operand = match operand {
                Predicate::Parentheses(unary) => unary.operand().clone(),
                _ => operand,
            };
            match operand {
                Predicate::Or(nary) => flat.extend(nary.operands().iter().cloned()),
                Predicate::False => {}
                _ => flat.push(operand),
            }
        }

        if flat.iter().any(|p| matches!(p, Predicate::True)) {
            debug!("or: TRUE absorbs {} operands", flat.len());
            return Predicate::True;
        }

        materialize(Keyword::Or, flat, Predicate::False)
    }

    pub fn and(&self, other: &Self) -> Self {
        Self::and_all([self.clone(), other.clone()])
    }

    pub fn or(&self, other: &Self) -> Self {
        Self::or_all([self.clone(), other.clone()])
    }

    /// Logical negation.
    ///
    /// - `NOT NOT p` is `p`, with grouping parentheses dropped.
    /// - `TRUE` and `FALSE` swap.
    /// - `AND`/`OR` become `NOT (...)`.
    /// - Anything that cannot be negated becomes [`Predicate::Undefined`].
    pub fn negate(&self) -> Self {
        if !self.can_negate() {
            debug!("negate: {} cannot be negated", self);
            return Predicate::Undefined;
        }
        match self {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Undefined => Predicate::Undefined,
            Predicate::Not(unary) => match unary.operand() {
                Predicate::Parentheses(inner) => inner.operand().clone(),
                operand => operand.clone(),
            },
            Predicate::Parentheses(unary) => unary.operand().negate().parens(),
            Predicate::And(_) | Predicate::Or(_) => Predicate::Not(Unary::negation(self.clone().parens())),
            Predicate::Atomic(_) => Predicate::Not(Unary::negation(self.clone())),
        }
    }

    /// Explicit grouping. Only `AND`/`OR` nodes get wrapped, everything else is
    /// returned unchanged.
    pub fn parens(self) -> Self {
        match self {
            Predicate::And(_) | Predicate::Or(_) => Predicate::Parentheses(Unary::grouping(self)),
            _ => self,
        }
    }

    /// Drops the operand at `index` from an `AND`/`OR` and re-normalizes the rest.
    ///
    /// Returns `None` for non-composite predicates and out-of-range indices.
    pub fn remove(&self, index: usize) -> Option<Self> {
        match self {
            Predicate::And(nary) | Predicate::Or(nary) if index < nary.len() => {
                let mut operands = nary.operands().to_vec();
                operands.remove(index);
                Some(match self {
                    Predicate::And(_) => Self::and_all(operands),
                    _ => Self::or_all(operands),
                })
            }
            _ => None,
        }
    }
}

fn materialize<T>(connective: Keyword, mut operands: Vec<Predicate<T>>, neutral: Predicate<T>) -> Predicate<T> {
    match operands.len() {
        0 => {
            debug!("{}: all operands neutral", connective);
            neutral
        }
        1 => {
            debug!("{}: degenerates to single operand", connective);
            operands.pop().unwrap_or(neutral)
        }
        _ => {
            operands.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| atomic_ids(a).cmp(&atomic_ids(b))));
            let nary = Nary::new(connective, operands);
            match connective {
                Keyword::And => Predicate::And(nary),
                _ => Predicate::Or(nary),
            }
        }
    }
}

/// Identities of the atomic leaves in print order. Breaks ties between distinct
/// operands that print the same.
fn atomic_ids<T>(predicate: &Predicate<T>) -> Vec<usize> {
    predicate.fold(&mut |layer| match layer {
        Layer::Atomic(atomic) => vec![atomic.id()],
        Layer::Not(ids) | Layer::Parentheses(ids) => ids,
        Layer::And(ids) | Layer::Or(ids) => ids.into_iter().flatten().collect(),
        Layer::True | Layer::False | Layer::Undefined => Vec::new(),
    })
}

impl<T> BitAnd for Predicate<T> {
    type Output = Predicate<T>;

    fn bitand(self, rhs: Self) -> Self::Output {
        Predicate::and_all([self, rhs])
    }
}

impl<T> BitAnd for &Predicate<T> {
    type Output = Predicate<T>;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl<T> BitOr for Predicate<T> {
    type Output = Predicate<T>;

    fn bitor(self, rhs: Self) -> Self::Output {
        Predicate::or_all([self, rhs])
    }
}

impl<T> BitOr for &Predicate<T> {
    type Output = Predicate<T>;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl<T> Not for Predicate<T> {
    type Output = Predicate<T>;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

impl<T> Not for &Predicate<T> {
    type Output = Predicate<T>;

    fn not(self) -> Self::Output {
        self.negate()
    }
}
