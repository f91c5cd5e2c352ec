//! End-to-end tests: building, printing, parsing and evaluating predicates.

use predicate_rules::eval::{Dataset, EvalConfig, EvalError, Evaluator};
use predicate_rules::parser::{names_resolver, Lookahead, ParseError, Parser};
use predicate_rules::predicate::Predicate;

/// `n` atomics named `0..n`, atomic `i` matching the `i`-th slice of `0..database`.
fn named_range_predicates(n: usize, database: usize) -> Vec<Predicate<usize>> {
    (0..n)
        .map(|i| {
            Predicate::atomic(i.to_string(), move |x: &usize| {
                database * i / n <= *x && *x < database * (i + 1) / n
            })
        })
        .collect()
}

fn range_database(size: usize) -> Dataset<usize> {
    Dataset::new((0..size).collect())
}

struct Fixture {
    parser: Parser<Box<dyn Fn(&str) -> Option<Predicate<usize>>>>,
}

impl Fixture {
    fn new() -> Self {
        let mut predicates = named_range_predicates(10, 10000);
        predicates.push(Predicate::True);
        predicates.push(Predicate::False);
        Self {
            parser: Parser::new(Box::new(names_resolver(predicates))),
        }
    }

    fn p(&self, text: &str) -> Predicate<usize> {
        self.parser.parse(text).unwrap()
    }
}

// ─── Algebra ─────────────────────────────────────────────────────────────────────

#[test]
fn or_combinations() {
    let f = Fixture::new();
    assert_eq!(f.p("0").or(&f.p("1")).to_string(), "0 OR 1");
    assert_eq!(f.p("0 OR 1").or(&f.p("2")).to_string(), "0 OR 1 OR 2");
    assert_eq!(f.p("1").or(&f.p("0 OR 2")).to_string(), "0 OR 1 OR 2");
    assert_eq!(f.p("0 OR 2").or(&f.p("1 OR 3")).to_string(), "0 OR 1 OR 2 OR 3");
    assert_eq!(f.p("0 OR 1").or(&f.p("2 AND 3")).to_string(), "0 OR 1 OR 2 AND 3");
    assert_eq!(f.p("0 OR 1").or(&f.p("(2)")).to_string(), "0 OR 1 OR 2");
    assert_eq!(Predicate::or_all([f.p("1")]), f.p("1"));
    assert_eq!(Predicate::or_all([f.p("FALSE"), f.p("0")]), f.p("0"));
    assert_eq!(Predicate::or_all([f.p("TRUE"), f.p("0")]), f.p("TRUE"));
}

#[test]
fn and_combinations() {
    let f = Fixture::new();
    assert_eq!(f.p("0").and(&f.p("1")).to_string(), "0 AND 1");
    assert_eq!(f.p("0 AND 1").and(&f.p("2")).to_string(), "0 AND 1 AND 2");
    assert_eq!(f.p("1").and(&f.p("0 AND 2")).to_string(), "0 AND 1 AND 2");
    assert_eq!(f.p("0 AND 2").and(&f.p("1 AND 3")).to_string(), "0 AND 1 AND 2 AND 3");
    assert_eq!(f.p("0 AND 1").and(&f.p("2 OR 3")).to_string(), "(2 OR 3) AND 0 AND 1");
    assert_eq!(f.p("0 OR 1 OR 2").and(&f.p("3")).to_string(), "(0 OR 1 OR 2) AND 3");
    assert_eq!(Predicate::and_all([f.p("1")]), f.p("1"));
    assert_eq!(Predicate::and_all([f.p("TRUE"), f.p("0")]), f.p("0"));
    assert_eq!(Predicate::and_all([f.p("FALSE"), f.p("0")]), f.p("FALSE"));
}

#[test]
fn remove_operands() {
    let f = Fixture::new();
    assert_eq!(f.p("0 OR 1 OR 2").remove(1).unwrap().to_string(), "0 OR 2");
    assert_eq!(f.p("0 OR 1").remove(1).unwrap().name(), "0");
    assert_eq!(f.p("0 AND 1 AND 2").remove(1).unwrap().to_string(), "0 AND 2");
    assert_eq!(f.p("0 AND 1").remove(1).unwrap().to_string(), "0");
}

#[test]
fn negations() {
    let f = Fixture::new();
    assert_eq!(f.p("NOT 0").negate().name(), "0");
    assert_eq!(f.p("(NOT 0)").negate().name(), "0");
    assert_eq!(f.p("NOT (0)").negate().name(), "0");
    assert_eq!(f.p("0 OR 1 OR 2").negate().name(), "NOT (0 OR 1 OR 2)");
    assert_eq!(f.p("0 AND 1 AND 2").negate().name(), "NOT (0 AND 1 AND 2)");
    assert!(!f.p("0").or(&Predicate::Undefined).negate().is_defined());
    assert!(!f.p("0").and(&Predicate::Undefined).negate().is_defined());
    assert_eq!(Predicate::<usize>::Undefined.negate(), Predicate::Undefined);
}

#[test]
fn equality_ignores_construction_order() {
    let p = named_range_predicates(3, 10000);
    assert_eq!(
        Predicate::or_all([p[0].clone(), p[1].clone(), p[2].clone()]),
        Predicate::or_all([p[1].clone(), p[2].clone(), p[0].clone()])
    );
    assert_eq!(
        Predicate::and_all([p[0].clone(), p[1].clone(), p[2].clone()]),
        Predicate::and_all([p[1].clone(), p[0].clone(), p[2].clone()])
    );
    assert_ne!(p[0].or(&p[1]), Predicate::or_all(p.clone()));
    assert_eq!(p[0].negate(), p[0].negate());
    assert_eq!(p[0].clone().parens(), p[0].clone().parens());
}

#[test]
fn complexity() {
    let f = Fixture::new();
    assert_eq!(f.p("0").complexity(), 1);
    assert_eq!(f.p("NOT 0").complexity(), 2);
    assert_eq!(f.p("0 OR 1 OR 2").complexity(), 4);
    assert_eq!(f.p("0 AND 1 AND 2").complexity(), 4);
    assert_eq!(f.p("0 AND 1 OR 2").complexity(), 5);
    assert_eq!(f.p("0 AND (1 OR 2)").complexity(), 5);
    assert!(f.p("NOT 0 AND NOT 1").complexity() > f.p("NOT (0 OR 1)").complexity());
    assert!(f.p("NOT 0 OR NOT 1").complexity() > f.p("NOT (0 AND 1)").complexity());
}

#[test]
fn printed_form_parses_back() {
    let f = Fixture::new();
    let p = named_range_predicates(4, 100);
    let formula = p[3].and(&p[1].or(&p[0])).or(&p[2].negate()).negate();
    let parser = Parser::new(names_resolver(p.clone()));
    assert_eq!(parser.parse(formula.name()).unwrap(), formula);
    // Different atomics with the same names are not equal.
    assert_ne!(f.p(formula.name()), formula);
    assert_eq!(f.p(formula.name()).name(), formula.name());
}

// ─── Parsing ─────────────────────────────────────────────────────────────────────

#[test]
fn parse_unknown_name() {
    let f = Fixture::new();
    assert!(matches!(f.parser.parse("0 AND 42"), Err(ParseError::Unresolved { position: 6, .. })));
}

#[test]
fn parse_names_with_keywords() {
    let a = Predicate::atomic("H3K4me3 AND H3K27ac", |x: &usize| *x < 10);
    let b = Predicate::atomic("H3K4me3", |x: &usize| *x < 5);
    let c = Predicate::atomic("H3K27ac", |x: &usize| *x > 2);
    let resolver = names_resolver(vec![a.clone(), b.clone(), c.clone()]);

    let shortest = Parser::new(&resolver).parse("H3K4me3 AND H3K27ac").unwrap();
    assert_eq!(shortest, b.and(&c));

    let longest = Parser::new(&resolver)
        .with_lookahead(Lookahead::Longest)
        .parse("H3K4me3 AND H3K27ac")
        .unwrap();
    assert_eq!(longest, a);
}

// ─── Evaluation ──────────────────────────────────────────────────────────────────

#[test]
fn end_to_end_scenario() {
    #[derive(Debug)]
    struct Region {
        p1: bool,
        p2: bool,
        p3: bool,
    }

    let atomics = vec![
        Predicate::atomic("p1", |r: &Region| r.p1),
        Predicate::atomic("p2", |r: &Region| r.p2),
        Predicate::atomic("p3", |r: &Region| r.p3),
    ];
    let f = Parser::new(names_resolver(atomics)).parse("p1 AND p2 AND NOT p3").unwrap();

    let x = Region {
        p1: true,
        p2: true,
        p3: false,
    };
    let y = Region {
        p1: false,
        p2: true,
        p3: false,
    };
    assert!(f.test(&x));
    assert!(!f.test(&y));

    let evaluator = Evaluator::new(EvalConfig::default()).unwrap();
    let bits = evaluator.test(&f, &Dataset::new(vec![x, y])).unwrap();
    assert_eq!(bits.iter().collect::<Vec<_>>(), vec![0]);
    assert_eq!(bits.size(), 2);
}

#[test]
fn batch_evaluation_of_candidates() {
    let f = Fixture::new();
    let data = range_database(10000);
    let evaluator = Evaluator::new(EvalConfig::default()).unwrap();

    let zero = evaluator.test(&f.p("0"), &data).unwrap();
    assert_eq!(zero.len(), 1000);
    assert_eq!(zero.iter().next(), Some(0));
    assert_eq!(zero.iter().last(), Some(999));

    let union = evaluator.test(&f.p("0 OR 1 OR 9"), &data).unwrap();
    assert_eq!(union.len(), 3000);

    let disjoint = evaluator.test(&f.p("0 AND 1"), &data).unwrap();
    assert!(disjoint.is_empty());

    let complement = evaluator.test(&f.p("NOT (0 OR 1)"), &data).unwrap();
    assert_eq!(complement.len(), 8000);
    assert!(!complement.contains(1999));
    assert!(complement.contains(2000));

    assert_eq!(evaluator.test(&f.p("TRUE"), &data).unwrap().len(), 10000);
    assert!(evaluator.test(&f.p("FALSE"), &data).unwrap().is_empty());
}

#[test]
fn candidate_generation_filters_undefined() {
    let mut atomics = named_range_predicates(3, 300);
    atomics.push(Predicate::atomic_non_negatable("coding", |x: &usize| x % 3 == 0));
    let data = range_database(300);
    let evaluator = Evaluator::new(EvalConfig::default()).unwrap();

    let mut candidates = Vec::new();
    for a in &atomics {
        for b in &atomics {
            candidates.push(a.and(&b.negate()));
        }
    }
    let defined: Vec<_> = candidates.iter().filter(|c| c.is_defined()).collect();
    assert_eq!(defined.len(), 12);

    for candidate in &candidates {
        let result = evaluator.test(candidate, &data);
        if candidate.is_defined() {
            let bits = result.unwrap();
            let expected = data.items().iter().filter(|x| candidate.test(x)).count();
            assert_eq!(bits.len(), expected, "candidate {}", candidate);
        } else {
            assert!(matches!(result, Err(EvalError::Undefined)));
        }
    }
}
