use super::*;
use crate::localizer::{ComputationStrategy, Localizable};
use proptest::prelude::*;
use std::collections::hash_map::DefaultHasher;

fn key(s: &str) -> String {
    s.to_string()
}

fn build(traces: &[(&str, bool, &[&str])]) -> Spectra<String> {
    let mut spectra = Spectra::new();
    for (id, successful, nodes) in traces {
        let mut trace = spectra.add_trace(*id, *successful).unwrap();
        for node in *nodes {
            trace.set_involvement(key(node), true);
        }
    }
    spectra
}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

// ============================================================================
// Nodes and traces
// ============================================================================

#[test]
fn test_get_or_create_node_is_idempotent() {
    let mut spectra: Spectra<String> = Spectra::new();
    spectra.get_or_create_node(key("a"));
    spectra.get_or_create_node(key("a"));
    assert_eq!(spectra.node_count(), 1);
    assert_eq!(spectra.node(&key("a")).unwrap().identifier(), "a");
    assert!(spectra.node(&key("b")).is_none());
}

#[test]
fn test_involvement_registers_nodes() {
    let spectra = build(&[("t1", true, &["x", "y"])]);
    assert!(spectra.has_node(&key("x")));
    assert!(spectra.has_node(&key("y")));
    let ids: Vec<&String> = spectra.nodes().map(Node::identifier).collect();
    assert_eq!(ids, vec!["x", "y"]);
}

#[test]
fn test_hit_counts() {
    let mut spectra: Spectra<String> = Spectra::new();
    spectra
        .add_trace("t", false)
        .unwrap()
        .set_hits(key("a"), 7)
        .set_involvement(key("b"), true);

    let trace = spectra.trace("t").unwrap();
    assert_eq!(trace.hits(&key("a")), 7);
    assert_eq!(trace.hits(&key("b")), 1);
    assert_eq!(trace.hits(&key("c")), 0);
    assert_eq!(trace.involvement_count(), 2);

    spectra
        .trace_mut("t")
        .unwrap()
        .set_involvement(key("a"), false)
        .set_hits(key("b"), 0);
    let trace = spectra.trace("t").unwrap();
    assert!(!trace.is_involved(&key("a")));
    assert!(!trace.is_involved(&key("b")));
    assert_eq!(spectra.node_count(), 2);
}

#[test]
fn test_duplicate_trace_rejected_without_side_effects() {
    let mut spectra = build(&[("t1", true, &["a"])]);
    let version = spectra.version();

    let err = spectra.add_trace("t1", false).map(|_| ()).unwrap_err();
    assert_eq!(err, SpectraError::DuplicateTrace(key("t1")));
    assert_eq!(spectra.version(), version);
    assert_eq!(spectra.trace_count(), 1);
    let trace = spectra.trace("t1").unwrap();
    assert!(trace.is_successful());
    assert!(trace.is_involved(&key("a")));
}

#[test]
fn test_trace_queries() {
    let mut spectra = build(&[
        ("f1", false, &["a"]),
        ("p1", true, &["a", "b"]),
        ("p2", true, &[]),
    ]);
    assert_eq!(spectra.trace_count(), 3);
    assert_eq!(spectra.failing_trace_count(), 1);
    assert_eq!(spectra.failing_traces()[0].id(), "f1");
    let passing: Vec<&str> = spectra.successful_traces().iter().map(|t| t.id()).collect();
    assert_eq!(passing, vec!["p1", "p2"]);
    assert!(spectra.trace("missing").is_none());
    assert!(spectra.trace_mut("missing").is_none());
    assert_eq!(spectra.involved_nodes("p1"), vec![key("a"), key("b")]);
    assert!(spectra.involved_nodes("missing").is_empty());
    assert!(!spectra.is_involved("missing", &key("a")));
}

#[test]
fn test_remove_node_clears_involvement() {
    let mut spectra = build(&[("t1", false, &["a", "b"]), ("t2", true, &["a"])]);
    let before = spectra.version();

    assert!(spectra.remove_node(&key("a")));
    assert!(!spectra.has_node(&key("a")));
    assert!(!spectra.trace("t1").unwrap().is_involved(&key("a")));
    assert!(!spectra.trace("t2").unwrap().is_involved(&key("a")));
    assert!(spectra.version() > before);

    let before = spectra.version();
    assert!(!spectra.remove_node(&key("a")));
    assert!(spectra.version() > before);
}

// ============================================================================
// Equality
// ============================================================================

#[test]
fn test_equality_ignores_insertion_order() {
    let a = build(&[("t1", true, &["x", "y"]), ("t2", false, &["y"])]);
    let b = build(&[("t2", false, &["y"]), ("t1", true, &["y", "x"])]);
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
}

#[test]
fn test_equality_compares_outcomes_and_hits() {
    let a = build(&[("t1", true, &["x"])]);
    let b = build(&[("t1", false, &["x"])]);
    assert_ne!(a, b);

    let mut c = build(&[("t1", true, &[])]);
    c.trace_mut("t1").unwrap().set_hits(key("x"), 3);
    assert_ne!(a, c);

    let mut d = build(&[("t1", true, &["x"])]);
    d.get_or_create_node(key("unused"));
    assert_ne!(a, d);
}

#[test]
fn test_clone_is_equal_and_independent() {
    let original = build(&[("t1", false, &["x"])]);
    let mut copy = original.clone();
    assert_eq!(copy, original);

    copy.add_trace("t2", true).unwrap();
    assert_ne!(copy, original);
    assert_eq!(original.trace_count(), 1);
}

// ============================================================================
// Similarity
// ============================================================================

#[test]
fn test_similarity_scores() {
    let spectra = build(&[
        ("f1", false, &["a", "b"]),
        ("f2", false, &[]),
        ("p1", true, &["a"]),
        ("p2", true, &["c"]),
    ]);

    assert_eq!(spectra.similarity("f1", "f1").unwrap(), 1.0);
    assert_eq!(spectra.similarity("f1", "p1").unwrap(), 0.5);
    assert_eq!(spectra.similarity("f1", "p2").unwrap(), 0.0);

    let empty = spectra.similarity_map("f2").unwrap();
    assert_eq!(empty.len(), 4);
    assert!(empty.values().all(|&s| s == 0.0));
}

#[test]
fn test_similarity_errors() {
    let spectra = build(&[("f1", false, &["a"]), ("p1", true, &["a"])]);

    assert_eq!(
        spectra.similarity_map("p1"),
        Err(SpectraError::NotAFailingTrace(key("p1")))
    );
    assert_eq!(
        spectra.similarity_map("nope"),
        Err(SpectraError::UnknownTrace(key("nope")))
    );
    assert_eq!(
        spectra.similarity("f1", "nope"),
        Err(SpectraError::UnknownTrace(key("nope")))
    );
}

#[test]
fn test_similarity_follows_mutations() {
    let mut spectra = build(&[("f1", false, &["a", "b"]), ("p1", true, &["a"])]);
    assert_eq!(spectra.similarity("f1", "p1").unwrap(), 0.5);

    spectra.trace_mut("p1").unwrap().set_involvement(key("b"), true);
    assert_eq!(spectra.similarity("f1", "p1").unwrap(), 1.0);

    spectra.add_trace("p2", true).unwrap().set_involvement(key("a"), true);
    assert_eq!(spectra.similarity("f1", "p2").unwrap(), 0.5);
}

// ============================================================================
// Derived counts stay fresh
// ============================================================================

#[test]
fn test_counts_follow_mutations_without_manual_invalidation() {
    let mut spectra = build(&[("f1", false, &["a"]), ("p1", true, &[])]);
    let counts = spectra.counts(&key("a"), ComputationStrategy::Standard).unwrap();
    assert_eq!((counts.ef, counts.np), (1.0, 1.0));

    spectra.trace_mut("p1").unwrap().set_involvement(key("a"), true);
    let counts = spectra.counts(&key("a"), ComputationStrategy::Standard).unwrap();
    assert_eq!((counts.ep, counts.np), (1.0, 0.0));

    spectra.add_trace("f2", false).unwrap();
    assert_eq!(spectra.nf(&key("a"), ComputationStrategy::Standard).unwrap(), 1.0);
}

#[test]
fn test_explicit_invalidation() {
    let mut spectra = build(&[("f1", false, &["a"])]);
    let before = spectra.version();
    assert_eq!(spectra.ef(&key("a"), ComputationStrategy::Standard).unwrap(), 1.0);

    spectra.invalidate_cached_values();
    assert!(spectra.version() > before);
    assert_eq!(spectra.ef(&key("a"), ComputationStrategy::Standard).unwrap(), 1.0);
}

#[test]
fn test_shared_spectra_source() {
    let shared = Rc::new(RefCell::new(build(&[("f1", false, &["a"])])));
    assert!(shared.is_involved("f1", &key("a")));
    let version = SpectraSource::<String>::version(&shared);

    shared
        .borrow_mut()
        .add_trace("p1", true)
        .unwrap()
        .set_involvement(key("b"), true);
    assert!(SpectraSource::<String>::version(&shared) > version);
    assert_eq!(shared.node_ids(), vec![key("a"), key("b")]);
    assert_eq!(SpectraSource::<String>::outcomes(&shared).len(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_counts_sum_to_trace_count(
        traces in prop::collection::vec(
            (any::<bool>(), prop::collection::btree_set(0usize..6, 0..6)),
            0..10,
        ),
    ) {
        let mut spectra: Spectra<usize> = Spectra::new();
        for node in 0..6 {
            spectra.get_or_create_node(node);
        }
        for (i, (successful, nodes)) in traces.iter().enumerate() {
            let mut trace = spectra.add_trace(format!("t{i}"), *successful).unwrap();
            for node in nodes {
                trace.set_involvement(*node, true);
            }
        }

        let total = traces.len() as f64;
        let failing = traces.iter().filter(|(ok, _)| !ok).count() as f64;
        for node in 0..6 {
            let c = spectra.counts(&node, ComputationStrategy::Standard).unwrap();
            prop_assert_eq!(c.total(), total);
            prop_assert_eq!(c.ef + c.nf, failing);
        }
    }

    #[test]
    fn prop_similarity_in_unit_interval(
        traces in prop::collection::vec(
            (any::<bool>(), prop::collection::btree_set(0usize..5, 0..5)),
            1..8,
        ),
    ) {
        let mut spectra: Spectra<usize> = Spectra::new();
        for (i, (successful, nodes)) in traces.iter().enumerate() {
            let mut trace = spectra.add_trace(format!("t{i}"), *successful).unwrap();
            for node in nodes {
                trace.set_involvement(*node, true);
            }
        }

        for failing in spectra.failing_traces() {
            let map = spectra.similarity_map(failing.id()).unwrap();
            prop_assert_eq!(map.len(), traces.len());
            for score in map.values() {
                prop_assert!((0.0..=1.0).contains(score));
            }
            if failing.involvement_count() > 0 {
                prop_assert_eq!(map[failing.id()], 1.0);
            }
        }
    }
}
