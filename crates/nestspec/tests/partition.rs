//! Partitioning a list by an ordered set of predicates, declared as nested
//! contexts that each refine the fixture inherited from their parent.

use nestspec::{run, TestTree};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
struct Predicate {
    name: &'static str,
    test: fn(i32) -> bool,
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

fn is_negative(n: i32) -> bool {
    n < 0
}

fn is_zero(n: i32) -> bool {
    n == 0
}

fn is_positive(n: i32) -> bool {
    n > 0
}

fn is_even(n: i32) -> bool {
    n % 2 == 0
}

const IS_NEGATIVE: Predicate = Predicate {
    name: "is_negative",
    test: is_negative,
};
const IS_ZERO: Predicate = Predicate {
    name: "is_zero",
    test: is_zero,
};
const IS_POSITIVE: Predicate = Predicate {
    name: "is_positive",
    test: is_positive,
};

/// One bucket per predicate; each item lands in the first bucket whose
/// predicate accepts it and is dropped if none does.
fn partition(items: &[i32], predicates: &[Predicate]) -> Vec<Vec<i32>> {
    let mut buckets = vec![Vec::new(); predicates.len()];
    for &item in items {
        if let Some(index) = predicates.iter().position(|p| (p.test)(item)) {
            buckets[index].push(item);
        }
    }
    buckets
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Scenario {
    items: Vec<i32>,
    predicates: Vec<Predicate>,
}

fn partition_tree(seen: Arc<Mutex<Vec<Scenario>>>) -> TestTree<Scenario> {
    TestTree::build("partition", move |root| {
        root.fixture(|_| Scenario::default());

        root.test("no items gives no buckets", |s, _| {
            assert!(partition(&s.items, &s.predicates).is_empty());
        });

        root.context("some items", move |ctx| {
            ctx.modify_fixture(|s, _| s.items = vec![-1, 0, 1, 2, 3]);

            ctx.test("no predicates gives no buckets", |s, _| {
                assert!(partition(&s.items, &s.predicates).is_empty());
            });

            ctx.context("everything matches something", move |ctx| {
                ctx.modify_fixture(|s, _| s.predicates = vec![IS_NEGATIVE, IS_ZERO, IS_POSITIVE]);

                ctx.test("splits by sign", move |s, _| {
                    seen.lock().push(s.clone());
                    assert_eq!(
                        partition(&s.items, &s.predicates),
                        vec![vec![-1], vec![0], vec![1, 2, 3]]
                    );
                });
            });

            ctx.context("some items match nothing", |ctx| {
                ctx.modify_fixture(|s, _| s.predicates = vec![IS_ZERO]);

                ctx.test("unmatched items are dropped", |s, _| {
                    assert_eq!(partition(&s.items, &s.predicates), vec![vec![0]]);
                });
            });

            ctx.context("predicates overlap", |ctx| {
                ctx.modify_fixture(|s, _| {
                    s.predicates = vec![
                        Predicate {
                            name: "is_even",
                            test: is_even,
                        },
                        IS_POSITIVE,
                    ];
                });

                ctx.test("the first matching predicate wins", |s, _| {
                    assert_eq!(
                        partition(&s.items, &s.predicates),
                        vec![vec![0, 2], vec![1, 3]]
                    );
                });
            });
        });
    })
    .unwrap()
}

#[test]
fn test_partition_scenario_resolves_expected_fixture() {
    nestspec::init_test_logging();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let tree = partition_tree(seen.clone());

    let results = run(&tree).unwrap();

    assert_eq!(results.len(), 5);
    for result in &results {
        assert!(result.is_passed(), "{} failed: {:?}", result.descriptor, result.outcome);
    }
    assert_eq!(
        *seen.lock(),
        vec![Scenario {
            items: vec![-1, 0, 1, 2, 3],
            predicates: vec![IS_NEGATIVE, IS_ZERO, IS_POSITIVE],
        }]
    );
}

#[test]
fn test_partition_paths_follow_context_names() {
    let tree = partition_tree(Arc::default());
    let paths: Vec<_> = tree
        .plan()
        .iter()
        .map(|case| case.descriptor().to_string())
        .collect();

    assert_eq!(
        paths,
        [
            "partition / no items gives no buckets",
            "partition / some items / no predicates gives no buckets",
            "partition / some items / everything matches something / splits by sign",
            "partition / some items / some items match nothing / unmatched items are dropped",
            "partition / some items / predicates overlap / the first matching predicate wins",
        ]
    );
}
