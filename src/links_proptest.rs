//! Property-based tests for link ordering and path normalization.
//!
//! These tests use proptest to generate random destination sets and verify
//! that the projection order does not depend on declaration order.

#[cfg(test)]
mod proptest_tests {
    use crate::links::{creation_order, removal_order, Link};
    use crate::path::{depth, normalize};
    use proptest::prelude::*;
    use std::path::{Path, PathBuf};

    fn destinations() -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set("[a-c]{1,2}(/[a-c]{1,2}){0,3}", 1..12)
            .prop_map(|set| set.into_iter().collect())
    }

    fn links(dsts: &[String]) -> Vec<Link> {
        dsts.iter()
            .map(|d| Link {
                owner: d.clone(),
                source: PathBuf::from("/s").join(d),
                destination: PathBuf::from(d),
            })
            .collect()
    }

    fn order(links: Vec<&Link>) -> Vec<PathBuf> {
        links.into_iter().map(|l| l.destination.clone()).collect()
    }

    // ============================================================================
    // ordering property tests
    // ============================================================================

    proptest! {
        /// Property: a permuted input yields the same creation order
        #[test]
        fn creation_order_ignores_input_order(
            (dsts, shuffled) in destinations().prop_flat_map(|d| {
                let s = Just(d.clone()).prop_shuffle();
                (Just(d), s)
            })
        ) {
            let a = links(&dsts);
            let b = links(&shuffled);
            prop_assert_eq!(order(creation_order(&a)), order(creation_order(&b)));
            prop_assert_eq!(order(removal_order(&a)), order(removal_order(&b)));
        }

        /// Property: every parent is created before anything nested inside it
        #[test]
        fn parents_are_created_before_children(dsts in destinations()) {
            let all = links(&dsts);
            let created = order(creation_order(&all));
            for (i, child) in created.iter().enumerate() {
                for parent in &created[i + 1..] {
                    prop_assert!(
                        !(child.starts_with(parent) && child != parent),
                        "{} created before its parent {}",
                        child.display(),
                        parent.display()
                    );
                }
            }
        }

        /// Property: removal order is the exact reverse of creation order
        #[test]
        fn removal_reverses_creation(dsts in destinations()) {
            let all = links(&dsts);
            let mut created = order(creation_order(&all));
            created.reverse();
            prop_assert_eq!(created, order(removal_order(&all)));
        }

        /// Property: removal order never increases in depth
        #[test]
        fn removal_is_deepest_first(dsts in destinations()) {
            let all = links(&dsts);
            let removed = order(removal_order(&all));
            for pair in removed.windows(2) {
                prop_assert!(depth(&pair[0]) >= depth(&pair[1]));
            }
        }
    }

    // ============================================================================
    // normalize property tests
    // ============================================================================

    proptest! {
        /// Property: normalize is idempotent
        #[test]
        fn normalize_is_idempotent(input in "(\\.{1,2}/|[a-c]{1,3}/){0,6}[a-c]{0,3}") {
            let once = normalize(Path::new(&input));
            let twice = normalize(&once);
            prop_assert_eq!(once, twice);
        }

        /// Property: leading ./ markers never change the result
        #[test]
        fn normalize_ignores_current_dir_prefix(input in "[a-c]{1,3}(/[a-c]{1,3}){0,4}") {
            let prefixed = format!("./{}", input);
            prop_assert_eq!(normalize(Path::new(&prefixed)), normalize(Path::new(&input)));
        }
    }
}
