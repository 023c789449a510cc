use proptest::prelude::*;
use std::collections::BTreeSet;
use strata_path::{PathAllocator, PathScheme, TreePosition};

struct Parent {
    path: String,
    depth: usize,
    numchild: u64,
}

impl TreePosition for Parent {
    fn path(&self) -> &str {
        &self.path
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn numchild(&self) -> u64 {
        self.numchild
    }
}

proptest! {
    #[test]
    fn prop_allocated_paths_are_unique_and_ordered(
        rounds in 1..60usize,
        // ordinals created externally without bumping numchild
        external in proptest::collection::vec(1..80u64, 0..20)
    ) {
        let scheme = PathScheme::default();
        let allocator = PathAllocator::new(scheme.clone());
        let mut parent = Parent { path: "0001".to_string(), depth: 1, numchild: 0 };

        let mut occupied: BTreeSet<String> = external
            .iter()
            .map(|&n| scheme.child_path("0001", 1, n).unwrap().into_string())
            .collect();
        let mut taken: BTreeSet<u64> = external.iter().copied().collect();
        let mut allocated = BTreeSet::new();

        for _ in 0..rounds {
            let path = allocator.allocate_child_path(&parent, &occupied).unwrap();

            prop_assert!(path.as_str() > parent.path.as_str());
            prop_assert!(!occupied.contains(path.as_str()));
            prop_assert!(allocated.insert(path.as_str().to_string()));

            let ordinal = scheme.decode_step(path.last_step()).unwrap();
            let first_free = (parent.numchild + 1..).find(|n| !taken.contains(n)).unwrap();
            prop_assert_eq!(ordinal, first_free);

            // materialize: persist the child and bump numchild
            occupied.insert(path.as_str().to_string());
            taken.insert(ordinal);
            parent.numchild += 1;
        }

        // no sibling ordinal past the realized child count is ever used
        let children = taken.len() as u64;
        let bound = scheme.child_path("0001", 1, children + 1).unwrap();
        for path in &allocated {
            prop_assert!(path.as_str() < bound.as_str());
        }
    }

    #[test]
    fn prop_collision_run_is_skipped(n in 0..500u64, k in 0..40u64) {
        let scheme = PathScheme::default();
        let allocator = PathAllocator::new(scheme.clone());
        let parent = Parent { path: "00020003".to_string(), depth: 2, numchild: n };

        let occupied: BTreeSet<String> = (n + 1..=n + k)
            .map(|ord| scheme.child_path("00020003", 2, ord).unwrap().into_string())
            .collect();

        let path = allocator.allocate_child_path(&parent, &occupied).unwrap();
        let expected = scheme.child_path("00020003", 2, n + k + 1).unwrap();
        prop_assert_eq!(path, expected);
    }
}
