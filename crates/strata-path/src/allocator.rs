//! Lock-free child path allocation
//!
//! Provides [`PathAllocator`], which finds a free child path under a parent
//! by encoding a candidate and probing the tree for it.

use crate::path::{MaterializedPath, PathError};
use crate::scheme::PathScheme;
use std::collections::{BTreeSet, HashSet};

/// Read access to a node's position in the tree
pub trait TreePosition {
    /// Raw materialized path
    fn path(&self) -> &str;

    /// Depth of the node (root depth is 1)
    fn depth(&self) -> usize;

    /// Number of children materialized so far
    fn numchild(&self) -> u64;
}

/// Occupancy lookup by exact path
///
/// Implemented by whatever holds the persisted tree. The error type must
/// absorb [`PathError`] so allocation failures and lookup failures travel
/// through one channel.
pub trait PathIndex {
    /// Error raised by lookups
    type Error: From<PathError>;

    /// Check whether a node already lives at `path`
    ///
    /// # Errors
    /// Returns error if the lookup itself fails
    fn is_occupied(&self, path: &MaterializedPath) -> Result<bool, Self::Error>;
}

impl PathIndex for BTreeSet<String> {
    type Error = PathError;

    fn is_occupied(&self, path: &MaterializedPath) -> Result<bool, PathError> {
        Ok(self.contains(path.as_str()))
    }
}

impl PathIndex for HashSet<String> {
    type Error = PathError;

    fn is_occupied(&self, path: &MaterializedPath) -> Result<bool, PathError> {
        Ok(self.contains(path.as_str()))
    }
}

/// Optimistic allocator for child paths
///
/// Starting at ordinal `numchild + 1`, candidates are encoded and probed
/// until one is free. Siblings created behind the back of a stale parent
/// handle are skipped rather than collided with. The allocator never writes:
/// bumping the parent's `numchild` belongs to whoever persists the child.
#[derive(Debug, Clone, Default)]
pub struct PathAllocator {
    scheme: PathScheme,
    max_probes: Option<u64>,
}

impl PathAllocator {
    /// Create allocator for a scheme with unbounded probing
    #[inline]
    #[must_use]
    pub fn new(scheme: PathScheme) -> Self {
        Self {
            scheme,
            max_probes: None,
        }
    }

    /// Bound the number of probes per allocation
    #[inline]
    #[must_use]
    pub fn with_max_probes(mut self, max_probes: Option<u64>) -> Self {
        self.max_probes = max_probes;
        self
    }

    /// Scheme used for encoding
    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &PathScheme {
        &self.scheme
    }

    /// Probe bound, if any
    #[inline]
    #[must_use]
    pub fn max_probes(&self) -> Option<u64> {
        self.max_probes
    }

    /// Find a free path for a new child of `parent`
    ///
    /// The returned path is distinct from every path `index` reports as
    /// occupied, sorts after the parent's existing children, and is
    /// well-formed for the scheme.
    ///
    /// # Errors
    /// - [`PathError::Overflow`] when the next ordinal no longer fits a step
    /// - [`PathError::ProbeLimitExceeded`] when a probe bound is set and hit
    /// - any error raised by `index`
    pub fn allocate_child_path<P, I>(
        &self,
        parent: &P,
        index: &I,
    ) -> Result<MaterializedPath, I::Error>
    where
        P: TreePosition + ?Sized,
        I: PathIndex + ?Sized,
    {
        let mut offset: u64 = 1;

        loop {
            if let Some(limit) = self.max_probes {
                if offset > limit {
                    return Err(PathError::ProbeLimitExceeded {
                        parent: parent.path().to_string(),
                        attempts: limit,
                    }
                    .into());
                }
            }

            let ordinal = parent
                .numchild()
                .checked_add(offset)
                .ok_or(PathError::Overflow {
                    ordinal: u64::MAX,
                    max: self.scheme.max_ordinal(),
                })?;
            let candidate = self
                .scheme
                .child_path(parent.path(), parent.depth(), ordinal)?;

            tracing::trace!(path = %candidate, ordinal, "probing child path");

            if !index.is_occupied(&candidate)? {
                return Ok(candidate);
            }

            tracing::debug!(path = %candidate, "child path taken, probing next ordinal");
            offset += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn parent(path: &str, numchild: u64) -> Parent {
        Parent {
            path: path.to_string(),
            depth: path.len() / 4,
            numchild,
        }
    }

    #[test]
    fn first_child_of_empty_parent() {
        let allocator = PathAllocator::default();
        let occupied = BTreeSet::new();
        let path = allocator
            .allocate_child_path(&parent("0001", 0), &occupied)
            .unwrap();
        assert_eq!(path.as_str(), "00010001");
    }

    #[test]
    fn next_child_follows_numchild() {
        let allocator = PathAllocator::default();
        let occupied: BTreeSet<String> = ["00010001", "00010002"]
            .into_iter()
            .map(String::from)
            .collect();
        let path = allocator
            .allocate_child_path(&parent("0001", 2), &occupied)
            .unwrap();
        assert_eq!(path.as_str(), "00010003");
    }

    #[test]
    fn skips_siblings_created_behind_stale_parent() {
        let allocator = PathAllocator::default();
        // numchild says 1 but ordinals 2..=4 were created externally
        let occupied: BTreeSet<String> = ["00010001", "00010002", "00010003", "00010004"]
            .into_iter()
            .map(String::from)
            .collect();
        let path = allocator
            .allocate_child_path(&parent("0001", 1), &occupied)
            .unwrap();
        assert_eq!(path.as_str(), "00010005");
    }

    #[test]
    fn overflow_is_fatal() {
        let scheme = PathScheme::new("01", 1).unwrap();
        let allocator = PathAllocator::new(scheme);
        let occupied: HashSet<String> = HashSet::new();
        let tight = Parent {
            path: "1".to_string(),
            depth: 1,
            numchild: 1,
        };
        let result = allocator.allocate_child_path(&tight, &occupied);
        assert!(matches!(result, Err(PathError::Overflow { ordinal: 2, .. })));
    }

    #[test]
    fn probe_limit_when_configured() {
        let allocator = PathAllocator::default().with_max_probes(Some(2));
        let occupied: BTreeSet<String> = ["00010001", "00010002"]
            .into_iter()
            .map(String::from)
            .collect();
        let result = allocator.allocate_child_path(&parent("0001", 0), &occupied);
        assert!(matches!(
            result,
            Err(PathError::ProbeLimitExceeded { attempts: 2, .. })
        ));
    }

    #[test]
    fn does_not_mutate_parent() {
        let allocator = PathAllocator::default();
        let p = parent("0001", 3);
        let occupied = BTreeSet::new();
        let _ = allocator.allocate_child_path(&p, &occupied).unwrap();
        assert_eq!(p.numchild, 3);
    }
}
