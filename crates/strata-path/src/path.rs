//! Materialized paths for addressing tree nodes
//!
//! Provides [`MaterializedPath`], a node position encoded as a string of
//! fixed-width steps.

use std::fmt::{self, Display, Formatter};

/// Position of a node in a materialized-path tree
///
/// A path is the concatenation of one fixed-width step per tree level, from
/// the root down. Lexical order of paths is depth-first tree order, and
/// siblings differ only in their final step.
///
/// # Examples
/// - `0001` → the first root node (depth 1)
/// - `00010003` → the third child of `0001` (depth 2)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterializedPath {
    raw: String,
    steplen: usize,
}

impl MaterializedPath {
    /// Wrap a string already validated against a scheme
    #[inline]
    #[must_use]
    pub(crate) fn new_unchecked(raw: String, steplen: usize) -> Self {
        Self { raw, steplen }
    }

    /// Raw path string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Consume into the raw string
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.raw
    }

    /// Characters per step
    #[inline]
    #[must_use]
    pub fn steplen(&self) -> usize {
        self.steplen
    }

    /// Tree depth (number of steps)
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.raw.len() / self.steplen
    }

    /// Steps from root to leaf
    pub fn steps(&self) -> impl Iterator<Item = &str> {
        // paths are ASCII, so byte offsets are char boundaries
        (0..self.depth()).map(move |i| &self.raw[i * self.steplen..(i + 1) * self.steplen])
    }

    /// Final step (this node's position among its siblings)
    #[inline]
    #[must_use]
    pub fn last_step(&self) -> &str {
        &self.raw[self.raw.len() - self.steplen..]
    }

    /// Parent path (if not a root)
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.depth() <= 1 {
            None
        } else {
            Some(Self {
                raw: self.raw[..self.raw.len() - self.steplen].to_string(),
                steplen: self.steplen,
            })
        }
    }

    /// Check if this path is a strict ancestor of another
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.steplen == other.steplen
            && other.raw.len() > self.raw.len()
            && other.raw.starts_with(&self.raw)
    }

    /// Check if two paths share a parent
    #[must_use]
    pub fn is_sibling_of(&self, other: &Self) -> bool {
        self != other && self.depth() == other.depth() && self.parent() == other.parent()
    }
}

impl Display for MaterializedPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for MaterializedPath {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl From<MaterializedPath> for String {
    fn from(path: MaterializedPath) -> Self {
        path.raw
    }
}

/// Errors related to tree paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Ordinal does not fit in one step
    #[error("ordinal {ordinal} exceeds the per-level capacity of {max}")]
    Overflow {
        /// Ordinal that did not fit
        ordinal: u64,
        /// Largest encodable ordinal
        max: u64,
    },

    /// Malformed path string
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// Offending path
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// Character outside the scheme alphabet
    #[error("character '{0}' is not in the path alphabet")]
    InvalidCharacter(char),

    /// Scheme configuration rejected
    #[error("invalid path scheme: {0}")]
    InvalidScheme(String),

    /// Probe bound reached without finding a free path
    #[error("no free child path under '{parent}' after {attempts} probes")]
    ProbeLimitExceeded {
        /// Parent path probed under
        parent: String,
        /// Probes made
        attempts: u64,
    },

    /// Occupancy lookup failed
    #[error("path index error: {0}")]
    Index(String),
}

impl PathError {
    /// Check if the error means the tree scheme ran out of room
    #[inline]
    #[must_use]
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, Self::Overflow { .. } | Self::ProbeLimitExceeded { .. })
    }
}
