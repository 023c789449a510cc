//! Error types for Strata Migrate
//!
//! Provides error handling for:
//! - Missing nodes, node types, schema versions and fields
//! - Structured content that does not decode
//! - Tree path exhaustion
//! - Failing transformations
//! - Configuration and storage failures
//!
//! Nothing here is retried: every error aborts the enclosing atomic block.

use std::fmt::{self, Display, Formatter};
use strata_path::PathError;
use strata_stream::{StreamError, TransformError};

/// What a failed lookup was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Tree node
    Node,
    /// Registered node type
    NodeType,
    /// Schema version of a node type
    SchemaVersion,
    /// Structured field on a schema
    Field,
    /// Historical snapshot
    Snapshot,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Node => "node",
            Self::NodeType => "node type",
            Self::SchemaVersion => "schema version",
            Self::Field => "field",
            Self::Snapshot => "snapshot",
        };
        f.write_str(name)
    }
}

/// Main error type
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Lookup failed
    #[error("{kind} not found: {key}")]
    NotFound {
        /// What was looked up
        kind: EntityKind,
        /// Lookup key
        key: String,
    },

    /// Structured content could not be decoded or encoded
    #[error("malformed content in {holder}: {source}")]
    MalformedContent {
        /// Holder the content belongs to
        holder: String,
        /// Underlying decode failure
        #[source]
        source: StreamError,
    },

    /// No child path can be encoded under a parent
    #[error("path exhausted: {0}")]
    PathExhaustion(#[source] PathError),

    /// Path did not match the tree scheme
    #[error("invalid path: {0}")]
    InvalidPath(#[source] PathError),

    /// Caller-supplied transformation failed
    #[error("transformation failed: {0}")]
    Transformation(#[from] TransformError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence layer error
    #[error("storage error: {0}")]
    Storage(String),
}

/// Coarse classification of [`MigrateError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Node, type or field lookup failed
    NotFound,
    /// Content has the wrong shape
    MalformedContent,
    /// Tree scheme ran out of room
    PathExhaustion,
    /// Transformation raised
    Transformation,
    /// Anything else (configuration, storage, invalid paths)
    Other,
}

impl MigrateError {
    /// Create not-found error
    #[inline]
    pub fn not_found(kind: EntityKind, key: impl Display) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    /// Create malformed-content error for a holder
    #[inline]
    pub fn malformed(holder: impl Into<String>, source: StreamError) -> Self {
        Self::MalformedContent {
            holder: holder.into(),
            source,
        }
    }

    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MalformedContent { .. } => ErrorKind::MalformedContent,
            Self::PathExhaustion(_) => ErrorKind::PathExhaustion,
            Self::Transformation(_) => ErrorKind::Transformation,
            Self::InvalidPath(_) | Self::Config(_) | Self::Storage(_) => ErrorKind::Other,
        }
    }

    /// Check if a lookup failed
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<PathError> for MigrateError {
    fn from(error: PathError) -> Self {
        match error {
            PathError::Index(message) => Self::Storage(message),
            e if e.is_exhaustion() => Self::PathExhaustion(e),
            e => Self::InvalidPath(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = MigrateError::not_found(EntityKind::Node, 42);
        assert_eq!(err.to_string(), "node not found: 42");
        assert!(err.is_not_found());
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn path_errors_are_classified() {
        let overflow: MigrateError = PathError::Overflow { ordinal: 9, max: 3 }.into();
        assert_eq!(overflow.kind(), ErrorKind::PathExhaustion);

        let invalid: MigrateError = PathError::InvalidCharacter('!').into();
        assert!(matches!(invalid, MigrateError::InvalidPath(_)));

        let index: MigrateError = PathError::Index("db down".into()).into();
        assert!(matches!(index, MigrateError::Storage(msg) if msg == "db down"));
    }

    #[test]
    fn transform_errors_convert() {
        let err: MigrateError = TransformError::failed("nope").into();
        assert_eq!(err.kind(), ErrorKind::Transformation);
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn malformed_names_holder() {
        let err = MigrateError::malformed("snapshot 7", StreamError::malformed("bad"));
        assert_eq!(err.kind(), ErrorKind::MalformedContent);
        assert!(err.to_string().contains("snapshot 7"));
    }
}
