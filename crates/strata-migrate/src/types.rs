//! Core types for Strata Migrate
//!
//! Tree nodes, historical snapshots and their identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use strata_path::TreePosition;

use crate::error::MigrateError;

/// Identifier of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub u64);

impl Display for SnapshotId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node type, addressed as `namespace.Name`
///
/// # Examples
/// - `content.LearnPage`
/// - `core.Page`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeType {
    namespace: String,
    name: String,
}

impl NodeType {
    /// Create node type
    #[inline]
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Namespace (application label)
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Type name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl FromStr for NodeType {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            _ => Err(MigrateError::Config(format!(
                "node type '{s}' is not of the form namespace.Name"
            ))),
        }
    }
}

/// One node of the content tree
///
/// Structured fields live in `fields` in their typed (JSON) form; the
/// node's schema says which fields are structured and how to decode them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Identifier
    pub id: NodeId,
    /// Node type
    pub node_type: NodeType,
    /// Schema version the node was saved under
    pub schema_version: u32,
    /// Title
    pub title: String,
    /// Slug, unique within a node type
    pub slug: String,
    /// Published flag
    pub live: bool,
    /// Materialized path
    pub path: String,
    /// Depth (root is 1)
    pub depth: usize,
    /// Children materialized so far
    pub numchild: u64,
    /// Domain fields
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl TreeNode {
    /// Read a domain field
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Write a domain field
    #[inline]
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }
}

impl TreePosition for TreeNode {
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

/// Node to be inserted; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    /// Node type
    pub node_type: NodeType,
    /// Schema version
    pub schema_version: u32,
    /// Title
    pub title: String,
    /// Slug
    pub slug: String,
    /// Published flag
    pub live: bool,
    /// Materialized path
    pub path: String,
    /// Depth
    pub depth: usize,
    /// Domain fields
    pub fields: Map<String, Value>,
}

/// Point-in-time serialized copy of a node
///
/// `content` is a JSON object serialized to text. Structured fields inside
/// it are themselves pre-serialized JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Identifier
    pub id: SnapshotId,
    /// Owning node
    pub node_id: NodeId,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Serialized content blob
    pub content: String,
}
