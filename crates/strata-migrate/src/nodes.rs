//! Node lookup and idempotent creation under a parent

use crate::error::{EntityKind, MigrateError};
use crate::schema::SchemaRegistry;
use crate::store::{ContentStore, StorePathIndex};
use crate::types::{NewNode, NodeType, TreeNode};
use serde_json::{Map, Value};
use strata_path::PathAllocator;

/// Description of a node to create
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    node_type: NodeType,
    title: String,
    slug: String,
    live: bool,
    fields: Map<String, Value>,
}

impl NodeSpec {
    /// Describe an unpublished node with no domain fields
    #[must_use]
    pub fn new(node_type: NodeType, title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            node_type,
            title: title.into(),
            slug: slug.into(),
            live: false,
            fields: Map::new(),
        }
    }

    /// Set the published flag
    #[must_use]
    pub fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    /// Add a domain field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Node type
    #[inline]
    #[must_use]
    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    /// Slug
    #[inline]
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }
}

/// Fetch a node of a type by slug
///
/// # Errors
/// Returns [`MigrateError::NotFound`] if no such node exists
pub fn get_node<S: ContentStore + ?Sized>(
    store: &S,
    node_type: &NodeType,
    slug: &str,
) -> Result<TreeNode, MigrateError> {
    store
        .node_by_slug(node_type, slug)?
        .ok_or_else(|| MigrateError::not_found(EntityKind::Node, format!("{node_type}/{slug}")))
}

/// Return the node with the requested type and slug, creating it under `parent` if absent
///
/// A new node is stamped with the newest registered schema version of its
/// type and placed at the first free child path of the parent, whose child
/// count is then incremented. The parent is re-read from the store, so a
/// stale `parent` only contributes its id.
///
/// # Errors
/// - [`MigrateError::NotFound`] if the type is not registered or the parent
///   no longer exists
/// - [`MigrateError::PathExhaustion`] if no child path can be encoded
/// - any storage error; nothing is persisted on error
pub fn get_or_create_node<S: ContentStore>(
    store: &S,
    registry: &SchemaRegistry,
    allocator: &PathAllocator,
    spec: NodeSpec,
    parent: &TreeNode,
) -> Result<TreeNode, MigrateError> {
    store.atomic(|store| {
        if let Some(existing) = store.node_by_slug(&spec.node_type, &spec.slug)? {
            tracing::debug!(slug = %spec.slug, id = %existing.id, "node already exists");
            return Ok(existing);
        }

        let schema = registry.latest(&spec.node_type)?;
        let mut parent = store.node(parent.id)?;
        let path = allocator.allocate_child_path(&parent, &StorePathIndex::new(store))?;

        let node = store.insert_node(NewNode {
            node_type: spec.node_type,
            schema_version: schema.version(),
            title: spec.title,
            slug: spec.slug,
            live: spec.live,
            path: path.into_string(),
            depth: parent.depth + 1,
            fields: spec.fields,
        })?;

        parent.numchild += 1;
        store.save_node(&parent)?;

        tracing::info!("Created {} '{}' at {}", node.node_type, node.slug, node.path);
        Ok(node)
    })
}
