//! Migration directives
//!
//! Provides [`MigrationDirective`]: which node type, field and block tag to
//! rewrite, and the transformation to apply.

use crate::holder::ContentHolder;
use crate::types::NodeType;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use strata_stream::BlockTransform;

/// Shared handle to a transformation over content holders
pub type SharedTransform = Arc<dyn BlockTransform<ContentHolder>>;

/// One unit of a batch migration
#[derive(Clone)]
pub struct MigrationDirective {
    node_type: NodeType,
    field: String,
    block_type: String,
    transform: SharedTransform,
}

impl MigrationDirective {
    /// Create directive
    #[must_use]
    pub fn new(
        node_type: NodeType,
        field: impl Into<String>,
        block_type: impl Into<String>,
        transform: impl BlockTransform<ContentHolder> + 'static,
    ) -> Self {
        Self::with_transform(node_type, field, block_type, Arc::new(transform))
    }

    /// Create directive from an already shared transformation
    #[must_use]
    pub fn with_transform(
        node_type: NodeType,
        field: impl Into<String>,
        block_type: impl Into<String>,
        transform: SharedTransform,
    ) -> Self {
        Self {
            node_type,
            field: field.into(),
            block_type: block_type.into(),
            transform,
        }
    }

    /// Apply one transformation to several (type, field, tag) targets
    #[must_use]
    pub fn with_shared_transform(
        targets: &[(NodeType, &str, &str)],
        transform: &SharedTransform,
    ) -> Vec<Self> {
        targets
            .iter()
            .map(|(node_type, field, block_type)| {
                Self::with_transform(
                    node_type.clone(),
                    *field,
                    *block_type,
                    Arc::clone(transform),
                )
            })
            .collect()
    }

    /// Node type to migrate
    #[inline]
    #[must_use]
    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    /// Structured field to migrate
    #[inline]
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Block tag to rewrite
    #[inline]
    #[must_use]
    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    /// Transformation applied to matching blocks
    #[inline]
    #[must_use]
    pub fn transform(&self) -> &dyn BlockTransform<ContentHolder> {
        self.transform.as_ref()
    }
}

impl Debug for MigrationDirective {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationDirective")
            .field("node_type", &self.node_type)
            .field("field", &self.field)
            .field("block_type", &self.block_type)
            .field("transform", &self.transform.describe())
            .finish()
    }
}
