//! Strata Migrate
//!
//! Schema-aware data migrations over a content tree: rewrite tagged blocks in
//! the structured fields of live nodes and of every historical snapshot, and
//! create nodes idempotently at collision-free tree paths.
//!
//! # Core Concepts
//!
//! - [`ContentStore`]: Persistence seam with an all-or-nothing `atomic` block
//! - [`SchemaRegistry`]: Node schemas keyed by type and version
//! - [`ContentHolder`]: A live node or one of its snapshots
//! - [`MigrationDirective`]: Node type, field, block tag and transformation
//! - [`migrate_page_types_and_fields`]: Atomic batch driver
//! - [`get_or_create_node`]: Idempotent child creation
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_migrate::{migrate_page_types_and_fields, MigrationDirective};
//!
//! let directives = vec![MigrationDirective::new(
//!     "content.LearnPage".parse()?,
//!     "body",
//!     "info_unit",
//!     upgrade_info_unit,
//! )];
//! let report = migrate_page_types_and_fields(&store, &registry, &directives)?;
//! println!("Migrated {} nodes", report.nodes_migrated);
//! ```

#![warn(unreachable_pub)]

mod config;
mod directive;
mod error;
mod holder;
pub mod logging;
mod migrate;
mod nodes;
mod schema;
mod store;
mod types;

pub use config::{LoggingConfig, PathConfig, StrataConfig};
pub use directive::{MigrationDirective, SharedTransform};
pub use error::{EntityKind, ErrorKind, MigrateError};
pub use holder::{get_structured_value, set_structured_value, ContentHolder};
pub use migrate::{migrate_page_types_and_fields, migrate_structured_field, MigrationReport};
pub use nodes::{get_node, get_or_create_node, NodeSpec};
pub use schema::{FieldCodec, JsonStreamCodec, NodeSchema, SchemaRegistry, TextStreamCodec};
pub use store::{ContentStore, InMemoryStore, StorePathIndex};
pub use types::{NewNode, NodeId, NodeType, Snapshot, SnapshotId, TreeNode};

pub use strata_path::{MaterializedPath, PathAllocator, PathError, PathScheme};
pub use strata_stream::{
    migrate_structured_value, BlockEntry, BlockTransform, BlockValue, FnTransform, StreamData,
    StreamError, TransformError,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
