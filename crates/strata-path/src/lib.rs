//! Strata Path
//!
//! Materialized-path encoding and collision-free child path allocation.
//!
//! # Core Concepts
//!
//! - [`PathScheme`]: Fixed-radix, fixed-width step encoding
//! - [`MaterializedPath`]: Validated node position
//! - [`PathAllocator`]: Encode-then-probe allocation of child paths
//! - [`PathIndex`]: Occupancy lookup supplied by the tree's storage
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_path::{PathAllocator, PathScheme};
//!
//! let allocator = PathAllocator::new(PathScheme::default());
//! let path = allocator.allocate_child_path(&parent, &store)?;
//! assert_eq!(path.depth(), parent.depth() + 1);
//! ```

#![warn(unreachable_pub)]

mod allocator;
mod path;
mod scheme;

pub use allocator::{PathAllocator, PathIndex, TreePosition};
pub use path::{MaterializedPath, PathError};
pub use scheme::{PathScheme, DEFAULT_ALPHABET, DEFAULT_STEPLEN, ROOT_DEPTH};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
