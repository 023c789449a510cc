//! Strata Stream
//!
//! Ordered, tagged block sequences and their recursive rewrite.
//!
//! # Core Concepts
//!
//! - [`StreamData`]: Decoded structured field (ordered [`BlockEntry`] list)
//! - [`BlockValue`]: `Scalar` or `Nested` entry payload
//! - [`BlockTransform`]: Capability that rewrites one matching value
//! - [`migrate_structured_value`]: Walk a sequence and apply a transform to
//!   every entry of a tag, reporting whether anything changed
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_stream::{migrate_structured_value, FnTransform, StreamData};
//!
//! let data = StreamData::from_json_str(raw)?;
//! let (data, changed) = migrate_structured_value(&owner, "image", data, &transform)?;
//! if changed {
//!     save(data.to_json_string()?)?;
//! }
//! ```

#![warn(unreachable_pub)]

mod block;
mod rewrite;
mod transform;

pub use block::{BlockEntry, BlockValue, StreamData, StreamError};
pub use rewrite::migrate_structured_value;
pub use transform::{BlockTransform, FnTransform, TransformError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
