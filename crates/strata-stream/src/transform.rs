//! Block transformation capability
//!
//! Provides [`BlockTransform`], the caller-supplied rewrite applied to every
//! matching block value.

use crate::block::BlockValue;
use std::fmt::{self, Debug, Formatter};

/// Rewrite for the value of a matching block
///
/// `O` is the owner the block was read from (a live node or a historical
/// snapshot), passed through so a transformation can consult it. Implementors
/// must not change the owner's tree position.
pub trait BlockTransform<O: ?Sized>: Send + Sync + Debug {
    /// Produce the replacement value
    ///
    /// # Errors
    /// Returns error if the value cannot be transformed; the error aborts the
    /// whole migration unit.
    fn transform(&self, owner: &O, value: BlockValue) -> Result<BlockValue, TransformError>;

    /// Describe the transformation
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Adapter turning a closure into a [`BlockTransform`]
///
/// # Example
/// ```rust,ignore
/// let upper = FnTransform::new("uppercase", |_owner: &Holder, value| {
///     Ok(BlockValue::text(value.as_text().unwrap_or_default().to_uppercase()))
/// });
/// ```
pub struct FnTransform<F> {
    name: String,
    f: F,
}

impl<F> FnTransform<F> {
    /// Wrap a closure under a descriptive name
    #[inline]
    #[must_use]
    pub fn new<O>(name: impl Into<String>, f: F) -> Self
    where
        O: ?Sized,
        F: Fn(&O, BlockValue) -> Result<BlockValue, TransformError> + Send + Sync,
    {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Debug for FnTransform<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransform").field("name", &self.name).finish()
    }
}

impl<O, F> BlockTransform<O> for FnTransform<F>
where
    O: ?Sized,
    F: Fn(&O, BlockValue) -> Result<BlockValue, TransformError> + Send + Sync,
{
    fn transform(&self, owner: &O, value: BlockValue) -> Result<BlockValue, TransformError> {
        (self.f)(owner, value)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Errors raised by transformations
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Generic failure
    #[error("{0}")]
    Failed(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Value did not have the shape the transformation expects
    #[error("unexpected value shape for block '{block_type}': {detail}")]
    UnexpectedShape {
        /// Tag of the offending block
        block_type: String,
        /// What was wrong
        detail: String,
    },
}

impl TransformError {
    /// Create generic failure
    #[inline]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
