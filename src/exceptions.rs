//! ## Custom Errors for Category Codec
//!
//! This module defines the error type returned by every fallible operation of the crate.
//! It uses the `thiserror` crate to derive the `Error` trait.
//!
//! The variants map onto the failure classes of the codec:
//!
//! - **InvalidParameter**: a bad constructor argument, a requested variable that is missing
//!   or not categorical, or a target that is required but absent.
//! - **InvalidInput**: the argument is not a usable labeled table.
//! - **InvalidData**: missing values where they are forbidden, a column mismatch between
//!   fit and transform, or a degenerate learned mapping.
//! - **FitNotCalled**: `transform`/`inverse_transform` invoked before `fit`.
//!
//! The `CategoryCodecResult` type alias simplifies error handling.
//!
//! ### Example
//!
//! ```rust
//! use category_codec::exceptions::{CategoryCodecError, CategoryCodecResult};
//!
//! fn check_method(name: &str) -> CategoryCodecResult<()> {
//!     Err(CategoryCodecError::InvalidParameter(format!("unknown method '{}'", name)))
//! }
//! ```

use thiserror::Error;

/// Errors specific to the Category Codec library.
#[derive(Debug, Error)]
pub enum CategoryCodecError {
    /// Wraps underlying I/O errors (snapshot files).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Wraps errors from (de)serializing a codec snapshot.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// An invalid configuration was provided (unknown encoding method, a variable that is
    /// not a categorical column, or a missing target).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The input is not a well-formed labeled table.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The data violates a precondition of the codec.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Indicates transform or inverse_transform was called before fit.
    #[error("Transform called before fit for stateful transformer")]
    FitNotCalled,
}

/// A convenient result type for Category Codec operations.
pub type CategoryCodecResult<T> = std::result::Result<T, CategoryCodecError>;
