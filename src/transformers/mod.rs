//! # Transformer Implementations
//!
//! The submodules contain the categorical codec and the helpers it is built from.

pub mod base_encoder;
pub mod categorical_encoding;
pub mod dataframe_checks;
pub mod variables;
