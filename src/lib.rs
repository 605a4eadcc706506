//! # Category Codec
//!
//! Ordinal encoding of categorical columns for Apache DataFusion DataFrames.
//!
//! A [`CategoryCodec`](transformers::categorical_encoding::CategoryCodec) learns, for every
//! categorical column, a mapping from category to integer code. Codes are either ordered by the
//! mean of a target per category or assigned in first-seen order. The learned mapping is applied
//! to new DataFrames with `transform` and reversed with `inverse_transform`.
//!
//! Set `DEBUG_CATEGORY_CODEC=true` to enable debug logging (see the `logging` module).

pub mod exceptions;
mod logging;
pub mod transformers;
