//! ## Variable Resolution
//!
//! Helpers to decide which columns of a DataFrame the codec operates on.
//!
//! Column typing is explicit: every Arrow [`DataType`] is tagged with a [`ColumnKind`] and only
//! [`ColumnKind::Categorical`] columns can be encoded.

use crate::exceptions::{CategoryCodecError, CategoryCodecResult};
use datafusion::arrow::datatypes::DataType;
use datafusion::prelude::*;
use std::collections::HashSet;

/// The role a column can play for the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// String-valued columns (including string dictionaries).
    Categorical,
    /// Integer, floating point, and decimal columns.
    Numeric,
    /// Anything else (dates, booleans, nested types, ...).
    Other,
}

/// Tags an Arrow data type with its [`ColumnKind`].
pub fn column_kind(data_type: &DataType) -> ColumnKind {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ColumnKind::Categorical,
        DataType::Dictionary(_, value_type) => match column_kind(value_type) {
            ColumnKind::Categorical => ColumnKind::Categorical,
            _ => ColumnKind::Other,
        },
        dt if dt.is_numeric() => ColumnKind::Numeric,
        _ => ColumnKind::Other,
    }
}

/// The set of variables requested at construction time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Variables {
    /// Select every categorical column of the DataFrame passed to `fit`.
    #[default]
    All,
    /// Encode exactly these columns.
    Named(Vec<String>),
}

impl From<&str> for Variables {
    fn from(name: &str) -> Self {
        Variables::Named(vec![name.to_string()])
    }
}

impl From<String> for Variables {
    fn from(name: String) -> Self {
        Variables::Named(vec![name])
    }
}

impl From<Vec<String>> for Variables {
    fn from(names: Vec<String>) -> Self {
        Variables::Named(names)
    }
}

impl From<Vec<&str>> for Variables {
    fn from(names: Vec<&str>) -> Self {
        Variables::Named(names.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for Variables {
    fn from(names: &[&str]) -> Self {
        Variables::Named(names.iter().map(|n| n.to_string()).collect())
    }
}

impl From<Option<Vec<String>>> for Variables {
    fn from(names: Option<Vec<String>>) -> Self {
        names.map_or(Variables::All, Variables::Named)
    }
}

/// Normalizes a variable specification into an optional list of column names.
///
/// A single name becomes a one-element list, a list is passed through, and
/// [`Variables::All`] becomes `None`.
pub fn normalize_variable_list(variables: impl Into<Variables>) -> Option<Vec<String>> {
    match variables.into() {
        Variables::All => None,
        Variables::Named(names) => Some(names),
    }
}

/// Resolves the columns to encode.
///
/// If `requested` is `None` or empty, returns every categorical column of `df` in schema order.
/// Otherwise every requested name must be a categorical column of `df`; the list is returned in
/// the requested order with repeated names kept once.
pub fn select_categorical_columns(
    df: &DataFrame,
    requested: Option<&[String]>,
) -> CategoryCodecResult<Vec<String>> {
    let schema = df.schema();
    match requested {
        None | Some([]) => Ok(schema
            .fields()
            .iter()
            .filter(|f| column_kind(f.data_type()) == ColumnKind::Categorical)
            .map(|f| f.name().clone())
            .collect()),
        Some(names) => {
            for name in names {
                let field = schema.field_with_name(None, name).map_err(|_| {
                    CategoryCodecError::InvalidParameter(format!(
                        "Column '{}' not found in DataFrame",
                        name
                    ))
                })?;
                if column_kind(field.data_type()) != ColumnKind::Categorical {
                    return Err(CategoryCodecError::InvalidParameter(format!(
                        "Column '{}' is not categorical (found {:?})",
                        name,
                        field.data_type()
                    )));
                }
            }
            let mut seen = HashSet::new();
            Ok(names
                .iter()
                .filter(|name| seen.insert(*name))
                .cloned()
                .collect())
        }
    }
}
