//! ## DataFrame Checks
//!
//! Validation helpers run by the codec before learning or applying a mapping.

use crate::exceptions::{CategoryCodecError, CategoryCodecResult};
use crate::transformers::base_encoder::FittedEncoding;
use datafusion::logical_expr::ident;
use datafusion::prelude::*;
use std::collections::HashSet;

/// Checks that `df` is a labeled 2-D table: at least one column and no duplicate column names.
pub fn check_is_dataframe(df: &DataFrame) -> CategoryCodecResult<()> {
    let fields = df.schema().fields();
    if fields.is_empty() {
        return Err(CategoryCodecError::InvalidInput(
            "DataFrame has no columns".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for field in fields.iter() {
        if !seen.insert(field.name().as_str()) {
            return Err(CategoryCodecError::InvalidInput(format!(
                "DataFrame has more than one column named '{}'",
                field.name()
            )));
        }
    }
    Ok(())
}

/// Checks that `df` has the same number of columns as the DataFrame used to fit the codec,
/// and that every encoded variable is present.
pub fn check_columns_match_training(
    df: &DataFrame,
    fitted: &FittedEncoding,
) -> CategoryCodecResult<()> {
    let schema = df.schema();
    let (_, expected_columns) = fitted.input_shape();
    if schema.fields().len() != expected_columns {
        return Err(CategoryCodecError::InvalidData(format!(
            "The number of columns in this DataFrame ({}) is different from the one used to fit the codec ({})",
            schema.fields().len(),
            expected_columns
        )));
    }
    for name in fitted.variables() {
        if schema.field_with_name(None, name).is_err() {
            return Err(CategoryCodecError::InvalidData(format!(
                "Column '{}' seen during fit not found in DataFrame",
                name
            )));
        }
    }
    Ok(())
}

/// Checks that none of `columns` contains a null value.
pub async fn check_no_missing_values(
    df: &DataFrame,
    columns: &[String],
) -> CategoryCodecResult<()> {
    for col_name in columns {
        let nulls = df
            .clone()
            .filter(ident(col_name).is_null())?
            .count()
            .await?;
        if nulls > 0 {
            return Err(CategoryCodecError::InvalidData(format!(
                "Column '{}' contains null values",
                col_name
            )));
        }
    }
    Ok(())
}
