//! # Shared Encoding Machinery
//!
//! This module holds everything the categorical encoders share once a mapping has been learned:
//!
//! - [`EncoderDictionary`]: the learned mapping `column -> (category -> code)`.
//! - [`FittedEncoding`]: the immutable result of a `fit`, bundling the dictionary, the encoded
//!   variables and the shape of the training DataFrame.
//! - [`validate_encoding_dictionary`]: the validation gate every learned dictionary passes through.
//! - [`encode_dataframe`] / [`decode_dataframe`]: pure functions applying (or reversing) a
//!   [`FittedEncoding`] to a DataFrame through CASE expressions.
//! - [`CategoricalEncoder`]: the capability trait providing `transform` and `inverse_transform`
//!   to any encoder that can expose its [`FittedEncoding`].

use crate::exceptions::{CategoryCodecError, CategoryCodecResult};
use crate::transformers::dataframe_checks::{
    check_columns_match_training, check_is_dataframe, check_no_missing_values,
};
use async_trait::async_trait;
use datafusion::logical_expr::{ident, lit, Case as DFCase, Expr, Literal};
use datafusion::prelude::*;
use std::collections::HashMap;
use tracing::{debug, warn, Level};

/// Mapping from category value to its integer code, for a single column.
pub type CategoryMapping = HashMap<String, i64>;

/// Mapping from column name to the [`CategoryMapping`] learned for it.
pub type EncoderDictionary = HashMap<String, CategoryMapping>;

/// The state produced by fitting an encoder. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedEncoding {
    variables: Vec<String>,
    encoder_dict: EncoderDictionary,
    input_shape: (usize, usize),
}

impl FittedEncoding {
    /// Bundles a learned dictionary with its variables and the training shape.
    /// The dictionary is validated and must have exactly one entry per variable.
    pub fn try_new(
        variables: Vec<String>,
        encoder_dict: EncoderDictionary,
        input_shape: (usize, usize),
    ) -> CategoryCodecResult<Self> {
        let encoder_dict = validate_encoding_dictionary(encoder_dict)?;
        if variables.len() != encoder_dict.len()
            || variables.iter().any(|v| !encoder_dict.contains_key(v))
        {
            return Err(CategoryCodecError::InvalidData(
                "Encoder dictionary columns do not match the encoded variables".to_string(),
            ));
        }
        Ok(Self {
            variables,
            encoder_dict,
            input_shape,
        })
    }

    /// The encoded columns.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The learned mapping for every encoded column.
    pub fn encoder_dict(&self) -> &EncoderDictionary {
        &self.encoder_dict
    }

    /// `(rows, columns)` of the DataFrame seen during fit.
    pub fn input_shape(&self) -> (usize, usize) {
        self.input_shape
    }

    /// Pairs `(category, code)` of one column, ordered by code.
    fn encoding_pairs(&self, col_name: &str) -> Option<Vec<(String, i64)>> {
        self.encoder_dict.get(col_name).map(|m| {
            let mut pairs: Vec<(String, i64)> = m.iter().map(|(k, &v)| (k.clone(), v)).collect();
            pairs.sort_by_key(|(_, code)| *code);
            pairs
        })
    }

    /// Pairs `(code, category)` of one column, ordered by code.
    fn decoding_pairs(&self, col_name: &str) -> Option<Vec<(i64, String)>> {
        self.encoding_pairs(col_name)
            .map(|pairs| pairs.into_iter().map(|(cat, code)| (code, cat)).collect())
    }
}

/// Checks that a learned dictionary is usable and returns it unchanged.
///
/// Fails if the dictionary is empty, if any column has an empty mapping, or if a column's codes
/// are not exactly `0..k` for its `k` categories.
pub fn validate_encoding_dictionary(
    encoder_dict: EncoderDictionary,
) -> CategoryCodecResult<EncoderDictionary> {
    if encoder_dict.is_empty() {
        return Err(CategoryCodecError::InvalidData(
            "Encoder could not be fitted: no variables to encode".to_string(),
        ));
    }
    for (col_name, mapping) in &encoder_dict {
        if mapping.is_empty() {
            return Err(CategoryCodecError::InvalidData(format!(
                "Encoder could not be fitted: empty mapping for column '{}'",
                col_name
            )));
        }
        let mut codes: Vec<i64> = mapping.values().copied().collect();
        codes.sort_unstable();
        if codes.iter().enumerate().any(|(i, &code)| code != i as i64) {
            return Err(CategoryCodecError::InvalidData(format!(
                "Codes for column '{}' are not contiguous integers starting at 0",
                col_name
            )));
        }
    }
    Ok(encoder_dict)
}

/// Builds a CASE WHEN expression from `(from, to)` pairs.
/// For each pair the generated branch is `WHEN <col> = lit(<from>) THEN lit(<to>)`.
/// There is no ELSE branch, so values without a pair become NULL.
fn build_case_expr<K, V>(col_name: &str, mapping: &[(K, V)]) -> Expr
where
    K: Clone + Literal,
    V: Clone + Literal,
{
    let when_then_expr = mapping
        .iter()
        .map(|(from, to)| {
            (
                Box::new(ident(col_name).eq(lit(from.clone()))),
                Box::new(lit(to.clone())),
            )
        })
        .collect();
    Expr::Case(DFCase {
        expr: None,
        when_then_expr,
        else_expr: None,
    })
}

/// Replaces every column in `target_cols` by the CASE expression built from `mapping_fn`;
/// other columns are retained as they are.
fn apply_mapping<K, V>(
    df: DataFrame,
    target_cols: &[String],
    mapping_fn: impl Fn(&str) -> Option<Vec<(K, V)>>,
) -> CategoryCodecResult<DataFrame>
where
    K: Clone + Literal,
    V: Clone + Literal,
{
    let exprs: Vec<Expr> = df
        .schema()
        .fields()
        .iter()
        .map(|field| {
            let name = field.name();
            match target_cols.contains(name).then(|| mapping_fn(name)).flatten() {
                Some(map) => build_case_expr(name, &map).alias(name),
                None => ident(name),
            }
        })
        .collect();
    df.select(exprs).map_err(CategoryCodecError::from)
}

/// Replaces each category of the encoded variables by its code.
///
/// Categories absent from the learned mapping become NULL; a warning names the affected columns.
pub async fn encode_dataframe(
    df: DataFrame,
    fitted: &FittedEncoding,
) -> CategoryCodecResult<DataFrame> {
    check_is_dataframe(&df)?;
    check_columns_match_training(&df, fitted)?;
    check_no_missing_values(&df, fitted.variables()).await?;

    let encoded = apply_mapping(df, fitted.variables(), |name| fitted.encoding_pairs(name))?;

    if tracing::enabled!(Level::WARN) {
        warn_on_unseen_categories(&encoded, fitted.variables()).await?;
    }
    debug!(variables = ?fitted.variables(), "Encoded DataFrame");
    Ok(encoded)
}

/// Counts the nulls of every encoded column and warns about the columns that have any.
/// Inputs are null-free at this point, so any null was introduced by an unseen category.
async fn warn_on_unseen_categories(
    encoded: &DataFrame,
    variables: &[String],
) -> CategoryCodecResult<()> {
    let mut with_unseen = Vec::new();
    for col_name in variables {
        let nulls = encoded
            .clone()
            .filter(ident(col_name).is_null())?
            .count()
            .await?;
        if nulls > 0 {
            with_unseen.push(format!("{} ({} rows)", col_name, nulls));
        }
    }
    if !with_unseen.is_empty() {
        warn!(
            columns = %with_unseen.join(", "),
            "Null values were introduced by categories not seen during fit"
        );
    }
    Ok(())
}

/// Replaces each code of the encoded variables by its category. Unknown codes become NULL.
pub fn decode_dataframe(df: DataFrame, fitted: &FittedEncoding) -> CategoryCodecResult<DataFrame> {
    check_is_dataframe(&df)?;
    check_columns_match_training(&df, fitted)?;
    apply_mapping(df, fitted.variables(), |name| fitted.decoding_pairs(name))
}

/// Capability shared by encoders that replace categories with learned values.
///
/// Implementors only expose their fitted state; `transform` and `inverse_transform` are
/// provided on top of it.
#[async_trait]
pub trait CategoricalEncoder: Send + Sync {
    /// The state learned by `fit`, or [`CategoryCodecError::FitNotCalled`].
    fn fitted_encoding(&self) -> CategoryCodecResult<&FittedEncoding>;

    /// Returns a new DataFrame with every encoded variable replaced by its codes.
    async fn transform(&self, df: DataFrame) -> CategoryCodecResult<DataFrame> {
        let fitted = self.fitted_encoding()?;
        encode_dataframe(df, fitted).await
    }

    /// Returns a new DataFrame with every encoded variable mapped back to its categories.
    async fn inverse_transform(&self, df: DataFrame) -> CategoryCodecResult<DataFrame> {
        let fitted = self.fitted_encoding()?;
        decode_dataframe(df, fitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, i64)]) -> CategoryMapping {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_validate_accepts_contiguous_codes() {
        let mut dict = EncoderDictionary::new();
        dict.insert(
            "colour".to_string(),
            mapping(&[("grey", 0), ("blue", 1), ("red", 2)]),
        );
        let validated = validate_encoding_dictionary(dict.clone()).unwrap();
        assert_eq!(validated, dict);
    }

    #[test]
    fn test_validate_rejects_empty_dictionary() {
        let result = validate_encoding_dictionary(EncoderDictionary::new());
        assert!(matches!(result, Err(CategoryCodecError::InvalidData(_))));
    }

    #[test]
    fn test_validate_rejects_empty_mapping() {
        let mut dict = EncoderDictionary::new();
        dict.insert("colour".to_string(), CategoryMapping::new());
        let result = validate_encoding_dictionary(dict);
        assert!(matches!(result, Err(CategoryCodecError::InvalidData(_))));
    }

    #[test]
    fn test_validate_rejects_gaps_and_duplicates() {
        let mut gap = EncoderDictionary::new();
        gap.insert("colour".to_string(), mapping(&[("blue", 0), ("red", 2)]));
        assert!(validate_encoding_dictionary(gap).is_err());

        let mut duplicate = EncoderDictionary::new();
        duplicate.insert("colour".to_string(), mapping(&[("blue", 0), ("red", 0)]));
        assert!(validate_encoding_dictionary(duplicate).is_err());
    }

    #[test]
    fn test_fitted_encoding_requires_matching_variables() {
        let mut dict = EncoderDictionary::new();
        dict.insert("colour".to_string(), mapping(&[("blue", 0)]));
        let result = FittedEncoding::try_new(vec!["size".to_string()], dict.clone(), (1, 1));
        assert!(matches!(result, Err(CategoryCodecError::InvalidData(_))));

        let fitted = FittedEncoding::try_new(vec!["colour".to_string()], dict, (1, 1)).unwrap();
        assert_eq!(fitted.variables(), ["colour".to_string()]);
        assert_eq!(fitted.input_shape(), (1, 1));
    }

    #[test]
    fn test_pairs_are_ordered_by_code() {
        let mut dict = EncoderDictionary::new();
        dict.insert(
            "colour".to_string(),
            mapping(&[("red", 2), ("grey", 0), ("blue", 1)]),
        );
        let fitted = FittedEncoding::try_new(vec!["colour".to_string()], dict, (4, 1)).unwrap();
        let pairs = fitted.encoding_pairs("colour").unwrap();
        let cats: Vec<&str> = pairs.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(cats, vec!["grey", "blue", "red"]);
        let decoded = fitted.decoding_pairs("colour").unwrap();
        assert_eq!(decoded[2], (2, "red".to_string()));
        assert!(fitted.encoding_pairs("size").is_none());
    }
}
