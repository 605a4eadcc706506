//! # Ordinal Categorical Encoding
//!
//! This module provides [`CategoryCodec`], which replaces the categories of string columns with
//! ordinal numbers (0, 1, 2, ...). The numbers are either ordered by the mean of a target per
//! category, or assigned arbitrarily in the order categories are first seen.
//!
//! - **Ordered:** for a column `colour` whose target means for blue, red and grey are 0.5, 0.8
//!   and 0.1, grey is replaced by 0, blue by 1 and red by 2. Categories with the same mean are
//!   ordered by their value.
//! - **Arbitrary:** the first category found scanning the rows top to bottom gets 0, the next
//!   new one gets 1, and so on.
//!
//! The codec learns the mapping with an asynchronous `fit` and applies it with `transform` (and
//! reverses it with `inverse_transform`), both provided by the
//! [`CategoricalEncoder`](crate::transformers::base_encoder::CategoricalEncoder) trait.
//! A fitted codec can be saved as a [`CodecSnapshot`] and restored without retraining.
//!
//! ### Example
//!
//! ```rust,no_run
//! use category_codec::exceptions::CategoryCodecResult;
//! use category_codec::transformers::base_encoder::CategoricalEncoder;
//! use category_codec::transformers::categorical_encoding::CategoryCodec;
//! use category_codec::transformers::variables::Variables;
//! use datafusion::prelude::DataFrame;
//!
//! async fn encode(train: &DataFrame, target: &[f64], test: DataFrame) -> CategoryCodecResult<DataFrame> {
//!     let mut codec = CategoryCodec::new("ordered", Variables::All)?;
//!     codec.fit(train, Some(target)).await?;
//!     codec.transform(test).await
//! }
//! ```

use crate::exceptions::{CategoryCodecError, CategoryCodecResult};
use crate::transformers::base_encoder::{
    CategoricalEncoder, CategoryMapping, EncoderDictionary, FittedEncoding,
};
use crate::transformers::dataframe_checks::{check_is_dataframe, check_no_missing_values};
use crate::transformers::variables::{
    normalize_variable_list, select_categorical_columns, Variables,
};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::functions_aggregate::expr_fn::avg;
use datafusion::logical_expr::{cast, col, ident};
use datafusion::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Column names of the temporary table joining a variable to the target.
const CATEGORY_COLUMN: &str = "category";
const TARGET_COLUMN: &str = "target";
const MEAN_COLUMN: &str = "target_mean";

/// How codes are assigned to categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMethod {
    /// Codes follow the ascending mean of the target per category.
    #[default]
    Ordered,
    /// Codes follow the order in which categories first appear.
    Arbitrary,
}

impl FromStr for EncodingMethod {
    type Err = CategoryCodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ordered" => Ok(EncodingMethod::Ordered),
            "arbitrary" => Ok(EncodingMethod::Arbitrary),
            other => Err(CategoryCodecError::InvalidParameter(format!(
                "encoding_method takes only values 'ordered' and 'arbitrary', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for EncodingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingMethod::Ordered => write!(f, "ordered"),
            EncodingMethod::Arbitrary => write!(f, "arbitrary"),
        }
    }
}

/// Everything needed to rebuild a fitted [`CategoryCodec`] without retraining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecSnapshot {
    pub encoding_method: EncodingMethod,
    pub variables: Vec<String>,
    pub encoder_dict: EncoderDictionary,
    pub input_shape: (usize, usize),
}

/// Replaces categories with ordinal numbers learned from a training DataFrame.
#[derive(Debug, Clone, Default)]
pub struct CategoryCodec {
    encoding_method: EncodingMethod,
    /// Variables requested at construction; `None` selects every categorical column.
    requested_variables: Option<Vec<String>>,
    fitted: Option<FittedEncoding>,
}

impl CategoryCodec {
    /// Create a new codec from the name of an encoding method (`"ordered"` or `"arbitrary"`).
    pub fn new(encoding_method: &str, variables: impl Into<Variables>) -> CategoryCodecResult<Self> {
        Ok(Self::with_method(encoding_method.parse()?, variables))
    }

    /// Create a new codec for an already parsed encoding method.
    pub fn with_method(encoding_method: EncodingMethod, variables: impl Into<Variables>) -> Self {
        Self {
            encoding_method,
            requested_variables: normalize_variable_list(variables),
            fitted: None,
        }
    }

    pub fn encoding_method(&self) -> EncodingMethod {
        self.encoding_method
    }

    /// The encoded variables once fitted, otherwise the variables requested at construction
    /// (if any).
    pub fn variables(&self) -> Option<&[String]> {
        match &self.fitted {
            Some(fitted) => Some(fitted.variables()),
            None => self.requested_variables.as_deref(),
        }
    }

    pub fn encoder_dict(&self) -> Option<&EncoderDictionary> {
        self.fitted.as_ref().map(FittedEncoding::encoder_dict)
    }

    pub fn input_shape(&self) -> Option<(usize, usize)> {
        self.fitted.as_ref().map(FittedEncoding::input_shape)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Learns the codes used to replace the categories of each variable.
    ///
    /// `target` holds one value per row of `df` and is required by the ordered method.
    /// `NaN` targets are ignored when averaging. On error the codec keeps its previous state.
    pub async fn fit(
        &mut self,
        df: &DataFrame,
        target: Option<&[f64]>,
    ) -> CategoryCodecResult<&mut Self> {
        check_is_dataframe(df)?;
        let variables = select_categorical_columns(df, self.requested_variables.as_deref())?;
        debug!(variables = ?variables, method = %self.encoding_method, "Fitting category codec");
        check_no_missing_values(df, &variables).await?;

        let target = match (self.encoding_method, target) {
            (EncodingMethod::Ordered, None) => {
                return Err(CategoryCodecError::InvalidParameter(
                    "Please provide a target for the ordered encoding method".to_string(),
                ))
            }
            (_, target) => target,
        };

        let n_rows = df.clone().count().await?;
        if let Some(target) = target {
            if target.len() != n_rows {
                return Err(CategoryCodecError::InvalidData(format!(
                    "Target has {} values but the DataFrame has {} rows",
                    target.len(),
                    n_rows
                )));
            }
        }

        let mut encoder_dict = EncoderDictionary::new();
        for col_name in &variables {
            let values = extract_column_values(df, col_name).await?;
            let ordered_categories = match (self.encoding_method, target) {
                (EncodingMethod::Ordered, Some(target)) => {
                    categories_by_target_mean(values, target).await?
                }
                _ => categories_in_first_seen_order(values),
            };
            let mapping: CategoryMapping = ordered_categories
                .into_iter()
                .enumerate()
                .map(|(i, cat)| (cat, i as i64))
                .collect();
            debug!(column = %col_name, categories = mapping.len(), "Learned mapping");
            encoder_dict.insert(col_name.clone(), mapping);
        }

        let n_columns = df.schema().fields().len();
        let fitted = FittedEncoding::try_new(variables, encoder_dict, (n_rows, n_columns))?;
        self.fitted = Some(fitted);
        Ok(self)
    }

    /// Fits the codec on `df` and returns `df` transformed.
    pub async fn fit_transform(
        &mut self,
        df: DataFrame,
        target: Option<&[f64]>,
    ) -> CategoryCodecResult<DataFrame> {
        self.fit(&df, target).await?;
        self.transform(df).await
    }

    /// Captures the fitted state of the codec.
    pub fn snapshot(&self) -> CategoryCodecResult<CodecSnapshot> {
        let fitted = self.fitted_encoding()?;
        Ok(CodecSnapshot {
            encoding_method: self.encoding_method,
            variables: fitted.variables().to_vec(),
            encoder_dict: fitted.encoder_dict().clone(),
            input_shape: fitted.input_shape(),
        })
    }

    /// Rebuilds a fitted codec from a snapshot. The dictionary is validated again.
    pub fn from_snapshot(snapshot: CodecSnapshot) -> CategoryCodecResult<Self> {
        let fitted = FittedEncoding::try_new(
            snapshot.variables.clone(),
            snapshot.encoder_dict,
            snapshot.input_shape,
        )?;
        Ok(Self {
            encoding_method: snapshot.encoding_method,
            requested_variables: Some(snapshot.variables),
            fitted: Some(fitted),
        })
    }

    pub fn to_json(&self) -> CategoryCodecResult<String> {
        Ok(serde_json::to_string(&self.snapshot()?)?)
    }

    pub fn from_json(json: &str) -> CategoryCodecResult<Self> {
        Self::from_snapshot(serde_json::from_str(json)?)
    }

    /// Writes the snapshot of a fitted codec to `path` as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> CategoryCodecResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reads a codec saved with [`CategoryCodec::save`].
    pub fn load(path: impl AsRef<Path>) -> CategoryCodecResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

impl CategoricalEncoder for CategoryCodec {
    fn fitted_encoding(&self) -> CategoryCodecResult<&FittedEncoding> {
        self.fitted.as_ref().ok_or(CategoryCodecError::FitNotCalled)
    }
}

/// Collects the values of a categorical column as strings, in row order.
async fn extract_column_values(df: &DataFrame, col_name: &str) -> CategoryCodecResult<Vec<String>> {
    let batches = df
        .clone()
        .select(vec![cast(ident(col_name), DataType::Utf8).alias(col_name)])?
        .collect()
        .await?;
    let mut values = Vec::new();
    for batch in batches {
        let array = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                CategoryCodecError::InvalidData(format!(
                    "Expected Utf8 array for column {}",
                    col_name
                ))
            })?;
        for i in 0..array.len() {
            if array.is_null(i) {
                return Err(CategoryCodecError::InvalidData(format!(
                    "Column '{}' contains null values",
                    col_name
                )));
            }
            values.push(array.value(i).to_string());
        }
    }
    Ok(values)
}

/// Distinct values in the order they first appear.
fn categories_in_first_seen_order(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Distinct values sorted by the ascending mean of `target`, ties broken by value.
///
/// The column and target are joined into an in-memory table and averaged per category.
/// A category whose targets are all `NaN` has no mean and sorts last.
async fn categories_by_target_mean(
    values: Vec<String>,
    target: &[f64],
) -> CategoryCodecResult<Vec<String>> {
    let schema = Arc::new(Schema::new(vec![
        Field::new(CATEGORY_COLUMN, DataType::Utf8, false),
        Field::new(TARGET_COLUMN, DataType::Float64, true),
    ]));
    let categories: ArrayRef = Arc::new(StringArray::from(values));
    let targets: ArrayRef = Arc::new(Float64Array::from_iter(
        target.iter().map(|&t| (!t.is_nan()).then_some(t)),
    ));
    let batch = RecordBatch::try_new(schema.clone(), vec![categories, targets])?;
    let table = MemTable::try_new(schema, vec![vec![batch]])?;

    let ctx = SessionContext::new();
    let batches = ctx
        .read_table(Arc::new(table))?
        .aggregate(
            vec![col(CATEGORY_COLUMN)],
            vec![avg(col(TARGET_COLUMN)).alias(MEAN_COLUMN)],
        )?
        .sort(vec![
            col(MEAN_COLUMN).sort(true, false),
            col(CATEGORY_COLUMN).sort(true, false),
        ])?
        .collect()
        .await?;

    let mut ordered = Vec::new();
    for batch in batches {
        let cat_array = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                CategoryCodecError::InvalidData("Expected Utf8 array for categories".to_string())
            })?;
        for i in 0..cat_array.len() {
            ordered.push(cat_array.value(i).to_string());
        }
    }
    Ok(ordered)
}
