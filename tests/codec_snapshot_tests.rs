use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use tempfile::NamedTempFile;

use category_codec::exceptions::{CategoryCodecError, CategoryCodecResult};
use category_codec::transformers::base_encoder::CategoricalEncoder;
use category_codec::transformers::categorical_encoding::{
    CategoryCodec, CodecSnapshot, EncodingMethod,
};
use category_codec::transformers::variables::Variables;

async fn create_colour_df(colours: Vec<&str>) -> DataFrame {
    let schema = Arc::new(Schema::new(vec![Field::new("colour", DataType::Utf8, true)]));
    let colour_array: ArrayRef = Arc::new(StringArray::from(colours));
    let batch = RecordBatch::try_new(schema.clone(), vec![colour_array]).unwrap();
    let mem_table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    let ctx = SessionContext::new();
    ctx.register_table("t", Arc::new(mem_table)).unwrap();
    ctx.table("t").await.unwrap()
}

async fn fitted_codec() -> CategoryCodec {
    let df = create_colour_df(vec!["blue", "red", "grey", "blue"]).await;
    let mut codec = CategoryCodec::new("ordered", Variables::All).unwrap();
    codec.fit(&df, Some(&[0.6, 0.8, 0.1, 0.4])).await.unwrap();
    codec
}

async fn encoded_values(codec: &CategoryCodec, colours: Vec<&str>) -> Vec<Option<i64>> {
    let df = create_colour_df(colours).await;
    let batches = codec.transform(df).await.unwrap().collect().await.unwrap();
    batches
        .iter()
        .flat_map(|batch| {
            batch
                .column(0)
                .as_any()
                .downcast_ref::<Int64Array>()
                .expect("Expected Int64Array for encoded column")
                .iter()
                .collect::<Vec<_>>()
        })
        .collect()
}

#[tokio::test]
async fn test_snapshot_captures_fitted_state() -> CategoryCodecResult<()> {
    let codec = fitted_codec().await;
    let snapshot = codec.snapshot()?;
    assert_eq!(snapshot.encoding_method, EncodingMethod::Ordered);
    assert_eq!(snapshot.variables, vec!["colour".to_string()]);
    assert_eq!(snapshot.input_shape, (4, 1));
    assert_eq!(snapshot.encoder_dict["colour"]["grey"], 0);
    assert_eq!(snapshot.encoder_dict["colour"]["red"], 2);
    Ok(())
}

#[tokio::test]
async fn test_restored_codec_transforms_like_the_original() -> CategoryCodecResult<()> {
    let codec = fitted_codec().await;
    let restored = CategoryCodec::from_json(&codec.to_json()?)?;

    assert!(restored.is_fitted());
    assert_eq!(restored.encoder_dict(), codec.encoder_dict());
    assert_eq!(restored.input_shape(), codec.input_shape());
    assert_eq!(
        encoded_values(&restored, vec!["red", "blue", "grey"]).await,
        vec![Some(2), Some(1), Some(0)]
    );
    Ok(())
}

#[tokio::test]
async fn test_save_and_load() -> CategoryCodecResult<()> {
    let codec = fitted_codec().await;
    let file = NamedTempFile::new()?;
    codec.save(file.path())?;

    let loaded = CategoryCodec::load(file.path())?;
    assert_eq!(loaded.snapshot()?, codec.snapshot()?);
    Ok(())
}

#[tokio::test]
async fn test_snapshot_of_unfitted_codec_fails() -> CategoryCodecResult<()> {
    let codec = CategoryCodec::new("arbitrary", Variables::All)?;
    assert!(matches!(codec.to_json(), Err(CategoryCodecError::FitNotCalled)));
    Ok(())
}

#[tokio::test]
async fn test_invalid_snapshot_is_rejected() -> CategoryCodecResult<()> {
    let mut snapshot = fitted_codec().await.snapshot()?;
    snapshot
        .encoder_dict
        .get_mut("colour")
        .unwrap()
        .insert("purple".to_string(), 9);
    let result = CategoryCodec::from_snapshot(snapshot);
    assert!(matches!(result, Err(CategoryCodecError::InvalidData(_))));

    let snapshot = CodecSnapshot {
        encoding_method: EncodingMethod::Arbitrary,
        variables: vec!["size".to_string()],
        encoder_dict: fitted_codec().await.snapshot()?.encoder_dict,
        input_shape: (4, 1),
    };
    let result = CategoryCodec::from_snapshot(snapshot);
    assert!(matches!(result, Err(CategoryCodecError::InvalidData(_))));
    Ok(())
}

#[tokio::test]
async fn test_malformed_json_is_rejected() -> CategoryCodecResult<()> {
    let result = CategoryCodec::from_json(r#"{"encoding_method": "bogus"}"#);
    assert!(matches!(
        result,
        Err(CategoryCodecError::SerializationError(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_load_missing_file_fails() -> CategoryCodecResult<()> {
    let dir = tempfile::tempdir()?;
    let result = CategoryCodec::load(dir.path().join("missing.json"));
    assert!(matches!(result, Err(CategoryCodecError::IoError(_))));
    Ok(())
}
