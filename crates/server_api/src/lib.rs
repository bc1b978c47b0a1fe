use std::sync::Arc;

use shared::{
    domain::{BucketName, ObjectKey, DEFAULT_CONTENT_TYPE},
    error::{ApiError, ErrorCode},
    protocol::{PredictionResponse, StoredObjectSummary},
};
use storage::{Storage, StoredObject};
use tracing::{info, warn};

pub mod classifier;
pub mod preprocess;

use classifier::{predicted_category, Classifier, ClassifierError};

pub const MAX_OBJECT_KEY_BYTES: usize = 255;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub bucket: BucketName,
    pub max_upload_bytes: usize,
    pub classifier: Arc<dyn Classifier>,
}

/// Keys are stored exactly as given, so `" apple.jpg"` and `"apple.jpg"` are
/// distinct objects.
pub fn validate_object_key(key: &str) -> Result<ObjectKey, ApiError> {
    if key.trim().is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "object key cannot be empty",
        ));
    }
    if key.len() > MAX_OBJECT_KEY_BYTES {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!("object key exceeds {MAX_OBJECT_KEY_BYTES} bytes"),
        ));
    }
    if key.contains('/') || key.contains('\\') {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "object key must not contain path separators",
        ));
    }
    Ok(ObjectKey::new(key))
}

fn ensure_known_bucket(ctx: &ApiContext, bucket: &BucketName) -> Result<(), ApiError> {
    if *bucket != ctx.bucket {
        return Err(ApiError::new(
            ErrorCode::NotFound,
            format!("bucket '{bucket}' does not exist"),
        ));
    }
    Ok(())
}

pub async fn store_object(
    ctx: &ApiContext,
    bucket: &BucketName,
    raw_key: &str,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<StoredObjectSummary, ApiError> {
    ensure_known_bucket(ctx, bucket)?;
    if body.is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "object body cannot be empty",
        ));
    }
    if body.len() > ctx.max_upload_bytes {
        return Err(ApiError::new(
            ErrorCode::PayloadTooLarge,
            format!("object exceeds {} bytes", ctx.max_upload_bytes),
        ));
    }
    let key = validate_object_key(raw_key)?;
    let content_type = content_type
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    let summary = ctx
        .storage
        .put_object(bucket, &key, content_type, body)
        .await
        .map_err(internal)?;
    info!(
        %bucket,
        %key,
        revision = summary.revision,
        size_bytes = summary.size_bytes,
        "objects: stored"
    );
    Ok(summary)
}

pub async fn list_objects(
    ctx: &ApiContext,
    bucket: &BucketName,
) -> Result<Vec<StoredObjectSummary>, ApiError> {
    ensure_known_bucket(ctx, bucket)?;
    ctx.storage.list_objects(bucket).await.map_err(internal)
}

pub async fn load_object(
    ctx: &ApiContext,
    bucket: &BucketName,
    raw_key: &str,
) -> Result<StoredObject, ApiError> {
    ensure_known_bucket(ctx, bucket)?;
    let key = validate_object_key(raw_key)?;
    ctx.storage
        .load_object(bucket, &key)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "object not found"))
}

/// Classifies the most recently stored object in the configured bucket, or
/// the object named by `key` when given.
pub async fn predict(ctx: &ApiContext, key: Option<&str>) -> Result<PredictionResponse, ApiError> {
    let object = match key {
        Some(raw_key) => load_object(ctx, &ctx.bucket, raw_key).await?,
        None => ctx
            .storage
            .latest_object(&ctx.bucket)
            .await
            .map_err(internal)?
            .ok_or_else(|| {
                ApiError::new(ErrorCode::NotFound, "no objects found in the bucket")
            })?,
    };

    let object_key = object.summary.key.clone();
    let classifier = Arc::clone(&ctx.classifier);
    let label = tokio::task::spawn_blocking(move || {
        classify_image_bytes(classifier.as_ref(), &object.body)
    })
    .await
    .map_err(|e| ApiError::new(ErrorCode::Internal, format!("classification task failed: {e}")))??;

    info!(key = %object_key, prediction = %label, "prediction: computed");
    Ok(PredictionResponse {
        prediction: label,
        object_key: Some(object_key),
    })
}

pub fn classify_image_bytes(classifier: &dyn Classifier, bytes: &[u8]) -> Result<String, ApiError> {
    let image = image::load_from_memory(bytes).map_err(|e| {
        ApiError::new(
            ErrorCode::UnprocessableImage,
            format!("object is not a decodable image: {e}"),
        )
    })?;
    let input = preprocess::model_input_for(&image);
    let scores = classifier.classify(&input).map_err(classifier_error)?;
    predicted_category(&scores)
        .map(str::to_string)
        .ok_or_else(|| ApiError::new(ErrorCode::Internal, "classifier produced no usable scores"))
}

fn classifier_error(error: ClassifierError) -> ApiError {
    warn!(%error, "prediction: classifier failed");
    let code = match error {
        ClassifierError::Unavailable(_) => ErrorCode::Unavailable,
        ClassifierError::ShapeMismatch { .. } | ClassifierError::Inference(_) => {
            ErrorCode::Internal
        }
    };
    ApiError::new(code, error.to_string())
}

fn internal(error: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, error.to_string())
}
