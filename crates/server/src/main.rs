use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use server_api::{
    classifier::{Classifier, MissingClassifier, StaticClassifier},
    list_objects, load_object, predict, store_object, ApiContext,
};
use shared::{
    domain::{BucketName, DEFAULT_CONTENT_TYPE},
    error::{ApiError, ErrorCode},
    protocol::{get_prediction_route, PredictionQuery, PredictionResponse, StoredObjectSummary},
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url, Settings};

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext {
        storage,
        bucket: BucketName::new(settings.bucket.clone()),
        max_upload_bytes: settings.max_upload_bytes,
        classifier: classifier_from_settings(&settings),
    };

    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, bucket = %settings.bucket, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn classifier_from_settings(settings: &Settings) -> Arc<dyn Classifier> {
    match settings.classifier_label.as_deref() {
        Some(label) => match StaticClassifier::for_label(label) {
            Some(classifier) => {
                info!(label = classifier.label(), "using static classifier");
                Arc::new(classifier)
            }
            None => {
                warn!(label, "unknown classifier label; predictions are disabled");
                Arc::new(MissingClassifier)
            }
        },
        None => {
            warn!("no classifier configured; prediction requests will report unavailable");
            Arc::new(MissingClassifier)
        }
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.api.max_upload_bytes;
    Router::new()
        .route("/healthz", get(healthz))
        .route("/buckets/:bucket/objects", get(http_list_objects))
        .route(
            "/buckets/:bucket/objects/:key",
            get(http_get_object).put(http_put_object),
        )
        .route(get_prediction_route(), get(http_get_prediction))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCode::UnprocessableImage => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_failure(error: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = status_for(error.code);
    if status.is_server_error() {
        error!(code = ?error.code, message = %error.message, "request failed");
    }
    (status, Json(error))
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.api.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            error!(%error, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "storage unavailable")
        }
    }
}

async fn http_put_object(
    State(state): State<Arc<AppState>>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<StoredObjectSummary>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let summary = store_object(
        &state.api,
        &BucketName::new(bucket),
        &key,
        content_type,
        &body,
    )
    .await
    .map_err(api_failure)?;
    Ok(Json(summary))
}

async fn http_get_object(
    State(state): State<Arc<AppState>>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let object = load_object(&state.api, &BucketName::new(bucket), &key)
        .await
        .map_err(api_failure)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&object.summary.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );
    Ok((StatusCode::OK, headers, object.body))
}

async fn http_list_objects(
    State(state): State<Arc<AppState>>,
    Path(bucket): Path<String>,
) -> ApiResult<Json<Vec<StoredObjectSummary>>> {
    let objects = list_objects(&state.api, &BucketName::new(bucket))
        .await
        .map_err(api_failure)?;
    Ok(Json(objects))
}

async fn http_get_prediction(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PredictionQuery>,
) -> ApiResult<Json<PredictionResponse>> {
    let response = predict(&state.api, q.key.as_deref())
        .await
        .map_err(api_failure)?;
    Ok(Json(response))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
