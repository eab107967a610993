//! HTTP trigger surface for the pipeline and reconciliation

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use paa_pipeline_domain::{
    StoreError, VideoMetadata,
    usecases::{PipelineError, ReconcileError},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::context::{AppPipeline, AppReconciler};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<AppPipeline>,
    reconciler: Arc<AppReconciler>,
    token: Arc<SecretString>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<AppPipeline>,
        reconciler: Arc<AppReconciler>,
        token: SecretString,
    ) -> Self {
        Self {
            pipeline,
            reconciler,
            token: Arc::new(token),
        }
    }
}

/// Build the router; every `/api` route requires the bearer token
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let api = Router::new()
        .route("/items/{id}", delete(delete_item))
        .route("/items/{id}/pipeline", post(run_pipeline))
        .route("/items/{id}/schema", post(generate_schema))
        .route("/items/{id}/embed", post(embed_all_media))
        .route("/items/{id}/podcast", post(publish_podcast))
        .route(
            "/items/{id}/long-video",
            post(upload_long_video).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/items/{id}/refresh", post(refresh_item))
        .route("/cron/reconcile", post(sweep))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == state.token.expose_secret() => next.run(request).await,
        Some(_) => ApiError::new(StatusCode::UNAUTHORIZED, "Invalid token").into_response(),
        None => ApiError::new(
            StatusCode::UNAUTHORIZED,
            "Missing Authorization header. Expected: Bearer <token>",
        )
        .into_response(),
    }
}

/// Error body returned by every handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        let status = match &e {
            PipelineError::NotFound(_) | PipelineError::Store(StoreError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            PipelineError::UnknownClient(_)
            | PipelineError::Precondition(_)
            | PipelineError::NotConfigured(_)
            | PipelineError::Policy(_)
            | PipelineError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            PipelineError::StageFailed { .. } => StatusCode::BAD_GATEWAY,
            PipelineError::Store(_) => {
                tracing::error!(error = %e, "Store error while handling request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, e.to_string())
    }
}

impl From<ReconcileError> for ApiError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Pipeline(e) => e.into(),
            ReconcileError::Store(e) => PipelineError::Store(e).into(),
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn run_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.pipeline.run(id).await?))
}

async fn generate_schema(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.pipeline.generate_schema(id).await?))
}

async fn embed_all_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.pipeline.embed_all_media(id).await?))
}

async fn publish_podcast(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.pipeline.publish_podcast(id).await?))
}

#[derive(Debug, Deserialize)]
struct LongVideoQuery {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    privacy: Option<String>,
}

async fn upload_long_video(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LongVideoQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if body.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Request body is empty"));
    }

    let metadata = VideoMetadata {
        title: query.title,
        description: query.description,
        tags: query
            .tags
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
        privacy: query.privacy.unwrap_or_else(|| "public".to_string()),
    };

    Ok(Json(
        state
            .pipeline
            .upload_long_video(id, body.to_vec(), metadata)
            .await?,
    ))
}

async fn refresh_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.reconciler.refresh_item(id).await?))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.pipeline.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn sweep(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.reconciler.sweep().await?))
}
