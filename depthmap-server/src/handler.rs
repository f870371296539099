use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use depthmap::{FrameStats, QueryService, RenderRequest, RenderedFrame, SqliteRowStore};
use serde_json::{json, Value};
use tokio::task::spawn_blocking;
use tracing::error;

pub type Service = Arc<Mutex<QueryService<SqliteRowStore>>>;

pub struct AppError(anyhow::Error);
pub type AppResult<T> = Result<T, AppError>;

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        if let Some(e) = self.0.downcast_ref::<depthmap::Error>() {
            if e.is_bad_request() {
                return StatusCode::BAD_REQUEST;
            }
            if e.is_not_found() {
                return StatusCode::NOT_FOUND;
            }
        }
        if self.0.downcast_ref::<QueryRejection>().is_some() {
            return StatusCode::BAD_REQUEST;
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(err = ?self.0);
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Depth Image API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn image_frame(
    State(service): State<Service>,
    request: Result<Query<RenderRequest>, QueryRejection>,
) -> AppResult<Response> {
    let Query(request) = request?;
    let filename = format!(
        "inline; filename=depth_{:?}_{:?}.png",
        request.depth_min, request.depth_max
    );
    let frame = render(service, request).await?;
    let headers = [
        (header::CONTENT_TYPE, frame.content_type.to_owned()),
        (header::CONTENT_DISPOSITION, filename),
    ];
    Ok((headers, frame.bytes).into_response())
}

pub async fn image_frame_base64(
    State(service): State<Service>,
    request: Result<Query<RenderRequest>, QueryRejection>,
) -> AppResult<String> {
    let Query(request) = request?;
    let frame = render(service, request).await?;
    Ok(STANDARD.encode(frame.bytes))
}

pub async fn frame_stats(
    State(service): State<Service>,
    request: Result<Query<RenderRequest>, QueryRejection>,
) -> AppResult<Json<FrameStats>> {
    let Query(request) = request?;
    let stats = spawn_blocking(move || -> anyhow::Result<_> {
        Ok(lock(&service)?.frame_stats(&request)?)
    })
    .await??;
    Ok(Json(stats))
}

async fn render(service: Service, request: RenderRequest) -> AppResult<RenderedFrame> {
    let frame = spawn_blocking(move || -> anyhow::Result<_> {
        Ok(lock(&service)?.render_frame(&request)?)
    })
    .await??;
    Ok(frame)
}

fn lock(
    service: &Service,
) -> anyhow::Result<std::sync::MutexGuard<'_, QueryService<SqliteRowStore>>> {
    service
        .lock()
        .map_err(|_| anyhow!("query service lock poisoned"))
}
