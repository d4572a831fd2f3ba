use crate::config::Listener;
use crate::engine::AggregationEngine;
use crate::errors::BuildError;
use crate::types::ArtistRecord;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug)]
pub enum ServeError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Clone)]
struct ApiState {
    engine: AggregationEngine,
    build_timeout: Option<Duration>,
}

pub fn router(engine: AggregationEngine, build_timeout: Option<Duration>) -> Router {
    Router::new()
        .route("/api/artist/{id}", get(artist_handler))
        .with_state(ApiState {
            engine,
            build_timeout,
        })
}

/// Serve the artist API on an already bound listener.
pub async fn serve(listener: TcpListener, app: Router) -> Result<(), ServeError> {
    tracing::info!("Artist API listening on {:?}", listener.local_addr().ok());
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn bind(listener: &Listener) -> Result<TcpListener, ServeError> {
    let addr = format!("{}:{}", listener.host, listener.port);
    Ok(TcpListener::bind(addr).await?)
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("artist build did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

async fn artist_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ArtistRecord>, ApiError> {
    let build = state.engine.build(&id);

    // Timing out drops the build, which aborts its outstanding lookups.
    let record = match state.build_timeout {
        Some(limit) => tokio::time::timeout(limit, build)
            .await
            .map_err(|_| ApiError::DeadlineExceeded(limit))??,
        None => build.await?,
    };

    Ok(Json(record))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Build(BuildError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Build(BuildError::Upstream(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Build(BuildError::Parse(_)) => StatusCode::BAD_GATEWAY,
            ApiError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        };

        let body = Json(ApiErrorResponse {
            error_message: self.to_string(),
        });

        (status, body).into_response()
    }
}
