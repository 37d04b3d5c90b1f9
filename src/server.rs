//! Synchronous HTTP front over the predictor.
//!
//! Two routes: `POST /predict` runs one separation and answers when it is
//! done, `GET /health` answers immediately. Separation work happens on the
//! blocking pool so the runtime stays responsive while the tool runs.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::config::AppConfig;
use crate::error::PredictError;
use crate::predictor::{Predictor, SeparationRequest};

#[derive(Clone)]
struct AppState {
    predictor: Arc<Predictor>,
}

/// Build the service router. Separate from [`run_server`] so tests can bind
/// it to an ephemeral port.
pub fn app(cfg: &AppConfig, predictor: Arc<Predictor>) -> Router {
    let state = AppState { predictor };

    let mut router = Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(cfg.max_request_bytes))
        .with_state(state);

    if cfg.allow_any_origin {
        router = router.layer(CorsLayer::permissive());
    }

    router
}

pub async fn run_server(cfg: AppConfig, predictor: Predictor) -> anyhow::Result<()> {
    let addr: SocketAddr = cfg
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen_addr {}", cfg.listen_addr))?;

    let app = app(&cfg, Arc::new(predictor));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "separation service listening");

    axum::serve(listener, app).await.context("server error")
}

// POST /predict

async fn predict(
    State(st): State<AppState>,
    Json(req): Json<SeparationRequest>,
) -> impl IntoResponse {
    let predictor = st.predictor.clone();
    let joined = tokio::task::spawn_blocking(move || predictor.predict(&req)).await;

    match joined {
        Ok(Ok(resp)) => (StatusCode::OK, Json(resp)).into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "separation request failed");
            let code = match &e {
                PredictError::Decode(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (code, Json(json!({ "error": e.to_string() }))).into_response()
        }
        Err(e) => {
            error!(error = %e, "separation task failed to complete");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}

// GET /health

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
