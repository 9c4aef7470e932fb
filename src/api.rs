// src/api.rs
//! HTTP surface: the capture form, the slider descriptors, the prediction
//! endpoint, and artifact introspection. When the artifact pair failed to
//! load, the service stays up but answers with the offline page and 503s;
//! the form is never rendered against missing artifacts.

use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::error;

use crate::artifacts::ArtifactStore;
use crate::classify::Tier;
use crate::config::ServiceConfig;
use crate::engine::PredictionEngine;
use crate::features::RawSample;
use crate::fields::{FieldSpec, FIELDS};
use crate::metrics::{record_prediction, record_prediction_failure};

const INDEX_HTML: &str = include_str!("../ui/index.html");
const OFFLINE_HTML: &str = include_str!("../ui/offline.html");

#[derive(Clone)]
pub struct AppState {
    engine: Option<PredictionEngine>,
    reveal_delay: Duration,
    loaded_at: Option<DateTime<Utc>>,
}

impl AppState {
    pub fn new(engine: Option<PredictionEngine>, reveal_delay: Duration) -> Self {
        let loaded_at = engine.as_ref().map(|_| Utc::now());
        Self {
            engine,
            reveal_delay,
            loaded_at,
        }
    }

    /// Load the artifact pair once and decide online/offline for the
    /// process lifetime. A failed load is logged and leaves the service in
    /// the offline state; it does not crash the server.
    pub fn boot(cfg: &ServiceConfig) -> Self {
        let store = ArtifactStore::new(cfg.artifacts.clone());
        let engine = match store.load() {
            Ok(artifacts) => Some(PredictionEngine::new(artifacts)),
            Err(e) => {
                error!(error = %e, "artifacts unavailable, serving offline page");
                None
            }
        };
        Self::new(engine, Duration::from_millis(cfg.ui.reveal_delay_ms))
    }

    pub fn is_online(&self) -> bool {
        self.engine.is_some()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "ok" }))
        .route("/fields", get(fields))
        .route("/predict", post(predict))
        .route("/debug/artifacts", get(debug_artifacts))
        .nest_service("/assets", ServeDir::new("ui/assets"))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// The form page, or the offline page when artifacts are unavailable.
async fn index(State(state): State<AppState>) -> Html<&'static str> {
    if state.is_online() {
        Html(INDEX_HTML)
    } else {
        Html(OFFLINE_HTML)
    }
}

async fn fields() -> Json<Vec<FieldSpec>> {
    Json(FIELDS.to_vec())
}

#[derive(Serialize)]
struct PredictResp {
    score: i32,
    tier: Tier,
    label: &'static str,
    detail: &'static str,
    raw_score: f64,
    ts: DateTime<Utc>,
}

#[derive(Serialize)]
struct ApiError {
    error: String,
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiError {
            error: message.into(),
        }),
    )
        .into_response()
}

async fn predict(State(state): State<AppState>, Json(sample): Json<RawSample>) -> Response {
    let Some(engine) = state.engine.as_ref() else {
        return api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "system offline: rating artifacts unavailable",
        );
    };

    // Cosmetic pacing before the reveal; configured to zero in tests.
    if !state.reveal_delay.is_zero() {
        tokio::time::sleep(state.reveal_delay).await;
    }

    match engine.predict(&sample) {
        Ok(p) => {
            record_prediction(p.rating.tier);
            (
                StatusCode::OK,
                Json(PredictResp {
                    score: p.rating.score,
                    tier: p.rating.tier,
                    label: p.rating.tier.label(),
                    detail: p.rating.tier.detail(),
                    raw_score: p.raw_score,
                    ts: Utc::now(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            record_prediction_failure();
            api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
    }
}

#[derive(Serialize)]
struct ArtifactInfo {
    scaler_kind: &'static str,
    model_kind: &'static str,
    scaler_fingerprint: String,
    model_fingerprint: String,
    loaded_at: Option<DateTime<Utc>>,
}

async fn debug_artifacts(State(state): State<AppState>) -> Response {
    match state.engine.as_ref() {
        Some(engine) => {
            let a = engine.artifacts();
            (
                StatusCode::OK,
                Json(ArtifactInfo {
                    scaler_kind: a.scaler.kind(),
                    model_kind: a.model.kind(),
                    scaler_fingerprint: a.scaler_fingerprint.clone(),
                    model_fingerprint: a.model_fingerprint.clone(),
                    loaded_at: state.loaded_at,
                }),
            )
                .into_response()
        }
        None => api_error(StatusCode::SERVICE_UNAVAILABLE, "no artifacts loaded"),
    }
}
