use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod model;
pub mod telemetry;
pub mod types;

use error::PitWallError;
use model::{LinearModel, PitDecision};
use telemetry::{CarDataQuery, LapQuery, Row, TelemetryProvider};
use types::{PitRequest, PitResponse};

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub mdl: Arc<LinearModel>,
    pub telemetry: Arc<dyn TelemetryProvider>,
}

// ---------- Handlers ----------

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_pit_decision(
    State(state): State<AppState>,
    payload: Result<Json<PitRequest>, JsonRejection>,
) -> Result<Json<PitResponse>, PitWallError> {
    let Json(req) = payload.map_err(|e| PitWallError::InvalidInput(e.body_text()))?;

    let predicted_lap_time = state.mdl.predict(req.race_position, req.track_length);
    let pit_decision = PitDecision::from_lap_time(predicted_lap_time);
    tracing::info!(
        "predict race_position={} track_length={} lap={} -> {:.3}s {:?}",
        req.race_position,
        req.track_length,
        req.current_lap,
        predicted_lap_time,
        pit_decision
    );

    Ok(Json(PitResponse {
        predicted_lap_time,
        pit_decision,
        current_lap: req.current_lap,
    }))
}

async fn pick_lap(
    State(state): State<AppState>,
    query: Result<Query<LapQuery>, QueryRejection>,
) -> Result<Json<Row>, PitWallError> {
    let Query(q) = query.map_err(|e| PitWallError::InvalidInput(e.body_text()))?;
    let lap = telemetry::pick_lap(state.telemetry.as_ref(), &q).await?;
    Ok(Json(lap))
}

async fn get_car_data(
    State(state): State<AppState>,
    query: Result<Query<CarDataQuery>, QueryRejection>,
) -> Result<Json<Vec<Row>>, PitWallError> {
    let Query(q) = query.map_err(|e| PitWallError::InvalidInput(e.body_text()))?;
    let rows = telemetry::car_data(state.telemetry.as_ref(), &q).await?;
    Ok(Json(rows))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/get_pit_decision", post(get_pit_decision))
        .route("/api/pick_lap", get(pick_lap))
        .route("/api/get_car_data", get(get_car_data))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
