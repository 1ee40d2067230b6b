//! HTTP routes: canvas API, relay endpoint and health checks.

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::SharedState;
use crate::ws::ws_handler;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use inkroom_core::storage::{
    CanvasSummary, CreateResponse, LoadResponse, ShareRequest, is_valid_email,
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: SharedState) -> Router {
    let api = Router::new()
        .route("/load/{id}", get(load))
        .route("/list", get(list))
        .route("/shared", get(shared))
        .route("/create", post(create))
        .route("/delete/{id}", delete(remove))
        .route("/share", post(share));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .nest("/api/canvas", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "Inkroom relay server - connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn load(
    State(state): State<SharedState>,
    AuthUser(email): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<LoadResponse>, ApiError> {
    let elements = state.load(&id, &email)?;
    Ok(Json(LoadResponse { elements }))
}

async fn list(
    State(state): State<SharedState>,
    AuthUser(email): AuthUser,
) -> Json<Vec<CanvasSummary>> {
    Json(state.list_owned(&email))
}

async fn shared(
    State(state): State<SharedState>,
    AuthUser(email): AuthUser,
) -> Json<Vec<CanvasSummary>> {
    Json(state.list_shared(&email))
}

async fn create(
    State(state): State<SharedState>,
    AuthUser(email): AuthUser,
) -> Json<CreateResponse> {
    let canvas_id = state.create_canvas(&email);
    tracing::info!("{} created canvas {}", email, canvas_id);
    Json(CreateResponse { canvas_id })
}

async fn remove(
    State(state): State<SharedState>,
    AuthUser(email): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.delete(&id, &email)?;
    tracing::info!("{} deleted canvas {}", email, id);
    Ok(Json(json!({ "message": "Canvas deleted" })))
}

async fn share(
    State(state): State<SharedState>,
    AuthUser(email): AuthUser,
    Json(request): Json<ShareRequest>,
) -> Result<Json<Value>, ApiError> {
    let target = request.email.trim();
    if !is_valid_email(target) {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    state.share(&request.canvas_id, &email, target)?;
    tracing::info!("{} shared canvas {} with {}", email, request.canvas_id, target);
    Ok(Json(json!({ "message": "Canvas shared successfully" })))
}
