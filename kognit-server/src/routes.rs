//! HTTP surface of the persistence service.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/api/health` | Liveness |
//! | POST | `/api/users` | Register a user |
//! | POST | `/api/game/result` | Store a finished session |
//! | GET | `/api/game/history` | Caller's latest games |
//! | GET | `/api/game/stats` | Caller's aggregates |
//! | GET | `/api/leaderboard` | Best score per user |
//! | GET | `/api/leaderboard/my-rank` | Caller's position |
//! | POST | `/api/ai/analyze` | Proxy to the analysis service |
//! | GET | `/api/auth/profile` | Caller's account |
//! | GET | `/api/admin/users` | All users with game counts (admin) |
//! | POST | `/api/admin/users` | Create a user with any role (admin) |
//! | DELETE | `/api/admin/users/{id}` | Delete a user and their games (admin) |
//! | GET | `/api/admin/users/{id}/stats` | Per-game chart series (admin) |
//!
//! Callers identify themselves with the `x-user-id` header.

use crate::error::StoreError;
use crate::store::{DEFAULT_LEADERBOARD_LIMIT, NewUser, Store, User};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use kognit_client::{AnalysisOutcome, AnalysisRequest, AnalysisService, GameResultPayload, USER_HEADER};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub analyzer: Arc<dyn AnalysisService>,
}

impl AppState {
    pub fn new(store: Arc<Store>, analyzer: Arc<dyn AnalysisService>) -> Self {
        Self { store, analyzer }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/users", post(register))
        .route("/api/game/result", post(save_result))
        .route("/api/game/history", get(history))
        .route("/api/game/stats", get(stats))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/leaderboard/my-rank", get(my_rank))
        .route("/api/ai/analyze", post(analyze))
        .route("/api/auth/profile", get(profile))
        .route("/api/admin/users", get(list_users).post(create_user))
        .route("/api/admin/users/{id}", delete(delete_user))
        .route("/api/admin/users/{id}/stats", get(user_stats))
        .with_state(state)
}

fn caller_user(parts: &Parts, store: &Store) -> Result<User, StoreError> {
    let id = parts
        .headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or(StoreError::Unauthenticated)?;
    store.user(id).ok_or(StoreError::Unauthenticated)
}

/// Registered user named by the `x-user-id` header
pub struct Caller(pub u64);

impl FromRequestParts<AppState> for Caller {
    type Rejection = StoreError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        caller_user(parts, &state.store).map(|user| Caller(user.id))
    }
}

/// Caller holding the admin role; 401 for unknown callers, 403 for others.
pub struct AdminCaller(pub u64);

impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = StoreError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = caller_user(parts, &state.store)?;
        if !user.is_admin() {
            warn!(user = user.id, "admin route refused");
            return Err(StoreError::Forbidden);
        }
        Ok(AdminCaller(user.id))
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

async fn register(
    State(state): State<AppState>,
    Json(form): Json<NewUser>,
) -> Result<impl IntoResponse, StoreError> {
    // self-registration always yields a plain user
    let user = state.store.register(NewUser { role: None, ..form })?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": user,
        })),
    ))
}

async fn profile(
    State(state): State<AppState>,
    Caller(user_id): Caller,
) -> Result<impl IntoResponse, StoreError> {
    let user = state.store.user(user_id).ok_or(StoreError::NotFound)?;
    Ok(Json(json!({ "user": user })))
}

async fn list_users(State(state): State<AppState>, _admin: AdminCaller) -> impl IntoResponse {
    Json(json!({ "users": state.store.list_users() }))
}

async fn create_user(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Json(form): Json<NewUser>,
) -> Result<impl IntoResponse, StoreError> {
    let user = state.store.register(form)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created",
            "user": user,
        })),
    ))
}

async fn delete_user(
    State(state): State<AppState>,
    AdminCaller(admin_id): AdminCaller,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, StoreError> {
    state.store.delete_user(admin_id, id)?;
    Ok(Json(json!({ "message": "User deleted" })))
}

async fn user_stats(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, StoreError> {
    Ok(Json(state.store.user_chart(id)?))
}

async fn save_result(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Json(payload): Json<GameResultPayload>,
) -> Result<impl IntoResponse, StoreError> {
    let game = state.store.save_result(user_id, payload)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Game result saved",
            "gameId": game.id,
            "cognitiveScore": game.result.cognitive_score,
            "game": game,
        })),
    ))
}

async fn history(State(state): State<AppState>, Caller(user_id): Caller) -> impl IntoResponse {
    Json(json!({ "games": state.store.history(user_id) }))
}

async fn stats(State(state): State<AppState>, Caller(user_id): Caller) -> impl IntoResponse {
    Json(state.store.stats(user_id))
}

#[derive(Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> impl IntoResponse {
    let limit = query
        .limit
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    Json(json!({ "leaderboard": state.store.leaderboard(limit) }))
}

async fn my_rank(State(state): State<AppState>, Caller(user_id): Caller) -> impl IntoResponse {
    match state.store.rank(user_id) {
        Some(rank) => Json(serde_json::to_value(rank).unwrap_or_default()),
        None => Json(json!({ "rank": null, "message": "No games played yet" })),
    }
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<impl IntoResponse, StoreError> {
    match state.analyzer.analyze(&request).await {
        Ok(AnalysisOutcome::Ok(analysis)) => {
            Ok(Json(json!({ "success": true, "analysis": analysis })))
        }
        Ok(AnalysisOutcome::Err { message }) => Err(StoreError::Analysis(message)),
        Err(err) => {
            warn!(error = %err, "analysis service unreachable");
            Err(StoreError::Analysis("Failed to connect to AI service".into()))
        }
    }
}
