//! Passthrough HTTP API.
//!
//! Each route delegates verbatim to the matching provider client; errors are
//! rendered through [`GatewayError`](crate::error::GatewayError)'s
//! `IntoResponse` implementation.

use crate::client::{TaskClient, UserClient};
use crate::domain::{Task, User};
use crate::error::GatewayResult;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

/// Shared handler state.
#[derive(Debug)]
pub struct AppState {
    /// Task provider client
    pub tasks: TaskClient,
    /// User provider client
    pub users: UserClient,
}

/// Build the gateway router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/task", get(list_tasks))
        .route("/api/task/{id}", get(get_task))
        .route("/api/user", get(list_users))
        .route("/api/user/{id}", get(get_user))
        .with_state(state)
}

async fn list_tasks(State(state): State<Arc<AppState>>) -> GatewayResult<Json<Vec<Task>>> {
    state.tasks.fetch_all().await.map(Json)
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> GatewayResult<Json<Task>> {
    state.tasks.fetch_by_id(&id).await.map(Json)
}

async fn list_users(State(state): State<Arc<AppState>>) -> GatewayResult<Json<Vec<User>>> {
    state.users.fetch_all().await.map(Json)
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> GatewayResult<Json<User>> {
    state.users.fetch_by_id(&id).await.map(Json)
}
