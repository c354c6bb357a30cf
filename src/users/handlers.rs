use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{auth::jwt::AuthUser, state::AppState};

use super::dto::{CreateUserRequest, ListUsersParams};
use super::error::UserError;
use super::model::User;
use super::service::UserPage;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/get-user/:id", get(get_user))
        .route("/get-users", get(list_users))
        .route("/add-user", post(add_user))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<User>, UserError> {
    state.users.get_by_id(&id).await.map(Json)
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<UserPage>, UserError> {
    state.users.list(params.into()).await.map(Json)
}

#[instrument(skip(state, payload))]
pub async fn add_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), UserError> {
    let input = payload.validate().map_err(|e| {
        warn!(error = %e, "add_user rejected");
        e
    })?;
    let user = state.users.create(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
