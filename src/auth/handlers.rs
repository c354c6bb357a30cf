use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{auth::jwt::JwtKeys, state::AppState};

/// Response of `POST /login`.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Issues an access token for a fresh session. Callers are not
/// authenticated by credentials here.
#[instrument(skip(state))]
pub async fn login(
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let session = Uuid::new_v4();
    let access_token = match keys.sign(session) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "token signing failed".into()));
        }
    };

    info!(session = %session, "token issued");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: keys.ttl.as_secs(),
    }))
}
