use crate::state::AppState;
use axum::Router;

mod dto;
pub mod error;
pub mod handlers;
#[cfg(test)]
pub(crate) mod memory;
pub mod model;
pub mod pg;
pub mod seed;
pub mod service;
pub mod store;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
