use crate::state::AppState;
use axum::Router;

mod claims;
mod cookies;
mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
#[cfg(test)]
pub(crate) mod memory;
mod middleware;
mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
mod tokens;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
        .merge(handlers::admin_routes(state))
}
