use axum::{routing::post, Router};

use crate::state::AppState;

mod dto;
pub mod gate;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod policy;

pub fn router() -> Router<AppState> {
    Router::new().route(
        policy::LOGIN_PATH,
        post(handlers::login).fallback(crate::app::method_not_allowed),
    )
}
