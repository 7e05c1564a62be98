use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    app::method_not_allowed,
    auth::policy::{USERS_PATH, USER_ITEM_PATH},
    state::AppState,
};

pub mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod repo;
pub mod repo_types;
pub mod statement;
pub mod store;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            USERS_PATH,
            post(handlers::create_user)
                .get(handlers::list_users)
                .fallback(method_not_allowed),
        )
        .route(
            USER_ITEM_PATH,
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user)
                .fallback(method_not_allowed),
        )
}
