use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    Json,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, TokenResponse},
        jwt::JwtKeys,
    },
    error::AppError,
    schema::Field,
    state::AppState,
    users::dto::{is_valid_email, normalize_email},
};

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(payload) = payload?;

    let login = match state.policy().login_field() {
        Field::Email => {
            let email = normalize_email(payload.email.as_deref().unwrap_or_default());
            if !is_valid_email(&email) {
                warn!("login with malformed email");
                return Err(AppError::invalid_input("invalid email"));
            }
            email
        }
        Field::Username => payload.username.as_deref().unwrap_or_default().trim().to_string(),
    };
    if login.is_empty() || payload.password.is_empty() {
        return Err(AppError::invalid_input("invalid input"));
    }

    let user = match state.users.verify_user(&login, &payload.password).await {
        Ok(u) => u,
        Err(e) => {
            warn!("login rejected");
            return Err(e.into());
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let token = match keys.issue(user.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign failed");
            return Err(AppError::Internal);
        }
    };

    info!(user_id = %user.id, "user logged in");
    Ok(Json(TokenResponse { token }))
}
