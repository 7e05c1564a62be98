use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use tracing::{debug, info, instrument};

use crate::{
    auth::gate::AuthUser,
    error::AppError,
    schema::UserId,
    state::AppState,
    users::{
        dto::{check_fields, CreateUserRequest, MessageResponse, UpdateUserRequest},
        repo_types::{NewUser, User, UserPatch},
    },
};

fn parse_user_id(state: &AppState, raw: &str) -> Result<UserId, AppError> {
    if raw.is_empty() {
        return Err(AppError::NotFound);
    }
    state
        .policy()
        .id_kind()
        .parse_id(raw)
        .ok_or_else(|| AppError::invalid_input("invalid user ID"))
}

/// POST /api/users (public: account self-registration)
#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(CreateUserRequest {
        mut username,
        mut email,
        password,
    }) = payload?;

    check_fields(state.policy(), &mut username, &mut email)?;
    let new_user = NewUser::new(state.policy(), username, email, password)?;
    let user = state.users.create_user(new_user).await?;

    info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<User>>, AppError> {
    let users = state.users.get_users().await?;
    debug!(requested_by = %caller, count = users.len(), "listed users");
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<User>, AppError> {
    let Path(id) = path?;
    let id = parse_user_id(&state, &id)?;
    let user = state.users.get_user_by_id(id).await?;
    debug!(user_id = %id, requested_by = %caller, "fetched user");
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let Path(id) = path?;
    let id = parse_user_id(&state, &id)?;
    let Json(UpdateUserRequest {
        mut username,
        mut email,
    }) = payload?;

    check_fields(state.policy(), &mut username, &mut email)?;
    let patch = UserPatch::new(state.policy(), username, email)?;
    let user = state.users.update_user(id, patch).await?;

    info!(user_id = %user.id, updated_by = %caller, "user updated");
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = path?;
    let id = parse_user_id(&state, &id)?;
    state.users.delete_user(id).await?;

    info!(user_id = %id, deleted_by = %caller, "user deleted");
    Ok(Json(MessageResponse {
        message: "user deleted",
    }))
}
