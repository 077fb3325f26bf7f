//! Handlers for the `/users` surface: user and role administration.
//!
//! Every route requires the `manageUsers` permission. Passwords arrive in
//! plaintext over the (externally secured) transport and are hashed before
//! they reach the store.

use axum::extract::{Path, State};
use axum::response::Json;
use axum::Extension;
use protocol::{
    permissions, CreateRoleRequest, CreateUserRequest, MessageResponse, UpdateRoleRequest,
    UpdateUserRequest,
};
use tracing::info;

use super::{require_permission, ApiError, AppState};
use crate::auth::{hash_password, Identity, UserRecord, UserUpdate};

/// `POST /users` — add a user.
pub async fn create_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if body.username.is_empty() || body.password.is_empty() || body.role.is_empty() {
        return Err(ApiError::Validation(
            "missing username, password, or role".to_string(),
        ));
    }
    require_permission(&state, &identity, permissions::MANAGE_USERS)?;

    let hashed_password =
        hash_password(&body.password).map_err(|e| ApiError::Internal(e.to_string()))?;
    state.store.add_user(UserRecord {
        username: body.username.clone(),
        hashed_password,
        role: body.role,
    })?;

    info!(by = identity.username(), username = %body.username, "user added");
    Ok(Json(MessageResponse::new("User added successfully")))
}

/// `PATCH /users/{username}` — update password and/or role.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(username): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_permission(&state, &identity, permissions::MANAGE_USERS)?;

    let hashed_password = match body.password.as_deref() {
        Some(password) if !password.is_empty() => {
            Some(hash_password(password).map_err(|e| ApiError::Internal(e.to_string()))?)
        }
        _ => None,
    };

    state.store.update_user(
        &username,
        UserUpdate {
            hashed_password,
            role: body.role,
        },
    )?;

    info!(by = identity.username(), %username, "user updated");
    Ok(Json(MessageResponse::new("User updated successfully")))
}

/// `DELETE /users/{username}` — remove a user.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_permission(&state, &identity, permissions::MANAGE_USERS)?;

    state.store.remove_user(&username)?;

    info!(by = identity.username(), %username, "user deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// `POST /users/roles` — add a role.
pub async fn create_role(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateRoleRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if body.role.is_empty() {
        return Err(ApiError::Validation(
            "missing role or permissions array".to_string(),
        ));
    }
    require_permission(&state, &identity, permissions::MANAGE_USERS)?;

    state.store.add_role(&body.role, body.permissions)?;

    info!(by = identity.username(), role = %body.role, "role added");
    Ok(Json(MessageResponse::new("Role added successfully")))
}

/// `PATCH /users/roles/{role}` — replace a role's permission set.
pub async fn update_role(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(role): Path<String>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_permission(&state, &identity, permissions::MANAGE_USERS)?;

    state.store.update_role(&role, body.permissions)?;

    info!(by = identity.username(), %role, "role updated");
    Ok(Json(MessageResponse::new("Role updated successfully")))
}

/// `DELETE /users/roles/{role}` — remove a role.
pub async fn delete_role(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(role): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_permission(&state, &identity, permissions::MANAGE_USERS)?;

    state.store.remove_role(&role)?;

    info!(by = identity.username(), %role, "role removed");
    Ok(Json(MessageResponse::new("Role removed successfully")))
}
