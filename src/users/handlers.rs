use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::AuthUser,
        services::{hash_password, is_valid_email, JwtKeys},
    },
    error::{ApiError, ApiJson, FieldErrors},
    profiles::dto::ProfileResponse,
    state::AppState,
    users::{
        dto::{CreateUserRequest, RegisterResponse, UpdateUserRequest, UserResponse},
        repo::User,
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(register))
        .route(
            "/users/:id",
            get(get_user)
                .put(update_user)
                .patch(update_user)
                .delete(delete_user),
        )
}

/// Trimmed username to store, plus whether it differs from the current one.
fn merged_username(requested: Option<&str>, current: &str) -> (String, bool) {
    match requested {
        Some(raw) => {
            let trimmed = raw.trim().to_string();
            let changed = trimmed != current;
            (trimmed, changed)
        }
        None => (current.to_string(), false),
    }
}

async fn validate_registration(
    state: &AppState,
    payload: &CreateUserRequest,
) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    if payload.username.is_empty() {
        errors.push("username", "This field may not be blank.");
    } else if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        errors.push("username", "A user with that username already exists.");
    }
    if !is_valid_email(&payload.email) {
        errors.push("email", "Enter a valid email address.");
    }
    if payload.password.len() < 8 {
        errors.push("password", "Password too short");
    }
    errors.into_result()
}

/// Open self-registration: creates the user and a zero-goal profile in one
/// transaction and hands back a token pair.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    validate_registration(&state, &payload).await?;

    let hash = hash_password(&payload.password)?;
    let (user, profile) =
        User::create_with_profile(&state.db, &payload.username, &payload.email, &hash).await?;

    let keys = JwtKeys::from_ref(&state);
    let access = keys.sign_access(user.id)?;
    let refresh = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    let profile = ProfileResponse::from_parts(profile, &user);
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: user.into(),
            profile,
            access,
            refresh,
        }),
    ))
}

#[instrument(skip(state, caller))]
pub async fn list_users(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    caller.require_staff()?;
    let users = User::list(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[instrument(skip(state, caller))]
pub async fn get_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    caller.require_staff()?;
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    caller.require_staff()?;
    let existing = User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let (username, username_changed) =
        merged_username(payload.username.as_deref(), &existing.username);
    let email = payload
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_else(|| existing.email.clone());

    let mut errors = FieldErrors::new();
    if username.is_empty() {
        errors.push("username", "This field may not be blank.");
    }
    if !is_valid_email(&email) {
        errors.push("email", "Enter a valid email address.");
    }
    if let Some(p) = &payload.password {
        if p.len() < 8 {
            errors.push("password", "Password too short");
        }
    }
    errors.into_result()?;

    if username_changed && User::find_by_username(&state.db, &username).await?.is_some() {
        return Err(ApiError::validation(
            "username",
            "A user with that username already exists.",
        ));
    }

    let password_hash = match payload.password {
        Some(p) => hash_password(&p)?,
        None => existing.password_hash,
    };

    let user = User::update(&state.db, id, &username, &email, &password_hash).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, caller))]
pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    caller.require_staff()?;
    User::delete(&state.db, id).await?;
    info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_username_keeps_current_and_marks_unchanged() {
        let (name, changed) = merged_username(None, "ann");
        assert_eq!(name, "ann");
        assert!(!changed);
    }

    #[test]
    fn requested_username_is_trimmed_and_marks_changed() {
        let (name, changed) = merged_username(Some("  bob "), "ann");
        assert_eq!(name, "bob");
        assert!(changed);
    }

    #[test]
    fn same_username_after_trim_is_not_a_rename() {
        let (name, changed) = merged_username(Some(" ann "), "ann");
        assert_eq!(name, "ann");
        assert!(!changed);
    }
}
