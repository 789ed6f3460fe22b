use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiJson, ApiQuery},
    profiles::{
        dto::{ProfileResponse, UpdateProfileRequest},
        repo,
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profiles", get(list_profiles))
        .route(
            "/profiles/:id",
            get(get_profile).put(update_profile).patch(update_profile),
        )
}

#[derive(Debug, Deserialize)]
pub struct ProfileListQuery {
    pub search: Option<String>,
}

fn scope(caller: &AuthUser) -> Option<Uuid> {
    if caller.is_staff {
        None
    } else {
        Some(caller.id)
    }
}

#[instrument(skip(state, caller))]
pub async fn list_profiles(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiQuery(query): ApiQuery<ProfileListQuery>,
) -> Result<Json<Vec<ProfileResponse>>, ApiError> {
    let rows = repo::list(&state.db, scope(&caller), query.search.as_deref()).await?;
    Ok(Json(rows.into_iter().map(ProfileResponse::from).collect()))
}

#[instrument(skip(state, caller))]
pub async fn get_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let row = repo::find(&state.db, id, scope(&caller)).await?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    payload.validate()?;

    let existing = repo::find(&state.db, id, scope(&caller)).await?;
    let updated = repo::update_goals(
        &state.db,
        id,
        caller.id,
        payload.calorie_goal.unwrap_or(existing.calorie_goal),
        payload.carbs_goal.unwrap_or(existing.carbs_goal),
        payload.protein_goal.unwrap_or(existing.protein_goal),
        payload.fat_goal.unwrap_or(existing.fat_goal),
    )
    .await?;

    Ok(Json(ProfileResponse {
        user_id: existing.user_id,
        id: updated.id,
        username: existing.username,
        email: existing.email,
        is_staff: existing.is_staff,
        is_active: existing.is_active,
        date_joined: existing.date_joined,
        calorie_goal: updated.calorie_goal,
        carbs_goal: updated.carbs_goal,
        protein_goal: updated.protein_goal,
        fat_goal: updated.fat_goal,
    }))
}
