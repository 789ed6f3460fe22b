use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiJson},
    insights::{
        dto::{CreateInsightRequest, InsightResponse, UpdateInsightRequest},
        repo,
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/insights", get(list_insights).post(create_insight))
        .route(
            "/insights/:id",
            get(get_insight)
                .put(update_insight)
                .patch(update_insight)
                .delete(delete_insight),
        )
}

fn scope(caller: &AuthUser) -> Option<Uuid> {
    if caller.is_staff {
        None
    } else {
        Some(caller.id)
    }
}

#[instrument(skip(state, caller))]
pub async fn list_insights(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<InsightResponse>>, ApiError> {
    let rows = repo::list(&state.db, scope(&caller)).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, caller))]
pub async fn get_insight(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<InsightResponse>, ApiError> {
    let row = repo::find(&state.db, id, scope(&caller)).await?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, caller, payload))]
pub async fn create_insight(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateInsightRequest>,
) -> Result<(StatusCode, Json<InsightResponse>), ApiError> {
    payload.validate()?;
    let row = repo::create(&state.db, caller.id, &payload.insight_type, &payload.value).await?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_insight(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateInsightRequest>,
) -> Result<Json<InsightResponse>, ApiError> {
    let existing = repo::find(&state.db, id, scope(&caller)).await?;
    let row = repo::update(
        &state.db,
        id,
        scope(&caller),
        payload
            .insight_type
            .as_deref()
            .unwrap_or(&existing.insight_type),
        payload.value.as_deref().unwrap_or(&existing.value),
    )
    .await?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, caller))]
pub async fn delete_insight(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    repo::delete(&state.db, id, scope(&caller)).await?;
    Ok(StatusCode::NO_CONTENT)
}
