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
    notifications::{
        dto::{CreateNotificationRequest, NotificationResponse, UpdateNotificationRequest},
        repo,
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(list_notifications).post(create_notification),
        )
        .route(
            "/notifications/:id",
            get(get_notification)
                .put(update_notification)
                .patch(update_notification)
                .delete(delete_notification),
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
pub async fn list_notifications(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let rows = repo::list(&state.db, scope(&caller)).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, caller))]
pub async fn get_notification(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let row = repo::find(&state.db, id, scope(&caller)).await?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, caller, payload))]
pub async fn create_notification(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<NotificationResponse>), ApiError> {
    payload.validate()?;
    let row = repo::create(
        &state.db,
        caller.id,
        &payload.message,
        &payload.notification_type,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_notification(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateNotificationRequest>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let existing = repo::find(&state.db, id, scope(&caller)).await?;
    let row = repo::update(
        &state.db,
        id,
        scope(&caller),
        payload.message.as_deref().unwrap_or(&existing.message),
        payload
            .notification_type
            .as_deref()
            .unwrap_or(&existing.notification_type),
    )
    .await?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, caller))]
pub async fn delete_notification(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    repo::delete(&state.db, id, scope(&caller)).await?;
    Ok(StatusCode::NO_CONTENT)
}
