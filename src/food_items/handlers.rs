use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiJson, ApiQuery},
    food_items::{
        dto::{CreateFoodItemRequest, FoodItemResponse, UpdateFoodItemRequest},
        repo,
    },
    history,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/food_items", get(list_food_items).post(create_food_item))
        .route(
            "/food_items/:id",
            get(get_food_item)
                .put(update_food_item)
                .patch(update_food_item)
                .delete(delete_food_item),
        )
}

#[derive(Debug, Deserialize)]
pub struct FoodItemListQuery {
    pub name: Option<String>,
    pub search: Option<String>,
}

async fn with_history(
    state: &AppState,
    item: repo::FoodItem,
) -> Result<FoodItemResponse, ApiError> {
    let trail = history::for_entity(&state.db, history::FOOD_ITEM, item.id).await?;
    Ok(FoodItemResponse::new(item, trail))
}

/// Catalog reads are open to anonymous callers.
#[instrument(skip(state))]
pub async fn list_food_items(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FoodItemListQuery>,
) -> Result<Json<Vec<FoodItemResponse>>, ApiError> {
    let items = repo::list(&state.db, query.name.as_deref(), query.search.as_deref()).await?;
    let mut responses = Vec::with_capacity(items.len());
    for item in items {
        responses.push(with_history(&state, item).await?);
    }
    Ok(Json(responses))
}

#[instrument(skip(state))]
pub async fn get_food_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FoodItemResponse>, ApiError> {
    let item = repo::find(&state.db, id).await?;
    Ok(Json(with_history(&state, item).await?))
}

#[instrument(skip(state, caller, payload))]
pub async fn create_food_item(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateFoodItemRequest>,
) -> Result<(StatusCode, Json<FoodItemResponse>), ApiError> {
    payload.validate()?;
    let item = repo::create(
        &state.db,
        caller.id,
        payload.name.trim(),
        payload.calories_per_unit,
        payload.carbs_per_unit,
        payload.proteins_per_unit,
        payload.fats_per_unit,
    )
    .await?;
    info!(item_id = %item.id, name = %item.name, "food item created");
    Ok((StatusCode::CREATED, Json(with_history(&state, item).await?)))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_food_item(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateFoodItemRequest>,
) -> Result<Json<FoodItemResponse>, ApiError> {
    payload.validate()?;
    let existing = repo::find(&state.db, id).await?;
    let item = repo::update(
        &state.db,
        id,
        caller.id,
        payload
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.name),
        payload.calories_per_unit.unwrap_or(existing.calories_per_unit),
        payload.carbs_per_unit.unwrap_or(existing.carbs_per_unit),
        payload
            .proteins_per_unit
            .unwrap_or(existing.proteins_per_unit),
        payload.fats_per_unit.unwrap_or(existing.fats_per_unit),
    )
    .await?;
    Ok(Json(with_history(&state, item).await?))
}

#[instrument(skip(state, caller))]
pub async fn delete_food_item(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    repo::delete(&state.db, id).await?;
    info!(item_id = %id, user_id = %caller.id, "food item deleted");
    Ok(StatusCode::NO_CONTENT)
}
