use axum::{
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiJson, ApiQuery},
    food_logs::{
        dto::{
            day_window, parse_day, range_window, CreateFoodLogRequest, FoodLogResponse,
            LogOrdering, UpdateFoodLogRequest,
        },
        repo::{self, LogFilter},
    },
    pagination::{Page, PageQuery},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/food_logs", get(list_food_logs).post(create_food_log))
        .route(
            "/food_logs/:id",
            get(get_food_log)
                .put(update_food_log)
                .patch(update_food_log)
                .delete(delete_food_log),
        )
}

#[derive(Debug, Deserialize)]
pub struct FoodLogListQuery {
    pub meal_type: Option<String>,
    pub food_item: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl FoodLogListQuery {
    /// `date` wins over the range pair; the pair only applies when both ends
    /// are present.
    fn window(
        &self,
    ) -> Result<Option<(time::OffsetDateTime, time::OffsetDateTime)>, ApiError> {
        if let Some(date) = &self.date {
            return Ok(Some(day_window(parse_day(date, "date")?)));
        }
        if let (Some(start), Some(end)) = (&self.start_date, &self.end_date) {
            return Ok(Some(range_window(
                parse_day(start, "start_date")?,
                parse_day(end, "end_date")?,
            )));
        }
        Ok(None)
    }

    fn filter(&self, user_id: Uuid) -> Result<LogFilter, ApiError> {
        Ok(LogFilter {
            user_id,
            meal_type: self.meal_type.clone(),
            food_item_name: self.food_item.clone(),
            search: self.search.clone(),
            window: self.window()?,
        })
    }
}

/// Listings are always scoped to the caller, admin or not.
#[instrument(skip(state, caller))]
pub async fn list_food_logs(
    State(state): State<AppState>,
    caller: AuthUser,
    OriginalUri(uri): OriginalUri,
    ApiQuery(query): ApiQuery<FoodLogListQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Json<Page<FoodLogResponse>>, ApiError> {
    let filter = query.filter(caller.id)?;
    let ordering = LogOrdering::parse(query.ordering.as_deref());

    let count = repo::count(&state.db, &filter).await?;
    let rows = repo::list(&state.db, &filter, ordering, page.size(), page.offset()).await?;
    let results = rows.into_iter().map(FoodLogResponse::from).collect();

    Ok(Json(Page::new(&uri, &page, count, results)))
}

#[instrument(skip(state, caller))]
pub async fn get_food_log(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FoodLogResponse>, ApiError> {
    debug!(log_id = %id, "retrieving food log");
    let row = repo::find(&state.db, id, caller.id).await?;
    Ok(Json(row.into()))
}

/// The log's owner is the requester; a client-supplied owner is never read.
#[instrument(skip(state, caller, payload))]
pub async fn create_food_log(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateFoodLogRequest>,
) -> Result<(StatusCode, Json<FoodLogResponse>), ApiError> {
    let (meal_type, date_logged) = payload.validate(time::OffsetDateTime::now_utc())?;

    let row = repo::create(
        &state.db,
        caller.id,
        payload.food_item_id,
        payload.quantity,
        meal_type.as_str(),
        payload.notes.as_deref(),
        date_logged,
    )
    .await?;

    info!(log_id = %row.id, user_id = %caller.id, "food log created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_food_log(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateFoodLogRequest>,
) -> Result<Json<FoodLogResponse>, ApiError> {
    debug!(log_id = %id, "updating food log");
    let (meal_type, date_logged) = payload.validate(time::OffsetDateTime::now_utc())?;

    let existing = repo::find(&state.db, id, caller.id).await?;
    let meal_type = meal_type
        .map(|m| m.as_str().to_string())
        .unwrap_or(existing.meal_type);
    // An explicit null clears the notes; an absent field keeps them.
    let notes = match payload.notes {
        Some(value) => value,
        None => existing.notes,
    };

    let row = repo::update(
        &state.db,
        id,
        caller.id,
        payload.food_item_id.unwrap_or(existing.food_item_id),
        payload.quantity.unwrap_or(existing.quantity),
        &meal_type,
        notes.as_deref(),
        date_logged.unwrap_or(existing.date_logged),
    )
    .await?;

    Ok(Json(row.into()))
}

#[instrument(skip(state, caller))]
pub async fn delete_food_log(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    debug!(log_id = %id, "deleting food log");
    repo::delete(&state.db, id, caller.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn query(
        date: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> FoodLogListQuery {
        FoodLogListQuery {
            meal_type: None,
            food_item: None,
            search: None,
            ordering: None,
            date: date.map(Into::into),
            start_date: start.map(Into::into),
            end_date: end.map(Into::into),
        }
    }

    #[test]
    fn no_date_params_means_no_window() {
        assert!(query(None, None, None).window().unwrap().is_none());
    }

    #[test]
    fn date_param_takes_precedence_over_range() {
        let q = query(Some("2024-03-01"), Some("2024-02-01"), Some("2024-02-02"));
        let (start, end) = q.window().unwrap().unwrap();
        assert_eq!(start, datetime!(2024-03-01 00:00 UTC));
        assert_eq!(end, datetime!(2024-03-02 00:00 UTC));
    }

    #[test]
    fn range_needs_both_ends() {
        assert!(query(None, Some("2024-03-01"), None)
            .window()
            .unwrap()
            .is_none());
        let (start, end) = query(None, Some("2024-03-01"), Some("2024-03-02"))
            .window()
            .unwrap()
            .unwrap();
        assert_eq!(start, datetime!(2024-03-01 00:00 UTC));
        assert_eq!(end, datetime!(2024-03-03 00:00 UTC));
    }

    #[test]
    fn malformed_date_is_rejected() {
        assert!(query(Some("yesterday"), None, None).window().is_err());
    }
}
