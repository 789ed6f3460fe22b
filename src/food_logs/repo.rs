use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::food_logs::dto::LogOrdering;
use crate::history;

/// Log row joined with owner and food item, everything serialization needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FoodLogRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub food_item_id: Uuid,
    pub food_item_name: String,
    pub calories_per_unit: Decimal,
    pub carbs_per_unit: Decimal,
    pub proteins_per_unit: Decimal,
    pub fats_per_unit: Decimal,
    pub quantity: Decimal,
    pub meal_type: String,
    pub notes: Option<String>,
    pub date_logged: OffsetDateTime,
}

const JOINED_SELECT: &str = r#"
    SELECT l.id, l.user_id, u.username, l.food_item_id, f.name AS food_item_name,
           f.calories_per_unit, f.carbs_per_unit, f.proteins_per_unit, f.fats_per_unit,
           l.quantity, l.meal_type, l.notes, l.date_logged
    FROM food_logs l
    JOIN users u ON u.id = l.user_id
    JOIN food_items f ON f.id = l.food_item_id
"#;

/// List filters; `user_id` is always present — listings are never unscoped.
#[derive(Debug, Default, Clone)]
pub struct LogFilter {
    pub user_id: Uuid,
    pub meal_type: Option<String>,
    pub food_item_name: Option<String>,
    pub search: Option<String>,
    pub window: Option<(OffsetDateTime, OffsetDateTime)>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &LogFilter) {
    qb.push(" WHERE l.user_id = ").push_bind(filter.user_id);
    if let Some(meal_type) = &filter.meal_type {
        qb.push(" AND l.meal_type = ").push_bind(meal_type.clone());
    }
    if let Some(name) = &filter.food_item_name {
        qb.push(" AND f.name = ").push_bind(name.clone());
    }
    if let Some(term) = &filter.search {
        let pattern = format!("%{term}%");
        qb.push(" AND (f.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR l.notes ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some((start, end)) = filter.window {
        qb.push(" AND l.date_logged >= ")
            .push_bind(start)
            .push(" AND l.date_logged < ")
            .push_bind(end);
    }
}

pub async fn list(
    db: &PgPool,
    filter: &LogFilter,
    ordering: LogOrdering,
    limit: i64,
    offset: i64,
) -> Result<Vec<FoodLogRow>, ApiError> {
    let mut qb = QueryBuilder::new(JOINED_SELECT);
    push_filters(&mut qb, filter);
    qb.push(ordering.sql());
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);
    let rows = qb.build_query_as::<FoodLogRow>().fetch_all(db).await?;
    Ok(rows)
}

pub async fn count(db: &PgPool, filter: &LogFilter) -> Result<i64, ApiError> {
    let mut qb = QueryBuilder::new(
        r#"
        SELECT COUNT(*)
        FROM food_logs l
        JOIN users u ON u.id = l.user_id
        JOIN food_items f ON f.id = l.food_item_id
        "#,
    );
    push_filters(&mut qb, filter);
    let count: i64 = qb.build_query_scalar().fetch_one(db).await?;
    Ok(count)
}

pub async fn find(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<FoodLogRow, ApiError> {
    let mut qb = QueryBuilder::new(JOINED_SELECT);
    qb.push(" WHERE l.id = ").push_bind(id);
    qb.push(" AND l.user_id = ").push_bind(user_id);
    let row = qb.build_query_as::<FoodLogRow>().fetch_optional(db).await?;
    row.ok_or(ApiError::NotFound)
}

/// Second line of defense behind the serializer's skew-tolerant check: at
/// save time any strictly-future timestamp is refused.
fn reject_future(date_logged: OffsetDateTime) -> Result<(), ApiError> {
    if date_logged > OffsetDateTime::now_utc() {
        return Err(ApiError::validation(
            "date_logged",
            "The log date cannot be in the future.",
        ));
    }
    Ok(())
}

fn snapshot(log: &FoodLogRow) -> serde_json::Value {
    json!({
        "food_item_id": log.food_item_id,
        "quantity": log.quantity,
        "meal_type": log.meal_type,
        "notes": log.notes,
        "date_logged": log.date_logged.format(&Rfc3339).ok(),
    })
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    food_item_id: Uuid,
    quantity: Decimal,
    meal_type: &str,
    notes: Option<&str>,
    date_logged: Option<OffsetDateTime>,
) -> Result<FoodLogRow, ApiError> {
    let date_logged = date_logged.unwrap_or_else(OffsetDateTime::now_utc);
    reject_future(date_logged)?;

    // The referenced item must exist; surface a field error, not a 404.
    let item_exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM food_items WHERE id = $1)")
            .bind(food_item_id)
            .fetch_one(db)
            .await?;
    if !item_exists {
        return Err(ApiError::validation(
            "food_item_id",
            "Invalid pk - object does not exist.",
        ));
    }

    let mut tx = db.begin().await?;
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO food_logs (user_id, food_item_id, quantity, meal_type, notes, date_logged)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(food_item_id)
    .bind(quantity)
    .bind(meal_type)
    .bind(notes)
    .bind(date_logged)
    .fetch_one(&mut *tx)
    .await?;

    let mut qb = QueryBuilder::new(JOINED_SELECT);
    qb.push(" WHERE l.id = ").push_bind(id);
    let row = qb
        .build_query_as::<FoodLogRow>()
        .fetch_one(&mut *tx)
        .await?;

    history::record(&mut tx, history::FOOD_LOG, row.id, Some(user_id), snapshot(&row)).await?;
    tx.commit().await?;
    Ok(row)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    user_id: Uuid,
    food_item_id: Uuid,
    quantity: Decimal,
    meal_type: &str,
    notes: Option<&str>,
    date_logged: OffsetDateTime,
) -> Result<FoodLogRow, ApiError> {
    reject_future(date_logged)?;

    let mut tx = db.begin().await?;
    let updated = sqlx::query(
        r#"
        UPDATE food_logs
        SET food_item_id = $3, quantity = $4, meal_type = $5, notes = $6, date_logged = $7
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(food_item_id)
    .bind(quantity)
    .bind(meal_type)
    .bind(notes)
    .bind(date_logged)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    let mut qb = QueryBuilder::new(JOINED_SELECT);
    qb.push(" WHERE l.id = ").push_bind(id);
    let row = qb
        .build_query_as::<FoodLogRow>()
        .fetch_one(&mut *tx)
        .await?;

    history::record(&mut tx, history::FOOD_LOG, row.id, Some(user_id), snapshot(&row)).await?;
    tx.commit().await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM food_logs WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(())
}
