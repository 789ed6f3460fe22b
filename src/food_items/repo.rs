use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::history;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FoodItem {
    pub id: Uuid,
    pub name: String,
    pub calories_per_unit: Decimal,
    pub carbs_per_unit: Decimal,
    pub proteins_per_unit: Decimal,
    pub fats_per_unit: Decimal,
}

const COLUMNS: &str =
    "id, name, calories_per_unit, carbs_per_unit, proteins_per_unit, fats_per_unit";

fn snapshot(item: &FoodItem) -> Value {
    json!({
        "name": item.name,
        "calories_per_unit": item.calories_per_unit,
        "carbs_per_unit": item.carbs_per_unit,
        "proteins_per_unit": item.proteins_per_unit,
        "fats_per_unit": item.fats_per_unit,
    })
}

/// `name` filters exact, `search` is a substring match; both may combine.
pub async fn list(
    db: &PgPool,
    name: Option<&str>,
    search: Option<&str>,
) -> Result<Vec<FoodItem>, ApiError> {
    let mut qb = sqlx::QueryBuilder::new(format!("SELECT {COLUMNS} FROM food_items WHERE TRUE"));
    if let Some(name) = name {
        qb.push(" AND name = ").push_bind(name);
    }
    if let Some(term) = search {
        qb.push(" AND name ILIKE ").push_bind(format!("%{term}%"));
    }
    qb.push(" ORDER BY name ASC");
    let rows = qb.build_query_as::<FoodItem>().fetch_all(db).await?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: Uuid) -> Result<FoodItem, ApiError> {
    let item = sqlx::query_as::<_, FoodItem>(&format!(
        "SELECT {COLUMNS} FROM food_items WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    item.ok_or(ApiError::NotFound)
}

pub async fn create(
    db: &PgPool,
    changed_by: Uuid,
    name: &str,
    calories: Decimal,
    carbs: Decimal,
    proteins: Decimal,
    fats: Decimal,
) -> Result<FoodItem, ApiError> {
    let mut tx = db.begin().await?;
    let item = sqlx::query_as::<_, FoodItem>(&format!(
        r#"
        INSERT INTO food_items (name, calories_per_unit, carbs_per_unit, proteins_per_unit, fats_per_unit)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(name)
    .bind(calories)
    .bind(carbs)
    .bind(proteins)
    .bind(fats)
    .fetch_one(&mut *tx)
    .await?;

    history::record(
        &mut tx,
        history::FOOD_ITEM,
        item.id,
        Some(changed_by),
        snapshot(&item),
    )
    .await?;

    tx.commit().await?;
    Ok(item)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    changed_by: Uuid,
    name: &str,
    calories: Decimal,
    carbs: Decimal,
    proteins: Decimal,
    fats: Decimal,
) -> Result<FoodItem, ApiError> {
    let mut tx = db.begin().await?;
    let item = sqlx::query_as::<_, FoodItem>(&format!(
        r#"
        UPDATE food_items
        SET name = $2, calories_per_unit = $3, carbs_per_unit = $4,
            proteins_per_unit = $5, fats_per_unit = $6
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(name)
    .bind(calories)
    .bind(carbs)
    .bind(proteins)
    .bind(fats)
    .fetch_one(&mut *tx)
    .await?;

    history::record(
        &mut tx,
        history::FOOD_ITEM,
        item.id,
        Some(changed_by),
        snapshot(&item),
    )
    .await?;

    tx.commit().await?;
    Ok(item)
}

/// Dependent food logs go with the item via ON DELETE CASCADE.
pub async fn delete(db: &PgPool, id: Uuid) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM food_items WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(())
}
