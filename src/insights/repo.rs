use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InsightRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub insight_type: String,
    pub value: String,
    pub generated_at: OffsetDateTime,
}

const JOINED_SELECT: &str = r#"
    SELECT i.id, i.user_id, u.username, i.insight_type, i.value, i.generated_at
    FROM insights i
    JOIN users u ON u.id = i.user_id
"#;

pub async fn list(db: &PgPool, owner: Option<Uuid>) -> Result<Vec<InsightRow>, ApiError> {
    let mut qb = sqlx::QueryBuilder::new(JOINED_SELECT);
    if let Some(user_id) = owner {
        qb.push(" WHERE i.user_id = ").push_bind(user_id);
    }
    qb.push(" ORDER BY i.generated_at DESC");
    let rows = qb.build_query_as::<InsightRow>().fetch_all(db).await?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: Uuid, owner: Option<Uuid>) -> Result<InsightRow, ApiError> {
    let mut qb = sqlx::QueryBuilder::new(JOINED_SELECT);
    qb.push(" WHERE i.id = ").push_bind(id);
    if let Some(user_id) = owner {
        qb.push(" AND i.user_id = ").push_bind(user_id);
    }
    let row = qb.build_query_as::<InsightRow>().fetch_optional(db).await?;
    row.ok_or(ApiError::NotFound)
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    insight_type: &str,
    value: &str,
) -> Result<InsightRow, ApiError> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO insights (user_id, insight_type, value)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(insight_type)
    .bind(value)
    .fetch_one(db)
    .await?;
    find(db, id, None).await
}

/// `generated_at` never appears in the SET list: immutable after creation.
pub async fn update(
    db: &PgPool,
    id: Uuid,
    owner: Option<Uuid>,
    insight_type: &str,
    value: &str,
) -> Result<InsightRow, ApiError> {
    let mut qb = sqlx::QueryBuilder::new("UPDATE insights SET insight_type = ");
    qb.push_bind(insight_type);
    qb.push(", value = ").push_bind(value);
    qb.push(" WHERE id = ").push_bind(id);
    if let Some(user_id) = owner {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    let result = qb.build().execute(db).await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }
    find(db, id, None).await
}

pub async fn delete(db: &PgPool, id: Uuid, owner: Option<Uuid>) -> Result<(), ApiError> {
    let mut qb = sqlx::QueryBuilder::new("DELETE FROM insights WHERE id = ");
    qb.push_bind(id);
    if let Some(user_id) = owner {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    let result = qb.build().execute(db).await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(())
}
