use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub message: String,
    pub notification_type: String,
    pub created_at: OffsetDateTime,
}

const JOINED_SELECT: &str = r#"
    SELECT n.id, n.user_id, u.username, n.message, n.notification_type, n.created_at
    FROM notifications n
    JOIN users u ON u.id = n.user_id
"#;

/// `owner = None` is the admin view over all rows.
pub async fn list(db: &PgPool, owner: Option<Uuid>) -> Result<Vec<NotificationRow>, ApiError> {
    let mut qb = sqlx::QueryBuilder::new(JOINED_SELECT);
    if let Some(user_id) = owner {
        qb.push(" WHERE n.user_id = ").push_bind(user_id);
    }
    qb.push(" ORDER BY n.created_at DESC");
    let rows = qb.build_query_as::<NotificationRow>().fetch_all(db).await?;
    Ok(rows)
}

pub async fn find(
    db: &PgPool,
    id: Uuid,
    owner: Option<Uuid>,
) -> Result<NotificationRow, ApiError> {
    let mut qb = sqlx::QueryBuilder::new(JOINED_SELECT);
    qb.push(" WHERE n.id = ").push_bind(id);
    if let Some(user_id) = owner {
        qb.push(" AND n.user_id = ").push_bind(user_id);
    }
    let row = qb
        .build_query_as::<NotificationRow>()
        .fetch_optional(db)
        .await?;
    row.ok_or(ApiError::NotFound)
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    message: &str,
    notification_type: &str,
) -> Result<NotificationRow, ApiError> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO notifications (user_id, message, notification_type)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(message)
    .bind(notification_type)
    .fetch_one(db)
    .await?;
    find(db, id, None).await
}

/// `created_at` is deliberately absent from the SET list: it is immutable
/// after creation.
pub async fn update(
    db: &PgPool,
    id: Uuid,
    owner: Option<Uuid>,
    message: &str,
    notification_type: &str,
) -> Result<NotificationRow, ApiError> {
    let mut qb = sqlx::QueryBuilder::new("UPDATE notifications SET message = ");
    qb.push_bind(message);
    qb.push(", notification_type = ").push_bind(notification_type);
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
    let mut qb = sqlx::QueryBuilder::new("DELETE FROM notifications WHERE id = ");
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
