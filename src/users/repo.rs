use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::history;
use crate::profiles::repo::Profile;

/// User record in the database. The password hash never leaves the repo
/// layer; responses are built from DTOs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: OffsetDateTime,
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_staff, is_active, date_joined";

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn list(db: &PgPool) -> Result<Vec<User>, ApiError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY date_joined ASC"
        ))
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Registration: the user row and its zero-goal profile commit together.
    pub async fn create_with_profile(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(User, Profile), ApiError> {
        let mut tx: Transaction<'_, Postgres> = db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await?;

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id)
            VALUES ($1)
            RETURNING id, user_id, calorie_goal, carbs_goal, protein_goal, fat_goal
            "#,
        )
        .bind(user.id)
        .fetch_one(&mut *tx)
        .await?;

        // Seed the audit trail so the first goals update diffs against the
        // initial zero-goal state.
        history::record(
            &mut tx,
            history::PROFILE,
            profile.id,
            Some(user.id),
            profile.goals_snapshot(),
        )
        .await?;

        tx.commit().await?;
        Ok((user, profile))
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Dependent profile/log/notification/insight rows go with the user via
    /// ON DELETE CASCADE.
    pub async fn delete(db: &PgPool, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}
