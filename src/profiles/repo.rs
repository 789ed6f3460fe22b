use serde_json::json;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::history;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub calorie_goal: i32,
    pub carbs_goal: i32,
    pub protein_goal: i32,
    pub fat_goal: i32,
}

impl Profile {
    /// The goal fields as they are recorded in the audit trail.
    pub fn goals_snapshot(&self) -> serde_json::Value {
        json!({
            "calorie_goal": self.calorie_goal,
            "carbs_goal": self.carbs_goal,
            "protein_goal": self.protein_goal,
            "fat_goal": self.fat_goal,
        })
    }
}

/// Profile joined with the owning user's identity fields.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileWithUser {
    pub id: Uuid,
    pub user_id: Uuid,
    pub calorie_goal: i32,
    pub carbs_goal: i32,
    pub protein_goal: i32,
    pub fat_goal: i32,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: OffsetDateTime,
}

const JOINED_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.calorie_goal, p.carbs_goal, p.protein_goal, p.fat_goal,
           u.username, u.email, u.is_staff, u.is_active, u.date_joined
    FROM profiles p
    JOIN users u ON u.id = p.user_id
"#;

/// `owner = None` lists every profile (admin); otherwise only the owner's.
pub async fn list(
    db: &PgPool,
    owner: Option<Uuid>,
    search: Option<&str>,
) -> Result<Vec<ProfileWithUser>, ApiError> {
    let mut qb = sqlx::QueryBuilder::new(JOINED_SELECT);
    qb.push(" WHERE TRUE");
    if let Some(user_id) = owner {
        qb.push(" AND p.user_id = ").push_bind(user_id);
    }
    if let Some(term) = search {
        qb.push(" AND u.username ILIKE ")
            .push_bind(format!("%{term}%"));
    }
    qb.push(" ORDER BY u.username ASC");
    let rows = qb.build_query_as::<ProfileWithUser>().fetch_all(db).await?;
    Ok(rows)
}

/// Ownership scoping on lookup: a non-admin asking for someone else's
/// profile gets a plain not-found.
pub async fn find(
    db: &PgPool,
    id: Uuid,
    owner: Option<Uuid>,
) -> Result<ProfileWithUser, ApiError> {
    let mut qb = sqlx::QueryBuilder::new(JOINED_SELECT);
    qb.push(" WHERE p.id = ").push_bind(id);
    if let Some(user_id) = owner {
        qb.push(" AND p.user_id = ").push_bind(user_id);
    }
    let row = qb
        .build_query_as::<ProfileWithUser>()
        .fetch_optional(db)
        .await?;
    row.ok_or(ApiError::NotFound)
}

pub async fn update_goals(
    db: &PgPool,
    id: Uuid,
    changed_by: Uuid,
    calorie_goal: i32,
    carbs_goal: i32,
    protein_goal: i32,
    fat_goal: i32,
) -> Result<Profile, ApiError> {
    let mut tx = db.begin().await?;

    let profile = sqlx::query_as::<_, Profile>(
        r#"
        UPDATE profiles
        SET calorie_goal = $2, carbs_goal = $3, protein_goal = $4, fat_goal = $5
        WHERE id = $1
        RETURNING id, user_id, calorie_goal, carbs_goal, protein_goal, fat_goal
        "#,
    )
    .bind(id)
    .bind(calorie_goal)
    .bind(carbs_goal)
    .bind(protein_goal)
    .bind(fat_goal)
    .fetch_one(&mut *tx)
    .await?;

    history::record(
        &mut tx,
        history::PROFILE,
        profile.id,
        Some(changed_by),
        profile.goals_snapshot(),
    )
    .await?;

    tx.commit().await?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goals_snapshot_holds_all_four_goal_fields() {
        let profile = Profile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            calorie_goal: 2000,
            carbs_goal: 250,
            protein_goal: 150,
            fat_goal: 70,
        };
        let snapshot = profile.goals_snapshot();
        assert_eq!(snapshot["calorie_goal"], 2000);
        assert_eq!(snapshot["carbs_goal"], 250);
        assert_eq!(snapshot["protein_goal"], 150);
        assert_eq!(snapshot["fat_goal"], 70);
    }
}
