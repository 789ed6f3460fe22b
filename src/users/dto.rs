use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::profiles::dto::ProfileResponse;
use crate::users::repo::User;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Partial update; staff flags and join date stay read-only.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            is_staff: u.is_staff,
            is_active: u.is_active,
            date_joined: u.date_joined,
        }
    }
}

/// Registration payload: the created user, its freshly provisioned profile,
/// and a usable token pair.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub profile: ProfileResponse,
    pub access: String,
    pub refresh: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "ann".into(),
            email: "ann@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            is_staff: false,
            is_active: true,
            date_joined: datetime!(2024-03-01 08:00 UTC),
        }
    }

    #[test]
    fn user_response_never_contains_password_hash() {
        let json = serde_json::to_string(&UserResponse::from(sample_user())).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
        assert!(json.contains("ann@example.com"));
    }

    #[test]
    fn register_response_flattens_user_fields() {
        let user = sample_user();
        let response = RegisterResponse {
            profile: ProfileResponse::from_parts(
                crate::profiles::repo::Profile {
                    id: Uuid::new_v4(),
                    user_id: user.id,
                    calorie_goal: 0,
                    carbs_goal: 0,
                    protein_goal: 0,
                    fat_goal: 0,
                },
                &user,
            ),
            user: user.into(),
            access: "a.a.a".into(),
            refresh: "r.r.r".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["username"], "ann");
        assert_eq!(json["profile"]["calorie_goal"], 0);
        assert_eq!(json["access"], "a.a.a");
    }
}
