use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, FieldErrors};
use crate::profiles::repo::{Profile, ProfileWithUser};
use crate::users::repo::User;

/// Profile plus read-only owner identity fields.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
    pub calorie_goal: i32,
    pub carbs_goal: i32,
    pub protein_goal: i32,
    pub fat_goal: i32,
}

impl ProfileResponse {
    pub fn from_parts(profile: Profile, user: &User) -> Self {
        Self {
            user_id: user.id,
            id: profile.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_staff: user.is_staff,
            is_active: user.is_active,
            date_joined: user.date_joined,
            calorie_goal: profile.calorie_goal,
            carbs_goal: profile.carbs_goal,
            protein_goal: profile.protein_goal,
            fat_goal: profile.fat_goal,
        }
    }
}

impl From<ProfileWithUser> for ProfileResponse {
    fn from(p: ProfileWithUser) -> Self {
        Self {
            user_id: p.user_id,
            id: p.id,
            username: p.username,
            email: p.email,
            is_staff: p.is_staff,
            is_active: p.is_active,
            date_joined: p.date_joined,
            calorie_goal: p.calorie_goal,
            carbs_goal: p.carbs_goal,
            protein_goal: p.protein_goal,
            fat_goal: p.fat_goal,
        }
    }
}

/// Partial goal update; absent fields keep their current value.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub calorie_goal: Option<i32>,
    pub carbs_goal: Option<i32>,
    pub protein_goal: Option<i32>,
    pub fat_goal: Option<i32>,
}

impl UpdateProfileRequest {
    /// Every goal must be a non-negative integer; violations come back
    /// field-keyed.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        for (field, value) in [
            ("calorie_goal", self.calorie_goal),
            ("carbs_goal", self.carbs_goal),
            ("protein_goal", self.protein_goal),
            ("fat_goal", self.fat_goal),
        ] {
            if matches!(value, Some(v) if v < 0) {
                errors.push(field, "Ensure this value is greater than or equal to 0.");
            }
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_goals_fail_per_field() {
        let update = UpdateProfileRequest {
            calorie_goal: Some(-1),
            carbs_goal: Some(250),
            protein_goal: None,
            fat_goal: Some(-5),
        };
        let err = update.validate().unwrap_err();
        let ApiError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.contains("calorie_goal"));
        assert!(fields.contains("fat_goal"));
        assert!(!fields.contains("carbs_goal"));
    }

    #[test]
    fn zero_and_positive_goals_pass() {
        let update = UpdateProfileRequest {
            calorie_goal: Some(0),
            carbs_goal: Some(300),
            protein_goal: None,
            fat_goal: None,
        };
        assert!(update.validate().is_ok());
    }
}
