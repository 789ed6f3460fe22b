use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, FieldErrors};
use crate::insights::repo::InsightRow;

#[derive(Debug, Deserialize)]
pub struct CreateInsightRequest {
    pub insight_type: String,
    pub value: String,
}

impl CreateInsightRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if self.insight_type.is_empty() {
            errors.push("insight_type", "This field may not be blank.");
        }
        if self.value.is_empty() {
            errors.push("value", "This field may not be blank.");
        }
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateInsightRequest {
    pub insight_type: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InsightResponse {
    pub id: Uuid,
    pub username: String,
    pub insight_type: String,
    pub value: String,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

impl From<InsightRow> for InsightResponse {
    fn from(r: InsightRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            insight_type: r.insight_type,
            value: r.value,
            generated_at: r.generated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn response_serializes_owner_and_timestamp() {
        let response = InsightResponse::from(InsightRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            username: "ann".into(),
            insight_type: "weekly_average".into(),
            value: "1850".into(),
            generated_at: datetime!(2024-03-01 08:00 UTC),
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["username"], "ann");
        assert_eq!(json["generated_at"], "2024-03-01T08:00:00Z");
        assert!(json.get("user_id").is_none());
    }

    #[test]
    fn blank_fields_fail_validation() {
        let req = CreateInsightRequest {
            insight_type: "".into(),
            value: "x".into(),
        };
        let ApiError::Validation(fields) = req.validate().unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(fields.contains("insight_type"));
    }
}
