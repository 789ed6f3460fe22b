use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::{ApiError, FieldErrors};
use crate::food_logs::repo::FoodLogRow;
use crate::validate::check_decimal;

/// Client clocks drift; accept logs stamped up to this far ahead of now.
pub const CLOCK_SKEW_TOLERANCE: Duration = Duration::minutes(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn parse(value: &str) -> Option<MealType> {
        match value {
            "breakfast" => Some(MealType::Breakfast),
            "lunch" => Some(MealType::Lunch),
            "dinner" => Some(MealType::Dinner),
            "snack" => Some(MealType::Snack),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

/// `meal_type` and `date_logged` arrive as raw strings so a bad value
/// surfaces as a field-keyed error instead of a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct CreateFoodLogRequest {
    pub food_item_id: Uuid,
    pub quantity: Decimal,
    pub meal_type: String,
    pub notes: Option<String>,
    pub date_logged: Option<String>,
}

impl CreateFoodLogRequest {
    pub fn validate(
        &self,
        now: OffsetDateTime,
    ) -> Result<(MealType, Option<OffsetDateTime>), ApiError> {
        let mut errors = FieldErrors::new();
        check_decimal(&mut errors, "quantity", self.quantity);
        let meal_type = check_meal_type(&mut errors, &self.meal_type);
        let date_logged = check_date_logged(&mut errors, self.date_logged.as_deref(), now);
        match (meal_type, errors.is_empty()) {
            (Some(mt), true) => Ok((mt, date_logged)),
            _ => Err(ApiError::Validation(errors)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateFoodLogRequest {
    pub food_item_id: Option<Uuid>,
    pub quantity: Option<Decimal>,
    pub meal_type: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub date_logged: Option<String>,
}

impl UpdateFoodLogRequest {
    pub fn validate(
        &self,
        now: OffsetDateTime,
    ) -> Result<(Option<MealType>, Option<OffsetDateTime>), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(q) = self.quantity {
            check_decimal(&mut errors, "quantity", q);
        }
        let meal_type = match self.meal_type.as_deref() {
            Some(raw) => check_meal_type(&mut errors, raw),
            None => None,
        };
        let date_logged = check_date_logged(&mut errors, self.date_logged.as_deref(), now);
        errors.into_result()?;
        Ok((meal_type, date_logged))
    }
}

/// Keeps an explicit `null` apart from an absent field, so `null` can clear
/// the stored value.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn check_meal_type(errors: &mut FieldErrors, raw: &str) -> Option<MealType> {
    match MealType::parse(raw) {
        Some(mt) => Some(mt),
        None => {
            errors.push("meal_type", format!("\"{raw}\" is not a valid choice."));
            None
        }
    }
}

fn check_date_logged(
    errors: &mut FieldErrors,
    raw: Option<&str>,
    now: OffsetDateTime,
) -> Option<OffsetDateTime> {
    let raw = raw?;
    match OffsetDateTime::parse(raw, &Rfc3339) {
        Ok(d) => {
            if d > now + CLOCK_SKEW_TOLERANCE {
                errors.push("date_logged", "The log date cannot be in the future.");
            }
            Some(d)
        }
        Err(_) => {
            errors.push(
                "date_logged",
                "Datetime has wrong format. Use the RFC 3339 format.",
            );
            None
        }
    }
}

/// Log entry with totals derived fresh from the current food-item values.
#[derive(Debug, Serialize)]
pub struct FoodLogResponse {
    pub id: Uuid,
    pub username: String,
    pub food_item_name: String,
    pub quantity: Decimal,
    pub meal_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_logged: OffsetDateTime,
    pub notes: Option<String>,
    pub total_calories: Decimal,
    pub total_carbs: Decimal,
    pub total_proteins: Decimal,
    pub total_fats: Decimal,
}

/// Quantity is in the item's base-100 units.
pub fn total(quantity: Decimal, per_unit: Decimal) -> Decimal {
    quantity / Decimal::ONE_HUNDRED * per_unit
}

impl From<FoodLogRow> for FoodLogResponse {
    fn from(r: FoodLogRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            food_item_name: r.food_item_name,
            meal_type: r.meal_type,
            date_logged: r.date_logged,
            notes: r.notes,
            total_calories: total(r.quantity, r.calories_per_unit),
            total_carbs: total(r.quantity, r.carbs_per_unit),
            total_proteins: total(r.quantity, r.proteins_per_unit),
            total_fats: total(r.quantity, r.fats_per_unit),
            quantity: r.quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOrdering {
    DateLoggedAsc,
    DateLoggedDesc,
    FoodItemNameAsc,
    FoodItemNameDesc,
}

impl LogOrdering {
    /// DRF-style `ordering=` values; anything unrecognized falls back to the
    /// default ascending `date_logged`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("-date_logged") => LogOrdering::DateLoggedDesc,
            Some("food_item__name") => LogOrdering::FoodItemNameAsc,
            Some("-food_item__name") => LogOrdering::FoodItemNameDesc,
            _ => LogOrdering::DateLoggedAsc,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            LogOrdering::DateLoggedAsc => " ORDER BY l.date_logged ASC",
            LogOrdering::DateLoggedDesc => " ORDER BY l.date_logged DESC",
            LogOrdering::FoodItemNameAsc => " ORDER BY f.name ASC",
            LogOrdering::FoodItemNameDesc => " ORDER BY f.name DESC",
        }
    }
}

pub fn parse_day(value: &str, field: &str) -> Result<Date, ApiError> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|_| ApiError::validation(field, "Date has wrong format. Use YYYY-MM-DD."))
}

/// `[day 00:00, day+1 00:00)` in UTC.
pub fn day_window(day: Date) -> (OffsetDateTime, OffsetDateTime) {
    let start = day.midnight().assume_utc();
    (start, start + Duration::days(1))
}

/// `[start 00:00, end+1 00:00)` — the end date's full day is included.
pub fn range_window(start: Date, end: Date) -> (OffsetDateTime, OffsetDateTime) {
    (
        start.midnight().assume_utc(),
        end.midnight().assume_utc() + Duration::days(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn totals_scale_per_unit_values_by_quantity_over_100() {
        // 150g of an item with 389.00 kcal per 100g.
        let quantity = Decimal::new(15000, 2);
        let per_unit = Decimal::new(38900, 2);
        assert_eq!(total(quantity, per_unit), Decimal::new(58350, 2)); // 583.50
    }

    #[test]
    fn zero_quantity_yields_zero_totals() {
        assert_eq!(
            total(Decimal::ZERO, Decimal::new(38900, 2)),
            Decimal::ZERO
        );
    }

    fn create_request(meal_type: &str, date_logged: Option<String>) -> CreateFoodLogRequest {
        CreateFoodLogRequest {
            food_item_id: Uuid::new_v4(),
            quantity: Decimal::new(100, 0),
            meal_type: meal_type.to_string(),
            notes: None,
            date_logged,
        }
    }

    #[test]
    fn date_logged_within_tolerance_passes() {
        let now = datetime!(2024-03-01 12:00 UTC);
        let stamp = (now + Duration::minutes(4)).format(&Rfc3339).unwrap();
        let req = create_request("lunch", Some(stamp));
        let (meal_type, date_logged) = req.validate(now).unwrap();
        assert_eq!(meal_type, MealType::Lunch);
        assert_eq!(date_logged, Some(now + Duration::minutes(4)));
    }

    #[test]
    fn date_logged_beyond_tolerance_fails() {
        let now = datetime!(2024-03-01 12:00 UTC);
        let stamp = (now + Duration::minutes(6)).format(&Rfc3339).unwrap();
        let req = create_request("lunch", Some(stamp));
        let ApiError::Validation(fields) = req.validate(now).unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(fields.contains("date_logged"));
    }

    #[test]
    fn invalid_meal_type_is_a_field_error() {
        let now = datetime!(2024-03-01 12:00 UTC);
        let body = serde_json::json!({
            "food_item_id": Uuid::new_v4(),
            "quantity": 100,
            "meal_type": "brunch",
        });
        // The body still deserializes; the bad choice is caught in validation.
        let req: CreateFoodLogRequest = serde_json::from_value(body).unwrap();
        let ApiError::Validation(fields) = req.validate(now).unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(fields.contains("meal_type"));
    }

    #[test]
    fn unparseable_date_logged_is_a_field_error() {
        let now = datetime!(2024-03-01 12:00 UTC);
        let req = create_request("dinner", Some("next tuesday".into()));
        let ApiError::Validation(fields) = req.validate(now).unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(fields.contains("date_logged"));
    }

    #[test]
    fn update_notes_distinguishes_null_from_absent() {
        let absent: UpdateFoodLogRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(absent.notes, None);

        let cleared: UpdateFoodLogRequest = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(cleared.notes, Some(None));

        let set: UpdateFoodLogRequest =
            serde_json::from_str(r#"{"notes": "post-run"}"#).unwrap();
        assert_eq!(set.notes, Some(Some("post-run".to_string())));
    }

    #[test]
    fn day_window_is_half_open() {
        let (start, end) = day_window(date!(2024 - 03 - 01));
        assert_eq!(start, datetime!(2024-03-01 00:00 UTC));
        assert_eq!(end, datetime!(2024-03-02 00:00 UTC));
        // A log at 08:00 that day is in; one at 23:00 the next day is out.
        let first = datetime!(2024-03-01 08:00 UTC);
        let second = datetime!(2024-03-02 23:00 UTC);
        assert!(first >= start && first < end);
        assert!(!(second >= start && second < end));
    }

    #[test]
    fn range_window_includes_full_end_day() {
        let (start, end) = range_window(date!(2024 - 03 - 01), date!(2024 - 03 - 02));
        let first = datetime!(2024-03-01 08:00 UTC);
        let second = datetime!(2024-03-02 23:00 UTC);
        assert!(first >= start && first < end);
        assert!(second >= start && second < end);
        assert_eq!(end, datetime!(2024-03-03 00:00 UTC));
    }

    #[test]
    fn ordering_parses_drf_values_and_defaults() {
        assert_eq!(LogOrdering::parse(None), LogOrdering::DateLoggedAsc);
        assert_eq!(
            LogOrdering::parse(Some("-date_logged")),
            LogOrdering::DateLoggedDesc
        );
        assert_eq!(
            LogOrdering::parse(Some("food_item__name")),
            LogOrdering::FoodItemNameAsc
        );
        assert_eq!(
            LogOrdering::parse(Some("bogus")),
            LogOrdering::DateLoggedAsc
        );
    }

    #[test]
    fn meal_type_round_trips_lowercase() {
        let mt = MealType::parse("breakfast").unwrap();
        assert_eq!(mt, MealType::Breakfast);
        assert_eq!(mt.as_str(), "breakfast");
        assert!(MealType::parse("brunch").is_none());
    }

    #[test]
    fn bad_day_string_is_a_field_error() {
        let err = parse_day("03/01/2024", "date").unwrap_err();
        let ApiError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.contains("date"));
    }
}
