use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, FieldErrors};
use crate::food_items::repo::FoodItem;
use crate::history::HistoryEntry;
use crate::validate::check_decimal;

#[derive(Debug, Deserialize)]
pub struct CreateFoodItemRequest {
    pub name: String,
    pub calories_per_unit: Decimal,
    pub carbs_per_unit: Decimal,
    pub proteins_per_unit: Decimal,
    pub fats_per_unit: Decimal,
}

impl CreateFoodItemRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.push("name", "This field may not be blank.");
        }
        check_decimal(&mut errors, "calories_per_unit", self.calories_per_unit);
        check_decimal(&mut errors, "carbs_per_unit", self.carbs_per_unit);
        check_decimal(&mut errors, "proteins_per_unit", self.proteins_per_unit);
        check_decimal(&mut errors, "fats_per_unit", self.fats_per_unit);
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateFoodItemRequest {
    pub name: Option<String>,
    pub calories_per_unit: Option<Decimal>,
    pub carbs_per_unit: Option<Decimal>,
    pub proteins_per_unit: Option<Decimal>,
    pub fats_per_unit: Option<Decimal>,
}

impl UpdateFoodItemRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            errors.push("name", "This field may not be blank.");
        }
        for (field, value) in [
            ("calories_per_unit", self.calories_per_unit),
            ("carbs_per_unit", self.carbs_per_unit),
            ("proteins_per_unit", self.proteins_per_unit),
            ("fats_per_unit", self.fats_per_unit),
        ] {
            if let Some(v) = value {
                check_decimal(&mut errors, field, v);
            }
        }
        errors.into_result()
    }
}

/// Catalog entry with its audit trail embedded, newest change first.
#[derive(Debug, Serialize)]
pub struct FoodItemResponse {
    pub id: Uuid,
    pub name: String,
    pub calories_per_unit: Decimal,
    pub carbs_per_unit: Decimal,
    pub proteins_per_unit: Decimal,
    pub fats_per_unit: Decimal,
    pub history: Vec<HistoryEntry>,
}

impl FoodItemResponse {
    pub fn new(item: FoodItem, history: Vec<HistoryEntry>) -> Self {
        Self {
            id: item.id,
            name: item.name,
            calories_per_unit: item.calories_per_unit,
            carbs_per_unit: item.carbs_per_unit,
            proteins_per_unit: item.proteins_per_unit,
            fats_per_unit: item.fats_per_unit,
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CreateFoodItemRequest {
        CreateFoodItemRequest {
            name: "Oats".into(),
            calories_per_unit: Decimal::new(38900, 2), // 389.00
            carbs_per_unit: Decimal::new(6630, 2),     // 66.30
            proteins_per_unit: Decimal::new(1690, 2),  // 16.90
            fats_per_unit: Decimal::new(690, 2),       // 6.90
        }
    }

    #[test]
    fn valid_item_passes() {
        assert!(base_request().validate().is_ok());
    }

    #[test]
    fn negative_per_unit_value_fails_that_field() {
        let mut req = base_request();
        req.fats_per_unit = Decimal::new(-690, 2);
        let ApiError::Validation(fields) = req.validate().unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(fields.contains("fats_per_unit"));
        assert!(!fields.contains("calories_per_unit"));
    }

    #[test]
    fn three_decimal_places_fail() {
        let mut req = base_request();
        req.calories_per_unit = Decimal::new(389123, 3); // 389.123
        let ApiError::Validation(fields) = req.validate().unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(fields.contains("calories_per_unit"));
    }

    #[test]
    fn blank_name_fails() {
        let mut req = base_request();
        req.name = "  ".into();
        assert!(req.validate().is_err());
    }
}
