use rust_decimal::Decimal;

use crate::error::FieldErrors;

/// Decimal columns are NUMERIC(_, 2): values must be non-negative and carry
/// at most two decimal places.
pub fn check_decimal(errors: &mut FieldErrors, field: &str, value: Decimal) {
    if value.is_sign_negative() && !value.is_zero() {
        errors.push(field, "Ensure this value is greater than or equal to 0.");
    }
    if value.normalize().scale() > 2 {
        errors.push(field, "Ensure that there are no more than 2 decimal places.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_non_negative_two_decimal_places() {
        let mut errors = FieldErrors::new();
        check_decimal(&mut errors, "quantity", Decimal::ZERO);
        check_decimal(&mut errors, "quantity", Decimal::new(125, 1)); // 12.5
        check_decimal(&mut errors, "quantity", Decimal::new(9999, 2)); // 99.99
        assert!(errors.is_empty());
    }

    #[test]
    fn rejects_negative_values() {
        let mut errors = FieldErrors::new();
        check_decimal(&mut errors, "calories_per_unit", Decimal::new(-1, 2)); // -0.01
        assert!(errors.contains("calories_per_unit"));
    }

    #[test]
    fn rejects_more_than_two_decimal_places() {
        let mut errors = FieldErrors::new();
        check_decimal(&mut errors, "quantity", Decimal::new(1234, 3)); // 1.234
        assert!(errors.contains("quantity"));
    }

    #[test]
    fn trailing_zeroes_do_not_count_as_extra_places() {
        let mut errors = FieldErrors::new();
        check_decimal(&mut errors, "quantity", Decimal::new(1200, 3)); // 1.200
        assert!(errors.is_empty());
    }
}
