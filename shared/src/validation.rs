//! Field validators used by request bodies
//!
//! Each function has the `fn(&T) -> Result<(), ValidationError>` shape that
//! `#[validate(custom = "...")]` expects.

use std::borrow::Cow;

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::models::{invalid_measurements, MeasurementValues};

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Decimal places stored for quantities (`NUMERIC(14, 3)`)
pub const QUANTITY_SCALE: u32 = 3;

/// Decimal places stored for money (`NUMERIC(14, 2)`)
pub const MONEY_SCALE: u32 = 2;

/// Largest storable quantity, 99,999,999,999.999
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, QUANTITY_SCALE);

/// Largest storable amount, 999,999,999,999.99
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, MONEY_SCALE);

/// Whether `value` needs more than `scale` decimal places
pub fn exceeds_scale(value: &Decimal, scale: u32) -> bool {
    value.normalize().scale() > scale
}

fn bounded(value: &Decimal, max: Decimal, scale: u32) -> Result<(), ValidationError> {
    if *value > max {
        return Err(error("range", "Value is too large"));
    }
    if exceeds_scale(value, scale) {
        let mut err = error("scale", "Too many decimal places");
        err.add_param(Cow::Borrowed("max_scale"), &scale);
        return Err(err);
    }
    Ok(())
}

/// Quantity strictly greater than zero
pub fn positive_quantity(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(error("positive", "Must be greater than zero"));
    }
    bounded(value, MAX_QUANTITY, QUANTITY_SCALE)
}

/// Quantity of zero or greater
pub fn non_negative_quantity(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(error("non_negative", "Must not be negative"));
    }
    bounded(value, MAX_QUANTITY, QUANTITY_SCALE)
}

/// Money amount of zero or greater
pub fn non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(error("non_negative", "Must not be negative"));
    }
    bounded(value, MAX_AMOUNT, MONEY_SCALE)
}

/// Between 0 and 100 inclusive, at most two decimal places
pub fn percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(error("percentage", "Must be between 0 and 100"));
    }
    if exceeds_scale(value, MONEY_SCALE) {
        return Err(error("scale", "Too many decimal places"));
    }
    Ok(())
}

/// Digits with optional `+`, spaces, dashes and parentheses; 7 to 15 digits
pub fn phone_number(value: &str) -> Result<(), ValidationError> {
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    if !allowed || !(7..=15).contains(&digits) {
        return Err(error("phone", "Invalid phone number"));
    }
    Ok(())
}

/// Not blank after trimming
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "Must not be blank"));
    }
    Ok(())
}

/// Every measurement has a name and a positive value
pub fn measurement_values(values: &MeasurementValues) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Err(error("empty", "At least one measurement is required"));
    }
    let invalid = invalid_measurements(values);
    if !invalid.is_empty() {
        let mut err = error("measurement", "Measurements must be named and positive");
        err.add_param(Cow::Borrowed("fields"), &invalid);
        return Err(err);
    }
    Ok(())
}

/// Settings keys: lowercase letters, digits, `.`, `_` and `-`
pub fn setting_key(value: &str) -> Result<(), ValidationError> {
    let valid = !value.is_empty()
        && value.len() <= 100
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
    if !valid {
        return Err(error(
            "setting_key",
            "Keys use lowercase letters, digits, '.', '_' or '-'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_validators() {
        assert!(positive_quantity(&Decimal::ONE).is_ok());
        assert!(positive_quantity(&Decimal::ZERO).is_err());
        assert!(non_negative_quantity(&Decimal::ZERO).is_ok());
        assert!(non_negative_quantity(&Decimal::NEGATIVE_ONE).is_err());
        assert!(non_negative_amount(&Decimal::NEGATIVE_ONE).is_err());
        assert!(percentage(&Decimal::ONE_HUNDRED).is_ok());
        assert!(percentage(&Decimal::from(101)).is_err());
        assert!(percentage(&Decimal::new(7125, 3)).is_err());
    }

    #[test]
    fn test_storage_limits() {
        assert_eq!(MAX_QUANTITY.to_string(), "99999999999.999");
        assert_eq!(MAX_AMOUNT.to_string(), "999999999999.99");

        assert!(positive_quantity(&MAX_QUANTITY).is_ok());
        assert!(positive_quantity(&Decimal::MAX).is_err());
        assert!(non_negative_amount(&MAX_AMOUNT).is_ok());
        assert!(non_negative_amount(&Decimal::from(1_000_000_000_000i64)).is_err());
    }

    #[test]
    fn test_decimal_places() {
        assert!(positive_quantity(&Decimal::new(125, 3)).is_ok());
        assert!(positive_quantity(&Decimal::new(1255, 4)).is_err());
        // Trailing zeros do not count
        assert!(non_negative_amount(&Decimal::new(12_500, 4)).is_ok());
        assert!(non_negative_amount(&Decimal::new(1005, 3)).is_err());
    }

    #[test]
    fn test_phone_number() {
        assert!(phone_number("+66 81-234-5678").is_ok());
        assert!(phone_number("(02) 123 4567").is_ok());
        assert!(phone_number("12345").is_err());
        assert!(phone_number("081-CALL-NOW").is_err());
    }

    #[test]
    fn test_setting_key() {
        assert!(setting_key("company.name").is_ok());
        assert!(setting_key("tax_rate-default").is_ok());
        assert!(setting_key("Company").is_err());
        assert!(setting_key("").is_err());
    }

    #[test]
    fn test_measurement_values() {
        let mut values = MeasurementValues::new();
        assert!(measurement_values(&values).is_err());
        values.insert("hip".to_string(), Decimal::from(100));
        assert!(measurement_values(&values).is_ok());
        values.insert("sleeve".to_string(), Decimal::NEGATIVE_ONE);
        assert!(measurement_values(&values).is_err());
    }
}
