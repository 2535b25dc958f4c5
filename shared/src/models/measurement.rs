//! Customer body measurement models

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unit all values of a measurement sheet are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum MeasurementUnit {
    #[default]
    Cm,
    Inch,
}

/// Named measurement values, e.g. `{"chest": 96.5, "waist": 82}`
pub type MeasurementValues = BTreeMap<String, Decimal>;

/// Names of entries that are blank or not strictly positive
pub fn invalid_measurements(values: &MeasurementValues) -> Vec<String> {
    values
        .iter()
        .filter(|(name, value)| name.trim().is_empty() || **value <= Decimal::ZERO)
        .map(|(name, _)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_measurements() {
        let mut values = MeasurementValues::new();
        values.insert("chest".to_string(), Decimal::from(96));
        values.insert("waist".to_string(), Decimal::ZERO);
        values.insert(" ".to_string(), Decimal::ONE);

        assert_eq!(invalid_measurements(&values), vec![" ".to_string(), "waist".to_string()]);
    }
}
