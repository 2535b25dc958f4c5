//! Sequential human-readable codes
//!
//! Every coded entity owns a namespace made of a fixed prefix and a
//! fixed-width numeric suffix (`CUST0001`, `MAT0042`). Purchase orders use a
//! monthly namespace (`PO202401-0001`) so the sequence restarts each month.
//!
//! Because prefix and width are fixed inside a namespace, the lexicographic
//! maximum of the existing codes is also the numeric maximum.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// Width of the numeric suffix for every namespace
pub const SEQUENCE_WIDTH: usize = 4;

/// Errors raised while deriving codes
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodeError {
    #[error("code '{code}' does not belong to namespace '{prefix}'")]
    PrefixMismatch { code: String, prefix: String },

    #[error("code '{0}' does not end in a numeric sequence")]
    InvalidSuffix(String),

    #[error("sequence for '{prefix}' cannot grow past {width} digits")]
    Exhausted { prefix: String, width: usize },
}

/// Entity types that receive a generated code at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeKind {
    Customer,
    Supplier,
    Machine,
    Material,
    Measurement,
    PurchaseOrder,
}

impl CodeKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            CodeKind::Customer => "CUST",
            CodeKind::Supplier => "SUP",
            CodeKind::Machine => "MCH",
            CodeKind::Material => "MAT",
            CodeKind::Measurement => "MSR",
            CodeKind::PurchaseOrder => "PO",
        }
    }

    /// Whether the namespace is partitioned by calendar month
    pub fn is_monthly(&self) -> bool {
        matches!(self, CodeKind::PurchaseOrder)
    }

    /// The namespace a new code falls into on `date`
    ///
    /// For flat namespaces this is the bare prefix; for monthly namespaces it
    /// is `prefix + YYYY + MM + "-"`.
    pub fn scope(&self, date: NaiveDate) -> String {
        if self.is_monthly() {
            monthly_prefix(self.prefix(), date)
        } else {
            self.prefix().to_string()
        }
    }

    /// Sequence number of an existing code from the namespace of `date`
    pub fn sequence_of(&self, date: NaiveDate, code: &str) -> Result<u32, CodeError> {
        let scope = self.scope(date);
        if !code.starts_with(&scope) {
            return Err(CodeError::PrefixMismatch {
                code: code.to_string(),
                prefix: scope,
            });
        }
        if self.is_monthly() {
            parse_trailing_sequence(code, SEQUENCE_WIDTH)
        } else {
            parse_sequence(code, &scope)
        }
    }

    /// Render sequence number `sequence` in the namespace of `date`
    pub fn render(&self, date: NaiveDate, sequence: u32) -> Result<String, CodeError> {
        format_code(&self.scope(date), SEQUENCE_WIDTH, sequence)
    }

    /// Derive the next code on `date` given the last code of the namespace
    pub fn next_code(&self, date: NaiveDate, last: Option<&str>) -> Result<String, CodeError> {
        if self.is_monthly() {
            next_monthly_code(self.prefix(), date, last)
        } else {
            next_code(self.prefix(), SEQUENCE_WIDTH, last)
        }
    }
}

/// Sub-prefix for a month-scoped namespace, e.g. `PO202401-`
pub fn monthly_prefix(prefix: &str, date: NaiveDate) -> String {
    format!("{}{:04}{:02}-", prefix, date.year(), date.month())
}

/// Render `prefix` followed by `sequence` zero-padded to `width`
pub fn format_code(prefix: &str, width: usize, sequence: u32) -> Result<String, CodeError> {
    let digits = sequence.to_string();
    if digits.len() > width {
        return Err(CodeError::Exhausted {
            prefix: prefix.to_string(),
            width,
        });
    }
    Ok(format!("{}{:0>width$}", prefix, digits, width = width))
}

/// Parse the numeric part of `code` after stripping `prefix`
pub fn parse_sequence(code: &str, prefix: &str) -> Result<u32, CodeError> {
    let suffix = code
        .strip_prefix(prefix)
        .ok_or_else(|| CodeError::PrefixMismatch {
            code: code.to_string(),
            prefix: prefix.to_string(),
        })?;
    parse_digits(code, suffix)
}

/// Parse the trailing `width` digits of `code`
pub fn parse_trailing_sequence(code: &str, width: usize) -> Result<u32, CodeError> {
    let start = code
        .len()
        .checked_sub(width)
        .ok_or_else(|| CodeError::InvalidSuffix(code.to_string()))?;
    let suffix = code
        .get(start..)
        .ok_or_else(|| CodeError::InvalidSuffix(code.to_string()))?;
    parse_digits(code, suffix)
}

fn parse_digits(code: &str, digits: &str) -> Result<u32, CodeError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodeError::InvalidSuffix(code.to_string()));
    }
    digits
        .parse::<u32>()
        .map_err(|_| CodeError::InvalidSuffix(code.to_string()))
}

/// Next code in a flat namespace
///
/// `last` is the lexicographically greatest existing code, `None` when the
/// namespace is empty.
pub fn next_code(prefix: &str, width: usize, last: Option<&str>) -> Result<String, CodeError> {
    let current = match last {
        Some(code) => parse_sequence(code, prefix)?,
        None => 0,
    };
    format_code(prefix, width, current + 1)
}

/// Next code in the monthly namespace that contains `date`
///
/// `last` must already be restricted to codes starting with the month's
/// sub-prefix; only its trailing four digits are read.
pub fn next_monthly_code(
    prefix: &str,
    date: NaiveDate,
    last: Option<&str>,
) -> Result<String, CodeError> {
    let scope = monthly_prefix(prefix, date);
    let current = match last {
        Some(code) if code.starts_with(&scope) => parse_trailing_sequence(code, SEQUENCE_WIDTH)?,
        Some(code) => {
            return Err(CodeError::PrefixMismatch {
                code: code.to_string(),
                prefix: scope,
            })
        }
        None => 0,
    };
    format_code(&scope, SEQUENCE_WIDTH, current + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_next_code_increments() {
        assert_eq!(next_code("CUST", 4, Some("CUST0042")).unwrap(), "CUST0043");
        assert_eq!(next_code("MAT", 4, Some("MAT0999")).unwrap(), "MAT1000");
    }

    #[test]
    fn test_next_code_empty_namespace() {
        assert_eq!(next_code("SUP", 4, None).unwrap(), "SUP0001");
    }

    #[test]
    fn test_next_code_rejects_foreign_codes() {
        assert!(matches!(
            next_code("CUST", 4, Some("SUP0001")),
            Err(CodeError::PrefixMismatch { .. })
        ));
        assert!(matches!(
            next_code("CUST", 4, Some("CUSTABCD")),
            Err(CodeError::InvalidSuffix(_))
        ));
        assert!(matches!(
            next_code("CUST", 4, Some("CUST+042")),
            Err(CodeError::InvalidSuffix(_))
        ));
    }

    #[test]
    fn test_next_code_exhausted() {
        assert_eq!(
            next_code("MCH", 4, Some("MCH9999")),
            Err(CodeError::Exhausted {
                prefix: "MCH".to_string(),
                width: 4
            })
        );
    }

    #[test]
    fn test_monthly_prefix() {
        assert_eq!(monthly_prefix("PO", date(2024, 1, 15)), "PO202401-");
        assert_eq!(monthly_prefix("PO", date(2024, 12, 1)), "PO202412-");
    }

    #[test]
    fn test_monthly_code_sequence() {
        let d = date(2024, 1, 20);
        assert_eq!(next_monthly_code("PO", d, None).unwrap(), "PO202401-0001");
        assert_eq!(
            next_monthly_code("PO", d, Some("PO202401-0007")).unwrap(),
            "PO202401-0008"
        );
    }

    #[test]
    fn test_monthly_code_rejects_other_month() {
        let d = date(2024, 2, 1);
        assert!(next_monthly_code("PO", d, Some("PO202401-0007")).is_err());
    }

    #[test]
    fn test_code_kind_scope() {
        let d = date(2025, 3, 9);
        assert_eq!(CodeKind::Customer.scope(d), "CUST");
        assert_eq!(CodeKind::PurchaseOrder.scope(d), "PO202503-");
        assert_eq!(CodeKind::Measurement.next_code(d, None).unwrap(), "MSR0001");
        assert_eq!(
            CodeKind::PurchaseOrder.next_code(d, None).unwrap(),
            "PO202503-0001"
        );
    }

    #[test]
    fn test_sequence_of_and_render() {
        let d = date(2025, 3, 9);
        assert_eq!(CodeKind::Supplier.sequence_of(d, "SUP0120"), Ok(120));
        assert_eq!(CodeKind::PurchaseOrder.sequence_of(d, "PO202503-0031"), Ok(31));
        assert!(CodeKind::PurchaseOrder.sequence_of(d, "PO202502-0031").is_err());
        assert_eq!(CodeKind::Machine.render(d, 7).unwrap(), "MCH0007");
        assert_eq!(CodeKind::PurchaseOrder.render(d, 32).unwrap(), "PO202503-0032");
    }
}
