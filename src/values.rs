//! Attribute Values

use std::fmt;

use jiff::Timestamp;
use rust_decimal::Decimal;

/// The kind of value an attribute holds, which decides how it is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Free text (names, image urls).
    Text,

    /// Currency amount, never negative.
    Amount,

    /// Percentage between 0 and 100 inclusive.
    Percentage,

    /// Point in time.
    Instant,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Text => "text",
            ValueKind::Amount => "amount",
            ValueKind::Percentage => "percentage",
            ValueKind::Instant => "instant",
        })
    }
}

/// A single attribute value.
///
/// Numeric values are carried as [`Decimal`], so equality is numeric
/// (`10` equals `10.00`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Free text
    Text(String),

    /// Currency amount
    Amount(Decimal),

    /// Percentage in `[0, 100]`
    Percentage(Decimal),

    /// Timestamp
    Instant(Timestamp),
}

impl Value {
    /// Kind of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::Text(_) => ValueKind::Text,
            Value::Amount(_) => ValueKind::Amount,
            Value::Percentage(_) => ValueKind::Percentage,
            Value::Instant(_) => ValueKind::Instant,
        }
    }

    /// Numeric payload for amounts and percentages.
    pub const fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Amount(value) | Value::Percentage(value) => Some(*value),
            Value::Text(_) | Value::Instant(_) => None,
        }
    }

    /// Text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            Value::Amount(_) | Value::Percentage(_) | Value::Instant(_) => None,
        }
    }

    /// Timestamp payload.
    pub const fn as_instant(&self) -> Option<Timestamp> {
        match self {
            Value::Instant(at) => Some(*at),
            Value::Text(_) | Value::Amount(_) | Value::Percentage(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.write_str(text),
            Value::Amount(amount) => write!(f, "{amount}"),
            Value::Percentage(percent) => write!(f, "{percent}%"),
            Value::Instant(at) => write!(f, "{at}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn numeric_equality_ignores_scale() {
        assert_eq!(
            Value::Amount(Decimal::new(1000, 2)),
            Value::Amount(Decimal::from(10))
        );
    }

    #[test]
    fn amount_and_percentage_are_not_equal() {
        assert_ne!(
            Value::Amount(Decimal::from(10)),
            Value::Percentage(Decimal::from(10))
        );
    }

    #[test]
    fn display_marks_percentages() {
        assert_eq!(Value::Percentage(Decimal::from(15)).to_string(), "15%");
        assert_eq!(Value::from("Kopi Susu").to_string(), "Kopi Susu");
    }
}
