//! Numeric cells (weights and leader scores).

use std::str::FromStr;

use rust_decimal::Decimal;

/// Parse a numeric cell. Blank or non-numeric text is `None`.
///
/// A lone comma is accepted as decimal separator (`"2,5"`).
pub fn parse(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replacen(',', ".", 1)
    } else {
        trimmed.to_string()
    };
    Decimal::from_str(&candidate)
        .or_else(|_| Decimal::from_scientific(&candidate))
        .ok()
}

/// Render a value without trailing zeros (`5.0` → `"5"`)
pub fn format(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn format_optional(value: Option<Decimal>) -> String {
    value.map(format).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_plain_and_decimal_forms() {
        assert_eq!(parse("5"), Some(dec!(5)));
        assert_eq!(parse(" 5.0 "), Some(dec!(5)));
        assert_eq!(parse("2,5"), Some(dec!(2.5)));
    }

    #[test]
    fn equal_values_compare_equal() {
        assert_eq!(parse("5"), parse("5.0"));
        assert_ne!(parse("5"), parse("6"));
    }

    #[test]
    fn junk_is_none() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("abc"), None);
        assert_eq!(parse("nan"), None);
    }

    #[test]
    fn format_drops_trailing_zeros() {
        assert_eq!(format(dec!(5.0)), "5");
        assert_eq!(format(dec!(2.50)), "2.5");
        assert_eq!(format_optional(None), "");
    }
}
