//! Lenient parsing of reported numeric values.

/// Parse a fact value into a number.
///
/// Accepts the notations filers actually use:
/// - plain decimals: `1234.5`, `-12`
/// - accounting negatives: `(1.234)`
/// - grouped digits: `1,234,567`, `1.234.567`, `12 345 678`
/// - decimal commas: `1.234,56`, `0,5`
///
/// When both `.` and `,` appear, the last one is the decimal separator. A
/// separator that appears more than once groups thousands. A single `,`
/// followed by exactly three digits groups thousands; any other single
/// separator is decimal.
///
/// Returns `None` for empty or non-numeric text, and for values too large
/// to represent as a finite `f64`.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    let mut negative = false;

    if let Some(inner) = s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        negative = true;
        s = inner.trim();
    }
    if let Some(rest) = s.strip_prefix('-').or_else(|| s.strip_prefix('\u{2212}')) {
        negative = !negative;
        s = rest.trim_start();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.trim_start();
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '\'' | '_'))
        .collect();

    let normalized = normalize_separators(&cleaned)?;
    if !normalized.chars().any(|c| c.is_ascii_digit())
        || !normalized.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }

    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Rewrite grouping and decimal separators into plain `digits[.digits]`.
fn normalize_separators(s: &str) -> Option<String> {
    let dots = s.matches('.').count();
    let commas = s.matches(',').count();

    let normalized = match (dots, commas) {
        (0, 0) | (1, 0) => s.to_string(),
        (_, 0) => s.replace('.', ""),
        (0, 1) => {
            let (_, frac) = s.split_once(',')?;
            if frac.len() == 3 {
                s.replace(',', "")
            } else {
                s.replace(',', ".")
            }
        }
        (0, _) => s.replace(',', ""),
        _ => {
            let last_dot = s.rfind('.')?;
            let last_comma = s.rfind(',')?;
            if last_dot > last_comma {
                if dots > 1 {
                    return None;
                }
                s.replace(',', "")
            } else {
                if commas > 1 {
                    return None;
                }
                s.replace('.', "").replace(',', ".")
            }
        }
    };
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1234", Some(1234.0))]
    #[case("  1234.5 ", Some(1234.5))]
    #[case("-12", Some(-12.0))]
    #[case("+7", Some(7.0))]
    #[case("(1.234)", Some(-1.234))]
    #[case("(1,234,567)", Some(-1_234_567.0))]
    #[case("1,234,567", Some(1_234_567.0))]
    #[case("1.234.567", Some(1_234_567.0))]
    #[case("12 345 678", Some(12_345_678.0))]
    #[case("1.234,56", Some(1234.56))]
    #[case("1,234.56", Some(1234.56))]
    #[case("0,5", Some(0.5))]
    #[case("1,500", Some(1500.0))]
    #[case("1.500", Some(1.5))]
    #[case("-0", Some(0.0))]
    fn test_parse_decimal(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_decimal(raw), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("-")]
    #[case("()")]
    #[case("abc")]
    #[case("NaN")]
    #[case("inf")]
    #[case("1e6")]
    #[case("1.2.3,4,5")]
    #[case("12-34")]
    fn test_rejects_non_numeric(#[case] raw: &str) {
        assert_eq!(parse_decimal(raw), None);
    }

    #[rstest]
    #[case(format!("1{}", "0".repeat(400)))]
    #[case(format!("-1{}", "0".repeat(400)))]
    #[case(format!("({})", "9".repeat(310)))]
    fn test_rejects_overflowing_digits(#[case] raw: String) {
        assert_eq!(parse_decimal(&raw), None);
    }

    #[test]
    fn test_largest_finite_digits_accepted() {
        let raw = format!("1{}", "0".repeat(300));
        assert_eq!(parse_decimal(&raw), Some(1e300));
    }
}
