use std::cmp::Ordering;

/// Helper for safe float comparison with NaN handling
pub fn compare_floats(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Two decimal places, the way every table in the report prints money
pub fn format_usd(amount: f64) -> String {
    // avoid printing "-0.00"
    if amount.abs() < 0.005 {
        return "0.00".to_string();
    }
    format!("{:.2}", amount)
}

/// Like `format_usd` but with an explicit `+` on increases
pub fn format_signed_usd(amount: f64) -> String {
    let formatted = format_usd(amount);
    if amount >= 0.005 {
        format!("+{}", formatted)
    } else {
        formatted
    }
}

/// Append `line` and a newline
pub fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_floats() {
        assert_eq!(compare_floats(1.0, 2.0), Ordering::Less);
        assert_eq!(compare_floats(2.0, 1.0), Ordering::Greater);
        assert_eq!(compare_floats(1.0, 1.0), Ordering::Equal);
        assert_eq!(compare_floats(f64::NAN, 1.0), Ordering::Equal);
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "0.00");
        assert_eq!(format_usd(1234.567), "1234.57");
        assert_eq!(format_usd(-0.001), "0.00");
        assert_eq!(format_usd(-3.5), "-3.50");
    }

    #[test]
    fn test_push_line() {
        let mut out = String::new();
        push_line(&mut out, "# Title");
        push_line(&mut out, "");
        assert_eq!(out, "# Title\n\n");
    }

    #[test]
    fn test_format_signed_usd() {
        assert_eq!(format_signed_usd(10.0), "+10.00");
        assert_eq!(format_signed_usd(-2.25), "-2.25");
        assert_eq!(format_signed_usd(0.0), "0.00");
    }
}
