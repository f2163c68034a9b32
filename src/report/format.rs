//! Unit formatting for report cells

/// Scale a nanosecond magnitude to ns/μs/ms/s with two decimals.
/// Thresholds are powers of 1000.
pub fn format_time_value(nanoseconds: f64) -> String {
    if nanoseconds < 1_000.0 {
        format!("{:.2} ns", nanoseconds)
    } else if nanoseconds < 1_000_000.0 {
        format!("{:.2} μs", nanoseconds / 1_000.0)
    } else if nanoseconds < 1_000_000_000.0 {
        format!("{:.2} ms", nanoseconds / 1_000_000.0)
    } else {
        format!("{:.2} s", nanoseconds / 1_000_000_000.0)
    }
}

/// Time cell; missing values render empty
pub fn num_formatter(value: Option<f64>) -> String {
    value.map(format_time_value).unwrap_or_default()
}

/// Percentage cell: two decimals with trailing zeros and a dangling point removed
pub fn perc_formatter(value: Option<f64>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    let fixed = format!("{:.2}", value);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    format!("{}%", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_units() {
        assert_eq!(num_formatter(Some(999.0)), "999.00 ns");
        assert_eq!(num_formatter(Some(0.0)), "0.00 ns");
        assert_eq!(num_formatter(Some(1_000.0)), "1.00 μs");
        assert_eq!(num_formatter(Some(12_346.0)), "12.35 μs");
        assert_eq!(num_formatter(Some(1_500_000.0)), "1.50 ms");
        assert_eq!(num_formatter(Some(2_250_000_000.0)), "2.25 s");
    }

    #[test]
    fn test_percentages() {
        assert_eq!(perc_formatter(Some(10.0)), "10%");
        assert_eq!(perc_formatter(Some(10.5)), "10.5%");
        assert_eq!(perc_formatter(Some(-3.25)), "-3.25%");
        assert_eq!(perc_formatter(Some(100.0)), "100%");
        assert_eq!(perc_formatter(Some(0.0)), "0%");
        assert_eq!(perc_formatter(Some(12.345678)), "12.35%");
    }

    #[test]
    fn test_missing_values_are_empty() {
        assert_eq!(num_formatter(None), "");
        assert_eq!(perc_formatter(None), "");
    }
}
