//! Human-readable number formatting for computation trails and reports.

use brief_core::KpiUnit;

/// Round to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn round_opt(value: Option<f64>, decimals: i32) -> Option<f64> {
    value.map(|v| round_to(v, decimals))
}

/// Insert thousands separators into the integer part of a formatted number
fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match unsigned.find('.') {
        Some(pos) => unsigned.split_at(pos),
        None => (unsigned, ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}{}", sign, grouped, frac_part)
}

/// Format a large amount with a T/B/M suffix: `$1.2B`, `$350.0M`, `$12,345`.
pub fn fmt_money(value: f64, prefix: &str) -> String {
    let abs = value.abs();
    if abs >= 1e12 {
        format!("{}{}T", prefix, group_thousands(&format!("{:.1}", value / 1e12)))
    } else if abs >= 1e9 {
        format!("{}{}B", prefix, group_thousands(&format!("{:.1}", value / 1e9)))
    } else if abs >= 1e6 {
        format!("{}{}M", prefix, group_thousands(&format!("{:.1}", value / 1e6)))
    } else {
        format!("{}{}", prefix, group_thousands(&format!("{:.0}", value)))
    }
}

/// Dollar-prefixed [`fmt_money`]
pub fn fmt_usd(value: f64) -> String {
    fmt_money(value, "$")
}

/// Format a KPI value for display; absent values render as `N/A`.
pub fn fmt_kpi_value(value: Option<f64>, unit: KpiUnit) -> String {
    let Some(v) = value else {
        return "N/A".to_string();
    };

    match unit {
        KpiUnit::Percent => format!("{:.1}%", v),
        KpiUnit::Dollars => {
            if v.abs() >= 1e9 {
                format!("${:.1}B", v / 1e9)
            } else if v.abs() >= 1e6 {
                format!("${:.1}M", v / 1e6)
            } else {
                format!("${}", group_thousands(&format!("{:.0}", v)))
            }
        }
        KpiUnit::Multiple => format!("{:.1}x", v),
        KpiUnit::Days => format!("{:.0} days", v),
        KpiUnit::Months => format!("{:.1} months", v),
        KpiUnit::Unitless => format!("{:.2}", v),
    }
}

/// Percentage-point delta, `+2.5pp`; empty when absent.
pub fn fmt_delta(delta: Option<f64>) -> String {
    match delta {
        Some(d) if d > 0.0 => format!("+{:.1}pp", d),
        Some(d) => format!("{:.1}pp", d),
        None => String::new(),
    }
}

/// Implied growth rate for display; `N/A` when no solution exists.
pub fn fmt_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_money_suffixes() {
        assert_eq!(fmt_usd(2.5e12), "$2.5T");
        assert_eq!(fmt_usd(1_234.5e9), "$1.2T");
        assert_eq!(fmt_usd(391.035e9), "$391.0B");
        assert_eq!(fmt_usd(-2.0e9), "$-2.0B");
        assert_eq!(fmt_usd(15_300_000.0), "$15.3M");
        assert_eq!(fmt_usd(123_456.7), "$123,457");
        assert_eq!(fmt_money(999.0, ""), "999");
        assert_eq!(fmt_money(15_000_000_000_000_000.0, ""), "15,000.0T");
    }

    #[test]
    fn test_fmt_kpi_value() {
        assert_eq!(fmt_kpi_value(None, KpiUnit::Percent), "N/A");
        assert_eq!(fmt_kpi_value(Some(45.678), KpiUnit::Percent), "45.7%");
        assert_eq!(fmt_kpi_value(Some(2.5e9), KpiUnit::Dollars), "$2.5B");
        assert_eq!(fmt_kpi_value(Some(1.234), KpiUnit::Multiple), "1.2x");
        assert_eq!(fmt_kpi_value(Some(87.4), KpiUnit::Days), "87 days");
    }

    #[test]
    fn test_fmt_delta() {
        assert_eq!(fmt_delta(Some(2.46)), "+2.5pp");
        assert_eq!(fmt_delta(Some(-1.0)), "-1.0pp");
        assert_eq!(fmt_delta(Some(0.0)), "0.0pp");
        assert_eq!(fmt_delta(None), "");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(20.004, 2), 20.0);
        assert_eq!(round_to(87.46, 1), 87.5);
    }
}
