//! Quarterly fact helpers.
//!
//! Flow items in 10-Q filings are cumulative year-to-date: Q1 = 3, Q2 = 6
//! (Q1 + Q2), Q3 = 9 (Q1 + Q2 + Q3). Balance sheet items are point-in-time.
//! Everything here works on standalone (single-quarter) values.

use brief_core::{FactField, FactSet};

use crate::format::round_to;

/// Standalone value of the quarter at `idx` (0 = most recent).
///
/// Cumulative fields subtract the immediately prior quarter of the same
/// fiscal year; Q1 is already standalone. Returns `None` when the prior
/// quarter is missing rather than a misleading year-to-date figure.
pub fn standalone_quarter(quarterly: &FactSet, field: FactField, idx: usize) -> Option<f64> {
    let entry = quarterly.entry(field, idx)?;
    if !field.is_cumulative() {
        return Some(entry.value);
    }

    match entry.fiscal_period.previous_quarter() {
        None => Some(entry.value),
        Some(prior_period) => quarterly
            .find(field, entry.fiscal_year, prior_period)
            .map(|(_, prior)| entry.value - prior.value),
    }
}

/// Standalone value of the same fiscal quarter one year earlier
pub fn year_ago_standalone(quarterly: &FactSet, field: FactField, idx: usize) -> Option<f64> {
    let entry = quarterly.entry(field, idx)?;
    let (prior_idx, _) = quarterly.find(field, entry.fiscal_year - 1, entry.fiscal_period)?;
    standalone_quarter(quarterly, field, prior_idx)
}

/// "Q3 FY2025" label of the most recent quarter for `field`
pub fn quarter_label(quarterly: &FactSet, field: FactField) -> Option<String> {
    quarterly.entry(field, 0).map(|e| e.period_label())
}

/// Two most recent standalone-quarter readings of a KPI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuarterPair {
    pub current: Option<f64>,
    pub prior: Option<f64>,
    pub period: Option<String>,
}

impl QuarterPair {
    /// Round both readings to `decimals`
    pub fn rounded(self, decimals: i32) -> Self {
        Self {
            current: self.current.map(|v| round_to(v, decimals)),
            prior: self.prior.map(|v| round_to(v, decimals)),
            period: self.period,
        }
    }

    pub fn delta(&self) -> Option<f64> {
        match (self.current, self.prior) {
            (Some(cur), Some(prior)) => Some(cur - prior),
            _ => None,
        }
    }
}

pub(crate) fn safe_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// Standalone `numerator / denominator` x 100 for the two latest quarters.
/// The period label comes from the numerator series, falling back to the
/// denominator.
pub fn quarter_over_quarter_ratio(
    quarterly: &FactSet,
    numerator: FactField,
    denominator: FactField,
) -> QuarterPair {
    let ratio = |idx: usize| {
        safe_div(
            standalone_quarter(quarterly, numerator, idx),
            standalone_quarter(quarterly, denominator, idx),
        )
        .map(|r| r * 100.0)
    };

    QuarterPair {
        current: ratio(0),
        prior: ratio(1),
        period: quarter_label(quarterly, numerator).or_else(|| quarter_label(quarterly, denominator)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use brief_core::{FactEntry, FiscalPeriod};
    use chrono::NaiveDate;

    fn q(fy: i32, fp: FiscalPeriod, value: f64) -> FactEntry {
        let month = match fp {
            FiscalPeriod::Q1 => 3,
            FiscalPeriod::Q2 => 6,
            FiscalPeriod::Q3 => 9,
            FiscalPeriod::FY => 12,
        };
        FactEntry {
            value,
            period_start: NaiveDate::from_ymd_opt(fy, 1, 1),
            period_end: NaiveDate::from_ymd_opt(fy, month, 28).unwrap(),
            fiscal_year: fy,
            fiscal_period: fp,
            form: "10-Q".to_string(),
            accession: format!("0000000000-{}-00000{}", fy % 100, month),
            filed: NaiveDate::from_ymd_opt(fy, month, 28).unwrap() + chrono::Duration::days(40),
            concept: Some("Revenues".to_string()),
        }
    }

    #[test]
    fn test_standalone_subtracts_prior_quarter() {
        let quarterly = FactSet::new().with_series(
            FactField::Revenue,
            vec![
                q(2025, FiscalPeriod::Q1, 30.0),
                q(2025, FiscalPeriod::Q2, 65.0),
                q(2025, FiscalPeriod::Q3, 100.0),
            ],
        );

        assert_eq!(standalone_quarter(&quarterly, FactField::Revenue, 0), Some(35.0));
        assert_eq!(standalone_quarter(&quarterly, FactField::Revenue, 1), Some(35.0));
        assert_eq!(standalone_quarter(&quarterly, FactField::Revenue, 2), Some(30.0));
        assert_eq!(standalone_quarter(&quarterly, FactField::Revenue, 3), None);
    }

    #[test]
    fn test_standalone_missing_prior_quarter_is_absent() {
        let quarterly = FactSet::new().with_series(
            FactField::Revenue,
            vec![q(2025, FiscalPeriod::Q3, 100.0), q(2025, FiscalPeriod::Q1, 30.0)],
        );
        assert_eq!(standalone_quarter(&quarterly, FactField::Revenue, 0), None);
    }

    #[test]
    fn test_point_in_time_fields_are_not_decumulated() {
        let quarterly = FactSet::new().with_series(
            FactField::Inventory,
            vec![q(2025, FiscalPeriod::Q1, 40.0), q(2025, FiscalPeriod::Q2, 55.0)],
        );
        assert_eq!(standalone_quarter(&quarterly, FactField::Inventory, 0), Some(55.0));
        assert_eq!(standalone_quarter(&quarterly, FactField::Inventory, 1), Some(40.0));
    }

    #[test]
    fn test_year_ago_standalone() {
        let quarterly = FactSet::new().with_series(
            FactField::Revenue,
            vec![
                q(2025, FiscalPeriod::Q1, 30.0),
                q(2025, FiscalPeriod::Q2, 65.0),
                q(2024, FiscalPeriod::Q1, 25.0),
                q(2024, FiscalPeriod::Q2, 50.0),
            ],
        );

        assert_eq!(year_ago_standalone(&quarterly, FactField::Revenue, 0), Some(25.0));
        assert_eq!(year_ago_standalone(&quarterly, FactField::Revenue, 1), Some(25.0));
        assert_eq!(year_ago_standalone(&quarterly, FactField::Revenue, 2), None);
    }

    #[test]
    fn test_quarter_over_quarter_ratio() {
        let quarterly = FactSet::new()
            .with_series(
                FactField::GrossProfit,
                vec![q(2025, FiscalPeriod::Q1, 15.0), q(2025, FiscalPeriod::Q2, 36.0)],
            )
            .with_series(
                FactField::Revenue,
                vec![q(2025, FiscalPeriod::Q1, 30.0), q(2025, FiscalPeriod::Q2, 65.0)],
            );

        let pair = quarter_over_quarter_ratio(&quarterly, FactField::GrossProfit, FactField::Revenue);
        assert_relative_eq!(pair.current.unwrap(), 60.0, epsilon = 1e-9);
        assert_relative_eq!(pair.prior.unwrap(), 50.0, epsilon = 1e-9);
        assert_relative_eq!(pair.delta().unwrap(), 10.0, epsilon = 1e-9);
        assert_eq!(pair.period.as_deref(), Some("Q2 FY2025"));

        let empty = quarter_over_quarter_ratio(&FactSet::new(), FactField::Sbc, FactField::Revenue);
        assert_eq!(empty, QuarterPair::default());
    }
}
