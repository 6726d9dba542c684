use brief_core::{CitationSource, FactField, FactSet, Quote};

use crate::format::{fmt_money, fmt_usd};
use crate::models::{EvBuild, EvComponent};

/// Enterprise value bridge with a citation on every component.
///
/// Market cap needs both a price and a share count; otherwise it contributes
/// zero and is marked `unavailable`. Absent debt or cash lines count as zero.
pub fn build_ev(facts: &FactSet, quote: &Quote, entity_name: &str, cik: &str) -> EvBuild {
    let shares = facts.value(FactField::SharesOutstanding, 0);
    let shares_entry = facts.entry(FactField::SharesOutstanding, 0);

    let (market_cap, market_cap_computation) = match (quote.price, shares) {
        (Some(price), Some(shares)) => (
            price * shares,
            format!("price ({}) x shares ({})", price, fmt_money(shares, "")),
        ),
        _ => (0.0, "unavailable".to_string()),
    };
    let market_cap_comp = EvComponent {
        label: "Market Cap".to_string(),
        value: market_cap,
        source: CitationSource::from_entry(shares_entry, entity_name, cik),
        computation: market_cap_computation,
    };

    let long_term_debt = facts.value(FactField::LongTermDebt, 0).unwrap_or(0.0);
    let short_term_debt = facts.value(FactField::ShortTermDebt, 0).unwrap_or(0.0);
    let total_debt = long_term_debt + short_term_debt;
    let debt_entry = facts
        .entry(FactField::LongTermDebt, 0)
        .or_else(|| facts.entry(FactField::ShortTermDebt, 0));
    let debt_comp = EvComponent {
        label: "Total Debt".to_string(),
        value: total_debt,
        source: CitationSource::from_entry(debt_entry, entity_name, cik),
        computation: format!(
            "LT debt ({}) + ST debt ({})",
            fmt_usd(long_term_debt),
            fmt_usd(short_term_debt)
        ),
    };

    let cash = facts.value(FactField::CashAndEquivalents, 0).unwrap_or(0.0);
    let short_term_investments = facts.value(FactField::ShortTermInvestments, 0).unwrap_or(0.0);
    let total_cash = cash + short_term_investments;
    let cash_comp = EvComponent {
        label: "Cash & Equivalents".to_string(),
        value: total_cash,
        source: CitationSource::from_entry(
            facts.entry(FactField::CashAndEquivalents, 0),
            entity_name,
            cik,
        ),
        computation: format!(
            "cash ({}) + ST investments ({})",
            fmt_usd(cash),
            fmt_usd(short_term_investments)
        ),
    };

    let enterprise_value = market_cap + total_debt - total_cash;
    let summary = format!(
        "EV = Market Cap ({}) + Debt ({}) - Cash ({}) = {}",
        fmt_usd(market_cap),
        fmt_usd(total_debt),
        fmt_usd(total_cash),
        fmt_usd(enterprise_value)
    );

    EvBuild {
        market_cap: market_cap_comp,
        total_debt: debt_comp,
        cash: cash_comp,
        enterprise_value,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use brief_core::{FactEntry, FiscalPeriod};
    use chrono::NaiveDate;

    fn annual(value: f64) -> Vec<FactEntry> {
        vec![FactEntry {
            value,
            period_start: None,
            period_end: NaiveDate::from_ymd_opt(2024, 9, 28).unwrap(),
            fiscal_year: 2024,
            fiscal_period: FiscalPeriod::FY,
            form: "10-K".to_string(),
            accession: "0000320193-24-000123".to_string(),
            filed: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
            concept: None,
        }]
    }

    fn quote(price: Option<f64>) -> Quote {
        Quote {
            price,
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn test_ev_identity() {
        let facts = FactSet::new()
            .with_series(FactField::SharesOutstanding, annual(1_000.0))
            .with_series(FactField::LongTermDebt, annual(400.0))
            .with_series(FactField::ShortTermDebt, annual(100.0))
            .with_series(FactField::CashAndEquivalents, annual(150.0))
            .with_series(FactField::ShortTermInvestments, annual(50.0));

        let ev = build_ev(&facts, &quote(Some(2.5)), "Acme Corp", "0000000123");

        assert_relative_eq!(ev.market_cap.value, 2_500.0);
        assert_relative_eq!(ev.total_debt.value, 500.0);
        assert_relative_eq!(ev.cash.value, 200.0);
        assert_relative_eq!(
            ev.enterprise_value,
            ev.market_cap.value + ev.total_debt.value - ev.cash.value
        );
        assert_relative_eq!(ev.enterprise_value, 2_800.0);
        assert_eq!(ev.market_cap.computation, "price (2.5) x shares (1,000)");
        assert_eq!(ev.summary, "EV = Market Cap ($2,500) + Debt ($500) - Cash ($200) = $2,800");
        assert_eq!(ev.total_debt.source.source_type, "10-K");
    }

    #[test]
    fn test_missing_price_makes_market_cap_unavailable() {
        let facts = FactSet::new()
            .with_series(FactField::SharesOutstanding, annual(1_000.0))
            .with_series(FactField::LongTermDebt, annual(400.0));

        let ev = build_ev(&facts, &quote(None), "Acme Corp", "0000000123");

        assert_eq!(ev.market_cap.value, 0.0);
        assert_eq!(ev.market_cap.computation, "unavailable");
        assert_eq!(ev.cash.value, 0.0);
        assert_eq!(ev.cash.source.source_type, "unknown");
        assert_relative_eq!(ev.enterprise_value, 400.0);
    }
}
