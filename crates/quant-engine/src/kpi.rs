//! KPI catalog. Each KPI is a pure function of the annual and quarterly
//! facts; [`calculator`] maps every [`KpiId`] to its function.

use brief_core::{CitationSource, FactEntry, FactField, FactSet, KpiId};

use crate::format::{fmt_usd, round_opt, round_to};
use crate::models::KpiResult;
use crate::quarters::{
    quarter_label, quarter_over_quarter_ratio, safe_div, standalone_quarter, year_ago_standalone,
    QuarterPair,
};

pub const EXTRACTION_NOTE: &str = "Requires filing text extraction, not available in XBRL";
pub const FCF_YIELD_NOTE: &str =
    "Uses total assets as denominator, true FCF yield requires live market cap";

/// Immutable view of one filer's facts
#[derive(Debug, Clone, Copy)]
pub struct KpiContext<'a> {
    pub facts: &'a FactSet,
    pub quarterly: &'a FactSet,
    pub entity_name: &'a str,
    pub cik: &'a str,
}

impl<'a> KpiContext<'a> {
    fn val(&self, field: FactField, idx: usize) -> Option<f64> {
        self.facts.value(field, idx)
    }

    fn entry(&self, field: FactField, idx: usize) -> Option<&'a FactEntry> {
        self.facts.entry(field, idx)
    }

    /// First field with an annual entry
    fn first_entry(&self, fields: &[FactField]) -> Option<&'a FactEntry> {
        fields.iter().find_map(|f| self.entry(*f, 0))
    }

    fn cite(&self, entry: Option<&FactEntry>) -> CitationSource {
        CitationSource::from_entry(entry, self.entity_name, self.cik)
    }

    fn fcf(&self, idx: usize) -> Option<f64> {
        Some(self.val(FactField::OperatingCashFlow, idx)? - self.val(FactField::Capex, idx)?)
    }

    fn quarter(&self, field: FactField, idx: usize) -> Option<f64> {
        standalone_quarter(self.quarterly, field, idx)
    }
}

pub type KpiFn = for<'a, 'b> fn(&'a KpiContext<'b>) -> Option<KpiResult>;

/// Implementation for a KPI id. Exhaustive, so every template KPI has one.
pub fn calculator(id: KpiId) -> KpiFn {
    match id {
        KpiId::GrossMargin => gross_margin,
        KpiId::RevenueGrowth => revenue_growth,
        KpiId::SbcRevenue => sbc_revenue,
        KpiId::FcfMargin => fcf_margin,
        KpiId::RuleOf40 => rule_of_40,
        KpiId::InventoryDays => inventory_days,
        KpiId::CapexIntensity => capex_intensity,
        KpiId::RAndDIntensity => r_and_d_intensity,
        KpiId::OperatingMargin => operating_margin,
        KpiId::FcfYield => fcf_yield,
        KpiId::Roe => roe,
        KpiId::NetDebtEbitda => net_debt_ebitda,
        KpiId::Nrr => nrr,
        KpiId::CacPayback => cac_payback,
        KpiId::Backlog => backlog,
        KpiId::BookToBill => book_to_bill,
    }
}

/// Compute one KPI. `None` means the KPI is not computable at all; missing
/// inputs produce a result with an absent value instead.
pub fn compute_kpi(id: KpiId, ctx: &KpiContext<'_>) -> Option<KpiResult> {
    calculator(id)(ctx)
}

fn percent(ratio: Option<f64>) -> Option<f64> {
    ratio.map(|r| round_to(r * 100.0, 2))
}

fn difference(current: Option<f64>, prior: Option<f64>, decimals: i32) -> Option<f64> {
    match (current, prior) {
        (Some(cur), Some(prior)) => Some(round_to(cur - prior, decimals)),
        _ => None,
    }
}

fn growth_pct(current: Option<f64>, prior: Option<f64>) -> Option<f64> {
    safe_div(current, prior).map(|r| (r - 1.0) * 100.0)
}

impl KpiResult {
    fn for_entry(id: KpiId, entry: Option<&FactEntry>, ctx: &KpiContext<'_>) -> Self {
        let mut result = KpiResult::empty(id);
        result.period = entry.map(FactEntry::fiscal_year_label);
        result.source = Some(ctx.cite(entry));
        result
    }

    fn with_yoy(mut self, value: Option<f64>, prior: Option<f64>, decimals: i32) -> Self {
        self.value = value;
        self.prior_value = prior;
        self.yoy_delta = difference(value, prior, decimals);
        self
    }

    fn with_quarters(mut self, pair: QuarterPair, decimals: i32) -> Self {
        self.qoq_delta = pair.delta().map(|d| round_to(d, decimals));
        let pair = pair.rounded(decimals);
        self.qoq_value = pair.current;
        self.qoq_prior = pair.prior;
        self.qoq_period = pair.period;
        self
    }

    fn with_computation(mut self, computation: Option<String>) -> Self {
        self.computation = computation;
        self
    }
}

/// `numerator / revenue` as a percentage, with YoY and standalone QoQ
fn revenue_ratio(ctx: &KpiContext<'_>, id: KpiId, numerator: FactField, name: &str) -> Option<KpiResult> {
    let num = ctx.val(numerator, 0);
    let rev = ctx.val(FactField::Revenue, 0);
    let value = percent(safe_div(num, rev));
    let prior = percent(safe_div(ctx.val(numerator, 1), ctx.val(FactField::Revenue, 1)));
    let entry = ctx.first_entry(&[numerator, FactField::Revenue]);

    let computation = match (num, rev) {
        (Some(n), Some(r)) => Some(format!("{} ({}) / revenue ({})", name, fmt_usd(n), fmt_usd(r))),
        _ => None,
    };

    Some(
        KpiResult::for_entry(id, entry, ctx)
            .with_yoy(value, prior, 2)
            .with_quarters(quarter_over_quarter_ratio(ctx.quarterly, numerator, FactField::Revenue), 2)
            .with_computation(computation),
    )
}

fn annual_gross_profit(ctx: &KpiContext<'_>, idx: usize) -> Option<f64> {
    ctx.val(FactField::GrossProfit, idx).or_else(|| {
        Some(ctx.val(FactField::Revenue, idx)? - ctx.val(FactField::CostOfRevenue, idx)?)
    })
}

fn quarterly_gross_profit(ctx: &KpiContext<'_>, idx: usize) -> Option<f64> {
    ctx.quarter(FactField::GrossProfit, idx).or_else(|| {
        Some(ctx.quarter(FactField::Revenue, idx)? - ctx.quarter(FactField::CostOfRevenue, idx)?)
    })
}

fn gross_margin(ctx: &KpiContext<'_>) -> Option<KpiResult> {
    let gp = annual_gross_profit(ctx, 0);
    let rev = ctx.val(FactField::Revenue, 0);
    let value = percent(safe_div(gp, rev));
    let prior = percent(safe_div(annual_gross_profit(ctx, 1), ctx.val(FactField::Revenue, 1)));
    let entry = ctx.first_entry(&[FactField::GrossProfit, FactField::Revenue]);

    let quarter_margin = |idx| {
        safe_div(quarterly_gross_profit(ctx, idx), ctx.quarter(FactField::Revenue, idx)).map(|r| r * 100.0)
    };
    let quarters = QuarterPair {
        current: quarter_margin(0),
        prior: quarter_margin(1),
        period: quarter_label(ctx.quarterly, FactField::GrossProfit)
            .or_else(|| quarter_label(ctx.quarterly, FactField::Revenue)),
    };

    let computation = match (gp, rev) {
        (Some(g), Some(r)) => Some(format!("gross_profit ({}) / revenue ({})", fmt_usd(g), fmt_usd(r))),
        _ => None,
    };

    Some(
        KpiResult::for_entry(KpiId::GrossMargin, entry, ctx)
            .with_yoy(value, prior, 2)
            .with_quarters(quarters, 2)
            .with_computation(computation),
    )
}

/// YoY growth of the standalone quarter at `idx` against the same quarter a
/// year earlier
fn quarter_yoy_growth(ctx: &KpiContext<'_>, idx: usize) -> Option<f64> {
    growth_pct(
        ctx.quarter(FactField::Revenue, idx),
        year_ago_standalone(ctx.quarterly, FactField::Revenue, idx),
    )
}

fn revenue_growth(ctx: &KpiContext<'_>) -> Option<KpiResult> {
    let rev0 = ctx.val(FactField::Revenue, 0);
    let rev1 = ctx.val(FactField::Revenue, 1);
    let value = round_opt(growth_pct(rev0, rev1), 2);
    let prior = round_opt(growth_pct(rev1, ctx.val(FactField::Revenue, 2)), 2);

    // QoQ compares the latest quarter's YoY growth with the prior quarter's
    let quarters = QuarterPair {
        current: quarter_yoy_growth(ctx, 0),
        prior: quarter_yoy_growth(ctx, 1),
        period: quarter_label(ctx.quarterly, FactField::Revenue),
    };

    let computation = match (rev0, rev1) {
        (Some(r0), Some(r1)) if r1 != 0.0 => {
            Some(format!("({} / {} - 1)", fmt_usd(r0), fmt_usd(r1)))
        }
        _ => None,
    };

    Some(
        KpiResult::for_entry(KpiId::RevenueGrowth, ctx.entry(FactField::Revenue, 0), ctx)
            .with_yoy(value, prior, 2)
            .with_quarters(quarters, 2)
            .with_computation(computation),
    )
}

fn sbc_revenue(ctx: &KpiContext<'_>) -> Option<KpiResult> {
    revenue_ratio(ctx, KpiId::SbcRevenue, FactField::Sbc, "sbc")
}

fn capex_intensity(ctx: &KpiContext<'_>) -> Option<KpiResult> {
    revenue_ratio(ctx, KpiId::CapexIntensity, FactField::Capex, "capex")
}

fn r_and_d_intensity(ctx: &KpiContext<'_>) -> Option<KpiResult> {
    revenue_ratio(ctx, KpiId::RAndDIntensity, FactField::ResearchAndDevelopment, "R&D")
}

fn operating_margin(ctx: &KpiContext<'_>) -> Option<KpiResult> {
    revenue_ratio(ctx, KpiId::OperatingMargin, FactField::OperatingIncome, "operating_income")
}

fn fcf_margin(ctx: &KpiContext<'_>) -> Option<KpiResult> {
    let ocf = ctx.val(FactField::OperatingCashFlow, 0);
    let capex = ctx.val(FactField::Capex, 0);
    let rev = ctx.val(FactField::Revenue, 0);
    let value = percent(safe_div(ctx.fcf(0), rev));
    let prior = percent(safe_div(ctx.fcf(1), ctx.val(FactField::Revenue, 1)));
    let entry = ctx.first_entry(&[FactField::OperatingCashFlow, FactField::Revenue]);

    let quarter_margin = |idx| {
        let qfcf = Some(
            ctx.quarter(FactField::OperatingCashFlow, idx)? - ctx.quarter(FactField::Capex, idx)?,
        );
        safe_div(qfcf, ctx.quarter(FactField::Revenue, idx)).map(|r| r * 100.0)
    };
    let quarters = QuarterPair {
        current: quarter_margin(0),
        prior: quarter_margin(1),
        period: quarter_label(ctx.quarterly, FactField::OperatingCashFlow),
    };

    let computation = match (ocf, capex, rev) {
        (Some(o), Some(c), Some(r)) => Some(format!(
            "(OCF {} - capex {}) / revenue {}",
            fmt_usd(o),
            fmt_usd(c),
            fmt_usd(r)
        )),
        _ => None,
    };

    Some(
        KpiResult::for_entry(KpiId::FcfMargin, entry, ctx)
            .with_yoy(value, prior, 2)
            .with_quarters(quarters, 2)
            .with_computation(computation),
    )
}

fn rule_of_40_at(ctx: &KpiContext<'_>, idx: usize) -> Option<(f64, f64)> {
    let growth = growth_pct(ctx.val(FactField::Revenue, idx), ctx.val(FactField::Revenue, idx + 1))?;
    let margin = safe_div(ctx.fcf(idx), ctx.val(FactField::Revenue, idx))? * 100.0;
    Some((growth, margin))
}

fn rule_of_40(ctx: &KpiContext<'_>) -> Option<KpiResult> {
    let current = rule_of_40_at(ctx, 0);
    let value = current.map(|(g, m)| round_to(g + m, 2));
    let prior = rule_of_40_at(ctx, 1).map(|(g, m)| round_to(g + m, 2));
    let computation =
        current.map(|(g, m)| format!("rev_growth ({:.1}%) + FCF_margin ({:.1}%)", g, m));

    Some(
        KpiResult::for_entry(KpiId::RuleOf40, ctx.entry(FactField::Revenue, 0), ctx)
            .with_yoy(value, prior, 2)
            .with_computation(computation),
    )
}

fn days_of(inventory: Option<f64>, annual_cogs: Option<f64>) -> Option<f64> {
    safe_div(inventory, annual_cogs.map(|c| c / 365.0))
}

fn inventory_days(ctx: &KpiContext<'_>) -> Option<KpiResult> {
    let inv = ctx.val(FactField::Inventory, 0);
    let cogs = ctx.val(FactField::CostOfRevenue, 0);
    let value = round_opt(days_of(inv, cogs), 1);
    let prior = round_opt(
        days_of(ctx.val(FactField::Inventory, 1), ctx.val(FactField::CostOfRevenue, 1)),
        1,
    );

    // inventory is point-in-time; quarterly COGS is annualized from the standalone quarter
    let quarter_days = |idx| {
        days_of(
            ctx.quarterly.value(FactField::Inventory, idx),
            ctx.quarter(FactField::CostOfRevenue, idx).map(|c| c * 4.0),
        )
    };
    let quarters = QuarterPair {
        current: quarter_days(0),
        prior: quarter_days(1),
        period: quarter_label(ctx.quarterly, FactField::Inventory),
    };

    let computation = match (inv, cogs) {
        (Some(i), Some(c)) => Some(format!(
            "inventory ({}) / (COGS ({}) / 365)",
            fmt_usd(i),
            fmt_usd(c)
        )),
        _ => None,
    };

    Some(
        KpiResult::for_entry(KpiId::InventoryDays, ctx.entry(FactField::Inventory, 0), ctx)
            .with_yoy(value, prior, 1)
            .with_quarters(quarters, 1)
            .with_computation(computation),
    )
}

fn fcf_yield(ctx: &KpiContext<'_>) -> Option<KpiResult> {
    let fcf = ctx.fcf(0);
    let total_assets = ctx.val(FactField::TotalAssets, 0);
    let value = percent(safe_div(fcf, total_assets));
    let prior = percent(safe_div(ctx.fcf(1), ctx.val(FactField::TotalAssets, 1)));
    let entry = ctx.first_entry(&[FactField::OperatingCashFlow, FactField::TotalAssets]);

    let computation = match (fcf, total_assets) {
        (Some(f), Some(ta)) => Some(format!(
            "FCF ({}) / total_assets ({})",
            fmt_usd(f),
            fmt_usd(ta)
        )),
        _ => None,
    };

    let mut result = KpiResult::for_entry(KpiId::FcfYield, entry, ctx)
        .with_yoy(value, prior, 2)
        .with_computation(computation);
    result.note = Some(FCF_YIELD_NOTE.to_string());
    Some(result)
}

fn roe(ctx: &KpiContext<'_>) -> Option<KpiResult> {
    let ni = ctx.val(FactField::NetIncome, 0);
    let equity = ctx.val(FactField::TotalEquity, 0);
    let value = percent(safe_div(ni, equity));
    let prior = percent(safe_div(ctx.val(FactField::NetIncome, 1), ctx.val(FactField::TotalEquity, 1)));
    let entry = ctx.first_entry(&[FactField::NetIncome, FactField::TotalEquity]);

    let computation = match (ni, equity) {
        (Some(n), Some(e)) => Some(format!(
            "net_income ({}) / total_equity ({})",
            fmt_usd(n),
            fmt_usd(e)
        )),
        _ => None,
    };

    Some(
        KpiResult::for_entry(KpiId::Roe, entry, ctx)
            .with_yoy(value, prior, 2)
            .with_computation(computation),
    )
}

fn net_debt_ebitda(ctx: &KpiContext<'_>) -> Option<KpiResult> {
    let or_zero = |field| ctx.val(field, 0).unwrap_or(0.0);
    let debt = or_zero(FactField::LongTermDebt) + or_zero(FactField::ShortTermDebt);
    let cash = or_zero(FactField::CashAndEquivalents) + or_zero(FactField::ShortTermInvestments);
    let operating_income = or_zero(FactField::OperatingIncome);
    let da = or_zero(FactField::DepreciationAmortization);
    let ebitda = operating_income + da;

    let value = (ebitda != 0.0).then(|| round_to((debt - cash) / ebitda, 2));
    let computation = (ebitda != 0.0).then(|| {
        format!(
            "(debt {} - cash {}) / (OI {} + D&A {})",
            fmt_usd(debt),
            fmt_usd(cash),
            fmt_usd(operating_income),
            fmt_usd(da)
        )
    });
    let entry = ctx.first_entry(&[FactField::LongTermDebt, FactField::OperatingIncome]);

    Some(
        KpiResult::for_entry(KpiId::NetDebtEbitda, entry, ctx)
            .with_yoy(value, None, 2)
            .with_computation(computation),
    )
}

/// Placeholder for a KPI disclosed only in filing prose. The value stays
/// absent so the supplement step can fill it in.
pub fn extraction_placeholder(id: KpiId) -> KpiResult {
    let mut result = KpiResult::empty(id);
    result.note = Some(EXTRACTION_NOTE.to_string());
    result
}

fn nrr(_ctx: &KpiContext<'_>) -> Option<KpiResult> {
    Some(extraction_placeholder(KpiId::Nrr))
}

fn cac_payback(_ctx: &KpiContext<'_>) -> Option<KpiResult> {
    Some(extraction_placeholder(KpiId::CacPayback))
}

fn backlog(_ctx: &KpiContext<'_>) -> Option<KpiResult> {
    Some(extraction_placeholder(KpiId::Backlog))
}

fn book_to_bill(_ctx: &KpiContext<'_>) -> Option<KpiResult> {
    Some(extraction_placeholder(KpiId::BookToBill))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use brief_core::FiscalPeriod;
    use chrono::NaiveDate;

    fn fy(year: i32, value: f64) -> FactEntry {
        FactEntry {
            value,
            period_start: NaiveDate::from_ymd_opt(year, 1, 1),
            period_end: NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
            fiscal_year: year,
            fiscal_period: FiscalPeriod::FY,
            form: "10-K".to_string(),
            accession: format!("0000000001-{}-000001", (year + 1) % 100),
            filed: NaiveDate::from_ymd_opt(year + 1, 2, 15).unwrap(),
            concept: None,
        }
    }

    fn quarter(year: i32, fp: FiscalPeriod, value: f64) -> FactEntry {
        FactEntry {
            fiscal_period: fp,
            form: "10-Q".to_string(),
            ..fy(year, value)
        }
    }

    fn ctx<'a>(facts: &'a FactSet, quarterly: &'a FactSet) -> KpiContext<'a> {
        KpiContext {
            facts,
            quarterly,
            entity_name: "Acme Corp",
            cik: "0000000001",
        }
    }

    #[test]
    fn test_every_kpi_has_a_calculator() {
        let empty = FactSet::new();
        for id in KpiId::ALL {
            // must not panic on empty facts
            let _ = compute_kpi(id, &ctx(&empty, &empty));
        }
    }

    #[test]
    fn test_gross_margin_falls_back_to_cost_of_revenue() {
        let facts = FactSet::new()
            .with_series(FactField::Revenue, vec![fy(2025, 120.0), fy(2024, 100.0)])
            .with_series(FactField::CostOfRevenue, vec![fy(2025, 60.0), fy(2024, 60.0)]);
        let empty = FactSet::new();

        let gm = compute_kpi(KpiId::GrossMargin, &ctx(&facts, &empty)).unwrap();
        assert_eq!(gm.value, Some(50.0));
        assert_eq!(gm.prior_value, Some(40.0));
        assert_eq!(gm.yoy_delta, Some(10.0));
        assert_eq!(gm.period.as_deref(), Some("FY2025"));
        assert_eq!(gm.computation.as_deref(), Some("gross_profit ($60) / revenue ($120)"));
        assert!(gm.qoq_value.is_none());
    }

    #[test]
    fn test_revenue_growth() {
        let facts = FactSet::new()
            .with_series(FactField::Revenue, vec![fy(2025, 120.0), fy(2024, 100.0), fy(2023, 80.0)]);
        let empty = FactSet::new();

        let growth = compute_kpi(KpiId::RevenueGrowth, &ctx(&facts, &empty)).unwrap();
        assert_eq!(growth.value, Some(20.0));
        assert_eq!(growth.prior_value, Some(25.0));
        assert_eq!(growth.yoy_delta, Some(-5.0));
        assert_eq!(growth.computation.as_deref(), Some("($120 / $100 - 1)"));
    }

    #[test]
    fn test_revenue_growth_quarters_use_standalone_year_ago() {
        let facts = FactSet::new();
        let quarterly = FactSet::new().with_series(
            FactField::Revenue,
            vec![
                quarter(2025, FiscalPeriod::Q1, 30.0),
                quarter(2025, FiscalPeriod::Q2, 66.0),
                quarter(2024, FiscalPeriod::Q1, 25.0),
                quarter(2024, FiscalPeriod::Q2, 55.0),
            ],
        );

        let growth = compute_kpi(KpiId::RevenueGrowth, &ctx(&facts, &quarterly)).unwrap();
        // Q2: 36 vs 30, Q1: 30 vs 25
        assert_eq!(growth.qoq_value, Some(20.0));
        assert_eq!(growth.qoq_prior, Some(20.0));
        assert_eq!(growth.qoq_period.as_deref(), Some("Q2 FY2025"));
        assert!(growth.value.is_none());
    }

    #[test]
    fn test_fcf_margin_and_rule_of_40() {
        let facts = FactSet::new()
            .with_series(FactField::Revenue, vec![fy(2025, 200.0), fy(2024, 160.0)])
            .with_series(FactField::OperatingCashFlow, vec![fy(2025, 50.0)])
            .with_series(FactField::Capex, vec![fy(2025, 20.0)]);
        let empty = FactSet::new();

        let margin = compute_kpi(KpiId::FcfMargin, &ctx(&facts, &empty)).unwrap();
        assert_eq!(margin.value, Some(15.0));

        let rule = compute_kpi(KpiId::RuleOf40, &ctx(&facts, &empty)).unwrap();
        assert_eq!(rule.value, Some(40.0));
        assert_eq!(
            rule.computation.as_deref(),
            Some("rev_growth (25.0%) + FCF_margin (15.0%)")
        );
    }

    #[test]
    fn test_ratio_kpis_use_standalone_quarters() {
        let facts = FactSet::new();
        let quarterly = FactSet::new()
            .with_series(
                FactField::Sbc,
                vec![quarter(2025, FiscalPeriod::Q1, 3.0), quarter(2025, FiscalPeriod::Q2, 7.0)],
            )
            .with_series(
                FactField::Revenue,
                vec![quarter(2025, FiscalPeriod::Q1, 30.0), quarter(2025, FiscalPeriod::Q2, 70.0)],
            );

        let sbc = compute_kpi(KpiId::SbcRevenue, &ctx(&facts, &quarterly)).unwrap();
        assert_eq!(sbc.qoq_value, Some(10.0));
        assert_eq!(sbc.qoq_prior, Some(10.0));
        assert_eq!(sbc.qoq_delta, Some(0.0));
    }

    #[test]
    fn test_inventory_days() {
        let facts = FactSet::new()
            .with_series(FactField::Inventory, vec![fy(2025, 50.0), fy(2024, 40.0)])
            .with_series(FactField::CostOfRevenue, vec![fy(2025, 365.0), fy(2024, 365.0)]);
        let quarterly = FactSet::new()
            .with_series(
                FactField::Inventory,
                vec![quarter(2025, FiscalPeriod::Q1, 45.0), quarter(2025, FiscalPeriod::Q2, 50.0)],
            )
            .with_series(
                FactField::CostOfRevenue,
                vec![quarter(2025, FiscalPeriod::Q1, 91.25), quarter(2025, FiscalPeriod::Q2, 182.5)],
            );

        let days = compute_kpi(KpiId::InventoryDays, &ctx(&facts, &quarterly)).unwrap();
        assert_eq!(days.value, Some(50.0));
        assert_eq!(days.prior_value, Some(40.0));
        assert_eq!(days.yoy_delta, Some(10.0));
        assert_eq!(days.qoq_value, Some(50.0));
        assert_eq!(days.qoq_prior, Some(45.0));
        assert_eq!(days.unit, brief_core::KpiUnit::Days);
    }

    #[test]
    fn test_net_debt_ebitda() {
        let facts = FactSet::new()
            .with_series(FactField::LongTermDebt, vec![fy(2025, 500.0)])
            .with_series(FactField::CashAndEquivalents, vec![fy(2025, 100.0)])
            .with_series(FactField::OperatingIncome, vec![fy(2025, 150.0)])
            .with_series(FactField::DepreciationAmortization, vec![fy(2025, 50.0)]);
        let empty = FactSet::new();

        let leverage = compute_kpi(KpiId::NetDebtEbitda, &ctx(&facts, &empty)).unwrap();
        assert_relative_eq!(leverage.value.unwrap(), 2.0);
        assert_eq!(leverage.unit, brief_core::KpiUnit::Multiple);

        let no_ebitda = FactSet::new().with_series(FactField::LongTermDebt, vec![fy(2025, 500.0)]);
        let leverage = compute_kpi(KpiId::NetDebtEbitda, &ctx(&no_ebitda, &empty)).unwrap();
        assert!(leverage.value.is_none());
        assert!(leverage.computation.is_none());
    }

    #[test]
    fn test_zero_valued_inputs_are_kept() {
        let facts = FactSet::new()
            .with_series(FactField::Revenue, vec![fy(2025, 100.0)])
            .with_series(FactField::Sbc, vec![fy(2025, 0.0)]);
        let empty = FactSet::new();

        let sbc = compute_kpi(KpiId::SbcRevenue, &ctx(&facts, &empty)).unwrap();
        assert_eq!(sbc.value, Some(0.0));
    }

    #[test]
    fn test_missing_inputs_yield_absent_value_with_unknown_citation() {
        let empty = FactSet::new();
        let roe = compute_kpi(KpiId::Roe, &ctx(&empty, &empty)).unwrap();
        assert!(roe.value.is_none());
        assert!(roe.period.is_none());
        assert_eq!(roe.source.unwrap().source_type, "unknown");
    }

    #[test]
    fn test_fcf_yield_carries_denominator_note() {
        let facts = FactSet::new()
            .with_series(FactField::OperatingCashFlow, vec![fy(2025, 50.0)])
            .with_series(FactField::Capex, vec![fy(2025, 10.0)])
            .with_series(FactField::TotalAssets, vec![fy(2025, 400.0)]);
        let empty = FactSet::new();

        let fcf_yield = compute_kpi(KpiId::FcfYield, &ctx(&facts, &empty)).unwrap();
        assert_eq!(fcf_yield.value, Some(10.0));
        assert_eq!(fcf_yield.note.as_deref(), Some(FCF_YIELD_NOTE));
    }

    #[test]
    fn test_text_only_kpis_produce_placeholders() {
        let empty = FactSet::new();
        let placeholder = compute_kpi(KpiId::Nrr, &ctx(&empty, &empty)).unwrap();
        assert!(placeholder.value.is_none());
        assert_eq!(placeholder.unit, brief_core::KpiUnit::Percent);
        assert_eq!(placeholder.label, "Net Revenue Retention");
        assert_eq!(placeholder.note.as_deref(), Some(EXTRACTION_NOTE));
    }
}
