//! Piotroski F-Score and Beneish M-Score from two fiscal years of annual facts.

use brief_core::{FactField, FactSet, ScoreKind};
use std::collections::BTreeMap;

use crate::format::round_to;
use crate::models::ScoreResult;
use crate::quarters::safe_div;

pub const BENEISH_THRESHOLD: f64 = -1.78;

/// Dispatch a score kind. Kinds without an implementation are skipped.
pub fn compute_score(kind: ScoreKind, facts: &FactSet) -> Option<ScoreResult> {
    match kind {
        ScoreKind::PiotroskiF => Some(piotroski_f(facts)),
        ScoreKind::BeneishM => Some(beneish_m(facts)),
        ScoreKind::AltmanZ | ScoreKind::Greenblatt => {
            tracing::warn!("Unknown score requested: {}", kind);
            None
        }
    }
}

/// "FY2025", "FY2024" from the revenue series
fn source_periods(facts: &FactSet) -> Vec<String> {
    (0..2)
        .filter_map(|idx| facts.entry(FactField::Revenue, idx))
        .map(|e| e.fiscal_year_label())
        .collect()
}

fn signal(passed: bool) -> f64 {
    if passed {
        1.0
    } else {
        0.0
    }
}

fn increased(current: Option<f64>, prior: Option<f64>) -> bool {
    matches!((current, prior), (Some(cur), Some(prior)) if cur > prior)
}

/// Nine binary signals; any signal whose inputs are missing fails.
pub fn piotroski_f(facts: &FactSet) -> ScoreResult {
    let v = |field, idx| facts.value(field, idx);
    let mut signals = BTreeMap::new();

    // profitability
    let roa = safe_div(v(FactField::NetIncome, 0), v(FactField::TotalAssets, 0));
    let roa_prior = safe_div(v(FactField::NetIncome, 1), v(FactField::TotalAssets, 1));
    let ocf = v(FactField::OperatingCashFlow, 0);
    let ni = v(FactField::NetIncome, 0);

    signals.insert("1_roa_positive", signal(matches!(roa, Some(r) if r > 0.0)));
    signals.insert("2_ocf_positive", signal(matches!(ocf, Some(o) if o > 0.0)));
    signals.insert("3_roa_increasing", signal(increased(roa, roa_prior)));
    signals.insert("4_accruals_ocf_gt_ni", signal(increased(ocf, ni)));

    // leverage and liquidity; a year without long-term debt reads as zero
    // debt, but at least one year must report it
    let ltd = v(FactField::LongTermDebt, 0);
    let ltd_prior = v(FactField::LongTermDebt, 1);
    let leverage_decreasing = (ltd.is_some() || ltd_prior.is_some())
        && ltd.unwrap_or(0.0) <= ltd_prior.unwrap_or(0.0);
    signals.insert("5_leverage_decreasing", signal(leverage_decreasing));

    let current_ratio = safe_div(v(FactField::CurrentAssets, 0), v(FactField::CurrentLiabilities, 0));
    let current_ratio_prior =
        safe_div(v(FactField::CurrentAssets, 1), v(FactField::CurrentLiabilities, 1));
    signals.insert(
        "6_current_ratio_increasing",
        signal(increased(current_ratio, current_ratio_prior)),
    );

    let no_dilution = matches!(
        (v(FactField::SharesOutstanding, 0), v(FactField::SharesOutstanding, 1)),
        (Some(shares), Some(prior)) if shares <= prior
    );
    signals.insert("7_no_dilution", signal(no_dilution));

    // operating efficiency
    let gm = safe_div(v(FactField::GrossProfit, 0), v(FactField::Revenue, 0));
    let gm_prior = safe_div(v(FactField::GrossProfit, 1), v(FactField::Revenue, 1));
    signals.insert("8_gross_margin_increasing", signal(increased(gm, gm_prior)));

    let turnover = safe_div(v(FactField::Revenue, 0), v(FactField::TotalAssets, 0));
    let turnover_prior = safe_div(v(FactField::Revenue, 1), v(FactField::TotalAssets, 1));
    signals.insert(
        "9_asset_turnover_increasing",
        signal(increased(turnover, turnover_prior)),
    );

    let score: f64 = signals.values().sum();
    let interpretation = if score >= 7.0 {
        format!("Strong ({}/9): Improving profitability, leverage, and efficiency", score)
    } else if score >= 4.0 {
        format!("Moderate ({}/9): Mixed fundamental signals", score)
    } else {
        format!("Weak ({}/9): Deteriorating fundamentals across multiple dimensions", score)
    };

    ScoreResult {
        name: "Piotroski F-Score".to_string(),
        value: score,
        interpretation,
        components: signals.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        source_periods: source_periods(facts),
    }
}

/// `numerator / denominator`, zero when the denominator is zero
fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// `numerator / denominator`, neutral 1.0 when the denominator is zero
fn index_or_neutral(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        1.0
    }
}

/// Eight-variable earnings manipulation model. Missing line items read as
/// zero and indices with a zero denominator are neutral (1.0).
pub fn beneish_m(facts: &FactSet) -> ScoreResult {
    let v = |field, idx| facts.value(field, idx).unwrap_or(0.0);

    let (rev0, rev1) = (v(FactField::Revenue, 0), v(FactField::Revenue, 1));
    let (recv0, recv1) = (v(FactField::AccountsReceivable, 0), v(FactField::AccountsReceivable, 1));
    let (gp0, gp1) = (v(FactField::GrossProfit, 0), v(FactField::GrossProfit, 1));
    let (ta0, ta1) = (v(FactField::TotalAssets, 0), v(FactField::TotalAssets, 1));
    let (ca0, ca1) = (v(FactField::CurrentAssets, 0), v(FactField::CurrentAssets, 1));
    let (ppe0, ppe1) = (
        v(FactField::PropertyPlantEquipment, 0),
        v(FactField::PropertyPlantEquipment, 1),
    );
    let (da0, da1) = (
        v(FactField::DepreciationAmortization, 0),
        v(FactField::DepreciationAmortization, 1),
    );
    let (sga0, sga1) = (v(FactField::Sga, 0), v(FactField::Sga, 1));
    let (tl0, tl1) = (v(FactField::TotalLiabilities, 0), v(FactField::TotalLiabilities, 1));
    let ni0 = v(FactField::NetIncome, 0);
    let ocf0 = v(FactField::OperatingCashFlow, 0);

    let dsri = index_or_neutral(ratio_or_zero(recv0, rev0), ratio_or_zero(recv1, rev1));
    // margin deterioration raises the index
    let gmi = index_or_neutral(ratio_or_zero(gp1, rev1), ratio_or_zero(gp0, rev0));

    let asset_quality = |ca: f64, ppe: f64, ta: f64| {
        if ta != 0.0 {
            1.0 - (ca + ppe) / ta
        } else {
            0.0
        }
    };
    let aqi = index_or_neutral(asset_quality(ca0, ppe0, ta0), asset_quality(ca1, ppe1, ta1));
    let sgi = index_or_neutral(rev0, rev1);
    let depi = index_or_neutral(ratio_or_zero(da1, da1 + ppe1), ratio_or_zero(da0, da0 + ppe0));
    let sgai = index_or_neutral(ratio_or_zero(sga0, rev0), ratio_or_zero(sga1, rev1));
    let tata = ratio_or_zero(ni0 - ocf0, ta0);
    let lvgi = index_or_neutral(ratio_or_zero(tl0, ta0), ratio_or_zero(tl1, ta1));

    let m = -4.84 + 0.920 * dsri + 0.528 * gmi + 0.404 * aqi + 0.892 * sgi + 0.115 * depi
        - 0.172 * sgai
        + 4.679 * tata
        - 0.327 * lvgi;

    let interpretation = if m > BENEISH_THRESHOLD {
        format!("M-Score {:.2} > -1.78: Higher probability of earnings manipulation", m)
    } else {
        format!("M-Score {:.2} < -1.78: Lower probability of earnings manipulation", m)
    };

    let components = [
        ("DSRI", dsri),
        ("GMI", gmi),
        ("AQI", aqi),
        ("SGI", sgi),
        ("DEPI", depi),
        ("SGAI", sgai),
        ("TATA", tata),
        ("LVGI", lvgi),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), round_to(value, 3)))
    .collect();

    ScoreResult {
        name: "Beneish M-Score".to_string(),
        value: round_to(m, 2),
        interpretation,
        components,
        source_periods: source_periods(facts),
    }
}
