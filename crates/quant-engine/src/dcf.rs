//! Reverse DCF: the constant 10-year FCF growth rate the market is pricing in.

use brief_core::{CitationSource, FactField, FactSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::format::fmt_usd;
use crate::models::MarketImplied;

/// Fixed inputs of the reverse DCF
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfAssumptions {
    pub beta: f64,
    pub equity_risk_premium: f64,
    /// Long-run nominal growth used in the Gordon terminal value
    pub terminal_growth: f64,
    pub projection_years: u32,
    /// Search bracket for the implied growth rate
    pub growth_floor: f64,
    pub growth_cap: f64,
    /// Absolute tolerance on the growth rate
    pub tolerance: f64,
    pub max_iterations: u32,
    /// WACC shift for the sensitivity band
    pub wacc_shift: f64,
}

impl Default for DcfAssumptions {
    fn default() -> Self {
        Self {
            beta: 1.0,
            equity_risk_premium: 0.045,
            terminal_growth: 0.025,
            projection_years: 10,
            growth_floor: -0.30,
            growth_cap: 0.60,
            tolerance: 1e-12,
            max_iterations: 200,
            wacc_shift: 0.01,
        }
    }
}

impl DcfAssumptions {
    pub fn wacc(&self, risk_free: f64) -> f64 {
        risk_free + self.beta * self.equity_risk_premium
    }

    /// "rf 4.25% + beta 1.0 x ERP 4.5% = 8.75%"
    pub fn wacc_build(&self, risk_free: f64) -> String {
        format!(
            "rf {:.2}% + beta {:.1} x ERP {:.1}% = {:.2}%",
            risk_free * 100.0,
            self.beta,
            self.equity_risk_premium * 100.0,
            self.wacc(risk_free) * 100.0
        )
    }
}

/// Present value of `fcf` compounding at `growth` for `years`, plus a Gordon
/// terminal value, all discounted at `wacc`.
pub fn dcf_value(growth: f64, fcf: f64, wacc: f64, terminal_growth: f64, years: u32) -> f64 {
    let mut pv = 0.0;
    let mut projected = fcf;
    for t in 1..=years {
        projected *= 1.0 + growth;
        pv += projected / (1.0 + wacc).powi(t as i32);
    }
    let terminal_value = projected * (1.0 + terminal_growth) / (wacc - terminal_growth);
    pv + terminal_value / (1.0 + wacc).powi(years as i32)
}

/// Brent's method on `[lower, upper]`. `None` when the bracket has no sign
/// change, the function goes non-finite, or it runs out of iterations.
fn brent_root<F>(f: F, lower: f64, upper: f64, tolerance: f64, max_iterations: u32) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    let (mut a, mut b) = (lower, upper);
    let (mut fa, mut fb) = (f(a), f(b));
    if !fa.is_finite() || !fb.is_finite() {
        return None;
    }
    if fa == 0.0 {
        return Some(a);
    }
    if fb == 0.0 {
        return Some(b);
    }
    if fa.signum() == fb.signum() {
        return None;
    }

    let (mut c, mut fc) = (b, fb);
    let mut d = b - a;
    let mut e = d;

    for _ in 0..max_iterations {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * tolerance;
        let mid = 0.5 * (c - b);
        if mid.abs() <= tol || fb == 0.0 {
            return Some(b);
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            // inverse quadratic interpolation, or secant when only two points
            let s = fb / fa;
            let (p, q) = if a == c {
                (2.0 * mid * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * mid * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            let q = if p > 0.0 { -q } else { q };
            let p = p.abs();

            let bound = (3.0 * mid * q - (tol * q).abs()).min((e * q).abs());
            if 2.0 * p < bound {
                e = d;
                d = p / q;
            } else {
                d = mid;
                e = d;
            }
        } else {
            d = mid;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(mid) };
        fb = f(b);
        if !fb.is_finite() {
            return None;
        }
    }

    None
}

/// Growth rate that equates the DCF to `ev`, or `None` when no rate inside
/// the assumption bracket does.
pub fn solve_implied_growth(ev: f64, fcf: f64, wacc: f64, assumptions: &DcfAssumptions) -> Option<f64> {
    if wacc <= assumptions.terminal_growth {
        tracing::warn!(
            "Reverse DCF: WACC {:.2}% does not exceed terminal growth {:.2}%",
            wacc * 100.0,
            assumptions.terminal_growth * 100.0
        );
        return None;
    }

    let objective = |g: f64| {
        dcf_value(g, fcf, wacc, assumptions.terminal_growth, assumptions.projection_years) - ev
    };

    let root = brent_root(
        objective,
        assumptions.growth_floor,
        assumptions.growth_cap,
        assumptions.tolerance,
        assumptions.max_iterations,
    );

    if root.is_none() {
        tracing::warn!(
            "Reverse DCF: no solution in [{:.0}%, +{:.0}%] range",
            assumptions.growth_floor * 100.0,
            assumptions.growth_cap * 100.0
        );
    }
    root
}

/// Reverse DCF from the latest annual OCF and CapEx. Skipped (`None`) when
/// either input is missing.
pub fn reverse_dcf(
    ev: f64,
    facts: &FactSet,
    entity_name: &str,
    cik: &str,
    risk_free: f64,
    assumptions: &DcfAssumptions,
) -> Option<MarketImplied> {
    let (Some(ocf), Some(capex)) = (
        facts.value(FactField::OperatingCashFlow, 0),
        facts.value(FactField::Capex, 0),
    ) else {
        tracing::warn!("Cannot compute reverse DCF for {}: missing OCF or capex", entity_name);
        return None;
    };

    let fcf = ocf - capex;
    if fcf <= 0.0 {
        tracing::warn!(
            "FCF is non-positive ({}) for {}, reverse DCF may not converge",
            fmt_usd(fcf),
            entity_name
        );
    }

    let wacc = assumptions.wacc(risk_free);
    let implied = solve_implied_growth(ev, fcf, wacc, assumptions);

    let mut sensitivity = BTreeMap::new();
    for (shift, label) in [
        (assumptions.wacc_shift, "wacc +1%"),
        (-assumptions.wacc_shift, "wacc -1%"),
    ] {
        sensitivity.insert(
            label.to_string(),
            solve_implied_growth(ev, fcf, wacc + shift, assumptions),
        );
    }

    let ocf_source = CitationSource::from_entry(
        facts.entry(FactField::OperatingCashFlow, 0),
        entity_name,
        cik,
    );
    let capex_source = CitationSource::from_entry(facts.entry(FactField::Capex, 0), entity_name, cik);
    let fcf_computation = format!(
        "FCF = OCF ({}) - CapEx ({}) = {}",
        fmt_usd(ocf),
        fmt_usd(capex),
        fmt_usd(fcf)
    );
    let fcf_source = ocf_source.derived(fcf_computation.clone());

    Some(MarketImplied {
        implied_fcf_growth_10yr: implied,
        wacc,
        wacc_build: assumptions.wacc_build(risk_free),
        fcf_used: fcf,
        fcf_computation,
        ocf_used: ocf,
        ocf_source,
        capex_used: capex,
        capex_source,
        fcf_source,
        terminal_growth: assumptions.terminal_growth,
        ev_used: ev,
        sensitivity,
    })
}
