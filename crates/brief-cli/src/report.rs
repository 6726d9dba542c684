//! Plain-text rendering of a quant brief.

use brief_core::SectorTemplate;
use quant_engine::format::{fmt_delta, fmt_kpi_value, fmt_rate};
use quant_engine::{ExtractionRequest, KillCheck, KillStatus, QuantOutput};
use std::fmt::Write;

fn status_label(status: KillStatus) -> &'static str {
    match status {
        KillStatus::Ok => "OK",
        KillStatus::Watch => "WATCH",
        KillStatus::Breach => "BREACH",
        KillStatus::NoData => "NO DATA",
    }
}

/// Render the brief in template order. `fmt::Write` into a `String` is infallible.
pub fn render(
    output: &QuantOutput,
    template: &SectorTemplate,
    checks: &[KillCheck],
    pending: &[ExtractionRequest],
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{} ({}) - {}", output.entity_name, output.ticker, output.template_name);
    let _ = writeln!(out, "Computed {}", output.computed_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out);

    let _ = writeln!(out, "Enterprise value");
    let _ = writeln!(out, "  {}", output.ev_build.summary);
    for component in output.ev_build.components() {
        let _ = writeln!(out, "  {:<12} {}", component.label, component.computation);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Market-implied expectations");
    match &output.market_implied {
        Some(implied) => {
            let _ = writeln!(
                out,
                "  Implied 10Y FCF growth: {}",
                fmt_rate(implied.implied_fcf_growth_10yr)
            );
            let _ = writeln!(out, "  WACC: {}", implied.wacc_build);
            let _ = writeln!(out, "  FCF: {}", implied.fcf_computation);
            for (label, growth) in &implied.sensitivity {
                let _ = writeln!(out, "  {}: {}", label, fmt_rate(*growth));
            }
        }
        None => {
            let _ = writeln!(out, "  N/A (missing operating cash flow or capex)");
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Sector KPIs");
    for def in &template.primary_kpis {
        let Some(kpi) = output.sector_kpis.get(&def.id) else {
            continue;
        };
        let mut line = format!(
            "  {:<28} {:>12}",
            kpi.label,
            fmt_kpi_value(kpi.value, kpi.unit)
        );
        if let Some(period) = &kpi.period {
            let _ = write!(line, "  {}", period);
        }
        let delta = fmt_delta(kpi.yoy_delta);
        if !delta.is_empty() {
            let _ = write!(line, "  YoY {}", delta);
        }
        if let (Some(period), Some(value)) = (&kpi.qoq_period, kpi.qoq_value) {
            let _ = write!(line, "  [{}: {}", period, fmt_kpi_value(Some(value), kpi.unit));
            let qoq = fmt_delta(kpi.qoq_delta);
            if !qoq.is_empty() {
                let _ = write!(line, ", QoQ {}", qoq);
            }
            line.push(']');
        }
        if kpi.value.is_none() {
            if let Some(note) = &kpi.note {
                let _ = write!(line, "  ({})", note);
            }
        }
        let _ = writeln!(out, "{}", line);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Quality scores");
    for (kind, score) in &output.quality_scores {
        let _ = writeln!(out, "  {:<12} {:>7.2}  {}", kind.as_str(), score.value, score.interpretation);
    }
    for (kind, reason) in &output.excluded_scores {
        let _ = writeln!(out, "  {:<12} excluded: {}", kind.as_str(), reason);
    }

    if !checks.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Kill criteria");
        for check in checks {
            let distance = check
                .distance_pct
                .map(|d| format!(" ({:.1}% from threshold)", d))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "  [{}] {}{}",
                status_label(check.status),
                check.description,
                distance
            );
        }
    }

    if !pending.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Needs filing extraction");
        for request in pending {
            let _ = writeln!(out, "  {}: {}", request.label, request.hint);
        }
    }

    out
}
