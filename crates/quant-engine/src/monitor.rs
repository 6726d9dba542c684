//! Kill-criterion checks against freshly computed KPIs.

use brief_core::{KillCriterionTemplate, KillOperator, KpiId};
use serde::{Deserialize, Serialize};

use crate::format::round_to;
use crate::models::QuantOutput;

/// Within this percentage of the threshold a criterion is on watch
pub const WATCH_DISTANCE_PCT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillStatus {
    Ok,
    Watch,
    Breach,
    NoData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillCheck {
    pub description: String,
    pub metric: KpiId,
    pub operator: KillOperator,
    pub threshold: f64,
    pub current_value: Option<f64>,
    pub status: KillStatus,
    /// Distance from the threshold as a percentage of it; 0 on breach
    pub distance_pct: Option<f64>,
}

/// Compare a KPI reading with a kill threshold.
///
/// Breach is strict for both directions. Compound operators need history the
/// engine does not keep and evaluate as `Ok`.
pub fn evaluate_kill_criterion(
    current: Option<f64>,
    threshold: f64,
    operator: KillOperator,
) -> (KillStatus, Option<f64>) {
    let Some(current) = current else {
        return (KillStatus::NoData, None);
    };

    let distance = if threshold == 0.0 {
        None
    } else {
        Some((current - threshold).abs() / threshold.abs() * 100.0)
    };

    let breached = match operator {
        KillOperator::Below | KillOperator::AtOrBelow => current < threshold,
        KillOperator::Above | KillOperator::AtOrAbove => current > threshold,
        KillOperator::QoqDeclineAbove | KillOperator::BelowMidcycleBpsAbove => {
            return (KillStatus::Ok, distance);
        }
    };

    if breached {
        return (KillStatus::Breach, Some(0.0));
    }
    match distance {
        Some(d) if d < WATCH_DISTANCE_PCT => (KillStatus::Watch, Some(round_to(d, 1))),
        Some(d) => (KillStatus::Ok, Some(round_to(d, 1))),
        None => (KillStatus::Ok, None),
    }
}

/// Evaluate every criterion against the output's KPI values
pub fn check_kill_criteria(criteria: &[KillCriterionTemplate], output: &QuantOutput) -> Vec<KillCheck> {
    criteria
        .iter()
        .map(|criterion| {
            let current = output.kpi_value(criterion.metric);
            let (status, distance_pct) =
                evaluate_kill_criterion(current, criterion.threshold, criterion.operator);
            if status == KillStatus::Breach {
                tracing::warn!(
                    "{}: kill criterion breached ({} = {:?})",
                    output.ticker,
                    criterion.description,
                    current
                );
            }
            KillCheck {
                description: criterion.description.clone(),
                metric: criterion.metric,
                operator: criterion.operator,
                threshold: criterion.threshold,
                current_value: current,
                status,
                distance_pct,
            }
        })
        .collect()
}
