pub mod dcf;
pub mod engine;
pub mod ev;
pub mod format;
pub mod kpi;
pub mod models;
pub mod monitor;
pub mod quarters;
pub mod scores;
pub mod supplement;
#[cfg(test)]
mod tests;

pub use dcf::{reverse_dcf, solve_implied_growth, DcfAssumptions};
pub use engine::QuantEngine;
pub use ev::build_ev;
pub use kpi::{compute_kpi, KpiContext};
pub use models::*;
pub use monitor::{check_kill_criteria, evaluate_kill_criterion, KillCheck, KillStatus};
pub use scores::{beneish_m, compute_score, piotroski_f};
pub use supplement::{
    kpis_needing_extraction, Confidence, ExtractedKpi, ExtractionRequest, FilingReference,
};
