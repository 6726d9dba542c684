use brief_core::{
    BriefError, FactsProvider, QuoteProvider, RiskFreeRateProvider, SectorTemplate,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dcf::{reverse_dcf, DcfAssumptions};
use crate::ev::build_ev;
use crate::kpi::{compute_kpi, KpiContext};
use crate::models::QuantOutput;
use crate::scores::compute_score;

/// Runs the quant analysis for a ticker against a sector template.
///
/// Fetches facts, quote and risk-free rate concurrently, then computes the
/// EV bridge, reverse DCF, template KPIs and quality scores.
pub struct QuantEngine {
    facts_provider: Arc<dyn FactsProvider>,
    quote_provider: Arc<dyn QuoteProvider>,
    rate_provider: Arc<dyn RiskFreeRateProvider>,
    assumptions: DcfAssumptions,
}

impl QuantEngine {
    pub fn new(
        facts_provider: Arc<dyn FactsProvider>,
        quote_provider: Arc<dyn QuoteProvider>,
        rate_provider: Arc<dyn RiskFreeRateProvider>,
    ) -> Self {
        Self {
            facts_provider,
            quote_provider,
            rate_provider,
            assumptions: DcfAssumptions::default(),
        }
    }

    /// Override the reverse DCF assumptions
    pub fn with_assumptions(mut self, assumptions: DcfAssumptions) -> Self {
        self.assumptions = assumptions;
        self
    }

    pub fn assumptions(&self) -> &DcfAssumptions {
        &self.assumptions
    }

    pub async fn analyze(&self, ticker: &str, template: &SectorTemplate) -> Result<QuantOutput, BriefError> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(BriefError::InvalidData("empty ticker".to_string()));
        }

        tracing::info!("Running quant analysis for {} ({})", ticker, template.display_name);

        let (company, quote, risk_free) = tokio::try_join!(
            self.facts_provider.company_facts(&ticker),
            self.quote_provider.quote(&ticker),
            self.rate_provider.risk_free_rate(),
        )?;

        let facts = &company.facts;
        let entity_name = company.entity_name.as_str();
        let cik = company.cik.as_str();

        let ev_build = build_ev(facts, &quote, entity_name, cik);
        let market_implied = reverse_dcf(
            ev_build.enterprise_value,
            facts,
            entity_name,
            cik,
            risk_free.ten_year,
            &self.assumptions,
        );

        let ctx = KpiContext {
            facts,
            quarterly: &company.quarterly,
            entity_name,
            cik,
        };
        let sector_kpis: BTreeMap<_, _> = template
            .primary_kpis
            .iter()
            .filter_map(|def| compute_kpi(def.id, &ctx).map(|result| (def.id, result)))
            .collect();

        let quality_scores: BTreeMap<_, _> = template
            .include_scores
            .iter()
            .filter_map(|kind| compute_score(*kind, facts).map(|score| (*kind, score)))
            .collect();

        let excluded_scores = template
            .exclude_scores
            .iter()
            .map(|kind| (*kind, template.exclusion_reason(*kind).to_string()))
            .collect();

        let missing = sector_kpis.values().filter(|k| !k.has_value()).count();
        if missing > 0 {
            tracing::debug!("{}: {} of {} KPIs have no value", ticker, missing, sector_kpis.len());
        }
        tracing::info!(
            "{}: EV {:.0}, {} KPIs, {} scores",
            ticker,
            ev_build.enterprise_value,
            sector_kpis.len(),
            quality_scores.len()
        );

        Ok(QuantOutput {
            ticker,
            entity_name: company.entity_name.clone(),
            template_name: template.display_name.clone(),
            ev_build,
            market_implied,
            sector_kpis,
            quality_scores,
            excluded_scores,
            computed_at: Utc::now(),
        })
    }
}
