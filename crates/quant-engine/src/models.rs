use brief_core::{CitationSource, KpiId, KpiUnit, ScoreKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One line of the enterprise value bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvComponent {
    pub label: String,
    pub value: f64,
    pub source: CitationSource,
    pub computation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvBuild {
    pub market_cap: EvComponent,
    pub total_debt: EvComponent,
    pub cash: EvComponent,
    pub enterprise_value: f64,
    /// "EV = Market Cap ($X) + Debt ($Y) - Cash ($Z) = $EV"
    pub summary: String,
}

impl EvBuild {
    pub fn components(&self) -> [&EvComponent; 3] {
        [&self.market_cap, &self.total_debt, &self.cash]
    }
}

/// Growth expectations implied by the current enterprise value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketImplied {
    /// Constant 10-year FCF growth that equates the DCF to EV. `None` when no
    /// rate inside the search bracket works.
    pub implied_fcf_growth_10yr: Option<f64>,
    pub wacc: f64,
    pub wacc_build: String,
    pub fcf_used: f64,
    pub fcf_computation: String,
    pub ocf_used: f64,
    pub ocf_source: CitationSource,
    pub capex_used: f64,
    pub capex_source: CitationSource,
    pub fcf_source: CitationSource,
    pub terminal_growth: f64,
    pub ev_used: f64,
    /// "wacc +1%" / "wacc -1%" -> implied growth
    pub sensitivity: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiResult {
    pub kpi_id: KpiId,
    pub label: String,
    pub value: Option<f64>,
    pub unit: KpiUnit,
    /// "FY2025"
    pub period: Option<String>,
    #[serde(default)]
    pub prior_value: Option<f64>,
    #[serde(default)]
    pub yoy_delta: Option<f64>,
    #[serde(default)]
    pub qoq_value: Option<f64>,
    #[serde(default)]
    pub qoq_prior: Option<f64>,
    #[serde(default)]
    pub qoq_delta: Option<f64>,
    /// "Q3 FY2025"
    #[serde(default)]
    pub qoq_period: Option<String>,
    #[serde(default)]
    pub source: Option<CitationSource>,
    #[serde(default)]
    pub computation: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl KpiResult {
    /// Empty result carrying only the catalog label and unit
    pub fn empty(kpi_id: KpiId) -> Self {
        Self {
            kpi_id,
            label: kpi_id.label().to_string(),
            value: None,
            unit: kpi_id.unit(),
            period: None,
            prior_value: None,
            yoy_delta: None,
            qoq_value: None,
            qoq_prior: None,
            qoq_delta: None,
            qoq_period: None,
            source: None,
            computation: None,
            note: None,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub name: String,
    pub value: f64,
    pub interpretation: String,
    pub components: BTreeMap<String, f64>,
    /// Fiscal years the score was computed from, most recent first
    pub source_periods: Vec<String>,
}

/// Everything the quant engine produces for one ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantOutput {
    pub ticker: String,
    pub entity_name: String,
    pub template_name: String,
    pub ev_build: EvBuild,
    pub market_implied: Option<MarketImplied>,
    pub sector_kpis: BTreeMap<KpiId, KpiResult>,
    pub quality_scores: BTreeMap<ScoreKind, ScoreResult>,
    pub excluded_scores: BTreeMap<ScoreKind, String>,
    pub computed_at: DateTime<Utc>,
}

impl QuantOutput {
    pub fn kpi_value(&self, id: KpiId) -> Option<f64> {
        self.sector_kpis.get(&id).and_then(|k| k.value)
    }
}
