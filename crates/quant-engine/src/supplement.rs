//! Fill KPI gaps with values extracted from filing text.

use brief_core::{CitationSource, KpiId, SectorTemplate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{KpiResult, QuantOutput};

/// A KPI the template wants but XBRL could not supply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub kpi_id: KpiId,
    pub label: String,
    pub hint: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        })
    }
}

/// One value read out of a filing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedKpi {
    pub kpi_id: KpiId,
    pub value: f64,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub exact_quote: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// The filing the extracted values were read from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingReference {
    pub form_type: String,
    pub accession_number: String,
    pub filing_date: Option<NaiveDate>,
    pub url: Option<String>,
}

const QUOTE_PREVIEW_CHARS: usize = 100;

/// Template KPIs with an extraction hint whose value is missing
pub fn kpis_needing_extraction(template: &SectorTemplate, output: &QuantOutput) -> Vec<ExtractionRequest> {
    template
        .primary_kpis
        .iter()
        .filter(|def| !output.sector_kpis.get(&def.id).is_some_and(KpiResult::has_value))
        .filter_map(|def| {
            def.extraction_hint.as_ref().map(|hint| ExtractionRequest {
                kpi_id: def.id,
                label: def.label.clone(),
                hint: hint.clone(),
            })
        })
        .collect()
}

impl QuantOutput {
    /// Merge extracted values into KPI slots that have no value. Values
    /// already computed from XBRL are never overwritten. Returns how many
    /// KPIs were filled.
    pub fn apply_supplements(
        &mut self,
        template: &SectorTemplate,
        filing: &FilingReference,
        extracted: &[ExtractedKpi],
    ) -> usize {
        let mut merged = 0;

        for item in extracted {
            let Some(def) = template.kpi(item.kpi_id) else {
                tracing::debug!("Ignoring extracted {}: not in template {}", item.kpi_id, template.sector);
                continue;
            };
            if self.sector_kpis.get(&item.kpi_id).is_some_and(KpiResult::has_value) {
                continue;
            }

            let mut note = format!("Extracted from filing ({} confidence)", item.confidence);
            if let Some(extra) = &item.note {
                note.push_str("; ");
                note.push_str(extra);
            }
            let preview: String = item.exact_quote.chars().take(QUOTE_PREVIEW_CHARS).collect();

            let result = KpiResult {
                label: def.label.clone(),
                unit: def.unit,
                value: Some(item.value),
                period: item.period.clone(),
                source: Some(CitationSource {
                    source_type: filing.form_type.clone(),
                    filer: self.ticker.clone(),
                    filing_date: filing.filing_date,
                    accession_number: Some(filing.accession_number.clone()),
                    url: filing.url.clone(),
                    description: format!("Extracted from {}: {}", filing.form_type, preview),
                }),
                computation: Some(format!("LLM extraction: \"{}\"", item.exact_quote)),
                note: Some(note),
                ..KpiResult::empty(item.kpi_id)
            };

            tracing::info!(
                "Extracted {} = {}{} for {} (confidence: {})",
                item.kpi_id,
                item.value,
                def.unit.as_str(),
                self.ticker,
                item.confidence
            );
            self.sector_kpis.insert(item.kpi_id, result);
            merged += 1;
        }

        merged
    }
}
