//! Normalize SEC `companyfacts` JSON into typed [`FactSet`]s.

use brief_core::{BriefError, CompanyFacts, FactEntry, FactField, FactSet, FiscalPeriod};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;

/// Annual periods kept per field
pub const ANNUAL_PERIODS: usize = 5;
/// Quarterly (Q1..Q3) periods kept per field
pub const QUARTERLY_PERIODS: usize = 12;

const ANNUAL_FORMS: [&str; 4] = ["10-K", "10-K/A", "20-F", "20-F/A"];
const QUARTERLY_FORMS: [&str; 2] = ["10-Q", "10-Q/A"];
const NAMESPACES: [&str; 2] = ["us-gaap", "dei"];

/// Candidate XBRL concepts for a field, in order of preference, and the unit
/// key the values are reported in.
pub fn concepts(field: FactField) -> (&'static [&'static str], &'static str) {
    let concepts: &'static [&'static str] = match field {
        FactField::Revenue => &[
            "RevenueFromContractWithCustomerExcludingAssessedTax",
            "Revenues",
            "SalesRevenueNet",
            "RevenueFromContractWithCustomerIncludingAssessedTax",
        ],
        FactField::CostOfRevenue => &["CostOfGoodsAndServicesSold", "CostOfRevenue", "CostOfGoodsSold"],
        FactField::GrossProfit => &["GrossProfit"],
        FactField::ResearchAndDevelopment => &["ResearchAndDevelopmentExpense"],
        FactField::Sga => &["SellingGeneralAndAdministrativeExpense"],
        FactField::OperatingIncome => &["OperatingIncomeLoss"],
        FactField::NetIncome => &["NetIncomeLoss"],
        FactField::InterestExpense => &["InterestExpense", "InterestExpenseDebt"],
        FactField::IncomeTax => &["IncomeTaxExpenseBenefit"],
        FactField::DepreciationAmortization => &[
            "DepreciationDepletionAndAmortization",
            "DepreciationAndAmortization",
            "Depreciation",
        ],
        FactField::Sbc => &["ShareBasedCompensation", "AllocatedShareBasedCompensationExpense"],
        FactField::TotalAssets => &["Assets"],
        FactField::CurrentAssets => &["AssetsCurrent"],
        FactField::CashAndEquivalents => &[
            "CashAndCashEquivalentsAtCarryingValue",
            "CashCashEquivalentsAndShortTermInvestments",
        ],
        FactField::ShortTermInvestments => &[
            "ShortTermInvestments",
            "AvailableForSaleSecuritiesCurrent",
            "MarketableSecuritiesCurrent",
        ],
        FactField::AccountsReceivable => &["AccountsReceivableNetCurrent", "AccountsReceivableNet"],
        FactField::Inventory => &["InventoryNet"],
        FactField::PropertyPlantEquipment => &["PropertyPlantAndEquipmentNet"],
        FactField::TotalLiabilities => &["Liabilities"],
        FactField::CurrentLiabilities => &["LiabilitiesCurrent"],
        FactField::LongTermDebt => &["LongTermDebtNoncurrent", "LongTermDebt"],
        FactField::ShortTermDebt => &["ShortTermBorrowings", "DebtCurrent", "LongTermDebtCurrent"],
        FactField::TotalEquity => &[
            "StockholdersEquity",
            "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
        ],
        FactField::RetainedEarnings => &["RetainedEarningsAccumulatedDeficit"],
        FactField::Goodwill => &["Goodwill"],
        FactField::IntangibleAssets => &[
            "IntangibleAssetsNetExcludingGoodwill",
            "FiniteLivedIntangibleAssetsNet",
        ],
        FactField::OperatingCashFlow => &["NetCashProvidedByUsedInOperatingActivities"],
        FactField::Capex => &["PaymentsToAcquirePropertyPlantAndEquipment"],
        FactField::DividendsPaid => &["PaymentsOfDividends", "PaymentsOfDividendsCommonStock"],
        FactField::ShareRepurchases => &["PaymentsForRepurchaseOfCommonStock"],
        FactField::SharesOutstanding => &[
            "EntityCommonStockSharesOutstanding",
            "CommonStockSharesOutstanding",
        ],
    };
    let unit = match field {
        FactField::SharesOutstanding => "shares",
        _ => "USD",
    };
    (concepts, unit)
}

// Wire structures
#[derive(Debug, Deserialize)]
struct RawCompanyFacts {
    #[serde(rename = "entityName", default)]
    entity_name: Option<String>,
    #[serde(default)]
    facts: HashMap<String, HashMap<String, RawConcept>>,
}

#[derive(Debug, Deserialize)]
struct RawConcept {
    #[serde(default)]
    units: HashMap<String, Vec<RawFact>>,
}

#[derive(Debug, Deserialize)]
struct RawFact {
    val: f64,
    #[serde(default)]
    start: Option<String>,
    end: String,
    #[serde(default)]
    fy: Option<i32>,
    #[serde(default)]
    fp: Option<String>,
    #[serde(default)]
    form: Option<String>,
    #[serde(default)]
    accn: Option<String>,
    #[serde(default)]
    filed: Option<String>,
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

impl RawFact {
    fn to_entry(&self, concept: &str) -> Option<FactEntry> {
        Some(FactEntry {
            value: self.val,
            period_start: self.start.as_deref().and_then(parse_date),
            period_end: parse_date(&self.end)?,
            fiscal_year: self.fy?,
            fiscal_period: self.fp.as_deref()?.parse().ok()?,
            form: self.form.clone()?,
            accession: self.accn.clone().unwrap_or_default(),
            filed: parse_date(self.filed.as_deref()?)?,
            concept: Some(concept.to_string()),
        })
    }
}

/// Which slice of the filings a series is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cadence {
    Annual,
    Quarterly,
}

impl Cadence {
    fn accepts(&self, entry: &FactEntry) -> bool {
        match self {
            Cadence::Annual => {
                entry.fiscal_period == FiscalPeriod::FY && ANNUAL_FORMS.contains(&entry.form.as_str())
            }
            Cadence::Quarterly => {
                entry.fiscal_period.is_quarter() && QUARTERLY_FORMS.contains(&entry.form.as_str())
            }
        }
    }

    fn limit(&self) -> usize {
        match self {
            Cadence::Annual => ANNUAL_PERIODS,
            Cadence::Quarterly => QUARTERLY_PERIODS,
        }
    }
}

/// Build one field's series from a concept's raw facts. A filing reports
/// prior-period comparatives under its own fiscal year and period, so within
/// one (fy, fp) the latest filing wins, then the latest period end, then the
/// longest duration (year-to-date over the three-month figure).
fn series_for(raw: &[RawFact], concept: &str, cadence: Cadence) -> Vec<FactEntry> {
    let mut entries: Vec<FactEntry> = raw
        .iter()
        .filter_map(|fact| fact.to_entry(concept))
        .filter(|entry| cadence.accepts(entry))
        .collect();

    entries.sort_by(|a, b| {
        b.fiscal_year
            .cmp(&a.fiscal_year)
            .then(b.fiscal_period.cmp(&a.fiscal_period))
            .then(b.filed.cmp(&a.filed))
            .then(b.period_end.cmp(&a.period_end))
            .then(b.duration_days().cmp(&a.duration_days()))
    });
    entries.dedup_by(|later, kept| {
        later.fiscal_year == kept.fiscal_year && later.fiscal_period == kept.fiscal_period
    });
    entries.truncate(cadence.limit());
    entries
}

fn find_series(
    namespaces: &[&HashMap<String, RawConcept>],
    field: FactField,
    cadence: Cadence,
) -> Option<Vec<FactEntry>> {
    let (candidates, unit) = concepts(field);
    candidates.iter().find_map(|concept| {
        let raw = namespaces
            .iter()
            .find_map(|ns| ns.get(*concept))
            .and_then(|c| c.units.get(unit))?;
        let entries = series_for(raw, concept, cadence);
        (!entries.is_empty()).then_some(entries)
    })
}

/// Parse a `companyfacts` response body into annual and quarterly fact sets.
/// Each field takes the first candidate concept that has data for the cadence.
pub fn parse_company_facts(body: &str, ticker: &str, cik: &str) -> Result<CompanyFacts, BriefError> {
    let raw: RawCompanyFacts =
        serde_json::from_str(body).map_err(|e| BriefError::ParseError(e.to_string()))?;

    let empty = HashMap::new();
    let namespaces: Vec<&HashMap<String, RawConcept>> = NAMESPACES
        .iter()
        .map(|ns| raw.facts.get(*ns).unwrap_or(&empty))
        .collect();

    let mut facts = FactSet::new();
    let mut quarterly = FactSet::new();
    for field in FactField::ALL {
        if let Some(entries) = find_series(&namespaces, field, Cadence::Annual) {
            facts.insert_series(field, entries);
        }
        if let Some(entries) = find_series(&namespaces, field, Cadence::Quarterly) {
            quarterly.insert_series(field, entries);
        }
    }

    let entity_name = raw
        .entity_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| ticker.to_uppercase());

    tracing::debug!(
        "{} ({}): {} annual fields, {} quarterly fields",
        entity_name,
        cik,
        facts.fields().count(),
        quarterly.fields().count()
    );

    Ok(CompanyFacts {
        entity_name,
        cik: cik.to_string(),
        facts,
        quarterly,
    })
}
