use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::BriefError;

/// Normalized financial line item reported in XBRL filings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactField {
    Revenue,
    CostOfRevenue,
    GrossProfit,
    ResearchAndDevelopment,
    Sga,
    OperatingIncome,
    NetIncome,
    InterestExpense,
    IncomeTax,
    DepreciationAmortization,
    Sbc,
    TotalAssets,
    CurrentAssets,
    CashAndEquivalents,
    ShortTermInvestments,
    AccountsReceivable,
    Inventory,
    PropertyPlantEquipment,
    TotalLiabilities,
    CurrentLiabilities,
    LongTermDebt,
    ShortTermDebt,
    TotalEquity,
    RetainedEarnings,
    Goodwill,
    IntangibleAssets,
    OperatingCashFlow,
    Capex,
    DividendsPaid,
    ShareRepurchases,
    SharesOutstanding,
}

impl FactField {
    pub const ALL: [FactField; 31] = [
        FactField::Revenue,
        FactField::CostOfRevenue,
        FactField::GrossProfit,
        FactField::ResearchAndDevelopment,
        FactField::Sga,
        FactField::OperatingIncome,
        FactField::NetIncome,
        FactField::InterestExpense,
        FactField::IncomeTax,
        FactField::DepreciationAmortization,
        FactField::Sbc,
        FactField::TotalAssets,
        FactField::CurrentAssets,
        FactField::CashAndEquivalents,
        FactField::ShortTermInvestments,
        FactField::AccountsReceivable,
        FactField::Inventory,
        FactField::PropertyPlantEquipment,
        FactField::TotalLiabilities,
        FactField::CurrentLiabilities,
        FactField::LongTermDebt,
        FactField::ShortTermDebt,
        FactField::TotalEquity,
        FactField::RetainedEarnings,
        FactField::Goodwill,
        FactField::IntangibleAssets,
        FactField::OperatingCashFlow,
        FactField::Capex,
        FactField::DividendsPaid,
        FactField::ShareRepurchases,
        FactField::SharesOutstanding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FactField::Revenue => "revenue",
            FactField::CostOfRevenue => "cost_of_revenue",
            FactField::GrossProfit => "gross_profit",
            FactField::ResearchAndDevelopment => "research_and_development",
            FactField::Sga => "sga",
            FactField::OperatingIncome => "operating_income",
            FactField::NetIncome => "net_income",
            FactField::InterestExpense => "interest_expense",
            FactField::IncomeTax => "income_tax",
            FactField::DepreciationAmortization => "depreciation_amortization",
            FactField::Sbc => "sbc",
            FactField::TotalAssets => "total_assets",
            FactField::CurrentAssets => "current_assets",
            FactField::CashAndEquivalents => "cash_and_equivalents",
            FactField::ShortTermInvestments => "short_term_investments",
            FactField::AccountsReceivable => "accounts_receivable",
            FactField::Inventory => "inventory",
            FactField::PropertyPlantEquipment => "property_plant_equipment",
            FactField::TotalLiabilities => "total_liabilities",
            FactField::CurrentLiabilities => "current_liabilities",
            FactField::LongTermDebt => "long_term_debt",
            FactField::ShortTermDebt => "short_term_debt",
            FactField::TotalEquity => "total_equity",
            FactField::RetainedEarnings => "retained_earnings",
            FactField::Goodwill => "goodwill",
            FactField::IntangibleAssets => "intangible_assets",
            FactField::OperatingCashFlow => "operating_cash_flow",
            FactField::Capex => "capex",
            FactField::DividendsPaid => "dividends_paid",
            FactField::ShareRepurchases => "share_repurchases",
            FactField::SharesOutstanding => "shares_outstanding",
        }
    }

    /// Flow items are reported year-to-date in 10-Q filings; balance sheet
    /// items are point-in-time snapshots.
    pub fn is_cumulative(&self) -> bool {
        matches!(
            self,
            FactField::Revenue
                | FactField::CostOfRevenue
                | FactField::GrossProfit
                | FactField::OperatingIncome
                | FactField::NetIncome
                | FactField::ResearchAndDevelopment
                | FactField::Sga
                | FactField::Sbc
                | FactField::InterestExpense
                | FactField::IncomeTax
                | FactField::DepreciationAmortization
                | FactField::OperatingCashFlow
                | FactField::Capex
                | FactField::DividendsPaid
                | FactField::ShareRepurchases
        )
    }
}

impl fmt::Display for FactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactField {
    type Err = BriefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FactField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| BriefError::UnknownField(s.to_string()))
    }
}

/// Fiscal period code. Ordered so that a later period in the same fiscal year
/// sorts after an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FiscalPeriod {
    Q1,
    Q2,
    Q3,
    FY,
}

impl FiscalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FiscalPeriod::Q1 => "Q1",
            FiscalPeriod::Q2 => "Q2",
            FiscalPeriod::Q3 => "Q3",
            FiscalPeriod::FY => "FY",
        }
    }

    /// Quarter immediately before this one in the same fiscal year.
    pub fn previous_quarter(&self) -> Option<FiscalPeriod> {
        match self {
            FiscalPeriod::Q2 => Some(FiscalPeriod::Q1),
            FiscalPeriod::Q3 => Some(FiscalPeriod::Q2),
            FiscalPeriod::Q1 | FiscalPeriod::FY => None,
        }
    }

    pub fn is_quarter(&self) -> bool {
        !matches!(self, FiscalPeriod::FY)
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FiscalPeriod {
    type Err = BriefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Q1" => Ok(FiscalPeriod::Q1),
            "Q2" => Ok(FiscalPeriod::Q2),
            "Q3" => Ok(FiscalPeriod::Q3),
            "FY" => Ok(FiscalPeriod::FY),
            other => Err(BriefError::UnknownFiscalPeriod(other.to_string())),
        }
    }
}

/// One reported value of a line item, with the filing it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactEntry {
    pub value: f64,
    #[serde(default)]
    pub period_start: Option<NaiveDate>,
    pub period_end: NaiveDate,
    pub fiscal_year: i32,
    pub fiscal_period: FiscalPeriod,
    pub form: String,
    pub accession: String,
    pub filed: NaiveDate,
    #[serde(default)]
    pub concept: Option<String>,
}

impl FactEntry {
    /// "Q3 FY2025" / "FY FY2025" style label
    pub fn period_label(&self) -> String {
        format!("{} FY{}", self.fiscal_period, self.fiscal_year)
    }

    /// "FY2025"
    pub fn fiscal_year_label(&self) -> String {
        format!("FY{}", self.fiscal_year)
    }

    pub fn duration_days(&self) -> i64 {
        self.period_start
            .map(|start| (self.period_end - start).num_days())
            .unwrap_or(0)
    }
}

/// Per-field series of fact entries, each series sorted most-recent-first with
/// at most one entry per (fiscal year, fiscal period).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactSet {
    series: BTreeMap<FactField, Vec<FactEntry>>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the series for `field`. Duplicate fiscal periods
    /// keep the most recently filed entry; on equal filing dates the earlier
    /// entry in `entries` wins.
    pub fn insert_series(&mut self, field: FactField, mut entries: Vec<FactEntry>) {
        entries.sort_by(|a, b| {
            b.fiscal_year
                .cmp(&a.fiscal_year)
                .then(b.fiscal_period.cmp(&a.fiscal_period))
                .then(b.filed.cmp(&a.filed))
        });
        entries.dedup_by(|later, kept| {
            later.fiscal_year == kept.fiscal_year && later.fiscal_period == kept.fiscal_period
        });

        if entries.is_empty() {
            self.series.remove(&field);
        } else {
            self.series.insert(field, entries);
        }
    }

    /// Builder-style variant of [`FactSet::insert_series`]
    pub fn with_series(mut self, field: FactField, entries: Vec<FactEntry>) -> Self {
        self.insert_series(field, entries);
        self
    }

    pub fn series(&self, field: FactField) -> &[FactEntry] {
        self.series.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entry at `idx` (0 = most recent)
    pub fn entry(&self, field: FactField, idx: usize) -> Option<&FactEntry> {
        self.series(field).get(idx)
    }

    pub fn value(&self, field: FactField, idx: usize) -> Option<f64> {
        self.entry(field, idx).map(|e| e.value)
    }

    /// Position and entry for a given fiscal year and period
    pub fn find(
        &self,
        field: FactField,
        fiscal_year: i32,
        fiscal_period: FiscalPeriod,
    ) -> Option<(usize, &FactEntry)> {
        self.series(field)
            .iter()
            .enumerate()
            .find(|(_, e)| e.fiscal_year == fiscal_year && e.fiscal_period == fiscal_period)
    }

    pub fn fields(&self) -> impl Iterator<Item = FactField> + '_ {
        self.series.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Normalized XBRL facts for one filer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyFacts {
    pub entity_name: String,
    pub cik: String,
    /// Annual (10-K / 20-F) series
    pub facts: FactSet,
    /// Quarterly (10-Q) year-to-date series
    #[serde(default)]
    pub quarterly: FactSet,
}

/// Latest price quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub price: Option<f64>,
    pub currency: String,
}

impl Quote {
    pub fn unavailable() -> Self {
        Self {
            price: None,
            currency: "USD".to_string(),
        }
    }
}

/// Long-dated Treasury yield used as the risk-free rate (decimal, 0.0425 = 4.25%)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFreeRate {
    pub ten_year: f64,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// Citation attached to every reported number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationSource {
    pub source_type: String,
    pub filer: String,
    pub filing_date: Option<NaiveDate>,
    pub accession_number: Option<String>,
    pub url: Option<String>,
    pub description: String,
}

impl CitationSource {
    pub fn unknown(filer: &str) -> Self {
        Self {
            source_type: "unknown".to_string(),
            filer: filer.to_string(),
            filing_date: None,
            accession_number: None,
            url: None,
            description: String::new(),
        }
    }

    /// Cite the filing a fact entry was read from; `None` yields an
    /// `unknown` citation.
    pub fn from_entry(entry: Option<&FactEntry>, entity_name: &str, cik: &str) -> Self {
        let Some(entry) = entry else {
            return Self::unknown(entity_name);
        };

        let url = if entry.accession.is_empty() {
            None
        } else {
            let cik_num = match cik.trim_start_matches('0') {
                "" => "0",
                trimmed => trimmed,
            };
            Some(format!(
                "https://www.sec.gov/Archives/edgar/data/{}/{}/{}-index.htm",
                cik_num,
                entry.accession.replace('-', ""),
                entry.accession
            ))
        };

        Self {
            source_type: entry.form.clone(),
            filer: entity_name.to_string(),
            filing_date: Some(entry.filed),
            accession_number: if entry.accession.is_empty() {
                None
            } else {
                Some(entry.accession.clone())
            },
            url,
            description: format!(
                "{} from {} FY{}",
                entry.concept.as_deref().unwrap_or_default(),
                entry.form,
                entry.fiscal_year
            ),
        }
    }

    /// Citation for a figure derived from this one
    pub fn derived(&self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self.clone()
        }
    }
}
