//! Sector templates: which KPIs to compute, which quality scores apply, and
//! the default kill criteria for a thesis in that sector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::BriefError;

/// Every KPI the quant engine knows how to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiId {
    GrossMargin,
    RevenueGrowth,
    SbcRevenue,
    FcfMargin,
    #[serde(rename = "rule_of_40")]
    RuleOf40,
    InventoryDays,
    CapexIntensity,
    RAndDIntensity,
    OperatingMargin,
    FcfYield,
    Roe,
    NetDebtEbitda,
    Nrr,
    CacPayback,
    Backlog,
    BookToBill,
}

impl KpiId {
    pub const ALL: [KpiId; 16] = [
        KpiId::GrossMargin,
        KpiId::RevenueGrowth,
        KpiId::SbcRevenue,
        KpiId::FcfMargin,
        KpiId::RuleOf40,
        KpiId::InventoryDays,
        KpiId::CapexIntensity,
        KpiId::RAndDIntensity,
        KpiId::OperatingMargin,
        KpiId::FcfYield,
        KpiId::Roe,
        KpiId::NetDebtEbitda,
        KpiId::Nrr,
        KpiId::CacPayback,
        KpiId::Backlog,
        KpiId::BookToBill,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KpiId::GrossMargin => "gross_margin",
            KpiId::RevenueGrowth => "revenue_growth",
            KpiId::SbcRevenue => "sbc_revenue",
            KpiId::FcfMargin => "fcf_margin",
            KpiId::RuleOf40 => "rule_of_40",
            KpiId::InventoryDays => "inventory_days",
            KpiId::CapexIntensity => "capex_intensity",
            KpiId::RAndDIntensity => "r_and_d_intensity",
            KpiId::OperatingMargin => "operating_margin",
            KpiId::FcfYield => "fcf_yield",
            KpiId::Roe => "roe",
            KpiId::NetDebtEbitda => "net_debt_ebitda",
            KpiId::Nrr => "nrr",
            KpiId::CacPayback => "cac_payback",
            KpiId::Backlog => "backlog",
            KpiId::BookToBill => "book_to_bill",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            KpiId::GrossMargin => "Gross Margin",
            KpiId::RevenueGrowth => "Revenue Growth YoY",
            KpiId::SbcRevenue => "SBC / Revenue",
            KpiId::FcfMargin => "FCF Margin",
            KpiId::RuleOf40 => "Rule of 40",
            KpiId::InventoryDays => "Inventory Days",
            KpiId::CapexIntensity => "CapEx / Revenue",
            KpiId::RAndDIntensity => "R&D / Revenue",
            KpiId::OperatingMargin => "Operating Margin",
            KpiId::FcfYield => "FCF Yield (vs Total Assets)",
            KpiId::Roe => "Return on Equity",
            KpiId::NetDebtEbitda => "Net Debt / EBITDA",
            KpiId::Nrr => "Net Revenue Retention",
            KpiId::CacPayback => "CAC Payback Period",
            KpiId::Backlog => "Order Backlog",
            KpiId::BookToBill => "Book-to-Bill Ratio",
        }
    }

    pub fn unit(&self) -> KpiUnit {
        match self {
            KpiId::InventoryDays => KpiUnit::Days,
            KpiId::NetDebtEbitda | KpiId::BookToBill => KpiUnit::Multiple,
            KpiId::CacPayback => KpiUnit::Months,
            KpiId::Backlog => KpiUnit::Dollars,
            _ => KpiUnit::Percent,
        }
    }

    /// KPIs that only appear in filing text, never in XBRL
    pub fn requires_extraction(&self) -> bool {
        matches!(
            self,
            KpiId::Nrr | KpiId::CacPayback | KpiId::Backlog | KpiId::BookToBill
        )
    }
}

impl fmt::Display for KpiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KpiId {
    type Err = BriefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KpiId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| BriefError::UnknownKpi(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpiUnit {
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "$")]
    Dollars,
    #[serde(rename = "x")]
    Multiple,
    #[serde(rename = "days")]
    Days,
    #[serde(rename = "months")]
    Months,
    #[serde(rename = "")]
    Unitless,
}

impl KpiUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            KpiUnit::Percent => "%",
            KpiUnit::Dollars => "$",
            KpiUnit::Multiple => "x",
            KpiUnit::Days => "days",
            KpiUnit::Months => "months",
            KpiUnit::Unitless => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertDirection {
    DecliningYoy,
    DecliningQoq,
    ContextDependent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiDefinition {
    pub id: KpiId,
    pub label: String,
    pub unit: KpiUnit,
    pub description: String,
    #[serde(default)]
    pub alert_above: Option<f64>,
    #[serde(default)]
    pub alert_below: Option<f64>,
    #[serde(default)]
    pub alert_direction: Option<AlertDirection>,
    /// Where to look in the filing text when XBRL has no value
    #[serde(default)]
    pub extraction_hint: Option<String>,
}

impl KpiDefinition {
    pub fn new(id: KpiId, description: &str) -> Self {
        Self {
            id,
            label: id.label().to_string(),
            unit: id.unit(),
            description: description.to_string(),
            alert_above: None,
            alert_below: None,
            alert_direction: None,
            extraction_hint: None,
        }
    }

    pub fn alert_above(mut self, threshold: f64) -> Self {
        self.alert_above = Some(threshold);
        self
    }

    pub fn alert_below(mut self, threshold: f64) -> Self {
        self.alert_below = Some(threshold);
        self
    }

    pub fn alert_direction(mut self, direction: AlertDirection) -> Self {
        self.alert_direction = Some(direction);
        self
    }

    pub fn extraction_hint(mut self, hint: &str) -> Self {
        self.extraction_hint = Some(hint.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingAdjustment {
    pub name: String,
    pub description: String,
    pub computation: String,
}

impl AccountingAdjustment {
    fn new(name: &str, description: &str, computation: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            computation: computation.to_string(),
        }
    }
}

/// Comparison applied between a KPI value and a kill threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KillOperator {
    #[serde(rename = "<")]
    Below,
    #[serde(rename = "<=")]
    AtOrBelow,
    #[serde(rename = ">")]
    Above,
    #[serde(rename = ">=")]
    AtOrAbove,
    /// Percentage decline versus the prior quarter
    #[serde(rename = "qoq_decline >")]
    QoqDeclineAbove,
    /// Basis points below the mid-cycle average
    #[serde(rename = "below_midcycle_bps >")]
    BelowMidcycleBpsAbove,
}

impl KillOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            KillOperator::Below => "<",
            KillOperator::AtOrBelow => "<=",
            KillOperator::Above => ">",
            KillOperator::AtOrAbove => ">=",
            KillOperator::QoqDeclineAbove => "qoq_decline >",
            KillOperator::BelowMidcycleBpsAbove => "below_midcycle_bps >",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillCriterionTemplate {
    pub description: String,
    pub metric: KpiId,
    pub operator: KillOperator,
    pub threshold: f64,
    /// "1Q", "2Q", "1Y"
    pub duration: String,
}

impl KillCriterionTemplate {
    fn new(
        description: &str,
        metric: KpiId,
        operator: KillOperator,
        threshold: f64,
        duration: &str,
    ) -> Self {
        Self {
            description: description.to_string(),
            metric,
            operator,
            threshold,
            duration: duration.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMethod {
    Dcf,
    EvEbitda,
    EvRevenue,
    #[serde(rename = "p_b_roe")]
    PbRoe,
    Nav,
}

/// Quality scores a template can include or exclude
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    PiotroskiF,
    BeneishM,
    AltmanZ,
    Greenblatt,
}

impl ScoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreKind::PiotroskiF => "piotroski_f",
            ScoreKind::BeneishM => "beneish_m",
            ScoreKind::AltmanZ => "altman_z",
            ScoreKind::Greenblatt => "greenblatt",
        }
    }
}

impl fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_EXCLUDE_REASON: &str = "Not applicable to this sector";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorTemplate {
    pub sector: String,
    pub display_name: String,
    pub primary_kpis: Vec<KpiDefinition>,
    pub accounting_adjustments: Vec<AccountingAdjustment>,
    pub default_kill_criteria: Vec<KillCriterionTemplate>,
    pub primary_valuation: ValuationMethod,
    pub valuation_notes: String,
    pub include_scores: Vec<ScoreKind>,
    pub exclude_scores: Vec<ScoreKind>,
    #[serde(default)]
    pub exclude_reason: BTreeMap<ScoreKind, String>,
}

impl SectorTemplate {
    pub fn kpi(&self, id: KpiId) -> Option<&KpiDefinition> {
        self.primary_kpis.iter().find(|k| k.id == id)
    }

    pub fn exclusion_reason(&self, score: ScoreKind) -> &str {
        self.exclude_reason
            .get(&score)
            .map(String::as_str)
            .unwrap_or(DEFAULT_EXCLUDE_REASON)
    }

    pub fn saas() -> Self {
        Self {
            sector: "saas".to_string(),
            display_name: "SaaS / Cloud Software".to_string(),
            primary_kpis: vec![
                KpiDefinition::new(
                    KpiId::Nrr,
                    "Annual recurring revenue from existing customers YoY. \
                     Source: typically in 10-K revenue discussion or S-1. \
                     Not in XBRL, requires filing text extraction.",
                )
                .alert_below(105.0)
                .extraction_hint(
                    "Net revenue retention or net dollar retention rate, usually in MD&A key metrics",
                ),
                KpiDefinition::new(
                    KpiId::CacPayback,
                    "S&M spend / (net new ARR x gross margin). \
                     Compute from: 10-K SGA breakdown + ARR disclosure.",
                )
                .alert_above(24.0)
                .extraction_hint(
                    "Sales and marketing expense and net new ARR or customer acquisition payback",
                ),
                KpiDefinition::new(
                    KpiId::RuleOf40,
                    "Revenue growth % + FCF margin %. \
                     Source: computed from 10-K revenue + cash flow statement.",
                )
                .alert_below(30.0),
                KpiDefinition::new(
                    KpiId::GrossMargin,
                    "Source: 10-K income statement. \
                     Adjust: exclude SBC from COGS if material.",
                )
                .alert_below(70.0),
                KpiDefinition::new(
                    KpiId::SbcRevenue,
                    "Stock-based compensation as % of revenue. \
                     Source: 10-K cash flow statement or compensation note.",
                )
                .alert_above(25.0),
                KpiDefinition::new(
                    KpiId::FcfMargin,
                    "Free cash flow / revenue. \
                     Source: 10-K cash flow (operating CF - capex) / revenue.",
                ),
                KpiDefinition::new(
                    KpiId::RevenueGrowth,
                    "Total revenue year-over-year growth. Source: 10-K income statement.",
                ),
            ],
            accounting_adjustments: vec![
                AccountingAdjustment::new(
                    "SBC normalization",
                    "SaaS companies often have SBC at 15-30% of revenue. \
                     FCF looks great but earnings are diluted. Always compute \
                     FCF-minus-SBC as the 'real' free cash flow.",
                    "adjusted_fcf = reported_fcf - sbc_expense",
                ),
                AccountingAdjustment::new(
                    "Capitalized software costs",
                    "Some SaaS companies capitalize development costs, \
                     inflating operating income. Check 10-K intangibles note.",
                    "adjusted_opex = reported_opex + capitalized_dev_costs",
                ),
            ],
            default_kill_criteria: vec![
                KillCriterionTemplate::new(
                    "NRR < 105% for 2 consecutive quarters",
                    KpiId::Nrr,
                    KillOperator::Below,
                    105.0,
                    "2Q",
                ),
                KillCriterionTemplate::new(
                    "CAC payback > 30 months",
                    KpiId::CacPayback,
                    KillOperator::Above,
                    30.0,
                    "1Q",
                ),
                KillCriterionTemplate::new(
                    "SBC/Revenue > 30% and rising",
                    KpiId::SbcRevenue,
                    KillOperator::Above,
                    30.0,
                    "2Q",
                ),
                KillCriterionTemplate::new(
                    "Rule of 40 < 25% for 2 consecutive quarters",
                    KpiId::RuleOf40,
                    KillOperator::Below,
                    25.0,
                    "2Q",
                ),
            ],
            primary_valuation: ValuationMethod::EvRevenue,
            valuation_notes: "EV/Revenue or EV/NTM Revenue is primary. \
                DCF works but terminal value dominates, use with caution. \
                Always pair with Rule of 40 to judge if multiple is deserved."
                .to_string(),
            include_scores: vec![ScoreKind::BeneishM],
            exclude_scores: vec![ScoreKind::AltmanZ, ScoreKind::PiotroskiF, ScoreKind::Greenblatt],
            exclude_reason: BTreeMap::from([
                (
                    ScoreKind::AltmanZ,
                    "Designed for manufacturing firms. Working capital and \
                     retained earnings ratios are meaningless for SaaS."
                        .to_string(),
                ),
                (
                    ScoreKind::PiotroskiF,
                    "Asset turnover and leverage metrics don't apply. \
                     SaaS is asset-light and typically runs negative working capital."
                        .to_string(),
                ),
                (
                    ScoreKind::Greenblatt,
                    "EBIT/EV is often negative for growth SaaS. \
                     Ranking by earnings yield would exclude the best companies."
                        .to_string(),
                ),
            ]),
        }
    }

    pub fn semis() -> Self {
        Self {
            sector: "semis".to_string(),
            display_name: "Semiconductors".to_string(),
            primary_kpis: vec![
                KpiDefinition::new(
                    KpiId::Backlog,
                    "Unfilled orders. Source: 10-K order/backlog discussion \
                     or earnings release. Not in XBRL, requires filing text extraction.",
                )
                .alert_direction(AlertDirection::DecliningQoq)
                .extraction_hint("Order backlog or remaining performance obligations in dollars"),
                KpiDefinition::new(
                    KpiId::GrossMargin,
                    "Source: 10-K income statement. \
                     Critical to decompose: mix vs ASP vs utilization.",
                ),
                KpiDefinition::new(
                    KpiId::BookToBill,
                    "New orders / revenue. >1.0 = expanding. \
                     Source: earnings release or 10-Q. \
                     Not in XBRL, requires filing text extraction.",
                )
                .alert_below(0.9)
                .extraction_hint("Book-to-bill ratio or new bookings relative to revenue"),
                KpiDefinition::new(
                    KpiId::InventoryDays,
                    "Inventory / (COGS/365). Rising inventory days = \
                     demand softening or channel stuffing. Source: 10-K.",
                )
                .alert_direction(AlertDirection::ContextDependent),
                KpiDefinition::new(
                    KpiId::CapexIntensity,
                    "Capital intensity. Source: 10-K cash flow statement. \
                     Varies by fabless vs IDM.",
                ),
                KpiDefinition::new(
                    KpiId::RAndDIntensity,
                    "Innovation spend. Source: 10-K income statement.",
                )
                .alert_direction(AlertDirection::ContextDependent),
                KpiDefinition::new(
                    KpiId::RevenueGrowth,
                    "Total revenue year-over-year growth. Source: 10-K income statement.",
                ),
            ],
            accounting_adjustments: vec![
                AccountingAdjustment::new(
                    "Cycle normalization",
                    "Semi earnings are deeply cyclical. Use mid-cycle \
                     margins (avg of last full cycle, typically 3-5 years) \
                     for valuation. Trailing P/E is misleading at cycle peaks/troughs.",
                    "normalized_eps = mid_cycle_margin x current_revenue / shares",
                ),
                AccountingAdjustment::new(
                    "Gross margin bridge",
                    "Decompose gross margin changes into: (1) product mix, \
                     (2) ASP changes, (3) utilization rate, (4) input costs. \
                     Management often provides this in earnings calls.",
                    "See earnings call transcript for management bridge",
                ),
            ],
            default_kill_criteria: vec![
                KillCriterionTemplate::new(
                    "Backlog declines >15% QoQ",
                    KpiId::Backlog,
                    KillOperator::QoqDeclineAbove,
                    15.0,
                    "1Q",
                ),
                KillCriterionTemplate::new(
                    "Book-to-bill < 0.85 for 2 consecutive quarters",
                    KpiId::BookToBill,
                    KillOperator::Below,
                    0.85,
                    "2Q",
                ),
                KillCriterionTemplate::new(
                    "Inventory days > 120 and rising",
                    KpiId::InventoryDays,
                    KillOperator::Above,
                    120.0,
                    "2Q",
                ),
                KillCriterionTemplate::new(
                    "Gross margin below mid-cycle average by >500bps",
                    KpiId::GrossMargin,
                    KillOperator::BelowMidcycleBpsAbove,
                    500.0,
                    "2Q",
                ),
            ],
            primary_valuation: ValuationMethod::EvEbitda,
            valuation_notes: "EV/EBITDA on normalized (mid-cycle) earnings is primary. \
                P/E on trailing is deceptive at cycle turns. \
                For equipment companies, backlog visibility justifies forward estimates. \
                For commodity semis, use EV/normalized EBITDA through the cycle."
                .to_string(),
            include_scores: vec![ScoreKind::PiotroskiF, ScoreKind::BeneishM],
            exclude_scores: vec![ScoreKind::AltmanZ],
            exclude_reason: BTreeMap::from([(
                ScoreKind::AltmanZ,
                "Working capital fluctuates with inventory cycle. \
                 Would flag distress at cycle troughs when stocks are cheapest."
                    .to_string(),
            )]),
        }
    }
}

/// Every built-in template
pub fn all_templates() -> Vec<SectorTemplate> {
    vec![SectorTemplate::saas(), SectorTemplate::semis()]
}

/// Look up a built-in template by sector key
pub fn template(sector: &str) -> Result<SectorTemplate, BriefError> {
    match sector.to_ascii_lowercase().as_str() {
        "saas" => Ok(SectorTemplate::saas()),
        "semis" => Ok(SectorTemplate::semis()),
        _ => Err(BriefError::UnknownTemplate(sector.to_string())),
    }
}
