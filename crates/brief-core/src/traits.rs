use async_trait::async_trait;
use crate::{BriefError, CompanyFacts, Quote, RiskFreeRate};

/// Source of normalized annual and quarterly XBRL facts
#[async_trait]
pub trait FactsProvider: Send + Sync {
    async fn company_facts(&self, ticker: &str) -> Result<CompanyFacts, BriefError>;
}

/// Source of the latest price quote
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quote(&self, ticker: &str) -> Result<Quote, BriefError>;
}

/// Source of the long-dated Treasury yield
#[async_trait]
pub trait RiskFreeRateProvider: Send + Sync {
    async fn risk_free_rate(&self) -> Result<RiskFreeRate, BriefError>;
}
