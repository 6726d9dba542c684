use async_trait::async_trait;
use brief_core::{BriefError, RiskFreeRate, RiskFreeRateProvider};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::EdgarConfig;

const AVG_RATES_URL: &str =
    "https://api.fiscaldata.treasury.gov/services/api/fiscal_service/v2/accounting/od/avg_interest_rates";

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    data: Vec<RateRecord>,
}

#[derive(Debug, Deserialize)]
struct RateRecord {
    #[serde(default)]
    record_date: Option<String>,
    /// Percent, reported as a string ("4.123")
    #[serde(default)]
    avg_interest_rate_amt: Option<String>,
}

/// Latest Treasury Bonds average rate from a fiscaldata response, as a decimal
fn parse_rates(body: &str) -> Result<RiskFreeRate, BriefError> {
    let response: RatesResponse =
        serde_json::from_str(body).map_err(|e| BriefError::ParseError(e.to_string()))?;
    let record = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| BriefError::InsufficientData("no Treasury rate records".to_string()))?;

    let percent: f64 = record
        .avg_interest_rate_amt
        .as_deref()
        .ok_or_else(|| BriefError::InsufficientData("record has no rate".to_string()))?
        .trim()
        .parse()
        .map_err(|e: std::num::ParseFloatError| BriefError::ParseError(e.to_string()))?;

    Ok(RiskFreeRate {
        ten_year: percent / 100.0,
        as_of: record
            .record_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
    })
}

/// Risk-free rate from the Treasury fiscal data API, with a configured fallback
pub struct TreasuryClient {
    client: Client,
    fallback: f64,
    cache_ttl_secs: i64,
    cached: RwLock<Option<(RiskFreeRate, DateTime<Utc>)>>,
}

impl TreasuryClient {
    pub fn new(config: &EdgarConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            fallback: config.risk_free_fallback,
            cache_ttl_secs: config.cache_ttl_secs,
            cached: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<RiskFreeRate, BriefError> {
        let response = self
            .client
            .get(AVG_RATES_URL)
            .query(&[
                ("sort", "-record_date"),
                ("page[size]", "1"),
                ("filter", "security_desc:eq:Treasury Bonds"),
            ])
            .send()
            .await
            .map_err(|e| BriefError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BriefError::ApiError(format!("HTTP {}", response.status())));
        }

        let body = response.text().await.map_err(|e| BriefError::ApiError(e.to_string()))?;
        parse_rates(&body)
    }

    /// Never fails: API errors fall back to the configured rate with no date.
    pub async fn get_rate(&self) -> RiskFreeRate {
        if let Some((rate, fetched_at)) = self.cached.read().await.as_ref() {
            if (Utc::now() - *fetched_at).num_seconds() < self.cache_ttl_secs {
                return rate.clone();
            }
        }

        match self.fetch().await {
            Ok(rate) => {
                tracing::debug!("Treasury rate {:.3}% as of {:?}", rate.ten_year * 100.0, rate.as_of);
                *self.cached.write().await = Some((rate.clone(), Utc::now()));
                rate
            }
            Err(e) => {
                tracing::warn!(
                    "Treasury API unavailable ({}), using {:.2}% fallback",
                    e,
                    self.fallback * 100.0
                );
                RiskFreeRate {
                    ten_year: self.fallback,
                    as_of: None,
                }
            }
        }
    }
}

#[async_trait]
impl RiskFreeRateProvider for TreasuryClient {
    async fn risk_free_rate(&self) -> Result<RiskFreeRate, BriefError> {
        Ok(self.get_rate().await)
    }
}
