use async_trait::async_trait;
use brief_core::{BriefError, Quote, QuoteProvider};
use chrono::Utc;
use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{CacheEntry, EdgarConfig};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
// Yahoo rejects non-browser agents
const BROWSER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    previous_close: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
}

/// Extract the quote from a chart response body. A missing or non-positive
/// market price falls back to the previous close.
fn parse_chart(body: &str) -> Result<Quote, BriefError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| BriefError::ParseError(e.to_string()))?;
    let meta = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .map(|r| r.meta)
        .ok_or_else(|| BriefError::InsufficientData("empty chart result".to_string()))?;

    let price = meta
        .regular_market_price
        .filter(|p| *p > 0.0)
        .or(meta.previous_close.filter(|p| *p > 0.0));

    Ok(Quote {
        price,
        currency: meta.currency.unwrap_or_else(|| "USD".to_string()),
    })
}

/// Latest price from the Yahoo Finance chart endpoint (no key required)
pub struct YahooQuoteClient {
    client: Client,
    cache_ttl_secs: i64,
    cache: DashMap<String, CacheEntry<Quote>>,
}

impl YahooQuoteClient {
    pub fn new(config: &EdgarConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(BROWSER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            cache_ttl_secs: config.cache_ttl_secs,
            cache: DashMap::new(),
        }
    }

    async fn fetch(&self, ticker: &str) -> Result<Quote, BriefError> {
        let url = format!("{}/{}", CHART_URL, ticker);
        let response = self
            .client
            .get(&url)
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await
            .map_err(|e| BriefError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BriefError::ApiError(format!("HTTP {}", response.status())));
        }

        let body = response.text().await.map_err(|e| BriefError::ApiError(e.to_string()))?;
        parse_chart(&body)
    }

    /// Never fails: an unreachable quote service yields `price: None`.
    pub async fn get_quote(&self, ticker: &str) -> Quote {
        let key = ticker.trim().to_uppercase();
        if let Some(entry) = self.cache.get(&key) {
            if (Utc::now() - entry.cached_at).num_seconds() < self.cache_ttl_secs {
                return entry.data.clone();
            }
        }

        match self.fetch(&key).await {
            Ok(quote) if quote.price.is_some() => {
                self.cache.insert(key, CacheEntry {
                    data: quote.clone(),
                    cached_at: Utc::now(),
                });
                quote
            }
            Ok(quote) => {
                tracing::warn!("Yahoo Finance returned no price for {}", key);
                quote
            }
            Err(e) => {
                tracing::warn!("Yahoo Finance unavailable ({}), price will be None", e);
                Quote::unavailable()
            }
        }
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteClient {
    async fn quote(&self, ticker: &str) -> Result<Quote, BriefError> {
        Ok(self.get_quote(ticker).await)
    }
}
