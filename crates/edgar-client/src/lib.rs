pub mod config;
pub mod quote;
pub mod treasury;
pub mod xbrl;

pub use config::EdgarConfig;
pub use quote::YahooQuoteClient;
pub use treasury::TreasuryClient;
pub use xbrl::parse_company_facts;

use async_trait::async_trait;
use brief_core::{BriefError, CompanyFacts, FactsProvider};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const FACTS_BASE_URL: &str = "https://data.sec.gov/api/xbrl/companyfacts";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }
            let Some(&oldest) = ts.front() else {
                continue;
            };

            // Wait until the oldest request falls out of the window
            let sleep_dur = (oldest + self.window).duration_since(now) + Duration::from_millis(20);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {}ms for EDGAR slot", sleep_dur.as_millis());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Internal cache entry with timestamp
pub(crate) struct CacheEntry<T> {
    pub(crate) data: T,
    pub(crate) cached_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TickerRecord {
    cik_str: u64,
    ticker: String,
}

/// SEC EDGAR XBRL client. Resolves tickers to CIKs and normalizes the
/// `companyfacts` document into annual and quarterly fact sets.
pub struct EdgarClient {
    client: Client,
    config: EdgarConfig,
    rate_limiter: RateLimiter,
    /// Ticker -> zero-padded CIK
    cik_cache: DashMap<String, CacheEntry<String>>,
    /// Ticker -> normalized facts
    facts_cache: DashMap<String, CacheEntry<CompanyFacts>>,
}

impl EdgarClient {
    pub fn new(config: EdgarConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            rate_limiter: RateLimiter::new(config.rate_limit, Duration::from_secs(1)),
            config,
            cik_cache: DashMap::new(),
            facts_cache: DashMap::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(EdgarConfig::from_env())
    }

    fn fresh<T: Clone>(&self, cache: &DashMap<String, CacheEntry<T>>, key: &str) -> Option<T> {
        let entry = cache.get(key)?;
        let age = (Utc::now() - entry.cached_at).num_seconds();
        (age < self.config.cache_ttl_secs).then(|| entry.data.clone())
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, BriefError> {
        let request = builder.build().map_err(|e| BriefError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| BriefError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| BriefError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 2u64 << attempt;
            tracing::warn!("EDGAR 429 rate limited, waiting {}s before retry {}/3", wait_secs, attempt + 1);
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(BriefError::ApiError("Rate limited by EDGAR after 3 retries".to_string()))
    }

    async fn get_text(&self, url: &str) -> Result<String, BriefError> {
        let response = self
            .send_request(self.client.get(url).header("Accept", "application/json"))
            .await?;

        if !response.status().is_success() {
            return Err(BriefError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        response.text().await.map_err(|e| BriefError::ApiError(e.to_string()))
    }

    /// Resolve a ticker to its zero-padded 10-digit CIK
    pub async fn resolve_cik(&self, ticker: &str) -> Result<String, BriefError> {
        let key = ticker.trim().to_uppercase();
        if let Some(cik) = self.fresh(&self.cik_cache, &key) {
            return Ok(cik);
        }

        let body = self.get_text(TICKERS_URL).await?;
        let cik = find_cik(&body, &key)?
            .ok_or_else(|| BriefError::InvalidData(format!("Ticker {} not found in SEC EDGAR", key)))?;

        self.cik_cache.insert(key, CacheEntry {
            data: cik.clone(),
            cached_at: Utc::now(),
        });
        Ok(cik)
    }

    /// Fetch and normalize XBRL company facts (cached)
    pub async fn get_company_facts(&self, ticker: &str) -> Result<CompanyFacts, BriefError> {
        let key = ticker.trim().to_uppercase();
        if let Some(facts) = self.fresh(&self.facts_cache, &key) {
            tracing::debug!("companyfacts cache hit for {}", key);
            return Ok(facts);
        }

        let cik = self.resolve_cik(&key).await?;
        let url = format!("{}/CIK{}.json", FACTS_BASE_URL, cik);
        let body = self.get_text(&url).await?;
        let facts = parse_company_facts(&body, &key, &cik)?;

        tracing::info!(
            "Loaded companyfacts for {} ({}), {} annual fields",
            facts.entity_name,
            cik,
            facts.facts.fields().count()
        );

        self.facts_cache.insert(key, CacheEntry {
            data: facts.clone(),
            cached_at: Utc::now(),
        });
        Ok(facts)
    }
}

/// Look up `ticker` (already uppercased) in the `company_tickers.json` body
fn find_cik(body: &str, ticker: &str) -> Result<Option<String>, BriefError> {
    let records: HashMap<String, TickerRecord> =
        serde_json::from_str(body).map_err(|e| BriefError::ParseError(e.to_string()))?;

    Ok(records
        .values()
        .find(|r| r.ticker.eq_ignore_ascii_case(ticker))
        .map(|r| format!("{:010}", r.cik_str)))
}

#[async_trait]
impl FactsProvider for EdgarClient {
    async fn company_facts(&self, ticker: &str) -> Result<CompanyFacts, BriefError> {
        self.get_company_facts(ticker).await
    }
}
