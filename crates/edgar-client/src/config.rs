use std::env;

pub const DEFAULT_USER_AGENT: &str = "ThesisOS user@example.com";

/// Settings shared by the SEC, Yahoo and Treasury adapters
#[derive(Debug, Clone)]
pub struct EdgarConfig {
    /// SEC fair-access policy requires a contact in the User-Agent
    pub user_agent: String,
    /// Max EDGAR requests per second
    pub rate_limit: usize,
    pub cache_ttl_secs: i64,
    /// 10Y yield used when the Treasury API is unreachable
    pub risk_free_fallback: f64,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            rate_limit: 10,
            cache_ttl_secs: 900,
            risk_free_fallback: 0.0425,
        }
    }
}

impl EdgarConfig {
    /// Read overrides from the environment; unset or unparsable values keep
    /// their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let user_agent = env::var("SEC_USER_AGENT")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.user_agent);
        if user_agent == DEFAULT_USER_AGENT {
            tracing::warn!("SEC_USER_AGENT not set, EDGAR may throttle the default agent");
        }

        Self {
            user_agent,
            rate_limit: env::var("EDGAR_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.rate_limit),
            cache_ttl_secs: env::var("DATA_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_ttl_secs),
            risk_free_fallback: env::var("RISK_FREE_FALLBACK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.risk_free_fallback),
        }
    }
}
