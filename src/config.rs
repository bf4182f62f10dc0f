use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Runtime knobs for the aggregation pipeline.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorConfig {
    #[serde(default = "AggregatorConfig::default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "AggregatorConfig::default_commitment")]
    pub commitment: String,
    #[serde(default = "AggregatorConfig::default_page_size")]
    pub page_size: usize,
    #[serde(default = "AggregatorConfig::default_detail_delay_ms")]
    pub detail_delay_ms: u64,
    #[serde(default = "AggregatorConfig::default_mint_lookup_delay_ms")]
    pub mint_lookup_delay_ms: u64,
    /// Native balance changes at or below this many lamports are ignored.
    #[serde(default)]
    pub native_delta_epsilon: u64,
    #[serde(default = "AggregatorConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            rpc_url: Self::default_rpc_url(),
            commitment: Self::default_commitment(),
            page_size: Self::default_page_size(),
            detail_delay_ms: Self::default_detail_delay_ms(),
            mint_lookup_delay_ms: Self::default_mint_lookup_delay_ms(),
            native_delta_epsilon: 0,
            request_timeout_secs: Self::default_request_timeout_secs(),
        }
    }
}

impl AggregatorConfig {
    fn default_rpc_url() -> String {
        DEFAULT_RPC_URL.to_string()
    }

    fn default_commitment() -> String {
        "confirmed".to_string()
    }

    const fn default_page_size() -> usize {
        5
    }

    const fn default_detail_delay_ms() -> u64 {
        250
    }

    const fn default_mint_lookup_delay_ms() -> u64 {
        60
    }

    const fn default_request_timeout_secs() -> u64 {
        30
    }

    /// Defaults overlaid with `SOLANA_RPC_URL` and the `ACTIVITY_*` variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("SOLANA_RPC_URL") {
            config.rpc_url = url;
        }
        if let Some(size) = env_parse::<usize>("ACTIVITY_PAGE_SIZE").filter(|size| *size > 0) {
            config.page_size = size;
        }
        if let Some(ms) = env_parse("ACTIVITY_DETAIL_DELAY_MS") {
            config.detail_delay_ms = ms;
        }
        if let Some(ms) = env_parse("ACTIVITY_MINT_DELAY_MS") {
            config.mint_lookup_delay_ms = ms;
        }
        config
    }

    /// Same pacing and paging, zero delays. Handy for tests and replays.
    pub fn without_delays(mut self) -> Self {
        self.detail_delay_ms = 0;
        self.mint_lookup_delay_ms = 0;
        self
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }

    pub fn mint_lookup_delay(&self) -> Duration {
        Duration::from_millis(self.mint_lookup_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring unparsable {key}={raw}");
                None
            }
        },
        Err(_) => None,
    }
}
