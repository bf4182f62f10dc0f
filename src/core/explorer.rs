use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

pub const EXPLORER_BASE_URL: &str = "https://explorer.solana.com";

/// Network an RPC endpoint serves, guessed from its URL.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Cluster {
    Mainnet,
    Devnet,
    Testnet,
    Localhost,
    Unknown,
}

impl Cluster {
    pub fn from_endpoint(endpoint: &str) -> Self {
        // hostname when it parses, so query strings (api keys) cannot match
        let haystack = Url::parse(endpoint)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
            .unwrap_or_else(|| endpoint.to_ascii_lowercase());

        if haystack.contains("devnet") {
            Self::Devnet
        } else if haystack.contains("testnet") {
            Self::Testnet
        } else if haystack.contains("mainnet-beta") || haystack.contains("api.mainnet") {
            Self::Mainnet
        } else if haystack.contains("localhost") || haystack.contains("127.0.0.1") {
            Self::Localhost
        } else {
            Self::Unknown
        }
    }

    /// `cluster` query value used by the explorer, `None` on mainnet.
    pub fn explorer_param(self) -> Option<&'static str> {
        match self {
            Self::Devnet | Self::Localhost => Some("devnet"),
            Self::Testnet => Some("testnet"),
            Self::Mainnet | Self::Unknown => None,
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mainnet => "Mainnet",
            Self::Devnet => "Devnet",
            Self::Testnet => "Testnet",
            Self::Localhost => "Localhost",
            Self::Unknown => "Unknown",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExplorerTarget {
    Tx,
    Address,
    Token,
}

impl ExplorerTarget {
    fn path(self) -> &'static str {
        match self {
            Self::Tx => "tx",
            Self::Address => "address",
            Self::Token => "token",
        }
    }
}

pub fn explorer_url(target: ExplorerTarget, value: &str, cluster: Cluster) -> String {
    let base = format!("{EXPLORER_BASE_URL}/{}/{value}", target.path());
    match cluster.explorer_param() {
        Some(param) => format!("{base}?cluster={param}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cluster_from_host() {
        assert_eq!(Cluster::from_endpoint("https://api.devnet.solana.com"), Cluster::Devnet);
        assert_eq!(Cluster::from_endpoint("https://api.testnet.solana.com"), Cluster::Testnet);
        assert_eq!(
            Cluster::from_endpoint("https://api.mainnet-beta.solana.com"),
            Cluster::Mainnet
        );
        assert_eq!(Cluster::from_endpoint("http://127.0.0.1:8899"), Cluster::Localhost);
        assert_eq!(
            Cluster::from_endpoint("https://rpc.example.com/?tag=devnet"),
            Cluster::Unknown
        );
    }

    #[test]
    fn cluster_param_only_off_mainnet() {
        assert_eq!(
            explorer_url(ExplorerTarget::Tx, "abc", Cluster::Mainnet),
            "https://explorer.solana.com/tx/abc"
        );
        assert_eq!(
            explorer_url(ExplorerTarget::Address, "xyz", Cluster::Devnet),
            "https://explorer.solana.com/address/xyz?cluster=devnet"
        );
        assert_eq!(
            explorer_url(ExplorerTarget::Token, "m", Cluster::Testnet),
            "https://explorer.solana.com/token/m?cluster=testnet"
        );
    }
}
