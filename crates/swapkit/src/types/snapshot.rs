use serde::{Deserialize, Serialize};

use super::chain::Chain;
use super::token::Token;

/// Cached set of known tokens and chains plus the time they were fetched.
///
/// `fetched_at_epoch_seconds == 0` means the registry has never been fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub tokens: Vec<Token>,

    #[serde(default)]
    pub chains: Vec<Chain>,

    #[serde(default)]
    pub fetched_at_epoch_seconds: u64,
}

impl RegistrySnapshot {
    pub fn is_empty(&self) -> bool {
        self.fetched_at_epoch_seconds == 0
    }

    /// Stale when never fetched or older than `ttl_secs` at `now`.
    pub fn is_stale(&self, now_epoch_seconds: u64, ttl_secs: u64) -> bool {
        self.fetched_at_epoch_seconds == 0
            || now_epoch_seconds.saturating_sub(self.fetched_at_epoch_seconds) > ttl_secs
    }
}

/// Body of `GET /v2/sdk-info`.
#[derive(Debug, Clone, Deserialize)]
pub struct SdkInfo {
    #[serde(default)]
    pub tokens: Vec<Token>,

    #[serde(default)]
    pub chains: Vec<Chain>,
}

impl SdkInfo {
    pub fn into_snapshot(self, fetched_at_epoch_seconds: u64) -> RegistrySnapshot {
        RegistrySnapshot {
            tokens: self.tokens,
            chains: self.chains,
            fetched_at_epoch_seconds,
        }
    }
}
