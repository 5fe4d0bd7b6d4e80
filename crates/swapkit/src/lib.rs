pub mod abi;
pub mod allowance;
pub mod amount;
pub mod config;
pub mod error;
pub mod history;
#[cfg(feature = "http")]
pub mod http;
pub mod ordering;
pub mod quote;
pub mod registry;
pub mod retry;
pub mod storage;
pub mod types;

// Re-exports for convenience
pub use allowance::{AllowanceAggregator, ChainReader, ContractCall};
pub use config::Config;
pub use error::Error;
pub use history::{TransferHistory, TransferRecord, TransferStatus};
pub use quote::{QuoteEngine, QuoteState, RouteAggregator};
pub use registry::{RegistryCache, SdkInfoSource};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use types::allowance::{AllowanceRecord, AllowanceSet};
pub use types::chain::Chain;
pub use types::quote::{QuoteInputs, QuoteRequest, SwapQuote};
pub use types::snapshot::RegistrySnapshot;
pub use types::token::{Token, NATIVE_TOKEN_ADDRESS};

/// Allowances for every registry token on `chain_id`, in display order.
///
/// This is the token-selector view: registry tokens for the active chain
/// (native placeholder excluded) joined with the connected account's
/// allowance toward `spender`. Missing owner, spender or chain yields an
/// empty set.
pub async fn tokens_with_allowances(
    registry: &RegistryCache,
    allowances: &AllowanceAggregator,
    owner: Option<&str>,
    spender: Option<&str>,
    chain_id: Option<&str>,
) -> AllowanceSet {
    let Some(chain) = chain_id else {
        return AllowanceSet::default();
    };
    let tokens = registry.tokens_for_chain(chain);
    allowances
        .compute_allowances(owner, spender, Some(chain), &tokens)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ReadError, RegistryError};
    use crate::types::snapshot::SdkInfo;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedSource;

    #[async_trait]
    impl SdkInfoSource for FixedSource {
        async fn fetch_sdk_info(&self) -> Result<SdkInfo, RegistryError> {
            let json = r#"{
                "chains": [],
                "tokens": [
                    {"address": "0x0000000000000000000000000000000000000009", "chainId": "1", "decimals": 18, "name": "Wrapped Ether", "symbol": "WETH"},
                    {"address": "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee", "chainId": "1", "decimals": 18, "name": "Ether", "symbol": "ETH"},
                    {"address": "0x0000000000000000000000000000000000000002", "chainId": "1", "decimals": 6, "name": "USD Coin", "symbol": "USDC"},
                    {"address": "0x0000000000000000000000000000000000000003", "chainId": 56, "decimals": 18, "name": "Tether USD", "symbol": "USDT"}
                ]
            }"#;
            serde_json::from_str(json).map_err(|e| RegistryError::Parse(e.to_string()))
        }
    }

    /// WETH has an allowance, everything else does not.
    struct WethOnlyReader;

    #[async_trait]
    impl ChainReader for WethOnlyReader {
        async fn read_contracts(
            &self,
            _chain_id: &str,
            calls: &[ContractCall],
        ) -> Result<Vec<Result<Vec<u8>, ReadError>>, ReadError> {
            Ok(calls
                .iter()
                .map(|call| {
                    let mut word = vec![0u8; 32];
                    if call.address.ends_with('9') {
                        word[31] = 7;
                    }
                    Ok(word)
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_tokens_with_allowances_pipeline() {
        let config = Config::default();
        let registry = RegistryCache::init(
            Arc::new(FixedSource),
            Arc::new(MemoryStorage::new()),
            &config,
        );
        registry.ensure_fresh().await.unwrap();
        let allowances = AllowanceAggregator::new(Arc::new(WethOnlyReader), &config);

        let owner = "0x1111111111111111111111111111111111111111";
        let spender = "0x2222222222222222222222222222222222222222";
        let set =
            tokens_with_allowances(&registry, &allowances, Some(owner), Some(spender), Some("1"))
                .await;

        let symbols: Vec<&str> = set.records.iter().map(|r| r.token.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["USDC", "WETH"]);
        assert_eq!(set.records[0].allowance, "0");
        assert_eq!(set.records[1].allowance, "7");
        let approved: Vec<&str> = set.approved_tokens().iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(approved, vec!["WETH"]);

        let none = tokens_with_allowances(&registry, &allowances, Some(owner), Some(spender), None).await;
        assert!(none.is_empty());
    }
}
