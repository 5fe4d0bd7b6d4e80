//! Batched ERC-20 allowance reads for every registry token.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::abi;
use crate::config::Config;
use crate::error::ReadError;
use crate::types::allowance::{AllowanceRecord, AllowanceSet};
use crate::types::token::Token;

/// A single read-only contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub address: String,
    pub calldata: Vec<u8>,
}

/// On-chain read capability.
///
/// `read_contracts` returns one result per call, in order. A failing call
/// must not fail the batch; only a transport-level failure returns `Err`.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn read_contracts(
        &self,
        chain_id: &str,
        calls: &[ContractCall],
    ) -> Result<Vec<Result<Vec<u8>, ReadError>>, ReadError>;
}

#[derive(Debug, Clone)]
struct AllowanceQuery {
    owner: String,
    spender: String,
    chain_id: String,
    tokens: Vec<Token>,
}

pub struct AllowanceAggregator {
    reader: Arc<dyn ChainReader>,
    max_batch_size: usize,
    last_query: Mutex<Option<AllowanceQuery>>,
}

impl AllowanceAggregator {
    pub fn new(reader: Arc<dyn ChainReader>, config: &Config) -> Self {
        Self {
            reader,
            max_batch_size: config.allowance_batch_size.max(1),
            last_query: Mutex::new(None),
        }
    }

    /// Read `allowance(owner, spender)` for every token.
    ///
    /// Returns an empty set without reading when the owner, spender or chain
    /// is missing or there are no tokens. Tokens whose read fails report `"0"`.
    pub async fn compute_allowances(
        &self,
        owner: Option<&str>,
        spender: Option<&str>,
        chain_id: Option<&str>,
        tokens: &[Token],
    ) -> AllowanceSet {
        let (Some(owner), Some(spender), Some(chain_id)) = (owner, spender, chain_id) else {
            return AllowanceSet::default();
        };

        let query = AllowanceQuery {
            owner: owner.to_string(),
            spender: spender.to_string(),
            chain_id: chain_id.to_string(),
            tokens: tokens.to_vec(),
        };
        *self.last_query.lock().unwrap_or_else(|e| e.into_inner()) = Some(query.clone());

        self.run(&query).await
    }

    /// Re-issue the last read, e.g. after an approval transaction confirms.
    pub async fn refetch(&self) -> AllowanceSet {
        let query = self
            .last_query
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match query {
            Some(query) => self.run(&query).await,
            None => AllowanceSet::default(),
        }
    }

    async fn run(&self, query: &AllowanceQuery) -> AllowanceSet {
        if query.tokens.is_empty() {
            return AllowanceSet::default();
        }

        let mut records = Vec::with_capacity(query.tokens.len());
        for chunk in query.tokens.chunks(self.max_batch_size) {
            let values = self.read_chunk(query, chunk).await;
            records.extend(
                chunk
                    .iter()
                    .cloned()
                    .zip(values)
                    .map(|(token, allowance)| AllowanceRecord { token, allowance }),
            );
        }

        tracing::debug!(
            "read {} allowances for spender {} on chain {}",
            records.len(),
            query.spender,
            query.chain_id
        );
        AllowanceSet { records }
    }

    /// One batched read. Always returns exactly `chunk.len()` values.
    async fn read_chunk(&self, query: &AllowanceQuery, chunk: &[Token]) -> Vec<String> {
        let zeros = || vec!["0".to_string(); chunk.len()];

        let calldata = match abi::encode_allowance(&query.owner, &query.spender) {
            Ok(calldata) => calldata,
            Err(e) => {
                tracing::warn!("cannot encode allowance call: {}", e);
                return zeros();
            }
        };
        let calls: Vec<ContractCall> = chunk
            .iter()
            .map(|token| ContractCall {
                address: token.address.clone(),
                calldata: calldata.clone(),
            })
            .collect();

        let results = match self.reader.read_contracts(&query.chain_id, &calls).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    "allowance batch of {} calls failed on chain {}: {}",
                    calls.len(),
                    query.chain_id,
                    e
                );
                return zeros();
            }
        };

        let mut results = results.into_iter();
        chunk
            .iter()
            .map(|token| match results.next() {
                Some(Ok(data)) => match abi::decode_uint256(&data) {
                    Ok(value) => value.to_string(),
                    Err(e) => {
                        tracing::warn!("bad allowance data for {}: {}", token.symbol, e);
                        "0".to_string()
                    }
                },
                Some(Err(e)) => {
                    tracing::warn!("allowance read for {} failed: {}", token.symbol, e);
                    "0".to_string()
                }
                None => "0".to_string(),
            })
            .collect()
    }
}
