//! reqwest-backed implementations of the collaborator traits.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::allowance::{ChainReader, ContractCall};
use crate::config::Config;
use crate::error::{ConfigError, QuoteError, ReadError, RegistryError};
use crate::quote::RouteAggregator;
use crate::registry::SdkInfoSource;
use crate::types::quote::{RouteResponse, RoutePayload, SwapQuote};
use crate::types::snapshot::SdkInfo;

/// Shared client with the configured timeout.
pub fn build_client(config: &Config) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .user_agent(concat!("swapkit/", env!("CARGO_PKG_VERSION")))
        .timeout(config.http_timeout())
        .build()
        .map_err(|e| ConfigError::Client(e.to_string()))
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

pub struct HttpSdkInfoSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSdkInfoSource {
    pub fn new(client: reqwest::Client, api_url: &str) -> Self {
        Self {
            client,
            url: join_url(api_url, "/v2/sdk-info"),
        }
    }
}

#[async_trait]
impl SdkInfoSource for HttpSdkInfoSource {
    async fn fetch_sdk_info(&self) -> Result<SdkInfo, RegistryError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RegistryError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<SdkInfo>()
            .await
            .map_err(|e| RegistryError::Parse(e.to_string()))
    }
}

pub struct HttpRouteAggregator {
    client: reqwest::Client,
    url: String,
}

impl HttpRouteAggregator {
    pub fn new(client: reqwest::Client, api_url: &str) -> Self {
        Self {
            client,
            url: join_url(api_url, "/v2/route"),
        }
    }
}

#[async_trait]
impl RouteAggregator for HttpRouteAggregator {
    async fn fetch_route(&self, payload: &RoutePayload) -> Result<SwapQuote, QuoteError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| QuoteError::Fetch(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QuoteError::Fetch(e.to_string()))?;
        let parsed = serde_json::from_str::<RouteResponse>(&body);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| format!("route request returned status {}", status.as_u16()));
            return Err(QuoteError::classify(Some(status.as_u16()), &message));
        }

        parsed
            .map_err(|e| QuoteError::Fetch(format!("invalid route response: {e}")))?
            .into_result()
    }
}

/// `eth_call` over JSON-RPC batches.
pub struct JsonRpcReader {
    client: reqwest::Client,
    default_url: String,
    chain_urls: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    id: u64,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    message: String,
}

impl JsonRpcReader {
    pub fn new(client: reqwest::Client, default_url: &str) -> Self {
        Self {
            client,
            default_url: default_url.to_string(),
            chain_urls: HashMap::new(),
        }
    }

    /// Use `url` for reads on `chain_id`.
    pub fn with_chain(mut self, chain_id: &str, url: &str) -> Self {
        self.chain_urls.insert(chain_id.to_string(), url.to_string());
        self
    }

    fn url_for(&self, chain_id: &str) -> &str {
        self.chain_urls
            .get(chain_id)
            .map(String::as_str)
            .unwrap_or(&self.default_url)
    }
}

fn batch_body(calls: &[ContractCall]) -> serde_json::Value {
    serde_json::Value::Array(
        calls
            .iter()
            .enumerate()
            .map(|(id, call)| {
                serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "method": "eth_call",
                    "params": [
                        { "to": call.address, "data": format!("0x{}", hex::encode(&call.calldata)) },
                        "latest"
                    ]
                })
            })
            .collect(),
    )
}

fn parse_batch(len: usize, responses: Vec<RpcResponse>) -> Vec<Result<Vec<u8>, ReadError>> {
    let mut by_id: HashMap<u64, RpcResponse> =
        responses.into_iter().map(|r| (r.id, r)).collect();

    (0..len as u64)
        .map(|id| match by_id.remove(&id) {
            Some(RpcResponse {
                error: Some(error), ..
            }) => Err(ReadError::Reverted(error.message)),
            Some(RpcResponse {
                result: Some(result),
                ..
            }) => hex::decode(result.trim_start_matches("0x"))
                .map_err(|e| ReadError::InvalidReturnData(e.to_string())),
            Some(_) => Err(ReadError::InvalidReturnData("empty response".to_string())),
            None => Err(ReadError::Transport(format!("no response for call {id}"))),
        })
        .collect()
}

#[async_trait]
impl ChainReader for JsonRpcReader {
    async fn read_contracts(
        &self,
        chain_id: &str,
        calls: &[ContractCall],
    ) -> Result<Vec<Result<Vec<u8>, ReadError>>, ReadError> {
        let response = self
            .client
            .post(self.url_for(chain_id))
            .json(&batch_body(calls))
            .send()
            .await
            .map_err(|e| ReadError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ReadError::Transport(format!(
                "rpc returned status {}",
                response.status().as_u16()
            )));
        }

        let responses: Vec<RpcResponse> = response
            .json()
            .await
            .map_err(|e| ReadError::Transport(e.to_string()))?;
        Ok(parse_batch(calls.len(), responses))
    }
}
