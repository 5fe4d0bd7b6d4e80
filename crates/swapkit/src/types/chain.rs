use serde::{Deserialize, Serialize};

use super::token::string_or_number;

/// A supported chain as published by the SDK-info endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    /// Stable identifier, e.g. `"ethereum"`.
    pub id: String,

    #[serde(deserialize_with = "string_or_number")]
    pub chain_id: String,

    pub network_name: String,

    #[serde(rename = "chainIconURI")]
    #[serde(default)]
    pub chain_icon_uri: Option<String>,

    pub native_currency: NativeCurrency,

    #[serde(default)]
    pub is_testnet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
}
