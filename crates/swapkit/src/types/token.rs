use serde::{Deserialize, Deserializer, Serialize};

/// Reserved address standing in for a chain's native currency in an
/// ERC-20 shaped token list.
pub const NATIVE_TOKEN_ADDRESS: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";

/// A tradable token as published by the SDK-info endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub address: String,

    #[serde(deserialize_with = "string_or_number")]
    pub chain_id: String,

    #[serde(default)]
    pub coingecko_id: Option<String>,

    pub decimals: u8,

    #[serde(rename = "logoURI")]
    #[serde(default)]
    pub logo_uri: Option<String>,

    pub name: String,

    pub symbol: String,
}

impl Token {
    /// Whether this is the native-currency placeholder.
    pub fn is_native(&self) -> bool {
        self.address.eq_ignore_ascii_case(NATIVE_TOKEN_ADDRESS)
    }

    /// Registry identity of this token.
    pub fn key(&self) -> TokenKey {
        TokenKey::new(&self.chain_id, &self.address)
    }
}

/// Normalized `(chain_id, address)` identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenKey {
    pub chain_id: String,
    pub address: String,
}

impl TokenKey {
    pub fn new(chain_id: &str, address: &str) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            address: address.to_lowercase(),
        }
    }
}

/// Accept a chain id encoded either as a JSON string or a JSON number.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}
