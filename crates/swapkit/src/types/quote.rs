use serde::{Deserialize, Serialize};

use crate::amount;
use crate::error::QuoteError;

pub const DEFAULT_SLIPPAGE_BPS: u32 = 100;

/// Raw quote inputs as the user is editing them. Any field may be missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteInputs {
    pub source_chain_id: Option<String>,
    pub destination_chain_id: Option<String>,
    pub source_token_address: Option<String>,
    pub destination_token_address: Option<String>,
    /// Human-readable amount, e.g. `"1.5"`.
    pub amount: Option<String>,
    pub slippage_bps: u32,
    /// Decimals of the source token, used to convert `amount` to base units.
    pub source_token_decimals: Option<u8>,
}

impl Default for QuoteInputs {
    fn default() -> Self {
        Self {
            source_chain_id: None,
            destination_chain_id: None,
            source_token_address: None,
            destination_token_address: None,
            amount: None,
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
            source_token_decimals: None,
        }
    }
}

impl QuoteInputs {
    /// Validate into a request key. `None` means the engine stays idle.
    pub fn to_request(&self) -> Option<QuoteRequest> {
        let source_chain_id = non_empty(&self.source_chain_id)?;
        let destination_chain_id = non_empty(&self.destination_chain_id)?;
        let source_token_address = non_empty(&self.source_token_address)?;
        let destination_token_address = non_empty(&self.destination_token_address)?;
        let amount = non_empty(&self.amount)?;

        if !is_positive_amount(&amount) {
            return None;
        }

        Some(QuoteRequest {
            source_chain_id,
            destination_chain_id,
            source_token_address: source_token_address.to_lowercase(),
            destination_token_address: destination_token_address.to_lowercase(),
            amount,
            slippage_bps: self.slippage_bps,
            source_token_decimals: self.source_token_decimals,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A finite number strictly greater than zero.
pub fn is_positive_amount(amount: &str) -> bool {
    amount
        .trim()
        .parse::<f64>()
        .map(|n| n.is_finite() && n > 0.0)
        .unwrap_or(false)
}

/// Identity key of a quote. Two requests are the same quote only if every
/// field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteRequest {
    pub source_chain_id: String,
    pub destination_chain_id: String,
    pub source_token_address: String,
    pub destination_token_address: String,
    pub amount: String,
    pub slippage_bps: u32,
    pub source_token_decimals: Option<u8>,
}

impl QuoteRequest {
    /// Build the aggregator payload. Fails if the amount cannot be expressed
    /// in the source token's base units.
    pub fn to_payload(&self) -> Result<RoutePayload, QuoteError> {
        let from_amount = match self.source_token_decimals {
            Some(decimals) => amount::to_base_units(&self.amount, decimals)
                .map_err(|e| QuoteError::Validation(e.to_string()))?
                .to_string(),
            None => self.amount.clone(),
        };

        Ok(RoutePayload {
            from_chain: self.source_chain_id.clone(),
            to_chain: self.destination_chain_id.clone(),
            from_token: self.source_token_address.clone(),
            to_token: self.destination_token_address.clone(),
            from_amount,
            slippage: self.slippage_bps as f64 / 100.0,
        })
    }
}

/// Normalized request body sent to the route aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePayload {
    pub from_chain: String,
    pub to_chain: String,
    pub from_token: String,
    pub to_token: String,
    pub from_amount: String,
    /// Percent, e.g. `1.0` for 100 bps.
    pub slippage: f64,
}

/// Aggregator response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<SwapQuote>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RouteResponse {
    pub fn into_result(self) -> Result<SwapQuote, QuoteError> {
        match (self.success, self.data) {
            (true, Some(quote)) => Ok(quote),
            (true, None) => Err(QuoteError::NoRoute),
            (false, _) => {
                let message = self.error.unwrap_or_else(|| "unknown error".to_string());
                Err(QuoteError::classify(None, &message))
            }
        }
    }
}

/// Best-route result. The fields the UI reads are typed; everything else is
/// kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    #[serde(default)]
    pub from_amount: String,
    #[serde(default)]
    pub to_amount: String,
    #[serde(default)]
    pub to_amount_min: String,
    #[serde(default)]
    pub exchange_rate: String,
    /// Seconds.
    #[serde(default)]
    pub estimated_route_duration: u64,
    #[serde(default)]
    pub fee_costs: Vec<FeeCost>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeCost {
    pub name: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub amount_usd: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_inputs(amount: &str) -> QuoteInputs {
        QuoteInputs {
            source_chain_id: Some("1".to_string()),
            destination_chain_id: Some("43114".to_string()),
            source_token_address: Some("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string()),
            destination_token_address: Some("0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E".to_string()),
            amount: Some(amount.to_string()),
            slippage_bps: 50,
            source_token_decimals: Some(6),
        }
    }

    #[test]
    fn test_invalid_amounts_stay_idle() {
        for amount in ["0", "-1", "abc", "", "NaN", "inf", "0.0"] {
            assert!(complete_inputs(amount).to_request().is_none(), "{amount}");
        }
    }

    #[test]
    fn test_missing_field_stays_idle() {
        let mut inputs = complete_inputs("1");
        inputs.destination_token_address = None;
        assert!(inputs.to_request().is_none());
    }

    #[test]
    fn test_request_normalizes_addresses() {
        let request = complete_inputs("1.5").to_request().unwrap();
        assert_eq!(
            request.source_token_address,
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );
        assert_eq!(request.amount, "1.5");
    }

    #[test]
    fn test_payload_converts_amount_and_slippage() {
        let payload = complete_inputs("1.5").to_request().unwrap().to_payload().unwrap();
        assert_eq!(payload.from_amount, "1500000");
        assert_eq!(payload.slippage, 0.5);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["fromChain"], "1");
        assert_eq!(json["fromAmount"], "1500000");
    }

    #[test]
    fn test_payload_rejects_excess_precision() {
        let request = complete_inputs("1.1234567").to_request().unwrap();
        assert!(matches!(request.to_payload(), Err(QuoteError::Validation(_))));
    }

    #[test]
    fn test_route_response_variants() {
        let ok: RouteResponse = serde_json::from_str(
            r#"{"success": true, "data": {"toAmount": "998000", "exchangeRate": "0.998", "route": {"hops": 2}}}"#,
        )
        .unwrap();
        let quote = ok.into_result().unwrap();
        assert_eq!(quote.to_amount, "998000");
        assert!(quote.extra.contains_key("route"));

        let empty: RouteResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(empty.into_result(), Err(QuoteError::NoRoute));

        let invalid: RouteResponse =
            serde_json::from_str(r#"{"success": false, "error": "Validation failed: toToken"}"#)
                .unwrap();
        assert!(matches!(invalid.into_result(), Err(QuoteError::Validation(_))));
    }
}
