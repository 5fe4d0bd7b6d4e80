use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::token::{Token, TokenKey};

/// Allowance granted by the connected account to a spender for one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceRecord {
    pub token: Token,
    /// Base-unit amount as a decimal string.
    pub allowance: String,
}

impl AllowanceRecord {
    /// True when the allowance parses as a non-zero integer.
    pub fn is_approved(&self) -> bool {
        self.allowance
            .parse::<BigUint>()
            .map(|n| n != BigUint::from(0u8))
            .unwrap_or(false)
    }
}

/// Allowance records for one `(owner, spender, chain)` triple, in token order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowanceSet {
    pub records: Vec<AllowanceRecord>,
}

impl AllowanceSet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Tokens with a non-zero allowance, preserving order.
    pub fn approved_tokens(&self) -> Vec<&Token> {
        self.records
            .iter()
            .filter(|r| r.is_approved())
            .map(|r| &r.token)
            .collect()
    }

    /// Allowance recorded for the token identified by `key`.
    pub fn allowance_of(&self, key: &TokenKey) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.token.key() == *key)
            .map(|r| r.allowance.as_str())
    }
}
