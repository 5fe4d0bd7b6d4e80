//! Minimal ABI encoding for the ERC-20 reads this crate issues.

use num_bigint::BigUint;
use tiny_keccak::{Hasher, Keccak};

use crate::error::ReadError;

pub const ALLOWANCE_SIGNATURE: &str = "allowance(address,address)";

/// Compute the 4-byte selector from a canonical function signature.
pub fn selector_from_signature(canonical: &str) -> [u8; 4] {
    let mut hasher = Keccak::v256();
    hasher.update(canonical.as_bytes());
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Parse a `0x`-prefixed 20-byte hex address.
pub fn parse_address(address: &str) -> Result<[u8; 20], ReadError> {
    let stripped = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    let bytes = hex::decode(stripped).map_err(|_| ReadError::InvalidAddress(address.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| ReadError::InvalidAddress(address.to_string()))
}

/// Left-pad an address into a 32-byte ABI word.
fn address_word(address: &[u8; 20]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}

/// Encode a call whose arguments are all addresses.
pub fn encode_address_call(signature: &str, args: &[&str]) -> Result<Vec<u8>, ReadError> {
    let mut calldata = Vec::with_capacity(4 + 32 * args.len());
    calldata.extend_from_slice(&selector_from_signature(signature));
    for arg in args {
        calldata.extend_from_slice(&address_word(&parse_address(arg)?));
    }
    Ok(calldata)
}

/// Calldata for `allowance(owner, spender)`.
pub fn encode_allowance(owner: &str, spender: &str) -> Result<Vec<u8>, ReadError> {
    encode_address_call(ALLOWANCE_SIGNATURE, &[owner, spender])
}

/// Decode a single `uint256` return value.
pub fn decode_uint256(data: &[u8]) -> Result<BigUint, ReadError> {
    if data.len() < 32 {
        return Err(ReadError::InvalidReturnData(format!(
            "expected 32 bytes, got {}",
            data.len()
        )));
    }
    Ok(BigUint::from_bytes_be(&data[..32]))
}
