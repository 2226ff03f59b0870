use num_bigint::BigUint;
use shared::{Error, Result};

/// Four-byte selectors for the ERC20 view functions used by the reader.
pub const SELECTOR_NAME: &str = "0x06fdde03";
pub const SELECTOR_SYMBOL: &str = "0x95d89b41";
pub const SELECTOR_DECIMALS: &str = "0x313ce567";
pub const SELECTOR_BALANCE_OF: &str = "0x70a08231";

/// Validate an Ethereum-compatible address format (0x + 40 hex chars)
pub fn validate_address(address: &str) -> Result<String> {
    if !address.starts_with("0x") {
        return Err(Error::InvalidWalletAddress(
            "Address must start with 0x".to_string(),
        ));
    }

    if address.len() != 42 {
        return Err(Error::InvalidWalletAddress(
            "Address must be 42 characters (0x + 40 hex)".to_string(),
        ));
    }

    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidWalletAddress(
            "Address must contain only hexadecimal characters".to_string(),
        ));
    }

    Ok(address.to_lowercase())
}

/// Encode `balanceOf(address)` calldata: selector plus the owner address
/// left-padded to a 32-byte word.
pub fn encode_balance_of(owner: &str) -> Result<String> {
    let owner = validate_address(owner)?;
    Ok(format!("{}{:0>64}", SELECTOR_BALANCE_OF, &owner[2..]))
}

fn strip_return(data: &str) -> Result<&str> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    if stripped.is_empty() {
        // eth_call against an address with no deployed code returns "0x"
        return Err(Error::ContractCall(
            "empty return data (no code at address)".to_string(),
        ));
    }
    Ok(stripped)
}

/// Decode a single uint256 return value.
pub fn decode_uint(data: &str) -> Result<BigUint> {
    let stripped = strip_return(data)?;
    BigUint::parse_bytes(stripped.as_bytes(), 16)
        .ok_or_else(|| Error::ContractCall(format!("invalid uint return data: {}", data)))
}

/// Largest `decimals` value accepted from a token contract.
pub const MAX_TOKEN_DECIMALS: u8 = 18;

/// Decode a token `decimals` return value.
///
/// Anything above [`MAX_TOKEN_DECIMALS`] is treated as malformed
/// metadata; downstream normalization and ordering assume 0-18.
pub fn decode_u8(data: &str) -> Result<u8> {
    let value = decode_uint(data)?;
    let decimals = u8::try_from(&value)
        .map_err(|_| Error::ContractCall(format!("decimals out of range: {}", value)))?;
    if decimals > MAX_TOKEN_DECIMALS {
        return Err(Error::ContractCall(format!(
            "decimals out of range: {}",
            decimals
        )));
    }
    Ok(decimals)
}

/// Interpret a 32-byte word as a usize, rejecting values that cannot be
/// an offset or length inside the returned buffer.
fn word_to_usize(word: &[u8]) -> Result<usize> {
    if word.len() != 32 || word[..24].iter().any(|&b| b != 0) {
        return Err(Error::ContractCall(
            "malformed ABI offset or length word".to_string(),
        ));
    }
    let mut value = [0u8; 8];
    value.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(value))
        .map_err(|_| Error::ContractCall("ABI offset overflows usize".to_string()))
}

/// Decode a string return value.
///
/// Handles the standard dynamic `string` encoding (offset word, length
/// word, UTF-8 payload) and the legacy fixed `bytes32` form some older
/// tokens use for `name()`/`symbol()`.
pub fn decode_string(data: &str) -> Result<String> {
    let stripped = strip_return(data)?;
    let bytes = hex::decode(stripped)
        .map_err(|e| Error::ContractCall(format!("invalid hex return data: {}", e)))?;

    // Legacy bytes32: exactly one word, right-padded with zeros
    if bytes.len() == 32 {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(32);
        return decode_utf8(&bytes[..end]);
    }

    if bytes.len() < 64 {
        return Err(Error::ContractCall(format!(
            "string return data too short: {} bytes",
            bytes.len()
        )));
    }

    // The offset and length words come straight from the RPC response,
    // so the additions must not be allowed to overflow
    let offset = word_to_usize(&bytes[..32])?;
    let start = offset
        .checked_add(32)
        .filter(|&start| start <= bytes.len())
        .ok_or_else(|| Error::ContractCall("string offset out of bounds".to_string()))?;

    let length = word_to_usize(&bytes[offset..start])?;
    let end = start
        .checked_add(length)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| Error::ContractCall("string length out of bounds".to_string()))?;

    decode_utf8(&bytes[start..end])
}

fn decode_utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::ContractCall(format!("string is not valid UTF-8: {}", e)))
}
