//! Calldata for the reward contract.
//!
//! ```text
//! merkleRoot() view returns (bytes32)
//! withdrawn(address) view returns (uint256)
//! claim(address account, uint256 totalAmount, bytes32[] proof)
//! ```

use rewardcraft_core::{Address, Amount, Hash, Result, RewardsError};
use rewardcraft_merkle::keccak256;

pub const MERKLE_ROOT_SIG: &str = "merkleRoot()";
pub const WITHDRAWN_SIG: &str = "withdrawn(address)";
pub const CLAIM_SIG: &str = "claim(address,uint256,bytes32[])";

/// First 4 bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(&[signature.as_bytes()]);
    [hash[0], hash[1], hash[2], hash[3]]
}

fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}

fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn merkle_root_call() -> Vec<u8> {
    selector(MERKLE_ROOT_SIG).to_vec()
}

pub fn withdrawn_call(account: &Address) -> Vec<u8> {
    let mut data = selector(WITHDRAWN_SIG).to_vec();
    data.extend_from_slice(&address_word(account));
    data
}

/// Encode `claim(account, totalAmount, proof)`.
///
/// Head: account, amount, offset of the dynamic array (3 words = 0x60).
/// Tail: array length followed by the siblings in delivered order.
pub fn claim_call(account: &Address, cumulative_amount: Amount, proof: &[Hash]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 * (4 + proof.len()));
    data.extend_from_slice(&selector(CLAIM_SIG));
    data.extend_from_slice(&address_word(account));
    data.extend_from_slice(&uint_word(cumulative_amount));
    data.extend_from_slice(&uint_word(0x60));
    data.extend_from_slice(&uint_word(proof.len() as u128));
    for sibling in proof {
        data.extend_from_slice(sibling);
    }
    data
}

/// Decode a single `bytes32` return value.
pub fn decode_hash(ret: &[u8]) -> Result<Hash> {
    if ret.len() < 32 {
        return Err(RewardsError::DataUnavailable(format!(
            "expected 32-byte return value, got {} bytes",
            ret.len()
        )));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&ret[..32]);
    Ok(out)
}

/// Decode a single `uint256` return value that must fit in 128 bits.
pub fn decode_amount(ret: &[u8]) -> Result<Amount> {
    let word = decode_hash(ret)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(RewardsError::DataUnavailable(
            "uint256 return value exceeds 128 bits".to_string(),
        ));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

/// Parse a JSON-RPC quantity (`"0x89"`).
pub fn parse_quantity(s: &str) -> Result<u64> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| RewardsError::DataUnavailable(format!("quantity {s:?} lacks 0x prefix")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| RewardsError::DataUnavailable(format!("invalid quantity {s:?}: {e}")))
}

/// Parse JSON-RPC `DATA` (`"0x…"`).
pub fn parse_data(s: &str) -> Result<Vec<u8>> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| RewardsError::DataUnavailable(format!("invalid data {s:?}: {e}")))
}

pub fn to_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
