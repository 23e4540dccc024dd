//! Hex and amount encoding for root documents.
//!
//! Hashes and addresses travel as `0x`-prefixed hex (any case). Amounts
//! travel as decimal strings, `0x` hex strings or plain JSON numbers, and
//! are always written back as decimal strings so `uint256`-sized values
//! survive JavaScript tooling.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::Deserialize;

use crate::{Address, Amount, Hash, LeafEntry, Result, RewardsError};

/// Encode a 32-byte hash as lowercase `0x` hex.
pub fn encode_hash(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}

/// Encode a 20-byte address as lowercase `0x` hex.
pub fn encode_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

fn strip_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn decode_fixed<const N: usize>(s: &str, what: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(strip_prefix(s.trim()))
        .map_err(|e| RewardsError::InvalidInput(format!("invalid {what} {s:?}: {e}")))?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        RewardsError::InvalidInput(format!("{what} must be {N} bytes, got {len}"))
    })
}

/// Parse a `0x` hex hash.
pub fn parse_hash(s: &str) -> Result<Hash> {
    decode_fixed::<32>(s, "hash")
}

/// Parse a `0x` hex address. Case is ignored (checksummed input is accepted).
pub fn parse_address(s: &str) -> Result<Address> {
    decode_fixed::<20>(s, "address")
}

/// Parse a token amount from a decimal or `0x` hex string.
pub fn parse_amount(s: &str) -> Result<Amount> {
    let s = s.trim();
    let parsed = if s.starts_with("0x") || s.starts_with("0X") {
        Amount::from_str_radix(strip_prefix(s), 16)
    } else {
        s.parse::<Amount>()
    };
    parsed.map_err(|e| RewardsError::InvalidInput(format!("invalid amount {s:?}: {e}")))
}

pub mod serde_hash {
    use super::*;

    pub fn serialize<S: Serializer>(hash: &Hash, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&encode_hash(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Hash, D::Error> {
        let s = String::deserialize(d)?;
        parse_hash(&s).map_err(de::Error::custom)
    }
}

pub mod serde_option_hash {
    use super::*;

    pub fn serialize<S: Serializer>(
        hash: &Option<Hash>,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match hash {
            Some(h) => s.serialize_some(&encode_hash(h)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Option<Hash>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| parse_hash(&s).map_err(de::Error::custom))
            .transpose()
    }
}

pub mod serde_hash_vec {
    use super::*;

    pub fn serialize<S: Serializer>(
        hashes: &[Hash],
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        s.collect_seq(hashes.iter().map(encode_hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Vec<Hash>, D::Error> {
        Vec::<String>::deserialize(d)?
            .iter()
            .map(|s| parse_hash(s).map_err(de::Error::custom))
            .collect()
    }
}

pub mod serde_address {
    use super::*;

    pub fn serialize<S: Serializer>(
        address: &Address,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&encode_address(address))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Address, D::Error> {
        let s = String::deserialize(d)?;
        parse_address(&s).map_err(de::Error::custom)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(u64),
}

pub mod serde_amount {
    use super::*;

    pub fn serialize<S: Serializer>(amount: &Amount, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Amount, D::Error> {
        match RawAmount::deserialize(d)? {
            RawAmount::Text(s) => parse_amount(&s).map_err(de::Error::custom),
            RawAmount::Number(n) => Ok(Amount::from(n)),
        }
    }
}

/// Leaf table keyed by claimant address.
///
/// Every key must name the same address as its entry; two keys that
/// differ only by case are a duplicate and rejected.
pub mod serde_leaves {
    use super::*;

    pub fn serialize<S: Serializer>(
        leaves: &BTreeMap<Address, LeafEntry>,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(leaves.len()))?;
        for (address, leaf) in leaves {
            map.serialize_entry(&encode_address(address), leaf)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<BTreeMap<Address, LeafEntry>, D::Error> {
        let raw = BTreeMap::<String, LeafEntry>::deserialize(d)?;
        let mut leaves = BTreeMap::new();
        for (key, leaf) in raw {
            let address = parse_address(&key).map_err(de::Error::custom)?;
            if address != leaf.address {
                return Err(de::Error::custom(format!(
                    "leaf key {key} does not match entry address {}",
                    encode_address(&leaf.address)
                )));
            }
            if leaves.insert(address, leaf).is_some() {
                return Err(de::Error::custom(format!("duplicate leaf for {key}")));
            }
        }
        Ok(leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hash_accepts_prefix_and_case() {
        let lower = format!("0x{}", "ab".repeat(32));
        let upper = format!("0X{}", "AB".repeat(32));
        assert_eq!(parse_hash(&lower).unwrap(), [0xAB; 32]);
        assert_eq!(parse_hash(&upper).unwrap(), [0xAB; 32]);
        assert_eq!(parse_hash(&"ab".repeat(32)).unwrap(), [0xAB; 32]);
    }

    #[test]
    fn test_parse_hash_wrong_length() {
        let err = parse_hash("0xabcd").unwrap_err();
        assert!(matches!(err, RewardsError::InvalidInput(_)));
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn test_parse_address_checksummed() {
        let addr = parse_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert_eq!(encode_address(&addr), "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
    }

    #[test]
    fn test_parse_amount_decimal_and_hex() {
        assert_eq!(parse_amount("1000").unwrap(), 1000);
        assert_eq!(parse_amount("0x3e8").unwrap(), 1000);
        assert_eq!(
            parse_amount("340282366920938463463374607431768211455").unwrap(),
            u128::MAX
        );
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("1.5").is_err());
        assert!(parse_amount("0x").is_err());
    }

    #[test]
    fn test_encode_hash() {
        assert_eq!(encode_hash(&[0u8; 32]), format!("0x{}", "00".repeat(32)));
    }
}
