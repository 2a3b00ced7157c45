//! Numeric chain quantities.
//!
//! RPC nodes and webhook providers disagree on how they render integers:
//! JSON numbers, decimal strings and `0x`-prefixed hex all show up in the wild.
//! Everything funnels through [`parse_u256`] so the rules stay in one place.

use alloy_primitives::U256;

use crate::error::{CoreError, Result};

/// Parse a decimal or `0x`-prefixed hex string into a `U256`.
///
/// Surrounding whitespace is ignored. An empty string (or a bare `0x`) is
/// rejected rather than read as zero.
pub fn parse_u256(raw: &str) -> Result<U256> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) if !hex.is_empty() => U256::from_str_radix(hex, 16),
        Some(_) => return Err(CoreError::InvalidQuantity(raw.to_string())),
        None if !trimmed.is_empty() => U256::from_str_radix(trimmed, 10),
        None => return Err(CoreError::InvalidQuantity(raw.to_string())),
    };

    parsed.map_err(|_| CoreError::InvalidQuantity(raw.to_string()))
}

/// Narrow a `U256` to `u64`, naming the field in the error.
pub fn u256_to_u64(value: U256, field: &'static str) -> Result<u64> {
    u64::try_from(value).map_err(|_| CoreError::QuantityOverflow {
        field,
        value: value.to_string(),
    })
}

/// Parse a decimal or hex string straight into a `u64`.
pub fn parse_u64(raw: &str, field: &'static str) -> Result<u64> {
    u256_to_u64(parse_u256(raw)?, field)
}

/// Serde helpers for `u64` fields written as numbers but read from either a
/// number or a decimal/hex string.
pub mod lenient_u64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize as a plain JSON number.
    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(*value)
    }

    /// Deserialize from a JSON number or a numeric string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawQuantity {
            Number(u64),
            Text(String),
        }

        match RawQuantity::deserialize(deserializer)? {
            RawQuantity::Number(n) => Ok(n),
            RawQuantity::Text(s) => super::parse_u64(&s, "quantity").map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_and_hex() {
        assert_eq!(parse_u256("1234").unwrap(), U256::from(1234u64));
        assert_eq!(parse_u256("0x4d2").unwrap(), U256::from(1234u64));
        assert_eq!(parse_u256(" 0X4D2 ").unwrap(), U256::from(1234u64));
    }

    #[test]
    fn test_parse_full_topic_word() {
        let word = "0x0000000000000000000000000000000000000000000000000000000065f1e2a0";
        assert_eq!(parse_u64(word, "time").unwrap(), 0x65f1e2a0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_u256("").is_err());
        assert!(parse_u256("0x").is_err());
        assert!(parse_u256("12ab").is_err());
        assert!(parse_u256("0xzz").is_err());
    }

    #[test]
    fn test_lenient_u64_accepts_strings() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "crate::quantity::lenient_u64")]
            at: u64,
        }

        let from_text: Wrapper = serde_json::from_str(r#"{"at":"0x10"}"#).unwrap();
        assert_eq!(from_text.at, 16);
        let from_number: Wrapper = serde_json::from_str(r#"{"at":1700000000}"#).unwrap();
        assert_eq!(serde_json::to_string(&from_number).unwrap(), r#"{"at":1700000000}"#);
        assert!(serde_json::from_str::<Wrapper>(r#"{"at":"soon"}"#).is_err());
    }

    #[test]
    fn test_u64_overflow_names_field() {
        let err = u256_to_u64(U256::MAX, "nonce").unwrap_err();
        assert!(matches!(err, CoreError::QuantityOverflow { field: "nonce", .. }));
        assert!(err.to_string().contains("nonce"));
    }
}
