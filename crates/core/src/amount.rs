//! Serde helpers for tip amounts.
//!
//! Amounts are full `uint256` values. They are written as decimal strings so
//! that JavaScript consumers never see a lossy float. Reading also accepts a
//! `0x` hex string or a JSON number, integral floats like `1e+21` included,
//! since webhook-sourced records in existing snapshots store the amount that
//! way.

use alloy_primitives::U256;
use serde::{de, Deserialize, Deserializer, Serializer};

use crate::error::CoreError;
use crate::quantity::parse_u256;

/// Serialize a `U256` as a decimal string.
pub fn serialize<S>(amount: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(amount)
}

/// Deserialize a `U256` from a decimal string, hex string or JSON number.
pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(u64),
        Float(f64),
        Text(String),
    }

    match RawAmount::deserialize(deserializer)? {
        RawAmount::Number(n) => Ok(U256::from(n)),
        RawAmount::Float(f) => {
            if !f.is_finite() || f < 0.0 || f.fract() != 0.0 {
                return Err(de::Error::custom(CoreError::InvalidAmount(f.to_string())));
            }
            let digits = format!("{:.0}", f);
            parse_u256(&digits).map_err(|_| de::Error::custom(CoreError::InvalidAmount(digits)))
        }
        RawAmount::Text(s) => parse_u256(&s)
            .map_err(|_| de::Error::custom(CoreError::InvalidAmount(s))),
    }
}
