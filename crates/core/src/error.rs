//! Error types for the core crate.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A quantity string was neither decimal nor `0x` hex.
    #[error("Invalid quantity: {0:?}")]
    InvalidQuantity(String),

    /// A quantity does not fit the target integer width.
    #[error("Quantity for {field} does not fit in u64: {value}")]
    QuantityOverflow {
        /// Field being coerced.
        field: &'static str,
        /// Decimal rendering of the rejected value.
        value: String,
    },

    /// A tip amount could not be parsed.
    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),

    /// A stored entity carries another variant's `__typename`.
    #[error("Expected a {expected} entity, found {found}")]
    EntityMismatch {
        /// Typename of the target variant.
        expected: &'static str,
        /// Typename found in the payload.
        found: String,
    },

    /// A stored entity has neither `txnHash` nor `id`.
    #[error("Entity has no transaction hash")]
    MissingTxnHash,
}

/// Result type alias for CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
