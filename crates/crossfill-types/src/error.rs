//! Error types for the crossfill settlement engine.
//!
//! All errors use the `XF_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Escrow errors
//! - 2xx: Fee-credit errors
//! - 3xx: Merkle / partial-fill errors
//! - 4xx: Messaging and authorization errors
//! - 9xx: General / internal errors
//!
//! Callers that only care about the class of failure use [`ErrorKind`].

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Address, Asset, EscrowStatus, Hash32, MessageId, Transition};

/// Central error enum for all crossfill operations.
#[derive(Debug, Error)]
pub enum CrossfillError {
    // =================================================================
    // Escrow Errors (1xx)
    // =================================================================
    /// Timelock offsets are not strictly increasing in stage order.
    #[error("XF_ERR_100: Invalid timelocks: {reason}")]
    InvalidTimelocks { reason: String },

    /// The transition was attempted outside its time window.
    #[error("XF_ERR_101: {transition} not allowed at +{elapsed}s")]
    InvalidWindow { transition: Transition, elapsed: i64 },

    /// The presented secret does not hash to the escrow's hashlock.
    #[error("XF_ERR_102: Secret does not match hashlock")]
    HashMismatch,

    /// The presented secret is empty or longer than the protocol maximum.
    #[error("XF_ERR_103: Malformed secret of {len} bytes")]
    MalformedSecret { len: usize },

    /// The escrow already reached a terminal state.
    #[error("XF_ERR_104: Escrow is {status}")]
    EscrowFinalized { status: EscrowStatus },

    /// Maker and taker are the same principal.
    #[error("XF_ERR_105: Maker and taker must differ")]
    SelfSwap,

    /// The message did not carry enough value to fund the operation.
    #[error("XF_ERR_106: Insufficient attached value: need {needed}, got {attached}")]
    InsufficientValue { needed: Decimal, attached: Decimal },

    /// A source escrow referenced a fill the invalidator never validated.
    #[error("XF_ERR_107: Unknown fill {index} for order {order_hash}")]
    UnknownFill { order_hash: Hash32, index: u64 },

    // =================================================================
    // Fee-Credit Errors (2xx)
    // =================================================================
    /// Not enough deposited balance to perform the operation.
    #[error("XF_ERR_200: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    /// Not enough fee credit to cover the charge or decrease.
    #[error("XF_ERR_201: Insufficient credit: need {needed}, have {available}")]
    InsufficientCredit { needed: Decimal, available: Decimal },

    /// A deposit below the configured minimum.
    #[error("XF_ERR_202: Deposit {attached} below minimum {min}")]
    DepositTooSmall { min: Decimal, attached: Decimal },

    /// The deposit path does not match the bank's configured asset.
    #[error("XF_ERR_203: Misconfigured asset: bank holds {expected}, got {got}")]
    MisconfiguredAsset { expected: Asset, got: String },

    /// A negative amount was supplied.
    #[error("XF_ERR_204: Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// The same message was already processed (idempotency guard).
    #[error("XF_ERR_205: Duplicate delivery of {message} {id}")]
    DuplicateDelivery { message: &'static str, id: MessageId },

    /// Amount arithmetic left the representable range.
    #[error("XF_ERR_206: Amount overflow computing {lhs} {op} {rhs}")]
    AmountOverflow {
        op: &'static str,
        lhs: Decimal,
        rhs: Decimal,
    },

    // =================================================================
    // Merkle Errors (3xx)
    // =================================================================
    /// The inclusion proof or commitment check failed.
    #[error("XF_ERR_300: Invalid proof: {reason}")]
    InvalidProof { reason: String },

    /// The fill index was already consumed for this order.
    #[error("XF_ERR_301: Index {index} already used for order {order_hash}")]
    ReplayedIndex { order_hash: Hash32, index: u64 },

    // =================================================================
    // Messaging Errors (4xx)
    // =================================================================
    /// The sender is not allowed to send this message.
    #[error("XF_ERR_400: Unauthorized: {sender} is not the {role}")]
    Unauthorized { role: &'static str, sender: Address },

    /// A message was addressed to an actor that does not exist.
    #[error("XF_ERR_401: No actor deployed at {0}")]
    NotDeployed(Address),

    /// Init data attached to a message does not derive the target address.
    #[error("XF_ERR_402: Init data derives {derived}, message addressed to {to}")]
    InitMismatch { to: Address, derived: Address },

    /// The actor does not handle this message.
    #[error("XF_ERR_403: {actor} does not accept {message}")]
    UnexpectedMessage {
        actor: &'static str,
        message: &'static str,
    },

    /// A payload failed to decode.
    #[error("XF_ERR_404: Malformed payload: {reason}")]
    Malformed { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("XF_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("XF_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("XF_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// Supply conservation invariant violated.
    #[error("XF_ERR_903: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, CrossfillError>;

impl From<serde_json::Error> for CrossfillError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Coarse failure class, stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Unauthorized,
    InvalidWindow,
    HashMismatch,
    InsufficientBalance,
    InvalidProof,
    ReplayedIndex,
    MisconfiguredAsset,
    Finalized,
    DuplicateDelivery,
    NotDeployed,
    Malformed,
    Internal,
}

impl ErrorKind {
    /// Only timing failures can succeed on a later attempt; everything else
    /// fails the same way however often it is retried.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::InvalidWindow)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl CrossfillError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidWindow { .. } => ErrorKind::InvalidWindow,
            Self::HashMismatch => ErrorKind::HashMismatch,
            Self::EscrowFinalized { .. } => ErrorKind::Finalized,
            Self::InsufficientValue { .. }
            | Self::InsufficientBalance { .. }
            | Self::InsufficientCredit { .. }
            | Self::DepositTooSmall { .. } => ErrorKind::InsufficientBalance,
            Self::UnknownFill { .. } | Self::InvalidProof { .. } => ErrorKind::InvalidProof,
            Self::MisconfiguredAsset { .. } => ErrorKind::MisconfiguredAsset,
            Self::DuplicateDelivery { .. } => ErrorKind::DuplicateDelivery,
            Self::ReplayedIndex { .. } => ErrorKind::ReplayedIndex,
            Self::Unauthorized { .. } | Self::InitMismatch { .. } => ErrorKind::Unauthorized,
            Self::NotDeployed(_) => ErrorKind::NotDeployed,
            Self::InvalidTimelocks { .. }
            | Self::MalformedSecret { .. }
            | Self::SelfSwap
            | Self::InvalidAmount(_)
            | Self::AmountOverflow { .. }
            | Self::UnexpectedMessage { .. }
            | Self::Malformed { .. } => ErrorKind::Malformed,
            Self::Internal(_)
            | Self::Serialization(_)
            | Self::Configuration(_)
            | Self::SupplyInvariantViolation { .. } => ErrorKind::Internal,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
