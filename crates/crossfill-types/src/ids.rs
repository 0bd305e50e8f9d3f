//! Identifiers used throughout crossfill.
//!
//! Actor addresses and hashes are raw 32-byte values rendered as lowercase
//! hex on the wire. Message identifiers use UUIDv7 so that traces sort by
//! creation time.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{CrossfillError, Result};

/// Serde adapter that renders a `[u8; 32]` as a 64-character hex string.
///
/// JSON object keys must be strings, so every 32-byte identifier goes
/// through this adapter to stay usable as a map key in persisted state.
pub mod hex32 {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        super::decode_hex32(&s).map_err(de::Error::custom)
    }
}

fn decode_hex32(s: &str) -> std::result::Result<[u8; 32], String> {
    let raw = hex::decode(s).map_err(|e| format!("invalid hex: {e}"))?;
    raw.try_into()
        .map_err(|v: Vec<u8>| format!("expected 32 bytes, got {}", v.len()))
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Address of a principal or an actor on the settlement substrate.
///
/// Actor addresses are derived from their init data (see
/// [`ActorInit::address`](crate::ActorInit::address)); wallet addresses for
/// externally-owned principals are arbitrary.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(#[serde(with = "hex32")] pub [u8; 32]);

impl Address {
    pub const ZERO: Self = Self([0u8; 32]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Wallet address for a human-readable label ("alice", "resolver", ...).
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"crossfill:wallet:v1:");
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        decode_hex32(s)
            .map(Self)
            .map_err(|reason| CrossfillError::Malformed { reason })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "addr:{}", hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

// ---------------------------------------------------------------------------
// Hash32
// ---------------------------------------------------------------------------

/// A SHA-256 digest: hashlocks, order hashes, Merkle nodes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Hash32(#[serde(with = "hex32")] pub [u8; 32]);

impl Hash32 {
    pub const ZERO: Self = Self([0u8; 32]);

    /// SHA-256 of `data`.
    #[must_use]
    pub fn digest(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        decode_hex32(s)
            .map(Self)
            .map_err(|reason| CrossfillError::Malformed { reason })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", hex::encode(&self.0[..4]))
    }
}

// ---------------------------------------------------------------------------
// MessageId
// ---------------------------------------------------------------------------

/// Unique identifier of one message envelope.
///
/// Redelivery of the same envelope carries the same id, which is what the
/// idempotency guards key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg:{}", self.0)
    }
}
