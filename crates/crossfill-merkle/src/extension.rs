//! Byte layouts carried by a taker interaction.
//!
//! Extension (148 bytes):
//!
//! ```text
//! hashlock_info[32] | dst_chain_id[32] | dst_token[20] | deposits[32] | timelocks[32]
//! ```
//!
//! For a multi-fill order `hashlock_info` packs `parts_count` into its top
//! 16 bits and the shortened Merkle root into the low 240 bits.
//!
//! Taker data:
//!
//! ```text
//! index: u64 BE | secret_hash[32] | proof_len: u16 BE | proof_len x node[32]
//! ```

use crossfill_types::constants::{EXTENSION_LEN, MAX_PROOF_DEPTH};
use crossfill_types::{CrossfillError, Hash32, Result};

use crate::proof::shorten;

fn malformed(reason: impl Into<String>) -> CrossfillError {
    CrossfillError::Malformed {
        reason: reason.into(),
    }
}

/// Reads fixed-size fields off the front of a byte slice.
struct Reader<'a> {
    buf: &'a [u8],
    what: &'static str,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8], what: &'static str) -> Self {
        Self { buf, what }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() < n {
            return Err(malformed(format!("{} truncated", self.what)));
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn finish(self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(malformed(format!(
                "{} has {} trailing bytes",
                self.what,
                self.buf.len()
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Hashlock info
// ---------------------------------------------------------------------------

/// Merkle commitment of a multi-fill order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashlockInfo {
    pub parts_count: u16,
    /// Root with the top 16 bits cleared.
    pub shortened_root: Hash32,
}

impl HashlockInfo {
    /// Commitment for a full tree `root` split into `parts_count` parts.
    #[must_use]
    pub fn new(root: &Hash32, parts_count: u16) -> Self {
        Self {
            parts_count,
            shortened_root: shorten(root),
        }
    }

    #[must_use]
    pub fn from_word(word: &Hash32) -> Self {
        Self {
            parts_count: u16::from_be_bytes([word.0[0], word.0[1]]),
            shortened_root: shorten(word),
        }
    }

    #[must_use]
    pub fn to_word(&self) -> Hash32 {
        let mut word = self.shortened_root.0;
        word[..2].copy_from_slice(&self.parts_count.to_be_bytes());
        Hash32(word)
    }
}

// ---------------------------------------------------------------------------
// Extension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extension {
    pub hashlock_info: Hash32,
    pub dst_chain_id: [u8; 32],
    pub dst_token: [u8; 20],
    pub deposits: [u8; 32],
    pub timelocks: [u8; 32],
}

impl Extension {
    /// Extension carrying only a Merkle commitment; other fields zeroed.
    #[must_use]
    pub fn with_commitment(info: HashlockInfo) -> Self {
        Self {
            hashlock_info: info.to_word(),
            dst_chain_id: [0; 32],
            dst_token: [0; 20],
            deposits: [0; 32],
            timelocks: [0; 32],
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != EXTENSION_LEN {
            return Err(malformed(format!(
                "extension must be {EXTENSION_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut r = Reader::new(bytes, "extension");
        let ext = Self {
            hashlock_info: Hash32(r.array()?),
            dst_chain_id: r.array()?,
            dst_token: r.array()?,
            deposits: r.array()?,
            timelocks: r.array()?,
        };
        r.finish()?;
        Ok(ext)
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(EXTENSION_LEN);
        out.extend_from_slice(self.hashlock_info.as_bytes());
        out.extend_from_slice(&self.dst_chain_id);
        out.extend_from_slice(&self.dst_token);
        out.extend_from_slice(&self.deposits);
        out.extend_from_slice(&self.timelocks);
        out
    }

    #[must_use]
    pub fn commitment(&self) -> HashlockInfo {
        HashlockInfo::from_word(&self.hashlock_info)
    }
}

// ---------------------------------------------------------------------------
// Taker data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TakerData {
    pub index: u64,
    pub secret_hash: Hash32,
    pub proof: Vec<Hash32>,
}

impl TakerData {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes, "taker data");
        let index = u64::from_be_bytes(r.array()?);
        let secret_hash = Hash32(r.array()?);
        let proof_len = usize::from(u16::from_be_bytes(r.array()?));
        if proof_len > MAX_PROOF_DEPTH {
            return Err(malformed(format!(
                "proof of {proof_len} nodes exceeds depth {MAX_PROOF_DEPTH}"
            )));
        }
        let mut proof = Vec::with_capacity(proof_len);
        for _ in 0..proof_len {
            proof.push(Hash32(r.array()?));
        }
        r.finish()?;
        Ok(Self {
            index,
            secret_hash,
            proof,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let proof_len = u16::try_from(self.proof.len())
            .ok()
            .filter(|&n| usize::from(n) <= MAX_PROOF_DEPTH)
            .ok_or_else(|| malformed(format!("proof of {} nodes is too deep", self.proof.len())))?;
        let mut out = Vec::with_capacity(42 + 32 * self.proof.len());
        out.extend_from_slice(&self.index.to_be_bytes());
        out.extend_from_slice(self.secret_hash.as_bytes());
        out.extend_from_slice(&proof_len.to_be_bytes());
        for node in &self.proof {
            out.extend_from_slice(node.as_bytes());
        }
        Ok(out)
    }
}
