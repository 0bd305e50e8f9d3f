//! Escrow immutables and the timelock schedule.
//!
//! Timelock offsets are seconds relative to the escrow's deployment time.
//! Each escrow side has its own stage list; every transition is valid only
//! inside one half-open window `[start, end)` of that schedule.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::{Asset, ensure_non_negative};
use crate::error::{CrossfillError, Result};
use crate::ids::{Address, Hash32};

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Which leg of the swap an escrow secures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Holds the maker's asset on the source chain.
    Src,
    /// Holds the taker's asset on the destination chain.
    Dst,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Src => write!(f, "src"),
            Self::Dst => write!(f, "dst"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// A state-changing operation on an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    PrivateWithdraw,
    PublicWithdraw,
    PrivateCancel,
    PublicCancel,
    Rescue,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateWithdraw => write!(f, "private withdraw"),
            Self::PublicWithdraw => write!(f, "public withdraw"),
            Self::PrivateCancel => write!(f, "private cancel"),
            Self::PublicCancel => write!(f, "public cancel"),
            Self::Rescue => write!(f, "rescue"),
        }
    }
}

/// Half-open time window in seconds since deployment. `end == None` means
/// the window never closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: u32,
    pub end: Option<u32>,
}

impl Window {
    #[must_use]
    pub fn contains(&self, elapsed: i64) -> bool {
        elapsed >= i64::from(self.start) && self.end.is_none_or(|end| elapsed < i64::from(end))
    }
}

// ---------------------------------------------------------------------------
// Timelocks
// ---------------------------------------------------------------------------

/// Source-side schedule: withdraw < public withdraw < cancel < public cancel,
/// and rescue opens after public cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrcTimelocks {
    pub withdraw: u32,
    pub public_withdraw: u32,
    pub cancel: u32,
    pub public_cancel: u32,
    pub rescue_start: u32,
}

/// Destination-side schedule: withdraw < public withdraw < cancel, and rescue
/// opens after cancel. There is no public cancel on the destination side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DstTimelocks {
    pub withdraw: u32,
    pub public_withdraw: u32,
    pub cancel: u32,
    pub rescue_start: u32,
}

/// Timelock schedule tagged by escrow side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timelocks {
    Src(SrcTimelocks),
    Dst(DstTimelocks),
}

impl Timelocks {
    #[must_use]
    pub fn side(&self) -> Side {
        match self {
            Self::Src(_) => Side::Src,
            Self::Dst(_) => Side::Dst,
        }
    }

    /// Stage offsets in the order they must occur.
    fn stages(&self) -> Vec<(&'static str, u32)> {
        match self {
            Self::Src(t) => vec![
                ("withdraw", t.withdraw),
                ("public_withdraw", t.public_withdraw),
                ("cancel", t.cancel),
                ("public_cancel", t.public_cancel),
                ("rescue_start", t.rescue_start),
            ],
            Self::Dst(t) => vec![
                ("withdraw", t.withdraw),
                ("public_withdraw", t.public_withdraw),
                ("cancel", t.cancel),
                ("rescue_start", t.rescue_start),
            ],
        }
    }

    /// Every stage must start strictly after the previous one.
    pub fn validate(&self) -> Result<()> {
        for pair in self.stages().windows(2) {
            let (prev_name, prev) = pair[0];
            let (name, at) = pair[1];
            if at <= prev {
                return Err(CrossfillError::InvalidTimelocks {
                    reason: format!("{name} ({at}s) must come after {prev_name} ({prev}s)"),
                });
            }
        }
        Ok(())
    }

    /// Window during which `transition` is legal, or `None` when this side
    /// has no such transition.
    #[must_use]
    pub fn window(&self, transition: Transition) -> Option<Window> {
        let w = |start, end| Some(Window { start, end });
        match (self, transition) {
            (Self::Src(t), Transition::PrivateWithdraw) => w(t.withdraw, Some(t.public_withdraw)),
            (Self::Src(t), Transition::PublicWithdraw) => w(t.public_withdraw, Some(t.cancel)),
            (Self::Src(t), Transition::PrivateCancel) => w(t.cancel, Some(t.public_cancel)),
            (Self::Src(t), Transition::PublicCancel) => w(t.public_cancel, None),
            (Self::Src(t), Transition::Rescue) => w(t.rescue_start, None),
            (Self::Dst(t), Transition::PrivateWithdraw) => w(t.withdraw, Some(t.public_withdraw)),
            (Self::Dst(t), Transition::PublicWithdraw) => w(t.public_withdraw, Some(t.cancel)),
            (Self::Dst(t), Transition::PrivateCancel) => w(t.cancel, None),
            (Self::Dst(_), Transition::PublicCancel) => None,
            (Self::Dst(t), Transition::Rescue) => w(t.rescue_start, None),
        }
    }

    /// Fails with `InvalidWindow` unless `transition` is legal `elapsed`
    /// seconds after deployment.
    pub fn check(&self, transition: Transition, elapsed: i64) -> Result<()> {
        match self.window(transition) {
            Some(window) if window.contains(elapsed) => Ok(()),
            _ => Err(CrossfillError::InvalidWindow {
                transition,
                elapsed,
            }),
        }
    }

    pub(crate) fn write_canonical(&self, out: &mut Vec<u8>) {
        out.push(match self.side() {
            Side::Src => 0,
            Side::Dst => 1,
        });
        for (_, at) in self.stages() {
            out.extend_from_slice(&at.to_be_bytes());
        }
    }
}

// ---------------------------------------------------------------------------
// EscrowImmutables
// ---------------------------------------------------------------------------

/// Parameters fixed at escrow creation. Together with the factory and the
/// rescuer they determine the escrow's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowImmutables {
    pub order_hash: Hash32,
    pub hashlock: Hash32,
    pub maker: Address,
    pub taker: Address,
    pub asset: Asset,
    pub amount: Decimal,
    /// Native incentive paid to whoever completes a withdraw or cancel.
    pub safety_deposit: Decimal,
    pub timelocks: Timelocks,
}

impl EscrowImmutables {
    #[must_use]
    pub fn side(&self) -> Side {
        self.timelocks.side()
    }

    pub fn validate(&self) -> Result<()> {
        if self.maker == self.taker {
            return Err(CrossfillError::SelfSwap);
        }
        ensure_non_negative(self.amount)?;
        ensure_non_negative(self.safety_deposit)?;
        self.timelocks.validate()
    }

    /// Canonical byte encoding. Decimals are normalized so `1.50` and `1.5`
    /// describe the same escrow.
    pub(crate) fn write_canonical(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.order_hash.as_bytes());
        out.extend_from_slice(self.hashlock.as_bytes());
        out.extend_from_slice(self.maker.as_bytes());
        out.extend_from_slice(self.taker.as_bytes());
        self.asset.write_canonical(out);
        write_decimal(out, self.amount);
        write_decimal(out, self.safety_deposit);
        self.timelocks.write_canonical(out);
    }
}

pub(crate) fn write_decimal(out: &mut Vec<u8>, value: Decimal) {
    let s = value.normalize().to_string();
    out.extend_from_slice(&u16::try_from(s.len()).unwrap_or(u16::MAX).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

// ---------------------------------------------------------------------------
// EscrowStatus
// ---------------------------------------------------------------------------

/// Lifecycle of an escrow. `Withdrawn` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowStatus {
    Active,
    Withdrawn,
    Cancelled,
}

impl EscrowStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Withdrawn => write!(f, "WITHDRAWN"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Reference to one Merkle-validated part of a partially fillable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FillRef {
    pub order_hash: Hash32,
    pub index: u64,
}
