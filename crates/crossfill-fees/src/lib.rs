//! # crossfill-fees
//!
//! The fee-credit plane of the settlement engine. Three actors cooperate
//! through asynchronous messages:
//!
//! - [`FeeBank`]: entry point for deposits, withdrawals, fee gathering and
//!   credit queries; derives one [`FeeAccount`] per principal
//! - [`FeeBankCharger`]: the only actor allowed to change a principal's
//!   credit allowance; deploys its fee bank
//! - [`FeeAccount`]: per-principal ledger of deposit balance and credit
//!   allowance, re-checking who sends it each message
//!
//! Every credit or balance mutation is guarded against redelivery by a
//! [`DeliveryGuard`].

pub mod charger;
pub mod fee_account;
pub mod fee_bank;
pub mod idempotency;

pub use charger::FeeBankCharger;
pub use fee_account::FeeAccount;
pub use fee_bank::FeeBank;
pub use idempotency::DeliveryGuard;

use crossfill_types::{Address, Asset, CrossfillError, Result, TokenAttachment};
use rust_decimal::Decimal;

/// Reject a message whose sender is not `expected`.
pub(crate) fn require_sender(sender: Address, expected: Address, role: &'static str) -> Result<()> {
    if sender == expected {
        Ok(())
    } else {
        Err(CrossfillError::Unauthorized { role, sender })
    }
}

/// Split an amount of `asset` into native value and token attachment.
pub(crate) fn attachment(asset: Asset, amount: Decimal) -> (Decimal, Option<TokenAttachment>) {
    match asset {
        Asset::Native => (amount, None),
        Asset::Token(token) => (Decimal::ZERO, Some(TokenAttachment { token, amount })),
    }
}
