//! Asset model.
//!
//! Escrowed amounts and fee-bank deposits are either the substrate's native
//! currency or a fungible token identified by its master address. Safety
//! deposits and operating reserves are always native.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CrossfillError, Result};
use crate::ids::Address;

/// An asset held on the substrate ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Asset {
    /// The substrate's native currency.
    Native,
    /// A fungible token, identified by its master contract.
    Token(Address),
}

impl Asset {
    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// Canonical encoding used inside address derivation.
    pub(crate) fn write_canonical(&self, out: &mut Vec<u8>) {
        match self {
            Self::Native => out.push(0),
            Self::Token(master) => {
                out.push(1);
                out.extend_from_slice(master.as_bytes());
            }
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Token(master) => write!(f, "token:{}", master.short()),
        }
    }
}

/// Fungible tokens attached to a message, in addition to any native value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAttachment {
    pub token: Address,
    pub amount: Decimal,
}

impl TokenAttachment {
    #[must_use]
    pub fn asset(&self) -> Asset {
        Asset::Token(self.token)
    }
}

/// Reject negative amounts. Every amount entering the system passes here.
pub fn ensure_non_negative(amount: Decimal) -> Result<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CrossfillError::InvalidAmount(amount));
    }
    Ok(amount)
}

/// `lhs + rhs`, or [`CrossfillError::AmountOverflow`] instead of a panic.
pub fn checked_sum(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_add(rhs)
        .ok_or(CrossfillError::AmountOverflow { op: "+", lhs, rhs })
}

/// `lhs * rhs`, or [`CrossfillError::AmountOverflow`] instead of a panic.
pub fn checked_product(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_mul(rhs)
        .ok_or(CrossfillError::AmountOverflow { op: "*", lhs, rhs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_and_token_encode_differently() {
        let mut a = Vec::new();
        Asset::Native.write_canonical(&mut a);
        let mut b = Vec::new();
        Asset::Token(Address::ZERO).write_canonical(&mut b);
        assert_ne!(a, b);
        assert_eq!(b.len(), 33);
    }

    #[test]
    fn negative_amount_rejected() {
        assert!(ensure_non_negative(Decimal::new(5, 1)).is_ok());
        assert!(ensure_non_negative(Decimal::ZERO).is_ok());
        let err = ensure_non_negative(Decimal::new(-1, 0)).unwrap_err();
        assert!(matches!(err, CrossfillError::InvalidAmount(_)));
    }

    #[test]
    fn asset_display() {
        assert_eq!(Asset::Native.to_string(), "native");
        assert!(Asset::Token(Address::from_label("usdc")).to_string().starts_with("token:"));
    }

    #[test]
    fn overflowing_arithmetic_is_an_error() {
        assert_eq!(checked_sum(Decimal::ONE, Decimal::TWO).unwrap(), Decimal::new(3, 0));
        let err = checked_sum(Decimal::MAX, Decimal::ONE).unwrap_err();
        assert!(matches!(err, CrossfillError::AmountOverflow { op: "+", .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Malformed);
        assert!(checked_product(Decimal::MAX, Decimal::TWO).is_err());
        assert_eq!(
            checked_product(Decimal::new(25, 0), Decimal::new(1, 2)).unwrap(),
            Decimal::new(25, 2)
        );
    }
}
