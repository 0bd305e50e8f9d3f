//! Supply conservation invariant checker.
//!
//! Value only enters the substrate through minting and never leaves it, so
//! after every delivery:
//!
//! ```text
//! for each asset: sum(ledger balances) + sum(value in flight) == sum(minted)
//! ```
//!
//! A violation means some actor or the substrate created or destroyed value.

use std::collections::BTreeMap;

use crossfill_types::{Asset, CrossfillError, Result, checked_sum, ensure_non_negative};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Default)]
pub struct SupplyConservation {
    /// Total minted per asset since genesis.
    minted: BTreeMap<Asset, Decimal>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Rejects a negative amount or one that overflows the minted total.
    pub fn record_mint(&mut self, asset: Asset, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        let minted = self.minted.entry(asset).or_insert(Decimal::ZERO);
        *minted = checked_sum(*minted, amount)?;
        Ok(())
    }

    #[must_use]
    pub fn expected_supply(&self, asset: &Asset) -> Decimal {
        self.minted.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    /// # Errors
    /// Returns [`CrossfillError::SupplyInvariantViolation`] if `actual`
    /// differs from the minted total.
    pub fn verify(&self, asset: &Asset, actual: Decimal) -> Result<()> {
        let expected = self.expected_supply(asset);
        if actual != expected {
            return Err(CrossfillError::SupplyInvariantViolation {
                reason: format!("asset {asset}: actual supply {actual} != minted {expected}"),
            });
        }
        Ok(())
    }

    pub fn tracked_assets(&self) -> impl Iterator<Item = &Asset> {
        self.minted.keys()
    }
}

#[cfg(test)]
mod tests {
    use crossfill_types::Address;

    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let sc = SupplyConservation::new();
        assert_eq!(sc.expected_supply(&Asset::Native), Decimal::ZERO);
        assert!(sc.verify(&Asset::Native, Decimal::ZERO).is_ok());
    }

    #[test]
    fn mints_accumulate_per_asset() {
        let mut sc = SupplyConservation::new();
        let usdc = Asset::Token(Address::from_label("usdc"));
        sc.record_mint(Asset::Native, Decimal::new(1000, 0)).unwrap();
        sc.record_mint(Asset::Native, Decimal::new(500, 0)).unwrap();
        sc.record_mint(usdc, Decimal::ONE).unwrap();
        assert_eq!(sc.expected_supply(&Asset::Native), Decimal::new(1500, 0));
        assert_eq!(sc.tracked_assets().count(), 2);
    }

    #[test]
    fn overflowing_mint_rejected() {
        let mut sc = SupplyConservation::new();
        sc.record_mint(Asset::Native, Decimal::MAX).unwrap();
        assert!(sc.record_mint(Asset::Native, Decimal::ONE).is_err());
        assert!(sc.record_mint(Asset::Native, Decimal::NEGATIVE_ONE).is_err());
        assert_eq!(sc.expected_supply(&Asset::Native), Decimal::MAX);
    }

    #[test]
    fn verify_fails_on_created_value() {
        let mut sc = SupplyConservation::new();
        sc.record_mint(Asset::Native, Decimal::new(10, 0)).unwrap();
        let err = sc.verify(&Asset::Native, Decimal::new(11, 0)).unwrap_err();
        assert!(matches!(err, CrossfillError::SupplyInvariantViolation { .. }));
    }
}
