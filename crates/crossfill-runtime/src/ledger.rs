//! Per-(address, asset) balances held by the substrate.
//!
//! Principals and actors share one address space, so an escrow's funds and
//! a wallet's funds live in the same table.

use std::collections::{BTreeMap, HashMap};

use crossfill_types::{Address, Asset, CrossfillError, Effect, Result, checked_sum, ensure_non_negative};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    balances: BTreeMap<(Address, Asset), Decimal>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn balance(&self, owner: Address, asset: &Asset) -> Decimal {
        self.balances
            .get(&(owner, *asset))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Every non-zero balance of `owner`.
    #[must_use]
    pub fn balances_of(&self, owner: Address) -> HashMap<Asset, Decimal> {
        self.balances
            .range((owner, Asset::Native)..)
            .take_while(|((addr, _), _)| *addr == owner)
            .filter(|(_, amount)| !amount.is_zero())
            .map(|((_, asset), amount)| (*asset, *amount))
            .collect()
    }

    pub fn credit(&mut self, owner: Address, asset: Asset, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        if amount.is_zero() {
            return Ok(());
        }
        let held = self.balances.entry((owner, asset)).or_insert(Decimal::ZERO);
        *held = checked_sum(*held, amount)?;
        Ok(())
    }

    pub fn debit(&mut self, owner: Address, asset: Asset, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        if amount.is_zero() {
            return Ok(());
        }
        let available = self.balance(owner, &asset);
        if available < amount {
            return Err(CrossfillError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        let remaining = available - amount;
        if remaining.is_zero() {
            self.balances.remove(&(owner, asset));
        } else {
            self.balances.insert((owner, asset), remaining);
        }
        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, asset: Asset, amount: Decimal) -> Result<()> {
        self.debit(from, asset, amount)?;
        self.credit(to, asset, amount)
    }

    /// Reject a batch of effects `owner` cannot pay for as a whole.
    pub fn check_outflows(&self, owner: Address, effects: &[Effect]) -> Result<()> {
        let mut totals: BTreeMap<Asset, Decimal> = BTreeMap::new();
        for (asset, amount) in effects.iter().flat_map(Effect::outflows) {
            ensure_non_negative(amount)?;
            let total = totals.entry(asset).or_insert(Decimal::ZERO);
            *total = checked_sum(*total, amount)?;
        }
        for (asset, needed) in totals {
            let available = self.balance(owner, &asset);
            if needed > available {
                return Err(CrossfillError::InsufficientBalance { needed, available });
            }
        }
        Ok(())
    }

    /// Sum of every balance in `asset`.
    #[must_use]
    pub fn total(&self, asset: &Asset) -> Decimal {
        self.balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, amount)| *amount)
            .sum()
    }
}
