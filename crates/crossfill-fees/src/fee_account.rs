//! Per-principal fee account.
//!
//! Holds the principal's deposit balance (as real value on the substrate)
//! and its credit allowance. Deposit-side messages are accepted only from
//! the owning fee bank and credit-side messages only from the charger; the
//! account re-checks this on every message.
//!
//! Invariants: `deposited >= 0` and `credit >= 0` after every message.
//! Withdrawals are checked against `deposited` alone. Every mutating
//! message is recorded in a [`DeliveryGuard`], so a redelivered one is
//! refused instead of applied twice.

use crossfill_types::{
    Actor, Address, Context, CrossfillError, Envelope, FeeAccountInit, Message, QueryContext,
    Result, checked_sum, ensure_non_negative,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::idempotency::DeliveryGuard;
use crate::{attachment, require_sender};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAccount {
    init: FeeAccountInit,
    deposited: Decimal,
    credit: Decimal,
    deliveries: DeliveryGuard,
}

impl FeeAccount {
    #[must_use]
    pub fn new(init: FeeAccountInit) -> Self {
        Self {
            init,
            deposited: Decimal::ZERO,
            credit: Decimal::ZERO,
            deliveries: DeliveryGuard::default(),
        }
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.init.owner
    }

    #[must_use]
    pub fn deposited(&self) -> Decimal {
        self.deposited
    }

    #[must_use]
    pub fn credit(&self) -> Decimal {
        self.credit
    }

    fn from_bank(&self, env: &Envelope) -> Result<()> {
        require_sender(env.from, self.init.bank, "fee bank")
    }

    fn from_charger(&self, env: &Envelope) -> Result<()> {
        require_sender(env.from, self.init.charger, "fee bank charger")
    }

    // -----------------------------------------------------------------------
    // Deposit side (fee bank)
    // -----------------------------------------------------------------------

    fn deposit(&mut self, env: &Envelope, ctx: &mut Context, amount: Decimal) -> Result<()> {
        self.from_bank(env)?;
        self.deliveries.check_and_record(env)?;
        ensure_non_negative(amount)?;
        let attached = env.attached(&self.init.asset);
        if attached < amount {
            return Err(CrossfillError::InsufficientValue {
                needed: amount,
                attached,
            });
        }
        self.deposited = checked_sum(self.deposited, amount)?;
        ctx.send(
            self.init.bank,
            Message::InternalDepositSuccess {
                owner: self.init.owner,
                deposited: self.deposited,
            },
        );
        tracing::info!(
            owner = %self.init.owner,
            amount = %amount,
            deposited = %self.deposited,
            "Fee account deposit"
        );
        Ok(())
    }

    fn withdraw(&mut self, env: &Envelope, ctx: &mut Context, target: Address, amount: Decimal) -> Result<()> {
        self.from_bank(env)?;
        self.deliveries.check_and_record(env)?;
        ensure_non_negative(amount)?;
        if amount > self.deposited {
            return Err(CrossfillError::InsufficientBalance {
                needed: amount,
                available: self.deposited,
            });
        }
        self.deposited -= amount;
        ctx.pay(target, self.init.asset, amount);
        ctx.send(
            self.init.bank,
            Message::InternalWithdrawSuccess {
                owner: self.init.owner,
                amount,
                remaining: self.deposited,
            },
        );
        tracing::info!(
            owner = %self.init.owner,
            target = %target,
            amount = %amount,
            remaining = %self.deposited,
            "Fee account withdrawal"
        );
        Ok(())
    }

    fn gather(&mut self, env: &Envelope, ctx: &mut Context, credit: Decimal) -> Result<()> {
        self.from_bank(env)?;
        self.deliveries.check_and_record(env)?;
        ensure_non_negative(credit)?;
        let fee = (self.deposited - credit).max(Decimal::ZERO);
        self.deposited = self.deposited.min(credit);

        let (value, tokens) = attachment(self.init.asset, fee);
        let body = Message::InternalFeeCollected {
            owner: self.init.owner,
            fee,
        };
        match tokens {
            Some(tokens) => ctx.send_tokens(self.init.bank, value, tokens, body),
            None => ctx.send_value(self.init.bank, value, body),
        }
        tracing::info!(
            owner = %self.init.owner,
            fee = %fee,
            deposited = %self.deposited,
            "Fees gathered from account"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Credit side (charger)
    // -----------------------------------------------------------------------

    fn increase_credit(&mut self, env: &Envelope, ctx: &mut Context, amount: Decimal) -> Result<()> {
        self.from_charger(env)?;
        self.deliveries.check_and_record(env)?;
        ensure_non_negative(amount)?;
        self.credit = checked_sum(self.credit, amount)?;
        ctx.send(
            self.init.charger,
            Message::InternalCreditIncreased {
                owner: self.init.owner,
                total: self.credit,
            },
        );
        tracing::debug!(owner = %self.init.owner, amount = %amount, credit = %self.credit, "Credit increased");
        Ok(())
    }

    fn decrease_credit(&mut self, env: &Envelope, ctx: &mut Context, amount: Decimal, clamp: bool) -> Result<()> {
        self.from_charger(env)?;
        self.deliveries.check_and_record(env)?;
        ensure_non_negative(amount)?;
        if amount > self.credit && !clamp {
            return Err(CrossfillError::InsufficientCredit {
                needed: amount,
                available: self.credit,
            });
        }
        self.credit = (self.credit - amount).max(Decimal::ZERO);
        ctx.send(
            self.init.charger,
            Message::InternalCreditDecreased {
                owner: self.init.owner,
                total: self.credit,
            },
        );
        tracing::debug!(owner = %self.init.owner, amount = %amount, credit = %self.credit, clamp, "Credit decreased");
        Ok(())
    }

    fn charge_fee(&mut self, env: &Envelope, ctx: &mut Context, fee: Decimal) -> Result<()> {
        self.from_charger(env)?;
        self.deliveries.check_and_record(env)?;
        ensure_non_negative(fee)?;
        if fee > self.credit {
            return Err(CrossfillError::InsufficientCredit {
                needed: fee,
                available: self.credit,
            });
        }
        self.credit -= fee;
        ctx.send(
            self.init.charger,
            Message::InternalFeeCharged {
                owner: self.init.owner,
                remaining: self.credit,
            },
        );
        tracing::info!(owner = %self.init.owner, fee = %fee, credit = %self.credit, "Fee charged");
        Ok(())
    }

    fn credit_query(
        &self,
        env: &Envelope,
        ctx: &mut Context,
        respond_to: Option<Address>,
        reply_to: Address,
        context: QueryContext,
    ) -> Result<()> {
        self.from_charger(env)?;
        ctx.send(
            respond_to.unwrap_or(env.from),
            Message::InternalCreditResponse {
                owner: self.init.owner,
                credit: self.credit,
                reply_to,
                context,
            },
        );
        Ok(())
    }
}

impl Actor for FeeAccount {
    fn kind(&self) -> &'static str {
        "fee account"
    }

    fn handle(&mut self, env: &Envelope, ctx: &mut Context) -> Result<()> {
        match &env.body {
            Message::InternalDeposit { amount } => self.deposit(env, ctx, *amount),
            Message::InternalWithdraw { target, amount } => self.withdraw(env, ctx, *target, *amount),
            Message::InternalGatherFee { credit } => self.gather(env, ctx, *credit),
            Message::InternalIncreaseCredit { amount } => self.increase_credit(env, ctx, *amount),
            Message::InternalDecreaseCredit { amount, clamp } => {
                self.decrease_credit(env, ctx, *amount, *clamp)
            }
            Message::InternalChargeFee { fee } => self.charge_fee(env, ctx, *fee),
            Message::InternalCreditQuery {
                respond_to,
                reply_to,
                context,
            } => self.credit_query(env, ctx, *respond_to, *reply_to, *context),
            other => Err(CrossfillError::UnexpectedMessage {
                actor: self.kind(),
                message: other.name(),
            }),
        }
    }
}
