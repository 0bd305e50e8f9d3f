//! HTLC escrow: one leg of a cross-party swap.
//!
//! An escrow is spawned and funded by its factory, then waits. The taker
//! claims `amount` by disclosing the secret inside the withdraw windows;
//! otherwise the maker gets it back once the cancel window opens. Whoever
//! completes either transition collects the native safety deposit. The
//! rescuer can sweep residual value after `rescue_start`.
//!
//! State changes happen only after every check has passed, and all payouts
//! are recorded on the same [`Context`], so a transition either completes
//! in full or leaves the escrow untouched.

use chrono::{DateTime, Utc};
use crossfill_types::{
    Actor, Address, Asset, Context, CrossfillError, Envelope, EscrowImmutables, EscrowInit,
    EscrowStatus, Message, Result, Side, Transition, checked_sum, ensure_non_negative,
    verify_secret,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One HTLC leg, source or destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    init: EscrowInit,
    deployed_at: DateTime<Utc>,
    status: EscrowStatus,
    funded: bool,
    /// Claimable amount of `immutables.asset`.
    locked_amount: Decimal,
    /// Claimable native incentive.
    safety_deposit: Decimal,
}

impl Escrow {
    /// A freshly deployed, not yet funded escrow. Timelock offsets count
    /// from `deployed_at`.
    #[must_use]
    pub fn new(init: EscrowInit, deployed_at: DateTime<Utc>) -> Self {
        Self {
            init,
            deployed_at,
            status: EscrowStatus::Active,
            funded: false,
            locked_amount: Decimal::ZERO,
            safety_deposit: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn immutables(&self) -> &EscrowImmutables {
        &self.init.immutables
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.init.immutables.side()
    }

    #[must_use]
    pub fn status(&self) -> EscrowStatus {
        self.status
    }

    #[must_use]
    pub fn locked_amount(&self) -> Decimal {
        self.locked_amount
    }

    #[must_use]
    pub fn safety_deposit(&self) -> Decimal {
        self.safety_deposit
    }

    #[must_use]
    pub fn deployed_at(&self) -> DateTime<Utc> {
        self.deployed_at
    }

    #[must_use]
    pub fn rescuer(&self) -> Address {
        self.init.rescuer
    }

    /// Seconds since deployment at `now`.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> i64 {
        (now - self.deployed_at).num_seconds()
    }

    /// Value of `asset` still owed to the swap parties.
    #[must_use]
    pub fn obligation(&self, asset: &Asset) -> Decimal {
        if self.status.is_terminal() {
            return Decimal::ZERO;
        }
        let mut owed = Decimal::ZERO;
        if *asset == self.init.immutables.asset {
            owed = owed.saturating_add(self.locked_amount);
        }
        if asset.is_native() {
            owed = owed.saturating_add(self.safety_deposit);
        }
        owed
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    fn fund(&mut self, env: &Envelope, ctx: &Context) -> Result<()> {
        if env.from != self.init.factory {
            return Err(CrossfillError::Unauthorized {
                role: "escrow factory",
                sender: env.from,
            });
        }
        if self.funded {
            tracing::debug!(
                escrow = %ctx.self_address(),
                value = %env.value,
                "Escrow topped up"
            );
            return Ok(());
        }

        let imm = &self.init.immutables;
        let native_needed = if imm.asset.is_native() {
            checked_sum(imm.amount, imm.safety_deposit)?
        } else {
            imm.safety_deposit
        };
        if env.value < native_needed {
            return Err(CrossfillError::InsufficientValue {
                needed: native_needed,
                attached: env.value,
            });
        }
        if !imm.asset.is_native() && env.attached(&imm.asset) < imm.amount {
            return Err(CrossfillError::InsufficientValue {
                needed: imm.amount,
                attached: env.attached(&imm.asset),
            });
        }

        self.funded = true;
        self.locked_amount = imm.amount;
        self.safety_deposit = imm.safety_deposit;
        tracing::info!(
            escrow = %ctx.self_address(),
            side = %self.side(),
            order = %imm.order_hash,
            amount = %imm.amount,
            safety_deposit = %imm.safety_deposit,
            "Escrow funded"
        );
        Ok(())
    }

    fn ensure_live(&self, ctx: &Context) -> Result<()> {
        if !self.funded {
            return Err(CrossfillError::NotDeployed(ctx.self_address()));
        }
        if self.status.is_terminal() {
            return Err(CrossfillError::EscrowFinalized {
                status: self.status,
            });
        }
        Ok(())
    }

    fn withdraw(&mut self, env: &Envelope, ctx: &mut Context, secret: &[u8], public: bool) -> Result<()> {
        self.ensure_live(ctx)?;
        let transition = if public {
            Transition::PublicWithdraw
        } else {
            if env.from != self.init.immutables.taker {
                return Err(CrossfillError::Unauthorized {
                    role: "taker",
                    sender: env.from,
                });
            }
            Transition::PrivateWithdraw
        };
        self.init
            .immutables
            .timelocks
            .check(transition, self.elapsed(ctx.now()))?;
        verify_secret(secret, &self.init.immutables.hashlock)?;

        let beneficiary = self.init.immutables.taker;
        self.settle(ctx, beneficiary, env.from, EscrowStatus::Withdrawn);
        tracing::info!(
            escrow = %ctx.self_address(),
            transition = %transition,
            beneficiary = %beneficiary,
            caller = %env.from,
            "Escrow withdrawn"
        );
        Ok(())
    }

    fn cancel(&mut self, env: &Envelope, ctx: &mut Context, public: bool) -> Result<()> {
        self.ensure_live(ctx)?;
        let transition = if public {
            Transition::PublicCancel
        } else {
            if env.from != self.init.immutables.maker {
                return Err(CrossfillError::Unauthorized {
                    role: "maker",
                    sender: env.from,
                });
            }
            Transition::PrivateCancel
        };
        self.init
            .immutables
            .timelocks
            .check(transition, self.elapsed(ctx.now()))?;

        let maker = self.init.immutables.maker;
        self.settle(ctx, maker, env.from, EscrowStatus::Cancelled);
        tracing::info!(
            escrow = %ctx.self_address(),
            transition = %transition,
            maker = %maker,
            caller = %env.from,
            "Escrow cancelled"
        );
        Ok(())
    }

    /// Pay `amount` to `recipient`, the safety deposit to `caller`, and
    /// move to the terminal `status`.
    fn settle(&mut self, ctx: &mut Context, recipient: Address, caller: Address, status: EscrowStatus) {
        ctx.pay(recipient, self.init.immutables.asset, self.locked_amount);
        ctx.pay(caller, Asset::Native, self.safety_deposit);
        self.locked_amount = Decimal::ZERO;
        self.safety_deposit = Decimal::ZERO;
        self.status = status;
    }

    fn rescue(&mut self, env: &Envelope, ctx: &mut Context, asset: Asset, amount: Option<Decimal>) -> Result<()> {
        if env.from != self.init.rescuer {
            return Err(CrossfillError::Unauthorized {
                role: "rescuer",
                sender: env.from,
            });
        }
        self.init
            .immutables
            .timelocks
            .check(Transition::Rescue, self.elapsed(ctx.now()))?;

        let excess = (ctx.balance(&asset) - self.obligation(&asset)).max(Decimal::ZERO);
        let amount = match amount {
            Some(requested) if requested > excess => {
                return Err(CrossfillError::InsufficientBalance {
                    needed: requested,
                    available: excess,
                });
            }
            Some(requested) => ensure_non_negative(requested)?,
            None => excess,
        };

        ctx.pay(self.init.rescuer, asset, amount);
        tracing::info!(
            escrow = %ctx.self_address(),
            asset = %asset,
            amount = %amount,
            status = %self.status,
            "Escrow funds rescued"
        );
        Ok(())
    }
}

impl Actor for Escrow {
    fn kind(&self) -> &'static str {
        "escrow"
    }

    fn handle(&mut self, env: &Envelope, ctx: &mut Context) -> Result<()> {
        match &env.body {
            Message::FundEscrow => self.fund(env, ctx),
            Message::WithdrawPriv { secret } => self.withdraw(env, ctx, secret, false),
            Message::WithdrawPub { secret } => self.withdraw(env, ctx, secret, true),
            Message::CancelPriv => self.cancel(env, ctx, false),
            Message::CancelPub => self.cancel(env, ctx, true),
            Message::RescueFunds { asset, amount } => self.rescue(env, ctx, *asset, *amount),
            other => Err(CrossfillError::UnexpectedMessage {
                actor: self.kind(),
                message: other.name(),
            }),
        }
    }
}
