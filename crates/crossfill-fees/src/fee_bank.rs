//! Fee bank: the public face of the fee-credit plane.
//!
//! The bank never holds principals' deposits itself. Each deposit is
//! forwarded, value attached, to the principal's [`FeeAccount`](crate::FeeAccount),
//! whose address the bank derives from `(owner, bank, charger, asset)` and
//! deploys on first use. Credit changes go through the charger.
//!
//! Every multi-step flow carries its continuation in the messages
//! themselves ([`QueryContext`]), so the bank can be restarted between a
//! request and its answer. Messages that move value or credit are recorded
//! in a [`DeliveryGuard`] and refused when redelivered.
//!
//! In linked mode a withdrawal lowers credit only once the account has
//! confirmed it, so a refused withdrawal leaves credit untouched.

use std::collections::BTreeMap;

use crossfill_types::{
    Actor, ActorInit, Address, Asset, Context, CreditLink, CrossfillError, Envelope,
    FeeAccountInit, FeeBankInit, Message, QueryContext, Result, checked_sum, ensure_non_negative,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::idempotency::DeliveryGuard;
use crate::{attachment, require_sender};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBank {
    init: FeeBankInit,
    address: Address,
    /// Factory allowed to charge fees for validated fills.
    factory: Option<Address>,
    total_fees_collected: Decimal,
    /// Accounts whose credit answer arrived and whose fee transfer has
    /// not, with the number of such gathers.
    pending_gathers: BTreeMap<Address, u32>,
    deliveries: DeliveryGuard,
}

impl FeeBank {
    #[must_use]
    pub fn new(init: FeeBankInit) -> Self {
        let address = ActorInit::FeeBank(init.clone()).address();
        Self {
            init,
            address,
            factory: None,
            total_fees_collected: Decimal::ZERO,
            pending_gathers: BTreeMap::new(),
            deliveries: DeliveryGuard::default(),
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn asset(&self) -> Asset {
        self.init.asset
    }

    #[must_use]
    pub fn charger(&self) -> Address {
        self.init.charger
    }

    #[must_use]
    pub fn factory(&self) -> Option<Address> {
        self.factory
    }

    #[must_use]
    pub fn total_fees_collected(&self) -> Decimal {
        self.total_fees_collected
    }

    #[must_use]
    pub fn pending_gather_count(&self) -> u32 {
        self.pending_gathers.values().sum()
    }

    fn account_init(&self, owner: Address) -> FeeAccountInit {
        FeeAccountInit {
            owner,
            bank: self.address,
            charger: self.init.charger,
            asset: self.init.asset,
        }
    }

    /// Address of `owner`'s fee account.
    #[must_use]
    pub fn fee_account_address(&self, owner: Address) -> Address {
        self.account_init(owner).address()
    }

    fn linked(&self) -> bool {
        self.init.config.credit_link == CreditLink::Linked
    }

    fn from_owner(&self, env: &Envelope) -> Result<()> {
        require_sender(env.from, self.init.owner, "fee bank owner")
    }

    fn from_charger(&self, env: &Envelope) -> Result<()> {
        require_sender(env.from, self.init.charger, "fee bank charger")
    }

    fn misconfigured(&self, got: &str) -> CrossfillError {
        CrossfillError::MisconfiguredAsset {
            expected: self.init.asset,
            got: got.to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Deposits
    // -----------------------------------------------------------------------

    fn native_deposit(&mut self, env: &Envelope, ctx: &mut Context, owner: Address) -> Result<()> {
        if !self.init.asset.is_native() {
            return Err(self.misconfigured("native deposit"));
        }
        if env.tokens.is_some() {
            return Err(self.misconfigured("tokens attached to native deposit"));
        }
        self.deposit(env, ctx, owner, env.value)
    }

    fn token_deposit(&mut self, env: &Envelope, ctx: &mut Context, forward_to: Option<Address>) -> Result<()> {
        let (Asset::Token(token), Some(tokens)) = (self.init.asset, env.tokens) else {
            return Err(self.misconfigured("token transfer"));
        };
        if tokens.token != token {
            return Err(self.misconfigured(&format!("token {}", tokens.token.short())));
        }
        self.deposit(env, ctx, forward_to.unwrap_or(env.from), tokens.amount)
    }

    fn deposit(&mut self, env: &Envelope, ctx: &mut Context, owner: Address, amount: Decimal) -> Result<()> {
        self.deliveries.check_and_record(env)?;
        ensure_non_negative(amount)?;
        if amount < self.init.config.min_deposit {
            return Err(CrossfillError::DepositTooSmall {
                min: self.init.config.min_deposit,
                attached: amount,
            });
        }

        let (value, tokens) = attachment(self.init.asset, amount);
        let account = ctx.deploy(
            ActorInit::FeeAccount(self.account_init(owner)),
            value,
            tokens,
            Message::InternalDeposit { amount },
        );
        if self.linked() {
            ctx.send(
                self.init.charger,
                Message::IncreaseCredit {
                    account: owner,
                    amount,
                },
            );
        }
        tracing::info!(
            bank = %self.address,
            owner = %owner,
            account = %account,
            amount = %amount,
            "Deposit forwarded to fee account"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Withdrawals
    // -----------------------------------------------------------------------

    fn withdraw(
        &mut self,
        env: &Envelope,
        ctx: &mut Context,
        target: Address,
        amount: Decimal,
    ) -> Result<()> {
        self.deliveries.check_and_record(env)?;
        ensure_non_negative(amount)?;
        let owner = env.from;
        ctx.send(
            self.fee_account_address(owner),
            Message::InternalWithdraw { target, amount },
        );
        tracing::info!(
            bank = %self.address,
            owner = %owner,
            target = %target,
            amount = %amount,
            "Withdrawal requested"
        );
        Ok(())
    }

    fn withdraw_confirmed(
        &mut self,
        env: &Envelope,
        ctx: &mut Context,
        owner: Address,
        amount: Decimal,
        remaining: Decimal,
    ) -> Result<()> {
        require_sender(env.from, self.fee_account_address(owner), "fee account")?;
        self.deliveries.check_and_record(env)?;
        if self.linked() {
            ctx.send(
                self.init.charger,
                Message::DecreaseCredit {
                    account: owner,
                    amount,
                    clamp: true,
                },
            );
        }
        tracing::debug!(account = %owner, amount = %amount, remaining = %remaining, "Withdrawal confirmed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Fee gathering
    // -----------------------------------------------------------------------

    fn gather_fees(&mut self, env: &Envelope, ctx: &mut Context, accounts: &[Address]) -> Result<()> {
        self.from_owner(env)?;
        for &owner in accounts {
            ctx.send(
                self.init.charger,
                Message::AvailCreditQuery {
                    account: owner,
                    respond_to: None,
                    context: QueryContext::Gather,
                },
            );
        }
        tracing::info!(bank = %self.address, accounts = accounts.len(), "Fee gathering started");
        Ok(())
    }

    fn credit_answer(
        &mut self,
        env: &Envelope,
        ctx: &mut Context,
        account: Address,
        credit: Decimal,
        context: QueryContext,
    ) -> Result<()> {
        self.from_charger(env)?;
        match context {
            QueryContext::Gather => {
                // Only accounts that answered are tracked; an address with
                // no account never answers and leaves nothing behind.
                self.deliveries.check_and_record(env)?;
                *self.pending_gathers.entry(account).or_insert(0) += 1;
                ctx.send(
                    self.fee_account_address(account),
                    Message::InternalGatherFee { credit },
                );
            }
            QueryContext::Relay { origin } => {
                ctx.send(origin, Message::CreditReport { account, credit });
            }
            QueryContext::Direct => {
                tracing::debug!(bank = %self.address, account = %account, credit = %credit, "Credit reported");
            }
        }
        Ok(())
    }

    fn fee_collected(&mut self, env: &Envelope, ctx: &mut Context, owner: Address, fee: Decimal) -> Result<()> {
        require_sender(env.from, self.fee_account_address(owner), "fee account")?;
        self.deliveries.check_and_record(env)?;
        let attached = env.attached(&self.init.asset);
        if attached < fee {
            return Err(CrossfillError::InsufficientValue {
                needed: fee,
                attached,
            });
        }
        match self.pending_gathers.get_mut(&owner) {
            Some(n) if *n > 1 => *n -= 1,
            Some(_) => {
                self.pending_gathers.remove(&owner);
            }
            None => {
                return Err(CrossfillError::UnexpectedMessage {
                    actor: self.kind(),
                    message: "InternalFeeCollected without pending gather",
                });
            }
        }
        self.total_fees_collected = checked_sum(self.total_fees_collected, fee)?;
        ctx.pay(self.init.owner, self.init.asset, fee);
        tracing::info!(
            bank = %self.address,
            account = %owner,
            fee = %fee,
            total = %self.total_fees_collected,
            "Fee collected"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Credit administration
    // -----------------------------------------------------------------------

    fn grant_credit(&mut self, env: &Envelope, ctx: &mut Context, account: Address, amount: Decimal) -> Result<()> {
        self.from_owner(env)?;
        self.deliveries.check_and_record(env)?;
        ctx.send(self.init.charger, Message::IncreaseCredit { account, amount });
        Ok(())
    }

    fn revoke_credit(&mut self, env: &Envelope, ctx: &mut Context, account: Address, amount: Decimal) -> Result<()> {
        self.from_owner(env)?;
        self.deliveries.check_and_record(env)?;
        ctx.send(
            self.init.charger,
            Message::DecreaseCredit {
                account,
                amount,
                clamp: false,
            },
        );
        Ok(())
    }

    fn charge_fee(&mut self, env: &Envelope, ctx: &mut Context, account: Address, fee: Decimal) -> Result<()> {
        match self.factory {
            Some(factory) => require_sender(env.from, factory, "escrow factory")?,
            None => {
                return Err(CrossfillError::Unauthorized {
                    role: "escrow factory",
                    sender: env.from,
                });
            }
        }
        self.deliveries.check_and_record(env)?;
        ctx.send(self.init.charger, Message::ChargeFee { account, fee });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    fn rescue(&self, env: &Envelope, ctx: &mut Context, asset: Asset, amount: Option<Decimal>) -> Result<()> {
        self.from_owner(env)?;
        let available = ctx.balance(&asset);
        let amount = match amount {
            Some(requested) => ensure_non_negative(requested)?,
            None => available,
        };
        if amount > available {
            return Err(CrossfillError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        ctx.pay(self.init.owner, asset, amount);
        tracing::info!(bank = %self.address, asset = %asset, amount = %amount, "Fee bank funds rescued");
        Ok(())
    }
}

impl Actor for FeeBank {
    fn kind(&self) -> &'static str {
        "fee bank"
    }

    fn handle(&mut self, env: &Envelope, ctx: &mut Context) -> Result<()> {
        match &env.body {
            Message::Deploy => self.from_charger(env),

            // --- Principals ---
            Message::Deposit => self.native_deposit(env, ctx, env.from),
            Message::DepositFor { account } => self.native_deposit(env, ctx, *account),
            Message::TokenTransfer { forward_to } => self.token_deposit(env, ctx, *forward_to),
            Message::Withdraw { amount } => self.withdraw(env, ctx, env.from, *amount),
            Message::WithdrawTo { target, amount } => self.withdraw(env, ctx, *target, *amount),
            Message::AvailCreditRequest { account } => {
                ctx.send(
                    self.init.charger,
                    Message::AvailCreditQuery {
                        account: *account,
                        respond_to: None,
                        context: QueryContext::Relay { origin: env.from },
                    },
                );
                Ok(())
            }

            // --- Owner ---
            Message::GatherFees { accounts } => self.gather_fees(env, ctx, accounts),
            Message::RescueFunds { asset, amount } => self.rescue(env, ctx, *asset, *amount),
            Message::RegisterFactory { factory } => {
                self.from_owner(env)?;
                self.factory = Some(*factory);
                tracing::info!(bank = %self.address, factory = %factory, "Factory registered");
                Ok(())
            }
            Message::GrantCredit { account, amount } => self.grant_credit(env, ctx, *account, *amount),
            Message::RevokeCredit { account, amount } => self.revoke_credit(env, ctx, *account, *amount),

            // --- Escrow factory ---
            Message::ChargeFee { account, fee } => self.charge_fee(env, ctx, *account, *fee),

            // --- Answers and acknowledgements ---
            Message::AvailCreditResp {
                account,
                credit,
                context,
            } => self.credit_answer(env, ctx, *account, *credit, *context),
            Message::InternalFeeCollected { owner, fee } => self.fee_collected(env, ctx, *owner, *fee),
            Message::InternalDepositSuccess { owner, deposited } => {
                require_sender(env.from, self.fee_account_address(*owner), "fee account")?;
                tracing::debug!(account = %owner, deposited = %deposited, "Deposit confirmed");
                Ok(())
            }
            Message::InternalWithdrawSuccess {
                owner,
                amount,
                remaining,
            } => self.withdraw_confirmed(env, ctx, *owner, *amount, *remaining),
            Message::CreditIncreased { account, total }
            | Message::CreditDecreased { account, total } => {
                self.from_charger(env)?;
                tracing::debug!(account = %account, credit = %total, op = env.body.name(), "Credit updated");
                Ok(())
            }
            Message::FeeCharged { account, remaining } => {
                self.from_charger(env)?;
                tracing::debug!(account = %account, credit = %remaining, "Fee charge confirmed");
                Ok(())
            }
            other => Err(CrossfillError::UnexpectedMessage {
                actor: self.kind(),
                message: other.name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use crossfill_types::{Effect, ErrorKind, FeeBankConfig, MessageId, TokenAttachment};

    use super::*;

    fn owner() -> Address {
        Address::from_label("operator")
    }
    fn charger() -> Address {
        Address::from_label("charger")
    }
    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bank_with(asset: Asset, credit_link: CreditLink) -> FeeBank {
        FeeBank::new(FeeBankInit {
            charger: charger(),
            owner: owner(),
            asset,
            config: FeeBankConfig {
                min_deposit: Decimal::new(1, 3),
                credit_link,
            },
        })
    }

    fn env(from: Address, value: Decimal, tokens: Option<TokenAttachment>, body: Message) -> Envelope {
        Envelope {
            id: MessageId::new(),
            from,
            to: Address::from_label("bank"),
            value,
            tokens,
            init: None,
            body,
        }
    }

    fn deliver(bank: &mut FeeBank, env: &Envelope) -> Result<Vec<Effect>> {
        let mut balances = HashMap::new();
        balances.insert(Asset::Native, env.value);
        if let Some(t) = env.tokens {
            balances.insert(t.asset(), t.amount);
        }
        let mut ctx = Context::new(bank.address(), Utc::now(), balances);
        bank.handle(env, &mut ctx)?;
        Ok(ctx.into_effects())
    }

    #[test]
    fn linked_deposit_forwards_value_and_grants_credit() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let effects = deliver(
            &mut bank,
            &env(alice(), Decimal::new(51, 1), None, Message::Deposit),
        )
        .unwrap();
        assert_eq!(effects.len(), 2);
        assert!(matches!(
            &effects[0],
            Effect::Send { to, value, init: Some(_), body: Message::InternalDeposit { .. }, .. }
                if *to == bank.fee_account_address(alice()) && *value == Decimal::new(51, 1)
        ));
        assert!(matches!(
            &effects[1],
            Effect::Send { to, body: Message::IncreaseCredit { .. }, .. } if *to == charger()
        ));
    }

    #[test]
    fn independent_deposit_leaves_credit_alone() {
        let mut bank = bank_with(Asset::Native, CreditLink::Independent);
        let effects = deliver(
            &mut bank,
            &env(alice(), Decimal::ONE, None, Message::Deposit),
        )
        .unwrap();
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn tiny_deposit_rejected() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let err = deliver(
            &mut bank,
            &env(alice(), Decimal::new(1, 4), None, Message::Deposit),
        )
        .unwrap_err();
        assert!(matches!(err, CrossfillError::DepositTooSmall { .. }));
    }

    #[test]
    fn deposit_for_credits_the_named_account() {
        let mut bank = bank_with(Asset::Native, CreditLink::Independent);
        let effects = deliver(
            &mut bank,
            &env(alice(), Decimal::ONE, None, Message::DepositFor { account: Address::from_label("bob") }),
        )
        .unwrap();
        assert!(matches!(
            &effects[0],
            Effect::Send { to, .. } if *to == bank.fee_account_address(Address::from_label("bob"))
        ));
    }

    #[test]
    fn token_bank_rejects_native_deposit() {
        let usdc = Address::from_label("usdc");
        let mut bank = bank_with(Asset::Token(usdc), CreditLink::Linked);
        let err = deliver(&mut bank, &env(alice(), Decimal::ONE, None, Message::Deposit)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MisconfiguredAsset);
    }

    #[test]
    fn native_bank_rejects_token_transfer() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let tokens = TokenAttachment {
            token: Address::from_label("usdc"),
            amount: Decimal::ONE,
        };
        let err = deliver(
            &mut bank,
            &env(alice(), Decimal::ZERO, Some(tokens), Message::TokenTransfer { forward_to: None }),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MisconfiguredAsset);
    }

    #[test]
    fn token_bank_rejects_foreign_token() {
        let mut bank = bank_with(Asset::Token(Address::from_label("usdc")), CreditLink::Linked);
        let tokens = TokenAttachment {
            token: Address::from_label("dai"),
            amount: Decimal::ONE,
        };
        let err = deliver(
            &mut bank,
            &env(alice(), Decimal::ZERO, Some(tokens), Message::TokenTransfer { forward_to: None }),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MisconfiguredAsset);
    }

    #[test]
    fn token_transfer_forwards_tokens() {
        let usdc = Address::from_label("usdc");
        let mut bank = bank_with(Asset::Token(usdc), CreditLink::Independent);
        let tokens = TokenAttachment {
            token: usdc,
            amount: Decimal::new(25, 0),
        };
        let effects = deliver(
            &mut bank,
            &env(alice(), Decimal::ZERO, Some(tokens), Message::TokenTransfer { forward_to: None }),
        )
        .unwrap();
        assert!(matches!(
            &effects[0],
            Effect::Send { tokens: Some(t), .. } if t.amount == Decimal::new(25, 0)
        ));
    }

    fn withdraw_success(bank: &FeeBank) -> Envelope {
        env(
            bank.fee_account_address(alice()),
            Decimal::ZERO,
            None,
            Message::InternalWithdrawSuccess {
                owner: alice(),
                amount: Decimal::ONE,
                remaining: Decimal::ZERO,
            },
        )
    }

    #[test]
    fn withdraw_request_leaves_credit_alone() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let effects = deliver(
            &mut bank,
            &env(alice(), Decimal::ZERO, None, Message::Withdraw { amount: Decimal::ONE }),
        )
        .unwrap();
        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], Effect::Send { body: Message::InternalWithdraw { .. }, .. }));
    }

    #[test]
    fn linked_withdraw_confirmation_sends_clamped_decrease() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let confirmed = withdraw_success(&bank);
        let effects = deliver(&mut bank, &confirmed).unwrap();
        assert_eq!(
            effects,
            vec![Effect::Send {
                to: charger(),
                value: Decimal::ZERO,
                tokens: None,
                init: None,
                body: Message::DecreaseCredit {
                    account: alice(),
                    amount: Decimal::ONE,
                    clamp: true,
                },
            }]
        );

        let err = deliver(&mut bank, &confirmed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateDelivery);
    }

    #[test]
    fn independent_withdraw_confirmation_is_silent() {
        let mut bank = bank_with(Asset::Native, CreditLink::Independent);
        let confirmed = withdraw_success(&bank);
        assert!(deliver(&mut bank, &confirmed).unwrap().is_empty());
    }

    #[test]
    fn withdraw_confirmation_only_from_the_account() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let mut forged = withdraw_success(&bank);
        forged.from = alice();
        let err = deliver(&mut bank, &forged).unwrap_err();
        assert!(matches!(err, CrossfillError::Unauthorized { role: "fee account", .. }));
    }

    #[test]
    fn redelivered_withdraw_rejected() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let e = env(alice(), Decimal::ZERO, None, Message::Withdraw { amount: Decimal::ONE });
        deliver(&mut bank, &e).unwrap();
        let err = deliver(&mut bank, &e).unwrap_err();
        assert!(matches!(err, CrossfillError::DuplicateDelivery { message: "Withdraw", id } if id == e.id));
    }

    #[test]
    fn gather_is_owner_only() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let err = deliver(
            &mut bank,
            &env(alice(), Decimal::ZERO, None, Message::GatherFees { accounts: vec![alice()] }),
        )
        .unwrap_err();
        assert!(matches!(err, CrossfillError::Unauthorized { .. }));
        assert_eq!(bank.pending_gather_count(), 0);
    }

    #[test]
    fn gather_flow_tracks_pending_and_totals() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        deliver(
            &mut bank,
            &env(owner(), Decimal::ZERO, None, Message::GatherFees { accounts: vec![alice()] }),
        )
        .unwrap();
        assert_eq!(bank.pending_gather_count(), 0);

        let effects = deliver(
            &mut bank,
            &env(
                charger(),
                Decimal::ZERO,
                None,
                Message::AvailCreditResp {
                    account: alice(),
                    credit: Decimal::new(3, 0),
                    context: QueryContext::Gather,
                },
            ),
        )
        .unwrap();
        assert!(matches!(
            &effects[0],
            Effect::Send { body: Message::InternalGatherFee { credit }, .. } if *credit == Decimal::new(3, 0)
        ));
        assert_eq!(bank.pending_gather_count(), 1);

        let account = bank.fee_account_address(alice());
        let effects = deliver(
            &mut bank,
            &env(
                account,
                Decimal::new(7, 0),
                None,
                Message::InternalFeeCollected {
                    owner: alice(),
                    fee: Decimal::new(7, 0),
                },
            ),
        )
        .unwrap();
        assert_eq!(bank.total_fees_collected(), Decimal::new(7, 0));
        assert_eq!(bank.pending_gather_count(), 0);
        assert_eq!(
            effects,
            vec![Effect::Pay {
                to: owner(),
                asset: Asset::Native,
                amount: Decimal::new(7, 0),
            }]
        );
    }

    #[test]
    fn gather_of_unknown_accounts_leaves_nothing_pending() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let ghost = Address::from_label("ghost");
        for _ in 0..3 {
            let effects = deliver(
                &mut bank,
                &env(owner(), Decimal::ZERO, None, Message::GatherFees { accounts: vec![ghost] }),
            )
            .unwrap();
            assert_eq!(effects.len(), 1);
        }
        assert_eq!(bank.pending_gather_count(), 0);
    }

    #[test]
    fn redelivered_gather_answer_gathers_once() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let answer = env(
            charger(),
            Decimal::ZERO,
            None,
            Message::AvailCreditResp {
                account: alice(),
                credit: Decimal::ONE,
                context: QueryContext::Gather,
            },
        );
        deliver(&mut bank, &answer).unwrap();
        let err = deliver(&mut bank, &answer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateDelivery);
        assert_eq!(bank.pending_gather_count(), 1);
    }

    #[test]
    fn redelivered_grant_is_forwarded_once() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let grant = env(
            owner(),
            Decimal::ZERO,
            None,
            Message::GrantCredit {
                account: alice(),
                amount: Decimal::new(5, 0),
            },
        );
        assert_eq!(deliver(&mut bank, &grant).unwrap().len(), 1);
        assert!(deliver(&mut bank, &grant).is_err());
    }

    #[test]
    fn relay_answer_goes_to_origin() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let asker = Address::from_label("asker");
        let effects = deliver(
            &mut bank,
            &env(
                charger(),
                Decimal::ZERO,
                None,
                Message::AvailCreditResp {
                    account: alice(),
                    credit: Decimal::new(2, 0),
                    context: QueryContext::Relay { origin: asker },
                },
            ),
        )
        .unwrap();
        assert!(matches!(
            &effects[0],
            Effect::Send { to, body: Message::CreditReport { .. }, .. } if *to == asker
        ));
    }

    #[test]
    fn charge_fee_requires_registered_factory() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let factory = Address::from_label("factory");
        let charge = Message::ChargeFee {
            account: alice(),
            fee: Decimal::ONE,
        };
        let err = deliver(&mut bank, &env(factory, Decimal::ZERO, None, charge.clone())).unwrap_err();
        assert!(matches!(err, CrossfillError::Unauthorized { .. }));

        deliver(
            &mut bank,
            &env(owner(), Decimal::ZERO, None, Message::RegisterFactory { factory }),
        )
        .unwrap();
        assert!(deliver(&mut bank, &env(factory, Decimal::ZERO, None, charge)).is_ok());
    }

    #[test]
    fn revoke_is_strict() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let effects = deliver(
            &mut bank,
            &env(
                owner(),
                Decimal::ZERO,
                None,
                Message::RevokeCredit {
                    account: alice(),
                    amount: Decimal::ONE,
                },
            ),
        )
        .unwrap();
        assert!(matches!(
            &effects[0],
            Effect::Send { body: Message::DecreaseCredit { clamp: false, .. }, .. }
        ));
    }

    #[test]
    fn rescue_pays_owner_from_own_balance() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        let stray = env(owner(), Decimal::new(2, 0), None, Message::RescueFunds {
            asset: Asset::Native,
            amount: None,
        });
        let effects = deliver(&mut bank, &stray).unwrap();
        assert_eq!(
            effects,
            vec![Effect::Pay {
                to: owner(),
                asset: Asset::Native,
                amount: Decimal::new(2, 0),
            }]
        );
    }

    #[test]
    fn state_survives_json_round_trip() {
        let mut bank = bank_with(Asset::Native, CreditLink::Linked);
        deliver(
            &mut bank,
            &env(
                charger(),
                Decimal::ZERO,
                None,
                Message::AvailCreditResp {
                    account: alice(),
                    credit: Decimal::ONE,
                    context: QueryContext::Gather,
                },
            ),
        )
        .unwrap();
        let json = serde_json::to_string(&bank).unwrap();
        let back: FeeBank = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bank);
        assert_eq!(back.pending_gather_count(), 1);
    }
}
