//! Fee bank charger: sole authority over credit allowances.
//!
//! Every request must come from the charger's own fee bank. The charger
//! does not store balances; it forwards each request to the principal's
//! fee account and relays the account's acknowledgement back to the bank.
//! Acknowledgements are accepted only from the account address derived
//! for the principal they name. Credit-changing requests are recorded in a
//! [`DeliveryGuard`] so a redelivered one is not forwarded twice.

use crossfill_types::{
    Actor, ActorInit, Address, ChargerInit, Context, CrossfillError, Envelope, FeeAccountInit,
    Message, QueryContext, Result, ensure_non_negative,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::idempotency::DeliveryGuard;
use crate::require_sender;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBankCharger {
    init: ChargerInit,
    address: Address,
    fee_bank: Address,
    deliveries: DeliveryGuard,
}

impl FeeBankCharger {
    #[must_use]
    pub fn new(init: ChargerInit) -> Self {
        let address = ActorInit::FeeBankCharger(init.clone()).address();
        let fee_bank = ActorInit::FeeBank(init.fee_bank_init(address)).address();
        Self {
            init,
            address,
            fee_bank,
            deliveries: DeliveryGuard::default(),
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Address of the fee bank this charger deploys and serves.
    #[must_use]
    pub fn fee_bank(&self) -> Address {
        self.fee_bank
    }

    fn account_init(&self, owner: Address) -> FeeAccountInit {
        FeeAccountInit {
            owner,
            bank: self.fee_bank,
            charger: self.address,
            asset: self.init.asset,
        }
    }

    #[must_use]
    pub fn fee_account_address(&self, owner: Address) -> Address {
        self.account_init(owner).address()
    }

    fn from_bank(&self, env: &Envelope) -> Result<()> {
        require_sender(env.from, self.fee_bank, "fee bank")
    }

    fn from_account(&self, env: &Envelope, owner: Address) -> Result<()> {
        require_sender(env.from, self.fee_account_address(owner), "fee account")
    }

    fn deploy_bank(&self, env: &Envelope, ctx: &mut Context) -> Result<()> {
        require_sender(env.from, self.init.owner, "charger owner")?;
        let bank = ctx.deploy(
            ActorInit::FeeBank(self.init.fee_bank_init(self.address)),
            Decimal::ZERO,
            None,
            Message::Deploy,
        );
        tracing::info!(charger = %self.address, fee_bank = %bank, asset = %self.init.asset, "Fee bank deployed");
        Ok(())
    }

    fn increase(&mut self, env: &Envelope, ctx: &mut Context, account: Address, amount: Decimal) -> Result<()> {
        self.from_bank(env)?;
        self.deliveries.check_and_record(env)?;
        ensure_non_negative(amount)?;
        // First credit grant may precede any deposit, so the account is
        // deployed on demand.
        ctx.deploy(
            ActorInit::FeeAccount(self.account_init(account)),
            Decimal::ZERO,
            None,
            Message::InternalIncreaseCredit { amount },
        );
        Ok(())
    }

    fn decrease(
        &mut self,
        env: &Envelope,
        ctx: &mut Context,
        account: Address,
        amount: Decimal,
        clamp: bool,
    ) -> Result<()> {
        self.from_bank(env)?;
        self.deliveries.check_and_record(env)?;
        ensure_non_negative(amount)?;
        ctx.send(
            self.fee_account_address(account),
            Message::InternalDecreaseCredit { amount, clamp },
        );
        Ok(())
    }

    fn charge(&mut self, env: &Envelope, ctx: &mut Context, account: Address, fee: Decimal) -> Result<()> {
        self.from_bank(env)?;
        self.deliveries.check_and_record(env)?;
        ensure_non_negative(fee)?;
        ctx.send(
            self.fee_account_address(account),
            Message::InternalChargeFee { fee },
        );
        Ok(())
    }

    fn query(
        &self,
        env: &Envelope,
        ctx: &mut Context,
        account: Address,
        respond_to: Option<Address>,
        context: QueryContext,
    ) -> Result<()> {
        self.from_bank(env)?;
        ctx.send(
            self.fee_account_address(account),
            Message::InternalCreditQuery {
                respond_to: None,
                reply_to: respond_to.unwrap_or(env.from),
                context,
            },
        );
        Ok(())
    }
}

impl Actor for FeeBankCharger {
    fn kind(&self) -> &'static str {
        "fee bank charger"
    }

    fn handle(&mut self, env: &Envelope, ctx: &mut Context) -> Result<()> {
        match &env.body {
            Message::Deploy => self.deploy_bank(env, ctx),

            // --- Requests from the fee bank ---
            Message::IncreaseCredit { account, amount } => {
                self.increase(env, ctx, *account, *amount)
            }
            Message::DecreaseCredit {
                account,
                amount,
                clamp,
            } => self.decrease(env, ctx, *account, *amount, *clamp),
            Message::ChargeFee { account, fee } => self.charge(env, ctx, *account, *fee),
            Message::AvailCreditQuery {
                account,
                respond_to,
                context,
            } => self.query(env, ctx, *account, *respond_to, *context),

            // --- Acknowledgements from fee accounts ---
            Message::InternalCreditResponse {
                owner,
                credit,
                reply_to,
                context,
            } => {
                self.from_account(env, *owner)?;
                ctx.send(
                    *reply_to,
                    Message::AvailCreditResp {
                        account: *owner,
                        credit: *credit,
                        context: *context,
                    },
                );
                Ok(())
            }
            Message::InternalCreditIncreased { owner, total } => {
                self.from_account(env, *owner)?;
                ctx.send(
                    self.fee_bank,
                    Message::CreditIncreased {
                        account: *owner,
                        total: *total,
                    },
                );
                Ok(())
            }
            Message::InternalCreditDecreased { owner, total } => {
                self.from_account(env, *owner)?;
                ctx.send(
                    self.fee_bank,
                    Message::CreditDecreased {
                        account: *owner,
                        total: *total,
                    },
                );
                Ok(())
            }
            Message::InternalFeeCharged { owner, remaining } => {
                self.from_account(env, *owner)?;
                ctx.send(
                    self.fee_bank,
                    Message::FeeCharged {
                        account: *owner,
                        remaining: *remaining,
                    },
                );
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
    use crossfill_types::{Asset, Effect, FeeBankConfig, MessageId};

    use super::*;

    fn charger() -> FeeBankCharger {
        FeeBankCharger::new(ChargerInit {
            owner: Address::from_label("operator"),
            asset: Asset::Native,
            fee_bank_config: FeeBankConfig::default(),
        })
    }

    fn deliver(c: &mut FeeBankCharger, from: Address, body: Message) -> Result<Vec<Effect>> {
        deliver_with_id(c, MessageId::new(), from, body)
    }

    fn deliver_with_id(
        c: &mut FeeBankCharger,
        id: MessageId,
        from: Address,
        body: Message,
    ) -> Result<Vec<Effect>> {
        let env = Envelope {
            id,
            from,
            to: c.address(),
            value: Decimal::ZERO,
            tokens: None,
            init: None,
            body,
        };
        let mut ctx = Context::new(c.address(), Utc::now(), HashMap::new());
        c.handle(&env, &mut ctx)?;
        Ok(ctx.into_effects())
    }

    #[test]
    fn deploys_its_bank() {
        let mut c = charger();
        let effects = deliver(&mut c, Address::from_label("operator"), Message::Deploy).unwrap();
        assert!(matches!(
            &effects[0],
            Effect::Send { to, init: Some(ActorInit::FeeBank(_)), .. } if *to == c.fee_bank()
        ));
    }

    #[test]
    fn only_owner_deploys_bank() {
        let mut c = charger();
        let err = deliver(&mut c, Address::from_label("mallory"), Message::Deploy).unwrap_err();
        assert!(matches!(err, CrossfillError::Unauthorized { .. }));
    }

    #[test]
    fn requests_only_from_bank() {
        let mut c = charger();
        let err = deliver(
            &mut c,
            Address::from_label("mallory"),
            Message::IncreaseCredit {
                account: Address::from_label("mallory"),
                amount: Decimal::new(1000, 0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CrossfillError::Unauthorized { role: "fee bank", .. }));
    }

    #[test]
    fn increase_deploys_account_lazily() {
        let mut c = charger();
        let alice = Address::from_label("alice");
        let bank = c.fee_bank();
        let effects = deliver(
            &mut c,
            bank,
            Message::IncreaseCredit {
                account: alice,
                amount: Decimal::new(3, 0),
            },
        )
        .unwrap();
        assert!(matches!(
            &effects[0],
            Effect::Send { to, init: Some(ActorInit::FeeAccount(_)), .. }
                if *to == c.fee_account_address(alice)
        ));
    }

    #[test]
    fn redelivered_credit_requests_not_forwarded_twice() {
        let mut c = charger();
        let alice = Address::from_label("alice");
        let bank = c.fee_bank();
        let requests = [
            Message::IncreaseCredit {
                account: alice,
                amount: Decimal::new(5, 0),
            },
            Message::DecreaseCredit {
                account: alice,
                amount: Decimal::ONE,
                clamp: true,
            },
            Message::ChargeFee {
                account: alice,
                fee: Decimal::ONE,
            },
        ];
        for body in requests {
            let id = MessageId::new();
            assert_eq!(deliver_with_id(&mut c, id, bank, body.clone()).unwrap().len(), 1);
            let err = deliver_with_id(&mut c, id, bank, body).unwrap_err();
            assert_eq!(err.kind(), crossfill_types::ErrorKind::DuplicateDelivery);
        }
    }

    #[test]
    fn guard_survives_restart() {
        let mut c = charger();
        let bank = c.fee_bank();
        let id = MessageId::new();
        let body = Message::ChargeFee {
            account: Address::from_label("alice"),
            fee: Decimal::ONE,
        };
        deliver_with_id(&mut c, id, bank, body.clone()).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let mut restarted: FeeBankCharger = serde_json::from_str(&json).unwrap();
        assert!(deliver_with_id(&mut restarted, id, bank, body).is_err());
    }

    #[test]
    fn negative_increase_rejected() {
        let mut c = charger();
        let bank = c.fee_bank();
        let err = deliver(
            &mut c,
            bank,
            Message::IncreaseCredit {
                account: Address::from_label("alice"),
                amount: Decimal::NEGATIVE_ONE,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CrossfillError::InvalidAmount(_)));
    }

    #[test]
    fn acks_only_from_the_named_account() {
        let mut c = charger();
        let alice = Address::from_label("alice");
        let bob_account = c.fee_account_address(Address::from_label("bob"));
        let err = deliver(
            &mut c,
            bob_account,
            Message::InternalCreditIncreased {
                owner: alice,
                total: Decimal::new(1000, 0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CrossfillError::Unauthorized { role: "fee account", .. }));
    }

    #[test]
    fn query_defaults_reply_to_the_bank() {
        let mut c = charger();
        let bank = c.fee_bank();
        let effects = deliver(
            &mut c,
            bank,
            Message::AvailCreditQuery {
                account: Address::from_label("alice"),
                respond_to: None,
                context: QueryContext::Gather,
            },
        )
        .unwrap();
        assert!(matches!(
            &effects[0],
            Effect::Send { body: Message::InternalCreditQuery { reply_to, .. }, .. } if *reply_to == bank
        ));
    }

    #[test]
    fn credit_response_goes_to_reply_to() {
        let mut c = charger();
        let alice = Address::from_label("alice");
        let watcher = Address::from_label("watcher");
        let account = c.fee_account_address(alice);
        let effects = deliver(
            &mut c,
            account,
            Message::InternalCreditResponse {
                owner: alice,
                credit: Decimal::new(3, 0),
                reply_to: watcher,
                context: QueryContext::Direct,
            },
        )
        .unwrap();
        assert!(matches!(
            &effects[0],
            Effect::Send { to, body: Message::AvailCreditResp { credit, .. }, .. }
                if *to == watcher && *credit == Decimal::new(3, 0)
        ));
    }
}
