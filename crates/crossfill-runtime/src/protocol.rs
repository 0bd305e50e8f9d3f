//! One-shot deployment of the shared protocol actors.

use crossfill_types::{
    ActorInit, Address, Asset, ChargerInit, CrossfillError, FactoryInit, InvalidatorInit, Message,
    MessageId, ProtocolConfig, Result,
};
use rust_decimal::Decimal;

use crate::runtime::Runtime;

/// Who operates the protocol and in which asset fees are kept.
#[derive(Debug, Clone)]
pub struct ProtocolSetup {
    pub owner: Address,
    /// Order-protocol trigger that creates source escrows and drives the
    /// Merkle invalidator.
    pub trigger: Address,
    pub fee_asset: Asset,
    pub config: ProtocolConfig,
}

/// Addresses of the deployed protocol actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protocol {
    pub factory: Address,
    pub invalidator: Address,
    pub charger: Address,
    pub fee_bank: Address,
}

impl ProtocolSetup {
    fn charger_init(&self) -> ChargerInit {
        ChargerInit {
            owner: self.owner,
            asset: self.fee_asset,
            fee_bank_config: self.config.fee_bank.clone(),
        }
    }

    /// Addresses the deployment will produce, computable before deploying.
    #[must_use]
    pub fn addresses(&self) -> Protocol {
        let charger_init = self.charger_init();
        let charger = ActorInit::FeeBankCharger(charger_init.clone()).address();
        let fee_bank = ActorInit::FeeBank(charger_init.fee_bank_init(charger)).address();
        let factory = ActorInit::EscrowFactory(self.factory_init(fee_bank)).address();
        let invalidator = InvalidatorInit {
            trigger: self.trigger,
            factory: Some(factory),
        }
        .address();
        Protocol {
            factory,
            invalidator,
            charger,
            fee_bank,
        }
    }

    fn factory_init(&self, fee_bank: Address) -> FactoryInit {
        FactoryInit {
            owner: self.owner,
            trigger: self.trigger,
            fee_bank: Some(fee_bank),
            config: self.config.factory.clone(),
        }
    }
}

impl Runtime {
    /// Deploy charger, fee bank, factory and invalidator, then register
    /// the factory with the fee bank. Opens mailboxes for the owner and
    /// the trigger.
    pub fn bootstrap(&mut self, setup: &ProtocolSetup) -> Result<Protocol> {
        setup.config.validate()?;
        let protocol = setup.addresses();
        self.open_mailbox(setup.owner);
        self.open_mailbox(setup.trigger);

        let deploys = [
            ActorInit::FeeBankCharger(setup.charger_init()),
            ActorInit::EscrowFactory(setup.factory_init(protocol.fee_bank)),
            ActorInit::Invalidator(InvalidatorInit {
                trigger: setup.trigger,
                factory: Some(protocol.factory),
            }),
        ];
        let mut ids = Vec::with_capacity(deploys.len() + 1);
        for init in deploys {
            let (_, id) = self.deploy(setup.owner, init, Decimal::ZERO, Message::Deploy)?;
            ids.push(id);
        }
        self.run_until_idle()?;

        ids.push(self.send(
            setup.owner,
            protocol.fee_bank,
            Message::RegisterFactory {
                factory: protocol.factory,
            },
        )?);
        self.run_until_idle()?;

        for id in ids {
            self.require_delivered(id)?;
        }
        tracing::info!(
            factory = %protocol.factory,
            invalidator = %protocol.invalidator,
            charger = %protocol.charger,
            fee_bank = %protocol.fee_bank,
            "Protocol deployed"
        );
        Ok(protocol)
    }

    fn require_delivered(&self, id: MessageId) -> Result<()> {
        match self.outcome(id) {
            Some(outcome) if outcome.is_delivered() => Ok(()),
            Some(outcome) => Err(CrossfillError::Internal(format!(
                "bootstrap message {id} failed: {outcome:?}"
            ))),
            None => Err(CrossfillError::Internal(format!(
                "bootstrap message {id} was never delivered"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use crossfill_types::RuntimeConfig;

    use super::*;

    fn setup() -> ProtocolSetup {
        ProtocolSetup {
            owner: Address::from_label("operator"),
            trigger: Address::from_label("order-protocol"),
            fee_asset: Asset::Native,
            config: ProtocolConfig::default(),
        }
    }

    #[test]
    fn bootstrap_deploys_everything() {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        let p = rt.bootstrap(&setup()).unwrap();
        assert_eq!(p, setup().addresses());
        assert!(rt.factory(p.factory).is_some());
        assert!(rt.invalidator(p.invalidator).is_some());
        assert_eq!(rt.charger(p.charger).map(|c| c.fee_bank()), Some(p.fee_bank));
        assert_eq!(rt.fee_bank(p.fee_bank).and_then(|b| b.factory()), Some(p.factory));
        assert_eq!(rt.factory(p.factory).map(|f| f.invalidator_address()), Some(p.invalidator));
    }

    #[test]
    fn invalid_config_refused() {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        let mut s = setup();
        s.config.factory.fill_fee_rate = Decimal::TWO;
        assert!(matches!(rt.bootstrap(&s), Err(CrossfillError::Configuration(_))));
    }
}
