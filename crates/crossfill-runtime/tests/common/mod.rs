//! Shared fixtures for the substrate integration tests.

#![allow(dead_code)]

use crossfill_runtime::{Delivery, Outcome, Protocol, ProtocolSetup, Runtime};
use crossfill_types::{
    Address, Asset, ErrorKind, Message, MessageId, ProtocolConfig, RuntimeConfig,
};
use rust_decimal::Decimal;

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn operator() -> Address {
    Address::from_label("operator")
}

pub fn trigger() -> Address {
    Address::from_label("order-protocol")
}

pub fn native(rt: &Runtime, who: Address) -> Decimal {
    rt.balance(who, &Asset::Native)
}

/// Runtime with the protocol deployed.
pub struct World {
    pub rt: Runtime,
    pub p: Protocol,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(ProtocolConfig::default(), Asset::Native)
    }

    pub fn with_config(config: ProtocolConfig, fee_asset: Asset) -> Self {
        let _ = crossfill_runtime::telemetry::init_tracing(false);
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        let p = rt
            .bootstrap(&ProtocolSetup {
                owner: operator(),
                trigger: trigger(),
                fee_asset,
                config,
            })
            .unwrap();
        Self { rt, p }
    }

    /// Send and run to completion, returning the outcome of `id` itself.
    pub fn run(&mut self, id: MessageId) -> Outcome {
        self.rt.run_until_idle().unwrap();
        self.rt.check_supply().unwrap();
        self.rt.outcome(id).cloned().unwrap()
    }

    pub fn send(&mut self, from: Address, to: Address, body: Message) -> Outcome {
        let id = self.rt.send(from, to, body).unwrap();
        self.run(id)
    }

    pub fn send_value(&mut self, from: Address, to: Address, value: Decimal, body: Message) -> Outcome {
        let id = self.rt.send_value(from, to, value, body).unwrap();
        self.run(id)
    }

    /// First delivery of a message named `name` caused by `root`.
    pub fn in_chain(&self, root: MessageId, name: &str) -> Option<&Delivery> {
        self.rt
            .causal_chain(root)
            .into_iter()
            .find(|d| d.envelope.body.name() == name)
    }
}

pub fn rejected_with(outcome: &Outcome, kind: ErrorKind) -> bool {
    outcome.error_kind() == Some(kind)
}
