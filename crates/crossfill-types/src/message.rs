//! Wire messages exchanged between actors.
//!
//! Every variant has a stable 32-bit opcode (see [`crate::opcodes`]).
//! Requests that expect an answer carry their return address and a
//! [`QueryContext`] in the message itself, so no actor has to remember a
//! pending request to resume it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::escrow::{EscrowImmutables, FillRef};
use crate::ids::{Address, Hash32};
use crate::opcodes as op;

/// Why a credit query was issued; echoed back unchanged with the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryContext {
    /// Fee gathering: the bank continues with `InternalGatherFee`.
    Gather,
    /// Relay the answer to whoever asked the bank.
    Relay { origin: Address },
    /// No continuation; the answer is informational.
    Direct,
}

/// All messages understood by crossfill actors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Bare deployment; an actor spawned by its init data acts on it.
    Deploy,

    // --- Escrow factory ---
    CreateEscrowSrc {
        immutables: EscrowImmutables,
        fill: Option<FillRef>,
    },
    CreateEscrowDst {
        immutables: EscrowImmutables,
    },
    AddressQuery {
        immutables: EscrowImmutables,
    },
    AddressResp {
        immutables: EscrowImmutables,
        address: Address,
    },
    ValidatedFill {
        order_hash: Hash32,
        index: u64,
        secret_hash: Hash32,
        taker: Address,
        making_amount: Decimal,
    },

    // --- Escrow ---
    FundEscrow,
    WithdrawPriv {
        secret: Vec<u8>,
    },
    WithdrawPub {
        secret: Vec<u8>,
    },
    CancelPriv,
    CancelPub,
    /// Owner sweep. `amount == None` sweeps everything that may be swept.
    RescueFunds {
        asset: Asset,
        amount: Option<Decimal>,
    },

    // --- Fee bank ---
    Deposit,
    DepositFor {
        account: Address,
    },
    /// Token-transfer notification; the tokens ride on the envelope.
    TokenTransfer {
        forward_to: Option<Address>,
    },
    Withdraw {
        amount: Decimal,
    },
    WithdrawTo {
        target: Address,
        amount: Decimal,
    },
    GatherFees {
        accounts: Vec<Address>,
    },
    RegisterFactory {
        factory: Address,
    },
    GrantCredit {
        account: Address,
        amount: Decimal,
    },
    RevokeCredit {
        account: Address,
        amount: Decimal,
    },
    /// Factory → bank and bank → charger.
    ChargeFee {
        account: Address,
        fee: Decimal,
    },
    AvailCreditRequest {
        account: Address,
    },
    CreditReport {
        account: Address,
        credit: Decimal,
    },

    // --- Charger ---
    IncreaseCredit {
        account: Address,
        amount: Decimal,
    },
    DecreaseCredit {
        account: Address,
        amount: Decimal,
        /// Saturate at zero instead of failing when credit is short.
        clamp: bool,
    },
    AvailCreditQuery {
        account: Address,
        respond_to: Option<Address>,
        context: QueryContext,
    },
    AvailCreditResp {
        account: Address,
        credit: Decimal,
        context: QueryContext,
    },
    CreditIncreased {
        account: Address,
        total: Decimal,
    },
    CreditDecreased {
        account: Address,
        total: Decimal,
    },
    FeeCharged {
        account: Address,
        remaining: Decimal,
    },

    // --- Fee account ---
    InternalDeposit {
        amount: Decimal,
    },
    InternalDepositSuccess {
        owner: Address,
        deposited: Decimal,
    },
    InternalWithdraw {
        target: Address,
        amount: Decimal,
    },
    InternalWithdrawSuccess {
        owner: Address,
        amount: Decimal,
        remaining: Decimal,
    },
    InternalIncreaseCredit {
        amount: Decimal,
    },
    InternalDecreaseCredit {
        amount: Decimal,
        clamp: bool,
    },
    InternalChargeFee {
        fee: Decimal,
    },
    InternalGatherFee {
        credit: Decimal,
    },
    InternalFeeCollected {
        owner: Address,
        fee: Decimal,
    },
    InternalCreditQuery {
        /// Where the account sends its answer; the querying charger if unset.
        respond_to: Option<Address>,
        /// Final recipient of the charger's `AvailCreditResp`.
        reply_to: Address,
        context: QueryContext,
    },
    InternalCreditResponse {
        owner: Address,
        credit: Decimal,
        reply_to: Address,
        context: QueryContext,
    },
    InternalCreditIncreased {
        owner: Address,
        total: Decimal,
    },
    InternalCreditDecreased {
        owner: Address,
        total: Decimal,
    },
    InternalFeeCharged {
        owner: Address,
        remaining: Decimal,
    },

    // --- Merkle invalidator ---
    TakerInteraction {
        order: Vec<u8>,
        extension: Vec<u8>,
        order_hash: Hash32,
        taker: Address,
        making_amount: Decimal,
        taking_amount: Decimal,
        remaining_making_amount: Decimal,
        extra_data: Vec<u8>,
    },
    TakerInteractionAccepted {
        order_hash: Hash32,
        index: u64,
        secret_hash: Hash32,
    },
}

impl Message {
    /// Wire opcode of this message.
    #[must_use]
    pub fn opcode(&self) -> u32 {
        match self {
            Self::Deploy => op::DEPLOY,
            Self::CreateEscrowSrc { .. } => op::CREATE_ESCROW_SRC,
            Self::CreateEscrowDst { .. } => op::CREATE_ESCROW_DST,
            Self::AddressQuery { .. } => op::ADDRESS_QUERY,
            Self::AddressResp { .. } => op::ADDRESS_RESP,
            Self::ValidatedFill { .. } => op::VALIDATED_FILL,
            Self::FundEscrow => op::FUND_ESCROW,
            Self::WithdrawPriv { .. } => op::WITHDRAW_PRIV,
            Self::WithdrawPub { .. } => op::WITHDRAW_PUB,
            Self::CancelPriv => op::CANCEL_PRIV,
            Self::CancelPub => op::CANCEL_PUB,
            Self::RescueFunds { .. } => op::RESCUE_FUNDS,
            Self::Deposit => op::DEPOSIT,
            Self::DepositFor { .. } => op::DEPOSIT_FOR,
            Self::TokenTransfer { .. } => op::TOKEN_TRANSFER,
            Self::Withdraw { .. } => op::WITHDRAW,
            Self::WithdrawTo { .. } => op::WITHDRAW_TO,
            Self::GatherFees { .. } => op::GATHER_FEES,
            Self::RegisterFactory { .. } => op::REGISTER_FACTORY,
            Self::GrantCredit { .. } => op::GRANT_CREDIT,
            Self::RevokeCredit { .. } => op::REVOKE_CREDIT,
            Self::ChargeFee { .. } => op::CHARGE_FEE,
            Self::AvailCreditRequest { .. } => op::AVAIL_CREDIT_REQUEST,
            Self::CreditReport { .. } => op::CREDIT_REPORT,
            Self::IncreaseCredit { .. } => op::INCREASE_CREDIT,
            Self::DecreaseCredit { .. } => op::DECREASE_CREDIT,
            Self::AvailCreditQuery { .. } => op::AVAIL_CREDIT_QUERY,
            Self::AvailCreditResp { .. } => op::AVAIL_CREDIT_RESP,
            Self::CreditIncreased { .. } => op::CREDIT_INCREASED,
            Self::CreditDecreased { .. } => op::CREDIT_DECREASED,
            Self::FeeCharged { .. } => op::FEE_CHARGED,
            Self::InternalDeposit { .. } => op::INTERNAL_DEPOSIT,
            Self::InternalDepositSuccess { .. } => op::INTERNAL_DEPOSIT_SUCCESS,
            Self::InternalWithdraw { .. } => op::INTERNAL_WITHDRAW,
            Self::InternalWithdrawSuccess { .. } => op::INTERNAL_WITHDRAW_SUCCESS,
            Self::InternalIncreaseCredit { .. } => op::INTERNAL_INCREASE_CREDIT,
            Self::InternalDecreaseCredit { .. } => op::INTERNAL_DECREASE_CREDIT,
            Self::InternalChargeFee { .. } => op::INTERNAL_CHARGE_FEE,
            Self::InternalGatherFee { .. } => op::INTERNAL_GATHER_FEE,
            Self::InternalFeeCollected { .. } => op::INTERNAL_FEE_COLLECTED,
            Self::InternalCreditQuery { .. } => op::INTERNAL_CREDIT_QUERY,
            Self::InternalCreditResponse { .. } => op::INTERNAL_CREDIT_RESPONSE,
            Self::InternalCreditIncreased { .. } => op::INTERNAL_CREDIT_INCREASED,
            Self::InternalCreditDecreased { .. } => op::INTERNAL_CREDIT_DECREASED,
            Self::InternalFeeCharged { .. } => op::INTERNAL_FEE_CHARGED,
            Self::TakerInteraction { .. } => op::TAKER_INTERACTION,
            Self::TakerInteractionAccepted { .. } => op::TAKER_INTERACTION_ACCEPTED,
        }
    }

    /// Variant name, for logs and delivery traces.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deploy => "Deploy",
            Self::CreateEscrowSrc { .. } => "CreateEscrowSrc",
            Self::CreateEscrowDst { .. } => "CreateEscrowDst",
            Self::AddressQuery { .. } => "AddressQuery",
            Self::AddressResp { .. } => "AddressResp",
            Self::ValidatedFill { .. } => "ValidatedFill",
            Self::FundEscrow => "FundEscrow",
            Self::WithdrawPriv { .. } => "WithdrawPriv",
            Self::WithdrawPub { .. } => "WithdrawPub",
            Self::CancelPriv => "CancelPriv",
            Self::CancelPub => "CancelPub",
            Self::RescueFunds { .. } => "RescueFunds",
            Self::Deposit => "Deposit",
            Self::DepositFor { .. } => "DepositFor",
            Self::TokenTransfer { .. } => "TokenTransfer",
            Self::Withdraw { .. } => "Withdraw",
            Self::WithdrawTo { .. } => "WithdrawTo",
            Self::GatherFees { .. } => "GatherFees",
            Self::RegisterFactory { .. } => "RegisterFactory",
            Self::GrantCredit { .. } => "GrantCredit",
            Self::RevokeCredit { .. } => "RevokeCredit",
            Self::ChargeFee { .. } => "ChargeFee",
            Self::AvailCreditRequest { .. } => "AvailCreditRequest",
            Self::CreditReport { .. } => "CreditReport",
            Self::IncreaseCredit { .. } => "IncreaseCredit",
            Self::DecreaseCredit { .. } => "DecreaseCredit",
            Self::AvailCreditQuery { .. } => "AvailCreditQuery",
            Self::AvailCreditResp { .. } => "AvailCreditResp",
            Self::CreditIncreased { .. } => "CreditIncreased",
            Self::CreditDecreased { .. } => "CreditDecreased",
            Self::FeeCharged { .. } => "FeeCharged",
            Self::InternalDeposit { .. } => "InternalDeposit",
            Self::InternalDepositSuccess { .. } => "InternalDepositSuccess",
            Self::InternalWithdraw { .. } => "InternalWithdraw",
            Self::InternalWithdrawSuccess { .. } => "InternalWithdrawSuccess",
            Self::InternalIncreaseCredit { .. } => "InternalIncreaseCredit",
            Self::InternalDecreaseCredit { .. } => "InternalDecreaseCredit",
            Self::InternalChargeFee { .. } => "InternalChargeFee",
            Self::InternalGatherFee { .. } => "InternalGatherFee",
            Self::InternalFeeCollected { .. } => "InternalFeeCollected",
            Self::InternalCreditQuery { .. } => "InternalCreditQuery",
            Self::InternalCreditResponse { .. } => "InternalCreditResponse",
            Self::InternalCreditIncreased { .. } => "InternalCreditIncreased",
            Self::InternalCreditDecreased { .. } => "InternalCreditDecreased",
            Self::InternalFeeCharged { .. } => "InternalFeeCharged",
            Self::TakerInteraction { .. } => "TakerInteraction",
            Self::TakerInteractionAccepted { .. } => "TakerInteractionAccepted",
        }
    }
}
