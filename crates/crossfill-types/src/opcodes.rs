//! 32-bit operation codes, one per message variant.
//!
//! Fee-bank codes match the values deployed clients already emit; the rest
//! are allocated here. See [`Message::opcode`](crate::Message::opcode).

// --- Escrow factory / escrow ---
pub const DEPLOY: u32 = 0x0d3a_11e0;
pub const CREATE_ESCROW_SRC: u32 = 0x3c1e_5a01;
pub const CREATE_ESCROW_DST: u32 = 0x3c1e_5a02;
pub const FUND_ESCROW: u32 = 0x3c1e_5a03;
pub const WITHDRAW_PRIV: u32 = 0x3c1e_5a10;
pub const WITHDRAW_PUB: u32 = 0x3c1e_5a11;
pub const CANCEL_PRIV: u32 = 0x3c1e_5a12;
pub const CANCEL_PUB: u32 = 0x3c1e_5a13;
pub const ADDRESS_QUERY: u32 = 0x3c1e_5a20;
pub const ADDRESS_RESP: u32 = 0x3c1e_5a21;
pub const VALIDATED_FILL: u32 = 0x3c1e_5a30;

// --- Fee bank (external) ---
pub const DEPOSIT: u32 = 0x4a25_ce37;
pub const DEPOSIT_FOR: u32 = 0x2666_dfa5;
pub const WITHDRAW: u32 = 0xd111_285d;
pub const WITHDRAW_TO: u32 = 0x5ccc_41b3;
pub const GATHER_FEES: u32 = 0x1d59_1c7b;
pub const RESCUE_FUNDS: u32 = 0xd8d5_619d;
pub const TOKEN_TRANSFER: u32 = 0x7362_d09c;
pub const REGISTER_FACTORY: u32 = 0x51e0_7a01;
pub const GRANT_CREDIT: u32 = 0x51e0_7a02;
pub const REVOKE_CREDIT: u32 = 0x51e0_7a03;
pub const CHARGE_FEE: u32 = 0x51e0_7a04;
pub const AVAIL_CREDIT_REQUEST: u32 = 0x51e0_7a05;
pub const CREDIT_REPORT: u32 = 0x51e0_7a06;

// --- Charger ---
pub const INCREASE_CREDIT: u32 = 0xb895_f65f;
pub const DECREASE_CREDIT: u32 = 0x260e_f7da;
pub const AVAIL_CREDIT_QUERY: u32 = 0x1504_7436;
pub const AVAIL_CREDIT_RESP: u32 = 0x5ee2_eed5;
pub const CREDIT_INCREASED: u32 = 0x9a5d_3c80;
pub const CREDIT_DECREASED: u32 = 0x4b8e_2a92;
pub const FEE_CHARGED: u32 = 0x6f1e_8b3d;

// --- Fee account (internal) ---
pub const INTERNAL_DEPOSIT: u32 = 0x3f4d_39a6;
pub const INTERNAL_WITHDRAW: u32 = 0x8e2c_7b15;
pub const INTERNAL_GATHER_FEE: u32 = 0x9a4f_2d81;
pub const INTERNAL_FEE_COLLECTED: u32 = 0x7c5e_9f3a;
pub const INTERNAL_DEPOSIT_SUCCESS: u32 = 0xb2d4_e837;
pub const INTERNAL_WITHDRAW_SUCCESS: u32 = 0xb2d4_e838;
pub const INTERNAL_INCREASE_CREDIT: u32 = 0xa3f7_d218;
pub const INTERNAL_DECREASE_CREDIT: u32 = 0xc5e9_b3f2;
pub const INTERNAL_CREDIT_QUERY: u32 = 0x7d4a_8c91;
pub const INTERNAL_CREDIT_RESPONSE: u32 = 0x8f3b_2e5a;
pub const INTERNAL_CHARGE_FEE: u32 = 0x2e7c_9f4d;
pub const INTERNAL_CREDIT_INCREASED: u32 = 0x9a5d_3c7f;
pub const INTERNAL_CREDIT_DECREASED: u32 = 0x4b8e_2a91;
pub const INTERNAL_FEE_CHARGED: u32 = 0x6f1e_8b3c;

// --- Merkle invalidator ---
pub const TAKER_INTERACTION: u32 = 0x6a7e_0001;
pub const TAKER_INTERACTION_ACCEPTED: u32 = 0x6a7e_0002;
