use anchor_lang::prelude::*;

use crate::constants::MAX_FOREIGN_PAYLOAD_LEN;
use crate::state::Contract;

/// Module data attached to a ledger account.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum AccountPayload {
    #[default]
    Empty,
    RecurringPayment(Contract),
    /// Data owned by another module of the host ledger.
    Foreign(Vec<u8>),
}

impl AccountPayload {
    pub const SIZE: usize = 1 + max_usize(Contract::SIZE, 4 + MAX_FOREIGN_PAYLOAD_LEN);
}

const fn max_usize(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Key-addressed account of the ledger the state machine runs against.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerAccount {
    pub address: Pubkey,
    pub public_key: Option<Pubkey>,
    pub balance: u64,
    pub payload: AccountPayload,
}

impl LedgerAccount {
    pub const SIZE: usize =
        32 +     // address
        1 + 32 + // public_key
        8 +      // balance
        AccountPayload::SIZE;

    /// Zero-value account returned for absent addresses.
    pub fn empty(address: Pubkey) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    pub fn contract(&self) -> Option<&Contract> {
        match &self.payload {
            AccountPayload::RecurringPayment(c) => Some(c),
            _ => None,
        }
    }

    /// Nothing stored: no balance and no module data.
    pub fn is_blank(&self) -> bool {
        self.balance == 0 && self.payload == AccountPayload::Empty
    }
}

/// On-chain home of one [`LedgerAccount`], PDA `["ledger", public_key]`.
#[account]
pub struct LedgerEntry {
    pub account: LedgerAccount,
}

impl LedgerEntry {
    pub const SIZE: usize = LedgerAccount::SIZE;
}

/// Singleton configuration of the on-chain ledger.
#[account]
pub struct LedgerConfig {
    /// Token mint backing all ledger balances.
    pub mint: Pubkey,
    /// Authority that initialized the ledger.
    pub admin: Pubkey,
    /// Tokens currently held by the vault on behalf of ledger accounts.
    pub total_deposited: u64,
}

impl LedgerConfig {
    pub const SIZE: usize =
        32 + // mint
        32 + // admin
        8;   // total_deposited
}
