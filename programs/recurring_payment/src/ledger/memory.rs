use std::collections::BTreeMap;

use anchor_lang::prelude::*;

use crate::error::PaymentError;
use crate::ledger::{address_from_public_key, Ledger};
use crate::state::LedgerAccount;

/// In-process ledger for hosts that keep accounts in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    accounts: BTreeMap<Pubkey, LedgerAccount>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a funded, payload-free account for `public_key`; returns its address.
    pub fn open(&mut self, public_key: &Pubkey, balance: u64) -> Pubkey {
        let address = address_from_public_key(public_key);
        self.accounts.insert(
            address,
            LedgerAccount {
                address,
                public_key: Some(*public_key),
                balance,
                ..Default::default()
            },
        );
        address
    }

    /// Balance of the account owned by `public_key`, zero if absent.
    pub fn balance_of(&self, public_key: &Pubkey) -> u64 {
        self.accounts
            .get(&address_from_public_key(public_key))
            .map(|a| a.balance)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Ledger for MemoryLedger {
    fn get(&self, address: &Pubkey) -> std::result::Result<Option<LedgerAccount>, PaymentError> {
        Ok(self.accounts.get(address).cloned())
    }

    fn set(&mut self, account: LedgerAccount) -> std::result::Result<(), PaymentError> {
        self.accounts.insert(account.address, account);
        Ok(())
    }
}
