use std::collections::BTreeMap;

use anchor_lang::prelude::*;

use crate::error::PaymentError;
use crate::ledger::Ledger;
use crate::state::{LedgerAccount, LedgerEntry};

/// Ledger over a window of `LedgerEntry` accounts passed to an instruction.
///
/// Addresses outside the window read as absent and cannot be written.
pub struct AccountInfoLedger<'a, 'info> {
    window: &'a [AccountInfo<'info>],
    index: BTreeMap<Pubkey, usize>,
}

impl<'a, 'info> AccountInfoLedger<'a, 'info> {
    pub fn new(window: &'a [AccountInfo<'info>]) -> Self {
        Self {
            window,
            index: BTreeMap::new(),
        }
    }

    fn lookup(&self, address: &Pubkey) -> Option<&'a AccountInfo<'info>> {
        match self.index.get(address) {
            Some(&i) => self.window.get(i),
            None => self.window.iter().find(|ai| ai.key == address),
        }
    }
}

impl<'a, 'info> Ledger for AccountInfoLedger<'a, 'info> {
    fn get(&self, address: &Pubkey) -> std::result::Result<Option<LedgerAccount>, PaymentError> {
        let Some(ai) = self.lookup(address) else {
            return Ok(None);
        };
        if ai.owner != &crate::ID || ai.data_is_empty() {
            return Ok(None);
        }
        let data = ai
            .try_borrow_data()
            .map_err(|_| PaymentError::LedgerUnavailable)?;
        let entry = LedgerEntry::try_deserialize(&mut &data[..])
            .map_err(|_| PaymentError::LedgerUnavailable)?;
        Ok(Some(entry.account))
    }

    fn set(&mut self, account: LedgerAccount) -> std::result::Result<(), PaymentError> {
        let ai = self
            .lookup(&account.address)
            .ok_or(PaymentError::LedgerUnavailable)?;
        if ai.owner != &crate::ID || !ai.is_writable {
            return Err(PaymentError::LedgerUnavailable);
        }
        let mut data = ai
            .try_borrow_mut_data()
            .map_err(|_| PaymentError::LedgerUnavailable)?;
        let mut cursor: &mut [u8] = &mut data[..];
        LedgerEntry { account }
            .try_serialize(&mut cursor)
            .map_err(|_| PaymentError::LedgerUnavailable)
    }

    fn cache(&mut self, addresses: &[Pubkey]) -> std::result::Result<(), PaymentError> {
        for address in addresses {
            if let Some(i) = self.window.iter().position(|ai| ai.key == address) {
                self.index.insert(*address, i);
            }
        }
        Ok(())
    }
}
