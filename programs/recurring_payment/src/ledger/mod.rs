//! Capabilities the state machine runs against: a key-addressed account store
//! and a clock.

use anchor_lang::prelude::*;

use crate::constants::LEDGER_SEED;
use crate::error::PaymentError;
use crate::state::LedgerAccount;

pub mod accounts;
pub mod memory;

pub use accounts::AccountInfoLedger;
pub use memory::MemoryLedger;

/// Ledger address owned by `public_key`: the program-derived address for
/// seeds `["ledger", public_key]`.
pub fn address_from_public_key(public_key: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[LEDGER_SEED, public_key.as_ref()], &crate::ID).0
}

/// Key-addressed account store with read-your-writes semantics within one
/// transition.
pub trait Ledger {
    /// `None` when nothing is stored at `address`.
    fn get(&self, address: &Pubkey) -> std::result::Result<Option<LedgerAccount>, PaymentError>;

    fn set(&mut self, account: LedgerAccount) -> std::result::Result<(), PaymentError>;

    /// Pre-fetch hint; has no semantic effect.
    fn cache(&mut self, _addresses: &[Pubkey]) -> std::result::Result<(), PaymentError> {
        Ok(())
    }

    /// Zero-value account when nothing is stored at `address`.
    fn get_or_default(&self, address: &Pubkey) -> std::result::Result<LedgerAccount, PaymentError> {
        Ok(self
            .get(address)?
            .unwrap_or_else(|| LedgerAccount::empty(*address)))
    }
}

/// Reference time of the block an operation is applied in.
pub trait LedgerClock {
    /// Unix seconds.
    fn current_time(&self) -> std::result::Result<i64, PaymentError>;
}

/// Clock pinned to one timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl LedgerClock for FixedClock {
    fn current_time(&self) -> std::result::Result<i64, PaymentError> {
        Ok(self.0)
    }
}

/// Clock backed by the Solana `Clock` sysvar.
#[derive(Clone, Copy, Debug, Default)]
pub struct SysvarClock;

impl LedgerClock for SysvarClock {
    fn current_time(&self) -> std::result::Result<i64, PaymentError> {
        Clock::get()
            .map(|c| c.unix_timestamp)
            .map_err(|_| PaymentError::LedgerUnavailable)
    }
}
