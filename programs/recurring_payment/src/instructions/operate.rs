use anchor_lang::prelude::*;

use crate::error::PaymentError;
use crate::ledger::{address_from_public_key, AccountInfoLedger, Ledger, SysvarClock};
use crate::operations::{Invocation, Operation, OperationContext, Transition};
use crate::utils::slot::SlotClock;

// NOTE: the contract handlers live in `src/lib.rs` and delegate here with the
// remaining accounts slice, which sidesteps Anchor `Context` lifetime
// invariance across modules.

/// Run `operation` for `caller` against the ledger entries in `window`.
///
/// Every rejected check is logged; the first one becomes the instruction error.
pub fn run_operation<'info>(
    caller: &Signer<'info>,
    window: &[AccountInfo<'info>],
    request_id: u64,
    operation: &Operation,
) -> Result<()> {
    let clock = SysvarClock;
    let slots = SlotClock::default();
    let ctx = OperationContext::new(
        Invocation {
            caller: caller.key(),
            request_id,
        },
        &clock,
        &slots,
    );
    let mut ledger = AccountInfoLedger::new(window);
    operation.prepare(&ctx, &mut ledger)?;

    if let Err(errors) = operation.apply(&ctx, &mut ledger) {
        for e in &errors {
            msg!("{}: {}", operation.name(), e);
        }
        return Err(errors
            .into_iter()
            .next()
            .map(Error::from)
            .unwrap_or_else(|| PaymentError::LedgerUnavailable.into()));
    }

    let contract_public_key = operation.contract_public_key();
    let state = ledger
        .get_or_default(&address_from_public_key(&contract_public_key))?
        .contract()
        .map(|c| c.state.name().to_string())
        .unwrap_or_default();
    emit!(OperationApplied {
        request_id,
        operation: operation.name().to_string(),
        caller: caller.key(),
        contract_public_key,
        state,
    });

    Ok(())
}

#[derive(Accounts)]
pub struct Operate<'info> {
    pub caller: Signer<'info>,
}

#[event]
pub struct OperationApplied {
    pub request_id: u64,
    pub operation: String,
    pub caller: Pubkey,
    pub contract_public_key: Pubkey,
    /// Contract state after the operation.
    pub state: String,
}
