use anchor_lang::prelude::*;

use crate::constants::LEDGER_SEED;
use crate::error::PaymentError;
use crate::state::{ContractState, LedgerEntry};
use crate::utils::settlement::{release_matured, Release};
use crate::utils::slot::SlotClock;

pub fn handle_emit_payment_quote(
    ctx: Context<EmitPaymentQuote>,
    contract_public_key: Pubkey,
) -> Result<()> {
    let account = &ctx.accounts.contract_entry.account;
    let contract = account.contract().ok_or(PaymentError::NotAContract)?;
    let schedule = &contract.schedule;
    let slots = SlotClock::default();
    let now = Clock::get()?.unix_timestamp;

    let next_unlock_ts =
        slots.next_unlock_time(contract.start_ts, schedule, contract.installments_paid)?;
    let matured = slots.matured_installments(
        contract.start_ts,
        now,
        schedule,
        contract.installments_paid,
    )?;
    let claimable = if contract.state == ContractState::Active {
        release_matured(
            matured as i64,
            account.balance,
            schedule.amount_per_installment,
            contract.remaining_installments(),
        )?
    } else {
        Release::default()
    };

    emit!(PaymentQuote {
        contract_public_key,
        state: contract.state.name().to_string(),
        installments_paid: contract.installments_paid,
        next_unlock_ts,
        matured_installments: matured,
        claimable_installments: claimable.installments,
        claimable_amount: claimable.amount,
        escrow: account.balance,
    });

    Ok(())
}

#[derive(Accounts)]
#[instruction(contract_public_key: Pubkey)]
pub struct EmitPaymentQuote<'info> {
    #[account(
        seeds = [LEDGER_SEED, contract_public_key.as_ref()],
        bump
    )]
    pub contract_entry: Account<'info, LedgerEntry>,
}

#[event]
pub struct PaymentQuote {
    pub contract_public_key: Pubkey,
    pub state: String,
    pub installments_paid: u16,
    pub next_unlock_ts: i64,
    /// Installments matured since the last claim, before escrow limits.
    pub matured_installments: u16,
    pub claimable_installments: u16,
    pub claimable_amount: u64,
    pub escrow: u64,
}
