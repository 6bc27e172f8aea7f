use anchor_lang::prelude::*;

use crate::constants::MAX_DATA_LEN;
use crate::error::{PaymentError, TransitionResult};
use crate::ledger::{address_from_public_key, Ledger};
use crate::operations::{
    commit, credit, debit, load_contract, load_party, OperationContext, Transition,
};
use crate::state::ContractState;
use crate::utils::settlement::{installments_value, release_matured, released_since};

/// Recipient claims every matured installment, starting at
/// `installment_index` (which must be the next unpaid one).
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RequestPayment {
    pub contract_public_key: Pubkey,
    /// 1-based index of the next unpaid installment.
    pub installment_index: u16,
    pub data: String,
}

impl Transition for RequestPayment {
    fn touched_addresses(&self, ctx: &OperationContext) -> Vec<Pubkey> {
        vec![
            address_from_public_key(&ctx.caller()),
            address_from_public_key(&self.contract_public_key),
        ]
    }

    fn apply(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult {
        let mut v = ctx.violations();
        v.check(
            self.data.len() <= MAX_DATA_LEN,
            PaymentError::SchemaViolation,
            "data",
            self.data.len(),
            format!("<= {MAX_DATA_LEN} bytes"),
        );
        v.finish()?;

        let loaded = load_contract(ctx, ledger, &self.contract_public_key)?;
        let contract = &loaded.contract;
        let schedule = &contract.schedule;
        let caller = ctx.caller();
        let now = ctx.now()?;
        let escrow = loaded.escrow();

        let mut v = ctx.violations();
        v.check(
            caller == contract.recipient,
            PaymentError::Unauthorized,
            "caller",
            caller,
            contract.recipient,
        );
        v.check(
            contract.state == ContractState::Active,
            PaymentError::InvalidState,
            "state",
            contract.state,
            ContractState::Active,
        );
        let expected_index = contract.installments_paid as u32 + 1;
        v.check(
            self.installment_index as u32 == expected_index,
            PaymentError::SequenceMismatch,
            "installment_index",
            self.installment_index,
            expected_index,
        );
        let unlock = ctx
            .slots
            .next_unlock_time(contract.start_ts, schedule, contract.installments_paid)
            .map_err(|e| ctx.fail(e))?;
        v.check(
            unlock <= now,
            PaymentError::ScheduleViolation,
            "timestamp",
            now,
            format!(">= {unlock}"),
        );
        v.check(
            escrow >= schedule.amount_per_installment,
            PaymentError::InsufficientFunds,
            "escrow",
            escrow,
            format!(">= {}", schedule.amount_per_installment),
        );
        v.finish()?;

        let available = ctx
            .slots
            .available_installments(contract.start_ts, now, schedule, contract.installments_paid)
            .map_err(|e| ctx.fail(e))?;
        let release = release_matured(
            available,
            escrow,
            schedule.amount_per_installment,
            contract.remaining_installments(),
        )
        .map_err(|e| ctx.fail(e))?;

        let mut next = contract.clone();
        next.installments_paid = contract
            .installments_paid
            .checked_add(release.installments)
            .ok_or_else(|| ctx.fail(PaymentError::MathOverflow))?;
        if next.installments_paid >= schedule.total_installments {
            next.state = ContractState::Ended;
        }
        let paid = next.installments_paid;
        let state = next.state;

        let mut recipient = load_party(ctx, ledger, &caller)?;
        let mut escrow_account = loaded.store(next, escrow);
        debit(ctx, &mut escrow_account, release.amount)?;
        credit(ctx, &mut recipient, release.amount)?;
        commit(ctx, ledger, vec![escrow_account, recipient])?;

        msg!(
            "request_payment: contract {} released {} ({} paid, {})",
            self.contract_public_key,
            release.amount,
            paid,
            state
        );
        Ok(())
    }

    fn undo(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult {
        let loaded = load_contract(ctx, ledger, &self.contract_public_key)?;
        let contract = &loaded.contract;
        let reversed = released_since(contract.installments_paid, self.installment_index)
            .map_err(|e| ctx.fail(e))?;
        let amount = installments_value(reversed, contract.schedule.amount_per_installment)
            .map_err(|e| ctx.fail(e))?;
        let mut recipient = load_party(ctx, ledger, &contract.recipient)?;

        let mut prev = contract.clone();
        prev.installments_paid = self.installment_index - 1;
        prev.state = ContractState::Active;

        let mut escrow_account = loaded.store(prev, loaded.escrow());
        credit(ctx, &mut escrow_account, amount)?;
        debit(ctx, &mut recipient, amount)?;
        commit(ctx, ledger, vec![escrow_account, recipient])
    }
}
