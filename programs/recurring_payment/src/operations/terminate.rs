use anchor_lang::prelude::*;

use crate::constants::MAX_DATA_LEN;
use crate::error::{PaymentError, TransitionResult};
use crate::ledger::{address_from_public_key, Ledger};
use crate::operations::{
    commit, credit, debit, load_contract, load_party, OperationContext, Transition,
};
use crate::state::ContractState;
use crate::utils::settlement::{released_since, replay_termination, settle_termination};

/// Either party ends an active contract early. Matured installments are paid
/// out first, then the remaining escrow is split by the termination fee.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TerminateContract {
    pub contract_public_key: Pubkey,
    /// The other party of the contract.
    pub peer_public_key: Pubkey,
    /// 1-based index of the next unpaid installment.
    pub installment_index: u16,
    pub data: String,
}

impl Transition for TerminateContract {
    fn touched_addresses(&self, ctx: &OperationContext) -> Vec<Pubkey> {
        vec![
            address_from_public_key(&ctx.caller()),
            address_from_public_key(&self.contract_public_key),
            address_from_public_key(&self.peer_public_key),
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
        let escrow = loaded.escrow();

        let mut v = ctx.violations();
        let parties = format!("{} | {}", contract.recipient, contract.sender);
        v.check(
            contract.is_party(&caller),
            PaymentError::Unauthorized,
            "caller",
            caller,
            &parties,
        );
        v.check(
            contract.peer_of(&caller) == Some(self.peer_public_key),
            PaymentError::Unauthorized,
            "peer_public_key",
            self.peer_public_key,
            contract
                .peer_of(&caller)
                .map(|k| k.to_string())
                .unwrap_or(parties),
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
        v.finish()?;

        let now = ctx.now()?;
        let available = ctx
            .slots
            .available_installments(contract.start_ts, now, schedule, contract.installments_paid)
            .map_err(|e| ctx.fail(e))?;
        let settlement = settle_termination(available, escrow, schedule, contract.installments_paid)
            .map_err(|e| ctx.fail(e))?;

        let mut next = contract.clone();
        next.installments_paid = contract
            .installments_paid
            .checked_add(settlement.catch_up.installments)
            .ok_or_else(|| ctx.fail(PaymentError::MathOverflow))?;
        next.last_escrow_snapshot = escrow;
        next.state = if caller == contract.recipient {
            ContractState::TerminatedRecipient
        } else {
            ContractState::TerminatedSender
        };
        let state = next.state;

        let to_recipient = settlement.to_recipient().map_err(|e| ctx.fail(e))?;
        let mut sender = load_party(ctx, ledger, &contract.sender)?;
        let mut recipient = load_party(ctx, ledger, &contract.recipient)?;
        credit(ctx, &mut recipient, to_recipient)?;
        credit(ctx, &mut sender, settlement.to_sender())?;
        let escrow_account = loaded.store(next, 0);
        commit(ctx, ledger, vec![escrow_account, sender, recipient])?;

        msg!(
            "terminate: contract {} {} (recipient {}, sender {})",
            self.contract_public_key,
            state,
            to_recipient,
            settlement.to_sender()
        );
        Ok(())
    }

    fn undo(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult {
        let loaded = load_contract(ctx, ledger, &self.contract_public_key)?;
        let contract = &loaded.contract;
        if !matches!(
            contract.state,
            ContractState::TerminatedSender | ContractState::TerminatedRecipient
        ) {
            return Err(ctx.fail(PaymentError::InvalidState));
        }

        let snapshot = contract.last_escrow_snapshot;
        let caught_up = released_since(contract.installments_paid, self.installment_index)
            .map_err(|e| ctx.fail(e))?;
        let settlement =
            replay_termination(snapshot, caught_up, &contract.schedule).map_err(|e| ctx.fail(e))?;
        let to_recipient = settlement.to_recipient().map_err(|e| ctx.fail(e))?;

        let mut sender = load_party(ctx, ledger, &contract.sender)?;
        let mut recipient = load_party(ctx, ledger, &contract.recipient)?;
        debit(ctx, &mut recipient, to_recipient)?;
        debit(ctx, &mut sender, settlement.to_sender())?;

        let mut prev = contract.clone();
        prev.installments_paid = self.installment_index - 1;
        prev.last_escrow_snapshot = 0;
        prev.state = ContractState::Active;
        let escrow_account = loaded.store(prev, snapshot);
        commit(ctx, ledger, vec![escrow_account, sender, recipient])
    }
}
