use anchor_lang::prelude::*;

use crate::constants::MAX_DATA_LEN;
use crate::error::{PaymentError, TransitionResult};
use crate::ledger::{address_from_public_key, Ledger};
use crate::operations::{
    commit, credit, debit, load_contract, load_party, OperationContext, Transition,
};
use crate::state::ContractState;
use crate::utils::settlement::installments_value;

/// Sender deposits `units` installments into escrow. The first deposit
/// activates the contract and anchors the slot clock.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct FundContract {
    pub contract_public_key: Pubkey,
    pub units: u16,
    pub data: String,
}

impl Transition for FundContract {
    fn touched_addresses(&self, ctx: &OperationContext) -> Vec<Pubkey> {
        vec![
            address_from_public_key(&ctx.caller()),
            address_from_public_key(&self.contract_public_key),
        ]
    }

    fn apply(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult {
        let mut v = ctx.violations();
        v.check(
            self.units >= 1,
            PaymentError::SchemaViolation,
            "units",
            self.units,
            ">= 1",
        );
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

        let mut v = ctx.violations();
        v.check(
            caller == contract.sender,
            PaymentError::Unauthorized,
            "caller",
            caller,
            contract.sender,
        );
        v.check(
            matches!(contract.state, ContractState::Accepted | ContractState::Active),
            PaymentError::InvalidState,
            "state",
            contract.state,
            format!("{} | {}", ContractState::Active, ContractState::Accepted),
        );
        if contract.state == ContractState::Accepted && schedule.prepaid_minimum > 0 {
            v.check(
                self.units >= schedule.prepaid_minimum,
                PaymentError::ScheduleViolation,
                "units",
                self.units,
                format!(">= {}", schedule.prepaid_minimum),
            );
        }

        let remaining = contract.remaining_installments();
        v.check(
            self.units <= remaining,
            PaymentError::ScheduleViolation,
            "units",
            self.units,
            format!("<= {remaining}"),
        );

        let cost = installments_value(self.units, schedule.amount_per_installment)
            .map_err(|e| ctx.fail(e))?;
        let mut sender = load_party(ctx, ledger, &caller)?;
        v.check(
            sender.balance >= cost,
            PaymentError::InsufficientFunds,
            "balance",
            sender.balance,
            format!(">= {cost}"),
        );
        v.finish()?;

        let mut next = contract.clone();
        if contract.state == ContractState::Accepted {
            next.state = ContractState::Active;
            next.start_ts = ctx.now()?;
        }
        next.funding_rounds = contract
            .funding_rounds
            .checked_add(1)
            .ok_or_else(|| ctx.fail(PaymentError::MathOverflow))?;

        debit(ctx, &mut sender, cost)?;
        let mut escrow_account = loaded.store(next, loaded.escrow());
        credit(ctx, &mut escrow_account, cost)?;
        let escrow = escrow_account.balance;
        commit(ctx, ledger, vec![escrow_account, sender])?;

        msg!(
            "fund: contract {} escrow {} after {} units",
            self.contract_public_key,
            escrow,
            self.units
        );
        Ok(())
    }

    fn undo(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult {
        let loaded = load_contract(ctx, ledger, &self.contract_public_key)?;
        let contract = &loaded.contract;
        let cost = installments_value(self.units, contract.schedule.amount_per_installment)
            .map_err(|e| ctx.fail(e))?;
        let mut sender = load_party(ctx, ledger, &contract.sender)?;

        let mut prev = contract.clone();
        prev.funding_rounds = contract
            .funding_rounds
            .checked_sub(1)
            .ok_or_else(|| ctx.fail(PaymentError::SequenceMismatch))?;
        if prev.funding_rounds == 0 && prev.installments_paid == 0 {
            prev.state = ContractState::Accepted;
            prev.start_ts = prev.accepted_ts;
        }

        let mut escrow_account = loaded.store(prev, loaded.escrow());
        debit(ctx, &mut escrow_account, cost)?;
        credit(ctx, &mut sender, cost)?;
        commit(ctx, ledger, vec![escrow_account, sender])
    }
}
