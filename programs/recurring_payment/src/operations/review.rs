use anchor_lang::prelude::*;

use crate::constants::MAX_DATA_LEN;
use crate::error::{PaymentError, TransitionResult, Violations};
use crate::ledger::{address_from_public_key, Ledger};
use crate::operations::{commit, load_contract, OperationContext, Transition};
use crate::state::{ContractState, ScheduleOverride};

/// Accept the pending terms, or counter-propose new ones.
///
/// A counter-proposal restates in `unit_old` the current value of every
/// field it changes in `unit`; stale restatements are rejected.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReviewContract {
    pub contract_public_key: Pubkey,
    pub accept: bool,
    /// When given, must equal the contract's current revision.
    pub revision: Option<u32>,
    pub unit: Option<ScheduleOverride>,
    pub unit_old: Option<ScheduleOverride>,
    pub data: String,
}

impl ReviewContract {
    fn validate(&self, ctx: &OperationContext) -> Violations {
        let mut v = ctx.violations();
        v.check(
            self.data.len() <= MAX_DATA_LEN,
            PaymentError::SchemaViolation,
            "data",
            self.data.len(),
            format!("<= {MAX_DATA_LEN} bytes"),
        );

        if self.accept {
            v.check(
                self.unit.is_none() && self.unit_old.is_none(),
                PaymentError::SchemaViolation,
                "accept",
                "unit or unit_old present",
                "neither unit nor unit_old when accepting",
            );
            return v;
        }

        match (&self.unit, &self.unit_old) {
            (Some(unit), Some(unit_old)) => {
                let keys = field_names(unit);
                let old_keys = field_names(unit_old);
                v.check(
                    keys == old_keys,
                    PaymentError::SchemaViolation,
                    "unit",
                    &keys,
                    &old_keys,
                );
                v.check(
                    !unit.is_empty(),
                    PaymentError::SchemaViolation,
                    "unit",
                    "no fields",
                    "at least one field",
                );
                if let Some(count) = unit.period_count {
                    v.check(
                        count >= 1,
                        PaymentError::SchemaViolation,
                        "unit.period_count",
                        count,
                        ">= 1",
                    );
                }
                if let Some(prepaid) = unit.prepaid_minimum {
                    v.check(
                        prepaid >= 1,
                        PaymentError::SchemaViolation,
                        "unit.prepaid_minimum",
                        prepaid,
                        ">= 1",
                    );
                }
            }
            (unit, unit_old) => {
                if unit.is_none() {
                    v.push(PaymentError::SchemaViolation, "unit", "missing", "present");
                }
                if unit_old.is_none() {
                    v.push(PaymentError::SchemaViolation, "unit_old", "missing", "present");
                }
            }
        }
        v
    }
}

fn field_names(o: &ScheduleOverride) -> String {
    o.fields()
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(",")
}

impl Transition for ReviewContract {
    fn touched_addresses(&self, ctx: &OperationContext) -> Vec<Pubkey> {
        vec![
            address_from_public_key(&ctx.caller()),
            address_from_public_key(&self.contract_public_key),
        ]
    }

    fn apply(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult {
        self.validate(ctx).finish()?;
        let loaded = load_contract(ctx, ledger, &self.contract_public_key)?;
        let contract = &loaded.contract;
        let caller = ctx.caller();

        let mut v = ctx.violations();
        v.check(
            contract.is_party(&caller),
            PaymentError::Unauthorized,
            "caller",
            caller,
            format!("{} | {}", contract.recipient, contract.sender),
        );
        v.check(
            contract.state.is_review(),
            PaymentError::InvalidState,
            "state",
            contract.state,
            format!("{} | {}", ContractState::SenderReview, ContractState::RecipientReview),
        );
        if let Some(reviewer) = contract.reviewer() {
            v.check(
                reviewer == caller,
                PaymentError::Unauthorized,
                "caller",
                caller,
                reviewer,
            );
        }
        if let Some(revision) = self.revision {
            v.check(
                revision == contract.revision,
                PaymentError::SequenceMismatch,
                "revision",
                revision,
                contract.revision,
            );
        }
        if let Some(unit_old) = &self.unit_old {
            for (field, given, current) in unit_old.mismatches(&contract.schedule) {
                v.push(
                    PaymentError::SequenceMismatch,
                    &format!("unit_old.{}", field.name()),
                    given,
                    current,
                );
            }
        }
        v.finish()?;

        let mut next = contract.clone();
        if self.accept {
            let now = ctx.now()?;
            next.state = ContractState::Accepted;
            next.start_ts = now;
            next.accepted_ts = now;
        } else if let Some(unit) = &self.unit {
            next.schedule = unit.apply_to(&contract.schedule);
            next.revision = contract
                .revision
                .checked_add(1)
                .ok_or_else(|| ctx.fail(PaymentError::MathOverflow))?;
            next.state = if caller == contract.sender {
                ContractState::RecipientReview
            } else {
                ContractState::SenderReview
            };
        }
        let state = next.state;
        let revision = next.revision;
        let escrow = loaded.escrow();
        commit(ctx, ledger, vec![loaded.store(next, escrow)])?;

        msg!(
            "review: contract {} revision {} -> {}",
            self.contract_public_key,
            revision,
            state
        );
        Ok(())
    }

    fn undo(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult {
        let loaded = load_contract(ctx, ledger, &self.contract_public_key)?;
        let contract = &loaded.contract;
        let caller = ctx.caller();

        let mut prev = contract.clone();
        prev.state = contract.review_turn_of(&caller);
        if self.accept {
            if contract.state != ContractState::Accepted {
                return Err(ctx.fail(PaymentError::InvalidState));
            }
            prev.start_ts = 0;
            prev.accepted_ts = 0;
        } else if let Some(unit_old) = &self.unit_old {
            prev.schedule = unit_old.apply_to(&contract.schedule);
            prev.revision = contract
                .revision
                .checked_sub(1)
                .ok_or_else(|| ctx.fail(PaymentError::SequenceMismatch))?;
        }
        let escrow = loaded.escrow();
        commit(ctx, ledger, vec![loaded.store(prev, escrow)])
    }
}
