use anchor_lang::prelude::*;

use crate::constants::{MAX_DATA_LEN, MAX_TITLE_LEN};
use crate::error::{PaymentError, TransitionResult, Violations};
use crate::ledger::{address_from_public_key, Ledger};
use crate::operations::{commit, load_contract, OperationContext, Transition};
use crate::state::{AccountPayload, Contract, ContractState, LedgerAccount, UnitSchedule};
use crate::utils::identity::{self, FoundingTerms};

/// Propose a new contract. The other party reviews first.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateContract {
    /// When given, must equal the key derived from the founding terms.
    pub contract_public_key: Option<Pubkey>,
    pub schedule: UnitSchedule,
    pub sender: Pubkey,
    pub recipient: Pubkey,
    pub title: String,
    pub timestamp: u32,
    pub data: String,
}

impl CreateContract {
    pub fn terms(&self) -> FoundingTerms<'_> {
        FoundingTerms {
            recipient: &self.recipient,
            sender: &self.sender,
            title: &self.title,
            schedule: &self.schedule,
            data: &self.data,
            timestamp: self.timestamp,
        }
    }

    pub fn contract_public_key(&self) -> Pubkey {
        identity::contract_public_key(&self.terms())
    }

    pub fn contract_address(&self) -> Pubkey {
        address_from_public_key(&self.contract_public_key())
    }

    fn validate(&self, ctx: &OperationContext) -> Violations {
        let mut v = ctx.violations();
        check_schedule_ranges(&mut v, &self.schedule);
        v.check(
            self.title.len() <= MAX_TITLE_LEN,
            PaymentError::SchemaViolation,
            "title",
            self.title.len(),
            format!("<= {MAX_TITLE_LEN} bytes"),
        );
        v.check(
            self.data.len() <= MAX_DATA_LEN,
            PaymentError::SchemaViolation,
            "data",
            self.data.len(),
            format!("<= {MAX_DATA_LEN} bytes"),
        );
        v.check(
            self.sender != Pubkey::default() && self.recipient != Pubkey::default(),
            PaymentError::SchemaViolation,
            "sender | recipient",
            format!("{} | {}", self.sender, self.recipient),
            "non-default keys",
        );
        v.check(
            self.sender != self.recipient,
            PaymentError::SchemaViolation,
            "recipient",
            self.recipient,
            "a key other than sender",
        );

        let caller = ctx.caller();
        v.check(
            caller == self.sender || caller == self.recipient,
            PaymentError::Unauthorized,
            "caller",
            caller,
            format!("{} | {}", self.recipient, self.sender),
        );

        if let Some(given) = self.contract_public_key {
            let derived = self.contract_public_key();
            v.check(
                given == derived,
                PaymentError::SchemaViolation,
                "contract_public_key",
                given,
                derived,
            );
        }
        v
    }
}

/// Numeric ranges every schedule must satisfy.
pub(crate) fn check_schedule_ranges(v: &mut Violations, schedule: &UnitSchedule) {
    v.check(
        schedule.period_count >= 1,
        PaymentError::SchemaViolation,
        "schedule.period_count",
        schedule.period_count,
        ">= 1",
    );
    v.check(
        schedule.prepaid_minimum >= 1,
        PaymentError::SchemaViolation,
        "schedule.prepaid_minimum",
        schedule.prepaid_minimum,
        ">= 1",
    );
}

impl Transition for CreateContract {
    fn touched_addresses(&self, ctx: &OperationContext) -> Vec<Pubkey> {
        vec![address_from_public_key(&ctx.caller()), self.contract_address()]
    }

    fn apply(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult {
        let mut v = self.validate(ctx);
        let public_key = self.contract_public_key();
        let address = address_from_public_key(&public_key);

        let existing = ledger.get_or_default(&address).map_err(|e| ctx.fail(e))?;
        v.check(
            existing.is_blank(),
            PaymentError::DuplicateContract,
            "contract_public_key",
            public_key,
            "an unused address",
        );
        v.finish()?;

        let state = if ctx.caller() == self.sender {
            ContractState::RecipientReview
        } else {
            ContractState::SenderReview
        };
        let contract = Contract {
            public_key,
            state,
            schedule: self.schedule,
            sender: self.sender,
            recipient: self.recipient,
            revision: 0,
            installments_paid: 0,
            start_ts: 0,
            accepted_ts: 0,
            funding_rounds: 0,
            last_escrow_snapshot: 0,
            title: self.title.clone(),
            data: self.data.clone(),
        };
        commit(
            ctx,
            ledger,
            vec![LedgerAccount {
                address,
                public_key: Some(public_key),
                balance: 0,
                payload: AccountPayload::RecurringPayment(contract),
            }],
        )?;

        msg!("create: contract {} awaiting {}", public_key, state);
        Ok(())
    }

    fn undo(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult {
        let loaded = load_contract(ctx, ledger, &self.contract_public_key())?;
        commit(ctx, ledger, vec![LedgerAccount::empty(loaded.account.address)])
    }
}
