//! The contract state machine: five transitions, each with an exact inverse.
//!
//! Every `apply` validates and computes all writes before touching the
//! ledger; a rejected transition writes nothing. `undo` must be called with
//! the same input as the `apply` it reverses, in reverse order.

use anchor_lang::prelude::*;

use crate::error::{PaymentError, TransactionError, TransitionResult, Violations};
use crate::ledger::{address_from_public_key, Ledger, LedgerClock};
use crate::state::{Contract, LedgerAccount};
use crate::utils::slot::SlotClock;

pub mod create;
pub mod fund;
pub mod request_payment;
pub mod review;
pub mod terminate;

#[cfg(test)]
mod tests;

pub use create::CreateContract;
pub use fund::FundContract;
pub use request_payment::RequestPayment;
pub use review::ReviewContract;
pub use terminate::TerminateContract;

/// Who invoked an operation, and the request it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub caller: Pubkey,
    /// Reported back in errors only.
    pub request_id: u64,
}

/// Everything a transition reads besides the ledger.
#[derive(Clone, Copy)]
pub struct OperationContext<'a> {
    pub invocation: Invocation,
    pub clock: &'a dyn LedgerClock,
    pub slots: &'a SlotClock,
}

impl<'a> OperationContext<'a> {
    pub fn new(invocation: Invocation, clock: &'a dyn LedgerClock, slots: &'a SlotClock) -> Self {
        Self {
            invocation,
            clock,
            slots,
        }
    }

    pub fn caller(&self) -> Pubkey {
        self.invocation.caller
    }

    pub fn request_id(&self) -> u64 {
        self.invocation.request_id
    }

    pub fn violations(&self) -> Violations {
        Violations::new(self.request_id())
    }

    /// Wrap a component error as a single-entry error list.
    pub fn fail(&self, code: PaymentError) -> Vec<TransactionError> {
        vec![TransactionError::from_code(self.request_id(), code)]
    }

    pub fn now(&self) -> std::result::Result<i64, Vec<TransactionError>> {
        self.clock.current_time().map_err(|e| self.fail(e))
    }
}

/// Contract of every operation: warm the ledger, apply, and reverse.
pub trait Transition {
    /// Addresses the operation will read.
    fn touched_addresses(&self, ctx: &OperationContext) -> Vec<Pubkey>;

    fn prepare(
        &self,
        ctx: &OperationContext,
        ledger: &mut dyn Ledger,
    ) -> std::result::Result<(), PaymentError> {
        ledger.cache(&self.touched_addresses(ctx))
    }

    fn apply(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult;

    fn undo(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult;
}

/// Closed set of operations, dispatched by tag.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Create(CreateContract),
    Review(ReviewContract),
    Fund(FundContract),
    RequestPayment(RequestPayment),
    Terminate(TerminateContract),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create(_) => "create",
            Operation::Review(_) => "review",
            Operation::Fund(_) => "fund",
            Operation::RequestPayment(_) => "request_payment",
            Operation::Terminate(_) => "terminate",
        }
    }

    /// Public key of the contract the operation targets.
    pub fn contract_public_key(&self) -> Pubkey {
        match self {
            Operation::Create(op) => op.contract_public_key(),
            Operation::Review(op) => op.contract_public_key,
            Operation::Fund(op) => op.contract_public_key,
            Operation::RequestPayment(op) => op.contract_public_key,
            Operation::Terminate(op) => op.contract_public_key,
        }
    }

    fn as_transition(&self) -> &dyn Transition {
        match self {
            Operation::Create(op) => op,
            Operation::Review(op) => op,
            Operation::Fund(op) => op,
            Operation::RequestPayment(op) => op,
            Operation::Terminate(op) => op,
        }
    }
}

impl Transition for Operation {
    fn touched_addresses(&self, ctx: &OperationContext) -> Vec<Pubkey> {
        self.as_transition().touched_addresses(ctx)
    }

    fn apply(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult {
        self.as_transition().apply(ctx, ledger)
    }

    fn undo(&self, ctx: &OperationContext, ledger: &mut dyn Ledger) -> TransitionResult {
        self.as_transition().undo(ctx, ledger)
    }
}

/// A contract record together with the account that holds it.
pub(crate) struct LoadedContract {
    pub account: LedgerAccount,
    pub contract: Contract,
}

impl LoadedContract {
    pub fn escrow(&self) -> u64 {
        self.account.balance
    }

    /// Account carrying `contract` and `escrow` in place of the loaded values.
    pub fn store(&self, contract: Contract, escrow: u64) -> LedgerAccount {
        LedgerAccount {
            balance: escrow,
            payload: crate::state::AccountPayload::RecurringPayment(contract),
            ..self.account.clone()
        }
    }
}

/// Load the contract with `public_key`, rejecting anything else.
pub(crate) fn load_contract(
    ctx: &OperationContext,
    ledger: &dyn Ledger,
    public_key: &Pubkey,
) -> std::result::Result<LoadedContract, Vec<TransactionError>> {
    let account = ledger
        .get_or_default(&address_from_public_key(public_key))
        .map_err(|e| ctx.fail(e))?;
    match account.contract().cloned() {
        Some(contract) => Ok(LoadedContract { account, contract }),
        None => Err(vec![TransactionError::new(
            ctx.request_id(),
            PaymentError::NotAContract,
            "contract_public_key",
            public_key,
            "recurring payment contract",
        )]),
    }
}

/// Ledger account owned by `public_key`.
pub(crate) fn load_party(
    ctx: &OperationContext,
    ledger: &dyn Ledger,
    public_key: &Pubkey,
) -> std::result::Result<LedgerAccount, Vec<TransactionError>> {
    ledger
        .get_or_default(&address_from_public_key(public_key))
        .map_err(|e| ctx.fail(e))
}

/// Issue all writes of a transition.
pub(crate) fn commit(
    ctx: &OperationContext,
    ledger: &mut dyn Ledger,
    accounts: Vec<LedgerAccount>,
) -> TransitionResult {
    for account in accounts {
        ledger.set(account).map_err(|e| ctx.fail(e))?;
    }
    Ok(())
}

pub(crate) fn credit(
    ctx: &OperationContext,
    account: &mut LedgerAccount,
    amount: u64,
) -> TransitionResult {
    account.balance = account
        .balance
        .checked_add(amount)
        .ok_or_else(|| ctx.fail(PaymentError::MathOverflow))?;
    Ok(())
}

pub(crate) fn debit(
    ctx: &OperationContext,
    account: &mut LedgerAccount,
    amount: u64,
) -> TransitionResult {
    account.balance = account
        .balance
        .checked_sub(amount)
        .ok_or_else(|| ctx.fail(PaymentError::InsufficientFunds))?;
    Ok(())
}
