use anchor_lang::prelude::*;

pub mod constants;
pub mod error;
pub mod instructions;
pub mod ledger;
pub mod operations;
pub mod state;
pub mod utils;

pub use instructions::*;

declare_id!("8VBedcJHm5WJUcEV5hYgvoaiSQcUVCC3RtUW6MNGSFEN");

#[program]
pub mod recurring_payment {
    use super::*;

    pub fn initialize_ledger(ctx: Context<InitializeLedger>) -> Result<()> {
        handle_initialize_ledger(ctx)
    }

    pub fn open_account(ctx: Context<OpenAccount>, public_key: Pubkey) -> Result<()> {
        handle_open_account(ctx, public_key)
    }

    pub fn deposit_tokens(ctx: Context<DepositTokens>, amount: u64) -> Result<()> {
        handle_deposit_tokens(ctx, amount)
    }

    pub fn withdraw_tokens(ctx: Context<WithdrawTokens>, amount: u64) -> Result<()> {
        handle_withdraw_tokens(ctx, amount)
    }

    // Contract operations read and write the ledger entries passed as
    // remaining accounts: the caller's, the contract's and, for terminate,
    // the peer's.

    pub fn create_contract<'info>(
        ctx: Context<'_, '_, 'info, 'info, Operate<'info>>,
        request_id: u64,
        op: crate::operations::CreateContract,
    ) -> Result<()> {
        run_operation(
            &ctx.accounts.caller,
            ctx.remaining_accounts,
            request_id,
            &crate::operations::Operation::Create(op),
        )
    }

    pub fn review_contract<'info>(
        ctx: Context<'_, '_, 'info, 'info, Operate<'info>>,
        request_id: u64,
        op: crate::operations::ReviewContract,
    ) -> Result<()> {
        run_operation(
            &ctx.accounts.caller,
            ctx.remaining_accounts,
            request_id,
            &crate::operations::Operation::Review(op),
        )
    }

    pub fn fund_contract<'info>(
        ctx: Context<'_, '_, 'info, 'info, Operate<'info>>,
        request_id: u64,
        op: crate::operations::FundContract,
    ) -> Result<()> {
        run_operation(
            &ctx.accounts.caller,
            ctx.remaining_accounts,
            request_id,
            &crate::operations::Operation::Fund(op),
        )
    }

    pub fn request_payment<'info>(
        ctx: Context<'_, '_, 'info, 'info, Operate<'info>>,
        request_id: u64,
        op: crate::operations::RequestPayment,
    ) -> Result<()> {
        run_operation(
            &ctx.accounts.caller,
            ctx.remaining_accounts,
            request_id,
            &crate::operations::Operation::RequestPayment(op),
        )
    }

    pub fn terminate_contract<'info>(
        ctx: Context<'_, '_, 'info, 'info, Operate<'info>>,
        request_id: u64,
        op: crate::operations::TerminateContract,
    ) -> Result<()> {
        run_operation(
            &ctx.accounts.caller,
            ctx.remaining_accounts,
            request_id,
            &crate::operations::Operation::Terminate(op),
        )
    }

    pub fn emit_payment_quote(
        ctx: Context<EmitPaymentQuote>,
        contract_public_key: Pubkey,
    ) -> Result<()> {
        handle_emit_payment_quote(ctx, contract_public_key)
    }
}
