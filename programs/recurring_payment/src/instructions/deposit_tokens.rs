use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::constants::{LEDGER_CONFIG_SEED, LEDGER_SEED, VAULT_SEED};
use crate::error::PaymentError;
use crate::state::{LedgerConfig, LedgerEntry};

pub fn handle_deposit_tokens(ctx: Context<DepositTokens>, amount: u64) -> Result<()> {
    require!(amount > 0, PaymentError::SchemaViolation);

    let config = &ctx.accounts.ledger_config;
    require_keys_eq!(ctx.accounts.vault.mint, config.mint, PaymentError::InvalidTokenMint);
    require_keys_eq!(ctx.accounts.owner_token_account.mint, config.mint, PaymentError::InvalidTokenMint);
    require_keys_eq!(
        ctx.accounts.owner_token_account.owner,
        ctx.accounts.owner.key(),
        PaymentError::InvalidTokenAccount
    );

    let entry = &mut ctx.accounts.ledger_entry;
    require!(
        entry.account.public_key == Some(ctx.accounts.owner.key()),
        PaymentError::Unauthorized
    );
    entry.account.balance = entry
        .account
        .balance
        .checked_add(amount)
        .ok_or(PaymentError::MathOverflow)?;
    let balance = entry.account.balance;

    let config = &mut ctx.accounts.ledger_config;
    config.total_deposited = config
        .total_deposited
        .checked_add(amount)
        .ok_or(PaymentError::MathOverflow)?;

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.owner_token_account.to_account_info(),
                to: ctx.accounts.vault.to_account_info(),
                authority: ctx.accounts.owner.to_account_info(),
            },
        ),
        amount,
    )?;

    emit!(TokensDeposited {
        owner: ctx.accounts.owner.key(),
        amount,
        balance,
    });

    Ok(())
}

#[derive(Accounts)]
pub struct DepositTokens<'info> {
    #[account(mut, seeds = [LEDGER_CONFIG_SEED], bump)]
    pub ledger_config: Account<'info, LedgerConfig>,

    #[account(
        mut,
        seeds = [LEDGER_SEED, owner.key().as_ref()],
        bump
    )]
    pub ledger_entry: Account<'info, LedgerEntry>,

    #[account(
        mut,
        seeds = [VAULT_SEED, ledger_config.key().as_ref()],
        bump,
        constraint = vault.mint == ledger_config.mint @ PaymentError::InvalidTokenMint,
    )]
    pub vault: Account<'info, TokenAccount>,

    #[account(mut)]
    pub owner_token_account: Account<'info, TokenAccount>,

    pub owner: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

#[event]
pub struct TokensDeposited {
    pub owner: Pubkey,
    pub amount: u64,
    /// Ledger balance after the deposit.
    pub balance: u64,
}
