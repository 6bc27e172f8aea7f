use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::constants::{LEDGER_CONFIG_SEED, LEDGER_SEED, VAULT_SEED};
use crate::error::PaymentError;
use crate::state::{LedgerConfig, LedgerEntry};

pub fn handle_withdraw_tokens(ctx: Context<WithdrawTokens>, amount: u64) -> Result<()> {
    require!(amount > 0, PaymentError::SchemaViolation);

    let config = &ctx.accounts.ledger_config;
    require_keys_eq!(ctx.accounts.vault.mint, config.mint, PaymentError::InvalidTokenMint);
    require_keys_eq!(ctx.accounts.destination.mint, config.mint, PaymentError::InvalidTokenMint);
    require_keys_eq!(
        ctx.accounts.destination.owner,
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
        .checked_sub(amount)
        .ok_or(PaymentError::InsufficientFunds)?;
    let balance = entry.account.balance;

    let config = &mut ctx.accounts.ledger_config;
    config.total_deposited = config
        .total_deposited
        .checked_sub(amount)
        .ok_or(PaymentError::MathOverflow)?;
    require!(
        ctx.accounts.vault.amount >= amount,
        PaymentError::InsufficientFunds
    );

    let signer_seeds: &[&[&[u8]]] = &[&[LEDGER_CONFIG_SEED, &[ctx.bumps.ledger_config]]];
    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.vault.to_account_info(),
                to: ctx.accounts.destination.to_account_info(),
                authority: ctx.accounts.ledger_config.to_account_info(),
            },
            signer_seeds,
        ),
        amount,
    )?;

    emit!(TokensWithdrawn {
        owner: ctx.accounts.owner.key(),
        amount,
        balance,
    });

    Ok(())
}

#[derive(Accounts)]
pub struct WithdrawTokens<'info> {
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
    pub destination: Account<'info, TokenAccount>,

    pub owner: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

#[event]
pub struct TokensWithdrawn {
    pub owner: Pubkey,
    pub amount: u64,
    /// Ledger balance after the withdrawal.
    pub balance: u64,
}
