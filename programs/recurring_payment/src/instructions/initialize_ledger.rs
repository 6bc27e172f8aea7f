use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::constants::{LEDGER_CONFIG_SEED, VAULT_SEED};
use crate::state::LedgerConfig;

pub fn handle_initialize_ledger(ctx: Context<InitializeLedger>) -> Result<()> {
    let config = &mut ctx.accounts.ledger_config;
    config.mint = ctx.accounts.mint.key();
    config.admin = ctx.accounts.admin.key();
    config.total_deposited = 0;

    emit!(LedgerInitialized {
        mint: config.mint,
        admin: config.admin,
        vault: ctx.accounts.vault.key(),
    });

    Ok(())
}

#[derive(Accounts)]
pub struct InitializeLedger<'info> {
    #[account(
        init,
        payer = admin,
        space = 8 + LedgerConfig::SIZE,
        seeds = [LEDGER_CONFIG_SEED],
        bump
    )]
    pub ledger_config: Account<'info, LedgerConfig>,

    #[account(
        init,
        payer = admin,
        token::mint = mint,
        token::authority = ledger_config,
        seeds = [VAULT_SEED, ledger_config.key().as_ref()],
        bump
    )]
    pub vault: Account<'info, TokenAccount>,

    pub mint: Account<'info, Mint>,

    #[account(mut)]
    pub admin: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

#[event]
pub struct LedgerInitialized {
    pub mint: Pubkey,
    pub admin: Pubkey,
    pub vault: Pubkey,
}
