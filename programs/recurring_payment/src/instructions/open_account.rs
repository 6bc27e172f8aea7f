use anchor_lang::prelude::*;

use crate::constants::LEDGER_SEED;
use crate::state::{LedgerAccount, LedgerEntry};

/// Create the ledger entry for `public_key`. Parties and contracts alike need
/// one before any operation can write to them.
pub fn handle_open_account(ctx: Context<OpenAccount>, public_key: Pubkey) -> Result<()> {
    let address = ctx.accounts.ledger_entry.key();
    ctx.accounts.ledger_entry.account = LedgerAccount {
        address,
        public_key: Some(public_key),
        ..Default::default()
    };

    emit!(AccountOpened {
        public_key,
        address,
        payer: ctx.accounts.payer.key(),
    });

    Ok(())
}

#[derive(Accounts)]
#[instruction(public_key: Pubkey)]
pub struct OpenAccount<'info> {
    #[account(
        init,
        payer = payer,
        space = 8 + LedgerEntry::SIZE,
        seeds = [LEDGER_SEED, public_key.as_ref()],
        bump
    )]
    pub ledger_entry: Account<'info, LedgerEntry>,

    #[account(mut)]
    pub payer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[event]
pub struct AccountOpened {
    pub public_key: Pubkey,
    pub address: Pubkey,
    pub payer: Pubkey,
}
