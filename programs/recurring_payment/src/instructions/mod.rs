pub mod initialize_ledger;
pub mod open_account;
pub mod deposit_tokens;
pub mod withdraw_tokens;
pub mod operate;
pub mod emit_payment_quote;

pub use initialize_ledger::*;
pub use open_account::*;
pub use deposit_tokens::*;
pub use withdraw_tokens::*;
pub use operate::*;
pub use emit_payment_quote::*;
