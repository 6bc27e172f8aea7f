pub mod contract;
pub mod ledger_entry;

pub use contract::*;
pub use ledger_entry::*;
