pub mod identity;
pub mod settlement;
pub mod slot;
