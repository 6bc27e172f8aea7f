//! Contract identity: a blake3 digest over the founding attributes.
//!
//! Encoding order (big-endian integers):
//! recipient(32) | sender(32) | title | unit index(u16) | period count(u16) |
//! amount(u64) | prepaid(u16) | total(u16) | termination fee(u16) | data |
//! timestamp(u32)

use anchor_lang::prelude::*;

use crate::ledger::address_from_public_key;
use crate::state::UnitSchedule;

/// Immutable attributes a contract is founded on.
#[derive(Clone, Copy, Debug)]
pub struct FoundingTerms<'a> {
    pub recipient: &'a Pubkey,
    pub sender: &'a Pubkey,
    pub title: &'a str,
    pub schedule: &'a UnitSchedule,
    pub data: &'a str,
    pub timestamp: u32,
}

pub fn founding_bytes(terms: &FoundingTerms) -> Vec<u8> {
    let s = terms.schedule;
    let mut out = Vec::with_capacity(32 + 32 + terms.title.len() + 18 + terms.data.len() + 4);
    out.extend_from_slice(terms.recipient.as_ref());
    out.extend_from_slice(terms.sender.as_ref());
    out.extend_from_slice(terms.title.as_bytes());
    out.extend_from_slice(&s.period_unit.index().to_be_bytes());
    out.extend_from_slice(&s.period_count.to_be_bytes());
    out.extend_from_slice(&s.amount_per_installment.to_be_bytes());
    out.extend_from_slice(&s.prepaid_minimum.to_be_bytes());
    out.extend_from_slice(&s.total_installments.to_be_bytes());
    out.extend_from_slice(&s.termination_fee_installments.to_be_bytes());
    out.extend_from_slice(terms.data.as_bytes());
    out.extend_from_slice(&terms.timestamp.to_be_bytes());
    out
}

pub fn contract_public_key(terms: &FoundingTerms) -> Pubkey {
    let digest = blake3::hash(&founding_bytes(terms));
    Pubkey::new_from_array(*digest.as_bytes())
}

/// Ledger address of the contract founded on `terms`.
pub fn contract_address(terms: &FoundingTerms) -> Pubkey {
    address_from_public_key(&contract_public_key(terms))
}
