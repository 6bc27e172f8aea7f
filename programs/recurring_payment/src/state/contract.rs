use anchor_lang::prelude::*;

use crate::constants::{MAX_DATA_LEN, MAX_TITLE_LEN};

/// Time unit of one installment period.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeriodUnit {
    Minutes,
    Hours,
    Days,
    Months,
    Years,
}

impl PeriodUnit {
    /// Position in the canonical unit order; part of the founding encoding.
    pub fn index(self) -> u16 {
        match self {
            PeriodUnit::Minutes => 0,
            PeriodUnit::Hours => 1,
            PeriodUnit::Days => 2,
            PeriodUnit::Months => 3,
            PeriodUnit::Years => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PeriodUnit::Minutes => "MINUTES",
            PeriodUnit::Hours => "HOURS",
            PeriodUnit::Days => "DAYS",
            PeriodUnit::Months => "MONTHS",
            PeriodUnit::Years => "YEARS",
        }
    }
}

impl std::fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of a contract.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContractState {
    SenderReview,
    RecipientReview,
    Accepted,
    Active,
    TerminatedSender,
    TerminatedRecipient,
    Ended,
}

impl ContractState {
    pub fn is_review(self) -> bool {
        matches!(self, ContractState::SenderReview | ContractState::RecipientReview)
    }

    pub fn name(self) -> &'static str {
        match self {
            ContractState::SenderReview => "SENDER_REVIEW",
            ContractState::RecipientReview => "RECIPIENT_REVIEW",
            ContractState::Accepted => "ACCEPTED",
            ContractState::Active => "ACTIVE",
            ContractState::TerminatedSender => "TERMINATED_SENDER",
            ContractState::TerminatedRecipient => "TERMINATED_RECIPIENT",
            ContractState::Ended => "ENDED",
        }
    }
}

impl std::fmt::Display for ContractState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Price and cadence of the installments.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitSchedule {
    pub period_unit: PeriodUnit,
    /// Periods per slot (>= 1).
    pub period_count: u16,
    pub amount_per_installment: u64,
    /// Installments the first funding must cover.
    pub prepaid_minimum: u16,
    pub total_installments: u16,
    /// Installments of remaining escrow owed to the recipient on termination.
    pub termination_fee_installments: u16,
}

impl UnitSchedule {
    pub const SIZE: usize =
        1 + // period_unit
        2 + // period_count
        8 + // amount_per_installment
        2 + // prepaid_minimum
        2 + // total_installments
        2;  // termination_fee_installments
}

/// Field of a [`UnitSchedule`] that a counter-proposal may override.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScheduleField {
    PeriodUnit,
    PeriodCount,
    AmountPerInstallment,
    PrepaidMinimum,
    TotalInstallments,
    TerminationFeeInstallments,
}

impl ScheduleField {
    pub fn name(self) -> &'static str {
        match self {
            ScheduleField::PeriodUnit => "period_unit",
            ScheduleField::PeriodCount => "period_count",
            ScheduleField::AmountPerInstallment => "amount_per_installment",
            ScheduleField::PrepaidMinimum => "prepaid_minimum",
            ScheduleField::TotalInstallments => "total_installments",
            ScheduleField::TerminationFeeInstallments => "termination_fee_installments",
        }
    }
}

/// Partial schedule used during negotiation; `None` leaves a field alone.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScheduleOverride {
    pub period_unit: Option<PeriodUnit>,
    pub period_count: Option<u16>,
    pub amount_per_installment: Option<u64>,
    pub prepaid_minimum: Option<u16>,
    pub total_installments: Option<u16>,
    pub termination_fee_installments: Option<u16>,
}

impl ScheduleOverride {
    /// Fields this override sets, in declaration order.
    pub fn fields(&self) -> Vec<ScheduleField> {
        let mut out = Vec::new();
        if self.period_unit.is_some() {
            out.push(ScheduleField::PeriodUnit);
        }
        if self.period_count.is_some() {
            out.push(ScheduleField::PeriodCount);
        }
        if self.amount_per_installment.is_some() {
            out.push(ScheduleField::AmountPerInstallment);
        }
        if self.prepaid_minimum.is_some() {
            out.push(ScheduleField::PrepaidMinimum);
        }
        if self.total_installments.is_some() {
            out.push(ScheduleField::TotalInstallments);
        }
        if self.termination_fee_installments.is_some() {
            out.push(ScheduleField::TerminationFeeInstallments);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Snapshot of `schedule` restricted to the fields `self` sets.
    pub fn capture(&self, schedule: &UnitSchedule) -> ScheduleOverride {
        ScheduleOverride {
            period_unit: self.period_unit.map(|_| schedule.period_unit),
            period_count: self.period_count.map(|_| schedule.period_count),
            amount_per_installment: self
                .amount_per_installment
                .map(|_| schedule.amount_per_installment),
            prepaid_minimum: self.prepaid_minimum.map(|_| schedule.prepaid_minimum),
            total_installments: self.total_installments.map(|_| schedule.total_installments),
            termination_fee_installments: self
                .termination_fee_installments
                .map(|_| schedule.termination_fee_installments),
        }
    }

    /// Set fields whose value differs from `schedule`: `(field, given, on-contract)`.
    pub fn mismatches(&self, schedule: &UnitSchedule) -> Vec<(ScheduleField, String, String)> {
        let current = self.capture(schedule);
        let mut out = Vec::new();
        if self.period_unit != current.period_unit {
            out.push((
                ScheduleField::PeriodUnit,
                display_opt(self.period_unit),
                schedule.period_unit.to_string(),
            ));
        }
        if self.period_count != current.period_count {
            out.push((
                ScheduleField::PeriodCount,
                display_opt(self.period_count),
                schedule.period_count.to_string(),
            ));
        }
        if self.amount_per_installment != current.amount_per_installment {
            out.push((
                ScheduleField::AmountPerInstallment,
                display_opt(self.amount_per_installment),
                schedule.amount_per_installment.to_string(),
            ));
        }
        if self.prepaid_minimum != current.prepaid_minimum {
            out.push((
                ScheduleField::PrepaidMinimum,
                display_opt(self.prepaid_minimum),
                schedule.prepaid_minimum.to_string(),
            ));
        }
        if self.total_installments != current.total_installments {
            out.push((
                ScheduleField::TotalInstallments,
                display_opt(self.total_installments),
                schedule.total_installments.to_string(),
            ));
        }
        if self.termination_fee_installments != current.termination_fee_installments {
            out.push((
                ScheduleField::TerminationFeeInstallments,
                display_opt(self.termination_fee_installments),
                schedule.termination_fee_installments.to_string(),
            ));
        }
        out
    }

    /// Field-by-field override of `schedule`.
    pub fn apply_to(&self, schedule: &UnitSchedule) -> UnitSchedule {
        UnitSchedule {
            period_unit: self.period_unit.unwrap_or(schedule.period_unit),
            period_count: self.period_count.unwrap_or(schedule.period_count),
            amount_per_installment: self
                .amount_per_installment
                .unwrap_or(schedule.amount_per_installment),
            prepaid_minimum: self.prepaid_minimum.unwrap_or(schedule.prepaid_minimum),
            total_installments: self.total_installments.unwrap_or(schedule.total_installments),
            termination_fee_installments: self
                .termination_fee_installments
                .unwrap_or(schedule.termination_fee_installments),
        }
    }
}

fn display_opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "<unset>".to_string())
}

/// A recurring payment agreement between a sender (payer) and a recipient.
///
/// The escrow is not stored here: it is the balance of the ledger account
/// holding this record.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Contract {
    /// Derived identity; immutable once created.
    pub public_key: Pubkey,
    pub state: ContractState,
    pub schedule: UnitSchedule,
    pub sender: Pubkey,
    pub recipient: Pubkey,
    /// Counter-proposals exchanged so far.
    pub revision: u32,
    pub installments_paid: u16,
    /// Origin of slot arithmetic (Unix seconds, UTC); 0 until accepted.
    pub start_ts: i64,
    /// Provisional start recorded at acceptance.
    pub accepted_ts: i64,
    /// Fund operations applied since acceptance.
    pub funding_rounds: u32,
    /// Escrow held when the contract was terminated.
    pub last_escrow_snapshot: u64,
    pub title: String,
    pub data: String,
}

impl Contract {
    pub const SIZE: usize =
        32 + // public_key
        1 +  // state
        UnitSchedule::SIZE +
        32 + // sender
        32 + // recipient
        4 +  // revision
        2 +  // installments_paid
        8 +  // start_ts
        8 +  // accepted_ts
        4 +  // funding_rounds
        8 +  // last_escrow_snapshot
        4 + MAX_TITLE_LEN +
        4 + MAX_DATA_LEN;

    pub fn is_party(&self, key: &Pubkey) -> bool {
        self.sender == *key || self.recipient == *key
    }

    /// The counterparty of `key`, if `key` is a party.
    pub fn peer_of(&self, key: &Pubkey) -> Option<Pubkey> {
        if *key == self.sender {
            Some(self.recipient)
        } else if *key == self.recipient {
            Some(self.sender)
        } else {
            None
        }
    }

    /// Review state in which `key` is the reviewer.
    pub fn review_turn_of(&self, key: &Pubkey) -> ContractState {
        if *key == self.sender {
            ContractState::SenderReview
        } else {
            ContractState::RecipientReview
        }
    }

    /// Party expected to act in the current review state.
    pub fn reviewer(&self) -> Option<Pubkey> {
        match self.state {
            ContractState::SenderReview => Some(self.sender),
            ContractState::RecipientReview => Some(self.recipient),
            _ => None,
        }
    }

    pub fn remaining_installments(&self) -> u16 {
        self.schedule
            .total_installments
            .saturating_sub(self.installments_paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> UnitSchedule {
        UnitSchedule {
            period_unit: PeriodUnit::Days,
            period_count: 1,
            amount_per_installment: 100,
            prepaid_minimum: 2,
            total_installments: 10,
            termination_fee_installments: 1,
        }
    }

    #[test]
    fn override_applies_only_set_fields() {
        let o = ScheduleOverride {
            amount_per_installment: Some(250),
            total_installments: Some(12),
            ..Default::default()
        };
        let merged = o.apply_to(&schedule());
        assert_eq!(merged.amount_per_installment, 250);
        assert_eq!(merged.total_installments, 12);
        assert_eq!(merged.period_unit, PeriodUnit::Days);
        assert_eq!(merged.prepaid_minimum, 2);
        assert_eq!(
            o.fields(),
            vec![ScheduleField::AmountPerInstallment, ScheduleField::TotalInstallments]
        );
    }

    #[test]
    fn capture_restores_previous_values() {
        let o = ScheduleOverride {
            period_unit: Some(PeriodUnit::Months),
            prepaid_minimum: Some(5),
            ..Default::default()
        };
        let before = schedule();
        let old = o.capture(&before);
        let after = o.apply_to(&before);
        assert_ne!(after, before);
        assert_eq!(old.apply_to(&after), before);
    }

    #[test]
    fn mismatches_report_stale_values() {
        let stale = ScheduleOverride {
            amount_per_installment: Some(99),
            period_count: Some(1),
            ..Default::default()
        };
        let m = stale.mismatches(&schedule());
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].0, ScheduleField::AmountPerInstallment);
        assert_eq!(m[0].1, "99");
        assert_eq!(m[0].2, "100");
    }
}
