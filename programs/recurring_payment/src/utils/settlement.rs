//! Fund movements for claims and termination.
//!
//! A release pays out matured installments, capped by what the escrow can
//! cover and by the installments left on the contract. Termination first runs
//! such a release (catch-up payout), then splits the remainder: up to
//! `termination_fee_installments * amount` goes to the recipient, the excess
//! back to the sender.

use crate::error::PaymentError;
use crate::state::UnitSchedule;

/// Installments released in one payout and the funds they carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Release {
    pub installments: u16,
    pub amount: u64,
}

/// Division of the escrow left after a catch-up payout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemainderSplit {
    pub to_recipient: u64,
    pub to_sender: u64,
}

/// Every transfer made when terminating a contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Termination {
    pub catch_up: Release,
    pub split: RemainderSplit,
}

impl Termination {
    pub fn to_recipient(&self) -> Result<u64, PaymentError> {
        self.catch_up
            .amount
            .checked_add(self.split.to_recipient)
            .ok_or(PaymentError::MathOverflow)
    }

    pub fn to_sender(&self) -> u64 {
        self.split.to_sender
    }
}

/// `units * amount_per_installment`.
pub fn installments_value(units: u16, amount_per_installment: u64) -> Result<u64, PaymentError> {
    let v = (units as u128)
        .checked_mul(amount_per_installment as u128)
        .ok_or(PaymentError::MathOverflow)?;
    u64::try_from(v).map_err(|_| PaymentError::MathOverflow)
}

/// Whole installments an escrow balance covers. With a zero price every
/// installment is covered.
pub fn covered_installments(escrow: u64, amount_per_installment: u64) -> u64 {
    if amount_per_installment == 0 {
        u64::MAX
    } else {
        escrow / amount_per_installment
    }
}

/// Release `available` matured installments, limited by the escrow and by
/// `remaining` unpaid installments. Non-positive `available` releases nothing.
pub fn release_matured(
    available: i64,
    escrow: u64,
    amount_per_installment: u64,
    remaining: u16,
) -> Result<Release, PaymentError> {
    if available <= 0 {
        return Ok(Release::default());
    }
    let covered = covered_installments(escrow, amount_per_installment);
    let installments = (available as u64).min(covered).min(remaining as u64) as u16;
    Ok(Release {
        installments,
        amount: installments_value(installments, amount_per_installment)?,
    })
}

/// Split what is left in escrow after the catch-up payout.
pub fn split_remainder(
    remainder: u64,
    termination_fee_installments: u16,
    amount_per_installment: u64,
) -> Result<RemainderSplit, PaymentError> {
    let fee = installments_value(termination_fee_installments, amount_per_installment)?;
    if remainder > fee {
        Ok(RemainderSplit {
            to_recipient: fee,
            to_sender: remainder - fee,
        })
    } else {
        Ok(RemainderSplit {
            to_recipient: remainder,
            to_sender: 0,
        })
    }
}

/// Settle a terminated contract holding `escrow` with `available` matured
/// installments outstanding.
pub fn settle_termination(
    available: i64,
    escrow: u64,
    schedule: &UnitSchedule,
    paid: u16,
) -> Result<Termination, PaymentError> {
    let remaining = schedule.total_installments.saturating_sub(paid);
    let catch_up = release_matured(available, escrow, schedule.amount_per_installment, remaining)?;
    let remainder = escrow
        .checked_sub(catch_up.amount)
        .ok_or(PaymentError::MathOverflow)?;
    let split = split_remainder(
        remainder,
        schedule.termination_fee_installments,
        schedule.amount_per_installment,
    )?;
    Ok(Termination { catch_up, split })
}

/// Rebuild the transfers of a past termination from the escrow snapshot and
/// the number of installments its catch-up released.
pub fn replay_termination(
    escrow_snapshot: u64,
    catch_up_installments: u16,
    schedule: &UnitSchedule,
) -> Result<Termination, PaymentError> {
    let catch_up = Release {
        installments: catch_up_installments,
        amount: installments_value(catch_up_installments, schedule.amount_per_installment)?,
    };
    let remainder = escrow_snapshot
        .checked_sub(catch_up.amount)
        .ok_or(PaymentError::MathOverflow)?;
    let split = split_remainder(
        remainder,
        schedule.termination_fee_installments,
        schedule.amount_per_installment,
    )?;
    Ok(Termination { catch_up, split })
}

/// Installments a claim (or catch-up) at `installment_index` released, given
/// the contract has since reached `paid`.
pub fn released_since(paid: u16, installment_index: u16) -> Result<u16, PaymentError> {
    let before = installment_index
        .checked_sub(1)
        .ok_or(PaymentError::SequenceMismatch)?;
    paid.checked_sub(before).ok_or(PaymentError::SequenceMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PeriodUnit;
    use proptest::prelude::*;

    fn schedule(amount: u64, total: u16, fee: u16) -> UnitSchedule {
        UnitSchedule {
            period_unit: PeriodUnit::Days,
            period_count: 1,
            amount_per_installment: amount,
            prepaid_minimum: 1,
            total_installments: total,
            termination_fee_installments: fee,
        }
    }

    #[test]
    fn release_is_capped_by_escrow() {
        // 3 matured, escrow only covers 2.
        let r = release_matured(3, 250, 100, 10).unwrap();
        assert_eq!(r, Release { installments: 2, amount: 200 });
    }

    #[test]
    fn release_pays_all_matured_when_covered() {
        let r = release_matured(3, 1_000, 100, 10).unwrap();
        assert_eq!(r, Release { installments: 3, amount: 300 });
        // Exactly covered counts as covered.
        let r = release_matured(3, 300, 100, 10).unwrap();
        assert_eq!(r.installments, 3);
    }

    #[test]
    fn release_is_capped_by_remaining() {
        let r = release_matured(40, 10_000, 100, 2).unwrap();
        assert_eq!(r, Release { installments: 2, amount: 200 });
    }

    #[test]
    fn release_ignores_non_positive_availability() {
        assert_eq!(release_matured(0, 500, 100, 5).unwrap(), Release::default());
        assert_eq!(release_matured(-3, 500, 100, 5).unwrap(), Release::default());
    }

    #[test]
    fn zero_price_releases_matured_count() {
        let r = release_matured(4, 0, 0, 10).unwrap();
        assert_eq!(r, Release { installments: 4, amount: 0 });
    }

    #[test]
    fn termination_without_elapsed_slots_charges_fee() {
        let t = settle_termination(0, 100_000, &schedule(10_000, 100, 1), 0).unwrap();
        assert_eq!(t.catch_up, Release::default());
        assert_eq!(t.to_recipient().unwrap(), 10_000);
        assert_eq!(t.to_sender(), 90_000);
    }

    #[test]
    fn termination_remainder_below_fee_goes_to_recipient() {
        let t = settle_termination(1, 150, &schedule(100, 10, 3), 0).unwrap();
        assert_eq!(t.catch_up.installments, 1);
        assert_eq!(t.split, RemainderSplit { to_recipient: 50, to_sender: 0 });
        assert_eq!(t.to_recipient().unwrap(), 150);
    }

    #[test]
    fn termination_remainder_equal_to_fee_goes_to_recipient() {
        let t = settle_termination(0, 300, &schedule(100, 10, 3), 0).unwrap();
        assert_eq!(t.split, RemainderSplit { to_recipient: 300, to_sender: 0 });
    }

    #[test]
    fn replay_matches_settlement() {
        let s = schedule(7, 50, 4);
        let t = settle_termination(6, 100, &s, 10).unwrap();
        assert_eq!(replay_termination(100, t.catch_up.installments, &s).unwrap(), t);
    }

    #[test]
    fn released_since_recovers_count() {
        assert_eq!(released_since(5, 3).unwrap(), 3);
        assert_eq!(released_since(2, 3).unwrap(), 0);
        assert_eq!(released_since(1, 3), Err(PaymentError::SequenceMismatch));
        assert_eq!(released_since(1, 0), Err(PaymentError::SequenceMismatch));
    }

    #[test]
    fn value_overflow_is_reported() {
        assert_eq!(
            installments_value(u16::MAX, u64::MAX),
            Err(PaymentError::MathOverflow)
        );
    }

    proptest! {
        #[test]
        fn termination_conserves_escrow(
            available in -5i64..200,
            escrow in 0u64..10_000_000,
            amount in 0u64..100_000,
            total in 0u16..300,
            fee in 0u16..20,
            paid in 0u16..300,
        ) {
            let s = schedule(amount, total, fee);
            let t = settle_termination(available, escrow, &s, paid).unwrap();
            prop_assert_eq!(t.to_recipient().unwrap() + t.to_sender(), escrow);
            prop_assert!(t.catch_up.installments <= total.saturating_sub(paid));
            prop_assert_eq!(replay_termination(escrow, t.catch_up.installments, &s).unwrap(), t);
        }
    }
}
