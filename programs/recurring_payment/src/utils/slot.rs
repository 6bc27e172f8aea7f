//! Slot clock: converts elapsed contract time into installment counts.
//! - slot = period_count * base_seconds(period_unit)
//! - next_unlock = start + slot * (paid + 1)
//! - available = floor((now - start) / slot) - paid   (may be negative)

use crate::constants::{
    SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE, SECONDS_PER_MONTH, SECONDS_PER_YEAR,
};
use crate::error::PaymentError;
use crate::state::{PeriodUnit, UnitSchedule};

/// Seconds per [`PeriodUnit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotTable {
    pub minute: i64,
    pub hour: i64,
    pub day: i64,
    pub month: i64,
    pub year: i64,
}

impl Default for SlotTable {
    fn default() -> Self {
        Self {
            minute: SECONDS_PER_MINUTE,
            hour: SECONDS_PER_HOUR,
            day: SECONDS_PER_DAY,
            month: SECONDS_PER_MONTH,
            year: SECONDS_PER_YEAR,
        }
    }
}

impl SlotTable {
    pub fn base_seconds(&self, unit: PeriodUnit) -> i64 {
        match unit {
            PeriodUnit::Minutes => self.minute,
            PeriodUnit::Hours => self.hour,
            PeriodUnit::Days => self.day,
            PeriodUnit::Months => self.month,
            PeriodUnit::Years => self.year,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SlotClock {
    table: SlotTable,
}

impl SlotClock {
    pub fn new(table: SlotTable) -> Self {
        Self { table }
    }

    pub fn slot_duration(&self, unit: PeriodUnit, count: u16) -> Result<i64, PaymentError> {
        let slot = self
            .table
            .base_seconds(unit)
            .checked_mul(count as i64)
            .ok_or(PaymentError::MathOverflow)?;
        if slot <= 0 {
            return Err(PaymentError::SchemaViolation);
        }
        Ok(slot)
    }

    /// Timestamp at which installment `paid + 1` unlocks.
    pub fn next_unlock_time(
        &self,
        start_ts: i64,
        schedule: &UnitSchedule,
        paid: u16,
    ) -> Result<i64, PaymentError> {
        let slot = self.slot_duration(schedule.period_unit, schedule.period_count)?;
        slot.checked_mul(paid as i64 + 1)
            .and_then(|offset| start_ts.checked_add(offset))
            .ok_or(PaymentError::MathOverflow)
    }

    /// Installments matured since `start_ts` and not yet paid out.
    /// Negative when fewer slots have elapsed than were already paid.
    pub fn available_installments(
        &self,
        start_ts: i64,
        now_ts: i64,
        schedule: &UnitSchedule,
        paid: u16,
    ) -> Result<i64, PaymentError> {
        let slot = self.slot_duration(schedule.period_unit, schedule.period_count)?;
        let elapsed = now_ts
            .checked_sub(start_ts)
            .ok_or(PaymentError::MathOverflow)?;
        Ok(elapsed.div_euclid(slot) - paid as i64)
    }

    /// [`Self::available_installments`] clamped to `[0, u16::MAX]`.
    pub fn matured_installments(
        &self,
        start_ts: i64,
        now_ts: i64,
        schedule: &UnitSchedule,
        paid: u16,
    ) -> Result<u16, PaymentError> {
        let avail = self.available_installments(start_ts, now_ts, schedule, paid)?;
        Ok(avail.clamp(0, u16::MAX as i64) as u16)
    }
}
