use serde::Serialize;
use std::collections::HashSet;

use crate::attendance::MealRecord;
use crate::holidays::Holiday;

/// Allowance granted for a month, given the number of days worked.
pub trait AllowancePolicy: Send + Sync {
    fn allowance(&self, work_days: u32) -> i64;
}

impl<F> AllowancePolicy for F
where
    F: Fn(u32) -> i64 + Send + Sync,
{
    fn allowance(&self, work_days: u32) -> i64 {
        self(work_days)
    }
}

/// Fixed amount per day worked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyAllowance {
    pub per_day: i64,
}

impl DailyAllowance {
    pub fn new(per_day: i64) -> Self {
        Self { per_day }
    }
}

impl AllowancePolicy for DailyAllowance {
    fn allowance(&self, work_days: u32) -> i64 {
        self.per_day * i64::from(work_days)
    }
}

/// Monthly aggregate for one user.
///
/// Fields are read-only; `balance` is always `available_amount - total_used`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    work_days: u32,
    holiday_work_days: u32,
    vacation_days: f64,
    available_amount: i64,
    total_used: i64,
    balance: i64,
}

impl CalculationResult {
    pub fn new(
        work_days: u32,
        holiday_work_days: u32,
        vacation_days: f64,
        available_amount: i64,
        total_used: i64,
    ) -> Self {
        Self {
            work_days,
            holiday_work_days,
            vacation_days,
            available_amount,
            total_used,
            balance: available_amount - total_used,
        }
    }

    pub fn work_days(&self) -> u32 {
        self.work_days
    }

    pub fn holiday_work_days(&self) -> u32 {
        self.holiday_work_days
    }

    pub fn vacation_days(&self) -> f64 {
        self.vacation_days
    }

    pub fn available_amount(&self) -> i64 {
        self.available_amount
    }

    pub fn total_used(&self) -> i64 {
        self.total_used
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }
}

/// Aggregate a month of attendance rows.
///
/// `days` holds every row with a recognized attendance label, with or
/// without meals.
pub fn calculate(
    days: &[MealRecord],
    holidays: &[Holiday],
    allowance: &dyn AllowancePolicy,
) -> CalculationResult {
    let holiday_dates: HashSet<_> = holidays.iter().map(|h| h.date).collect();

    let mut work_days = 0;
    let mut holiday_work_days = 0;
    let mut vacation_days = 0.0;
    let mut total_used = 0;

    for day in days {
        if day.attendance.is_working() {
            work_days += 1;
            if holiday_dates.contains(&day.date) {
                holiday_work_days += 1;
            }
        }
        vacation_days += day.attendance.leave_weight();
        total_used += day.total_amount();
    }

    CalculationResult::new(
        work_days,
        holiday_work_days,
        vacation_days,
        allowance.allowance(work_days),
        total_used,
    )
}
