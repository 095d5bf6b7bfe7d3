//! Payment matrix arithmetic and month toggling

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::config::{ConcurrencyMode, LedgerConfig};
use crate::traits::*;
use crate::types::*;
use crate::utils::deadline::within;

/// Full re-sum of a payment matrix: one monthly rate per paid cell, every year included
pub fn recompute_total(months_paid: &MonthsPaid, user_type: UserType) -> BigDecimal {
    (BigDecimal::from(months_paid.paid_count() as u64) * user_type.monthly_rate()).normalized()
}

/// Members whose `(year, month)` cell is unpaid or absent
pub fn find_unpaid(members: &[Member], year: i32, month: Month) -> Vec<&Member> {
    members
        .iter()
        .filter(|member| !member.is_paid(year, month))
        .collect()
}

/// Members with at least one unpaid month in `year`
pub fn find_unpaid_in_year(members: &[Member], year: i32) -> Vec<&Member> {
    members
        .iter()
        .filter(|member| member.months_paid.has_unpaid_in_year(year))
        .collect()
}

/// Members who have not paid for the month containing `today`
pub fn find_unpaid_this_month(members: &[Member], today: NaiveDate) -> Vec<&Member> {
    let (year, month) = Month::period_of(today);
    find_unpaid(members, year, month)
}

/// Members with any unpaid month in the year before `today`
pub fn find_unpaid_previous_year(members: &[Member], today: NaiveDate) -> Vec<&Member> {
    find_unpaid_in_year(members, today.year() - 1)
}

/// Outcome of flipping one cell, computed before anything is written
#[derive(Debug, Clone, PartialEq)]
pub struct TogglePlan {
    pub year: i32,
    pub month: Month,
    /// Value of the cell after the flip
    pub now_paid: bool,
    /// Signed change to the running total
    pub delta: BigDecimal,
    pub months_paid: MonthsPaid,
    pub total_amount_paid: BigDecimal,
}

/// Flip `(year, month)` on a copy of the member's matrix and apply the rate delta
///
/// The running total is adjusted incrementally; the matrix is not re-summed.
pub fn plan_toggle(
    member: &Member,
    year: i32,
    month: Month,
    year_range: &YearRange,
) -> LedgerResult<TogglePlan> {
    year_range.check(year)?;

    let mut months_paid = member.months_paid.clone();
    let now_paid = months_paid.toggle(year, month);

    let rate = member.user_type().monthly_rate();
    let delta = if now_paid { rate } else { -rate };
    let total_amount_paid = (&member.total_amount_paid + &delta).normalized();

    Ok(TogglePlan {
        year,
        month,
        now_paid,
        delta,
        months_paid,
        total_amount_paid,
    })
}

/// Payment manager for toggling paid months against the store
pub struct PaymentManager<S: MemberStore> {
    storage: S,
    config: LedgerConfig,
}

impl<S: MemberStore> PaymentManager<S> {
    /// Create a new payment manager
    pub fn new(storage: S, config: LedgerConfig) -> Self {
        Self { storage, config }
    }

    /// Flip one month and persist the matrix and total in a single write
    ///
    /// `member` is left untouched; the stored record is returned.
    pub async fn toggle_month_paid(
        &mut self,
        member: &Member,
        year: i32,
        month: Month,
    ) -> LedgerResult<Member> {
        let plan = plan_toggle(member, year, month, &self.config.year_range)?;

        debug!(
            member_id = %member.id,
            year,
            month = %month,
            delta = %plan.delta,
            "Toggling paid month"
        );

        let patch = MemberPatch {
            months_paid: Some(plan.months_paid),
            total_amount_paid: Some(plan.total_amount_paid),
            expected_revision: match self.config.concurrency {
                ConcurrencyMode::Versioned => Some(member.revision),
                ConcurrencyMode::LastWriteWins => None,
            },
            ..Default::default()
        };

        let stored = within(
            self.config.store_timeout(),
            "update",
            self.storage.update(&member.id, &patch),
        )
        .await?;

        info!(
            member_id = %stored.id,
            year,
            month = %month,
            paid = plan.now_paid,
            total = %stored.total_amount_paid,
            "Toggled paid month"
        );

        Ok(stored)
    }
}
