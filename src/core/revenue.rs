//! Revenue aggregation - read-only rollups over the payment ledger.
//!
//! Sums are derived from payment rows on demand; this module holds no state of its
//! own and never mutates anything. Empty result sets coerce to 0.

use crate::{
    entities::{Payment, payment},
    errors::Result,
};
use chrono::{Datelike, Days, NaiveDate};
use sea_orm::{QuerySelect, prelude::*};

/// Standard revenue windows, all anchored at `as_of`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevenueSummary {
    /// Sum over the whole ledger
    pub total: f64,
    /// Trailing seven days, inclusive of `as_of`
    pub week: f64,
    /// From the first of the month through `as_of`
    pub month: f64,
    /// From January 1st through `as_of`
    pub year: f64,
}

/// Revenue for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyRevenue {
    /// Calendar year
    pub year: i32,
    /// Calendar month, 1-12
    pub month: u32,
    /// Sum of payment amounts dated in that month
    pub total: f64,
}

async fn sum_amounts<C>(db: &C, query: Select<Payment>) -> Result<f64>
where
    C: ConnectionTrait,
{
    let total: Option<Option<f64>> = query
        .select_only()
        .column_as(payment::Column::Amount.sum(), "total")
        .into_tuple()
        .one(db)
        .await?;
    Ok(total.flatten().unwrap_or(0.0))
}

/// Total revenue across the whole ledger.
pub async fn total_revenue(db: &DatabaseConnection) -> Result<f64> {
    sum_amounts(db, Payment::find()).await
}

/// Revenue from payments dated within `[start, end]`, inclusive on both ends.
pub async fn revenue_between(
    db: &DatabaseConnection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<f64> {
    sum_amounts(
        db,
        Payment::find().filter(payment::Column::PaymentDate.between(start, end)),
    )
    .await
}

/// Sum of all payments made by one member.
pub async fn sum_payments_for_member(db: &DatabaseConnection, member_id: i64) -> Result<f64> {
    sum_amounts(
        db,
        Payment::find().filter(payment::Column::MemberId.eq(member_id)),
    )
    .await
}

/// Builds the standard revenue summary: total, trailing week, month-to-date,
/// and year-to-date, all as of `as_of`.
pub async fn revenue_summary(db: &DatabaseConnection, as_of: NaiveDate) -> Result<RevenueSummary> {
    let week_start = as_of.checked_sub_days(Days::new(7)).unwrap_or(as_of);
    let month_start = as_of.with_day(1).unwrap_or(as_of);
    let year_start = NaiveDate::from_ymd_opt(as_of.year(), 1, 1).unwrap_or(as_of);

    Ok(RevenueSummary {
        total: total_revenue(db).await?,
        week: revenue_between(db, week_start, as_of).await?,
        month: revenue_between(db, month_start, as_of).await?,
        year: revenue_between(db, year_start, as_of).await?,
    })
}

/// Revenue broken down by calendar month across all years present in the ledger,
/// sorted chronologically. Months with no payments are absent.
pub async fn monthly_breakdown(db: &DatabaseConnection) -> Result<Vec<MonthlyRevenue>> {
    let payments = Payment::find().all(db).await?;

    let mut by_month: std::collections::BTreeMap<(i32, u32), f64> = std::collections::BTreeMap::new();
    for p in payments {
        let key = (p.payment_date.year(), p.payment_date.month());
        *by_month.entry(key).or_insert(0.0) += p.amount;
    }

    Ok(by_month
        .into_iter()
        .map(|((year, month), total)| MonthlyRevenue { year, month, total })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_empty_ledger_sums_to_zero() -> Result<()> {
        let db = setup_test_db().await?;

        assert_eq!(total_revenue(&db).await?, 0.0);
        assert_eq!(
            revenue_between(&db, d(2024, 1, 1), d(2024, 12, 31)).await?,
            0.0
        );

        let summary = revenue_summary(&db, d(2024, 6, 15)).await?;
        assert_eq!(summary.total, 0.0);
        assert_eq!(summary.week, 0.0);
        assert_eq!(summary.month, 0.0);
        assert_eq!(summary.year, 0.0);

        assert!(monthly_breakdown(&db).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_revenue_between_is_inclusive() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let member = register_test_member(&db, "asha@example.com", plan.id).await?;
        append_test_payment(&db, member.id, 100.0, d(2024, 3, 1)).await?;
        append_test_payment(&db, member.id, 200.0, d(2024, 3, 15)).await?;
        append_test_payment(&db, member.id, 400.0, d(2024, 3, 31)).await?;

        // Both boundary dates are included
        assert_eq!(
            revenue_between(&db, d(2024, 3, 1), d(2024, 3, 31)).await?,
            700.0
        );
        assert_eq!(
            revenue_between(&db, d(2024, 3, 2), d(2024, 3, 30)).await?,
            200.0
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_revenue_summary_windows() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let member = register_test_member(&db, "asha@example.com", plan.id).await?;
        // Registration on 2024-01-01 already appended a 1000.0 opening payment.
        append_test_payment(&db, member.id, 100.0, d(2024, 6, 10)).await?;
        append_test_payment(&db, member.id, 50.0, d(2024, 6, 1)).await?;
        append_test_payment(&db, member.id, 25.0, d(2023, 12, 31)).await?;

        let summary = revenue_summary(&db, d(2024, 6, 15)).await?;
        assert_eq!(summary.total, 1175.0);
        assert_eq!(summary.week, 100.0); // only the 06-10 payment is within 7 days
        assert_eq!(summary.month, 150.0); // both June payments
        assert_eq!(summary.year, 1150.0); // everything dated 2024

        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_breakdown_groups_across_years() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let member = register_test_member(&db, "asha@example.com", plan.id).await?;
        append_test_payment(&db, member.id, 100.0, d(2023, 11, 5)).await?;
        append_test_payment(&db, member.id, 200.0, d(2023, 11, 20)).await?;
        append_test_payment(&db, member.id, 400.0, d(2024, 2, 2)).await?;

        let breakdown = monthly_breakdown(&db).await?;
        // Opening payment from registration is dated 2024-01-01
        assert_eq!(breakdown.len(), 3);
        assert_eq!(
            breakdown[0],
            MonthlyRevenue {
                year: 2023,
                month: 11,
                total: 300.0
            }
        );
        assert_eq!(
            breakdown[1],
            MonthlyRevenue {
                year: 2024,
                month: 1,
                total: 1000.0
            }
        );
        assert_eq!(
            breakdown[2],
            MonthlyRevenue {
                year: 2024,
                month: 2,
                total: 400.0
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_sum_payments_for_member_is_scoped() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let asha = register_test_member(&db, "asha@example.com", plan.id).await?;
        let rhea = register_test_member(&db, "rhea@example.com", plan.id).await?;
        append_test_payment(&db, asha.id, 100.0, d(2024, 2, 1)).await?;

        // Each opening payment is 1000.0
        assert_eq!(sum_payments_for_member(&db, asha.id).await?, 1100.0);
        assert_eq!(sum_payments_for_member(&db, rhea.id).await?, 1000.0);

        Ok(())
    }
}
