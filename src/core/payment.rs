//! Payment recorder - appends ledger entries and maintains the member's running
//! financial state.
//!
//! Recording a payment computes the member's new cumulative totals, resolves the
//! next due date under a fixed priority policy, appends the immutable payment
//! snapshot, and updates the member - all inside one transaction scoped to that
//! member. Deleting a payment removes the row (and best-effort its receipt) but
//! never recomputes the member's current totals; the running summary is business
//! state in its own right, not a projection of surviving rows.

use crate::{
    core::dates::{add_months, days_between},
    entities::{Member, Payment, member, payment, plan},
    errors::{Error, Result},
    external::ObjectStore,
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::warn;

/// A member's payment history plus the derived days-left figure.
#[derive(Debug, Clone)]
pub struct MemberStatement {
    /// The member the statement belongs to
    pub member_id: i64,
    /// All payments, newest first
    pub payments: Vec<payment::Model>,
    /// Days between today and the latest due date across all payments.
    /// Negative when overdue, None when the member has no payments.
    pub days_left: Option<i64>,
}

/// Resolves the due date to store with a new payment, in priority order:
/// explicit caller date; unchanged when the payment clears the balance; derived from
/// the plan when billing has not started; otherwise unchanged.
fn resolve_next_due_date(
    explicit: Option<NaiveDate>,
    new_pending: f64,
    current_due: Option<NaiveDate>,
    current_plan: &plan::Model,
    today: NaiveDate,
) -> Option<NaiveDate> {
    if let Some(date) = explicit {
        return Some(date);
    }
    if new_pending == 0.0 {
        // The payment merely clears an existing balance; it does not buy a new period.
        return current_due;
    }
    if current_due.is_none() {
        return Some(add_months(today, current_plan.duration_in_months));
    }
    current_due
}

/// Records a payment against an existing member.
///
/// Computes `total_paid + amount` and `max(pending_amount - amount, 0)` (overpayment
/// beyond the balance is discarded, not carried as credit), resolves the due date,
/// appends the payment snapshot, and updates the member in the same transaction.
///
/// `today` anchors the due-date derivation for members whose billing has not started;
/// callers pass the current date.
#[allow(clippy::too_many_arguments)]
pub async fn record_payment(
    db: &DatabaseConnection,
    member_id: i64,
    amount: f64,
    payment_method: Option<String>,
    remarks: Option<String>,
    explicit_due_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(payment::Model, member::Model)> {
    if amount <= 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }

    let txn = db.begin().await?;

    let member = Member::find_by_id(member_id)
        .one(&txn)
        .await?
        .ok_or(Error::MemberNotFound { id: member_id })?;

    let current_plan = crate::entities::Plan::find_by_id(member.plan_id)
        .one(&txn)
        .await?
        .ok_or(Error::PlanNotFound { id: member.plan_id })?;

    let new_paid_amount = member.total_paid + amount;
    let new_pending_amount = (member.pending_amount - amount).max(0.0);
    let next_due_date = resolve_next_due_date(
        explicit_due_date,
        new_pending_amount,
        member.next_due_date,
        &current_plan,
        today,
    );

    // The snapshot needs a concrete date; a member with no due date at all only
    // reaches here when the plan-derived branch produced one.
    let snapshot_due_date = next_due_date.ok_or_else(|| Error::Validation {
        message: format!("member {member_id} has no due date and none could be derived"),
    })?;

    let new_payment = payment::ActiveModel {
        member_id: Set(member_id),
        payment_date: Set(today),
        amount: Set(amount),
        payment_method: Set(payment_method),
        remarks: Set(remarks),
        paid_amount: Set(new_paid_amount),
        pending_amount: Set(new_pending_amount),
        next_due_date: Set(snapshot_due_date),
        receipt_url: Set(None),
        ..Default::default()
    };
    let created_payment = new_payment.insert(&txn).await?;

    let mut active_member: member::ActiveModel = member.into();
    active_member.total_paid = Set(new_paid_amount);
    active_member.pending_amount = Set(new_pending_amount);
    active_member.next_due_date = Set(Some(snapshot_due_date));
    let updated_member = active_member.update(&txn).await?;

    txn.commit().await?;

    Ok((created_payment, updated_member))
}

/// Retrieves all payments for a member, newest first.
pub async fn get_payments_for_member(
    db: &DatabaseConnection,
    member_id: i64,
) -> Result<Vec<payment::Model>> {
    Payment::find()
        .filter(payment::Column::MemberId.eq(member_id))
        .order_by_desc(payment::Column::PaymentDate)
        .order_by_desc(payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific payment by its unique ID.
pub async fn get_payment_by_id(
    db: &DatabaseConnection,
    payment_id: i64,
) -> Result<Option<payment::Model>> {
    Payment::find_by_id(payment_id).one(db).await.map_err(Into::into)
}

/// Builds a member's statement: their payments plus the days-left figure derived
/// from the latest due date across all payments.
pub async fn member_statement(
    db: &DatabaseConnection,
    member_id: i64,
    today: NaiveDate,
) -> Result<MemberStatement> {
    if Member::find_by_id(member_id).one(db).await?.is_none() {
        return Err(Error::MemberNotFound { id: member_id });
    }

    let payments = get_payments_for_member(db, member_id).await?;
    let days_left = payments
        .iter()
        .map(|p| p.next_due_date)
        .max()
        .map(|due| days_between(today, due));

    Ok(MemberStatement {
        member_id,
        payments,
        days_left,
    })
}

/// Deletes a payment record.
///
/// The member's current `total_paid`/`pending_amount` stay exactly as they were;
/// deleting history does not rewrite the running summary. Any stored receipt is
/// removed best-effort and its failure never blocks the deletion.
pub async fn delete_payment(
    db: &DatabaseConnection,
    store: &dyn ObjectStore,
    payment_id: i64,
) -> Result<()> {
    let existing = Payment::find_by_id(payment_id)
        .one(db)
        .await?
        .ok_or(Error::PaymentNotFound { id: payment_id })?;

    if let Some(url) = &existing.receipt_url
        && let Err(e) = store
            .delete(&crate::core::member::receipt_path_from_url(url))
            .await
    {
        warn!(payment_id, error = %e, "failed to delete receipt, continuing");
    }

    existing.delete(db).await?;
    Ok(())
}
