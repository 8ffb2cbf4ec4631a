//! Member business logic - registration, lookup, and deletion.
//!
//! Registration is the one place a member and a payment are created together: the
//! member row is inserted with its initial billing state and the first payment is
//! appended in the same transaction, so a member never exists without an opening
//! ledger entry. Receipt rendering and upload are best-effort and happen outside
//! the transaction; their failure never blocks registration.

use crate::{
    core::dates::add_months,
    entities::{
        Member, Payment, member,
        member::MemberStatus,
        payment,
    },
    errors::{Error, Result},
    external::{ObjectStore, ReceiptDetails, ReceiptRenderer},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::warn;

/// Everything needed to register a member with their opening payment.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Member's full name
    pub full_name: String,
    /// Contact email; must be unique
    pub email: String,
    /// Contact phone number
    pub mobile_number: String,
    /// Date of birth
    pub date_of_birth: NaiveDate,
    /// Date the membership starts; the first due date is derived from it
    pub join_date: NaiveDate,
    /// Chosen plan
    pub plan_id: i64,
    /// Total fee owed for the plan up front
    pub total_fee: f64,
    /// Opening payment amount
    pub amount: f64,
    /// Date of the opening payment
    pub payment_date: NaiveDate,
    /// How the opening payment was made
    pub payment_method: Option<String>,
    /// Free-form notes on the opening payment
    pub remarks: Option<String>,
    /// Lifecycle state; defaults to ACTIVE
    pub status: Option<MemberStatus>,
    /// Raw profile picture to upload, if provided
    pub profile_picture: Option<Vec<u8>>,
}

/// Result of a successful registration.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    /// The newly created member with its opening billing state
    pub member: member::Model,
    /// The opening payment
    pub payment: payment::Model,
    /// Receipt URL, absent when rendering or upload failed
    pub receipt_url: Option<String>,
}

fn validate_registration(request: &RegistrationRequest) -> Result<()> {
    if request.full_name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Member name cannot be empty".to_string(),
        });
    }
    if request.email.trim().is_empty() {
        return Err(Error::Validation {
            message: "Member email cannot be empty".to_string(),
        });
    }
    if request.amount <= 0.0 || !request.amount.is_finite() {
        return Err(Error::InvalidAmount {
            amount: request.amount,
        });
    }
    if request.total_fee < 0.0 || !request.total_fee.is_finite() {
        return Err(Error::InvalidAmount {
            amount: request.total_fee,
        });
    }
    Ok(())
}

/// Registers a new member and records their opening payment atomically.
///
/// Computes the opening billing state: `total_paid = amount`,
/// `pending_amount = max(total_fee - amount, 0)` (overpayment is clamped, not carried
/// as credit), and `next_due_date = join_date + plan duration`. The payment snapshot
/// carries the same figures.
///
/// Profile picture and receipt uploads go through `store` and are best-effort.
pub async fn register_member(
    db: &DatabaseConnection,
    store: &dyn ObjectStore,
    renderer: &dyn ReceiptRenderer,
    request: RegistrationRequest,
) -> Result<RegistrationOutcome> {
    validate_registration(&request)?;

    let email = request.email.trim().to_string();
    if Member::find()
        .filter(member::Column::Email.eq(email.as_str()))
        .one(db)
        .await?
        .is_some()
    {
        return Err(Error::DuplicateEmail { email });
    }

    let plan = crate::core::plan::get_plan_by_id(db, request.plan_id)
        .await?
        .ok_or(Error::PlanNotFound {
            id: request.plan_id,
        })?;

    let total_paid = request.amount;
    let pending_amount = (request.total_fee - request.amount).max(0.0);
    let next_due_date = add_months(request.join_date, plan.duration_in_months);

    // Best-effort uploads happen before the transaction; a missing URL is fine.
    let profile_picture_url = match request.profile_picture {
        Some(bytes) => {
            let path = format!("profiles/{}.jpg", sanitize_email(&email));
            match store.upload(bytes, &path).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(email, error = %e, "profile picture upload failed, continuing without it");
                    None
                }
            }
        }
        None => None,
    };

    let receipt_url = upload_receipt(
        store,
        renderer,
        &ReceiptDetails {
            member_name: request.full_name.trim().to_string(),
            email: email.clone(),
            payment_date: request.payment_date,
            amount: request.amount,
            plan_name: plan.name.clone(),
            payment_method: request.payment_method.clone(),
        },
    )
    .await;

    let txn = db.begin().await?;

    let new_member = member::ActiveModel {
        full_name: Set(request.full_name.trim().to_string()),
        email: Set(email),
        mobile_number: Set(request.mobile_number),
        date_of_birth: Set(request.date_of_birth),
        join_date: Set(request.join_date),
        profile_picture_url: Set(profile_picture_url),
        plan_id: Set(plan.id),
        next_plan_id: Set(None),
        plan_switch_pending: Set(false),
        total_paid: Set(total_paid),
        pending_amount: Set(pending_amount),
        next_due_date: Set(Some(next_due_date)),
        status: Set(request.status.unwrap_or(MemberStatus::Active)),
        ..Default::default()
    };
    let created_member = new_member.insert(&txn).await?;

    let opening_payment = payment::ActiveModel {
        member_id: Set(created_member.id),
        payment_date: Set(request.payment_date),
        amount: Set(request.amount),
        payment_method: Set(request.payment_method),
        remarks: Set(request.remarks),
        paid_amount: Set(total_paid),
        pending_amount: Set(pending_amount),
        next_due_date: Set(next_due_date),
        receipt_url: Set(receipt_url.clone()),
        ..Default::default()
    };
    let created_payment = opening_payment.insert(&txn).await?;

    txn.commit().await?;

    Ok(RegistrationOutcome {
        member: created_member,
        payment: created_payment,
        receipt_url,
    })
}

/// Renders and uploads a receipt, swallowing failures.
pub(crate) async fn upload_receipt(
    store: &dyn ObjectStore,
    renderer: &dyn ReceiptRenderer,
    details: &ReceiptDetails,
) -> Option<String> {
    let bytes = match renderer.render(details) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(email = details.email, error = %e, "receipt rendering failed, continuing without it");
            return None;
        }
    };

    let path = format!(
        "receipts/receipt-{}-{}.txt",
        sanitize_email(&details.email),
        details.payment_date.format("%Y%m%d"),
    );
    match store.upload(bytes, &path).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(email = details.email, error = %e, "receipt upload failed, continuing without it");
            None
        }
    }
}

fn sanitize_email(email: &str) -> String {
    email.replace(['@', '.'], "_")
}

/// Finds a member by their unique ID.
pub async fn get_member_by_id(
    db: &DatabaseConnection,
    member_id: i64,
) -> Result<Option<member::Model>> {
    Member::find_by_id(member_id).one(db).await.map_err(Into::into)
}

/// Retrieves all members ordered alphabetically by name.
pub async fn get_all_members(db: &DatabaseConnection) -> Result<Vec<member::Model>> {
    Member::find()
        .order_by_asc(member::Column::FullName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all ACTIVE members, the population the rollover and reminder
/// passes operate on.
pub async fn get_active_members(db: &DatabaseConnection) -> Result<Vec<member::Model>> {
    Member::find()
        .filter(member::Column::Status.eq(MemberStatus::Active))
        .order_by_asc(member::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a member, cascading to their payments.
///
/// Stored receipts are removed best-effort through `store` first; a receipt that
/// cannot be deleted is logged and the member deletion proceeds. The payments and
/// the member row are removed in one transaction.
pub async fn delete_member(
    db: &DatabaseConnection,
    store: &dyn ObjectStore,
    member_id: i64,
) -> Result<()> {
    let existing = Member::find_by_id(member_id)
        .one(db)
        .await?
        .ok_or(Error::MemberNotFound { id: member_id })?;

    let payments = Payment::find()
        .filter(payment::Column::MemberId.eq(member_id))
        .all(db)
        .await?;

    for p in &payments {
        if let Some(url) = &p.receipt_url
            && let Err(e) = store.delete(&receipt_path_from_url(url)).await
        {
            warn!(payment_id = p.id, error = %e, "failed to delete receipt, continuing");
        }
    }

    let txn = db.begin().await?;
    Payment::delete_many()
        .filter(payment::Column::MemberId.eq(member_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;
    txn.commit().await?;

    Ok(())
}

/// Extracts the storage path from a receipt URL. Receipts always live under
/// `receipts/`, whatever scheme the store returned.
pub(crate) fn receipt_path_from_url(url: &str) -> String {
    url.rsplit_once('/')
        .map_or_else(|| url.to_string(), |(_, name)| format!("receipts/{name}"))
}
