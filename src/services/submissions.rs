//! Car submissions: a user proposes a car, an admin approves it into a
//! listing or rejects it.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::access::{self, Operation, Principal};
use crate::entities::car;
use crate::entities::car_submission::{self, CarDetails};
use crate::entities::ReviewStatus;
use crate::error::{AppError, AppResult};
use crate::services::assignment::{self, ManagerAssignment};
use crate::services::cars::{insert_listing, validate_details};
use crate::services::{now_tz, optional_text, required_text};

const WHAT: &str = "Car submission";

/// Admin decision on a pending submission.
#[derive(Debug, Clone, Default)]
pub struct Approval {
    pub feedback: Option<String>,
    /// Overrides the configured assignment policy
    pub manager_id: Option<Uuid>,
}

pub async fn create(
    db: &DatabaseConnection,
    principal: &Principal,
    details: CarDetails,
) -> AppResult<car_submission::Model> {
    access::authorize(principal, Operation::CreateSubmission)?;
    let details = validate_details(details)?;

    let now = now_tz();
    let submission = car_submission::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(principal.id),
        details: Set(details),
        status: Set(ReviewStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(submission_id = %submission.id, user_id = %principal.id, "Car submission created");
    Ok(submission)
}

/// Admins see every submission, everyone else only their own.
pub async fn list(
    db: &DatabaseConnection,
    principal: &Principal,
    status: Option<ReviewStatus>,
) -> AppResult<Vec<car_submission::Model>> {
    let mut query = car_submission::Entity::find().order_by_desc(car_submission::Column::CreatedAt);
    if !principal.is_admin() {
        query = query.filter(car_submission::Column::UserId.eq(principal.id));
    }
    if let Some(status) = status {
        query = query.filter(car_submission::Column::Status.eq(status));
    }
    Ok(query.all(db).await?)
}

pub async fn get(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
) -> AppResult<car_submission::Model> {
    let submission = find(db, id).await?;
    access::authorize_party(principal, &[submission.user_id])?;
    Ok(submission)
}

/// Replaces the proposed details while the submission is still pending.
pub async fn update_details(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
    details: CarDetails,
) -> AppResult<car_submission::Model> {
    let submission = find(db, id).await?;
    if submission.user_id != principal.id {
        return Err(AppError::Forbidden(
            "Only the submitter can edit a submission".to_string(),
        ));
    }
    submission.status.ensure_pending(WHAT)?;
    let details = validate_details(details)?;

    // Same pending-only write as a decision, so an edit cannot land after one
    decide(
        db,
        id,
        car_submission::ActiveModel {
            details: Set(details),
            updated_at: Set(now_tz()),
            ..Default::default()
        },
    )
    .await?;

    find(db, id).await
}

/// Submitters may withdraw while pending; admins may always delete.
pub async fn delete(db: &DatabaseConnection, principal: &Principal, id: Uuid) -> AppResult<()> {
    let submission = find(db, id).await?;
    access::authorize_party(principal, &[submission.user_id])?;
    if !principal.is_admin() {
        submission.status.ensure_pending(WHAT)?;
    }

    car_submission::Entity::delete_by_id(id).exec(db).await?;
    tracing::info!(submission_id = %id, "Car submission deleted");
    Ok(())
}

/// Approves a pending submission and materializes its listing.
///
/// Manager resolution, the listing insert and the status change share one
/// transaction: either the submission is approved with its car, or nothing
/// is written.
pub async fn approve(
    db: &DatabaseConnection,
    principal: &Principal,
    policy: &ManagerAssignment,
    id: Uuid,
    approval: Approval,
) -> AppResult<(car_submission::Model, car::Model)> {
    access::authorize(principal, Operation::ReviewSubmission)?;

    let txn = db.begin().await?;

    let submission = find(&txn, id).await?;
    submission.status.ensure_pending(WHAT)?;

    let manager_id = match approval.manager_id {
        Some(manager_id) => assignment::require_active_manager(&txn, manager_id).await?,
        None => policy.pick(&txn).await?,
    };

    let listing = insert_listing(&txn, &submission.details, submission.user_id, manager_id).await?;

    let now = now_tz();
    decide(
        &txn,
        id,
        car_submission::ActiveModel {
            status: Set(ReviewStatus::Approved),
            admin_feedback: Set(optional_text(approval.feedback)),
            car_id: Set(Some(listing.id)),
            reviewed_by: Set(Some(principal.id)),
            reviewed_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        },
    )
    .await?;
    let approved = find(&txn, id).await?;

    txn.commit().await?;

    tracing::info!(
        submission_id = %id,
        car_id = %listing.id,
        manager_id = %manager_id,
        "Car submission approved"
    );
    Ok((approved, listing))
}

pub async fn reject(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
    feedback: &str,
) -> AppResult<car_submission::Model> {
    access::authorize(principal, Operation::ReviewSubmission)?;
    let feedback = required_text(feedback, "Feedback")?;

    let submission = find(db, id).await?;
    submission.status.ensure_pending(WHAT)?;

    let now = now_tz();
    decide(
        db,
        id,
        car_submission::ActiveModel {
            status: Set(ReviewStatus::Rejected),
            admin_feedback: Set(Some(feedback)),
            reviewed_by: Set(Some(principal.id)),
            reviewed_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        },
    )
    .await?;

    tracing::info!(submission_id = %id, "Car submission rejected");
    find(db, id).await
}

/// Writes the set fields only if the row is still pending.
async fn decide<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    decision: car_submission::ActiveModel,
) -> AppResult<()> {
    let result = car_submission::Entity::update_many()
        .set(decision)
        .filter(car_submission::Column::Id.eq(id))
        .filter(car_submission::Column::Status.eq(ReviewStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(already_processed());
    }
    Ok(())
}

async fn find<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<car_submission::Model> {
    car_submission::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car submission not found".to_string()))
}

fn already_processed() -> AppError {
    AppError::Conflict(format!("{} has already been processed", WHAT))
}
