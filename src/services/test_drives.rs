//! Test-drive requests: a user asks for a slot on a listing, the manager
//! assigned to that listing decides.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::access::{self, Operation, Principal};
use crate::entities::test_drive_request;
use crate::entities::user::UserRole;
use crate::entities::ReviewStatus;
use crate::error::{AppError, AppResult};
use crate::services::{bounded_text, cars, now_tz, optional_text, required_text};

const WHAT: &str = "Test-drive request";

/// Width of the time-slot column.
pub const MAX_TIME_SLOT_LEN: usize = 50;

#[derive(Debug, Clone)]
pub struct NewTestDrive {
    pub car_id: Uuid,
    pub preferred_date: NaiveDate,
    pub time_slot: String,
    pub message: Option<String>,
}

pub async fn create(
    db: &DatabaseConnection,
    principal: &Principal,
    request: NewTestDrive,
) -> AppResult<test_drive_request::Model> {
    access::authorize(principal, Operation::CreateTestDrive)?;

    let listing = cars::get(db, request.car_id).await?;
    if !listing.is_available {
        return Err(AppError::BadRequest(
            "Car is not available for test drives".to_string(),
        ));
    }
    if request.preferred_date < Utc::now().date_naive() {
        return Err(AppError::BadRequest(
            "Preferred date cannot be in the past".to_string(),
        ));
    }
    let time_slot = bounded_text(&request.time_slot, "Time slot", MAX_TIME_SLOT_LEN)?;

    let open = test_drive_request::Entity::find()
        .filter(test_drive_request::Column::UserId.eq(principal.id))
        .filter(test_drive_request::Column::CarId.eq(listing.id))
        .filter(test_drive_request::Column::Status.eq(ReviewStatus::Pending))
        .one(db)
        .await?;
    if open.is_some() {
        return Err(AppError::Conflict(
            "You already have a pending test-drive request for this car".to_string(),
        ));
    }

    let now = now_tz();
    let created = test_drive_request::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(principal.id),
        car_id: Set(listing.id),
        manager_id: Set(listing.manager_id),
        preferred_date: Set(request.preferred_date),
        time_slot: Set(time_slot),
        message: Set(optional_text(request.message)),
        status: Set(ReviewStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(
        request_id = %created.id,
        car_id = %created.car_id,
        manager_id = %created.manager_id,
        "Test-drive request created"
    );
    Ok(created)
}

/// Admins see everything, managers their assigned requests, users their own.
pub async fn list(
    db: &DatabaseConnection,
    principal: &Principal,
    status: Option<ReviewStatus>,
) -> AppResult<Vec<test_drive_request::Model>> {
    let mut query =
        test_drive_request::Entity::find().order_by_desc(test_drive_request::Column::CreatedAt);

    query = match principal.role {
        UserRole::Admin => query,
        UserRole::Manager => query.filter(test_drive_request::Column::ManagerId.eq(principal.id)),
        UserRole::User => query.filter(test_drive_request::Column::UserId.eq(principal.id)),
    };
    if let Some(status) = status {
        query = query.filter(test_drive_request::Column::Status.eq(status));
    }

    Ok(query.all(db).await?)
}

pub async fn get(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
) -> AppResult<test_drive_request::Model> {
    let request = find(db, id).await?;
    access::authorize_party(principal, &request.parties())?;
    Ok(request)
}

pub async fn approve(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
    note: Option<String>,
) -> AppResult<test_drive_request::Model> {
    let request = find_for_review(db, principal, id).await?;
    request.status.ensure_pending(WHAT)?;

    decide(
        db,
        id,
        test_drive_request::ActiveModel {
            status: Set(ReviewStatus::Approved),
            note: Set(optional_text(note)),
            updated_at: Set(now_tz()),
            ..Default::default()
        },
    )
    .await?;

    tracing::info!(request_id = %id, manager_id = %principal.id, "Test-drive request approved");
    find(db, id).await
}

pub async fn reject(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
    reason: &str,
) -> AppResult<test_drive_request::Model> {
    let reason = required_text(reason, "Rejection reason")?;
    let request = find_for_review(db, principal, id).await?;
    request.status.ensure_pending(WHAT)?;

    decide(
        db,
        id,
        test_drive_request::ActiveModel {
            status: Set(ReviewStatus::Rejected),
            rejection_reason: Set(Some(reason)),
            updated_at: Set(now_tz()),
            ..Default::default()
        },
    )
    .await?;

    tracing::info!(request_id = %id, manager_id = %principal.id, "Test-drive request rejected");
    find(db, id).await
}

/// Overwrites the single latest-message slot; earlier messages are not kept.
pub async fn post_message(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
    text: &str,
) -> AppResult<test_drive_request::Model> {
    let text = required_text(text, "Message")?;
    let request = find(db, id).await?;
    access::authorize_party(principal, &request.parties())?;

    let now = now_tz();
    let mut active: test_drive_request::ActiveModel = request.into();
    active.latest_message = Set(Some(text));
    active.latest_message_sender_id = Set(Some(principal.id));
    active.latest_message_at = Set(Some(now));
    active.updated_at = Set(now);

    Ok(active.update(db).await?)
}

/// Requesters may cancel while pending; admins may always delete.
pub async fn cancel(db: &DatabaseConnection, principal: &Principal, id: Uuid) -> AppResult<()> {
    let request = find(db, id).await?;
    access::authorize_party(principal, &[request.user_id])?;
    if !principal.is_admin() {
        request.status.ensure_pending(WHAT)?;
    }

    test_drive_request::Entity::delete_by_id(id).exec(db).await?;
    tracing::info!(request_id = %id, "Test-drive request cancelled");
    Ok(())
}

/// Role gate plus the assigned-manager check shared by approve and reject.
async fn find_for_review(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
) -> AppResult<test_drive_request::Model> {
    access::authorize(principal, Operation::ReviewTestDrive)?;
    let request = find(db, id).await?;
    if !principal.is_admin() && request.manager_id != principal.id {
        return Err(AppError::Forbidden(
            "Only the assigned manager can review this request".to_string(),
        ));
    }
    Ok(request)
}

async fn decide<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    decision: test_drive_request::ActiveModel,
) -> AppResult<()> {
    let result = test_drive_request::Entity::update_many()
        .set(decision)
        .filter(test_drive_request::Column::Id.eq(id))
        .filter(test_drive_request::Column::Status.eq(ReviewStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(format!(
            "{} has already been processed",
            WHAT
        )));
    }
    Ok(())
}

async fn find<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<test_drive_request::Model> {
    test_drive_request::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Test-drive request not found".to_string()))
}
