use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::access::Principal;
use crate::entities::test_drive_request;
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::handlers::submissions::StatusFilter;
use crate::services::test_drives::{self, NewTestDrive};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTestDriveRequest {
    pub car_id: Uuid,
    pub preferred_date: NaiveDate,
    pub time_slot: String,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveTestDriveRequest {
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectTestDriveRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

/// Ask for a test drive; the car's manager is assigned to the request
pub async fn create_test_drive(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateTestDriveRequest>,
) -> AppResult<(StatusCode, Json<test_drive_request::Model>)> {
    let request = test_drives::create(
        &state.db,
        &Principal::from(&claims),
        NewTestDrive {
            car_id: payload.car_id,
            preferred_date: payload.preferred_date,
            time_slot: payload.time_slot,
            message: payload.message,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

/// Role-scoped list: own requests, assigned requests, or everything for admins
pub async fn list_test_drives(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppQuery(filter): AppQuery<StatusFilter>,
) -> AppResult<Json<Vec<test_drive_request::Model>>> {
    let items = test_drives::list(&state.db, &Principal::from(&claims), filter.status).await?;
    Ok(Json(items))
}

pub async fn get_test_drive(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<test_drive_request::Model>> {
    let request = test_drives::get(&state.db, &Principal::from(&claims), id).await?;
    Ok(Json(request))
}

/// Approve (assigned manager)
pub async fn approve_test_drive(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
    payload: Option<AppJson<ApproveTestDriveRequest>>,
) -> AppResult<Json<test_drive_request::Model>> {
    let payload = payload.map(|AppJson(p)| p).unwrap_or_default();
    let request =
        test_drives::approve(&state.db, &Principal::from(&claims), id, payload.note).await?;
    Ok(Json(request))
}

/// Reject with a reason (assigned manager)
pub async fn reject_test_drive(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<RejectTestDriveRequest>,
) -> AppResult<Json<test_drive_request::Model>> {
    let request =
        test_drives::reject(&state.db, &Principal::from(&claims), id, &payload.reason).await?;
    Ok(Json(request))
}

/// Replace the latest message on the request
pub async fn post_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<MessageRequest>,
) -> AppResult<Json<test_drive_request::Model>> {
    let request =
        test_drives::post_message(&state.db, &Principal::from(&claims), id, &payload.message)
            .await?;
    Ok(Json(request))
}

pub async fn cancel_test_drive(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    test_drives::cancel(&state.db, &Principal::from(&claims), id).await?;
    Ok(Json(json!({ "message": "Test-drive request cancelled" })))
}
