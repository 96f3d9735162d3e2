use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::access::Principal;
use crate::entities::car_submission::{self, CarDetails};
use crate::entities::{car, ReviewStatus};
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::services::submissions::{self, Approval};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<ReviewStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveSubmissionRequest {
    pub feedback: Option<String>,
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RejectSubmissionRequest {
    pub feedback: String,
}

#[derive(Debug, Serialize)]
pub struct ApprovedSubmissionResponse {
    pub submission: car_submission::Model,
    pub car: car::Model,
}

/// Propose a car for sale
pub async fn create_submission(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(details): AppJson<CarDetails>,
) -> AppResult<(StatusCode, Json<car_submission::Model>)> {
    let submission = submissions::create(&state.db, &Principal::from(&claims), details).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// Own submissions, or all of them for admins
pub async fn list_submissions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppQuery(filter): AppQuery<StatusFilter>,
) -> AppResult<Json<Vec<car_submission::Model>>> {
    let items = submissions::list(&state.db, &Principal::from(&claims), filter.status).await?;
    Ok(Json(items))
}

pub async fn get_submission(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<car_submission::Model>> {
    let submission = submissions::get(&state.db, &Principal::from(&claims), id).await?;
    Ok(Json(submission))
}

pub async fn update_submission(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
    AppJson(details): AppJson<CarDetails>,
) -> AppResult<Json<car_submission::Model>> {
    let submission =
        submissions::update_details(&state.db, &Principal::from(&claims), id, details).await?;
    Ok(Json(submission))
}

pub async fn delete_submission(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    submissions::delete(&state.db, &Principal::from(&claims), id).await?;
    Ok(Json(json!({ "message": "Car submission deleted" })))
}

/// Approve a pending submission and publish its listing (admin)
pub async fn approve_submission(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
    payload: Option<AppJson<ApproveSubmissionRequest>>,
) -> AppResult<Json<ApprovedSubmissionResponse>> {
    let payload = payload.map(|AppJson(p)| p).unwrap_or_default();

    let (submission, car) = submissions::approve(
        &state.db,
        &Principal::from(&claims),
        &state.config.manager_assignment,
        id,
        Approval {
            feedback: payload.feedback,
            manager_id: payload.manager_id,
        },
    )
    .await?;

    Ok(Json(ApprovedSubmissionResponse { submission, car }))
}

/// Reject a pending submission with feedback (admin)
pub async fn reject_submission(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<RejectSubmissionRequest>,
) -> AppResult<Json<car_submission::Model>> {
    let submission =
        submissions::reject(&state.db, &Principal::from(&claims), id, &payload.feedback).await?;
    Ok(Json(submission))
}
