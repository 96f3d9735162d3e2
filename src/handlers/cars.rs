use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::access::Principal;
use crate::entities::car;
use crate::entities::car_submission::CarDetails;
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::services::cars::{self, CarChanges, CarFilter, CarPage};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCarRequest {
    #[serde(flatten)]
    pub details: CarDetails,
    /// Only honoured for admins; managers always manage their own listings
    pub manager_id: Option<Uuid>,
}

/// Browse listings
pub async fn list_cars(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<CarFilter>,
) -> AppResult<Json<CarPage>> {
    Ok(Json(cars::list(&state.db, filter).await?))
}

/// Get listing details
pub async fn get_car(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<car::Model>> {
    Ok(Json(cars::get(&state.db, id).await?))
}

/// Publish a listing (manager/admin)
pub async fn create_car(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateCarRequest>,
) -> AppResult<(StatusCode, Json<car::Model>)> {
    let listing = cars::create(
        &state.db,
        &Principal::from(&claims),
        &state.config.manager_assignment,
        payload.details,
        payload.manager_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(listing)))
}

/// Update a listing (assigned manager/admin)
pub async fn update_car(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<CarChanges>,
) -> AppResult<Json<car::Model>> {
    let listing = cars::update(&state.db, &Principal::from(&claims), id, payload).await?;
    Ok(Json(listing))
}

/// Remove a listing (assigned manager/admin)
pub async fn delete_car(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    cars::delete(&state.db, &Principal::from(&claims), id).await?;
    Ok(Json(json!({ "message": "Car deleted" })))
}
