use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::access::{self, Operation, Principal};
use crate::entities::user::{self, UserRole, UserStatus};
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::services::otp;
use crate::services::users::{self, NewAccount};
use crate::utils::jwt::Claims;
use crate::AppState;

// ============ User Management ============

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            status: u.status,
            created_at: u.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleFilter {
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: UserStatus,
}

/// List all users, optionally by role (admin)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppQuery(filter): AppQuery<RoleFilter>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let accounts = users::list(&state.db, &Principal::from(&claims), filter.role).await?;
    Ok(Json(accounts.into_iter().map(UserResponse::from).collect()))
}

/// List all managers (admin)
pub async fn list_managers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let managers =
        users::list(&state.db, &Principal::from(&claims), Some(UserRole::Manager)).await?;
    Ok(Json(managers.into_iter().map(UserResponse::from).collect()))
}

/// Create an active manager or admin account (admin)
pub async fn create_staff(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateStaffRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let account = users::create_staff(
        &state.db,
        &Principal::from(&claims),
        NewAccount {
            email: payload.email,
            password: payload.password,
            name: payload.name,
        },
        payload.role,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Update user role (admin)
pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateRoleRequest>,
) -> AppResult<Json<UserResponse>> {
    let updated =
        users::set_role(&state.db, &Principal::from(&claims), user_id, payload.role).await?;
    Ok(Json(updated.into()))
}

/// Activate or deactivate an account (admin)
pub async fn update_user_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> AppResult<Json<UserResponse>> {
    let updated =
        users::set_status(&state.db, &Principal::from(&claims), user_id, payload.status).await?;
    Ok(Json(updated.into()))
}

/// Delete any user account (admin)
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    users::delete(&state.db, &Principal::from(&claims), id).await?;
    Ok(Json(json!({ "message": "User deleted" })))
}

// ============ Maintenance ============

/// Clear expired OTPs now instead of waiting for the background sweep
pub async fn sweep_otps(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<serde_json::Value>> {
    access::authorize(&Principal::from(&claims), Operation::SweepOtp)?;
    let cleared = otp::sweep_expired(&state.db, Utc::now()).await?;
    Ok(Json(json!({ "cleared": cleared })))
}
