use axum::{
    extract::State,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::Principal;
use crate::entities::user::OtpType;
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath};
use crate::handlers::auth::UserInfo;
use crate::services::otp;
use crate::services::users::{self, ProfileChanges};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendOtpRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub message: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct ResendOtpResponse {
    pub message: String,
    pub otp_expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Confirm the emailed code and activate the account
pub async fn verify_otp(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyOtpRequest>,
) -> AppResult<Json<VerifyOtpResponse>> {
    let user = otp::verify_email(&state.db, &payload.email, &payload.code, Utc::now()).await?;

    Ok(Json(VerifyOtpResponse {
        message: "Email verified".to_string(),
        user: user.into(),
    }))
}

/// Issue a fresh verification code
pub async fn resend_otp(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResendOtpRequest>,
) -> AppResult<Json<ResendOtpResponse>> {
    let grant = otp::resend(
        &state.db,
        &payload.email,
        OtpType::EmailVerification,
        Utc::now(),
        state.config.otp_ttl_seconds,
    )
    .await?;

    Ok(Json(ResendOtpResponse {
        message: "Verification code sent".to_string(),
        otp_expires_at: grant.expires_at,
    }))
}

/// Profile of the logged-in user
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<UserInfo>> {
    let user = users::get(&state.db, claims.sub).await?;
    Ok(Json(user.into()))
}

/// Update a profile (own account, or any account for admins)
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<UserInfo>> {
    let user = users::update_profile(
        &state.db,
        &Principal::from(&claims),
        id,
        ProfileChanges {
            name: payload.name,
            password: payload.password,
        },
    )
    .await?;

    Ok(Json(user.into()))
}
