use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::entities::user::{self, UserRole, UserStatus};
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::services::users::{self, NewAccount};
use crate::utils::jwt::create_token;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserInfo,
    pub otp_expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub status: UserStatus,
}

impl From<user::Model> for UserInfo {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            status: u.status,
        }
    }
}

/// Register a new buyer account; it stays inactive until the emailed OTP is verified
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let (user, grant) = users::register(
        &state.db,
        NewAccount {
            email: payload.email,
            password: payload.password,
            name: payload.name,
        },
        Utc::now(),
        state.config.otp_ttl_seconds,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful, check your email for the verification code"
                .to_string(),
            user: user.into(),
            otp_expires_at: grant.expires_at,
        }),
    ))
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = users::authenticate(&state.db, &payload.email, &payload.password).await?;

    let token = create_token(
        user.id,
        &user.email,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// Send a password-reset code; the response never reveals whether the email exists
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    users::request_password_reset(
        &state.db,
        &payload.email,
        Utc::now(),
        state.config.otp_ttl_seconds,
    )
    .await?;

    Ok(Json(json!({
        "message": "If the account exists, a reset code has been sent"
    })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    users::reset_password(
        &state.db,
        &payload.email,
        &payload.code,
        &payload.new_password,
        Utc::now(),
    )
    .await?;

    Ok(Json(json!({ "message": "Password updated" })))
}
