//! One-time passwords for email verification and password reset.
//!
//! A user row carries at most one live code together with its purpose and
//! expiry. Verification and password reset consume it; the sweeper clears
//! it once it has expired.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use subtle::ConstantTimeEq;
use tokio::task::JoinHandle;

use crate::entities::user::{self, OtpType, UserStatus};
use crate::error::{AppError, AppResult};
use crate::utils::mailer;

pub const OTP_DIGITS: usize = 6;

const INVALID_OTP: &str = "Invalid or expired OTP";

/// A freshly generated code, not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct OtpGrant {
    pub code: String,
    pub otp_type: OtpType,
    pub expires_at: DateTime<Utc>,
}

impl OtpGrant {
    pub fn new(otp_type: OtpType, now: DateTime<Utc>, ttl_seconds: i64) -> Self {
        Self {
            code: generate_code(),
            otp_type,
            expires_at: now + Duration::seconds(ttl_seconds),
        }
    }

    /// Writes the grant onto an active model, replacing any previous code.
    pub fn apply(&self, active: &mut user::ActiveModel) {
        active.otp_code = Set(Some(self.code.clone()));
        active.otp_type = Set(Some(self.otp_type));
        active.otp_expires_at = Set(Some(self.expires_at.into()));
    }
}

/// Uniform six-digit numeric code.
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    n.to_string()
}

/// Code, purpose and expiry must all hold; `now == expiry` still passes.
pub fn code_is_valid(
    account: &user::Model,
    code: &str,
    otp_type: OtpType,
    now: DateTime<Utc>,
) -> bool {
    match (&account.otp_code, account.otp_type, account.otp_expires_at) {
        (Some(stored), Some(stored_type), Some(expires_at)) => {
            let matches: bool = stored.as_bytes().ct_eq(code.trim().as_bytes()).into();
            matches && stored_type == otp_type && now <= expires_at
        }
        _ => false,
    }
}

pub fn clear(active: &mut user::ActiveModel) {
    active.otp_code = Set(None);
    active.otp_type = Set(None);
    active.otp_expires_at = Set(None);
}

/// Loads the account for `email` if the code is valid; every failure looks the same.
pub async fn consume<C: ConnectionTrait>(
    db: &C,
    email: &str,
    code: &str,
    otp_type: OtpType,
    now: DateTime<Utc>,
) -> AppResult<user::Model> {
    let account = find_by_email(db, email)
        .await?
        .ok_or_else(|| AppError::BadRequest(INVALID_OTP.to_string()))?;

    if !code_is_valid(&account, code, otp_type, now) {
        tracing::debug!(email = %account.email, otp_type = ?otp_type, "OTP check failed");
        return Err(AppError::BadRequest(INVALID_OTP.to_string()));
    }

    Ok(account)
}

/// Activates the account owning `email` and clears its code.
pub async fn verify_email(
    db: &DatabaseConnection,
    email: &str,
    code: &str,
    now: DateTime<Utc>,
) -> AppResult<user::Model> {
    let account = consume(db, email, code, OtpType::EmailVerification, now).await?;

    let mut active: user::ActiveModel = account.into();
    active.status = Set(UserStatus::Active);
    clear(&mut active);
    active.updated_at = Set(now.into());
    let updated = active.update(db).await?;

    tracing::info!(user_id = %updated.id, "Email verified, account activated");
    Ok(updated)
}

/// Issues a new code for an existing email, whatever the account status.
pub async fn resend(
    db: &DatabaseConnection,
    email: &str,
    otp_type: OtpType,
    now: DateTime<Utc>,
    ttl_seconds: i64,
) -> AppResult<OtpGrant> {
    let account = find_by_email(db, email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if otp_type == OtpType::EmailVerification && account.status == UserStatus::Active {
        tracing::warn!(user_id = %account.id, "Verification OTP re-issued for an already active account");
    }

    let grant = OtpGrant::new(otp_type, now, ttl_seconds);
    let mut active: user::ActiveModel = account.into();
    grant.apply(&mut active);
    active.updated_at = Set(now.into());
    let updated = active.update(db).await?;

    mailer::send_otp(&updated.email, &grant.code, grant.otp_type, grant.expires_at);
    Ok(grant)
}

/// Clears every code whose expiry is before `now`. Returns the rows touched.
pub async fn sweep_expired<C: ConnectionTrait>(db: &C, now: DateTime<Utc>) -> AppResult<u64> {
    let cutoff: sea_orm::prelude::DateTimeWithTimeZone = now.into();

    let result = user::Entity::update_many()
        .set(user::ActiveModel {
            otp_code: Set(None),
            otp_type: Set(None),
            otp_expires_at: Set(None),
            ..Default::default()
        })
        .filter(user::Column::OtpExpiresAt.is_not_null())
        .filter(user::Column::OtpExpiresAt.lt(cutoff))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        tracing::info!(cleared = result.rows_affected, "Expired OTPs swept");
    }

    Ok(result.rows_affected)
}

/// Runs [`sweep_expired`] on a fixed interval for the lifetime of the process.
pub fn spawn_sweeper(db: DatabaseConnection, every: StdDuration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_expired(&db, Utc::now()).await {
                tracing::warn!(error = %e, "OTP sweep failed");
            }
        }
    })
}

pub(crate) async fn find_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> AppResult<Option<user::Model>> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
