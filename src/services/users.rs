use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::access::{self, Operation, Principal};
use crate::entities::user::{self, OtpType, UserRole, UserStatus};
use crate::entities::{car, test_drive_request, ReviewStatus};
use crate::error::{AppError, AppResult};
use crate::services::otp::{self, normalize_email, OtpGrant};
use crate::services::{bounded_text, now_tz};
use crate::utils::{mailer, password};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl NewAccount {
    fn validate(&self) -> AppResult<(String, String)> {
        let email = normalize_email(&self.email);
        if !looks_like_email(&email) || email.chars().count() > MAX_EMAIL_LEN {
            return Err(AppError::BadRequest("A valid email is required".to_string()));
        }
        validate_password(&self.password)?;
        let name = bounded_text(&self.name, "Name", MAX_NAME_LEN)?;
        Ok((email, name))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Creates an inactive `user` account and sends its verification code.
pub async fn register(
    db: &DatabaseConnection,
    account: NewAccount,
    now: DateTime<Utc>,
    otp_ttl_seconds: i64,
) -> AppResult<(user::Model, OtpGrant)> {
    let (email, name) = account.validate()?;
    ensure_email_free(db, &email).await?;

    let grant = OtpGrant::new(OtpType::EmailVerification, now, otp_ttl_seconds);
    let mut new_user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        name: Set(name),
        password_hash: Set(password::hash_password(&account.password)?),
        role: Set(UserRole::User),
        status: Set(UserStatus::Inactive),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };
    grant.apply(&mut new_user);

    let created = new_user.insert(db).await?;
    mailer::send_otp(&created.email, &grant.code, grant.otp_type, grant.expires_at);
    tracing::info!(user_id = %created.id, "Account registered, awaiting email verification");

    Ok((created, grant))
}

/// Checks credentials; inactive accounts are refused even with the right password.
pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password_attempt: &str,
) -> AppResult<user::Model> {
    let account = otp::find_by_email(db, email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !password::verify_password(password_attempt, &account.password_hash)? {
        return Err(invalid_credentials());
    }

    if account.status != UserStatus::Active {
        return Err(AppError::Forbidden("Account is not verified".to_string()));
    }

    Ok(account)
}

/// Issues a password-reset code. Unknown emails are ignored silently.
pub async fn request_password_reset(
    db: &DatabaseConnection,
    email: &str,
    now: DateTime<Utc>,
    otp_ttl_seconds: i64,
) -> AppResult<()> {
    match otp::resend(db, email, OtpType::PasswordReset, now, otp_ttl_seconds).await {
        Ok(_) | Err(AppError::NotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

pub async fn reset_password(
    db: &DatabaseConnection,
    email: &str,
    code: &str,
    new_password: &str,
    now: DateTime<Utc>,
) -> AppResult<user::Model> {
    validate_password(new_password)?;
    let account = otp::consume(db, email, code, OtpType::PasswordReset, now).await?;

    let mut active: user::ActiveModel = account.into();
    active.password_hash = Set(password::hash_password(new_password)?);
    otp::clear(&mut active);
    active.updated_at = Set(now.into());
    let updated = active.update(db).await?;

    tracing::info!(user_id = %updated.id, "Password reset");
    Ok(updated)
}

pub async fn get(db: &DatabaseConnection, id: Uuid) -> AppResult<user::Model> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn update_profile(
    db: &DatabaseConnection,
    principal: &Principal,
    target: Uuid,
    changes: ProfileChanges,
) -> AppResult<user::Model> {
    access::authorize_self(principal, target)?;
    let account = get(db, target).await?;

    let mut active: user::ActiveModel = account.into();
    if let Some(name) = changes.name {
        active.name = Set(bounded_text(&name, "Name", MAX_NAME_LEN)?);
    }
    if let Some(new_password) = changes.password {
        validate_password(&new_password)?;
        active.password_hash = Set(password::hash_password(&new_password)?);
    }
    active.updated_at = Set(now_tz());

    Ok(active.update(db).await?)
}

// ============ Administration ============

pub async fn list(
    db: &DatabaseConnection,
    principal: &Principal,
    role: Option<UserRole>,
) -> AppResult<Vec<user::Model>> {
    access::authorize(principal, Operation::ManageUsers)?;

    let mut query = user::Entity::find().order_by_asc(user::Column::CreatedAt);
    if let Some(role) = role {
        query = query.filter(user::Column::Role.eq(role));
    }
    Ok(query.all(db).await?)
}

/// Creates an already-active staff account.
pub async fn create_staff(
    db: &DatabaseConnection,
    principal: &Principal,
    account: NewAccount,
    role: UserRole,
) -> AppResult<user::Model> {
    access::authorize(principal, Operation::ManageUsers)?;
    if role == UserRole::User {
        return Err(AppError::BadRequest(
            "Staff accounts must be manager or admin".to_string(),
        ));
    }

    let (email, name) = account.validate()?;
    ensure_email_free(db, &email).await?;

    let now = now_tz();
    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        name: Set(name),
        password_hash: Set(password::hash_password(&account.password)?),
        role: Set(role),
        status: Set(UserStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = %created.id, role = access::role_name(role), "Staff account created");
    Ok(created)
}

pub async fn set_role(
    db: &DatabaseConnection,
    principal: &Principal,
    target: Uuid,
    role: UserRole,
) -> AppResult<user::Model> {
    access::authorize(principal, Operation::ManageUsers)?;
    let account = get(db, target).await?;

    if account.role == UserRole::Manager && role != UserRole::Manager {
        ensure_no_manager_duties(db, account.id, true).await?;
    }

    let mut active: user::ActiveModel = account.into();
    active.role = Set(role);
    active.updated_at = Set(now_tz());
    Ok(active.update(db).await?)
}

pub async fn set_status(
    db: &DatabaseConnection,
    principal: &Principal,
    target: Uuid,
    status: UserStatus,
) -> AppResult<user::Model> {
    access::authorize(principal, Operation::ManageUsers)?;
    let account = get(db, target).await?;

    // An inactive manager cannot log in to handle what is still routed to them
    if account.role == UserRole::Manager && status == UserStatus::Inactive {
        ensure_no_manager_duties(db, account.id, true).await?;
    }

    let mut active: user::ActiveModel = account.into();
    active.status = Set(status);
    active.updated_at = Set(now_tz());
    Ok(active.update(db).await?)
}

/// Deletes an account; owned cars, submissions and requests cascade.
pub async fn delete(db: &DatabaseConnection, principal: &Principal, target: Uuid) -> AppResult<()> {
    access::authorize(principal, Operation::ManageUsers)?;
    if principal.id == target {
        return Err(AppError::BadRequest("You cannot delete your own account".to_string()));
    }

    let account = get(db, target).await?;
    if account.role == UserRole::Manager {
        ensure_no_manager_duties(db, account.id, false).await?;
    }

    user::Entity::delete_by_id(target).exec(db).await?;
    tracing::info!(user_id = %target, "Account deleted");
    Ok(())
}

/// Creates the bootstrap admin if no account uses `email` yet.
pub async fn seed_admin(db: &DatabaseConnection, email: &str, raw_password: &str) -> AppResult<bool> {
    let email = normalize_email(email);
    if otp::find_by_email(db, &email).await?.is_some() {
        return Ok(false);
    }

    let now = now_tz();
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.clone()),
        name: Set("Admin".to_string()),
        password_hash: Set(password::hash_password(raw_password)?),
        role: Set(UserRole::Admin),
        status: Set(UserStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Admin account created: {}", email);
    Ok(true)
}

/// A manager still holding cars or requests cannot be removed, demoted or
/// deactivated. Demotion and deactivation only look at pending requests;
/// deletion looks at all of them.
async fn ensure_no_manager_duties(
    db: &DatabaseConnection,
    manager_id: Uuid,
    pending_only: bool,
) -> AppResult<()> {
    let cars = car::Entity::find()
        .filter(car::Column::ManagerId.eq(manager_id))
        .count(db)
        .await?;

    let mut requests = test_drive_request::Entity::find()
        .filter(test_drive_request::Column::ManagerId.eq(manager_id));
    if pending_only {
        requests = requests.filter(test_drive_request::Column::Status.eq(ReviewStatus::Pending));
    }
    let requests = requests.count(db).await?;

    if cars > 0 || requests > 0 {
        return Err(AppError::Conflict(format!(
            "Manager still has {} assigned cars and {} test-drive requests; reassign them first",
            cars, requests
        )));
    }
    Ok(())
}

async fn ensure_email_free(db: &DatabaseConnection, email: &str) -> AppResult<()> {
    if otp::find_by_email(db, email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}
