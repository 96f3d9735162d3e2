//! Role and ownership checks.
//!
//! Every decision is a pure comparison between the acting principal and the
//! target resource; nothing here touches the database.

use uuid::Uuid;

use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: UserRole,
}

impl Principal {
    pub fn new(id: Uuid, role: UserRole) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&Claims> for Principal {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateSubmission,
    ReviewSubmission,
    CreateTestDrive,
    ReviewTestDrive,
    PublishListing,
    ManageListing,
    ManageUsers,
    SweepOtp,
}

impl Operation {
    /// Roles allowed besides admin.
    pub fn allowed_roles(self) -> &'static [UserRole] {
        match self {
            Operation::CreateSubmission | Operation::CreateTestDrive => &[UserRole::User],
            Operation::ReviewTestDrive | Operation::PublishListing | Operation::ManageListing => {
                &[UserRole::Manager]
            }
            Operation::ReviewSubmission | Operation::ManageUsers | Operation::SweepOtp => &[],
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Operation::CreateSubmission => "create car submissions",
            Operation::ReviewSubmission => "review car submissions",
            Operation::CreateTestDrive => "request test drives",
            Operation::ReviewTestDrive => "review test drives",
            Operation::PublishListing => "publish listings",
            Operation::ManageListing => "manage listings",
            Operation::ManageUsers => "manage users",
            Operation::SweepOtp => "run maintenance",
        }
    }
}

/// Role gate: admin always passes, others must be in the operation's allow-list.
pub fn authorize(principal: &Principal, operation: Operation) -> AppResult<()> {
    if principal.is_admin() || operation.allowed_roles().contains(&principal.role) {
        return Ok(());
    }

    Err(AppError::Forbidden(format!(
        "Role '{}' is not allowed to {}",
        role_name(principal.role),
        operation.describe()
    )))
}

/// Ownership gate: admin always passes, others must be one of `parties`.
pub fn authorize_party(principal: &Principal, parties: &[Uuid]) -> AppResult<()> {
    if principal.is_admin() || parties.contains(&principal.id) {
        return Ok(());
    }

    Err(AppError::Forbidden(
        "You do not have access to this resource".to_string(),
    ))
}

/// Self-service gate for profile edits.
pub fn authorize_self(principal: &Principal, target_user: Uuid) -> AppResult<()> {
    if principal.is_admin() || principal.id == target_user {
        return Ok(());
    }

    Err(AppError::Forbidden(
        "You can only modify your own account".to_string(),
    ))
}

pub fn role_name(role: UserRole) -> &'static str {
    match role {
        UserRole::User => "user",
        UserRole::Manager => "manager",
        UserRole::Admin => "admin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: UserRole) -> Principal {
        Principal::new(Uuid::new_v4(), role)
    }

    #[test]
    fn admin_passes_every_operation() {
        let admin = principal(UserRole::Admin);
        for op in [
            Operation::CreateSubmission,
            Operation::ReviewSubmission,
            Operation::CreateTestDrive,
            Operation::ReviewTestDrive,
            Operation::PublishListing,
            Operation::ManageListing,
            Operation::ManageUsers,
            Operation::SweepOtp,
        ] {
            assert!(authorize(&admin, op).is_ok(), "{:?}", op);
        }
    }

    #[test]
    fn role_allow_lists() {
        let user = principal(UserRole::User);
        let manager = principal(UserRole::Manager);

        assert!(authorize(&user, Operation::CreateSubmission).is_ok());
        assert!(authorize(&user, Operation::CreateTestDrive).is_ok());
        assert!(authorize(&user, Operation::ReviewSubmission).is_err());
        assert!(authorize(&user, Operation::ReviewTestDrive).is_err());
        assert!(authorize(&user, Operation::PublishListing).is_err());

        assert!(authorize(&manager, Operation::ReviewTestDrive).is_ok());
        assert!(authorize(&manager, Operation::PublishListing).is_ok());
        assert!(authorize(&manager, Operation::CreateSubmission).is_err());
        assert!(authorize(&manager, Operation::ReviewSubmission).is_err());
        assert!(authorize(&manager, Operation::ManageUsers).is_err());
    }

    #[test]
    fn denial_is_forbidden_and_names_the_role() {
        match authorize(&principal(UserRole::Manager), Operation::ReviewSubmission) {
            Err(AppError::Forbidden(msg)) => assert!(msg.contains("manager")),
            other => panic!("expected forbidden, got {:?}", other),
        }
    }

    #[test]
    fn party_check() {
        let requester = principal(UserRole::User);
        let assigned = principal(UserRole::Manager);
        let other_manager = principal(UserRole::Manager);
        let parties = [requester.id, assigned.id];

        assert!(authorize_party(&requester, &parties).is_ok());
        assert!(authorize_party(&assigned, &parties).is_ok());
        assert!(authorize_party(&principal(UserRole::Admin), &parties).is_ok());
        assert!(matches!(
            authorize_party(&other_manager, &parties),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn self_service() {
        let me = principal(UserRole::User);
        assert!(authorize_self(&me, me.id).is_ok());
        assert!(authorize_self(&me, Uuid::new_v4()).is_err());
        assert!(authorize_self(&principal(UserRole::Admin), me.id).is_ok());
    }
}
