use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::entities::car;
use crate::entities::user::{self, UserRole, UserStatus};
use crate::error::{AppError, AppResult};

/// How a manager is chosen for a listing that has none yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerAssignment {
    /// Earliest-created active manager.
    FirstAvailable,
    /// Active manager with the fewest assigned cars; ties go to the earliest.
    LeastLoaded,
    /// Always this manager.
    Fixed(Uuid),
}

impl ManagerAssignment {
    pub async fn pick<C: ConnectionTrait>(&self, db: &C) -> AppResult<Uuid> {
        match self {
            ManagerAssignment::Fixed(id) => require_active_manager(db, *id).await,
            ManagerAssignment::FirstAvailable => active_managers(db)
                .await?
                .first()
                .map(|m| m.id)
                .ok_or_else(no_manager),
            ManagerAssignment::LeastLoaded => {
                let managers = active_managers(db).await?;
                if managers.is_empty() {
                    return Err(no_manager());
                }

                let ids: Vec<Uuid> = managers.iter().map(|m| m.id).collect();
                let cars = car::Entity::find()
                    .filter(car::Column::ManagerId.is_in(ids))
                    .all(db)
                    .await?;

                let mut load: HashMap<Uuid, usize> = HashMap::new();
                for c in &cars {
                    *load.entry(c.manager_id).or_default() += 1;
                }

                // min_by_key keeps the first minimum, and managers are ordered oldest first
                managers
                    .iter()
                    .min_by_key(|m| load.get(&m.id).copied().unwrap_or(0))
                    .map(|m| m.id)
                    .ok_or_else(no_manager)
            }
        }
    }
}

/// Checks that `id` names an active manager account.
pub async fn require_active_manager<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Uuid> {
    let candidate = user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Manager not found".to_string()))?;

    if candidate.role != UserRole::Manager || candidate.status != UserStatus::Active {
        return Err(AppError::BadRequest(
            "Assigned user must be an active manager".to_string(),
        ));
    }

    Ok(candidate.id)
}

async fn active_managers<C: ConnectionTrait>(db: &C) -> AppResult<Vec<user::Model>> {
    Ok(user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Manager))
        .filter(user::Column::Status.eq(UserStatus::Active))
        .order_by_asc(user::Column::CreatedAt)
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?)
}

fn no_manager() -> AppError {
    AppError::Conflict("No active manager is available to assign".to_string())
}

impl FromStr for ManagerAssignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_available" => Ok(ManagerAssignment::FirstAvailable),
            "least_loaded" => Ok(ManagerAssignment::LeastLoaded),
            other => match other.strip_prefix("fixed:") {
                Some(id) => Uuid::parse_str(id)
                    .map(ManagerAssignment::Fixed)
                    .map_err(|e| format!("bad manager id: {}", e)),
                None => Err(format!(
                    "expected first_available, least_loaded or fixed:<uuid>, got '{}'",
                    other
                )),
            },
        }
    }
}

impl fmt::Display for ManagerAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerAssignment::FirstAvailable => write!(f, "first_available"),
            ManagerAssignment::LeastLoaded => write!(f, "least_loaded"),
            ManagerAssignment::Fixed(id) => write!(f, "fixed:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints_every_policy() {
        let id = Uuid::new_v4();
        for policy in [
            ManagerAssignment::FirstAvailable,
            ManagerAssignment::LeastLoaded,
            ManagerAssignment::Fixed(id),
        ] {
            assert_eq!(policy.to_string().parse::<ManagerAssignment>(), Ok(policy));
        }
    }

    #[test]
    fn rejects_unknown_policies() {
        assert!("round_robin".parse::<ManagerAssignment>().is_err());
        assert!("fixed:not-a-uuid".parse::<ManagerAssignment>().is_err());
    }
}
