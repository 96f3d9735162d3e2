use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Review state shared by car submissions and test-drive requests.
///
/// `Pending` is the only state that accepts a decision; `Approved` and
/// `Rejected` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl ReviewStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            ReviewStatus::Pending => false,
            ReviewStatus::Approved | ReviewStatus::Rejected => true,
        }
    }

    /// Guard run before every transition.
    pub fn ensure_pending(self, what: &str) -> AppResult<()> {
        if self.is_terminal() {
            return Err(AppError::Conflict(format!(
                "{} has already been processed ({})",
                what,
                self.as_str()
            )));
        }
        Ok(())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}
