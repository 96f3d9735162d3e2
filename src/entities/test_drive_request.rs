use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::status::ReviewStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test_drive_request")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub car_id: Uuid,
    /// Copied from the car when the request is created
    pub manager_id: Uuid,
    pub preferred_date: Date,
    pub time_slot: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,
    pub status: ReviewStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub latest_message: Option<String>,
    pub latest_message_sender_id: Option<Uuid>,
    pub latest_message_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    Requester,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ManagerId",
        to = "super::user::Column::Id"
    )]
    Manager,
    #[sea_orm(
        belongs_to = "super::car::Entity",
        from = "Column::CarId",
        to = "super::car::Column::Id"
    )]
    Car,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requester.def()
    }
}

impl Related<super::car::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Car.def()
    }
}

impl Model {
    /// Requester and assigned manager; admins are handled by the access layer.
    pub fn parties(&self) -> [Uuid; 2] {
        [self.user_id, self.manager_id]
    }
}

impl ActiveModelBehavior for ActiveModel {}
