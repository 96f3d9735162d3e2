use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_cars::Car;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CarSubmission::Table)
                    .if_not_exists()
                    .col(uuid(CarSubmission::Id).primary_key())
                    .col(uuid(CarSubmission::UserId).not_null())
                    .col(json(CarSubmission::Details).not_null())
                    .col(string_len(CarSubmission::Status, 16).not_null())
                    .col(text_null(CarSubmission::AdminFeedback))
                    .col(uuid_null(CarSubmission::CarId))
                    .col(uuid_null(CarSubmission::ReviewedBy))
                    .col(timestamp_with_time_zone_null(CarSubmission::ReviewedAt))
                    .col(
                        timestamp_with_time_zone(CarSubmission::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(CarSubmission::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_car_submission_user")
                            .from(CarSubmission::Table, CarSubmission::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_car_submission_car")
                            .from(CarSubmission::Table, CarSubmission::CarId)
                            .to(Car::Table, Car::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_car_submission_reviewer")
                            .from(CarSubmission::Table, CarSubmission::ReviewedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_car_submission_status")
                    .table(CarSubmission::Table)
                    .col(CarSubmission::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CarSubmission::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum CarSubmission {
    Table,
    Id,
    UserId,
    Details,
    Status,
    AdminFeedback,
    CarId,
    ReviewedBy,
    ReviewedAt,
    CreatedAt,
    UpdatedAt,
}
