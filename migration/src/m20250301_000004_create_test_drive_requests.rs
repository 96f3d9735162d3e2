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
                    .table(TestDriveRequest::Table)
                    .if_not_exists()
                    .col(uuid(TestDriveRequest::Id).primary_key())
                    .col(uuid(TestDriveRequest::UserId).not_null())
                    .col(uuid(TestDriveRequest::CarId).not_null())
                    .col(uuid(TestDriveRequest::ManagerId).not_null())
                    .col(date(TestDriveRequest::PreferredDate).not_null())
                    .col(string_len(TestDriveRequest::TimeSlot, 50).not_null())
                    .col(text_null(TestDriveRequest::Message))
                    .col(string_len(TestDriveRequest::Status, 16).not_null())
                    .col(text_null(TestDriveRequest::RejectionReason))
                    .col(text_null(TestDriveRequest::Note))
                    // Single overwritten slot, not a message log
                    .col(text_null(TestDriveRequest::LatestMessage))
                    .col(uuid_null(TestDriveRequest::LatestMessageSenderId))
                    .col(timestamp_with_time_zone_null(TestDriveRequest::LatestMessageAt))
                    .col(
                        timestamp_with_time_zone(TestDriveRequest::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(TestDriveRequest::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_test_drive_user")
                            .from(TestDriveRequest::Table, TestDriveRequest::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_test_drive_car")
                            .from(TestDriveRequest::Table, TestDriveRequest::CarId)
                            .to(Car::Table, Car::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_test_drive_manager")
                            .from(TestDriveRequest::Table, TestDriveRequest::ManagerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_test_drive_manager")
                    .table(TestDriveRequest::Table)
                    .col(TestDriveRequest::ManagerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TestDriveRequest::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TestDriveRequest {
    Table,
    Id,
    UserId,
    CarId,
    ManagerId,
    PreferredDate,
    TimeSlot,
    Message,
    Status,
    RejectionReason,
    Note,
    LatestMessage,
    LatestMessageSenderId,
    LatestMessageAt,
    CreatedAt,
    UpdatedAt,
}
