use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Car::Table)
                    .if_not_exists()
                    .col(uuid(Car::Id).primary_key())
                    .col(string_len(Car::Make, 100).not_null())
                    .col(string_len(Car::Model, 100).not_null())
                    .col(integer(Car::Year).not_null())
                    .col(double(Car::Price).not_null())
                    .col(integer(Car::Mileage).not_null())
                    .col(text_null(Car::Description))
                    .col(json(Car::Images).not_null())
                    .col(json(Car::Features).not_null())
                    .col(uuid(Car::OwnerId).not_null())
                    .col(uuid(Car::ManagerId).not_null())
                    .col(boolean(Car::IsAvailable).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(Car::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Car::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_car_owner")
                            .from(Car::Table, Car::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_car_manager")
                            .from(Car::Table, Car::ManagerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_car_manager")
                    .table(Car::Table)
                    .col(Car::ManagerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Car::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Car {
    Table,
    Id,
    Make,
    Model,
    Year,
    Price,
    Mileage,
    Description,
    Images,
    Features,
    OwnerId,
    ManagerId,
    IsAvailable,
    CreatedAt,
    UpdatedAt,
}
