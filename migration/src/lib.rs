pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users;
mod m20250301_000002_create_cars;
mod m20250301_000003_create_car_submissions;
mod m20250301_000004_create_test_drive_requests;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_cars::Migration),
            Box::new(m20250301_000003_create_car_submissions::Migration),
            Box::new(m20250301_000004_create_test_drive_requests::Migration),
        ]
    }
}
