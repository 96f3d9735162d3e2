#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use car_marketplace_backend::access::Principal;
use car_marketplace_backend::entities::car_submission::CarDetails;
use car_marketplace_backend::entities::user::{self, UserRole, UserStatus};
use car_marketplace_backend::services::assignment::ManagerAssignment;
use car_marketplace_backend::utils::password;
use car_marketplace_backend::{AppState, Config};

pub const PASSWORD: &str = "password123";

/// Fresh migrated in-memory database. A single connection keeps every
/// query on the same SQLite memory instance.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        jwt_expiration_hours: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        otp_ttl_seconds: 120,
        otp_sweep_interval_seconds: 60,
        manager_assignment: ManagerAssignment::LeastLoaded,
        admin_email: "admin@carmarket.com".to_string(),
        admin_password: "admin1234".to_string(),
    }
}

pub async fn setup_state() -> AppState {
    AppState {
        db: setup_db().await,
        config: test_config(),
    }
}

/// Inserts an account directly, bypassing registration.
pub async fn insert_user(
    db: &DatabaseConnection,
    email: &str,
    role: UserRole,
    status: UserStatus,
) -> user::Model {
    let now = Utc::now();
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        name: Set(email.split('@').next().unwrap_or("user").to_string()),
        password_hash: Set(password::hash_password(PASSWORD).unwrap()),
        role: Set(role),
        status: Set(status),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn principal(
    db: &DatabaseConnection,
    email: &str,
    role: UserRole,
) -> Principal {
    let account = insert_user(db, email, role, UserStatus::Active).await;
    Principal::new(account.id, account.role)
}

pub fn camry() -> CarDetails {
    CarDetails {
        make: "Toyota".to_string(),
        model: "Camry".to_string(),
        year: 2020,
        price: 25_000.0,
        mileage: 18_000,
        description: Some("One owner, full service history".to_string()),
        images: vec!["https://img.example.com/camry-front.jpg".to_string()],
        features: vec!["Backup camera".to_string(), "Lane assist".to_string()],
    }
}
