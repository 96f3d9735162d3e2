use chrono::{Datelike, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{self, Operation, Principal};
use crate::entities::car;
use crate::entities::car_submission::CarDetails;
use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};
use crate::services::assignment::{self, ManagerAssignment};
use crate::services::{bounded_text, now_tz, optional_text};

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;
/// Keeps `(page - 1) * per_page` a valid SQL offset.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PER_PAGE;
/// Width of the make and model columns.
pub const MAX_MAKE_MODEL_LEN: usize = 100;

/// Oldest model year accepted for a listing.
const FIRST_CAR_YEAR: i32 = 1886;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarFilter {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub available: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CarPage {
    pub items: Vec<car::Model>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarChanges {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub mileage: Option<i32>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub is_available: Option<bool>,
}

/// Checks and trims proposed details before they are stored anywhere.
pub fn validate_details(details: CarDetails) -> AppResult<CarDetails> {
    let make = bounded_text(&details.make, "Make", MAX_MAKE_MODEL_LEN)?;
    let model = bounded_text(&details.model, "Model", MAX_MAKE_MODEL_LEN)?;
    validate_year(details.year)?;
    validate_price(details.price)?;
    validate_mileage(details.mileage)?;

    Ok(CarDetails {
        make,
        model,
        description: optional_text(details.description),
        ..details
    })
}

fn validate_year(year: i32) -> AppResult<()> {
    let latest = Utc::now().year() + 1;
    if !(FIRST_CAR_YEAR..=latest).contains(&year) {
        return Err(AppError::BadRequest(format!(
            "Year must be between {} and {}",
            FIRST_CAR_YEAR, latest
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> AppResult<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::BadRequest("Price must be positive".to_string()));
    }
    Ok(())
}

fn validate_mileage(mileage: i32) -> AppResult<()> {
    if mileage < 0 {
        return Err(AppError::BadRequest("Mileage cannot be negative".to_string()));
    }
    Ok(())
}

/// Inserts a listing from already-validated details.
pub async fn insert_listing<C: ConnectionTrait>(
    db: &C,
    details: &CarDetails,
    owner_id: Uuid,
    manager_id: Uuid,
) -> AppResult<car::Model> {
    let now = now_tz();
    let listing = car::ActiveModel {
        id: Set(Uuid::new_v4()),
        make: Set(details.make.clone()),
        model: Set(details.model.clone()),
        year: Set(details.year),
        price: Set(details.price),
        mileage: Set(details.mileage),
        description: Set(details.description.clone()),
        images: Set(details.images.clone().into()),
        features: Set(details.features.clone().into()),
        owner_id: Set(owner_id),
        manager_id: Set(manager_id),
        is_available: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };

    Ok(listing.insert(db).await?)
}

pub async fn list(db: &DatabaseConnection, filter: CarFilter) -> AppResult<CarPage> {
    let page = filter.page.unwrap_or(1).max(1);
    if page > MAX_PAGE {
        return Err(AppError::BadRequest(format!(
            "Page must be at most {}",
            MAX_PAGE
        )));
    }
    let per_page = filter
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);

    let mut query = car::Entity::find().order_by_desc(car::Column::CreatedAt);
    if let Some(make) = optional_text(filter.make) {
        query = query.filter(car::Column::Make.eq(make));
    }
    if let Some(model) = optional_text(filter.model) {
        query = query.filter(car::Column::Model.eq(model));
    }
    if let Some(year) = filter.year {
        query = query.filter(car::Column::Year.eq(year));
    }
    if let Some(min) = filter.min_price {
        query = query.filter(car::Column::Price.gte(min));
    }
    if let Some(max) = filter.max_price {
        query = query.filter(car::Column::Price.lte(max));
    }
    if let Some(available) = filter.available {
        query = query.filter(car::Column::IsAvailable.eq(available));
    }

    let paginator = query.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page - 1).await?;

    Ok(CarPage {
        items,
        page,
        per_page,
        total,
    })
}

pub async fn get<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<car::Model> {
    car::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))
}

/// Publishes a listing owned by the caller. Managers always manage their own
/// listings; admins may name a manager or fall back to `policy`.
pub async fn create(
    db: &DatabaseConnection,
    principal: &Principal,
    policy: &ManagerAssignment,
    details: CarDetails,
    manager_id: Option<Uuid>,
) -> AppResult<car::Model> {
    access::authorize(principal, Operation::PublishListing)?;
    let details = validate_details(details)?;

    let manager_id = match (principal.role, manager_id) {
        (UserRole::Manager, _) => principal.id,
        (_, Some(id)) => assignment::require_active_manager(db, id).await?,
        (_, None) => policy.pick(db).await?,
    };

    let listing = insert_listing(db, &details, principal.id, manager_id).await?;
    tracing::info!(car_id = %listing.id, manager_id = %manager_id, "Listing published");
    Ok(listing)
}

pub async fn update(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
    changes: CarChanges,
) -> AppResult<car::Model> {
    access::authorize(principal, Operation::ManageListing)?;
    let listing = get(db, id).await?;
    access::authorize_party(principal, &[listing.manager_id])?;

    let mut active: car::ActiveModel = listing.into();
    if let Some(make) = changes.make {
        active.make = Set(bounded_text(&make, "Make", MAX_MAKE_MODEL_LEN)?);
    }
    if let Some(model) = changes.model {
        active.model = Set(bounded_text(&model, "Model", MAX_MAKE_MODEL_LEN)?);
    }
    if let Some(year) = changes.year {
        validate_year(year)?;
        active.year = Set(year);
    }
    if let Some(price) = changes.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if let Some(mileage) = changes.mileage {
        validate_mileage(mileage)?;
        active.mileage = Set(mileage);
    }
    if let Some(description) = changes.description {
        active.description = Set(optional_text(Some(description)));
    }
    if let Some(images) = changes.images {
        active.images = Set(images.into());
    }
    if let Some(features) = changes.features {
        active.features = Set(features.into());
    }
    if let Some(available) = changes.is_available {
        active.is_available = Set(available);
    }
    active.updated_at = Set(now_tz());

    Ok(active.update(db).await?)
}

pub async fn delete(db: &DatabaseConnection, principal: &Principal, id: Uuid) -> AppResult<()> {
    access::authorize(principal, Operation::ManageListing)?;
    let listing = get(db, id).await?;
    access::authorize_party(principal, &[listing.manager_id])?;

    car::Entity::delete_by_id(id).exec(db).await?;
    tracing::info!(car_id = %id, "Listing removed");
    Ok(())
}
