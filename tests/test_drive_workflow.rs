mod common;

use chrono::{Duration, Utc};

use car_marketplace_backend::access::Principal;
use car_marketplace_backend::entities::user::UserRole;
use car_marketplace_backend::entities::{car, ReviewStatus};
use car_marketplace_backend::error::AppError;
use car_marketplace_backend::services::assignment::ManagerAssignment;
use car_marketplace_backend::services::cars::{self, CarChanges};
use car_marketplace_backend::services::test_drives::{self, NewTestDrive, MAX_TIME_SLOT_LEN};
use sea_orm::DatabaseConnection;

use common::{camry, principal, setup_db};

struct Cast {
    buyer: Principal,
    manager: Principal,
    other_manager: Principal,
    admin: Principal,
    listing: car::Model,
}

async fn cast(db: &DatabaseConnection) -> Cast {
    let buyer = principal(db, "buyer@example.com", UserRole::User).await;
    let manager = principal(db, "manager@example.com", UserRole::Manager).await;
    let other_manager = principal(db, "other@example.com", UserRole::Manager).await;
    let admin = principal(db, "admin@example.com", UserRole::Admin).await;

    let listing = cars::create(db, &manager, &ManagerAssignment::LeastLoaded, camry(), None)
        .await
        .unwrap();

    Cast {
        buyer,
        manager,
        other_manager,
        admin,
        listing,
    }
}

fn tomorrow(car_id: uuid::Uuid) -> NewTestDrive {
    NewTestDrive {
        car_id,
        preferred_date: (Utc::now() + Duration::days(1)).date_naive(),
        time_slot: "10:00-11:00".to_string(),
        message: Some("Can I bring my mechanic?".to_string()),
    }
}

#[tokio::test]
async fn request_is_assigned_to_the_listing_manager() {
    let db = setup_db().await;
    let c = cast(&db).await;

    let request = test_drives::create(&db, &c.buyer, tomorrow(c.listing.id))
        .await
        .unwrap();

    assert_eq!(request.status, ReviewStatus::Pending);
    assert_eq!(request.manager_id, c.manager.id);
    assert_eq!(request.user_id, c.buyer.id);
    assert_eq!(request.time_slot, "10:00-11:00");
}

#[tokio::test]
async fn only_the_assigned_manager_or_an_admin_can_decide() {
    let db = setup_db().await;
    let c = cast(&db).await;

    let request = test_drives::create(&db, &c.buyer, tomorrow(c.listing.id))
        .await
        .unwrap();

    let stranger = test_drives::approve(&db, &c.other_manager, request.id, None).await;
    assert!(matches!(stranger, Err(AppError::Forbidden(_))));

    let requester = test_drives::approve(&db, &c.buyer, request.id, None).await;
    assert!(matches!(requester, Err(AppError::Forbidden(_))));

    let approved = test_drives::approve(
        &db,
        &c.manager,
        request.id,
        Some("Bring your licence".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(approved.status, ReviewStatus::Approved);
    assert_eq!(approved.note.as_deref(), Some("Bring your licence"));

    let again = test_drives::reject(&db, &c.admin, request.id, "Changed my mind").await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
    let renote = test_drives::approve(&db, &c.manager, request.id, Some("New note".to_string())).await;
    assert!(matches!(renote, Err(AppError::Conflict(_))));

    let stored = test_drives::get(&db, &c.admin, request.id).await.unwrap();
    assert_eq!(stored.status, ReviewStatus::Approved);
    assert_eq!(stored.note.as_deref(), Some("Bring your licence"));
    assert!(stored.rejection_reason.is_none());
}

#[tokio::test]
async fn rejection_needs_a_reason() {
    let db = setup_db().await;
    let c = cast(&db).await;

    let request = test_drives::create(&db, &c.buyer, tomorrow(c.listing.id))
        .await
        .unwrap();

    let blank = test_drives::reject(&db, &c.manager, request.id, "  ").await;
    assert!(matches!(blank, Err(AppError::BadRequest(_))));

    let rejected = test_drives::reject(&db, &c.manager, request.id, "Car is at the body shop")
        .await
        .unwrap();
    assert_eq!(rejected.status, ReviewStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Car is at the body shop"));
}

#[tokio::test]
async fn every_party_reads_the_same_request() {
    let db = setup_db().await;
    let c = cast(&db).await;
    let outsider = principal(&db, "outsider@example.com", UserRole::User).await;

    let created = test_drives::create(&db, &c.buyer, tomorrow(c.listing.id))
        .await
        .unwrap();

    let as_buyer = test_drives::get(&db, &c.buyer, created.id).await.unwrap();
    let as_manager = test_drives::get(&db, &c.manager, created.id).await.unwrap();
    let as_admin = test_drives::get(&db, &c.admin, created.id).await.unwrap();
    assert_eq!(as_buyer, created);
    assert_eq!(as_manager, created);
    assert_eq!(as_admin, created);

    assert!(matches!(
        test_drives::get(&db, &outsider, created.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        test_drives::get(&db, &c.other_manager, created.id).await,
        Err(AppError::Forbidden(_))
    ));
}

#[tokio::test]
async fn lists_are_scoped_by_role() {
    let db = setup_db().await;
    let c = cast(&db).await;
    test_drives::create(&db, &c.buyer, tomorrow(c.listing.id))
        .await
        .unwrap();

    assert_eq!(test_drives::list(&db, &c.buyer, None).await.unwrap().len(), 1);
    assert_eq!(test_drives::list(&db, &c.manager, None).await.unwrap().len(), 1);
    assert_eq!(test_drives::list(&db, &c.admin, None).await.unwrap().len(), 1);
    assert!(test_drives::list(&db, &c.other_manager, None).await.unwrap().is_empty());
    assert!(test_drives::list(&db, &c.buyer, Some(ReviewStatus::Approved))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn a_new_message_replaces_the_previous_one() {
    let db = setup_db().await;
    let c = cast(&db).await;

    let request = test_drives::create(&db, &c.buyer, tomorrow(c.listing.id))
        .await
        .unwrap();

    let first = test_drives::post_message(&db, &c.buyer, request.id, "Is 10am still free?")
        .await
        .unwrap();
    assert_eq!(first.latest_message.as_deref(), Some("Is 10am still free?"));
    assert_eq!(first.latest_message_sender_id, Some(c.buyer.id));

    let reply = test_drives::post_message(&db, &c.manager, request.id, "Yes, see you then")
        .await
        .unwrap();
    assert_eq!(reply.latest_message.as_deref(), Some("Yes, see you then"));
    assert_eq!(reply.latest_message_sender_id, Some(c.manager.id));
    assert!(reply.latest_message_at.is_some());

    let outsider = test_drives::post_message(&db, &c.other_manager, request.id, "hi").await;
    assert!(matches!(outsider, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn requests_need_an_open_listing_and_a_future_date() {
    let db = setup_db().await;
    let c = cast(&db).await;

    let mut yesterday = tomorrow(c.listing.id);
    yesterday.preferred_date = (Utc::now() - Duration::days(1)).date_naive();
    assert!(matches!(
        test_drives::create(&db, &c.buyer, yesterday).await,
        Err(AppError::BadRequest(_))
    ));

    test_drives::create(&db, &c.buyer, tomorrow(c.listing.id))
        .await
        .unwrap();
    assert!(matches!(
        test_drives::create(&db, &c.buyer, tomorrow(c.listing.id)).await,
        Err(AppError::Conflict(_))
    ));

    cars::update(
        &db,
        &c.manager,
        c.listing.id,
        CarChanges {
            is_available: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let other_buyer = principal(&db, "second@example.com", UserRole::User).await;
    assert!(matches!(
        test_drives::create(&db, &other_buyer, tomorrow(c.listing.id)).await,
        Err(AppError::BadRequest(_))
    ));
}

#[tokio::test]
async fn requesters_cancel_only_while_pending() {
    let db = setup_db().await;
    let c = cast(&db).await;

    let request = test_drives::create(&db, &c.buyer, tomorrow(c.listing.id))
        .await
        .unwrap();
    test_drives::approve(&db, &c.manager, request.id, None)
        .await
        .unwrap();

    assert!(matches!(
        test_drives::cancel(&db, &c.buyer, request.id).await,
        Err(AppError::Conflict(_))
    ));
    test_drives::cancel(&db, &c.admin, request.id).await.unwrap();
    assert!(matches!(
        test_drives::get(&db, &c.admin, request.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn time_slot_must_fit_its_column() {
    let db = setup_db().await;
    let c = cast(&db).await;

    let mut long_slot = tomorrow(c.listing.id);
    long_slot.time_slot = "9".repeat(MAX_TIME_SLOT_LEN + 1);
    assert!(matches!(
        test_drives::create(&db, &c.buyer, long_slot).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(test_drives::list(&db, &c.admin, None).await.unwrap().is_empty());
}
