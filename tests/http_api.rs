mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};
use tower::ServiceExt;

use car_marketplace_backend::entities::user::{self, UserRole, UserStatus};
use car_marketplace_backend::routes::create_router;
use car_marketplace_backend::AppState;

use common::{insert_user, setup_state, PASSWORD};

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["token"].as_str().unwrap().to_string()
}

fn submission_body() -> Value {
    json!({
        "make": "Toyota",
        "model": "Camry",
        "year": 2021,
        "price": 24500.0,
        "mileage": 18000,
        "features": ["Backup camera"]
    })
}

async fn app() -> (Router, AppState) {
    let state = setup_state().await;
    (create_router(state.clone()), state)
}

#[tokio::test]
async fn register_verify_and_login() {
    let (app, state) = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "new@example.com", "password": PASSWORD, "name": "New Buyer" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["status"], "inactive");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "new@example.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let stored = user::Entity::find()
        .filter(user::Column::Email.eq("new@example.com"))
        .one(&state.db)
        .await
        .unwrap()
        .unwrap();
    let code = stored.otp_code.unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users/verify-otp",
        None,
        Some(json!({ "email": "new@example.com", "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["status"], "active");

    let token = login(&app, "new@example.com").await;
    let (status, body) = send(&app, Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "new@example.com");
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let (app, _) = app().await;

    let (status, body) = send(&app, Method::GET, "/api/car-submissions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/car-submissions",
        Some("not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn browsing_listings_is_public() {
    let (app, _) = app().await;

    let (status, body) = send(&app, Method::GET, "/api/cars?page=1&per_page=5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["per_page"], 5);
}

#[tokio::test]
async fn other_users_submissions_are_forbidden() {
    let (app, state) = app().await;
    insert_user(&state.db, "owner@example.com", UserRole::User, UserStatus::Active).await;
    insert_user(&state.db, "nosy@example.com", UserRole::User, UserStatus::Active).await;

    let owner = login(&app, "owner@example.com").await;
    let nosy = login(&app, "nosy@example.com").await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/car-submissions",
        Some(&owner),
        Some(submission_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");

    let uri = format!("/api/car-submissions/{}", created["id"].as_str().unwrap());
    let (status, body) = send(&app, Method::GET, &uri, Some(&nosy), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].is_string());

    let (status, _) = send(&app, Method::GET, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_approval_over_http_publishes_the_car() {
    let (app, state) = app().await;
    insert_user(&state.db, "seller@example.com", UserRole::User, UserStatus::Active).await;
    insert_user(&state.db, "boss@example.com", UserRole::Admin, UserStatus::Active).await;
    insert_user(&state.db, "lot@example.com", UserRole::Manager, UserStatus::Active).await;

    let seller = login(&app, "seller@example.com").await;
    let admin = login(&app, "boss@example.com").await;

    let (_, created) = send(
        &app,
        Method::POST,
        "/api/car-submissions",
        Some(&seller),
        Some(submission_body()),
    )
    .await;
    let approve_uri = format!("/api/car-submissions/{}/approve", created["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::PUT, &approve_uri, Some(&seller), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::PUT, &approve_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["submission"]["status"], "approved");
    assert_eq!(body["car"]["make"], "Toyota");

    let (status, body) = send(&app, Method::PUT, &approve_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    let (_, listings) = send(&app, Method::GET, "/api/cars", None, None).await;
    assert_eq!(listings["total"], 1);
}

#[tokio::test]
async fn admin_routes_reject_other_roles() {
    let (app, state) = app().await;
    insert_user(&state.db, "manager@example.com", UserRole::Manager, UserStatus::Active).await;
    insert_user(&state.db, "boss@example.com", UserRole::Admin, UserStatus::Active).await;

    let manager = login(&app, "manager@example.com").await;
    let admin = login(&app, "boss@example.com").await;

    let (status, _) = send(&app, Method::GET, "/api/admin/users", Some(&manager), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/api/admin/managers", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::POST, "/api/admin/otp/sweep", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 0);
}

#[tokio::test]
async fn out_of_range_pages_are_a_bad_request() {
    let (app, _) = app().await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/cars?page=18446744073709551615&per_page=100",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");

    let (status, body) = send(&app, Method::GET, "/api/cars?page=lots", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn incomplete_bodies_get_the_json_error_shape() {
    let (app, state) = app().await;
    insert_user(&state.db, "seller@example.com", UserRole::User, UserStatus::Active).await;
    insert_user(&state.db, "boss@example.com", UserRole::Admin, UserStatus::Active).await;
    let seller = login(&app, "seller@example.com").await;
    let admin = login(&app, "boss@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/car-submissions",
        Some(&seller),
        Some(json!({ "make": "Toyota" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");

    let (_, created) = send(
        &app,
        Method::POST,
        "/api/car-submissions",
        Some(&seller),
        Some(submission_body()),
    )
    .await;
    let reject_uri = format!("/api/car-submissions/{}/reject", created["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::PUT, &reject_uri, Some(&admin), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("feedback"));

    let (status, body) = send(&app, Method::GET, "/api/car-submissions/not-a-uuid", Some(&seller), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");
}
