use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::{admin, auth, cars, submissions, test_drives, users};
use crate::middleware::auth::{auth_middleware, require_admin};
use crate::middleware::user_rate_limit::create_user_governor;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public account routes
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password));

    let otp_routes = Router::new()
        .route("/verify-otp", post(users::verify_otp))
        .route("/resend-otp", post(users::resend_otp));

    // Public listing browse
    let public_routes = Router::new()
        .route("/cars", get(cars::list_cars))
        .route("/cars/{id}", get(cars::get_car));

    // Authenticated routes; role and ownership checks happen per operation
    let protected_routes = Router::new()
        .route("/users/me", get(users::me))
        .route("/users/{id}", put(users::update_user))
        .route("/cars", post(cars::create_car))
        .route("/cars/{id}", put(cars::update_car).delete(cars::delete_car))
        .route(
            "/car-submissions",
            post(submissions::create_submission).get(submissions::list_submissions),
        )
        .route(
            "/car-submissions/{id}",
            get(submissions::get_submission)
                .put(submissions::update_submission)
                .delete(submissions::delete_submission),
        )
        .route("/car-submissions/{id}/approve", put(submissions::approve_submission))
        .route("/car-submissions/{id}/reject", put(submissions::reject_submission))
        .route(
            "/test-drive-requests",
            post(test_drives::create_test_drive).get(test_drives::list_test_drives),
        )
        .route(
            "/test-drive-requests/{id}",
            get(test_drives::get_test_drive).delete(test_drives::cancel_test_drive),
        )
        .route("/test-drive-requests/{id}/approve", put(test_drives::approve_test_drive))
        .route("/test-drive-requests/{id}/reject", put(test_drives::reject_test_drive))
        .route("/test-drive-requests/{id}/message", post(test_drives::post_message))
        .layer(create_user_governor())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_staff))
        .route("/users/{id}", axum::routing::delete(admin::delete_user))
        .route("/users/{id}/role", put(admin::update_user_role))
        .route("/users/{id}/status", put(admin::update_user_status))
        .route("/managers", get(admin::list_managers))
        .route("/otp/sweep", post(admin::sweep_otps))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/users", otp_routes)
        .nest("/api", public_routes)
        .nest("/api", protected_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}
