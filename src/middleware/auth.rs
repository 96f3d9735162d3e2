use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::access::{self, Principal};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::{verify_token, Claims};
use crate::AppState;

/// Validates the bearer token and stores its claims for handlers and the per-user limiter
pub async fn auth_middleware(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let TypedHeader(auth) =
        auth.ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = verify_token(auth.token(), &state.config.jwt_secret)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Gate for the `/api/admin` tree; runs after `auth_middleware`
pub async fn require_admin(request: Request, next: Next) -> AppResult<Response> {
    let principal = request
        .extensions()
        .get::<Claims>()
        .map(Principal::from)
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    if !principal.is_admin() {
        tracing::debug!(user_id = %principal.id, role = access::role_name(principal.role), "Admin route refused");
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}
