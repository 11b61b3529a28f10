use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use nightwatch_core::{DomainError, Role};

use crate::error::ApiError;
use crate::state::AppState;

/// The caller identity attached to the request by [`require_auth`], read by
/// handlers via the `Extension<CurrentUser>` extractor.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub phone: String,
    pub name: Option<String>,
    pub role: Role,
}

/// Validates the `Authorization: Bearer <token>` header and attaches the
/// resulting [`CurrentUser`] to the request. Every failure mode collapses to
/// `AuthenticationFailed`, per §7's uniform-message policy.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(DomainError::AuthenticationFailed)?;

    let claims = state.jwt.validate(token)?;
    req.extensions_mut().insert(CurrentUser {
        user_id: claims.sub,
        phone: claims.phone,
        name: claims.name,
        role: claims.role,
    });
    Ok(next.run(req).await)
}

/// Requires the caller attached by a preceding [`require_auth`] layer to hold
/// `role=admin`. Must be layered so it runs after `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let is_admin = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(DomainError::AuthenticationFailed)?
        .role
        .is_admin();
    if !is_admin {
        return Err(DomainError::Forbidden.into());
    }
    Ok(next.run(req).await)
}
