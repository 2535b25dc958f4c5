//! Authentication middleware
//!
//! JWT authentication and role-based access control

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::Role;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::auth::decode_token;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Check the user's role against an allow-list
    pub fn has_role(&self, allowed: &[Role]) -> bool {
        self.role.is_allowed(allowed)
    }
}

/// Authentication middleware that validates the bearer token and stores the
/// caller in the request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return AppError::Unauthorized("Missing or invalid Authorization header".to_string())
            .into_response();
    };

    let claims = match decode_token(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(AuthUser {
        id: claims.id,
        email: claims.email,
        role: claims.role,
    });

    next.run(request).await
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

impl CurrentUser {
    /// Role guard for use in handlers
    pub fn require_role(&self, allowed: &[Role]) -> AppResult<()> {
        if self.0.has_role(allowed) {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.0.id, role = %self.0.role, "Role not allowed");
            Err(AppError::InsufficientPermissions)
        }
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::access;

    fn user(role: Role) -> CurrentUser {
        CurrentUser(AuthUser {
            id: Uuid::new_v4(),
            email: "staff@example.com".to_string(),
            role,
        })
    }

    #[test]
    fn test_require_role() {
        assert!(user(Role::Accountant).require_role(access::PURCHASING).is_ok());
        assert!(matches!(
            user(Role::Employee).require_role(access::PURCHASING),
            Err(AppError::InsufficientPermissions)
        ));
        assert!(user(Role::FloorManager).require_role(access::RECEIVING).is_ok());
        assert!(user(Role::Manager).require_role(access::ADMIN_ONLY).is_err());
    }
}
