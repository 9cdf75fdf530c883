use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use crate::errors::AppError;
use crate::models::user::{Role, UserRow};
use crate::state::AppState;

/// The authenticated caller. Add it to a handler's arguments to require a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserRow,
    pub role: Role,
}

impl AuthUser {
    /// Rejects the request with 403 unless the caller holds one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role '{}' is not allowed to access this route",
                self.role
            )))
        }
    }

    /// Shorthand for the buyer-side routes.
    pub fn require_buyer(&self) -> Result<(), AppError> {
        self.require_role(&[Role::Buyer, Role::Admin])
    }

    pub fn is_buyer_side(&self) -> bool {
        matches!(self.role, Role::Buyer | Role::Admin)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| {
                AppError::Unauthorized("Not authorized to access this route".to_string())
            })?;

        let claims = state.tokens.verify(token).map_err(|e| {
            debug!("Rejected bearer token: {e}");
            AppError::Unauthorized("Invalid or expired token".to_string())
        })?;

        let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(claims.sub)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is deactivated".to_string()));
        }

        let role = user.role();
        Ok(AuthUser { user, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn auth_user(role: Role) -> AuthUser {
        AuthUser {
            user: UserRow {
                id: Uuid::new_v4(),
                name: "Pat".to_string(),
                email: "pat@example.com".to_string(),
                password_hash: String::new(),
                role: role.as_str().to_string(),
                company: None,
                phone: None,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            role,
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer   abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[test]
    fn test_require_role() {
        let vendor = auth_user(Role::Vendor);
        assert!(vendor.require_role(&[Role::Vendor]).is_ok());
        assert!(matches!(
            vendor.require_buyer(),
            Err(AppError::Forbidden(_))
        ));

        let admin = auth_user(Role::Admin);
        assert!(admin.require_buyer().is_ok());
        assert!(admin.is_buyer_side());
    }
}
