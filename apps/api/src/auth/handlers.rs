//! Axum route handlers for registration, login and the current-user lookup.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::auth::AuthUser;
use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::models::user::{PublicUser, Role, UserRow};
use crate::state::AppState;
use crate::validation::{normalize_email, require_text};
use crate::vendors::store as vendor_store;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub company: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

/// Role requested at registration. Admin accounts are provisioned out of band.
fn registration_role(requested: Option<Role>) -> Result<Role, AppError> {
    match requested.unwrap_or(Role::Buyer) {
        Role::Admin => Err(AppError::Validation(
            "Admin accounts cannot be self-registered".to_string(),
        )),
        role => Ok(role),
    }
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

/// POST /api/auth/register
///
/// Vendor registrations also create the linked vendor profile in the same transaction.
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let name = require_text(&req.name, "name")?;
    let email = normalize_email(&req.email, "email")?;
    validate_password(&req.password)?;
    let role = registration_role(req.role)?;

    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "User already exists with this email".to_string(),
        ));
    }

    if role == Role::Vendor && vendor_store::find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict(
            "A vendor is already registered with this email".to_string(),
        ));
    }

    let password_hash = hash_password(req.password.clone()).await?;
    let company = req.company.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let phone = req.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

    let mut tx = state.db.begin().await?;

    let user = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, company, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(&email)
    .bind(&password_hash)
    .bind(role.as_str())
    .bind(company)
    .bind(phone)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("User already exists with this email".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    let vendor_id = if role == Role::Vendor {
        let vendor_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO vendors (id, name, email, company, phone, user_id, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(company.unwrap_or(name))
        .bind(phone)
        .bind(user.id)
        .fetch_one(&mut *tx)
        .await?;
        Some(vendor_id)
    } else {
        None
    };

    tx.commit().await?;

    let token = state
        .tokens
        .issue(user.id, role)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token issue failed: {e}")))?;

    info!(user_id = %user.id, role = %role, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: PublicUser::from_row(&user, vendor_id),
            token,
        }),
    ))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Please provide email and password".to_string(),
        ));
    }

    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(req.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?;

    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let matched = verify_password(req.password.clone(), stored_hash).await?;
    let user = match user {
        Some(user) if matched => user,
        _ => return Err(invalid()),
    };
    if !user.is_active {
        return Err(AppError::Unauthorized("Account is deactivated".to_string()));
    }

    let role = user.role();
    let vendor_id = vendor_id_for(&state, &user, role).await?;

    let token = state
        .tokens
        .issue(user.id, role)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token issue failed: {e}")))?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(AuthResponse {
        user: PublicUser::from_row(&user, vendor_id),
        token,
    }))
}

/// GET /api/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let vendor_id = vendor_id_for(&state, &auth.user, auth.role).await?;
    Ok(Json(PublicUser::from_row(&auth.user, vendor_id)))
}

async fn vendor_id_for(
    state: &AppState,
    user: &UserRow,
    role: Role,
) -> Result<Option<Uuid>, AppError> {
    if role != Role::Vendor {
        return Ok(None);
    }
    let vendor = vendor_store::find_by_user_id(&state.db, user.id).await?;
    if vendor.is_none() {
        warn!(user_id = %user.id, "Vendor account has no vendor profile");
    }
    Ok(vendor.map(|v| v.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_role_defaults_to_buyer() {
        assert_eq!(registration_role(None).unwrap(), Role::Buyer);
        assert_eq!(registration_role(Some(Role::Vendor)).unwrap(), Role::Vendor);
    }

    #[test]
    fn test_admin_cannot_self_register() {
        assert!(matches!(
            registration_role(Some(Role::Admin)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_password_minimum_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_register_request_accepts_missing_optionals() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"name": "Pat", "email": "pat@example.com", "password": "secret1"}"#,
        )
        .unwrap();
        assert!(req.role.is_none());
        assert!(req.company.is_none());
    }
}
