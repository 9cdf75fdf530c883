//! Axum route handlers for the vendor directory. Buyer and admin only.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::models::vendor::{Address, VendorRow, VENDOR_STATUSES};
use crate::pagination::{Page, PageQuery};
use crate::state::AppState;
use crate::validation::{normalize_email, require_text};
use crate::vendors::store::{self, NewVendor, VendorFilter, VendorUpdate};

#[derive(Debug, Deserialize)]
pub struct CreateVendorRequest {
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: Option<String>,
    pub address: Option<Address>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub website: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListVendorsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
}

fn duplicate_email(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict("A vendor with this email already exists".to_string())
    } else {
        AppError::Database(err)
    }
}

/// POST /api/vendors
pub async fn handle_create_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateVendorRequest>,
) -> Result<(StatusCode, Json<VendorRow>), AppError> {
    auth.require_buyer()?;

    let name = require_text(&req.name, "name")?;
    let company = require_text(&req.company, "company")?;
    let email = normalize_email(&req.email, "email")?;
    let categories: Vec<String> = req
        .categories
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let vendor = store::insert(
        &state.db,
        NewVendor {
            name,
            email: &email,
            company,
            phone: req.phone.as_deref(),
            address: req.address.as_ref(),
            categories: &categories,
            website: req.website.as_deref(),
            user_id: None,
            created_by: auth.user.id,
        },
    )
    .await
    .map_err(duplicate_email)?;

    info!(vendor_id = %vendor.id, created_by = %auth.user.id, "Vendor created");
    Ok((StatusCode::CREATED, Json(vendor)))
}

/// GET /api/vendors
pub async fn handle_list_vendors(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListVendorsQuery>,
) -> Result<Json<Page<VendorRow>>, AppError> {
    auth.require_buyer()?;
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let filter = VendorFilter {
        search: query.search,
        category: query.category,
    };
    let (vendors, total) = store::list(&state.db, &filter, &page).await?;
    Ok(Json(Page::new(vendors, total, &page)))
}

/// GET /api/vendors/:vendor_id
pub async fn handle_get_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vendor_id): Path<Uuid>,
) -> Result<Json<VendorRow>, AppError> {
    auth.require_buyer()?;
    store::find_by_id(&state.db, vendor_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Vendor not found".to_string()))
}

/// PUT /api/vendors/:vendor_id
pub async fn handle_update_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vendor_id): Path<Uuid>,
    Json(changes): Json<VendorUpdate>,
) -> Result<Json<VendorRow>, AppError> {
    auth.require_buyer()?;
    validate_update(&changes)?;

    let vendor = store::update(&state.db, vendor_id, &changes)
        .await
        .map_err(duplicate_email)?
        .ok_or_else(|| AppError::NotFound("Vendor not found".to_string()))?;

    info!(vendor_id = %vendor.id, "Vendor updated");
    Ok(Json(vendor))
}

/// DELETE /api/vendors/:vendor_id
pub async fn handle_delete_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vendor_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_buyer()?;
    if !store::delete(&state.db, vendor_id).await? {
        return Err(AppError::NotFound("Vendor not found".to_string()));
    }
    info!(vendor_id = %vendor_id, "Vendor deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn validate_update(changes: &VendorUpdate) -> Result<(), AppError> {
    if let Some(name) = &changes.name {
        require_text(name, "name")?;
    }
    if let Some(company) = &changes.company {
        require_text(company, "company")?;
    }
    if let Some(email) = &changes.email {
        normalize_email(email, "email")?;
    }
    if let Some(status) = &changes.status {
        if !VENDOR_STATUSES.contains(&status.as_str()) {
            return Err(AppError::Validation(format!(
                "status must be one of: {}",
                VENDOR_STATUSES.join(", ")
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rejects_unknown_status() {
        let changes = VendorUpdate {
            status: Some("archived".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_update(&changes),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_update_rejects_blank_name_and_bad_email() {
        let blank = VendorUpdate {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(validate_update(&blank).is_err());

        let bad_email = VendorUpdate {
            email: Some("acme".to_string()),
            ..Default::default()
        };
        assert!(validate_update(&bad_email).is_err());
    }

    #[test]
    fn test_empty_update_is_valid() {
        assert!(validate_update(&VendorUpdate::default()).is_ok());
    }
}
