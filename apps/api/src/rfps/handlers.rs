//! Axum route handlers for RFP authoring and distribution.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::email::templates::{rfp_invitation, BuyerIdentity};
use crate::errors::AppError;
use crate::models::rfp::{Attachment, EmailStatus, EvaluationCriterion, RfpDetail, RfpRow, RfpStatus};
use crate::pagination::{Page, PageQuery};
use crate::rfps::ai;
use crate::rfps::store::{self, NewRfp, RfpFilter, RfpScope, RfpUpdate};
use crate::state::AppState;
use crate::validation::{normalize_currency, require_text};
use crate::vendors::store as vendor_store;

#[derive(Debug, Deserialize)]
pub struct CreateRfpRequest {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub budget: Option<f64>,
    pub currency: Option<String>,
    pub deadline: DateTime<Utc>,
    pub category: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub evaluation_criteria: Vec<EvaluationCriterion>,
}

#[derive(Debug, Deserialize)]
pub struct ListRfpsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendRfpRequest {
    #[serde(default)]
    pub vendor_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SendRfpResponse {
    pub rfp: RfpDetail,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VendorSuggestionsResponse {
    pub suggestions: Option<String>,
}

fn not_found() -> AppError {
    AppError::NotFound("RFP not found".to_string())
}

fn validate_budget(budget: Option<f64>) -> Result<(), AppError> {
    match budget {
        Some(b) if !b.is_finite() || b < 0.0 => Err(AppError::Validation(
            "budget must be a non-negative number".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_update(changes: &RfpUpdate) -> Result<(), AppError> {
    for (value, field) in [
        (&changes.title, "title"),
        (&changes.description, "description"),
        (&changes.requirements, "requirements"),
    ] {
        if let Some(value) = value {
            require_text(value, field)?;
        }
    }
    validate_budget(changes.budget)?;
    if changes.currency.is_some() {
        normalize_currency(changes.currency.as_deref())?;
    }
    Ok(())
}

/// POST /api/rfps
pub async fn handle_create_rfp(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateRfpRequest>,
) -> Result<(StatusCode, Json<RfpRow>), AppError> {
    auth.require_buyer()?;

    let title = require_text(&req.title, "title")?;
    let description = require_text(&req.description, "description")?;
    let requirements = require_text(&req.requirements, "requirements")?;
    validate_budget(req.budget)?;
    let currency = normalize_currency(req.currency.as_deref())?;
    let category = req.category.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let rfp = store::insert(
        &state.db,
        NewRfp {
            title,
            description,
            requirements,
            budget: req.budget,
            currency: &currency,
            deadline: req.deadline,
            category,
            attachments: &req.attachments,
            evaluation_criteria: &req.evaluation_criteria,
            created_by: auth.user.id,
        },
    )
    .await?;

    info!(rfp_id = %rfp.id, created_by = %auth.user.id, "RFP created");
    Ok((StatusCode::CREATED, Json(rfp)))
}

/// GET /api/rfps
pub async fn handle_list_rfps(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListRfpsQuery>,
) -> Result<Json<Page<RfpRow>>, AppError> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let filter = RfpFilter {
        status: query.status,
        category: query.category,
    };

    let scope = if auth.is_buyer_side() {
        RfpScope::CreatedBy(auth.user.id)
    } else {
        match vendor_store::find_by_user_id(&state.db, auth.user.id).await? {
            Some(vendor) => RfpScope::SentTo(vendor.id),
            None => return Ok(Json(Page::empty(&page))),
        }
    };

    let (rfps, total) = store::list(&state.db, scope, &filter, &page).await?;
    Ok(Json(Page::new(rfps, total, &page)))
}

/// GET /api/rfps/:rfp_id
pub async fn handle_get_rfp(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rfp_id): Path<Uuid>,
) -> Result<Json<RfpDetail>, AppError> {
    let found = if auth.is_buyer_side() {
        store::find_owned(&state.db, rfp_id, auth.user.id).await?
    } else {
        let vendor = vendor_store::find_by_user_id(&state.db, auth.user.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vendor profile not found".to_string()))?;
        store::find_sent_to(&state.db, rfp_id, vendor.id).await?
    };
    let rfp = found.ok_or_else(not_found)?;

    Ok(Json(store::detail(&state.db, rfp).await?))
}

/// PUT /api/rfps/:rfp_id
pub async fn handle_update_rfp(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rfp_id): Path<Uuid>,
    Json(mut changes): Json<RfpUpdate>,
) -> Result<Json<RfpRow>, AppError> {
    auth.require_buyer()?;
    validate_update(&changes)?;
    if changes.currency.is_some() {
        changes.currency = Some(normalize_currency(changes.currency.as_deref())?);
    }

    let rfp = store::update(&state.db, rfp_id, auth.user.id, &changes)
        .await?
        .ok_or_else(not_found)?;

    info!(rfp_id = %rfp.id, "RFP updated");
    Ok(Json(rfp))
}

/// POST /api/rfps/:rfp_id/close
pub async fn handle_close_rfp(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rfp_id): Path<Uuid>,
) -> Result<Json<RfpRow>, AppError> {
    auth.require_buyer()?;
    let rfp = store::set_status(&state.db, rfp_id, auth.user.id, RfpStatus::Closed)
        .await?
        .ok_or_else(not_found)?;
    info!(rfp_id = %rfp.id, "RFP closed");
    Ok(Json(rfp))
}

/// POST /api/rfps/:rfp_id/send
///
/// Emails every active vendor in `vendor_ids` and records each delivery as
/// `sent` or `failed`. The RFP opens as long as at least one vendor was addressed.
pub async fn handle_send_rfp(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rfp_id): Path<Uuid>,
    Json(req): Json<SendRfpRequest>,
) -> Result<Json<SendRfpResponse>, AppError> {
    auth.require_buyer()?;
    if req.vendor_ids.is_empty() {
        return Err(AppError::Validation("Please provide vendor IDs".to_string()));
    }

    let rfp = store::find_owned(&state.db, rfp_id, auth.user.id)
        .await?
        .ok_or_else(not_found)?;
    if rfp.status() == Some(RfpStatus::Awarded) {
        return Err(AppError::Validation(
            "An awarded RFP cannot be sent again".to_string(),
        ));
    }

    let vendors = vendor_store::find_active_by_ids(&state.db, &req.vendor_ids).await?;
    if vendors.is_empty() {
        return Err(AppError::NotFound("No valid vendors found".to_string()));
    }

    let buyer = BuyerIdentity {
        name: &auth.user.name,
        company: auth.user.company.as_deref(),
    };
    let (mut sent, mut failed) = (0, 0);
    for vendor in &vendors {
        let mut message = rfp_invitation(&rfp, &buyer, &vendor.email);
        message.to_name = vendor.name.clone();

        let status = match state.mailer.send(&message).await {
            Ok(()) => {
                sent += 1;
                EmailStatus::Sent
            }
            Err(e) => {
                failed += 1;
                warn!(rfp_id = %rfp.id, vendor_id = %vendor.id, "RFP email failed: {e}");
                EmailStatus::Failed
            }
        };
        store::record_recipient(&state.db, rfp.id, vendor.id, status, Utc::now()).await?;
    }

    let rfp = store::set_status(&state.db, rfp.id, auth.user.id, RfpStatus::Open)
        .await?
        .ok_or_else(not_found)?;

    info!(rfp_id = %rfp.id, sent, failed, "RFP sent to vendors");
    Ok(Json(SendRfpResponse {
        rfp: store::detail(&state.db, rfp).await?,
        sent,
        failed,
    }))
}

/// GET /api/rfps/:rfp_id/summary
pub async fn handle_rfp_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rfp_id): Path<Uuid>,
) -> Result<Json<SummaryResponse>, AppError> {
    auth.require_buyer()?;
    let rfp = store::find_owned(&state.db, rfp_id, auth.user.id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(SummaryResponse {
        summary: ai::generate_summary(&state.llm, &rfp).await,
    }))
}

/// GET /api/rfps/:rfp_id/vendor-suggestions
pub async fn handle_vendor_suggestions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rfp_id): Path<Uuid>,
) -> Result<Json<VendorSuggestionsResponse>, AppError> {
    auth.require_buyer()?;
    let rfp = store::find_owned(&state.db, rfp_id, auth.user.id)
        .await?
        .ok_or_else(not_found)?;
    let vendors = vendor_store::list_active(&state.db).await?;
    Ok(Json(VendorSuggestionsResponse {
        suggestions: ai::suggest_vendors(&state.llm, &rfp, &vendors).await,
    }))
}
