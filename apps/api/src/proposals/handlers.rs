//! Axum route handlers for proposal submission, vendor self-service and buyer decisions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::models::proposal::{
    LineItem, ProposalRow, ProposalStatus, ProposalWithVendor, SOURCE_PORTAL,
};
use crate::models::rfp::{RfpRow, RfpStatus};
use crate::models::user::Role;
use crate::models::vendor::VendorRow;
use crate::pagination::{Page, PageQuery};
use crate::proposals::lifecycle::{self, analyze_and_store, invalidate_evaluation, notify_buyer};
use crate::proposals::store::{self, NewProposal, ProposalScope, ProposalUpdate};
use crate::rfps::store as rfp_store;
use crate::state::AppState;
use crate::validation::{normalize_currency, require_text};
use crate::vendors::store as vendor_store;

#[derive(Debug, Deserialize)]
pub struct SubmitProposalRequest {
    pub rfp_id: Uuid,
    pub cover_letter: String,
    pub technical_proposal: String,
    #[serde(default)]
    pub deliverables: String,
    pub total_cost: f64,
    pub currency: Option<String>,
    #[serde(default)]
    pub cost_breakdown: Vec<LineItem>,
    pub duration_weeks: i32,
}

#[derive(Debug, Deserialize)]
pub struct MyProposalsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(alias = "score")]
    pub evaluation_score: i32,
    #[serde(alias = "notes")]
    pub evaluation_notes: Option<String>,
}

fn not_found() -> AppError {
    AppError::NotFound("Proposal not found".to_string())
}

fn rfp_not_found() -> AppError {
    AppError::NotFound("RFP not found".to_string())
}

fn validate_cost(total_cost: f64) -> Result<(), AppError> {
    if !total_cost.is_finite() || total_cost < 0.0 {
        return Err(AppError::Validation(
            "total_cost must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

fn validate_duration(weeks: i32) -> Result<(), AppError> {
    if weeks <= 0 {
        return Err(AppError::Validation("Invalid timeline duration".to_string()));
    }
    Ok(())
}

fn validate_score(score: i32) -> Result<(), AppError> {
    if !(0..=100).contains(&score) {
        return Err(AppError::Validation(
            "evaluation_score must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

/// Estimated start and end for a proposal that starts at `now`.
fn estimated_window(now: DateTime<Utc>, weeks: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + Duration::days(7 * i64::from(weeks)))
}

fn check_editable(rfp: &RfpRow, proposal: &ProposalRow, now: DateTime<Utc>) -> Result<(), AppError> {
    if proposal.status().is_some_and(|s| s.is_decided()) {
        return Err(AppError::Validation(format!(
            "Cannot update a proposal that has been {}",
            proposal.status
        )));
    }
    rfp.accepts_proposals_at(now)
        .map_err(|reason| AppError::Validation(format!("Cannot update proposal: {reason}")))
}

fn check_withdrawable(rfp: &RfpRow, proposal: &ProposalRow) -> Result<(), AppError> {
    if proposal.status() == Some(ProposalStatus::Accepted) {
        return Err(AppError::Validation(
            "Cannot withdraw an accepted proposal".to_string(),
        ));
    }
    if rfp.status() != Some(RfpStatus::Open) {
        return Err(AppError::Validation(
            "Proposals can only be withdrawn while the RFP is open".to_string(),
        ));
    }
    Ok(())
}

fn validate_update(changes: &ProposalUpdate) -> Result<(), AppError> {
    for (value, field) in [
        (&changes.cover_letter, "cover_letter"),
        (&changes.technical_proposal, "technical_proposal"),
    ] {
        if let Some(value) = value {
            require_text(value, field)?;
        }
    }
    if let Some(cost) = changes.total_cost {
        validate_cost(cost)?;
    }
    if let Some(weeks) = changes.duration_weeks {
        validate_duration(weeks)?;
    }
    Ok(())
}

async fn vendor_profile(state: &AppState, auth: &AuthUser) -> Result<VendorRow, AppError> {
    auth.require_role(&[Role::Vendor])?;
    vendor_store::find_by_user_id(&state.db, auth.user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Vendor profile not found".to_string()))
}

/// The proposal and its RFP, provided the caller owns that RFP.
async fn owned_proposal(
    state: &AppState,
    auth: &AuthUser,
    proposal_id: Uuid,
) -> Result<(ProposalWithVendor, RfpRow), AppError> {
    auth.require_buyer()?;
    let proposal = store::find_with_vendor(&state.db, proposal_id)
        .await?
        .ok_or_else(not_found)?;
    let rfp = rfp_store::find_by_id(&state.db, proposal.proposal.rfp_id)
        .await?
        .ok_or_else(rfp_not_found)?;
    if rfp.created_by != auth.user.id {
        return Err(AppError::Forbidden(
            "Not authorized to access this proposal".to_string(),
        ));
    }
    Ok((proposal, rfp))
}

async fn reload(state: &AppState, proposal_id: Uuid) -> Result<ProposalWithVendor, AppError> {
    store::find_with_vendor(&state.db, proposal_id)
        .await?
        .ok_or_else(not_found)
}

/// POST /api/proposals
pub async fn handle_submit_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SubmitProposalRequest>,
) -> Result<(StatusCode, Json<ProposalWithVendor>), AppError> {
    let vendor = vendor_profile(&state, &auth).await?;

    let cover_letter = require_text(&req.cover_letter, "cover_letter")?;
    let technical_proposal = require_text(&req.technical_proposal, "technical_proposal")?;
    validate_cost(req.total_cost)?;
    validate_duration(req.duration_weeks)?;
    let currency = normalize_currency(req.currency.as_deref())?;

    let rfp = rfp_store::find_by_id(&state.db, req.rfp_id)
        .await?
        .ok_or_else(rfp_not_found)?;
    let now = Utc::now();
    rfp.accepts_proposals_at(now).map_err(AppError::Validation)?;

    if store::exists_for(&state.db, rfp.id, vendor.id).await? {
        return Err(AppError::Conflict(
            "You have already submitted a proposal for this RFP".to_string(),
        ));
    }

    let (start, end) = estimated_window(now, req.duration_weeks);
    let proposal = store::insert(
        &state.db,
        NewProposal {
            rfp_id: rfp.id,
            vendor_id: vendor.id,
            cover_letter,
            technical_proposal,
            deliverables: req.deliverables.trim(),
            total_cost: req.total_cost,
            currency: &currency,
            cost_breakdown: &req.cost_breakdown,
            duration_weeks: Some(req.duration_weeks),
            estimated_start_date: Some(start),
            estimated_end_date: Some(end),
            attachments: &[],
            source: SOURCE_PORTAL,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("You have already submitted a proposal for this RFP".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    info!(proposal_id = %proposal.id, rfp_id = %rfp.id, vendor_id = %vendor.id, "Proposal submitted");

    invalidate_evaluation(&state, rfp.id).await;
    analyze_and_store(&state, &rfp, &proposal).await;

    let proposal = reload(&state, proposal.id).await?;
    notify_buyer(&state, &rfp, &proposal).await;

    Ok((StatusCode::CREATED, Json(proposal)))
}

/// GET /api/proposals
pub async fn handle_list_proposals(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ProposalWithVendor>>, AppError> {
    let scope = match auth.role {
        Role::Admin => ProposalScope::All,
        Role::Buyer => ProposalScope::RfpOwner(auth.user.id),
        Role::Vendor => match vendor_store::find_by_user_id(&state.db, auth.user.id).await? {
            Some(vendor) => ProposalScope::Vendor(vendor.id),
            None => return Ok(Json(Vec::new())),
        },
    };
    Ok(Json(store::list_scoped(&state.db, scope).await?))
}

/// GET /api/rfps/:rfp_id/proposals
pub async fn handle_list_for_rfp(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rfp_id): Path<Uuid>,
) -> Result<Json<Vec<ProposalWithVendor>>, AppError> {
    auth.require_buyer()?;
    rfp_store::find_owned(&state.db, rfp_id, auth.user.id)
        .await?
        .ok_or_else(rfp_not_found)?;
    Ok(Json(store::list_for_rfp(&state.db, rfp_id).await?))
}

/// GET /api/proposals/:proposal_id
pub async fn handle_get_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<ProposalWithVendor>, AppError> {
    let (proposal, _) = owned_proposal(&state, &auth, proposal_id).await?;
    Ok(Json(proposal))
}

/// GET /api/proposals/my-proposals
pub async fn handle_my_proposals(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<MyProposalsQuery>,
) -> Result<Json<Page<ProposalWithVendor>>, AppError> {
    auth.require_role(&[Role::Vendor])?;
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let Some(vendor) = vendor_store::find_by_user_id(&state.db, auth.user.id).await? else {
        return Ok(Json(Page::empty(&page)));
    };

    let (proposals, total) =
        store::list_for_vendor(&state.db, vendor.id, query.status.as_deref(), &page).await?;
    Ok(Json(Page::new(proposals, total, &page)))
}

/// GET /api/proposals/my-proposals/:proposal_id
pub async fn handle_get_my_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<ProposalWithVendor>, AppError> {
    let vendor = vendor_profile(&state, &auth).await?;
    let proposal = store::find_for_vendor(&state.db, proposal_id, vendor.id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(proposal))
}

/// PUT /api/proposals/my-proposals/:proposal_id
pub async fn handle_update_my_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(proposal_id): Path<Uuid>,
    Json(mut changes): Json<ProposalUpdate>,
) -> Result<Json<ProposalWithVendor>, AppError> {
    let vendor = vendor_profile(&state, &auth).await?;
    let existing = store::find_for_vendor(&state.db, proposal_id, vendor.id)
        .await?
        .ok_or_else(not_found)?;
    let rfp = rfp_store::find_by_id(&state.db, existing.proposal.rfp_id)
        .await?
        .ok_or_else(rfp_not_found)?;

    check_editable(&rfp, &existing.proposal, Utc::now())?;
    validate_update(&changes)?;
    if changes.currency.is_some() {
        changes.currency = Some(normalize_currency(changes.currency.as_deref())?);
    }

    store::update_content(&state.db, proposal_id, &changes)
        .await?
        .ok_or_else(not_found)?;
    info!(%proposal_id, rfp_id = %rfp.id, "Proposal updated by vendor");

    invalidate_evaluation(&state, rfp.id).await;
    Ok(Json(reload(&state, proposal_id).await?))
}

/// DELETE /api/proposals/my-proposals/:proposal_id
pub async fn handle_withdraw_my_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(proposal_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let vendor = vendor_profile(&state, &auth).await?;
    let existing = store::find_for_vendor(&state.db, proposal_id, vendor.id)
        .await?
        .ok_or_else(not_found)?;
    let rfp = rfp_store::find_by_id(&state.db, existing.proposal.rfp_id)
        .await?
        .ok_or_else(rfp_not_found)?;

    check_withdrawable(&rfp, &existing.proposal)?;

    if !store::delete(&state.db, proposal_id).await? {
        return Err(not_found());
    }
    info!(%proposal_id, rfp_id = %rfp.id, "Proposal withdrawn");

    invalidate_evaluation(&state, rfp.id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/proposals/:proposal_id/review
pub async fn handle_review_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(proposal_id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<ProposalWithVendor>, AppError> {
    validate_score(req.evaluation_score)?;
    let (existing, rfp) = owned_proposal(&state, &auth, proposal_id).await?;
    if existing.proposal.status().is_some_and(|s| s.is_decided()) {
        return Err(AppError::Validation(format!(
            "Proposal has already been {}",
            existing.proposal.status
        )));
    }

    let notes = req
        .evaluation_notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    lifecycle::record_review(&state.db, rfp.id, proposal_id, req.evaluation_score, notes)
        .await?
        .ok_or_else(not_found)?;

    info!(%proposal_id, score = req.evaluation_score, "Proposal reviewed");
    Ok(Json(reload(&state, proposal_id).await?))
}

/// POST /api/proposals/:proposal_id/accept
pub async fn handle_accept_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<ProposalWithVendor>, AppError> {
    let (_, rfp) = owned_proposal(&state, &auth, proposal_id).await?;
    if rfp.status() == Some(RfpStatus::Awarded) {
        return Err(AppError::Validation(
            "This RFP has already been awarded".to_string(),
        ));
    }

    store::accept(&state.db, proposal_id, rfp.id).await?;
    info!(%proposal_id, rfp_id = %rfp.id, "Proposal accepted; RFP awarded");

    invalidate_evaluation(&state, rfp.id).await;
    Ok(Json(reload(&state, proposal_id).await?))
}

/// POST /api/proposals/:proposal_id/reject
pub async fn handle_reject_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<ProposalWithVendor>, AppError> {
    let (existing, rfp) = owned_proposal(&state, &auth, proposal_id).await?;
    if existing.proposal.status() == Some(ProposalStatus::Accepted) {
        return Err(AppError::Validation(
            "Cannot reject an accepted proposal".to_string(),
        ));
    }

    store::set_status(&state.db, proposal_id, ProposalStatus::Rejected)
        .await?
        .ok_or_else(not_found)?;
    info!(%proposal_id, rfp_id = %rfp.id, "Proposal rejected");

    invalidate_evaluation(&state, rfp.id).await;
    Ok(Json(reload(&state, proposal_id).await?))
}

/// POST /api/proposals/:proposal_id/analyze
pub async fn handle_reanalyze_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<ProposalWithVendor>, AppError> {
    let (existing, rfp) = owned_proposal(&state, &auth, proposal_id).await?;
    analyze_and_store(&state, &rfp, &existing.proposal).await;
    invalidate_evaluation(&state, rfp.id).await;
    Ok(Json(reload(&state, proposal_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{make_proposal, make_rfp};

    fn proposal_with_status(status: &str) -> ProposalRow {
        let mut p = make_proposal("Globex", 1_000.0, None, None).proposal;
        p.status = status.to_string();
        p
    }

    #[test]
    fn test_submit_request_defaults() {
        let req: SubmitProposalRequest = serde_json::from_str(&format!(
            r#"{{"rfp_id": "{}", "cover_letter": "Hi", "technical_proposal": "Plan",
                "total_cost": 4200.5, "duration_weeks": 6}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert!(req.deliverables.is_empty());
        assert!(req.cost_breakdown.is_empty());
        assert!(req.currency.is_none());
        assert_eq!(req.duration_weeks, 6);
    }

    #[test]
    fn test_duration_must_be_positive() {
        assert!(matches!(
            validate_duration(0),
            Err(AppError::Validation(msg)) if msg == "Invalid timeline duration"
        ));
        assert!(validate_duration(-3).is_err());
        assert!(validate_duration(1).is_ok());
    }

    #[test]
    fn test_score_range() {
        assert!(validate_score(0).is_ok());
        assert!(validate_score(100).is_ok());
        assert!(validate_score(101).is_err());
        assert!(validate_score(-1).is_err());
    }

    #[test]
    fn test_estimated_window_spans_whole_weeks() {
        let now = Utc::now();
        let (start, end) = estimated_window(now, 3);
        assert_eq!(start, now);
        assert_eq!((end - start).num_days(), 21);
    }

    #[test]
    fn test_decided_proposals_cannot_be_edited() {
        let rfp = make_rfp("open", Utc::now() + Duration::days(5));
        for status in ["accepted", "rejected"] {
            assert!(check_editable(&rfp, &proposal_with_status(status), Utc::now()).is_err());
        }
        assert!(check_editable(&rfp, &proposal_with_status("under_review"), Utc::now()).is_ok());
    }

    #[test]
    fn test_edit_after_deadline_rejected() {
        let rfp = make_rfp("open", Utc::now() - Duration::hours(1));
        let err = check_editable(&rfp, &proposal_with_status("submitted"), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("deadline")));
    }

    #[test]
    fn test_withdraw_rules() {
        let open = make_rfp("open", Utc::now() + Duration::days(1));
        let closed = make_rfp("closed", Utc::now() + Duration::days(1));

        assert!(check_withdrawable(&open, &proposal_with_status("submitted")).is_ok());
        assert!(check_withdrawable(&open, &proposal_with_status("rejected")).is_ok());
        assert!(check_withdrawable(&open, &proposal_with_status("accepted")).is_err());
        assert!(check_withdrawable(&closed, &proposal_with_status("submitted")).is_err());
    }

    #[test]
    fn test_update_validation() {
        let blank = ProposalUpdate {
            cover_letter: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(validate_update(&blank).is_err());

        let negative = ProposalUpdate {
            total_cost: Some(-5.0),
            ..Default::default()
        };
        assert!(validate_update(&negative).is_err());

        let ok = ProposalUpdate {
            duration_weeks: Some(8),
            ..Default::default()
        };
        assert!(validate_update(&ok).is_ok());
    }

    #[test]
    fn test_review_accepts_short_field_names() {
        let req: ReviewRequest =
            serde_json::from_str(r#"{"score": 72, "notes": "Solid plan"}"#).unwrap();
        assert_eq!(req.evaluation_score, 72);
        assert_eq!(req.evaluation_notes.as_deref(), Some("Solid plan"));
    }
}
