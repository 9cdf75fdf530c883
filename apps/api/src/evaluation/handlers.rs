//! Axum route handlers for proposal comparison and recommendation.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::evaluation::cache::{should_regenerate, Artifact};
use crate::evaluation::{comparison, recommendation, store, ProposalBrief};
use crate::models::evaluation::{ComparisonOutcome, EvaluationListing, RecommendationOutcome};
use crate::models::proposal::ProposalWithVendor;
use crate::models::rfp::RfpRow;
use crate::proposals::store as proposal_store;
use crate::rfps::store as rfp_store;
use crate::state::AppState;
use crate::vendors::store as vendor_store;

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    #[serde(default, alias = "forceRefresh")]
    pub force_refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct RfpBrief {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub budget: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub rfp: RfpBrief,
    pub proposals_count: usize,
    pub proposals: Vec<ProposalBrief>,
    pub comparison: Option<ComparisonOutcome>,
    pub cached: bool,
    pub last_evaluated: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub rfp: RfpBrief,
    pub proposals_evaluated: usize,
    pub recommendation: Option<RecommendationOutcome>,
    pub cached: bool,
    pub last_evaluated: DateTime<Utc>,
}

/// Owned RFP plus its evaluable proposals; 404 when there are none.
async fn load_evaluable(
    state: &AppState,
    auth: &AuthUser,
    rfp_id: Uuid,
) -> Result<(RfpRow, Vec<ProposalWithVendor>), AppError> {
    auth.require_buyer()?;
    let rfp = rfp_store::find_owned(&state.db, rfp_id, auth.user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("RFP not found".to_string()))?;
    let proposals = proposal_store::list_evaluable(&state.db, rfp_id).await?;
    if proposals.is_empty() {
        return Err(AppError::NotFound(
            "No proposals found for this RFP".to_string(),
        ));
    }
    Ok((rfp, proposals))
}

fn proposal_ids(proposals: &[ProposalWithVendor]) -> Vec<Uuid> {
    proposals.iter().map(|p| p.proposal.id).collect()
}

/// GET /api/evaluation
pub async fn handle_list_evaluations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<EvaluationListing>>, AppError> {
    if auth.is_buyer_side() {
        return Ok(Json(
            store::list_for_evaluator(&state.db, auth.user.id).await?,
        ));
    }
    match vendor_store::find_by_user_id(&state.db, auth.user.id).await? {
        Some(vendor) => Ok(Json(
            store::list_completed_for_vendor(&state.db, vendor.id).await?,
        )),
        None => Ok(Json(Vec::new())),
    }
}

/// POST /api/evaluation/:rfp_id/compare
pub async fn handle_compare(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rfp_id): Path<Uuid>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<CompareResponse>, AppError> {
    let (rfp, proposals) = load_evaluable(&state, &auth, rfp_id).await?;
    if proposals.len() < 2 {
        return Err(AppError::Validation(
            "At least 2 proposals are required for comparison".to_string(),
        ));
    }

    let existing = store::find_by_rfp(&state.db, rfp_id).await?;
    let regenerate = should_regenerate(
        existing.as_ref(),
        Artifact::Comparison,
        query.force_refresh,
        proposals.len(),
    );

    let evaluation = match existing {
        Some(evaluation) if !regenerate => {
            info!(rfp_id = %rfp_id, "Serving cached comparison");
            evaluation
        }
        _ => {
            let outcome = comparison::compare_proposals(&state.llm, &rfp, &proposals).await;
            let saved = store::save_comparison(
                &state.db,
                rfp_id,
                &proposal_ids(&proposals),
                &outcome,
                auth.user.id,
            )
            .await?;
            info!(rfp_id = %rfp_id, ai = outcome.success, "Comparison stored");
            saved
        }
    };

    Ok(Json(CompareResponse {
        rfp: RfpBrief {
            id: rfp.id,
            title: rfp.title,
            description: None,
            budget: rfp.budget,
        },
        proposals_count: proposals.len(),
        proposals: proposals.iter().map(ProposalBrief::from).collect(),
        comparison: evaluation.comparison.map(|c| c.0),
        cached: !regenerate,
        last_evaluated: evaluation.last_evaluated_at,
    }))
}

/// GET /api/evaluation/:rfp_id/recommendation
pub async fn handle_recommendation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rfp_id): Path<Uuid>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<RecommendationResponse>, AppError> {
    let (rfp, proposals) = load_evaluable(&state, &auth, rfp_id).await?;

    let existing = store::find_by_rfp(&state.db, rfp_id).await?;
    let regenerate = should_regenerate(
        existing.as_ref(),
        Artifact::Recommendation,
        query.force_refresh,
        proposals.len(),
    );

    let evaluation = match existing {
        Some(evaluation) if !regenerate => {
            info!(rfp_id = %rfp_id, "Serving cached recommendation");
            evaluation
        }
        _ => {
            let outcome = recommendation::generate_recommendation(&state.llm, &rfp, &proposals)
                .await
                .ok_or_else(|| {
                    AppError::NotFound("No proposals found for this RFP".to_string())
                })?;
            let saved = store::save_recommendation(
                &state.db,
                rfp_id,
                &proposal_ids(&proposals),
                &outcome,
                auth.user.id,
            )
            .await?;
            info!(rfp_id = %rfp_id, ai = outcome.success, "Recommendation stored");
            saved
        }
    };

    Ok(Json(RecommendationResponse {
        rfp: RfpBrief {
            id: rfp.id,
            title: rfp.title,
            description: Some(rfp.description),
            budget: rfp.budget,
        },
        proposals_evaluated: proposals.len(),
        recommendation: evaluation.recommendation.map(|r| r.0),
        cached: !regenerate,
        last_evaluated: evaluation.last_evaluated_at,
    }))
}

/// DELETE /api/evaluation/:rfp_id
pub async fn handle_delete_evaluation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rfp_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_buyer()?;
    if !store::delete(&state.db, rfp_id, auth.user.id).await? {
        return Err(AppError::NotFound("Evaluation not found".to_string()));
    }
    info!(rfp_id = %rfp_id, "Evaluation deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refresh(uri: &str) -> RefreshQuery {
        let uri: axum::http::Uri = uri.parse().unwrap();
        Query::<RefreshQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_refresh_query_accepts_both_spellings() {
        assert!(refresh("/api/evaluation/x/compare?force_refresh=true").force_refresh);
        assert!(refresh("/api/evaluation/x/compare?forceRefresh=true").force_refresh);
        assert!(!refresh("/api/evaluation/x/compare").force_refresh);
    }
}
