//! Evaluation persistence: at most one row per RFP.

use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::evaluation::{
    ComparisonOutcome, EvaluationListing, EvaluationRow, EvaluationStatus, RecommendationOutcome,
};

const LISTING_SELECT: &str = r#"
    SELECT e.*, r.title AS rfp_title, r.description AS rfp_description, r.budget AS rfp_budget
    FROM evaluations e
    JOIN rfps r ON r.id = e.rfp_id
"#;

pub async fn find_by_rfp(pool: &PgPool, rfp_id: Uuid) -> Result<Option<EvaluationRow>, sqlx::Error> {
    sqlx::query_as::<_, EvaluationRow>("SELECT * FROM evaluations WHERE rfp_id = $1")
        .bind(rfp_id)
        .fetch_optional(pool)
        .await
}

/// Stores a fresh comparison. A stored recommendation is kept only if it covers the same proposals.
pub async fn save_comparison(
    pool: &PgPool,
    rfp_id: Uuid,
    proposal_ids: &[Uuid],
    comparison: &ComparisonOutcome,
    evaluated_by: Uuid,
) -> Result<EvaluationRow, sqlx::Error> {
    sqlx::query_as::<_, EvaluationRow>(
        r#"
        INSERT INTO evaluations
            (id, rfp_id, proposal_ids, comparison, evaluated_by, proposals_count, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (rfp_id) DO UPDATE SET
            proposal_ids      = EXCLUDED.proposal_ids,
            comparison        = EXCLUDED.comparison,
            recommendation    = CASE
                WHEN evaluations.status = 'outdated' OR evaluations.proposal_ids <> EXCLUDED.proposal_ids
                THEN NULL
                ELSE evaluations.recommendation
            END,
            evaluated_by      = EXCLUDED.evaluated_by,
            proposals_count   = EXCLUDED.proposals_count,
            status            = EXCLUDED.status,
            last_evaluated_at = NOW(),
            updated_at        = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(rfp_id)
    .bind(proposal_ids)
    .bind(Json(comparison))
    .bind(evaluated_by)
    .bind(proposal_ids.len() as i32)
    .bind(EvaluationStatus::Completed.as_str())
    .fetch_one(pool)
    .await
}

/// Stores a fresh recommendation. A stored comparison is kept only if it covers the same proposals.
pub async fn save_recommendation(
    pool: &PgPool,
    rfp_id: Uuid,
    proposal_ids: &[Uuid],
    recommendation: &RecommendationOutcome,
    evaluated_by: Uuid,
) -> Result<EvaluationRow, sqlx::Error> {
    sqlx::query_as::<_, EvaluationRow>(
        r#"
        INSERT INTO evaluations
            (id, rfp_id, proposal_ids, recommendation, evaluated_by, proposals_count, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (rfp_id) DO UPDATE SET
            proposal_ids      = EXCLUDED.proposal_ids,
            recommendation    = EXCLUDED.recommendation,
            comparison        = CASE
                WHEN evaluations.status = 'outdated' OR evaluations.proposal_ids <> EXCLUDED.proposal_ids
                THEN NULL
                ELSE evaluations.comparison
            END,
            evaluated_by      = EXCLUDED.evaluated_by,
            proposals_count   = EXCLUDED.proposals_count,
            status            = EXCLUDED.status,
            last_evaluated_at = NOW(),
            updated_at        = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(rfp_id)
    .bind(proposal_ids)
    .bind(Json(recommendation))
    .bind(evaluated_by)
    .bind(proposal_ids.len() as i32)
    .bind(EvaluationStatus::Completed.as_str())
    .fetch_one(pool)
    .await
}

/// Evaluations a buyer produced, most recent first.
pub async fn list_for_evaluator(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<EvaluationListing>, sqlx::Error> {
    sqlx::query_as::<_, EvaluationListing>(&format!(
        "{LISTING_SELECT} WHERE e.evaluated_by = $1 ORDER BY e.last_evaluated_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Completed evaluations of RFPs the vendor submitted a proposal to.
pub async fn list_completed_for_vendor(
    pool: &PgPool,
    vendor_id: Uuid,
) -> Result<Vec<EvaluationListing>, sqlx::Error> {
    sqlx::query_as::<_, EvaluationListing>(&format!(
        r#"{LISTING_SELECT}
        WHERE e.status = $2
          AND EXISTS (SELECT 1 FROM proposals p WHERE p.rfp_id = e.rfp_id AND p.vendor_id = $1)
        ORDER BY e.last_evaluated_at DESC"#
    ))
    .bind(vendor_id)
    .bind(EvaluationStatus::Completed.as_str())
    .fetch_all(pool)
    .await
}

pub async fn delete(pool: &PgPool, rfp_id: Uuid, evaluated_by: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM evaluations WHERE rfp_id = $1 AND evaluated_by = $2")
        .bind(rfp_id)
        .bind(evaluated_by)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Flags the RFP's evaluation for regeneration. Returns whether one existed.
pub async fn mark_outdated(pool: &PgPool, rfp_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE evaluations SET status = $2, updated_at = NOW() WHERE rfp_id = $1",
    )
    .bind(rfp_id)
    .bind(EvaluationStatus::Outdated.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
