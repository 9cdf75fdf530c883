//! Proposal persistence. Reads that feed the API join the vendor and RFP title.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::proposal::{
    AiAnalysis, LineItem, ProposalRow, ProposalStatus, ProposalWithVendor,
    PROPOSAL_WITH_VENDOR_COLUMNS,
};
use crate::models::rfp::{Attachment, RfpStatus};
use crate::pagination::PageQuery;

const JOINS: &str = " FROM proposals p JOIN vendors v ON v.id = p.vendor_id JOIN rfps r ON r.id = p.rfp_id";

fn select_with_vendor() -> String {
    format!("SELECT {PROPOSAL_WITH_VENDOR_COLUMNS}{JOINS}")
}

pub struct NewProposal<'a> {
    pub rfp_id: Uuid,
    pub vendor_id: Uuid,
    pub cover_letter: &'a str,
    pub technical_proposal: &'a str,
    pub deliverables: &'a str,
    pub total_cost: f64,
    pub currency: &'a str,
    pub cost_breakdown: &'a [LineItem],
    pub duration_weeks: Option<i32>,
    pub estimated_start_date: Option<DateTime<Utc>>,
    pub estimated_end_date: Option<DateTime<Utc>>,
    pub attachments: &'a [Attachment],
    pub source: &'a str,
}

/// Vendor-editable fields. Changing the duration moves the estimated end date.
#[derive(Debug, Default, Deserialize)]
pub struct ProposalUpdate {
    pub cover_letter: Option<String>,
    pub technical_proposal: Option<String>,
    pub deliverables: Option<String>,
    pub total_cost: Option<f64>,
    pub currency: Option<String>,
    pub cost_breakdown: Option<Vec<LineItem>>,
    pub duration_weeks: Option<i32>,
}

/// Whose proposals a listing covers.
#[derive(Debug, Clone, Copy)]
pub enum ProposalScope {
    All,
    RfpOwner(Uuid),
    Vendor(Uuid),
}

/// Inserts a proposal in `submitted` state.
pub async fn insert(pool: &PgPool, proposal: NewProposal<'_>) -> Result<ProposalRow, sqlx::Error> {
    sqlx::query_as::<_, ProposalRow>(
        r#"
        INSERT INTO proposals
            (id, rfp_id, vendor_id, cover_letter, technical_proposal, deliverables,
             total_cost, currency, cost_breakdown, duration_weeks, estimated_start_date,
             estimated_end_date, attachments, status, source, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(proposal.rfp_id)
    .bind(proposal.vendor_id)
    .bind(proposal.cover_letter)
    .bind(proposal.technical_proposal)
    .bind(proposal.deliverables)
    .bind(proposal.total_cost)
    .bind(proposal.currency)
    .bind(Json(proposal.cost_breakdown))
    .bind(proposal.duration_weeks)
    .bind(proposal.estimated_start_date)
    .bind(proposal.estimated_end_date)
    .bind(Json(proposal.attachments))
    .bind(ProposalStatus::Submitted.as_str())
    .bind(proposal.source)
    .fetch_one(pool)
    .await
}

pub async fn find_with_vendor(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<ProposalWithVendor>, sqlx::Error> {
    sqlx::query_as::<_, ProposalWithVendor>(&format!("{} WHERE p.id = $1", select_with_vendor()))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// The proposal, only if `vendor_id` submitted it.
pub async fn find_for_vendor(
    pool: &PgPool,
    id: Uuid,
    vendor_id: Uuid,
) -> Result<Option<ProposalWithVendor>, sqlx::Error> {
    sqlx::query_as::<_, ProposalWithVendor>(&format!(
        "{} WHERE p.id = $1 AND p.vendor_id = $2",
        select_with_vendor()
    ))
    .bind(id)
    .bind(vendor_id)
    .fetch_optional(pool)
    .await
}

pub async fn exists_for(pool: &PgPool, rfp_id: Uuid, vendor_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM proposals WHERE rfp_id = $1 AND vendor_id = $2)",
    )
    .bind(rfp_id)
    .bind(vendor_id)
    .fetch_one(pool)
    .await
}

pub async fn list_for_rfp(
    pool: &PgPool,
    rfp_id: Uuid,
) -> Result<Vec<ProposalWithVendor>, sqlx::Error> {
    sqlx::query_as::<_, ProposalWithVendor>(&format!(
        "{} WHERE p.rfp_id = $1 ORDER BY p.submitted_at DESC NULLS LAST",
        select_with_vendor()
    ))
    .bind(rfp_id)
    .fetch_all(pool)
    .await
}

/// Proposals that take part in evaluation, oldest first so positions are stable.
pub async fn list_evaluable(
    pool: &PgPool,
    rfp_id: Uuid,
) -> Result<Vec<ProposalWithVendor>, sqlx::Error> {
    sqlx::query_as::<_, ProposalWithVendor>(&format!(
        "{} WHERE p.rfp_id = $1 AND p.status = ANY($2) ORDER BY p.created_at, p.id",
        select_with_vendor()
    ))
    .bind(rfp_id)
    .bind(&ProposalStatus::EVALUABLE[..])
    .fetch_all(pool)
    .await
}

pub async fn list_scoped(
    pool: &PgPool,
    scope: ProposalScope,
) -> Result<Vec<ProposalWithVendor>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(select_with_vendor());
    match scope {
        ProposalScope::All => {}
        ProposalScope::RfpOwner(owner) => {
            qb.push(" WHERE r.created_by = ").push_bind(owner);
        }
        ProposalScope::Vendor(vendor_id) => {
            qb.push(" WHERE p.vendor_id = ").push_bind(vendor_id);
        }
    }
    qb.push(" ORDER BY p.submitted_at DESC NULLS LAST");
    qb.build_query_as::<ProposalWithVendor>().fetch_all(pool).await
}

fn push_vendor_filter(qb: &mut QueryBuilder<'_, Postgres>, vendor_id: Uuid, status: Option<&str>) {
    qb.push(" WHERE p.vendor_id = ").push_bind(vendor_id);
    if let Some(status) = status.filter(|s| !s.is_empty()) {
        qb.push(" AND p.status = ").push_bind(status.to_string());
    }
}

/// One vendor's proposals, newest first, with the total match count.
pub async fn list_for_vendor(
    pool: &PgPool,
    vendor_id: Uuid,
    status: Option<&str>,
    page: &PageQuery,
) -> Result<(Vec<ProposalWithVendor>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(select_with_vendor());
    push_vendor_filter(&mut qb, vendor_id, status);
    qb.push(" ORDER BY p.submitted_at DESC NULLS LAST LIMIT ")
        .push_bind(i64::from(page.limit()))
        .push(" OFFSET ")
        .push_bind(page.offset());
    let proposals = qb.build_query_as::<ProposalWithVendor>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){JOINS}"));
    push_vendor_filter(&mut count, vendor_id, status);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    Ok((proposals, total))
}

pub async fn update_content(
    pool: &PgPool,
    id: Uuid,
    changes: &ProposalUpdate,
) -> Result<Option<ProposalRow>, sqlx::Error> {
    sqlx::query_as::<_, ProposalRow>(
        r#"
        UPDATE proposals SET
            cover_letter       = COALESCE($2, cover_letter),
            technical_proposal = COALESCE($3, technical_proposal),
            deliverables       = COALESCE($4, deliverables),
            total_cost         = COALESCE($5, total_cost),
            currency           = COALESCE($6, currency),
            cost_breakdown     = COALESCE($7, cost_breakdown),
            duration_weeks     = COALESCE($8, duration_weeks),
            estimated_end_date = CASE
                WHEN $8::INTEGER IS NULL THEN estimated_end_date
                ELSE COALESCE(estimated_start_date, NOW()) + make_interval(weeks => $8::INTEGER)
            END,
            updated_at         = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.cover_letter.as_deref())
    .bind(changes.technical_proposal.as_deref())
    .bind(changes.deliverables.as_deref())
    .bind(changes.total_cost)
    .bind(changes.currency.as_deref())
    .bind(changes.cost_breakdown.as_deref().map(Json))
    .bind(changes.duration_weeks)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM proposals WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn save_analysis(
    pool: &PgPool,
    id: Uuid,
    analysis: &AiAnalysis,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE proposals SET
            compliance_score = $2, ai_strengths = $3, ai_weaknesses = $4, ai_summary = $5,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(analysis.compliance_score)
    .bind(&analysis.strengths)
    .bind(&analysis.weaknesses)
    .bind(&analysis.summary)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_attachments(
    pool: &PgPool,
    id: Uuid,
    attachments: &[Attachment],
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE proposals SET attachments = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(Json(attachments))
        .execute(pool)
        .await?;
    Ok(())
}

/// Records the buyer's score and notes and moves the proposal under review.
pub async fn record_review(
    pool: &PgPool,
    id: Uuid,
    score: i32,
    notes: Option<&str>,
) -> Result<Option<ProposalRow>, sqlx::Error> {
    sqlx::query_as::<_, ProposalRow>(
        r#"
        UPDATE proposals SET
            evaluation_score = $2,
            evaluation_notes = COALESCE($3, evaluation_notes),
            status = $4,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(score)
    .bind(notes)
    .bind(ProposalStatus::UnderReview.as_str())
    .fetch_optional(pool)
    .await
}

pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    status: ProposalStatus,
) -> Result<Option<ProposalRow>, sqlx::Error> {
    sqlx::query_as::<_, ProposalRow>(
        "UPDATE proposals SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await
}

/// Accepts one proposal, rejects its competitors and awards the RFP, atomically.
pub async fn accept(
    pool: &PgPool,
    proposal_id: Uuid,
    rfp_id: Uuid,
) -> Result<ProposalRow, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let accepted = sqlx::query_as::<_, ProposalRow>(
        "UPDATE proposals SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(proposal_id)
    .bind(ProposalStatus::Accepted.as_str())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE proposals SET status = $3, updated_at = NOW() WHERE rfp_id = $1 AND id <> $2",
    )
    .bind(rfp_id)
    .bind(proposal_id)
    .bind(ProposalStatus::Rejected.as_str())
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE rfps SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(rfp_id)
        .bind(RfpStatus::Awarded.as_str())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(accepted)
}
