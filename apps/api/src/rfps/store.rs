//! RFP and recipient persistence.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::rfp::{
    Attachment, BuyerRef, EmailStatus, EvaluationCriterion, RecipientRow, RfpDetail, RfpRow,
    RfpStatus,
};
use crate::pagination::PageQuery;

pub struct NewRfp<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub requirements: &'a str,
    pub budget: Option<f64>,
    pub currency: &'a str,
    pub deadline: DateTime<Utc>,
    pub category: Option<&'a str>,
    pub attachments: &'a [Attachment],
    pub evaluation_criteria: &'a [EvaluationCriterion],
    pub created_by: Uuid,
}

/// Partial update; `None` leaves the column untouched. Status moves through send/close/accept only.
#[derive(Debug, Default, Deserialize)]
pub struct RfpUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub budget: Option<f64>,
    pub currency: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub attachments: Option<Vec<Attachment>>,
    pub evaluation_criteria: Option<Vec<EvaluationCriterion>>,
}

/// Whose RFPs a listing covers.
#[derive(Debug, Clone, Copy)]
pub enum RfpScope {
    CreatedBy(Uuid),
    SentTo(Uuid),
}

#[derive(Debug, Default)]
pub struct RfpFilter {
    pub status: Option<String>,
    pub category: Option<String>,
}

pub async fn insert(pool: &PgPool, rfp: NewRfp<'_>) -> Result<RfpRow, sqlx::Error> {
    sqlx::query_as::<_, RfpRow>(
        r#"
        INSERT INTO rfps
            (id, title, description, requirements, budget, currency, deadline, category,
             attachments, evaluation_criteria, created_by, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(rfp.title)
    .bind(rfp.description)
    .bind(rfp.requirements)
    .bind(rfp.budget)
    .bind(rfp.currency)
    .bind(rfp.deadline)
    .bind(rfp.category)
    .bind(Json(rfp.attachments))
    .bind(Json(rfp.evaluation_criteria))
    .bind(rfp.created_by)
    .bind(RfpStatus::Draft.as_str())
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<RfpRow>, sqlx::Error> {
    sqlx::query_as::<_, RfpRow>("SELECT * FROM rfps WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_owned(
    pool: &PgPool,
    id: Uuid,
    owner: Uuid,
) -> Result<Option<RfpRow>, sqlx::Error> {
    sqlx::query_as::<_, RfpRow>("SELECT * FROM rfps WHERE id = $1 AND created_by = $2")
        .bind(id)
        .bind(owner)
        .fetch_optional(pool)
        .await
}

/// The RFP, only if it was sent to `vendor_id`.
pub async fn find_sent_to(
    pool: &PgPool,
    id: Uuid,
    vendor_id: Uuid,
) -> Result<Option<RfpRow>, sqlx::Error> {
    sqlx::query_as::<_, RfpRow>(
        r#"
        SELECT r.* FROM rfps r
        JOIN rfp_recipients rr ON rr.rfp_id = r.id
        WHERE r.id = $1 AND rr.vendor_id = $2
        "#,
    )
    .bind(id)
    .bind(vendor_id)
    .fetch_optional(pool)
    .await
}

fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: RfpScope, filter: &RfpFilter) {
    match scope {
        RfpScope::CreatedBy(owner) => {
            qb.push(" WHERE r.created_by = ").push_bind(owner);
        }
        RfpScope::SentTo(vendor_id) => {
            qb.push(
                " WHERE EXISTS (SELECT 1 FROM rfp_recipients rr WHERE rr.rfp_id = r.id AND rr.vendor_id = ",
            )
            .push_bind(vendor_id)
            .push(")");
        }
    }
    if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND r.status = ").push_bind(status.to_string());
    }
    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        qb.push(" AND r.category = ").push_bind(category.to_string());
    }
}

/// Newest first, with the total match count for pagination.
pub async fn list(
    pool: &PgPool,
    scope: RfpScope,
    filter: &RfpFilter,
    page: &PageQuery,
) -> Result<(Vec<RfpRow>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT r.* FROM rfps r");
    push_scope(&mut qb, scope, filter);
    qb.push(" ORDER BY r.created_at DESC LIMIT ")
        .push_bind(i64::from(page.limit()))
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rfps = qb.build_query_as::<RfpRow>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM rfps r");
    push_scope(&mut count, scope, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    Ok((rfps, total))
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    owner: Uuid,
    changes: &RfpUpdate,
) -> Result<Option<RfpRow>, sqlx::Error> {
    sqlx::query_as::<_, RfpRow>(
        r#"
        UPDATE rfps SET
            title               = COALESCE($3, title),
            description         = COALESCE($4, description),
            requirements        = COALESCE($5, requirements),
            budget              = COALESCE($6, budget),
            currency            = COALESCE($7, currency),
            deadline            = COALESCE($8, deadline),
            category            = COALESCE($9, category),
            attachments         = COALESCE($10, attachments),
            evaluation_criteria = COALESCE($11, evaluation_criteria),
            updated_at          = NOW()
        WHERE id = $1 AND created_by = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(owner)
    .bind(changes.title.as_deref().map(str::trim))
    .bind(changes.description.as_deref())
    .bind(changes.requirements.as_deref())
    .bind(changes.budget)
    .bind(changes.currency.as_deref().map(str::trim))
    .bind(changes.deadline)
    .bind(changes.category.as_deref().map(str::trim))
    .bind(changes.attachments.as_deref().map(Json))
    .bind(changes.evaluation_criteria.as_deref().map(Json))
    .fetch_optional(pool)
    .await
}

pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    owner: Uuid,
    status: RfpStatus,
) -> Result<Option<RfpRow>, sqlx::Error> {
    sqlx::query_as::<_, RfpRow>(
        r#"
        UPDATE rfps SET status = $3, updated_at = NOW()
        WHERE id = $1 AND created_by = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(owner)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await
}

/// Inserts or refreshes the delivery record for one vendor.
pub async fn record_recipient(
    pool: &PgPool,
    rfp_id: Uuid,
    vendor_id: Uuid,
    status: EmailStatus,
    sent_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO rfp_recipients (rfp_id, vendor_id, sent_at, email_status)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (rfp_id, vendor_id)
        DO UPDATE SET sent_at = EXCLUDED.sent_at, email_status = EXCLUDED.email_status
        "#,
    )
    .bind(rfp_id)
    .bind(vendor_id)
    .bind(sent_at)
    .bind(status.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn recipients(pool: &PgPool, rfp_id: Uuid) -> Result<Vec<RecipientRow>, sqlx::Error> {
    sqlx::query_as::<_, RecipientRow>(
        r#"
        SELECT rr.vendor_id, v.name AS vendor_name, v.email AS vendor_email,
               v.company AS vendor_company, rr.sent_at, rr.email_status
        FROM rfp_recipients rr
        JOIN vendors v ON v.id = rr.vendor_id
        WHERE rr.rfp_id = $1
        ORDER BY v.company
        "#,
    )
    .bind(rfp_id)
    .fetch_all(pool)
    .await
}

pub async fn find_buyer(pool: &PgPool, user_id: Uuid) -> Result<Option<BuyerRef>, sqlx::Error> {
    sqlx::query_as::<_, BuyerRef>("SELECT id, name, email, company FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// The RFP with its author and delivery records.
pub async fn detail(pool: &PgPool, rfp: RfpRow) -> Result<RfpDetail, sqlx::Error> {
    let created_by_user = find_buyer(pool, rfp.created_by).await?;
    let sent_to = recipients(pool, rfp.id).await?;
    Ok(RfpDetail {
        rfp,
        created_by_user,
        sent_to,
    })
}
