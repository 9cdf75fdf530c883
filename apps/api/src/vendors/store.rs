//! Vendor persistence. All functions return raw `sqlx` errors; handlers decide the HTTP mapping.

use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::like_pattern;
use crate::models::vendor::{Address, VendorRow, VENDOR_STATUS_ACTIVE};
use crate::pagination::PageQuery;

pub struct NewVendor<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub company: &'a str,
    pub phone: Option<&'a str>,
    pub address: Option<&'a Address>,
    pub categories: &'a [String],
    pub website: Option<&'a str>,
    pub user_id: Option<Uuid>,
    pub created_by: Uuid,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Default, Deserialize)]
pub struct VendorUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub categories: Option<Vec<String>>,
    pub website: Option<String>,
    pub is_active: Option<bool>,
    pub status: Option<String>,
}

#[derive(Debug, Default)]
pub struct VendorFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

pub async fn insert(pool: &PgPool, vendor: NewVendor<'_>) -> Result<VendorRow, sqlx::Error> {
    sqlx::query_as::<_, VendorRow>(
        r#"
        INSERT INTO vendors
            (id, name, email, company, phone, address, categories, website, user_id, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(vendor.name)
    .bind(vendor.email)
    .bind(vendor.company)
    .bind(vendor.phone)
    .bind(vendor.address.map(Json))
    .bind(vendor.categories)
    .bind(vendor.website)
    .bind(vendor.user_id)
    .bind(vendor.created_by)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<VendorRow>, sqlx::Error> {
    sqlx::query_as::<_, VendorRow>("SELECT * FROM vendors WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<VendorRow>, sqlx::Error> {
    sqlx::query_as::<_, VendorRow>("SELECT * FROM vendors WHERE email = $1")
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await
}

/// The vendor profile linked to a vendor-role user account.
pub async fn find_by_user_id(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<VendorRow>, sqlx::Error> {
    sqlx::query_as::<_, VendorRow>("SELECT * FROM vendors WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Vendors that can be invited: `$1` is bound to the active status.
fn active_vendors_sql(extra: &str) -> String {
    format!("SELECT * FROM vendors WHERE status = $1 AND is_active{extra} ORDER BY company")
}

pub async fn find_active_by_ids(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<VendorRow>, sqlx::Error> {
    sqlx::query_as::<_, VendorRow>(&active_vendors_sql(" AND id = ANY($2)"))
        .bind(VENDOR_STATUS_ACTIVE)
        .bind(ids)
        .fetch_all(pool)
        .await
}

pub async fn list_active(pool: &PgPool) -> Result<Vec<VendorRow>, sqlx::Error> {
    sqlx::query_as::<_, VendorRow>(&active_vendors_sql(""))
        .bind(VENDOR_STATUS_ACTIVE)
        .fetch_all(pool)
        .await
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &VendorFilter) {
    qb.push(" WHERE TRUE");
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR company ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        qb.push(" AND ")
            .push_bind(category.to_string())
            .push(" = ANY(categories)");
    }
}

/// Newest first, with the total match count for pagination.
pub async fn list(
    pool: &PgPool,
    filter: &VendorFilter,
    page: &PageQuery,
) -> Result<(Vec<VendorRow>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM vendors");
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(i64::from(page.limit()))
        .push(" OFFSET ")
        .push_bind(page.offset());
    let vendors = qb.build_query_as::<VendorRow>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM vendors");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    Ok((vendors, total))
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    changes: &VendorUpdate,
) -> Result<Option<VendorRow>, sqlx::Error> {
    sqlx::query_as::<_, VendorRow>(
        r#"
        UPDATE vendors SET
            name       = COALESCE($2, name),
            email      = COALESCE($3, email),
            company    = COALESCE($4, company),
            phone      = COALESCE($5, phone),
            address    = COALESCE($6, address),
            categories = COALESCE($7, categories),
            website    = COALESCE($8, website),
            is_active  = COALESCE($9, is_active),
            status     = COALESCE($10, status),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.name.as_deref().map(str::trim))
    .bind(changes.email.as_deref().map(|e| e.trim().to_lowercase()))
    .bind(changes.company.as_deref().map(str::trim))
    .bind(changes.phone.as_deref())
    .bind(changes.address.as_ref().map(Json))
    .bind(changes.categories.as_deref())
    .bind(changes.website.as_deref())
    .bind(changes.is_active)
    .bind(changes.status.as_deref())
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM vendors WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_buyer, seed_vendor, test_pool};

    #[test]
    fn test_active_queries_share_one_predicate() {
        let listed = active_vendors_sql("");
        let by_ids = active_vendors_sql(" AND id = ANY($2)");
        assert!(listed.contains("status = $1 AND is_active"));
        assert!(by_ids.contains("status = $1 AND is_active AND id = ANY($2)"));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL and a local Postgres"]
    async fn test_deactivated_vendor_is_not_invited() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let buyer = seed_buyer(&pool).await;
        let kept = seed_vendor(&pool, buyer).await;
        let paused = seed_vendor(&pool, buyer).await;
        let changes = VendorUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        update(&pool, paused.id, &changes).await.unwrap().unwrap();

        let found = find_active_by_ids(&pool, &[kept.id, paused.id]).await.unwrap();

        let ids: Vec<Uuid> = found.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![kept.id]);
    }
}
