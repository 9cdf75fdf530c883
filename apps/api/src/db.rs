use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates a PostgreSQL connection pool and applies pending migrations.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");

    Ok(pool)
}

/// True when `err` is a Postgres unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

/// Escapes `%`, `_` and `\` so user input matches literally inside an ILIKE pattern.
pub fn like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 2);
    escaped.push('%');
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Live-database helpers. Tests using them are `#[ignore]`d and run with
/// `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
pub(crate) mod testing {
    use chrono::{Duration, Utc};
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::models::proposal::{ProposalRow, SOURCE_PORTAL};
    use crate::models::rfp::{RfpRow, RfpStatus};
    use crate::models::vendor::VendorRow;
    use crate::proposals::store::{self as proposal_store, NewProposal};
    use crate::rfps::store::{self as rfp_store, NewRfp};
    use crate::vendors::store::{self as vendor_store, NewVendor};

    /// Migrated pool for `DATABASE_URL`, or `None` when no database is reachable.
    pub async fn test_pool() -> Option<PgPool> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("skipping: DATABASE_URL is not set");
            return None;
        };
        match super::create_pool(&url).await {
            Ok(pool) => Some(pool),
            Err(e) => {
                eprintln!("skipping: database unavailable: {e}");
                None
            }
        }
    }

    pub async fn seed_buyer(pool: &PgPool) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role) VALUES ($1, $2, $3, $4, 'buyer')",
        )
        .bind(id)
        .bind("Test Buyer")
        .bind(format!("buyer-{id}@procura.test"))
        .bind("not-a-phc-string")
        .execute(pool)
        .await
        .unwrap();
        id
    }

    pub async fn seed_vendor(pool: &PgPool, created_by: Uuid) -> VendorRow {
        let email = format!("vendor-{}@procura.test", Uuid::new_v4());
        vendor_store::insert(
            pool,
            NewVendor {
                name: "Test Vendor",
                email: &email,
                company: "Test Vendor Ltd",
                phone: None,
                address: None,
                categories: &[],
                website: None,
                user_id: None,
                created_by,
            },
        )
        .await
        .unwrap()
    }

    pub async fn seed_open_rfp(pool: &PgPool, owner: Uuid) -> RfpRow {
        let rfp = rfp_store::insert(
            pool,
            NewRfp {
                title: "Office laptops",
                description: "Fifty laptops for the new office",
                requirements: "16GB RAM, 3 year warranty",
                budget: Some(50_000.0),
                currency: "USD",
                deadline: Utc::now() + Duration::days(30),
                category: Some("IT"),
                attachments: &[],
                evaluation_criteria: &[],
                created_by: owner,
            },
        )
        .await
        .unwrap();
        rfp_store::set_status(pool, rfp.id, owner, RfpStatus::Open)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn seed_proposal(pool: &PgPool, rfp_id: Uuid, vendor_id: Uuid, cost: f64) -> ProposalRow {
        proposal_store::insert(
            pool,
            NewProposal {
                rfp_id,
                vendor_id,
                cover_letter: "We would be glad to help.",
                technical_proposal: "Fifty 16GB laptops with on-site support.",
                deliverables: "",
                total_cost: cost,
                currency: "USD",
                cost_breakdown: &[],
                duration_weeks: Some(4),
                estimated_start_date: None,
                estimated_end_date: None,
                attachments: &[],
                source: SOURCE_PORTAL,
            },
        )
        .await
        .unwrap()
    }
}
