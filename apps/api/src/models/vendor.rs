use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const VENDOR_STATUS_ACTIVE: &str = "active";
pub const VENDOR_STATUSES: &[&str] = &["active", "inactive", "pending"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VendorRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: Option<String>,
    pub address: Option<Json<Address>>,
    pub categories: Vec<String>,
    pub website: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_by: Uuid,
    pub is_active: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
