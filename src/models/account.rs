use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// 租户账户 (发票归属边界)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub industry: Option<String>,
    pub max_invoices: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
