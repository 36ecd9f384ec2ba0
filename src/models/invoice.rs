use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 发票状态机: uploaded -> extracting -> extracted | error
/// matched/approved/exported 为后续工作流阶段, 本服务不产生
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Uploaded,
    Extracting,
    Extracted,
    Matched,
    Approved,
    Exported,
    Error,
}

impl InvoiceStatus {
    /// 仅 uploaded 状态允许发起提取 (重投递守卫)
    pub fn can_begin_extraction(self) -> bool {
        matches!(self, InvoiceStatus::Uploaded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Uploaded => "uploaded",
            InvoiceStatus::Extracting => "extracting",
            InvoiceStatus::Extracted => "extracted",
            InvoiceStatus::Matched => "matched",
            InvoiceStatus::Approved => "approved",
            InvoiceStatus::Exported => "exported",
            InvoiceStatus::Error => "error",
        }
    }
}

/// 发票主表
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invoice {
    pub id: Uuid,
    pub account_id: Uuid,
    pub po_id: Option<Uuid>,
    pub file_url: String,
    pub invoice_number: Option<String>,
    pub vendor_name: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub total_amount: Option<BigDecimal>,
    pub currency: String,
    pub status: InvoiceStatus,
    pub extracted_data: Option<serde_json::Value>,
    pub match_confidence: Option<BigDecimal>,
    pub discrepancy_amount: Option<BigDecimal>,
    pub notes: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 发票明细行 (每次成功提取整体替换)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InvoiceLine {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub description: Option<String>,
    pub quantity: Option<BigDecimal>,
    pub unit_price: Option<BigDecimal>,
    pub line_total: Option<BigDecimal>,
    pub sku: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
