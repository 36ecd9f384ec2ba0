use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "extraction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Completed,
    Failed,
}

/// 提取审计记录: 每次尝试追加一行, 创建后不再修改
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Extraction {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub ai_model: Option<String>,
    pub raw_prompt: Option<String>,
    pub raw_response: Option<serde_json::Value>,
    pub confidence: Option<BigDecimal>,
    pub error_message: Option<String>,
    pub duration_ms: Option<i32>,
    pub cost_usd: Option<BigDecimal>,
    pub status: ExtractionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 待插入的审计记录 (cost_usd 预留, 暂无计费数据)
#[derive(Debug, Clone)]
pub struct NewExtraction {
    pub ai_model: String,
    pub raw_prompt: String,
    pub raw_response: Option<serde_json::Value>,
    pub confidence: Option<BigDecimal>,
    pub error_message: Option<String>,
    pub duration_ms: Option<i32>,
    pub cost_usd: Option<BigDecimal>,
    pub status: ExtractionStatus,
}
