use crate::db::queries;
use crate::error::ProcessError;
use crate::models::{ExtractedInvoice, Invoice, NewExtraction};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// 编排器的持久化接口
///
/// `commit_extraction` 是一整个原子写回 (发票字段 + 明细替换 + 完成记录);
/// `record_failure` 不要求事务分组。
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn get(&self, invoice_id: Uuid) -> Result<Option<Invoice>, ProcessError>;

    /// 条件认领 uploaded -> extracting; 状态不符返回 None
    async fn claim(&self, invoice_id: Uuid) -> Result<Option<Invoice>, ProcessError>;

    async fn commit_extraction(
        &self,
        invoice_id: Uuid,
        data: &ExtractedInvoice,
        record: NewExtraction,
    ) -> Result<(), ProcessError>;

    async fn record_failure(
        &self,
        invoice_id: Uuid,
        message: &str,
        record: NewExtraction,
    ) -> Result<(), ProcessError>;
}

/// PostgreSQL 实现
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceStore for PgStore {
    async fn get(&self, invoice_id: Uuid) -> Result<Option<Invoice>, ProcessError> {
        Ok(queries::get_invoice(&self.pool, invoice_id).await?)
    }

    async fn claim(&self, invoice_id: Uuid) -> Result<Option<Invoice>, ProcessError> {
        Ok(queries::claim_invoice(&self.pool, invoice_id).await?)
    }

    async fn commit_extraction(
        &self,
        invoice_id: Uuid,
        data: &ExtractedInvoice,
        record: NewExtraction,
    ) -> Result<(), ProcessError> {
        Ok(queries::commit_extraction(&self.pool, invoice_id, data, &record).await?)
    }

    async fn record_failure(
        &self,
        invoice_id: Uuid,
        message: &str,
        record: NewExtraction,
    ) -> Result<(), ProcessError> {
        queries::mark_invoice_failed(&self.pool, invoice_id, message).await?;
        queries::insert_extraction(&self.pool, invoice_id, &record).await?;
        Ok(())
    }
}
