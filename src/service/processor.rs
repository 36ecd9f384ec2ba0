use crate::client::ExtractionClient;
use crate::db::InvoiceStore;
use crate::error::ProcessError;
use crate::models::{ExtractionStatus, Invoice, NewExtraction};
use crate::service::{parser, prompt};
use bigdecimal::BigDecimal;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

/// 单次处理的结果标签, 调度方据此收尾或重试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// 提取成功并已提交
    Completed,
    /// 状态守卫空转: 发票已越过 uploaded, 不产生任何副作用
    Skipped,
}

/// 提取编排器
///
/// 每次调用处理一张发票: 认领 -> 调模型 -> 解析 -> 事务写回。
/// 认领之后的任何失败都会落一条失败审计记录并把发票置为 error,
/// 错误原样返回给调度方; 核心自身不重试。
pub struct InvoiceProcessor<C, S> {
    client: C,
    store: S,
    model: String,
    call_timeout: Duration,
}

impl<C, S> InvoiceProcessor<C, S>
where
    C: ExtractionClient,
    S: InvoiceStore,
{
    pub fn new(client: C, store: S, model: impl Into<String>, call_timeout: Duration) -> Self {
        Self {
            client,
            store,
            model: model.into(),
            call_timeout,
        }
    }

    pub async fn process(&self, invoice_id: Uuid) -> Result<ProcessOutcome, ProcessError> {
        // 1. 加载发票
        let Some(invoice) = self.store.get(invoice_id).await? else {
            return Err(ProcessError::NotFound(invoice_id));
        };

        // 2. 状态守卫: 非 uploaded 一律空转 (重投递/已处理)
        if !invoice.status.can_begin_extraction() {
            info!(
                "Invoice {} in status {}, skipping",
                invoice_id,
                invoice.status.as_str()
            );
            return Ok(ProcessOutcome::Skipped);
        }

        // 3. 原子认领 uploaded -> extracting; 并发投递只有一方拿到行
        let Some(invoice) = self.store.claim(invoice_id).await? else {
            info!("Invoice {} already claimed, skipping", invoice_id);
            return Ok(ProcessOutcome::Skipped);
        };

        let started = Instant::now();

        // 4. 调模型 + 解析 + 写回; 认领后的失败统一走失败路径
        match self.run_attempt(&invoice, started).await {
            Ok(()) => {
                info!(
                    "Invoice {} extracted in {} ms",
                    invoice_id,
                    started.elapsed().as_millis()
                );
                Ok(ProcessOutcome::Completed)
            }
            Err(err) => {
                self.record_failure(&invoice, &err, started).await;
                Err(err)
            }
        }
    }

    async fn run_attempt(&self, invoice: &Invoice, started: Instant) -> Result<(), ProcessError> {
        let raw = timeout(
            self.call_timeout,
            self.client.extract(prompt::EXTRACTION_PROMPT, &invoice.file_url),
        )
        .await
        .map_err(|_| ProcessError::Transport("model call timed out".to_string()))??;

        let data = parser::parse_response(&raw)?;

        let record = NewExtraction {
            ai_model: self.model.clone(),
            raw_prompt: prompt::EXTRACTION_PROMPT.to_string(),
            raw_response: Some(data.raw.clone()),
            // 固定占位置信度, 真实评分接入前沿用
            confidence: Some(placeholder_confidence()),
            error_message: None,
            duration_ms: Some(elapsed_ms(started)),
            cost_usd: None,
            status: ExtractionStatus::Completed,
        };

        // 发票字段 + 明细替换 + 完成记录, 一次事务提交
        self.store.commit_extraction(invoice.id, &data, record).await
    }

    /// 失败路径: error 状态 + notes + 失败审计记录
    async fn record_failure(&self, invoice: &Invoice, err: &ProcessError, started: Instant) {
        let message = err.to_string();
        let record = NewExtraction {
            ai_model: self.model.clone(),
            raw_prompt: prompt::EXTRACTION_PROMPT.to_string(),
            raw_response: None,
            confidence: None,
            error_message: Some(message.clone()),
            duration_ms: Some(elapsed_ms(started)),
            cost_usd: None,
            status: ExtractionStatus::Failed,
        };

        if let Err(store_err) = self.store.record_failure(invoice.id, &message, record).await {
            // 失败记录本身写不进去: 只记日志, 原错误优先返回
            warn!(
                "Invoice {} failure bookkeeping failed: {}",
                invoice.id, store_err
            );
        }
    }
}

fn elapsed_ms(started: Instant) -> i32 {
    started.elapsed().as_millis().min(i32::MAX as u128) as i32
}

fn placeholder_confidence() -> BigDecimal {
    BigDecimal::from(95) / BigDecimal::from(100)
}
