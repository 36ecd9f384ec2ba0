use crate::client::ExtractionClient;
use crate::db::InvoiceStore;
use crate::service::{InvoiceProcessor, ProcessOutcome};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// 提取任务: 单一类型, 一张发票一个任务 (至少一次投递)
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub invoice_id: Uuid,
    pub attempt: u32,
}

/// 进程内任务队列句柄
///
/// 重投递由编排器的原子认领兜底, 队列侧不做去重。
#[derive(Clone)]
pub struct ExtractionQueue {
    tx: mpsc::UnboundedSender<ExtractionJob>,
}

/// 工作协程已退出, 无法继续投递
#[derive(Debug, thiserror::Error)]
#[error("extraction queue is closed")]
pub struct QueueClosed;

impl ExtractionQueue {
    /// 启动工作协程, 返回入队句柄
    pub fn start<C, S>(
        processor: InvoiceProcessor<C, S>,
        max_attempts: u32,
        retry_base_secs: u64,
    ) -> (Self, JoinHandle<()>)
    where
        C: ExtractionClient + 'static,
        S: InvoiceStore + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Self { tx };
        let worker = tokio::spawn(run_worker(
            processor,
            rx,
            queue.clone(),
            max_attempts,
            retry_base_secs,
        ));
        (queue, worker)
    }

    /// 为新上传的发票提交一个提取任务
    pub fn enqueue(&self, invoice_id: Uuid) -> Result<(), QueueClosed> {
        self.dispatch(ExtractionJob {
            invoice_id,
            attempt: 1,
        })
    }

    fn dispatch(&self, job: ExtractionJob) -> Result<(), QueueClosed> {
        self.tx.send(job).map_err(|_| QueueClosed)
    }
}

async fn run_worker<C, S>(
    processor: InvoiceProcessor<C, S>,
    mut rx: mpsc::UnboundedReceiver<ExtractionJob>,
    queue: ExtractionQueue,
    max_attempts: u32,
    retry_base_secs: u64,
) where
    C: ExtractionClient + 'static,
    S: InvoiceStore + 'static,
{
    info!("Extraction worker started, max_attempts = {}", max_attempts);

    while let Some(job) = rx.recv().await {
        let ExtractionJob {
            invoice_id,
            attempt,
        } = job;

        match processor.process(invoice_id).await {
            Ok(ProcessOutcome::Completed) => {}
            Ok(ProcessOutcome::Skipped) => {
                info!("Invoice {} skipped by guard", invoice_id);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                // 指数退避后重新入队
                let delay =
                    Duration::from_secs(retry_base_secs.saturating_mul(1 << (attempt - 1).min(16)));
                warn!(
                    "Invoice {} attempt {}/{} failed: {}, retrying in {:?}",
                    invoice_id, attempt, max_attempts, e, delay
                );

                let queue = queue.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let retry = ExtractionJob {
                        invoice_id,
                        attempt: attempt + 1,
                    };
                    if queue.dispatch(retry).is_err() {
                        warn!("Invoice {} retry dropped, queue closed", invoice_id);
                    }
                });
            }
            Err(e) => {
                error!(
                    "Invoice {} attempt {}/{} failed, giving up: {}",
                    invoice_id, attempt, max_attempts, e
                );
            }
        }
    }

    info!("Extraction worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, MockClient};
    use crate::db::store::memory::MemoryStore;
    use crate::models::{Invoice, InvoiceStatus};
    use chrono::Utc;

    fn make_invoice() -> Invoice {
        let now = Utc::now();
        Invoice {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            po_id: None,
            file_url: "https://files.test/doc-1.png".to_string(),
            invoice_number: None,
            vendor_name: None,
            invoice_date: None,
            due_date: None,
            total_amount: None,
            currency: "INR".to_string(),
            status: InvoiceStatus::Uploaded,
            extracted_data: None,
            match_confidence: None,
            discrepancy_amount: None,
            notes: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn wait_for(mut check: impl FnMut() -> bool) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn worker_processes_enqueued_invoice() {
        let store = MemoryStore::new();
        let invoice = make_invoice();
        let id = invoice.id;
        store.seed_invoice(invoice);

        let processor = InvoiceProcessor::new(
            MockClient::new("{}"),
            store.clone(),
            "test-model",
            Duration::from_secs(5),
        );
        let (queue, _worker) = ExtractionQueue::start(processor, 3, 0);

        queue.enqueue(id).unwrap();

        wait_for(|| store.invoice(id).unwrap().status == InvoiceStatus::Extracted).await;
        assert_eq!(store.extractions(id).len(), 1);
    }

    #[tokio::test]
    async fn retryable_failure_is_redelivered_until_attempts_exhausted() {
        let store = MemoryStore::new();
        let invoice = make_invoice();
        let id = invoice.id;
        store.seed_invoice(invoice);

        let client = MockClient::failing(ClientError::Transport("connection refused".into()));
        let processor = InvoiceProcessor::new(
            client.clone(),
            store.clone(),
            "test-model",
            Duration::from_secs(5),
        );
        let (queue, _worker) = ExtractionQueue::start(processor, 2, 0);

        queue.enqueue(id).unwrap();

        // 第一次失败置 error, 第二次投递被守卫空转 -- 审计记录只有一条
        wait_for(|| !store.extractions(id).is_empty()).await;
        wait_for(|| client.call_count() >= 1).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.invoice(id).unwrap().status, InvoiceStatus::Error);
        assert_eq!(store.extractions(id).len(), 1);
        assert_eq!(client.call_count(), 1);
    }
}
