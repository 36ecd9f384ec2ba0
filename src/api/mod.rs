pub mod handlers;

use crate::jobs::ExtractionQueue;
use sqlx::PgPool;

pub use handlers::{create_account, create_invoice, get_invoice, health_check, list_invoices};

/// 共享状态: 连接池 + 任务队列句柄
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub queue: ExtractionQueue,
}
