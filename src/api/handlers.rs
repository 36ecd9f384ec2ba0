use crate::api::AppState;
use crate::db::queries;
use crate::models::{Extraction, Invoice, InvoiceLine};
use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 列表页大小上限
const LIST_PAGE_SIZE: i64 = 50;

/// 租户上下文头: 边界必须显式给出账户, 服务端不做兜底建账
const ACCOUNT_HEADER: &str = "x-account-id";

/// 提交发票请求体
#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub file_url: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
}

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub message: String,
}

/// 发票 + 嵌套明细与提取历史
#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub invoice_lines: Vec<InvoiceLine>,
    pub extractions: Vec<Extraction>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ApiError {
        success: false,
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

async fn load_detail(state: &AppState, invoice: Invoice) -> Result<InvoiceDetail, sqlx::Error> {
    let invoice_lines = queries::list_invoice_lines(&state.pool, invoice.id).await?;
    let extractions = queries::list_extractions(&state.pool, invoice.id).await?;
    Ok(InvoiceDetail {
        invoice,
        invoice_lines,
        extractions,
    })
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 发票列表 (最近提交优先, 含嵌套明细与提取记录)
pub async fn list_invoices(State(state): State<AppState>) -> Response {
    let invoices = match queries::list_invoices(&state.pool, LIST_PAGE_SIZE).await {
        Ok(invoices) => invoices,
        Err(e) => {
            tracing::error!("Listing invoices failed: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e));
        }
    };

    let mut details = Vec::with_capacity(invoices.len());
    for invoice in invoices {
        match load_detail(&state, invoice).await {
            Ok(detail) => details.push(detail),
            Err(e) => {
                tracing::error!("Loading invoice detail failed: {}", e);
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e));
            }
        }
    }

    (StatusCode::OK, Json(details)).into_response()
}

/// 提交发票: 登记 uploaded 状态的记录并投递一个提取任务
pub async fn create_invoice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateInvoiceRequest>,
) -> Response {
    let Some(account_id) = headers
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Uuid>().ok())
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("missing or invalid {} header", ACCOUNT_HEADER),
        );
    };

    if req.file_url.trim().is_empty() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "file_url must not be empty");
    }

    let invoice =
        match queries::insert_invoice(&state.pool, account_id, &req.file_url, req.notes.as_deref())
            .await
        {
            Ok(invoice) => invoice,
            Err(sqlx::Error::Database(db)) if db.constraint() == Some("invoices_account_id_fkey") => {
                return error_response(StatusCode::UNPROCESSABLE_ENTITY, "account not found");
            }
            Err(e) => {
                tracing::error!("Inserting invoice failed: {}", e);
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e));
            }
        };

    if let Err(e) = state.queue.enqueue(invoice.id) {
        tracing::error!("Enqueueing extraction for invoice {} failed: {}", invoice.id, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e));
    }

    (StatusCode::CREATED, Json(invoice)).into_response()
}

/// 单张发票详情
pub async fn get_invoice(State(state): State<AppState>, Path(invoice_id): Path<Uuid>) -> Response {
    match queries::get_invoice(&state.pool, invoice_id).await {
        Ok(Some(invoice)) => match load_detail(&state, invoice).await {
            Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
            Err(e) => {
                tracing::error!("Loading invoice detail failed: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e))
            }
        },
        Ok(None) => error_response(StatusCode::NOT_FOUND, "invoice not found"),
        Err(e) => {
            tracing::error!("Fetching invoice failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e))
        }
    }
}

/// 建立租户账户 (边界提供租户上下文用, 无鉴权)
pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Response {
    if req.name.trim().is_empty() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "name must not be empty");
    }

    match queries::insert_account(&state.pool, req.name.trim()).await {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(e) => {
            tracing::error!("Inserting account failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e))
        }
    }
}
