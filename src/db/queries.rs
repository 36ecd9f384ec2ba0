use crate::models::{
    Account, ExtractedInvoice, Extraction, Invoice, InvoiceLine, NewExtraction,
};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "\
    id, account_id, po_id, file_url, invoice_number, vendor_name, invoice_date, due_date, \
    total_amount, currency, status, extracted_data, match_confidence, discrepancy_amount, \
    notes, processed_at, created_at, updated_at";

/// 查询单张发票
pub async fn get_invoice(pool: &PgPool, invoice_id: Uuid) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!(
        "SELECT {} FROM invoices WHERE id = $1",
        INVOICE_COLUMNS
    ))
    .bind(invoice_id)
    .fetch_optional(pool)
    .await
}

/// 最近提交优先的发票列表
pub async fn list_invoices(pool: &PgPool, limit: i64) -> Result<Vec<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!(
        "SELECT {} FROM invoices ORDER BY created_at DESC LIMIT $1",
        INVOICE_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn list_invoice_lines(
    pool: &PgPool,
    invoice_id: Uuid,
) -> Result<Vec<InvoiceLine>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceLine>(
        r#"
        SELECT id, invoice_id, description, quantity, unit_price, line_total, sku,
               created_at, updated_at
        FROM invoice_lines
        WHERE invoice_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(invoice_id)
    .fetch_all(pool)
    .await
}

/// 发票的提取尝试历史 (新到旧)
pub async fn list_extractions(
    pool: &PgPool,
    invoice_id: Uuid,
) -> Result<Vec<Extraction>, sqlx::Error> {
    sqlx::query_as::<_, Extraction>(
        r#"
        SELECT id, invoice_id, ai_model, raw_prompt, raw_response, confidence,
               error_message, duration_ms, cost_usd, status, created_at, updated_at
        FROM extractions
        WHERE invoice_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(invoice_id)
    .fetch_all(pool)
    .await
}

/// 登记新上传的发票 (status = uploaded)
pub async fn insert_invoice(
    pool: &PgPool,
    account_id: Uuid,
    file_url: &str,
    notes: Option<&str>,
) -> Result<Invoice, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!(
        "INSERT INTO invoices (account_id, file_url, notes) VALUES ($1, $2, $3) RETURNING {}",
        INVOICE_COLUMNS
    ))
    .bind(account_id)
    .bind(file_url)
    .bind(notes)
    .fetch_one(pool)
    .await
}

pub async fn insert_account(pool: &PgPool, name: &str) -> Result<Account, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        r#"
        INSERT INTO accounts (name) VALUES ($1)
        RETURNING id, name, industry, max_invoices, created_at, updated_at
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await
}

/// 原子认领: uploaded -> extracting 的条件更新, 并发重投递只有一方拿到行
pub async fn claim_invoice(
    pool: &PgPool,
    invoice_id: Uuid,
) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!(
        r#"
        UPDATE invoices
        SET status = 'extracting', processed_at = now(), updated_at = now()
        WHERE id = $1 AND status = 'uploaded'
        RETURNING {}
        "#,
        INVOICE_COLUMNS
    ))
    .bind(invoice_id)
    .fetch_optional(pool)
    .await
}

/// 成功写回: 发票字段 + 明细整体替换 + 完成审计记录, 同一事务提交
pub async fn commit_extraction(
    pool: &PgPool,
    invoice_id: Uuid,
    data: &ExtractedInvoice,
    record: &NewExtraction,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE invoices
        SET vendor_name = $2, invoice_number = $3, invoice_date = $4, due_date = $5,
            total_amount = $6, currency = COALESCE($7, currency), extracted_data = $8,
            status = 'extracted', updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(invoice_id)
    .bind(&data.vendor_name)
    .bind(&data.invoice_number)
    .bind(data.invoice_date)
    .bind(data.due_date)
    .bind(&data.total_amount)
    .bind(&data.currency)
    .bind(&data.raw)
    .execute(&mut *tx)
    .await?;

    // 先清掉上一次尝试留下的明细, 防止残留/重复
    sqlx::query("DELETE FROM invoice_lines WHERE invoice_id = $1")
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?;

    if !data.lines.is_empty() {
        let mut query_builder = QueryBuilder::new(
            "INSERT INTO invoice_lines (invoice_id, description, quantity, unit_price, line_total, sku) ",
        );
        query_builder.push_values(&data.lines, |mut b, line| {
            b.push_bind(invoice_id)
                .push_bind(line.description.clone())
                .push_bind(line.quantity.clone())
                .push_bind(line.unit_price.clone())
                .push_bind(line.line_total.clone())
                .push_bind(line.sku.clone());
        });
        query_builder.build().execute(&mut *tx).await?;
    }

    insert_extraction(&mut *tx, invoice_id, record).await?;

    tx.commit().await
}

/// 失败路径: 状态置 error 并记录失败原因 (无需与其它写入同事务)
pub async fn mark_invoice_failed(
    pool: &PgPool,
    invoice_id: Uuid,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE invoices SET status = 'error', notes = $2, updated_at = now() WHERE id = $1",
    )
    .bind(invoice_id)
    .bind(message)
    .execute(pool)
    .await?;
    Ok(())
}

/// 追加一条审计记录; 没有任何更新/删除路径
pub async fn insert_extraction<'a, E>(
    executor: E,
    invoice_id: Uuid,
    record: &NewExtraction,
) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'a>,
{
    sqlx::query(
        r#"
        INSERT INTO extractions
            (invoice_id, ai_model, raw_prompt, raw_response, confidence,
             error_message, duration_ms, cost_usd, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(invoice_id)
    .bind(&record.ai_model)
    .bind(&record.raw_prompt)
    .bind(&record.raw_response)
    .bind(&record.confidence)
    .bind(&record.error_message)
    .bind(record.duration_ms)
    .bind(&record.cost_usd)
    .bind(record.status)
    .execute(executor)
    .await?;
    Ok(())
}
