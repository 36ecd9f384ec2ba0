use bigdecimal::BigDecimal;
use chrono::NaiveDate;

/// 模型响应解析结果 (字段缺失记为 None, 不中断整次提取)
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedInvoice {
    pub vendor_name: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub total_amount: Option<BigDecimal>,
    pub currency: Option<String>,
    /// 原始响应对象, 原样写入 invoices.extracted_data
    pub raw: serde_json::Value,
    pub lines: Vec<ExtractedLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedLine {
    pub description: Option<String>,
    pub quantity: Option<BigDecimal>,
    pub unit_price: Option<BigDecimal>,
    pub line_total: Option<BigDecimal>,
    pub sku: Option<String>,
}
