use crate::error::ProcessError;
use crate::models::{ExtractedInvoice, ExtractedLine};
use bigdecimal::rounding::RoundingMode;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::warn;

/// 金额 numeric(12,2), 数量 numeric(10,3)
const MONEY_SCALE: i64 = 2;
const QUANTITY_SCALE: i64 = 3;

/// 解析模型响应
///
/// 顶层必须是 JSON 对象, 否则整次提取判为 Parse 失败;
/// 字段按键名精确匹配 (区分大小写, 不做同义词归一),
/// 缺失或类型不符的字段记 None, 明细行逐条独立转换。
pub fn parse_response(raw: &str) -> Result<ExtractedInvoice, ProcessError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ProcessError::Parse(format!("invalid JSON: {}", e)))?;

    let Some(fields) = value.as_object() else {
        return Err(ProcessError::Parse(
            "top-level value is not an object".to_string(),
        ));
    };

    let vendor_name = string_field(fields, "Vendor Name");
    let invoice_number = string_field(fields, "Invoice Number");
    let invoice_date = date_field(fields, "Invoice Date");
    let due_date = date_field(fields, "Due Date");
    let total_amount = decimal_field(fields, "Total Amount", MONEY_SCALE);
    let currency = string_field(fields, "Currency");
    let lines = parse_lines(fields.get("Line Items"));

    Ok(ExtractedInvoice {
        vendor_name,
        invoice_number,
        invoice_date,
        due_date,
        total_amount,
        currency,
        lines,
        raw: value,
    })
}

fn parse_lines(items: Option<&Value>) -> Vec<ExtractedLine> {
    match items {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| match entry.as_object() {
                Some(line) => Some(parse_line(line)),
                None => {
                    warn!("Line item {} is not an object, skipped", idx);
                    None
                }
            })
            .collect(),
        Some(other) => {
            warn!("'Line Items' is not a sequence ({}), ignored", value_kind(other));
            Vec::new()
        }
    }
}

fn parse_line(line: &Map<String, Value>) -> ExtractedLine {
    ExtractedLine {
        description: string_field(line, "Description"),
        quantity: decimal_field(line, "Quantity", QUANTITY_SCALE),
        unit_price: decimal_field(line, "Unit Price", MONEY_SCALE),
        line_total: decimal_field(line, "Total", MONEY_SCALE),
        sku: string_field(line, "SKU"),
    }
}

/// 字符串字段; 数值也接受 (沿用上游宽松的类型转换)
fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn date_field(fields: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    let text = fields.get(key)?.as_str()?;
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

/// 金额/数量走十进制文本, 不经 f64
fn decimal_field(fields: &Map<String, Value>, key: &str, scale: i64) -> Option<BigDecimal> {
    let text = match fields.get(key)? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };

    text.parse::<BigDecimal>()
        .ok()
        .map(|d| d.with_scale_round(scale, RoundingMode::HalfUp))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn parses_complete_response() {
        let raw = r#"{
            "Vendor Name": "Acme",
            "Invoice Number": "INV-1",
            "Invoice Date": "2026-03-01",
            "Due Date": "2026-03-31",
            "Total Amount": 100.00,
            "Currency": "USD",
            "Line Items": [
                {"Description": "Widget", "Quantity": 2, "Unit Price": 50.00, "Total": 100.00, "SKU": "W1"}
            ]
        }"#;

        let data = parse_response(raw).unwrap();
        assert_eq!(data.vendor_name.as_deref(), Some("Acme"));
        assert_eq!(data.invoice_number.as_deref(), Some("INV-1"));
        assert_eq!(data.invoice_date, NaiveDate::from_ymd_opt(2026, 3, 1));
        assert_eq!(data.due_date, NaiveDate::from_ymd_opt(2026, 3, 31));
        assert_eq!(data.total_amount, Some(dec("100.00")));
        assert_eq!(data.currency.as_deref(), Some("USD"));

        assert_eq!(data.lines.len(), 1);
        let line = &data.lines[0];
        assert_eq!(line.description.as_deref(), Some("Widget"));
        assert_eq!(line.quantity, Some(dec("2.000")));
        assert_eq!(line.unit_price, Some(dec("50.00")));
        assert_eq!(line.line_total, Some(dec("100.00")));
        assert_eq!(line.sku.as_deref(), Some("W1"));
    }

    #[test]
    fn rejects_non_json() {
        let err = parse_response("not json").unwrap_err();
        assert!(matches!(err, ProcessError::Parse(_)));
    }

    #[test]
    fn rejects_non_object_top_level() {
        let err = parse_response(r#"["Vendor Name"]"#).unwrap_err();
        assert!(matches!(err, ProcessError::Parse(_)));

        let err = parse_response("42").unwrap_err();
        assert!(matches!(err, ProcessError::Parse(_)));
    }

    #[test]
    fn missing_fields_become_none() {
        let data = parse_response("{}").unwrap();
        assert_eq!(data.vendor_name, None);
        assert_eq!(data.invoice_number, None);
        assert_eq!(data.invoice_date, None);
        assert_eq!(data.due_date, None);
        assert_eq!(data.total_amount, None);
        assert_eq!(data.currency, None);
        assert!(data.lines.is_empty());
    }

    #[test]
    fn keys_are_case_sensitive() {
        let data = parse_response(r#"{"vendor name": "Acme", "TOTAL AMOUNT": 5}"#).unwrap();
        assert_eq!(data.vendor_name, None);
        assert_eq!(data.total_amount, None);
    }

    #[test]
    fn line_item_missing_subfields_become_none() {
        let raw = r#"{"Line Items": [{"Description": "Widget"}]}"#;
        let data = parse_response(raw).unwrap();

        assert_eq!(data.lines.len(), 1);
        let line = &data.lines[0];
        assert_eq!(line.description.as_deref(), Some("Widget"));
        assert_eq!(line.quantity, None);
        assert_eq!(line.unit_price, None);
        assert_eq!(line.line_total, None);
        assert_eq!(line.sku, None);
    }

    #[test]
    fn non_object_line_entries_are_skipped() {
        let raw = r#"{"Line Items": ["Widget", {"Description": "Gadget"}, 3]}"#;
        let data = parse_response(raw).unwrap();

        assert_eq!(data.lines.len(), 1);
        assert_eq!(data.lines[0].description.as_deref(), Some("Gadget"));
    }

    #[test]
    fn non_array_line_items_are_ignored() {
        let raw = r#"{"Line Items": {"Description": "Widget"}}"#;
        let data = parse_response(raw).unwrap();
        assert!(data.lines.is_empty());
    }

    #[test]
    fn accepts_numeric_strings_for_amounts() {
        let raw = r#"{"Total Amount": "1234.5", "Line Items": [{"Quantity": "0.5"}]}"#;
        let data = parse_response(raw).unwrap();

        assert_eq!(data.total_amount, Some(dec("1234.50")));
        assert_eq!(data.lines[0].quantity, Some(dec("0.500")));
    }

    #[test]
    fn amounts_are_rounded_to_column_scale() {
        let raw = r#"{"Total Amount": 10.005, "Line Items": [{"Quantity": 1.23456}]}"#;
        let data = parse_response(raw).unwrap();

        assert_eq!(data.total_amount, Some(dec("10.01")));
        assert_eq!(data.lines[0].quantity, Some(dec("1.235")));
    }

    #[test]
    fn malformed_dates_become_none() {
        let raw = r#"{"Invoice Date": "03/01/2026", "Due Date": 20260331}"#;
        let data = parse_response(raw).unwrap();
        assert_eq!(data.invoice_date, None);
        assert_eq!(data.due_date, None);
    }

    #[test]
    fn numeric_invoice_number_is_stringified() {
        let data = parse_response(r#"{"Invoice Number": 4711}"#).unwrap();
        assert_eq!(data.invoice_number.as_deref(), Some("4711"));
    }

    #[test]
    fn raw_blob_keeps_unknown_keys() {
        let raw = r#"{"Vendor Name": "Acme", "Tax Id": "GSTIN-7"}"#;
        let data = parse_response(raw).unwrap();
        assert_eq!(data.raw["Tax Id"], "GSTIN-7");
    }
}
