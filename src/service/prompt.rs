/// 固定提取指令: 字段清单与响应格式约束
///
/// 解析器按这里列出的键名逐字匹配, 修改字段时两边需同步。
pub const EXTRACTION_PROMPT: &str = "\
Extract the following details from the invoice:
- Vendor Name
- Invoice Number
- Invoice Date (YYYY-MM-DD)
- Due Date (YYYY-MM-DD)
- Total Amount
- Currency
- Line Items (Description, Quantity, Unit Price, Total, SKU)

Return the response as a valid JSON object.
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_every_extracted_field() {
        for field in [
            "Vendor Name",
            "Invoice Number",
            "Invoice Date",
            "Due Date",
            "Total Amount",
            "Currency",
            "Line Items",
            "Description",
            "Quantity",
            "Unit Price",
            "Total",
            "SKU",
        ] {
            assert!(EXTRACTION_PROMPT.contains(field), "missing {}", field);
        }
    }

    #[test]
    fn prompt_demands_a_json_object() {
        assert!(EXTRACTION_PROMPT.contains("valid JSON object"));
    }
}
