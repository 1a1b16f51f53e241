use crate::models::{
    value_text, CreatedOn, Diagnostic, DiscardReason, FlatLineItemRecord, FlattenReport,
    RawInvoice, RawLineItem,
};
use crate::service::normalize::{coerce_f64, map_item_type, normalize_date, normalize_identifier};
use serde_json::Value;
use std::collections::HashSet;

/// 过期发票ID集合 (加载后只读)
pub type ExpiredSet = HashSet<u64>;

/// 展平结果: 已排序的明细行 + 诊断报告
#[derive(Debug, Clone, Default)]
pub struct FlattenOutput {
    pub records: Vec<FlatLineItemRecord>,
    pub report: FlattenReport,
}

/// 单张发票内所有明细共享的上下文
#[derive(Debug, Clone, Copy)]
struct InvoiceContext {
    invoice_id: u64,
    created_on: CreatedOn,
    invoice_total_price: f64,
    is_expired: bool,
}

/// 发票展平服务
/// 将嵌套的 发票 -> 明细 -> 商品 结构展开为一行一明细，并计算派生指标
pub struct InvoiceFlattener<'a> {
    expired: &'a ExpiredSet,
}

impl<'a> InvoiceFlattener<'a> {
    pub fn new(expired: &'a ExpiredSet) -> Self {
        Self { expired }
    }

    /// 展平入口
    /// 单条记录的问题只会跳过该发票或该明细，不会中断整个批次
    pub fn flatten(&self, invoices: &[RawInvoice]) -> FlattenOutput {
        let mut records: Vec<FlatLineItemRecord> = Vec::new();
        let mut report = FlattenReport::default();

        tracing::info!(
            "[Flatten] 开始展平 {} 张发票, 过期发票 {} 张",
            invoices.len(),
            self.expired.len()
        );

        for invoice in invoices {
            report.invoices_seen += 1;
            self.flatten_invoice(invoice, &mut records, &mut report);
        }

        // 稳定排序，重复键保持输入顺序
        records.sort_by_key(FlatLineItemRecord::sort_key);
        report.items_emitted = records.len();

        tracing::info!(
            "[Flatten] 展平完成 - 明细: {}, 跳过发票: {}, 跳过明细: {}, 日期降级: {}",
            report.items_emitted,
            report.invoices_discarded,
            report.items_discarded,
            report.dates_degraded
        );

        FlattenOutput { records, report }
    }

    fn flatten_invoice(
        &self,
        invoice: &RawInvoice,
        records: &mut Vec<FlatLineItemRecord>,
        report: &mut FlattenReport,
    ) {
        // 1. 没有明细列表的发票整体跳过
        let items = match invoice.items() {
            Ok(items) => items,
            Err(missing) => {
                discard(
                    report,
                    Diagnostic::InvoiceDiscarded {
                        invoice: invoice.display_id(),
                        reason: missing.into(),
                    },
                );
                return;
            }
        };

        // 2. 发票ID
        let invoice_id = match invoice_identifier(invoice) {
            Ok(id) => id,
            Err(reason) => {
                discard(
                    report,
                    Diagnostic::InvoiceDiscarded {
                        invoice: invoice.display_id(),
                        reason,
                    },
                );
                return;
            }
        };

        // 3. 日期失败只降级，不丢弃发票
        let created_on = normalize_date(invoice.created_on());
        if created_on.is_none() {
            let diagnostic = Diagnostic::DateDegraded {
                invoice_id,
                raw: invoice.created_on().map(value_text),
            };
            tracing::debug!("{}", diagnostic);
            report.record(diagnostic);
        }

        // 4-5. 发票级汇总
        let ctx = InvoiceContext {
            invoice_id,
            created_on,
            invoice_total_price: invoice_total_price(items),
            is_expired: self.expired.contains(&invoice_id),
        };

        // 6. 逐条明细
        for (position, line) in items.iter().enumerate() {
            match build_record(&ctx, line) {
                Ok(record) => records.push(record),
                Err(reason) => discard(
                    report,
                    Diagnostic::LineItemDiscarded {
                        invoice_id,
                        position,
                        item: line.display_id(),
                        reason,
                    },
                ),
            }
        }
    }
}

fn discard(report: &mut FlattenReport, diagnostic: Diagnostic) {
    tracing::warn!("{}", diagnostic);
    report.record(diagnostic);
}

fn invoice_identifier(invoice: &RawInvoice) -> Result<u64, DiscardReason> {
    let raw = invoice.id()?;
    normalize_identifier(raw).map_err(|e| DiscardReason::IdentifierUnparseable(e.raw))
}

/// 发票总额 = Σ unit_price × quantity
/// 任一明细转换得到 NaN 时总额为 NaN，该发票所有明细的占比随之为 NaN
pub fn invoice_total_price(items: &[RawLineItem]) -> f64 {
    items
        .iter()
        .map(|line| coerce_f64(line.unit_price()) * coerce_f64(line.quantity.as_ref()))
        .sum()
}

/// 明细占发票总额的比例
pub fn percentage_in_invoice(total_price: f64, invoice_total_price: f64) -> f64 {
    if total_price.is_nan() || invoice_total_price == 0.0 {
        f64::NAN
    } else {
        total_price / invoice_total_price
    }
}

/// null 名称输出为空字段，其它非字符串取 JSON 文本
fn item_name(name: &Value) -> String {
    match name {
        Value::Null => String::new(),
        other => value_text(other),
    }
}

fn build_record(ctx: &InvoiceContext, line: &RawLineItem) -> Result<FlatLineItemRecord, DiscardReason> {
    let item = line.item()?;

    let invoiceitem_id = normalize_identifier(item.id()?)
        .map_err(|e| DiscardReason::IdentifierUnparseable(e.raw))?;
    let invoiceitem_name = item_name(item.name()?);
    let item_type = map_item_type(Some(item.type_code()?));

    let unit_price = coerce_f64(Some(item.unit_price()?));
    let quantity = coerce_f64(Some(line.quantity()?));
    let total_price = unit_price * quantity;

    Ok(FlatLineItemRecord {
        invoice_id: ctx.invoice_id,
        created_on: ctx.created_on,
        invoiceitem_id,
        invoiceitem_name,
        item_type,
        unit_price,
        total_price,
        percentage_in_invoice: percentage_in_invoice(total_price, ctx.invoice_total_price),
        is_expired: ctx.is_expired,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{parse_invoices, SourceFormat};
    use crate::models::ItemType;
    use serde_json::json;

    fn invoices(value: Value) -> Vec<RawInvoice> {
        serde_json::from_value(value).unwrap()
    }

    fn expired(ids: &[u64]) -> ExpiredSet {
        ids.iter().copied().collect()
    }

    fn line(id: Value, price: Value, qty: Value) -> Value {
        json!({ "quantity": qty, "item": { "id": id, "name": "x", "type": 0, "unit_price": price } })
    }

    #[test]
    fn reference_invoice_is_flattened() {
        let input = invoices(json!([{
            "id": "INV-101",
            "created_on": "2024-01-15",
            "items": [
                { "quantity": 2, "item": { "id": "I-1", "name": "Bolt", "type": 0, "unit_price": 5 } },
                { "quantity": 1, "item": { "id": "I-2", "name": "Service Call", "type": 2, "unit_price": 50 } }
            ]
        }]));
        let expired = expired(&[101]);

        let out = InvoiceFlattener::new(&expired).flatten(&input);

        assert_eq!(out.records.len(), 2);
        let bolt = &out.records[0];
        assert_eq!(bolt.sort_key(), (101, 1));
        assert_eq!(bolt.invoiceitem_name, "Bolt");
        assert_eq!(bolt.item_type, ItemType::Material);
        assert_eq!(bolt.unit_price, 5.0);
        assert_eq!(bolt.total_price, 10.0);
        assert!((bolt.percentage_in_invoice - 10.0 / 60.0).abs() < 1e-12);
        assert!(bolt.is_expired);
        assert_eq!(
            bolt.created_on.map(|d| d.to_string()).as_deref(),
            Some("2024-01-15 00:00:00")
        );

        let call = &out.records[1];
        assert_eq!(call.sort_key(), (101, 2));
        assert_eq!(call.item_type, ItemType::Service);
        assert_eq!(call.total_price, 50.0);
        assert!((call.percentage_in_invoice - 50.0 / 60.0).abs() < 1e-12);
        assert!(out.report.diagnostics.is_empty());
    }

    #[test]
    fn invoice_without_items_is_discarded() {
        let input = invoices(json!([{ "id": 5, "created_on": "2024-01-01" }]));
        let out = InvoiceFlattener::new(&ExpiredSet::new()).flatten(&input);

        assert!(out.records.is_empty());
        assert_eq!(out.report.invoices_discarded, 1);
        assert_eq!(
            out.report.diagnostics[0],
            Diagnostic::InvoiceDiscarded {
                invoice: "5".into(),
                reason: DiscardReason::MissingField("items"),
            }
        );
    }

    #[test]
    fn invoice_with_unparseable_id_is_discarded() {
        let input = invoices(json!([{
            "id": "ABC",
            "created_on": "2024-01-01",
            "items": [line(json!(1), json!(1), json!(1))]
        }]));
        let out = InvoiceFlattener::new(&ExpiredSet::new()).flatten(&input);

        assert!(out.records.is_empty());
        assert_eq!(out.report.invoices_discarded, 1);
        assert!(matches!(
            &out.report.diagnostics[0],
            Diagnostic::InvoiceDiscarded { reason: DiscardReason::IdentifierUnparseable(raw), .. } if raw == "ABC"
        ));
    }

    #[test]
    fn invoice_without_id_is_discarded() {
        let input = invoices(json!([{ "items": [line(json!(1), json!(1), json!(1))] }]));
        let out = InvoiceFlattener::new(&ExpiredSet::new()).flatten(&input);

        assert!(out.records.is_empty());
        assert_eq!(out.report.invoices_discarded, 1);
    }

    #[test]
    fn bad_date_degrades_without_discarding() {
        let input = invoices(json!([{
            "id": 9,
            "created_on": "not-a-date",
            "items": [line(json!(1), json!(2), json!(3))]
        }]));
        let out = InvoiceFlattener::new(&ExpiredSet::new()).flatten(&input);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].created_on, None);
        assert_eq!(out.records[0].total_price, 6.0);
        assert_eq!(out.report.dates_degraded, 1);
        assert_eq!(out.report.discards().count(), 0);
    }

    #[test]
    fn bad_unit_price_poisons_sibling_percentages() {
        let input = invoices(json!([{
            "id": 1,
            "created_on": "2024-02-01",
            "items": [
                line(json!(1), json!("N/A"), json!(1)),
                line(json!(2), json!(4), json!(2))
            ]
        }]));
        let out = InvoiceFlattener::new(&ExpiredSet::new()).flatten(&input);

        assert_eq!(out.records.len(), 2);
        let bad = &out.records[0];
        assert!(bad.unit_price.is_nan());
        assert!(bad.total_price.is_nan());
        assert!(bad.percentage_in_invoice.is_nan());

        let sibling = &out.records[1];
        assert_eq!(sibling.unit_price, 4.0);
        assert_eq!(sibling.total_price, 8.0);
        assert!(sibling.percentage_in_invoice.is_nan());
    }

    #[test]
    fn line_item_failures_discard_only_that_item() {
        let input = invoices(json!([{
            "id": 3,
            "created_on": "2024-02-01",
            "items": [
                line(json!("NO-ID"), json!(1), json!(1)),
                { "quantity": 1, "item": { "id": 2, "type": 1, "unit_price": 1 } },
                { "quantity": 1 },
                { "item": { "id": 4, "name": "n", "type": 1, "unit_price": 1 } },
                line(json!(5), json!(1), json!(1))
            ]
        }]));
        let out = InvoiceFlattener::new(&ExpiredSet::new()).flatten(&input);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].invoiceitem_id, 5);
        assert_eq!(out.report.items_discarded, 4);

        let reasons: Vec<&DiscardReason> = out
            .report
            .diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::LineItemDiscarded { reason, .. } => Some(reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                &DiscardReason::IdentifierUnparseable("NO-ID".into()),
                &DiscardReason::MissingField("name"),
                &DiscardReason::MissingField("item"),
                &DiscardReason::MissingField("quantity"),
            ]
        );
    }

    #[test]
    fn malformed_line_shapes_discard_only_those_lines() {
        let content = r#"[{
            "id": "INV-5",
            "created_on": "2024-04-01",
            "items": [
                {"quantity": 2, "item": {"id": "I-1", "name": "Bolt", "type": 0, "unit_price": 5}},
                {"quantity": 1, "item": "flat"},
                null
            ]
        }]"#;
        let input = parse_invoices(content, SourceFormat::JsonArray).unwrap();
        let out = InvoiceFlattener::new(&ExpiredSet::new()).flatten(&input);

        assert_eq!(out.records.len(), 1);
        let bolt = &out.records[0];
        assert_eq!(bolt.sort_key(), (5, 1));
        assert_eq!(bolt.total_price, 10.0);
        // 形状错误的明细使发票总额为 NaN
        assert!(bolt.percentage_in_invoice.is_nan());

        assert_eq!(out.report.invoices_seen, 1);
        assert_eq!(out.report.invoices_discarded, 0);
        assert_eq!(out.report.items_discarded, 2);
        assert!(out.report.discards().all(|d| matches!(
            d,
            Diagnostic::LineItemDiscarded { reason: DiscardReason::MissingField("item"), .. }
        )));
    }

    #[test]
    fn non_object_invoice_record_is_reported() {
        let input = parse_invoices(r#"[42, {"id": 1, "items": "nope"}]"#, SourceFormat::JsonArray).unwrap();
        let out = InvoiceFlattener::new(&ExpiredSet::new()).flatten(&input);

        assert!(out.records.is_empty());
        assert_eq!(out.report.invoices_seen, 2);
        assert_eq!(out.report.invoices_discarded, 2);
    }

    #[test]
    fn null_name_renders_empty() {
        let input = invoices(json!([{
            "id": 8,
            "created_on": "2024-02-01",
            "items": [
                { "quantity": 1, "item": { "id": 1, "name": null, "type": 0, "unit_price": 1 } },
                { "quantity": 1, "item": { "id": 2, "name": 42, "type": 0, "unit_price": 1 } }
            ]
        }]));
        let out = InvoiceFlattener::new(&ExpiredSet::new()).flatten(&input);

        assert_eq!(out.records[0].invoiceitem_name, "");
        assert_eq!(out.records[1].invoiceitem_name, "42");
    }

    #[test]
    fn null_quantity_coerces_to_nan() {
        let input = invoices(json!([{
            "id": 3,
            "created_on": "2024-02-01",
            "items": [line(json!(1), json!(2), Value::Null)]
        }]));
        let out = InvoiceFlattener::new(&ExpiredSet::new()).flatten(&input);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].unit_price, 2.0);
        assert!(out.records[0].total_price.is_nan());
    }

    #[test]
    fn zero_invoice_total_gives_nan_percentage() {
        let input = invoices(json!([{
            "id": 4,
            "created_on": "2024-02-01",
            "items": [line(json!(1), json!(0), json!(3))]
        }]));
        let out = InvoiceFlattener::new(&ExpiredSet::new()).flatten(&input);

        assert_eq!(out.records[0].total_price, 0.0);
        assert!(out.records[0].percentage_in_invoice.is_nan());
    }

    #[test]
    fn records_are_sorted_across_invoices() {
        let input = invoices(json!([
            { "id": "B-20", "created_on": "2024-01-01", "items": [line(json!(9), json!(1), json!(1)), line(json!(3), json!(1), json!(1))] },
            { "id": "A-7", "created_on": "2024-01-01", "items": [line(json!(4), json!(1), json!(1))] },
            { "id": 20, "created_on": "2024-01-01", "items": [line(json!(1), json!(1), json!(1))] }
        ]));
        let out = InvoiceFlattener::new(&expired(&[7])).flatten(&input);

        let keys: Vec<(u64, u64)> = out.records.iter().map(FlatLineItemRecord::sort_key).collect();
        assert_eq!(keys, vec![(7, 4), (20, 1), (20, 3), (20, 9)]);
        assert!(out.records[0].is_expired);
        assert!(out.records[1..].iter().all(|r| !r.is_expired));
    }

    #[test]
    fn invoice_total_matches_sum_of_line_totals() {
        let items: Vec<RawLineItem> = serde_json::from_value(json!([
            line(json!(1), json!(2.5), json!(4)),
            line(json!(2), json!("3"), json!("2")),
            line(json!(3), json!(10), json!(0.5))
        ]))
        .unwrap();

        assert_eq!(invoice_total_price(&items), 10.0 + 6.0 + 5.0);
        assert_eq!(invoice_total_price(&[]), 0.0);
    }

    #[test]
    fn percentage_rules() {
        assert_eq!(percentage_in_invoice(5.0, 20.0), 0.25);
        assert!(percentage_in_invoice(f64::NAN, 20.0).is_nan());
        assert!(percentage_in_invoice(5.0, 0.0).is_nan());
        assert!(percentage_in_invoice(5.0, f64::NAN).is_nan());
    }
}
