use crate::error::ExportError;
use crate::models::{CreatedOn, FlatLineItemRecord};
use chrono::Timelike;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// 导出表头 (列顺序固定)
pub const HEADER: [&str; 9] = [
    "invoice_id",
    "created_on",
    "invoiceitem_id",
    "invoiceitem_name",
    "type",
    "unit_price",
    "total_price",
    "percentage_in_invoice",
    "is_expired",
];

const DATE_ONLY: &str = "%Y-%m-%d";
const DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";
const DATE_TIME_FRACTION: &str = "%Y-%m-%d %H:%M:%S%.f";

/// 导出展平结果到 CSV 文件
pub fn export_to_csv(records: &[FlatLineItemRecord], output_path: &Path) -> Result<(), ExportError> {
    let file = File::create(output_path).map_err(|source| ExportError::Create {
        path: output_path.to_path_buf(),
        source,
    })?;

    write_csv(records, file)?;
    tracing::info!("✓ 导出 {} 行到 {}", records.len(), output_path.display());
    Ok(())
}

/// 写出 CSV (表头 + 每条记录一行)
pub fn write_csv<W: Write>(records: &[FlatLineItemRecord], writer: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(HEADER)?;

    let date_format = created_on_format(records);
    for record in records {
        writer.write_record(&[
            record.invoice_id.to_string(),
            format_created_on(record.created_on, date_format),
            record.invoiceitem_id.to_string(),
            record.invoiceitem_name.clone(),
            record.item_type.as_str().to_string(),
            format_float(record.unit_price),
            format_float(record.total_price),
            format_float(record.percentage_in_invoice),
            format_bool(record.is_expired),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// 整列统一格式: 全部为零点时只输出日期，有小数秒时带小数
fn created_on_format(records: &[FlatLineItemRecord]) -> &'static str {
    let mut format = DATE_ONLY;
    for dt in records.iter().filter_map(|r| r.created_on) {
        if dt.nanosecond() != 0 {
            return DATE_TIME_FRACTION;
        }
        if dt.num_seconds_from_midnight() != 0 {
            format = DATE_TIME;
        }
    }
    format
}

/// "无值" 哨兵输出为空字段
fn format_created_on(created_on: CreatedOn, format: &str) -> String {
    created_on
        .map(|dt| dt.format(format).to_string())
        .unwrap_or_default()
}

/// NaN 输出为空字段；整数值保留 ".0"
fn format_float(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{:?}", value)
    }
}

fn format_bool(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}
