use crate::config::AppConfig;
use crate::error::ExportError;
use crate::io::{export_to_csv, load_expired_ids, load_invoices};
use crate::models::FlattenReport;
use crate::service::{ExpiredSet, InvoiceFlattener};

/// 一次完整运行: 加载过期列表 -> 加载发票 -> 展平 -> 导出
/// 加载失败按空输入继续；只有导出失败会返回错误
pub fn run(config: &AppConfig) -> Result<FlattenReport, ExportError> {
    let expired = load_expired_ids(&config.input.expired_file).unwrap_or_else(|e| {
        tracing::error!("Error loading expired invoices: {}", e);
        ExpiredSet::new()
    });

    let invoices = load_invoices(&config.input.invoice_file).unwrap_or_else(|e| {
        tracing::error!("Error loading invoices: {}", e);
        Vec::new()
    });

    let output = InvoiceFlattener::new(&expired).flatten(&invoices);
    export_to_csv(&output.records, &config.output.csv_file)?;

    Ok(output.report)
}
