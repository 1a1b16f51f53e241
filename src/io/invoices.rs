use crate::error::LoadError;
use crate::models::RawInvoice;
use serde_json::Value;
use std::path::Path;

/// 发票源文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// 整个文件是一个 JSON 数组
    JsonArray,
    /// 每行一个 JSON 对象 (.jsonl / .ndjson)
    JsonLines,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                SourceFormat::JsonLines
            }
            _ => SourceFormat::JsonArray,
        }
    }
}

/// 读取发票源
pub fn load_invoices(path: &Path) -> Result<Vec<RawInvoice>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let invoices = parse_invoices(&content, SourceFormat::from_path(path)).map_err(|source| {
        LoadError::Json {
            path: path.to_path_buf(),
            source,
        }
    })?;

    tracing::info!("Loaded {} invoices from {}", invoices.len(), path.display());
    Ok(invoices)
}

/// 解析发票源内容
/// 形状错误的记录不在此处丢弃: 非对象记录读作空发票，交给展平阶段报告
pub fn parse_invoices(content: &str, format: SourceFormat) -> Result<Vec<RawInvoice>, serde_json::Error> {
    let values: Vec<Value> = match format {
        SourceFormat::JsonArray => serde_json::from_str(content)?,
        SourceFormat::JsonLines => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(serde_json::from_str::<Value>)
            .collect::<Result<Vec<_>, _>>()?,
    };

    let invoices = values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            if !value.is_object() {
                tracing::warn!("Invoice record #{} is not an object: {}", idx, value);
            }
            RawInvoice::from_value(value)
        })
        .collect();

    Ok(invoices)
}
