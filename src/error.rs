use std::path::PathBuf;
use thiserror::Error;

/// 输入源加载失败 (过期列表 / 发票源)
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse invoices in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid expired invoice id '{token}'")]
    ExpiredToken {
        token: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// CSV 导出失败
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV: {0}")]
    Io(#[from] std::io::Error),
}
