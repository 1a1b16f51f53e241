use crate::error::LoadError;
use crate::service::ExpiredSet;
use std::path::Path;

/// 过期发票ID列表的分隔符 (例如 "101, 205, 309")
pub const EXPIRED_SEPARATOR: &str = ", ";

/// 读取过期发票ID列表
pub fn load_expired_ids(path: &Path) -> Result<ExpiredSet, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let ids = parse_expired_ids(&content)?;
    tracing::info!("Loaded {} expired invoice ids from {}", ids.len(), path.display());
    Ok(ids)
}

/// 解析 ", " 分隔的整数列表；任一片段非法则整体失败
pub fn parse_expired_ids(content: &str) -> Result<ExpiredSet, LoadError> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(ExpiredSet::new());
    }

    content
        .split(EXPIRED_SEPARATOR)
        .map(|token| {
            let token = token.trim();
            token.parse::<u64>().map_err(|source| LoadError::ExpiredToken {
                token: token.to_string(),
                source,
            })
        })
        .collect()
}
