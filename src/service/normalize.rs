use crate::models::{value_text, CreatedOn, ItemType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use thiserror::Error;

/// 去掉非数字字符后无法得到整数
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("identifier '{raw}' has no parseable digits")]
pub struct IdentifierUnparseable {
    pub raw: String,
}

/// 带时间的日期格式 (`%.f` 可选小数秒)
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// 纯日期格式，解析为当天 00:00:00
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// 标识规范化: 保留 ASCII 数字 (保持原顺序)，再解析为非负整数
pub fn normalize_identifier(value: &Value) -> Result<u64, IdentifierUnparseable> {
    let raw = value_text(value);
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits
        .parse::<u64>()
        .map_err(|_| IdentifierUnparseable { raw })
}

/// 数值转换，失败时返回 NaN，永不报错
pub fn coerce_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        // 布尔值不是数值: true/false 得到 NaN 而不是 1.0/0.0
        _ => f64::NAN,
    }
}

/// 日期规范化，失败时返回 None 哨兵
pub fn normalize_date(value: Option<&Value>) -> CreatedOn {
    match value {
        Some(Value::String(s)) => parse_datetime(s.trim()),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> CreatedOn {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// 类型码映射: 0/1/2/3 与 "O"；无法识别的类型码一律归入 Other
pub fn map_item_type(code: Option<&Value>) -> ItemType {
    let numeric = match code {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        // 布尔值不等同于类型码 0/1，落入 Other
        _ => None,
    };

    match numeric {
        Some(0) => ItemType::Material,
        Some(1) => ItemType::Equipment,
        Some(2) => ItemType::Service,
        // 3、"O" 和其它一切
        _ => ItemType::Other,
    }
}
