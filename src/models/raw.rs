use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// 缺失字段 (键不存在, 区别于值为 null)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingField(pub &'static str);

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing field '{}'", self.0)
    }
}

/// 键存在时保留原值 (包括 null)，键缺失时由 `#[serde(default)]` 给出 None
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// 只接受 JSON 对象；其它形状 (字符串、数字、数组、null) 视为缺失
fn object_or_none<T: DeserializeOwned>(value: Value) -> Option<T> {
    match value {
        Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    }
}

/// 明细列表: 非列表视为缺失；列表中形状错误的元素保留为空明细，由展平阶段逐条丢弃
fn lenient_items<'de, D>(deserializer: D) -> Result<Option<Vec<RawLineItem>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(lines) => Some(
            lines
                .into_iter()
                .map(|line| object_or_none(line).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    })
}

fn lenient_item<'de, D>(deserializer: D) -> Result<Option<RawItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(object_or_none)
}

/// 原始发票 (invoices 源文件中的一条记录)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInvoice {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub created_on: Option<Value>,
    /// 缺失、null 或不是列表时整张发票不可用
    #[serde(default, deserialize_with = "lenient_items", skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<RawLineItem>>,
}

/// 原始发票明细行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLineItem {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Value>,
    /// null 或非对象与缺失同样视为缺失
    #[serde(default, deserialize_with = "lenient_item", skip_serializing_if = "Option::is_none")]
    pub item: Option<RawItem>,
}

/// 明细行引用的商品描述
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_code: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Value>,
}

impl RawInvoice {
    /// 从任意 JSON 值构造；非对象记录得到空发票 (无 id、无明细)
    pub fn from_value(value: Value) -> Self {
        object_or_none(value).unwrap_or_default()
    }

    pub fn id(&self) -> Result<&Value, MissingField> {
        self.id.as_ref().ok_or(MissingField("id"))
    }

    pub fn created_on(&self) -> Option<&Value> {
        self.created_on.as_ref()
    }

    pub fn items(&self) -> Result<&[RawLineItem], MissingField> {
        self.items.as_deref().ok_or(MissingField("items"))
    }

    /// 日志用的尽力而为标识 (原始 id 文本)
    pub fn display_id(&self) -> String {
        match &self.id {
            Some(v) => value_text(v),
            None => "<none>".to_string(),
        }
    }
}

impl RawLineItem {
    pub fn quantity(&self) -> Result<&Value, MissingField> {
        self.quantity.as_ref().ok_or(MissingField("quantity"))
    }

    pub fn item(&self) -> Result<&RawItem, MissingField> {
        self.item.as_ref().ok_or(MissingField("item"))
    }

    /// 单价 (汇总发票总额时使用，缺失按 None 处理)
    pub fn unit_price(&self) -> Option<&Value> {
        self.item.as_ref().and_then(|i| i.unit_price.as_ref())
    }

    pub fn display_id(&self) -> Option<String> {
        self.item
            .as_ref()
            .and_then(|i| i.id.as_ref())
            .map(value_text)
    }
}

impl RawItem {
    pub fn id(&self) -> Result<&Value, MissingField> {
        self.id.as_ref().ok_or(MissingField("id"))
    }

    pub fn name(&self) -> Result<&Value, MissingField> {
        self.name.as_ref().ok_or(MissingField("name"))
    }

    pub fn type_code(&self) -> Result<&Value, MissingField> {
        self.type_code.as_ref().ok_or(MissingField("type"))
    }

    pub fn unit_price(&self) -> Result<&Value, MissingField> {
        self.unit_price.as_ref().ok_or(MissingField("unit_price"))
    }
}

/// 标量的文本形式: 字符串取原文，其余取 JSON 表示
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
