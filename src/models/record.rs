use chrono::NaiveDateTime;
use std::fmt;

/// 发票创建时间；None 为 "无值" 哨兵 (无法解析的日期)
pub type CreatedOn = Option<NaiveDateTime>;

/// 明细类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Material,
    Equipment,
    Service,
    /// 3、"O" 以及所有无法识别的类型码
    Other,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Material => "Material",
            ItemType::Equipment => "Equipment",
            ItemType::Service => "Service",
            ItemType::Other => "Other",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 展平后的发票明细行 (导出表的一行)
#[derive(Debug, Clone, PartialEq)]
pub struct FlatLineItemRecord {
    pub invoice_id: u64,
    pub created_on: CreatedOn,
    pub invoiceitem_id: u64,
    pub invoiceitem_name: String,
    pub item_type: ItemType,
    pub unit_price: f64,
    /// unit_price × quantity，NaN 传播
    pub total_price: f64,
    /// total_price / 发票总额；任一方不可用时为 NaN
    pub percentage_in_invoice: f64,
    pub is_expired: bool,
}

impl FlatLineItemRecord {
    /// 排序键 (invoice_id, invoiceitem_id)
    pub fn sort_key(&self) -> (u64, u64) {
        (self.invoice_id, self.invoiceitem_id)
    }
}
