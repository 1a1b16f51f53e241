use crate::models::raw::MissingField;
use std::fmt;

/// 丢弃原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// 必需字段缺失
    MissingField(&'static str),
    /// 标识去掉非数字字符后无法解析为整数
    IdentifierUnparseable(String),
}

impl From<MissingField> for DiscardReason {
    fn from(missing: MissingField) -> Self {
        DiscardReason::MissingField(missing.0)
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardReason::MissingField(name) => write!(f, "missing '{}' key", name),
            DiscardReason::IdentifierUnparseable(raw) => {
                write!(f, "invalid identifier '{}' after cleaning", raw)
            }
        }
    }
}

/// 单条诊断信息
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// 整张发票被跳过
    InvoiceDiscarded {
        invoice: String,
        reason: DiscardReason,
    },
    /// 单个明细被跳过
    LineItemDiscarded {
        invoice_id: u64,
        /// 明细在发票内的位置 (从 0 开始)
        position: usize,
        item: Option<String>,
        reason: DiscardReason,
    },
    /// 日期无法解析，已降级为哨兵值 (不是错误)
    DateDegraded { invoice_id: u64, raw: Option<String> },
}

impl Diagnostic {
    pub fn is_discard(&self) -> bool {
        !matches!(self, Diagnostic::DateDegraded { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InvoiceDiscarded { invoice, reason } => {
                write!(f, "Skipping invoice ID {}: {}", invoice, reason)
            }
            Diagnostic::LineItemDiscarded {
                invoice_id,
                position,
                item,
                reason,
            } => write!(
                f,
                "Skipping item #{} ({}) of invoice ID {}: {}",
                position,
                item.as_deref().unwrap_or("<no id>"),
                invoice_id,
                reason
            ),
            Diagnostic::DateDegraded { invoice_id, raw } => write!(
                f,
                "Invalid date format {} for invoice ID {}",
                raw.as_deref().unwrap_or("<none>"),
                invoice_id
            ),
        }
    }
}

/// 展平过程的汇总报告
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenReport {
    pub diagnostics: Vec<Diagnostic>,
    pub invoices_seen: usize,
    pub invoices_discarded: usize,
    pub items_emitted: usize,
    pub items_discarded: usize,
    pub dates_degraded: usize,
}

impl FlattenReport {
    pub fn record(&mut self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::InvoiceDiscarded { .. } => self.invoices_discarded += 1,
            Diagnostic::LineItemDiscarded { .. } => self.items_discarded += 1,
            Diagnostic::DateDegraded { .. } => self.dates_degraded += 1,
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn discards(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_discard())
    }
}
