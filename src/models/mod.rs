pub mod raw;
pub mod record;
pub mod report;

pub use raw::{value_text, MissingField, RawInvoice, RawItem, RawLineItem};
pub use record::{CreatedOn, FlatLineItemRecord, ItemType};
pub use report::{Diagnostic, DiscardReason, FlattenReport};
