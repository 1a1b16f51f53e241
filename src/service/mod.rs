pub mod flattener;
pub mod normalize;
pub mod pipeline;

pub use flattener::{ExpiredSet, FlattenOutput, InvoiceFlattener};
pub use normalize::{coerce_f64, map_item_type, normalize_date, normalize_identifier, IdentifierUnparseable};
pub use pipeline::run;
