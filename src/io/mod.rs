pub mod expired;
pub mod export;
pub mod invoices;

pub use expired::{load_expired_ids, parse_expired_ids};
pub use export::{export_to_csv, write_csv, HEADER};
pub use invoices::{load_invoices, parse_invoices, SourceFormat};
