pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use error::{ExportError, LoadError};
pub use service::{run, InvoiceFlattener};
