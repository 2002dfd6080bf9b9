//! Request-scoped error reporting

pub mod api_error;
pub mod catalog;
pub mod channel;

pub use api_error::ApiError;
pub use catalog::{codes, CatalogEntry, CatalogError, ErrorCatalog};
pub use channel::{ErrorChannel, ErrorReport, ErrorReporter, Reported};
