pub mod catalog;

pub use catalog::{CatalogDocument, CatalogEntry, CatalogFormatError};
