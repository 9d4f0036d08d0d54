//! PDF form filling layer
//!
//! This module discovers form fields and fills them through external tools:
//! pdftk (optional, for field dumps) and the mcpdf jar run by java.

pub mod catalog;
mod executor;
pub mod runner;
mod session;
pub mod xfdf;

#[cfg(test)]
pub(crate) mod testutil;

pub use catalog::{FieldCatalog, FieldCatalogSource, FieldType, FormField};
pub use executor::Executor;
pub use session::{FormData, FormSession};
pub use xfdf::build_xfdf;
