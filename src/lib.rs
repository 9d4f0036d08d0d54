//! fillpdf Library
//!
//! Fills interactive PDF forms by driving external tools: the mcpdf jar
//! (run by java) writes the filled document, and fields are discovered
//! either from the AcroForm tree or from `pdftk dump_data_fields`.
//!
//! The crate also provides MCP tools over stdio:
//! - `list_form_fields`: List fillable text and button fields
//! - `fill_form`: Fill fields and return or save the resulting PDF

pub mod config;
pub mod error;
pub mod pdf;
pub mod server;
pub mod source;

pub use config::{CatalogStrategy, Config};
pub use error::{Error, Result};
pub use pdf::{build_xfdf, Executor, FieldType, FormData, FormField, FormSession};
pub use server::{
    run_server, run_server_with_config, FillFormParams, FillFormResult, FillPdfServer,
    ListFormFieldsParams, ListFormFieldsResult, PdfSource, ServerConfig,
};
