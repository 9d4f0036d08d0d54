//! Form field discovery
//!
//! A [`FieldCatalog`] lists the fillable fields of a document in the order
//! they were discovered. It can be built two ways: by parsing the output of
//! `pdftk dump_data_fields`, or by walking the AcroForm dictionary with lopdf.

mod acroform;
mod dump;

pub use acroform::read_acroform_fields;
pub use dump::parse_field_dump;

use crate::error::Result;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the working copy inside a session directory
pub const INPUT_FILE: &str = "input.pdf";

/// Kinds of form fields that can be filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldType {
    Text,
    Button,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "Text",
            FieldType::Button => "Button",
        }
    }

    /// Map a `FieldType:` token from a pdftk field dump
    pub fn from_dump_token(token: &str) -> Option<Self> {
        match token {
            "Text" => Some(FieldType::Text),
            "Button" => Some(FieldType::Button),
            _ => None,
        }
    }

    /// Map the `/FT` name of an AcroForm field dictionary
    pub fn from_pdf_name(name: &[u8]) -> Option<Self> {
        match name {
            b"Tx" => Some(FieldType::Text),
            b"Btn" => Some(FieldType::Button),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a single form field taken when the catalog was built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub field_type: FieldType,
    pub current_value: String,
}

/// Fillable fields of one document
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    names: Vec<String>,
    positions: HashMap<String, usize>,
    fields: HashMap<String, FormField>,
}

impl FieldCatalog {
    /// Build a catalog from fields in discovery order.
    ///
    /// A repeated name keeps its first position while the later field
    /// replaces the earlier one.
    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = FormField>,
    {
        let mut catalog = FieldCatalog::default();
        for field in fields {
            if !catalog.positions.contains_key(&field.name) {
                catalog
                    .positions
                    .insert(field.name.clone(), catalog.names.len());
                catalog.names.push(field.name.clone());
            }
            catalog.fields.insert(field.name.clone(), field);
        }
        catalog
    }

    /// Fields in discovery order
    pub fn fields(&self) -> impl Iterator<Item = &FormField> {
        self.names.iter().filter_map(|name| self.fields.get(name))
    }

    pub fn get(&self, name: &str) -> Option<&FormField> {
        self.fields.get(name)
    }

    /// Position of a field in discovery order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Strategy used to discover the fields of a session's working copy
#[derive(Debug, Clone)]
pub enum FieldCatalogSource {
    /// Read Root/AcroForm/Fields directly with lopdf
    AcroForm,
    /// Run `pdftk input.pdf dump_data_fields` and parse its report
    PdftkDump { pdftk: PathBuf },
}

impl FieldCatalogSource {
    /// Build the catalog for `workdir/input.pdf`
    pub fn build_catalog(&self, workdir: &Path) -> Result<FieldCatalog> {
        let fields = match self {
            FieldCatalogSource::AcroForm => read_acroform_fields(&workdir.join(INPUT_FILE))?,
            FieldCatalogSource::PdftkDump { pdftk } => {
                let report = super::runner::run_command(
                    workdir,
                    pdftk,
                    [INPUT_FILE, "dump_data_fields"],
                    None,
                )?;
                parse_field_dump(&String::from_utf8_lossy(&report))?
            }
        };

        let catalog = FieldCatalog::from_fields(fields);
        tracing::debug!(
            source = self.name(),
            fields = catalog.len(),
            "built field catalog"
        );
        Ok(catalog)
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldCatalogSource::AcroForm => "acroform",
            FieldCatalogSource::PdftkDump { .. } => "pdftk",
        }
    }
}
