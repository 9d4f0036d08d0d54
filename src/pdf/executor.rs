//! Tool validation and session factory

use super::catalog::FieldCatalogSource;
use super::session::FormSession;
use crate::config::{CatalogStrategy, Config};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// How much of the jar is inspected when checking its signature
const SNIFF_LEN: u64 = 512;

/// Signature of a zip local file header, which every jar starts with
const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";

/// Validated handle on the external tools.
///
/// Construction checks that every configured tool resolves on the search
/// path and that the mcpdf jar looks like a zip archive. Sessions created
/// from an executor carry a copy of it.
#[derive(Debug, Clone)]
pub struct Executor {
    java: PathBuf,
    mcpdf: PathBuf,
    catalog_source: FieldCatalogSource,
}

impl Executor {
    pub fn new(config: Config) -> Result<Self> {
        let java = lookup_tool(&config.java)?;

        let catalog_source = match &config.catalog {
            CatalogStrategy::AcroForm => FieldCatalogSource::AcroForm,
            CatalogStrategy::PdftkDump { pdftk } => FieldCatalogSource::PdftkDump {
                pdftk: lookup_tool(pdftk)?,
            },
        };

        let mcpdf = check_filler(&config.mcpdf)?;

        tracing::debug!(
            java = %java.display(),
            mcpdf = %mcpdf.display(),
            catalog = catalog_source.name(),
            "executor ready"
        );

        Ok(Self {
            java,
            mcpdf,
            catalog_source,
        })
    }

    /// Start a session on a copy of the PDF at `path`
    pub fn create_from_file<P: AsRef<Path>>(&self, path: P) -> Result<FormSession> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::FileAccess {
            action: "open file",
            path: path.display().to_string(),
            source,
        })?;
        self.create(file)
    }

    /// Start a session on in-memory PDF data
    pub fn create_from_bytes(&self, data: &[u8]) -> Result<FormSession> {
        self.create(data)
    }

    /// Start a session on PDF data read from `input`
    pub fn create<R: Read>(&self, input: R) -> Result<FormSession> {
        FormSession::create(self.clone(), input)
    }

    pub fn java(&self) -> &Path {
        &self.java
    }

    pub fn mcpdf(&self) -> &Path {
        &self.mcpdf
    }

    pub fn catalog_source(&self) -> &FieldCatalogSource {
        &self.catalog_source
    }
}

fn lookup_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|e| Error::ToolNotFound {
        tool: name.to_string(),
        reason: e.to_string(),
    })
}

/// Make sure the jar exists and starts like a zip archive.
///
/// Returns the absolute path, since the filler runs inside the session's
/// temporary directory.
fn check_filler(path: &Path) -> Result<PathBuf> {
    let invalid = |reason: String| Error::InvalidFiller {
        path: path.display().to_string(),
        reason,
    };

    let file = File::open(path).map_err(|e| invalid(format!("cannot open: {}", e)))?;

    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN)
        .read_to_end(&mut head)
        .map_err(|e| invalid(format!("cannot read: {}", e)))?;

    if head.is_empty() {
        return Err(invalid("file is empty".to_string()));
    }

    // Stricter than infer::archive::is_zip, which also matches empty and spanned archives
    if !head.starts_with(ZIP_LOCAL_HEADER) {
        let detected = infer::get(&head)
            .map(|kind| kind.mime_type())
            .unwrap_or("unknown");
        return Err(invalid(format!(
            "does not seem to be \"application/zip\", is {:?}",
            detected
        )));
    }

    std::fs::canonicalize(path).map_err(|e| invalid(format!("cannot resolve path: {}", e)))
}
