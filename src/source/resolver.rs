//! Resolution of request sources into PDF bytes

use crate::error::{Error, Result};
use base64::Engine;
use std::path::Path;

const PDF_MAGIC: &[u8] = b"%PDF";

/// PDF data loaded from a request source
#[derive(Debug)]
pub struct ResolvedPdf {
    pub data: Vec<u8>,
    pub source_name: String,
}

/// Read a PDF form from disk
pub fn resolve_path<P: AsRef<Path>>(path: P) -> Result<ResolvedPdf> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(Error::PdfNotFound {
            path: path.display().to_string(),
        });
    }

    let data = std::fs::read(path).map_err(|source| Error::FileAccess {
        action: "read file",
        path: path.display().to_string(),
        source,
    })?;
    check_pdf_header(&data, "file")?;

    Ok(ResolvedPdf {
        data,
        source_name: path.display().to_string(),
    })
}

/// Decode a base64 encoded PDF form
pub fn resolve_base64(base64_data: &str) -> Result<ResolvedPdf> {
    let data = base64::engine::general_purpose::STANDARD.decode(base64_data.trim())?;
    check_pdf_header(&data, "decoded data")?;

    Ok(ResolvedPdf {
        data,
        source_name: "<base64>".to_string(),
    })
}

fn check_pdf_header(data: &[u8], what: &str) -> Result<()> {
    if data.starts_with(PDF_MAGIC) {
        Ok(())
    } else {
        Err(Error::InvalidPdf {
            reason: format!("{} does not start with a PDF header", what),
        })
    }
}
