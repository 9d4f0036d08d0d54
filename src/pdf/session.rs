//! Form filling sessions
//!
//! A session owns a private temporary directory holding `input.pdf`, the
//! working copy every external tool operates on. The directory is removed
//! when the session is dropped or explicitly closed.

use super::catalog::{FieldCatalog, FieldType, FormField, INPUT_FILE};
use super::executor::Executor;
use super::runner::run_command;
use super::xfdf::build_xfdf;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::TempDir;

const TEMP_DIR_PREFIX: &str = "fillpdf-create";

/// Values to put into a form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    /// Text field name to value
    pub text_values: HashMap<String, String>,
    /// Button field name to checked state
    pub button_values: HashMap<String, bool>,
}

impl FormData {
    pub fn new(
        text_values: HashMap<String, String>,
        button_values: HashMap<String, bool>,
    ) -> Self {
        Self {
            text_values,
            button_values,
        }
    }
}

/// A PDF form ready to be filled
pub struct FormSession {
    dir: TempDir,
    catalog: FieldCatalog,
    executor: Executor,
}

impl std::fmt::Debug for FormSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSession")
            .field("dir", &self.dir.path())
            .field("fields", &self.catalog.len())
            .finish()
    }
}

impl FormSession {
    pub(crate) fn create<R: Read>(executor: Executor, mut input: R) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()
            .map_err(|source| Error::FileAccess {
                action: "create temporary directory in",
                path: std::env::temp_dir().display().to_string(),
                source,
            })?;

        // From here on `dir` removes itself if anything below fails
        let input_path = dir.path().join(INPUT_FILE);
        let mut dest = File::create(&input_path).map_err(|source| Error::FileAccess {
            action: "create file",
            path: input_path.display().to_string(),
            source,
        })?;
        std::io::copy(&mut input, &mut dest)
            .and_then(|_| dest.sync_all())
            .map_err(|source| Error::FileAccess {
                action: "copy to file",
                path: input_path.display().to_string(),
                source,
            })?;
        drop(dest);

        let catalog = executor.catalog_source().build_catalog(dir.path())?;

        tracing::info!(
            dir = %dir.path().display(),
            fields = catalog.len(),
            "form session created"
        );

        Ok(Self {
            dir,
            catalog,
            executor,
        })
    }

    /// Temporary directory holding the working copy
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Fillable fields in discovery order
    pub fn fields(&self) -> Vec<FormField> {
        self.catalog.fields().cloned().collect()
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.catalog.get(name)
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Every text field mapped to its own name, a harmless placeholder fill
    pub fn default_text_values(&self) -> HashMap<String, String> {
        self.catalog
            .fields()
            .filter(|f| f.field_type == FieldType::Text)
            .map(|f| (f.name.clone(), f.name.clone()))
            .collect()
    }

    /// Every button field mapped to `true`
    pub fn all_buttons_true(&self) -> HashMap<String, bool> {
        self.catalog
            .fields()
            .filter(|f| f.field_type == FieldType::Button)
            .map(|f| (f.name.clone(), true))
            .collect()
    }

    /// Fill the form and write the resulting PDF to `out`.
    ///
    /// Every name in `data` must be a field of the matching type; nothing is
    /// run otherwise. With `flatten` the filled fields are no longer
    /// editable.
    pub fn fill<W: Write>(&self, out: &mut W, data: &FormData, flatten: bool) -> Result<()> {
        let text_values = self.ordered(&data.text_values, FieldType::Text)?;
        let button_values = self.ordered(&data.button_values, FieldType::Button)?;

        let xfdf = build_xfdf(
            text_values.iter().map(|(name, value)| (*name, value.as_str())),
            button_values.iter().map(|(name, checked)| (*name, **checked)),
        );

        let mut args: Vec<OsString> = vec![
            "-jar".into(),
            self.executor.mcpdf().into(),
            INPUT_FILE.into(),
            "fill_form".into(),
            "-".into(),
            "output".into(),
            "-".into(),
        ];
        if flatten {
            args.push("flatten".into());
        }

        let pdf = run_command(self.path(), self.executor.java(), &args, Some(xfdf.as_slice()))?;

        out.write_all(&pdf)?;
        out.flush()?;

        tracing::info!(
            text_fields = text_values.len(),
            button_fields = button_values.len(),
            flatten,
            output_bytes = pdf.len(),
            "form filled"
        );
        Ok(())
    }

    /// Fill the form into a new file at `path`
    pub fn fill_to_file<P: AsRef<Path>>(
        &self,
        path: P,
        data: &FormData,
        flatten: bool,
    ) -> Result<()> {
        let path = path.as_ref();
        let pdf = self.fill_to_bytes(data, flatten)?;
        std::fs::write(path, pdf).map_err(|source| Error::FileAccess {
            action: "create file",
            path: path.display().to_string(),
            source,
        })
    }

    /// Fill the form and return the resulting PDF
    pub fn fill_to_bytes(&self, data: &FormData, flatten: bool) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.fill(&mut out, data, flatten)?;
        Ok(out)
    }

    /// Remove the temporary directory, reporting any failure
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().display().to_string();
        self.dir.close().map_err(|source| Error::FileAccess {
            action: "remove directory",
            path,
            source,
        })
    }

    /// Check `values` against the catalog and order them by discovery order
    fn ordered<'a, V>(
        &self,
        values: &'a HashMap<String, V>,
        expected: FieldType,
    ) -> Result<Vec<(&'a str, &'a V)>> {
        let mut names: Vec<&'a String> = values.keys().collect();
        names.sort();

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let field = self.catalog.get(name).ok_or_else(|| Error::UnknownField {
                name: name.clone(),
            })?;
            if field.field_type != expected {
                return Err(Error::FieldTypeMismatch {
                    name: name.clone(),
                    expected: expected.to_string(),
                    actual: field.field_type.to_string(),
                });
            }
            let position = self.catalog.position(name).unwrap_or(usize::MAX);
            entries.push((position, name.as_str(), &values[name]));
        }

        entries.sort_by_key(|(position, _, _)| *position);
        Ok(entries
            .into_iter()
            .map(|(_, name, value)| (name, value))
            .collect())
    }
}
