//! MCP Server implementation using rmcp

use crate::config::Config;
use crate::pdf::{Executor, FormData};
use crate::source::{resolve_base64, resolve_path, ResolvedPdf};
use anyhow::Result;
use base64::Engine;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a PDF comes from
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum PdfSource {
    /// File path (absolute or relative)
    Path {
        /// Path to the PDF file
        path: String,
    },
    /// Base64 encoded PDF data
    Base64 {
        /// Base64 encoded PDF content
        base64: String,
    },
}

impl<'de> serde::Deserialize<'de> for PdfSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        let Some(obj) = value.as_object() else {
            return Err(serde::de::Error::custom(format!(
                "Invalid source: expected an object with \"path\" or \"base64\", but got {}",
                match &value {
                    serde_json::Value::Array(_) => "an array",
                    serde_json::Value::String(_) => "a string",
                    serde_json::Value::Number(_) => "a number",
                    serde_json::Value::Bool(_) => "a boolean",
                    serde_json::Value::Null => "null",
                    _ => "unknown type",
                }
            )));
        };

        for key in ["path", "base64"] {
            let Some(v) = obj.get(key) else {
                continue;
            };
            let Some(s) = v.as_str() else {
                return Err(serde::de::Error::custom(format!(
                    "\"{}\" must be a string",
                    key
                )));
            };
            return Ok(match key {
                "path" => PdfSource::Path {
                    path: s.to_string(),
                },
                _ => PdfSource::Base64 {
                    base64: s.to_string(),
                },
            });
        }

        let keys: Vec<&String> = obj.keys().collect();
        Err(serde::de::Error::custom(format!(
            "Invalid source: expected an object with \"path\" or \"base64\", but got keys: {:?}",
            keys
        )))
    }
}

/// Environment variable listing allowed resource directories, `:`-separated
pub const ENV_RESOURCE_DIRS: &str = "FILLPDF_RESOURCE_DIRS";

/// Configuration for the fillpdf MCP server
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Directories that path sources and output paths must live in.
    /// Empty means unrestricted.
    pub resource_dirs: Vec<String>,
    /// External tool configuration
    pub executor: Config,
}

impl ServerConfig {
    /// Build the server configuration from `FILLPDF_*` environment variables
    pub fn from_env() -> crate::error::Result<Self> {
        Ok(Self {
            resource_dirs: split_resource_dirs(
                &std::env::var(ENV_RESOURCE_DIRS).unwrap_or_default(),
            ),
            executor: Config::from_env()?,
        })
    }
}

fn split_resource_dirs(value: &str) -> Vec<String> {
    value
        .split(':')
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .map(String::from)
        .collect()
}

/// fillpdf MCP Server
#[derive(Clone)]
pub struct FillPdfServer {
    executor: Arc<Executor>,
    tool_router: ToolRouter<Self>,
    /// Server configuration
    config: Arc<ServerConfig>,
}

// ============================================================================
// Request/Response types for list_form_fields
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFormFieldsParams {
    /// PDF sources to inspect
    pub sources: Vec<PdfSource>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FormFieldInfo {
    /// Fully qualified field name
    pub name: String,
    /// "Text" or "Button"
    pub field_type: String,
    /// Value at the time the form was read
    pub current_value: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ListFormFieldsResult {
    /// Source identifier
    pub source: String,
    /// Fillable fields in document order
    pub fields: Vec<FormFieldInfo>,
    /// Number of fillable fields
    pub total_fields: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for fill_form
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FillFormParams {
    /// Source PDF containing form fields
    pub source: PdfSource,
    /// Text field values by field name
    #[serde(default)]
    pub text_values: HashMap<String, String>,
    /// Checkbox/radio states by field name (true = "Yes", false = "Off")
    #[serde(default)]
    pub button_values: HashMap<String, bool>,
    /// Start from placeholder values: every text field set to its own name and
    /// every button checked. Explicit values override them. (default: false)
    #[serde(default)]
    pub use_defaults: bool,
    /// Flatten the form so the filled values can no longer be edited (default: false)
    #[serde(default)]
    pub flatten: bool,
    /// Output file path (optional). Without it the filled PDF is returned as base64.
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FillFormResult {
    /// Source identifier
    pub source: String,
    /// Number of fields given a value
    pub fields_filled: usize,
    /// Path where PDF was saved (if output_path was specified)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Base64 encoded filled PDF (if no output_path was specified)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl FillPdfServer {
    /// Create a server, validating the configured external tools
    pub fn with_config(config: ServerConfig) -> crate::error::Result<Self> {
        let executor = Executor::new(config.executor.clone())?;
        Ok(Self {
            executor: Arc::new(executor),
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        })
    }

    /// List fillable form fields
    #[tool(
        description = "List the fillable fields (text fields and buttons) of PDF forms, with their current values. Use the names with fill_form.

Source format: each element must be one of {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\"}"
    )]
    async fn list_form_fields(
        &self,
        Parameters(params): Parameters<ListFormFieldsParams>,
    ) -> String {
        let mut results = Vec::new();

        for source in &params.sources {
            let result = self
                .process_list_form_fields(source)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "list_form_fields failed");
                    ListFormFieldsResult {
                        source: Self::source_name(source),
                        fields: vec![],
                        total_fields: 0,
                        error: Some(e.client_message()),
                    }
                });
            results.push(result);
        }

        let response = serde_json::json!({ "results": results });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Fill form fields in a PDF
    #[tool(
        description = "Fill text fields and checkboxes of a PDF form and produce a new PDF.

- text_values: map of text field name to value
- button_values: map of button field name to checked state
- use_defaults: prefill every text field with its own name and check every button
- flatten: make the result non-editable

Unknown field names, or a value of the wrong kind for a field, fail the request before anything is written.

Source format: must be one of {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\"}"
    )]
    async fn fill_form(&self, Parameters(params): Parameters<FillFormParams>) -> String {
        let result = self
            .process_fill_form(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "fill_form failed");
                FillFormResult {
                    source: Self::source_name(&params.source),
                    fields_filled: 0,
                    output_path: None,
                    output_base64: None,
                    error: Some(e.client_message()),
                }
            });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }
}

impl FillPdfServer {
    fn source_name(source: &PdfSource) -> String {
        match source {
            PdfSource::Path { path } => path.clone(),
            PdfSource::Base64 { .. } => "<base64>".to_string(),
        }
    }

    fn resolve_source(&self, source: &PdfSource) -> crate::error::Result<ResolvedPdf> {
        match source {
            PdfSource::Path { path } => {
                let path = self.validate_path_access(path)?;
                resolve_path(path)
            }
            PdfSource::Base64 { base64 } => resolve_base64(base64),
        }
    }

    /// Validate that a path is within allowed resource directories.
    /// If no resource_dirs are configured, all paths are allowed.
    fn validate_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let canonical =
            std::fs::canonicalize(path).map_err(|_| crate::error::Error::PathAccessDenied {
                path: path.to_string(),
            })?;

        self.ensure_in_resource_dirs(canonical, path)
    }

    /// Validate that an output path is within allowed resource directories.
    /// Canonicalizes the parent directory since the output file may not exist yet.
    fn validate_output_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let path_obj = Path::new(path);
        let parent = match path_obj.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let file_name = path_obj
            .file_name()
            .ok_or_else(|| crate::error::Error::PathAccessDenied {
                path: path.to_string(),
            })?;

        let canonical_parent =
            std::fs::canonicalize(parent).map_err(|_| crate::error::Error::PathAccessDenied {
                path: path.to_string(),
            })?;

        self.ensure_in_resource_dirs(canonical_parent.join(file_name), path)
    }

    fn ensure_in_resource_dirs(
        &self,
        canonical: PathBuf,
        requested: &str,
    ) -> crate::error::Result<PathBuf> {
        let allowed = self.config.resource_dirs.iter().any(|dir| {
            std::fs::canonicalize(dir)
                .map(|canonical_dir| canonical.starts_with(canonical_dir))
                .unwrap_or(false)
        });

        if allowed {
            Ok(canonical)
        } else {
            Err(crate::error::Error::PathAccessDenied {
                path: requested.to_string(),
            })
        }
    }

    pub async fn process_list_form_fields(
        &self,
        source: &PdfSource,
    ) -> crate::error::Result<ListFormFieldsResult> {
        let resolved = self.resolve_source(source)?;
        let source_name = resolved.source_name;
        let data = resolved.data;
        let executor = Arc::clone(&self.executor);

        // Runs external tools and touches the filesystem
        let fields = tokio::task::spawn_blocking(move || {
            let session = executor.create_from_bytes(&data)?;
            let fields: Vec<FormFieldInfo> = session
                .fields()
                .into_iter()
                .map(|f| FormFieldInfo {
                    name: f.name,
                    field_type: f.field_type.to_string(),
                    current_value: f.current_value,
                })
                .collect();
            session.close()?;
            Ok::<_, crate::error::Error>(fields)
        })
        .await
        .map_err(|e| crate::error::Error::Io(std::io::Error::other(e)))??;

        let total_fields = fields.len();

        Ok(ListFormFieldsResult {
            source: source_name,
            fields,
            total_fields,
            error: None,
        })
    }

    pub async fn process_fill_form(
        &self,
        params: &FillFormParams,
    ) -> crate::error::Result<FillFormResult> {
        let output_path = params
            .output_path
            .as_deref()
            .map(|p| self.validate_output_path_access(p))
            .transpose()?;

        let resolved = self.resolve_source(&params.source)?;
        let source_name = resolved.source_name;
        let data = resolved.data;
        let executor = Arc::clone(&self.executor);
        let use_defaults = params.use_defaults;
        let flatten = params.flatten;
        let text_values = params.text_values.clone();
        let button_values = params.button_values.clone();

        let (output_data, fields_filled) = tokio::task::spawn_blocking(move || {
            let session = executor.create_from_bytes(&data)?;

            let mut form = if use_defaults {
                FormData::new(session.default_text_values(), session.all_buttons_true())
            } else {
                FormData::default()
            };
            form.text_values.extend(text_values);
            form.button_values.extend(button_values);

            let output = session.fill_to_bytes(&form, flatten)?;
            session.close()?;
            Ok::<_, crate::error::Error>((
                output,
                form.text_values.len() + form.button_values.len(),
            ))
        })
        .await
        .map_err(|e| crate::error::Error::Io(std::io::Error::other(e)))??;

        let (output_path, output_base64) = match output_path {
            Some(path) => {
                Self::write_output(&path, &output_data)?;
                (Some(path.display().to_string()), None)
            }
            None => (
                None,
                Some(base64::engine::general_purpose::STANDARD.encode(&output_data)),
            ),
        };

        Ok(FillFormResult {
            source: source_name,
            fields_filled,
            output_path,
            output_base64,
            error: None,
        })
    }

    /// Write output data, creating parent directories as needed
    fn write_output(path: &Path, data: &[u8]) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, data).map_err(|source| crate::error::Error::FileAccess {
            action: "create file",
            path: path.display().to_string(),
            source,
        })
    }
}

#[tool_handler]
impl ServerHandler for FillPdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "fillpdf lists and fills interactive PDF form fields. Call list_form_fields \
                 first to discover field names, then fill_form with text and button values."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server configured from the environment
pub async fn run_server() -> Result<()> {
    run_server_with_config(ServerConfig::from_env()?).await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    let server = FillPdfServer::with_config(config)?;

    tracing::info!("fillpdf MCP server ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::pdf::testutil::{form_pdf, TestField};
    use pretty_assertions::assert_eq;

    fn server(tools: &Path, resource_dirs: Vec<String>) -> FillPdfServer {
        let jar = tools.join("mcpdf.jar");
        std::fs::write(&jar, b"PK\x03\x04 fake jar").unwrap();
        FillPdfServer::with_config(ServerConfig {
            resource_dirs,
            executor: Config {
                // sh rejects `-jar`, which stands in for a failing filler
                java: "sh".to_string(),
                mcpdf: jar,
                ..Config::default()
            },
        })
        .unwrap()
    }

    fn base64_form() -> PdfSource {
        let data = form_pdf(&[
            TestField::text("Name", Some("Karel")),
            TestField::button("Accept", None),
        ]);
        PdfSource::Base64 {
            base64: base64::engine::general_purpose::STANDARD.encode(data),
        }
    }

    #[test]
    fn test_source_name() {
        assert_eq!(
            FillPdfServer::source_name(&PdfSource::Path {
                path: "/test.pdf".to_string()
            }),
            "/test.pdf"
        );
        assert_eq!(
            FillPdfServer::source_name(&PdfSource::Base64 {
                base64: "abc".to_string()
            }),
            "<base64>"
        );
    }

    #[test]
    fn test_split_resource_dirs() {
        assert_eq!(
            split_resource_dirs("/srv/forms: /tmp/out ::"),
            vec!["/srv/forms".to_string(), "/tmp/out".to_string()]
        );
        assert!(split_resource_dirs("").is_empty());
    }

    #[test]
    fn test_pdf_source_deserialization() {
        let json = r#"{"path": "/test.pdf"}"#;
        let source: PdfSource = serde_json::from_str(json).unwrap();
        assert!(matches!(source, PdfSource::Path { .. }));

        let json = r#"{"base64": "JVBERi0xLjQ="}"#;
        let source: PdfSource = serde_json::from_str(json).unwrap();
        assert!(matches!(source, PdfSource::Base64 { .. }));
    }

    #[test]
    fn test_pdf_source_deserialization_errors() {
        let err = serde_json::from_str::<PdfSource>(r#"{"url": "https://x"}"#).unwrap_err();
        assert!(err.to_string().contains("got keys"));

        let err = serde_json::from_str::<PdfSource>(r#"{"path": 3}"#).unwrap_err();
        assert!(err.to_string().contains("\"path\" must be a string"));

        let err = serde_json::from_str::<PdfSource>(r#""/test.pdf""#).unwrap_err();
        assert!(err.to_string().contains("a string"));
    }

    #[test]
    fn test_fill_params_defaults() {
        let json = r#"{"source": {"path": "/form.pdf"}}"#;
        let params: FillFormParams = serde_json::from_str(json).unwrap();
        assert!(params.text_values.is_empty());
        assert!(params.button_values.is_empty());
        assert!(!params.use_defaults);
        assert!(!params.flatten);
        assert_eq!(params.output_path, None);
    }

    #[test]
    fn test_invalid_tools_fail_construction() {
        let tools = tempfile::tempdir().unwrap();
        let result = FillPdfServer::with_config(ServerConfig {
            resource_dirs: vec![],
            executor: Config {
                mcpdf: tools.path().join("missing.jar"),
                java: "sh".to_string(),
                ..Config::default()
            },
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_process_list_form_fields() {
        let tools = tempfile::tempdir().unwrap();
        let server = server(tools.path(), vec![]);

        let result = server
            .process_list_form_fields(&base64_form())
            .await
            .unwrap();
        assert_eq!(result.source, "<base64>");
        assert_eq!(result.total_fields, 2);
        assert_eq!(result.fields[0].name, "Name");
        assert_eq!(result.fields[0].field_type, "Text");
        assert_eq!(result.fields[0].current_value, "Karel");
        assert_eq!(result.fields[1].field_type, "Button");
    }

    #[tokio::test]
    async fn test_process_list_form_fields_from_path() {
        let tools = tempfile::tempdir().unwrap();
        let path = tools.path().join("form.pdf");
        std::fs::write(&path, form_pdf(&[TestField::text("Only", None)])).unwrap();
        let server = server(tools.path(), vec![tools.path().display().to_string()]);

        let result = server
            .process_list_form_fields(&PdfSource::Path {
                path: path.display().to_string(),
            })
            .await
            .unwrap();
        assert_eq!(result.total_fields, 1);
    }

    #[tokio::test]
    async fn test_path_outside_resource_dirs_is_denied() {
        let tools = tempfile::tempdir().unwrap();
        let allowed = tempfile::tempdir().unwrap();
        let path = tools.path().join("form.pdf");
        std::fs::write(&path, form_pdf(&[])).unwrap();
        let server = server(tools.path(), vec![allowed.path().display().to_string()]);

        let err = server
            .process_list_form_fields(&PdfSource::Path {
                path: path.display().to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::PathAccessDenied { .. }));
    }

    #[tokio::test]
    async fn test_list_form_fields_reports_errors_per_source() {
        let tools = tempfile::tempdir().unwrap();
        let server = server(tools.path(), vec![]);

        let response = server
            .list_form_fields(Parameters(ListFormFieldsParams {
                sources: vec![
                    base64_form(),
                    PdfSource::Base64 {
                        base64: "not base64!".to_string(),
                    },
                ],
            }))
            .await;

        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["total_fields"], 2);
        assert!(results[0].get("error").is_none());
        assert_eq!(results[1]["error"], "Invalid base64 data");
        assert_eq!(results[1]["fields"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_fill_form_rejects_unknown_field() {
        let tools = tempfile::tempdir().unwrap();
        let server = server(tools.path(), vec![]);

        let response = server
            .fill_form(Parameters(FillFormParams {
                source: base64_form(),
                text_values: HashMap::from([("Missing".to_string(), "x".to_string())]),
                button_values: HashMap::new(),
                use_defaults: false,
                flatten: false,
                output_path: None,
            }))
            .await;

        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(
            json["results"][0]["error"],
            "Field \"Missing\" is not in the form"
        );
    }

    #[tokio::test]
    async fn test_fill_form_reports_filler_failure() {
        let tools = tempfile::tempdir().unwrap();
        let server = server(tools.path(), vec![]);

        let response = server
            .fill_form(Parameters(FillFormParams {
                source: base64_form(),
                text_values: HashMap::new(),
                button_values: HashMap::new(),
                use_defaults: true,
                flatten: false,
                output_path: None,
            }))
            .await;

        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json["results"][0]["error"], "PDF processing error");
        assert_eq!(json["results"][0]["fields_filled"], 0);
    }

    #[tokio::test]
    async fn test_output_path_outside_resource_dirs_is_denied() {
        let tools = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let server = server(tools.path(), vec![tools.path().display().to_string()]);

        let err = server
            .process_fill_form(&FillFormParams {
                source: base64_form(),
                text_values: HashMap::new(),
                button_values: HashMap::new(),
                use_defaults: false,
                flatten: false,
                output_path: Some(elsewhere.path().join("out.pdf").display().to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::PathAccessDenied { .. }));
    }
}
