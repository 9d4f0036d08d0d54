//! Executor configuration

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Environment variable naming the java executable
pub const ENV_JAVA: &str = "FILLPDF_JAVA";
/// Environment variable holding the path of the mcpdf jar
pub const ENV_MCPDF: &str = "FILLPDF_MCPDF";
/// Environment variable naming pdftk; selects the dump strategy when set
pub const ENV_PDFTK: &str = "FILLPDF_PDFTK";

/// How form fields are discovered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CatalogStrategy {
    /// Read the AcroForm tree in-process
    #[default]
    AcroForm,
    /// Parse `pdftk dump_data_fields` output
    PdftkDump {
        /// pdftk executable name or path
        pdftk: String,
    },
}

/// Paths and names of the external tools used to fill forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Java executable name or path
    pub java: String,
    /// Path to the mcpdf jar (jar-with-dependencies build)
    pub mcpdf: PathBuf,
    /// Field discovery strategy
    pub catalog: CatalogStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            java: "java".to_string(),
            mcpdf: PathBuf::from("mcpdf.jar"),
            catalog: CatalogStrategy::AcroForm,
        }
    }
}

impl Config {
    /// Build a configuration from `FILLPDF_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mcpdf = non_empty(ENV_MCPDF).ok_or_else(|| Error::Config {
            reason: format!("{} must point to the mcpdf jar", ENV_MCPDF),
        })?;

        let catalog = match non_empty(ENV_PDFTK) {
            Some(pdftk) => CatalogStrategy::PdftkDump { pdftk },
            None => CatalogStrategy::AcroForm,
        };

        Ok(Self {
            java: non_empty(ENV_JAVA).unwrap_or_else(|| "java".to_string()),
            mcpdf: PathBuf::from(mcpdf),
            catalog,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_minimal_environment() {
        let config = Config::from_lookup(lookup(&[(ENV_MCPDF, "/opt/mcpdf.jar")])).unwrap();
        assert_eq!(
            config,
            Config {
                java: "java".to_string(),
                mcpdf: PathBuf::from("/opt/mcpdf.jar"),
                catalog: CatalogStrategy::AcroForm,
            }
        );
    }

    #[test]
    fn test_pdftk_selects_dump_strategy() {
        let config = Config::from_lookup(lookup(&[
            (ENV_MCPDF, "mcpdf.jar"),
            (ENV_JAVA, "/usr/lib/jvm/bin/java"),
            (ENV_PDFTK, "pdftk"),
        ]))
        .unwrap();
        assert_eq!(config.java, "/usr/lib/jvm/bin/java");
        assert_eq!(
            config.catalog,
            CatalogStrategy::PdftkDump {
                pdftk: "pdftk".to_string()
            }
        );
    }

    #[test]
    fn test_missing_mcpdf_is_config_error() {
        let err = Config::from_lookup(lookup(&[(ENV_MCPDF, "  ")])).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
