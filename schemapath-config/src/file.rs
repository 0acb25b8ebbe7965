use std::collections::HashMap;

use anyhow::{Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Deserialization of schemapath.toml
#[derive(Deserialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// A map of unique names to individual stem configurations
    #[serde(default)]
    pub stems: HashMap<String, ConfigStem>,

    /// Grammar directory (defaults to the directory containing the config)
    pub grammar_directory: Option<Utf8PathBuf>,
}

/// Configuration for a single stem within schemapath.toml
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConfigStem {
    root: String,
    grammar: Utf8PathBuf,
}

impl ConfigStem {
    /// The root element name, in Clark notation when qualified
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The path to the grammar file describing documents under this root
    /// (may be absolute or relative to the grammar directory)
    pub fn grammar(&self) -> &Utf8Path {
        &self.grammar
    }
}

impl ConfigFile {
    /// Load a configuration from the specified file
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_context = || format!("Reading config file {path:?}");
        let config_data = std::fs::read_to_string(path).with_context(config_context)?;
        config_data.as_str().try_into()
    }
}

impl TryFrom<&str> for ConfigFile {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(toml::from_str(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_files_parse() -> Result<()> {
        let config: ConfigFile = r#"
            grammar_directory = "grammars"

            [stems.catalog]
            root = "catalog"
            grammar = "catalog.grammar"

            [stems.invoice]
            root = "{http://example.com/inv}invoice"
            grammar = "invoice.grammar"
        "#
        .try_into()?;
        assert_eq!(
            config.grammar_directory.as_deref(),
            Some(Utf8Path::new("grammars")),
        );
        let invoice = &config.stems["invoice"];
        assert_eq!(invoice.root(), "{http://example.com/inv}invoice");
        assert_eq!(invoice.grammar(), "invoice.grammar");
        Ok(())
    }

    #[test]
    fn unknown_stems_are_absent() -> Result<()> {
        let config: ConfigFile = "".try_into()?;
        assert!(config.stems.is_empty());
        Ok(())
    }
}
