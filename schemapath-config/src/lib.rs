//! Configuration for the system: which grammar aligns which document
//!
//! A config file maps *stems* — root element names — to grammar files:
//!
//! ```toml
//! grammar_directory = "grammars"
//!
//! [stems.catalog]
//! root = "catalog"
//! grammar = "catalog.grammar"
//!
//! [stems.invoice]
//! root = "{http://example.com/inv}invoice"
//! grammar = "invoice.grammar"
//! ```
//!
//! Parsed grammars are cached append-only, so the [StateMachine] references
//! handed out stay valid for the life of the [Config].
#![warn(missing_docs)]

use anyhow::{anyhow, Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};

use schemapath_model::{QName, StateMachine};

mod args;
mod cache;
mod file;
pub use self::{
    args::CommandLineArgs,
    cache::GrammarCache,
    file::{ConfigFile, ConfigStem},
};

/// One configured stem: a root element name bound to a grammar file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stem {
    root: QName,
    grammar: Utf8PathBuf,
}

impl Stem {
    /// The root element name this stem covers
    pub fn root(&self) -> &QName {
        &self.root
    }

    /// The absolute path of the grammar file
    pub fn grammar(&self) -> &Utf8Path {
        &self.grammar
    }
}

/// Application configuration: the stem table plus the grammar cache
#[derive(Default)]
pub struct Config {
    stems: Vec<Stem>,
    cache: GrammarCache,
}

impl Config {
    /// Constructs an empty configuration
    pub fn new() -> Self {
        Default::default()
    }

    /// Loads stems from the config file at `path`
    ///
    /// Relative grammar paths resolve against the file's `grammar_directory`,
    /// defaulting to the directory holding the config file itself.
    pub fn load(&mut self, path: impl AsRef<Utf8Path>) -> Result<()> {
        let path = path.as_ref();
        let ConfigFile {
            stems,
            grammar_directory,
        } = ConfigFile::load(path)?;
        let directory = grammar_directory.unwrap_or_else(|| {
            path.parent()
                .expect("No parent directory for config file")
                .to_owned()
        });
        for (name, stem) in stems {
            let root = QName::parse(stem.root())
                .with_context(|| format!("Bad root name in stem \"{name}\""))?;
            self.add_stem(root, directory.join(stem.grammar()));
        }
        Ok(())
    }

    /// Binds a root element name directly to a grammar file
    pub fn add_stem(&mut self, root: QName, grammar: impl AsRef<Utf8Path>) {
        tracing::debug!("Stem \"{root}\" uses {}", grammar.as_ref());
        self.stems.push(Stem {
            root,
            grammar: grammar.as_ref().to_owned(),
        });
    }

    /// The configured stems in declaration order
    pub fn stems(&self) -> &[Stem] {
        &self.stems
    }

    /// Loads (or recalls) the grammar covering documents rooted at `root`
    pub fn machine_for(&self, root: &QName) -> Result<&StateMachine> {
        let stem = self
            .stems
            .iter()
            .find(|stem| stem.root == *root)
            .ok_or_else(|| anyhow!("No configured stem covers a \"{root}\" document"))?;
        self.cache.load(&stem.grammar)
    }

    /// Loads (or recalls) a grammar directly by file path, bypassing stems
    pub fn machine_from(&self, path: impl AsRef<Utf8Path>) -> Result<&StateMachine> {
        self.cache.load(path.as_ref())
    }

    /// Injects a pre-parsed grammar for `root`, mainly for tests
    pub fn add_precached_stem(
        &mut self,
        root: QName,
        path: impl AsRef<Utf8Path>,
        machine: StateMachine,
    ) {
        self.cache.inject(path.as_ref(), machine);
        self.add_stem(root, path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_resolve_to_injected_machines() -> Result<()> {
        let machine = schemapath_model::parse_grammar("element doc { element a ? }")
            .map_err(|e| anyhow!("{e}"))?;
        let mut config = Config::new();
        config.add_precached_stem(QName::local("doc"), "/virtual/doc.grammar", machine);

        let found = config.machine_for(&QName::local("doc"))?;
        assert_eq!(found.node_count(), 2);
        assert!(config.machine_for(&QName::local("other")).is_err());
        Ok(())
    }
}
