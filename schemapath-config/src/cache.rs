use std::{collections::HashMap, sync::Mutex};

use anyhow::{anyhow, Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};

use schemapath_model::StateMachine;

/// An append-only cache of parsed grammars keyed by their on-disk file path
///
/// References handed out remain valid for the life of the cache; nothing is
/// ever evicted.
#[derive(Default)]
pub struct GrammarCache {
    mapped: Mutex<HashMap<Utf8PathBuf, usize>>,
    machines: elsa::FrozenVec<Box<StateMachine>>,
}

impl GrammarCache {
    /// Constructs an empty cache
    pub fn new() -> Self {
        Default::default()
    }

    /// Parses the grammar file at `path`, caches the machine, and returns a
    /// reference to it
    pub fn load(&self, path: impl AsRef<Utf8Path>) -> Result<&StateMachine> {
        let mut locked = self.mapped.lock().expect("Lock poisoned");

        // Early return for cache hit
        if let Some(index) = locked.get(path.as_ref()) {
            return Ok(&self.machines[*index]);
        }

        let text = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to load grammar from: {}", path.as_ref()))?;
        let machine = schemapath_model::parse_grammar(&text)
            // ParseError borrows the text; flatten before it goes out of scope
            .map_err(|e| anyhow!("In {}:\n{e}", path.as_ref()))?;
        locked.insert(path.as_ref().to_owned(), self.machines.len());
        Ok(self.machines.push_get(Box::new(machine)))
    }

    /// Injects a path to machine mapping without touching the filesystem
    ///
    /// This is primarily used for tests
    pub fn inject(&self, path: impl AsRef<Utf8Path>, machine: StateMachine) {
        let mut locked = self.mapped.lock().expect("Lock poisoned");
        locked.insert(path.as_ref().to_owned(), self.machines.len());
        self.machines.push(Box::new(machine));
    }
}
