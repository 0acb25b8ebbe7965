//! The streaming substrate the matcher is driven by: SAX-like document events,
//! the append-only namespace registry, and the external validation seams.
//!
//! Anything that can feed events to an [EventHandler] can drive a matcher; the
//! [EventScript] document stand-in included here is the source used by tests
//! and the command line tool:
//!
//! ```
//! use schemapath_sax::{EventHandler, EventScript};
//!
//! #[derive(Default)]
//! struct Counter(usize);
//!
//! impl EventHandler for Counter {
//!     fn start_element(
//!         &mut self,
//!         _: &schemapath_model::QName,
//!         _: &[schemapath_sax::Attribute],
//!     ) -> anyhow::Result<()> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//! }
//!
//! let script = EventScript::parse(
//!     r#"
//!     start root
//!     start item id="1"
//!     text "content"
//!     end item
//!     end root
//!     "#,
//! )?;
//! let mut counter = Counter::default();
//! script.drive(&mut counter)?;
//! assert_eq!(counter.0, 2);
//! # Ok::<(), anyhow::Error>(())
//! ```
#![warn(missing_docs)]

use anyhow::Result;

use schemapath_model::QName;

mod script;
pub use script::{EventScript, ScriptEvent};

mod validate;
pub use validate::{ElementValidator, LenientValidator};

/// A named attribute of an element event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute's qualified name
    pub name: QName,
    /// The attribute's raw lexical value
    pub value: String,
}

impl Attribute {
    /// Constructs an attribute
    pub fn new(name: QName, value: impl Into<String>) -> Self {
        Attribute {
            name,
            value: value.into(),
        }
    }
}

/// Receiver of a document's event stream
///
/// Events arrive one at a time and are fully processed before the source
/// continues; an `Err` from any callback aborts the document.
pub trait EventHandler {
    /// The document is about to begin
    fn start_document(&mut self) -> Result<()> {
        Ok(())
    }

    /// A namespace prefix mapping comes into scope
    fn start_prefix_mapping(&mut self, _prefix: &str, _uri: &str) -> Result<()> {
        Ok(())
    }

    /// A namespace prefix mapping leaves scope
    fn end_prefix_mapping(&mut self, _prefix: &str) -> Result<()> {
        Ok(())
    }

    /// An element opens
    fn start_element(&mut self, _name: &QName, _attributes: &[Attribute]) -> Result<()> {
        Ok(())
    }

    /// Character data within the current element
    fn characters(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    /// An element closes
    fn end_element(&mut self, _name: &QName) -> Result<()> {
        Ok(())
    }

    /// The document has ended
    fn end_document(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Append-only registry of namespace prefix mappings
///
/// Later declarations shadow earlier ones for the same prefix; nothing is ever
/// removed, so values resolved from it remain valid for the whole document.
#[derive(Debug, Default, Clone)]
pub struct NamespaceContext {
    mappings: Vec<(String, String)>,
}

impl NamespaceContext {
    /// Constructs an empty registry
    pub fn new() -> Self {
        Default::default()
    }

    /// Records a prefix to URI mapping
    pub fn declare(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.mappings.push((prefix.into(), uri.into()));
    }

    /// The most recently declared URI for `prefix`, if any
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.mappings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// All declarations in the order they were made
    pub fn declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mappings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_resolution_prefers_the_latest_declaration() {
        let mut context = NamespaceContext::new();
        context.declare("p", "http://first");
        context.declare("q", "http://elsewhere");
        context.declare("p", "http://second");
        assert_eq!(context.resolve("p"), Some("http://second"));
        assert_eq!(context.resolve("q"), Some("http://elsewhere"));
        assert_eq!(context.resolve("r"), None);
        assert_eq!(context.declarations().count(), 3);
    }
}
