use std::fmt::Display;

use anyhow::{bail, Result};

/// A qualified element or attribute name: an optional namespace URI plus a
/// local name
///
/// Displayed and parsed in Clark notation, `{uri}local`, with the braces
/// omitted for unqualified names:
/// ```
/// use schemapath_model::QName;
///
/// let name = QName::parse("{http://example.com/ns}item")?;
/// assert_eq!(name.namespace(), Some("http://example.com/ns"));
/// assert_eq!(name.local_name(), "item");
/// assert_eq!(name.to_string(), "{http://example.com/ns}item");
/// assert_eq!(QName::parse("item")?, QName::local("item"));
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    namespace: Option<String>,
    local: String,
}

impl QName {
    /// An unqualified name
    pub fn local(local: impl Into<String>) -> Self {
        QName {
            namespace: None,
            local: local.into(),
        }
    }

    /// A name qualified by a namespace URI
    pub fn namespaced(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        QName {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// Parses Clark notation: `{uri}local` or a bare local name
    pub fn parse(text: &str) -> Result<Self> {
        let Some(rest) = text.strip_prefix('{') else {
            if text.is_empty() || text.contains(['{', '}']) {
                bail!("invalid name: {text:?}");
            }
            return Ok(QName::local(text));
        };
        let Some((uri, local)) = rest.split_once('}') else {
            bail!("unterminated namespace in name: {text:?}");
        };
        if local.is_empty() || local.contains(['{', '}']) {
            bail!("invalid local name in: {text:?}");
        }
        Ok(QName::namespaced(uri, local))
    }

    /// The namespace URI, if the name is qualified
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The local part of the name
    pub fn local_name(&self) -> &str {
        &self.local
    }
}

impl Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(uri) => write!(f, "{{{uri}}}{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}
