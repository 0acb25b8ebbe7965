use std::fmt::Display;

use schemapath_model::QName;

/// The reason a document could not be aligned with the schema
#[derive(Debug)]
pub enum ErrorKind {
    /// Every decision point was exhausted; no traversal admits the document
    PathNotFound {
        /// The element or end event that could not be placed
        name: QName,
    },
    /// An end event did not match the innermost open element
    MismatchedEnd {
        /// The element that should have been closed, if any was open
        expected: Option<QName>,
        /// The element named by the event
        found: QName,
    },
    /// The document ended with elements still open
    UnclosedElements {
        /// How many elements remained open
        depth: usize,
    },
    /// Non-whitespace character data arrived in an element that accepts none
    UnexpectedCharacterData {
        /// The element holding the data, when one was open
        owner: Option<QName>,
    },
    /// A simple-typed element was closed without receiving content
    MissingContent {
        /// The offending element
        name: QName,
    },
    /// The external validator rejected attribute or character content
    ContentInvalid(anyhow::Error),
    /// An internal consistency check failed; a bug or an inconsistent schema
    SchemaInvariant(String),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::PathNotFound { name } => {
                write!(f, "No schema traversal admits \"{name}\" here")
            }
            ErrorKind::MismatchedEnd {
                expected: Some(expected),
                found,
            } => write!(f, "Expected \"{expected}\" to close, found \"{found}\""),
            ErrorKind::MismatchedEnd {
                expected: None,
                found,
            } => write!(f, "\"{found}\" closed with no element open"),
            ErrorKind::UnclosedElements { depth } => {
                write!(f, "Document ended with {depth} unclosed element(s)")
            }
            ErrorKind::UnexpectedCharacterData { owner: Some(owner) } => {
                write!(f, "Element \"{owner}\" does not accept character data")
            }
            ErrorKind::UnexpectedCharacterData { owner: None } => {
                write!(f, "Character data outside any element")
            }
            ErrorKind::MissingContent { name } => {
                write!(f, "Element \"{name}\" requires content but received none")
            }
            ErrorKind::ContentInvalid(cause) => write!(f, "Invalid content: {cause}"),
            ErrorKind::SchemaInvariant(detail) => {
                write!(f, "Schema state machine invariant violated: {detail}")
            }
        }
    }
}

/// A fatal matching failure, carrying the event trail leading up to it
///
/// The trail renders the document events seen so far as
/// `[name:kind | name:kind | …]` for diagnostics.
#[derive(Debug)]
pub struct MatchError {
    kind: ErrorKind,
    trail: String,
}

impl MatchError {
    pub(crate) fn new(kind: ErrorKind, trail: String) -> Self {
        MatchError { kind, trail }
    }

    /// The failure classification
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The rendered event trail at the point of failure
    pub fn trail(&self) -> &str {
        &self.trail
    }
}

impl Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.trail)
    }
}

impl std::error::Error for MatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::ContentInvalid(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}
