use anyhow::Result;

use schemapath_model::ElementDecl;

use crate::{Attribute, NamespaceContext};

/// External checker for attribute sets and simple-typed character content
///
/// The matcher establishes *where* an element belongs in the schema; this seam
/// decides whether its lexical values are acceptable. Implementations raise an
/// ordinary error to reject, which the matcher surfaces as invalid content.
pub trait ElementValidator {
    /// Checks the attributes of a newly matched element
    fn validate_attributes(
        &self,
        decl: &ElementDecl,
        attributes: &[Attribute],
        namespaces: &NamespaceContext,
    ) -> Result<()>;

    /// Checks character content against the element's simple type
    fn validate_content(
        &self,
        decl: &ElementDecl,
        text: &str,
        namespaces: &NamespaceContext,
    ) -> Result<()>;
}

/// A validator that accepts any attributes and any content
///
/// Structural checks still apply; this stands in when no datatype library is
/// wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LenientValidator;

impl ElementValidator for LenientValidator {
    fn validate_attributes(
        &self,
        _decl: &ElementDecl,
        _attributes: &[Attribute],
        _namespaces: &NamespaceContext,
    ) -> Result<()> {
        Ok(())
    }

    fn validate_content(
        &self,
        _decl: &ElementDecl,
        _text: &str,
        _namespaces: &NamespaceContext,
    ) -> Result<()> {
        Ok(())
    }
}
