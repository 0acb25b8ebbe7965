//! This crate provides the precompiled content-model state machine that documents are
//! matched against: an immutable graph of [StateNode]s owned by a [StateMachine] and
//! addressed by [StateId] handles.
//!
//! A machine can be assembled programmatically with a [StateMachineBuilder]:
//!
//! ```
//! use schemapath_model::*;
//!
//! let mut builder = StateMachineBuilder::new();
//! let a = builder.element(ElementDecl::simple(QName::local("A")), Occurs::ONE);
//! let b = builder.element(ElementDecl::simple(QName::local("B")), Occurs::ONE);
//! let choice = builder.choice(vec![a, b], Occurs::ZERO_OR_MORE)?;
//! let root = builder.element(
//!     ElementDecl::complex(QName::local("root"), choice),
//!     Occurs::ONE,
//! );
//! let machine = builder.build(root)?;
//!
//! assert_eq!(machine.node(root).children(), &[choice]);
//! assert_eq!(machine.node(choice).occurs.max, None);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! or parsed from the compact text notation (see [parse_grammar]):
//!
//! ```
//! let machine = schemapath_model::parse_grammar(
//!     "
//!     element root {
//!         sequence {
//!             choice * { element A text, element B text },
//!             any(##other) ?
//!         }
//!     }
//!     ",
//! )?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! The graph may be cyclic (recursive content models reached through `def`/`use`),
//! which is why nodes are stored in an arena and referenced by index rather than
//! owned by their parents. A built machine is never mutated; one machine may be
//! shared by any number of concurrently running matchers.
#![warn(missing_docs)]

use std::fmt::Display;

use anyhow::{bail, Result};

mod builder;
pub use builder::StateMachineBuilder;

mod name;
pub use name::QName;

mod text;
pub use text::{parse_grammar, ParseError};

/// Handle to a [StateNode] within its owning [StateMachine]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u32);

impl StateId {
    pub(crate) fn new(index: usize) -> Self {
        StateId(index as u32)
    }

    /// The position of the referenced node in the machine's arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Occurrence bounds of a particle; `max` of `None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences required
    pub min: u32,
    /// Maximum number of occurrences permitted (`None` for unbounded)
    pub max: Option<u32>,
}

impl Occurs {
    /// Exactly one occurrence
    pub const ONE: Occurs = Occurs {
        min: 1,
        max: Some(1),
    };
    /// Zero or one occurrences
    pub const OPTIONAL: Occurs = Occurs {
        min: 0,
        max: Some(1),
    };
    /// Any number of occurrences
    pub const ZERO_OR_MORE: Occurs = Occurs { min: 0, max: None };
    /// At least one occurrence
    pub const ONE_OR_MORE: Occurs = Occurs { min: 1, max: None };

    /// Constructs bounds from a minimum and an optional maximum
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Occurs { min, max }
    }

    /// Whether `count` occurrences would still be within the maximum
    pub fn admits(&self, count: u32) -> bool {
        self.max.map(|max| count <= max).unwrap_or(true)
    }

    /// Whether `count` occurrences satisfy the minimum
    pub fn met(&self, count: u32) -> bool {
        count >= self.min
    }

    /// Whether `count` occurrences have reached the maximum
    pub fn exhausted(&self, count: u32) -> bool {
        self.max.map(|max| count >= max).unwrap_or(false)
    }
}

impl Display for Occurs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.min, self.max) {
            (1, Some(1)) => Ok(()),
            (0, Some(1)) => write!(f, "?"),
            (0, None) => write!(f, "*"),
            (1, None) => write!(f, "+"),
            (min, Some(max)) => write!(f, "{{{min}..{max}}}"),
            (min, None) => write!(f, "{{{min}..*}}"),
        }
    }
}

/// What kind of character content an element accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// No content at all
    Empty,
    /// Character data only
    Simple,
    /// Child elements only; whitespace between them is ignorable
    ElementOnly,
    /// Character data interleaved with child elements
    Mixed,
}

impl ContentKind {
    /// Whether character data is meaningful content for this kind
    pub fn expects_text(self) -> bool {
        matches!(self, ContentKind::Simple | ContentKind::Mixed)
    }
}

/// Declaration details of an element particle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDecl {
    /// The element's qualified name
    pub name: QName,
    /// The single content-model edge; `None` for simple or empty content
    pub content: Option<StateId>,
    /// What character content the element accepts
    pub content_kind: ContentKind,
    /// Whether the element may be explicitly nil
    pub nillable: bool,
    /// Value assumed when the element is left empty
    pub default_value: Option<String>,
    /// Value the element content is required to equal
    pub fixed_value: Option<String>,
}

impl ElementDecl {
    /// A simple-content element declaration with no further constraints
    pub fn simple(name: QName) -> Self {
        ElementDecl {
            name,
            content: None,
            content_kind: ContentKind::Simple,
            nillable: false,
            default_value: None,
            fixed_value: None,
        }
    }

    /// An element-only declaration whose children follow `content`
    pub fn complex(name: QName, content: StateId) -> Self {
        ElementDecl {
            name,
            content: Some(content),
            content_kind: ContentKind::ElementOnly,
            nillable: false,
            default_value: None,
            fixed_value: None,
        }
    }

    /// Whether a default or fixed value stands in for absent content
    pub fn has_preset(&self) -> bool {
        self.default_value.is_some() || self.fixed_value.is_some()
    }
}

/// Namespace rule of a wildcard particle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardRule {
    /// Accept any namespace, including none
    Any,
    /// Accept any namespace other than the target namespace
    Other,
    /// Accept the target namespace only
    Target,
    /// Accept unqualified names only
    Local,
    /// Accept an explicit set of namespaces
    Namespaces(Vec<String>),
}

impl WildcardRule {
    /// Whether an element in `namespace` is acceptable, given the effective
    /// `target` namespace of the position holding the wildcard
    pub fn accepts(&self, namespace: Option<&str>, target: Option<&str>) -> bool {
        match self {
            WildcardRule::Any => true,
            WildcardRule::Other => namespace != target,
            WildcardRule::Target => namespace == target,
            WildcardRule::Local => namespace.is_none(),
            WildcardRule::Namespaces(list) => {
                namespace.map_or(false, |ns| list.iter().any(|n| n == ns))
            }
        }
    }
}

impl Display for WildcardRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WildcardRule::Any => write!(f, "##any"),
            WildcardRule::Other => write!(f, "##other"),
            WildcardRule::Target => write!(f, "##targetNamespace"),
            WildcardRule::Local => write!(f, "##local"),
            WildcardRule::Namespaces(list) => write!(f, "{}", list.join(" ")),
        }
    }
}

/// The kind-specific payload of a state-machine node
#[derive(Debug, Clone, PartialEq)]
pub enum StateKind {
    /// A named element; its single successor is the content model
    Element(ElementDecl),
    /// A wildcard accepting elements by namespace rule; no successors
    Any(WildcardRule),
    /// An ordered group; every child in order
    Sequence(Vec<StateId>),
    /// An unordered group; every child in any order
    All(Vec<StateId>),
    /// An exclusive group; exactly one child
    Choice(Vec<StateId>),
    /// A substitution group; the head element and its substitutes
    Substitution(Vec<StateId>),
}

impl StateKind {
    /// The ordered successor states of this node
    pub fn children(&self) -> &[StateId] {
        match self {
            StateKind::Element(decl) => {
                decl.content.as_ref().map(std::slice::from_ref).unwrap_or(&[])
            }
            StateKind::Any(_) => &[],
            StateKind::Sequence(children)
            | StateKind::All(children)
            | StateKind::Choice(children)
            | StateKind::Substitution(children) => children,
        }
    }

    /// Whether this node can match an element event directly
    pub fn is_leaf(&self) -> bool {
        matches!(self, StateKind::Element(_) | StateKind::Any(_))
    }

    /// A short name for diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            StateKind::Element(_) => "element",
            StateKind::Any(_) => "any",
            StateKind::Sequence(_) => "sequence",
            StateKind::All(_) => "all",
            StateKind::Choice(_) => "choice",
            StateKind::Substitution(_) => "subst",
        }
    }
}

/// One immutable node of the content-model state machine
#[derive(Debug, Clone, PartialEq)]
pub struct StateNode {
    /// Occurrence bounds of this particle at its position
    pub occurs: Occurs,
    /// The node's kind and kind-specific payload
    pub kind: StateKind,
}

impl StateNode {
    /// The ordered successor states of this node
    pub fn children(&self) -> &[StateId] {
        self.kind.children()
    }

    /// The element declaration, if this is an element node
    pub fn element(&self) -> Option<&ElementDecl> {
        match &self.kind {
            StateKind::Element(decl) => Some(decl),
            _ => None,
        }
    }
}

impl Display for StateNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            StateKind::Element(decl) => write!(f, "element {}{}", decl.name, self.occurs),
            StateKind::Any(rule) => write!(f, "any({}){}", rule, self.occurs),
            other => write!(f, "{}{}", other.label(), self.occurs),
        }
    }
}

// Guards recursion through cyclic compositor graphs
const EMPTINESS_DEPTH_LIMIT: usize = 256;

/// A complete, immutable content-model state machine
#[derive(Debug, Clone, PartialEq)]
pub struct StateMachine {
    nodes: Vec<StateNode>,
    root: StateId,
}

impl StateMachine {
    pub(crate) fn from_parts(nodes: Vec<StateNode>, root: StateId) -> Result<Self> {
        for (index, node) in nodes.iter().enumerate() {
            if !node.kind.is_leaf() && node.children().is_empty() {
                bail!("{} group at s{index} has no children", node.kind.label());
            }
            if let Some(child) = node.children().iter().find(|c| c.index() >= nodes.len()) {
                bail!("node s{index} references {child} outside the machine");
            }
            if node.occurs.max.map(|max| max < node.occurs.min).unwrap_or(false) {
                bail!("node s{index} has max occurs below min occurs");
            }
        }
        if root.index() >= nodes.len() {
            bail!("root {root} is outside the machine");
        }
        Ok(StateMachine { nodes, root })
    }

    /// The entry node a document's root element is matched against
    pub fn root(&self) -> StateId {
        self.root
    }

    /// Borrows the node behind a handle
    pub fn node(&self, id: StateId) -> &StateNode {
        &self.nodes[id.index()]
    }

    /// The number of nodes in the machine
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the particle at `id` can be satisfied without consuming any
    /// element events
    pub fn accepts_empty(&self, id: StateId) -> bool {
        self.accepts_empty_guarded(id, 0)
    }

    fn accepts_empty_guarded(&self, id: StateId, depth: usize) -> bool {
        if depth > EMPTINESS_DEPTH_LIMIT {
            return false;
        }
        let node = self.node(id);
        if node.occurs.min == 0 {
            return true;
        }
        match &node.kind {
            StateKind::Element(_) | StateKind::Any(_) => false,
            StateKind::Sequence(children) | StateKind::All(children) => children
                .iter()
                .all(|&child| self.accepts_empty_guarded(child, depth + 1)),
            StateKind::Choice(children) | StateKind::Substitution(children) => children
                .iter()
                .any(|&child| self.accepts_empty_guarded(child, depth + 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> StateNode {
        StateNode {
            occurs: Occurs::ONE,
            kind: StateKind::Element(ElementDecl::simple(QName::local(name))),
        }
    }

    #[test]
    fn occurs_bounds() {
        let occurs = Occurs::new(1, Some(2));
        assert!(!occurs.met(0));
        assert!(occurs.met(1));
        assert!(occurs.admits(2));
        assert!(!occurs.admits(3));
        assert!(occurs.exhausted(2));
        assert!(!Occurs::ZERO_OR_MORE.exhausted(u32::MAX));
    }

    #[test]
    fn empty_groups_are_rejected() {
        let nodes = vec![StateNode {
            occurs: Occurs::ONE,
            kind: StateKind::Sequence(vec![]),
        }];
        assert!(StateMachine::from_parts(nodes, StateId::new(0)).is_err());
    }

    #[test]
    fn dangling_children_are_rejected() {
        let nodes = vec![StateNode {
            occurs: Occurs::ONE,
            kind: StateKind::Choice(vec![StateId::new(7)]),
        }];
        assert!(StateMachine::from_parts(nodes, StateId::new(0)).is_err());
    }

    #[test]
    fn emptiness_of_groups() {
        let mut builder = StateMachineBuilder::new();
        let a = builder.add(leaf("A"));
        let b = builder.add(StateNode {
            occurs: Occurs::OPTIONAL,
            kind: StateKind::Element(ElementDecl::simple(QName::local("B"))),
        });
        let strict = builder.sequence(vec![a, b], Occurs::ONE).unwrap();
        let lenient = builder.sequence(vec![b], Occurs::ONE).unwrap();
        let either = builder.choice(vec![a, b], Occurs::ONE).unwrap();
        let machine = builder.build(strict).unwrap();

        assert!(!machine.accepts_empty(strict));
        assert!(machine.accepts_empty(lenient));
        assert!(machine.accepts_empty(either));
        assert!(machine.accepts_empty(b));
        assert!(!machine.accepts_empty(a));
    }

    #[test]
    fn wildcard_rules() {
        let target = Some("http://t");
        assert!(WildcardRule::Any.accepts(None, target));
        assert!(WildcardRule::Other.accepts(Some("http://x"), target));
        assert!(!WildcardRule::Other.accepts(Some("http://t"), target));
        assert!(WildcardRule::Target.accepts(Some("http://t"), target));
        assert!(WildcardRule::Local.accepts(None, target));
        assert!(!WildcardRule::Local.accepts(Some("http://x"), target));
        let listed = WildcardRule::Namespaces(vec!["http://a".into()]);
        assert!(listed.accepts(Some("http://a"), target));
        assert!(!listed.accepts(Some("http://b"), target));
    }
}
