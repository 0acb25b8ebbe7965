use std::collections::HashMap;
use std::fmt::Display;

use schemapath_model::{StateId, StateMachine};

/// Handle to a [DocNode] within the matcher's document tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocId(u32);

impl DocId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// One committed occurrence of a schema position in the actual document
///
/// Iteration counts are kept per current repetition of the parent: committing
/// a transition that re-enters a node starts a fresh repetition and zeroes the
/// counts of its direct children (the displaced values are recorded on the
/// committing path node for rollback). The full history of every repetition
/// remains in the committed path.
#[derive(Debug)]
pub struct DocNode {
    pub(crate) schema: StateId,
    pub(crate) iteration: u32,
    pub(crate) sequence_position: usize,
    pub(crate) parent: Option<DocId>,
    pub(crate) children: HashMap<usize, DocId>,
    pub(crate) received_content: bool,
}

impl DocNode {
    /// The schema position this node instantiates
    pub fn schema(&self) -> StateId {
        self.schema
    }

    /// How many times this position has been entered in the current
    /// repetition of its parent
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// The parent occurrence, absent only for the document root
    pub fn parent(&self) -> Option<DocId> {
        self.parent
    }

    /// Whether character data has been received (elements only)
    pub fn received_content(&self) -> bool {
        self.received_content
    }
}

/// Arena of committed document occurrences
///
/// Nodes are created only when a chosen path segment is committed and released
/// only when a rollback returns them to zero iterations, or wholesale at the
/// end of the document.
#[derive(Debug, Default)]
pub(crate) struct DocTree {
    nodes: Vec<Option<DocNode>>,
    free: Vec<DocId>,
    root: Option<DocId>,
}

impl DocTree {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn create(&mut self, schema: StateId, parent: Option<DocId>) -> DocId {
        let node = DocNode {
            schema,
            iteration: 0,
            sequence_position: 0,
            parent,
            children: HashMap::new(),
            received_content: false,
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = Some(node);
                id
            }
            None => {
                let id = DocId(self.nodes.len() as u32);
                self.nodes.push(Some(node));
                id
            }
        }
    }

    pub fn release(&mut self, id: DocId) {
        self.nodes[id.index()] = None;
        self.free.push(id);
        if self.root == Some(id) {
            self.root = None;
        }
    }

    pub fn node(&self, id: DocId) -> &DocNode {
        self.nodes[id.index()].as_ref().expect("released doc node")
    }

    pub fn node_mut(&mut self, id: DocId) -> &mut DocNode {
        self.nodes[id.index()].as_mut().expect("released doc node")
    }

    pub fn set_root(&mut self, id: DocId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<DocId> {
        self.root
    }

    /// The child occurrence at `index` under `id`, if one exists
    pub fn child(&self, id: DocId, index: usize) -> Option<DocId> {
        self.node(id).children.get(&index).copied()
    }

    /// The iteration count of the child at `index`, zero when absent
    pub fn child_iteration(&self, id: DocId, index: usize) -> u32 {
        self.child(id, index).map(|c| self.node(c).iteration).unwrap_or(0)
    }

    /// Walks up from `id` to the nearest enclosing element occurrence
    pub fn owning_element(&self, machine: &StateMachine, id: DocId) -> Option<DocId> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if machine.node(self.node(current).schema).element().is_some() {
                return Some(current);
            }
            cursor = self.node(current).parent;
        }
        None
    }
}
