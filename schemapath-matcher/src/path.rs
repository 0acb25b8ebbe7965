use std::fmt::Display;

use schemapath_model::{StateId, StateKind, StateMachine};

use crate::doc::{DocId, DocTree};
use crate::error::ErrorKind;
use crate::segment::Segment;

/// Handle to a [PathNode] within its owning [PathPool]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathId(u32);

impl PathId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for PathId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// How a path node was reached from its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Descended into a child state
    Child,
    /// Re-entered the same state for a further repetition
    Sibling,
    /// Ascended to the parent state
    Parent,
    /// Stayed in place to record character content
    Content,
}

impl Direction {
    /// Preference rank used when ordering candidate segments
    pub(crate) fn rank(self) -> u8 {
        match self {
            Direction::Child => 0,
            Direction::Sibling => 1,
            Direction::Parent => 2,
            Direction::Content => 3,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Direction::Child => "child",
            Direction::Sibling => "sibling",
            Direction::Parent => "parent",
            Direction::Content => "content",
        })
    }
}

/// What a committed transition displaced, so rollback can restore it exactly
#[derive(Debug, Default, Clone)]
pub(crate) struct Undo {
    /// The transition created its document node
    pub created_doc: bool,
    /// The parent's sequence position before a child entry
    pub parent_prev_position: usize,
    /// The entered node's own sequence position before it was reset
    pub entered_prev_position: usize,
    /// The entered node's received-content flag before it was reset
    pub entered_prev_received: bool,
    /// Direct children of the entered node: (index, iteration, position)
    /// before the fresh repetition zeroed them
    pub displaced: Vec<(usize, u32, usize)>,
    /// For content nodes: the element whose received-content flag was raised
    pub content_owner: Option<DocId>,
    /// That element's flag before it was raised
    pub owner_had_content: bool,
}

/// One step of a (possibly speculative) traversal through the state machine
#[derive(Debug, Clone)]
pub struct PathNode {
    pub(crate) schema: StateId,
    pub(crate) direction: Direction,
    pub(crate) iteration: u32,
    pub(crate) doc: Option<DocId>,
    pub(crate) prev: Option<PathId>,
    pub(crate) next: Option<PathId>,
    /// Which child index of `schema` the outgoing edge selects, for child
    /// transitions
    pub(crate) edge: Option<usize>,
    pub(crate) undo: Undo,
}

impl PathNode {
    /// The schema position this step visits
    pub fn schema(&self) -> StateId {
        self.schema
    }

    /// How the step was reached
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The repetition this step represents (prospective until committed)
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// The committed document occurrence, bound on commit
    pub fn doc(&self) -> Option<DocId> {
        self.doc
    }

    /// The next committed step, if any
    pub fn next(&self) -> Option<PathId> {
        self.next
    }
}

/// Arena of path nodes with explicit recycling
///
/// Nodes are allocated liberally during candidate search; refuted branches
/// return theirs to the free list. A node referenced by a live segment or the
/// committed chain is never recycled.
#[derive(Debug, Default)]
pub(crate) struct PathPool {
    nodes: Vec<Option<PathNode>>,
    free: Vec<PathId>,
}

impl PathPool {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn alloc(
        &mut self,
        schema: StateId,
        direction: Direction,
        iteration: u32,
        doc: Option<DocId>,
    ) -> PathId {
        let node = PathNode {
            schema,
            direction,
            iteration,
            doc,
            prev: None,
            next: None,
            edge: None,
            undo: Undo::default(),
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = Some(node);
                id
            }
            None => {
                let id = PathId(self.nodes.len() as u32);
                self.nodes.push(Some(node));
                id
            }
        }
    }

    /// Copies the scalar fields of `id` into a fresh node with cleared links
    pub fn clone_node(&mut self, id: PathId) -> PathId {
        let source = self.node(id);
        let (schema, direction, iteration) = (source.schema, source.direction, source.iteration);
        self.alloc(schema, direction, iteration, None)
    }

    /// Returns an unlinked node to the free list
    pub fn recycle(&mut self, id: PathId) {
        self.nodes[id.index()] = None;
        self.free.push(id);
    }

    pub fn node(&self, id: PathId) -> &PathNode {
        self.nodes[id.index()].as_ref().expect("recycled path node")
    }

    pub fn node_mut(&mut self, id: PathId) -> &mut PathNode {
        self.nodes[id.index()].as_mut().expect("recycled path node")
    }

    /// Splices `next` directly after `prev`
    pub fn link(&mut self, prev: PathId, next: PathId) {
        self.node_mut(prev).next = Some(next);
        self.node_mut(next).prev = Some(prev);
    }

    /// Recycles a candidate segment's privately owned chain (its shared start
    /// is left alone)
    pub fn recycle_segment(&mut self, segment: &Segment) {
        let mut cursor = segment.after_start;
        while let Some(id) = cursor {
            cursor = if id == segment.end {
                None
            } else {
                self.node(id).next
            };
            self.recycle(id);
        }
    }
}

/// Commits a chosen segment: splices it onto the committed chain and binds
/// each node to its document occurrence, creating and entering occurrences as
/// it goes.
pub(crate) fn follow(
    pool: &mut PathPool,
    tree: &mut DocTree,
    machine: &StateMachine,
    segment: &Segment,
) -> Result<(), ErrorKind> {
    // The start is normally already committed; the pre-created root node is
    // the one exception and is entered here on first use
    if pool.node(segment.start).doc.is_none() {
        let schema = pool.node(segment.start).schema;
        let root_dn = tree.create(schema, None);
        tree.set_root(root_dn);
        enter(pool, tree, segment.start, root_dn, true)?;
    }
    pool.node_mut(segment.start).edge = segment.start_edge;
    let Some(after_start) = segment.after_start else {
        return Ok(());
    };
    pool.link(segment.start, after_start);

    let mut cursor = after_start;
    loop {
        commit_transition(pool, tree, machine, cursor)?;
        if cursor == segment.end {
            break;
        }
        cursor = pool
            .node(cursor)
            .next
            .expect("segment chain ended before its end node");
    }
    Ok(())
}

fn commit_transition(
    pool: &mut PathPool,
    tree: &mut DocTree,
    machine: &StateMachine,
    id: PathId,
) -> Result<(), ErrorKind> {
    let prev = pool
        .node(id)
        .prev
        .expect("transition committed without a predecessor");
    let prev_doc = pool
        .node(prev)
        .doc
        .expect("transition committed after an uncommitted node");
    match pool.node(id).direction {
        Direction::Child => {
            let index = pool.node(prev).edge.ok_or_else(|| {
                ErrorKind::SchemaInvariant("child transition without an edge index".into())
            })?;
            let parent_position = tree.node(prev_doc).sequence_position;
            let (child, created) = match tree.child(prev_doc, index) {
                Some(existing) => (existing, false),
                None => {
                    let schema = pool.node(id).schema;
                    let child = tree.create(schema, Some(prev_doc));
                    tree.node_mut(prev_doc).children.insert(index, child);
                    (child, true)
                }
            };
            // Entering a child advances the parent's position within a
            // sequence
            if let StateKind::Sequence(_) = machine.node(tree.node(prev_doc).schema).kind {
                tree.node_mut(prev_doc).sequence_position = index;
            }
            pool.node_mut(id).undo.parent_prev_position = parent_position;
            enter(pool, tree, id, child, created)?;
        }
        Direction::Sibling => {
            enter(pool, tree, id, prev_doc, false)?;
        }
        Direction::Parent => {
            let parent = tree.node(prev_doc).parent.ok_or_else(|| {
                ErrorKind::SchemaInvariant("parent transition above the document root".into())
            })?;
            pool.node_mut(id).doc = Some(parent);
        }
        Direction::Content => {
            pool.node_mut(id).doc = Some(prev_doc);
        }
    }
    Ok(())
}

/// Begins a fresh repetition of `doc`: bumps its iteration, resets its
/// per-repetition state and records everything displaced on the path node
fn enter(
    pool: &mut PathPool,
    tree: &mut DocTree,
    id: PathId,
    doc: DocId,
    created: bool,
) -> Result<(), ErrorKind> {
    let displaced: Vec<(usize, u32, usize)> = {
        let node = tree.node(doc);
        node.children
            .iter()
            .map(|(&index, &child)| {
                let child = tree.node(child);
                (index, child.iteration, child.sequence_position)
            })
            .collect()
    };
    let child_ids: Vec<DocId> = tree.node(doc).children.values().copied().collect();
    for child in child_ids {
        let child = tree.node_mut(child);
        child.iteration = 0;
        child.sequence_position = 0;
    }

    let node = tree.node_mut(doc);
    let undo = Undo {
        created_doc: created,
        parent_prev_position: pool.node(id).undo.parent_prev_position,
        entered_prev_position: node.sequence_position,
        entered_prev_received: node.received_content,
        displaced,
        content_owner: None,
        owner_had_content: false,
    };
    node.iteration += 1;
    node.sequence_position = 0;
    node.received_content = false;
    let iteration = node.iteration;

    let path_node = pool.node_mut(id);
    path_node.doc = Some(doc);
    path_node.undo = undo;
    if path_node.iteration != iteration {
        return Err(ErrorKind::SchemaInvariant(format!(
            "entered iteration {iteration} does not match path node {}",
            path_node.iteration
        )));
    }
    Ok(())
}

/// Reverses every transition committed after `branch`, restoring document
/// state exactly and truncating the committed chain at the branch point.
/// The reclaimed nodes go back to the pool.
pub(crate) fn unfollow(pool: &mut PathPool, tree: &mut DocTree, branch: PathId) {
    let mut chain = Vec::new();
    let mut cursor = pool.node(branch).next;
    while let Some(id) = cursor {
        chain.push(id);
        cursor = pool.node(id).next;
    }

    for &id in chain.iter().rev() {
        let node = pool.node(id);
        let direction = node.direction;
        let doc = node.doc;
        let undo = node.undo.clone();
        match direction {
            Direction::Child | Direction::Sibling => {
                let doc = doc.expect("committed transition without a document node");
                {
                    let node = tree.node_mut(doc);
                    node.iteration -= 1;
                    node.sequence_position = undo.entered_prev_position;
                    node.received_content = undo.entered_prev_received;
                }
                for (index, iteration, position) in undo.displaced {
                    if let Some(child) = tree.child(doc, index) {
                        let child = tree.node_mut(child);
                        child.iteration = iteration;
                        child.sequence_position = position;
                    }
                }
                if direction == Direction::Child {
                    if let Some(parent) = tree.node(doc).parent {
                        tree.node_mut(parent).sequence_position = undo.parent_prev_position;
                        if undo.created_doc {
                            let index = tree
                                .node(parent)
                                .children
                                .iter()
                                .find(|(_, &child)| child == doc)
                                .map(|(&index, _)| index);
                            if let Some(index) = index {
                                tree.node_mut(parent).children.remove(&index);
                            }
                            tree.release(doc);
                        }
                    }
                }
            }
            Direction::Parent => {}
            Direction::Content => {
                if let Some(owner) = undo.content_owner {
                    tree.node_mut(owner).received_content = undo.owner_had_content;
                }
            }
        }
        pool.recycle(id);
    }
    pool.node_mut(branch).next = None;
}
