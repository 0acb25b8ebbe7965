use schemapath_model::{QName, StateKind, StateMachine};
use tracing::trace;

use crate::doc::DocTree;
use crate::error::ErrorKind;
use crate::fulfilment::assess;
use crate::path::{Direction, PathId, PathPool};
use crate::segment::Segment;

/// Bound on recursive exploration, so self-referential groups cannot run away;
/// hitting it silently yields no candidates from that branch
pub(crate) const MAX_DEPTH: usize = 256;

/// One candidate enumeration over the state machine from the committed
/// position, scoped to a single document event
pub(crate) struct Searcher<'a> {
    pub machine: &'a StateMachine,
    pub pool: &'a mut PathPool,
    pub tree: &'a DocTree,
    /// The innermost open element, which the search may not escape
    pub open_element: Option<&'a QName>,
}

impl<'a> Searcher<'a> {
    /// Enumerates every segment from `from` whose end matches `name`,
    /// unordered
    pub fn find(&mut self, from: PathId, name: &QName) -> Result<Vec<Segment>, ErrorKind> {
        // At the just-opened element itself the only way forward is down into
        // its content model
        let schema = self.pool.node(from).schema;
        if let Some(decl) = self.machine.node(schema).element() {
            if Some(&decl.name) == self.open_element {
                let Some(content) = decl.content else {
                    return Ok(Vec::new());
                };
                let doc = self.pool.node(from).doc;
                let content_doc = doc.and_then(|d| self.tree.child(d, 0));
                let iteration = content_doc
                    .map(|d| self.tree.node(d).iteration)
                    .unwrap_or(0)
                    + 1;
                if !self.machine.node(content).occurs.admits(iteration) {
                    return Ok(Vec::new());
                }
                let child = self
                    .pool
                    .alloc(content, Direction::Child, iteration, content_doc);
                let mut found = self.search(child, name, 1, None)?;
                for segment in &mut found {
                    segment.prepend(self.pool, from, Some(0));
                }
                self.pool.recycle(child);
                return Ok(found);
            }
        }
        self.search(from, name, 0, None)
    }

    /// Recursive exploration; returned segments all start at `from`, sharing
    /// it, with their remaining chains privately owned
    fn search(
        &mut self,
        from: PathId,
        name: &QName,
        depth: usize,
        do_not_follow: Option<schemapath_model::StateId>,
    ) -> Result<Vec<Segment>, ErrorKind> {
        if depth > MAX_DEPTH {
            trace!("abandoning branch at depth limit");
            return Ok(Vec::new());
        }
        let (schema, iteration, doc) = {
            let node = self.pool.node(from);
            (node.schema, node.iteration, node.doc)
        };
        let node = self.machine.node(schema);
        let committed = doc.map(|d| self.tree.node(d).iteration).unwrap_or(0);
        let prospective = doc.is_none() || iteration > committed;

        let mut found = Vec::new();

        // A speculative step onto a leaf is itself the match
        if prospective && node.occurs.admits(iteration) {
            let matched = match &node.kind {
                StateKind::Element(decl) => decl.name == *name,
                StateKind::Any(rule) => {
                    let target = self.open_element.and_then(|open| open.namespace());
                    rule.accepts(name.namespace(), target)
                }
                _ => false,
            };
            if matched {
                found.push(Segment::leaf(from));
            }
        }

        let assessment = assess(self.machine, self.tree, schema, doc, iteration)?;

        // Downward, into each admissible child position
        if !node.kind.is_leaf() {
            for &index in &assessment.admissible {
                let child_state = node.children()[index];
                if Some(child_state) == do_not_follow {
                    continue;
                }
                let child_doc = match (prospective, doc) {
                    (false, Some(doc)) => self.tree.child(doc, index),
                    _ => None,
                };
                let child_iteration =
                    child_doc.map(|d| self.tree.node(d).iteration).unwrap_or(0) + 1;
                if !self.machine.node(child_state).occurs.admits(child_iteration) {
                    continue;
                }
                let child =
                    self.pool
                        .alloc(child_state, Direction::Child, child_iteration, child_doc);
                let below = self.search(child, name, depth + 1, None)?;
                for mut segment in below {
                    segment.prepend(self.pool, from, Some(index));
                    found.push(segment);
                }
                self.pool.recycle(child);
            }
        }

        // Sideways and upward apply only to the committed spine being walked;
        // a speculative repetition has nothing new to reach either way
        if !prospective && assessment.status.fulfilled() {
            if node.occurs.admits(iteration + 1) {
                let sibling = self
                    .pool
                    .alloc(schema, Direction::Sibling, iteration + 1, doc);
                let beside = self.search(sibling, name, depth + 1, None)?;
                for mut segment in beside {
                    segment.prepend(self.pool, from, None);
                    found.push(segment);
                }
                self.pool.recycle(sibling);
            }

            // Ascending onto an element would leave it while it is still
            // open; every element ancestor in the tree is an open element
            if let Some(parent_doc) = doc.and_then(|d| self.tree.node(d).parent) {
                let parent_schema = self.tree.node(parent_doc).schema;
                if self.machine.node(parent_schema).element().is_none() {
                    let parent = self.pool.alloc(
                        parent_schema,
                        Direction::Parent,
                        self.tree.node(parent_doc).iteration,
                        Some(parent_doc),
                    );
                    let above = self.search(parent, name, depth + 1, Some(schema))?;
                    for mut segment in above {
                        segment.prepend(self.pool, from, None);
                        found.push(segment);
                    }
                    self.pool.recycle(parent);
                }
            }
        }

        Ok(found)
    }
}

/// Orders candidates by the preference rules and keeps the sort stable so
/// equal candidates retain discovery order
pub(crate) fn sort_candidates(
    pool: &PathPool,
    machine: &StateMachine,
    candidates: &mut Vec<Segment>,
) {
    let mut keyed: Vec<((bool, Vec<(u8, usize)>), Segment)> = candidates
        .drain(..)
        .map(|segment| (segment.order_key(pool, machine), segment))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    candidates.extend(keyed.into_iter().map(|(_, segment)| segment));
}
