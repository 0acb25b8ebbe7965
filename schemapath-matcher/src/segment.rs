use schemapath_model::{StateKind, StateMachine};

use crate::path::{PathId, PathPool};

/// A candidate suffix for the committed path: a chain of path nodes from a
/// shared branch point to the element or wildcard that matched
///
/// Segments are built backwards by [prepend](Segment::prepend): the chain from
/// `after_start` to `end` is privately owned and fully linked, while `start`
/// is shared with sibling candidates and its outgoing edge stays dangling
/// (recorded as `start_edge`) until the segment is chosen and committed.
#[derive(Debug)]
pub(crate) struct Segment {
    pub start: PathId,
    pub after_start: Option<PathId>,
    pub start_edge: Option<usize>,
    pub end: PathId,
}

impl Segment {
    /// A single-node candidate: the node itself is the match
    pub fn leaf(node: PathId) -> Self {
        Segment {
            start: node,
            after_start: None,
            start_edge: None,
            end: node,
        }
    }

    /// Grows the chain backwards onto `new_start`, privatizing the previous
    /// start by cloning it (sibling candidates may still share the original)
    pub fn prepend(&mut self, pool: &mut PathPool, new_start: PathId, edge: Option<usize>) {
        let privatized = pool.clone_node(self.start);
        pool.node_mut(privatized).edge = self.start_edge;
        if let Some(after_start) = self.after_start {
            pool.link(privatized, after_start);
        }
        if self.start == self.end {
            self.end = privatized;
        }
        self.after_start = Some(privatized);
        self.start = new_start;
        self.start_edge = edge;
    }

    /// The preference key of spec'd candidate ordering: concrete elements
    /// before wildcards, then the lexicographic walk of (direction rank,
    /// selected child index) pairs along the chain — which prefers earlier
    /// sequence children and shorter chains
    pub fn order_key(&self, pool: &PathPool, machine: &StateMachine) -> (bool, Vec<(u8, usize)>) {
        let ends_in_wildcard = matches!(
            machine.node(pool.node(self.end).schema).kind,
            StateKind::Any(_)
        );
        let mut steps = Vec::new();
        let mut edge = self.start_edge;
        let mut cursor = self.after_start;
        while let Some(id) = cursor {
            let node = pool.node(id);
            steps.push((node.direction.rank(), edge.unwrap_or(usize::MAX)));
            edge = node.edge;
            cursor = if id == self.end { None } else { node.next };
        }
        (ends_in_wildcard, steps)
    }
}

impl PathPool {
    pub(crate) fn describe_segment(&self, segment: &Segment, machine: &StateMachine) -> String {
        let mut parts = vec![format!("{}", machine.node(self.node(segment.start).schema))];
        let mut cursor = segment.after_start;
        while let Some(id) = cursor {
            let node = self.node(id);
            parts.push(format!(
                "{} {}",
                node.direction,
                machine.node(node.schema)
            ));
            cursor = if id == segment.end { None } else { node.next };
        }
        parts.join(" -> ")
    }
}
