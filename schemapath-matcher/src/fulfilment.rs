use schemapath_model::{StateId, StateKind, StateMachine};

use crate::doc::{DocId, DocTree};
use crate::error::ErrorKind;

/// Occurrence status of a schema position relative to its bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fulfilment {
    /// Minimum occurrences not yet satisfiable
    Not,
    /// Minimums met; more occurrences remain possible
    Partial,
    /// Nothing further can be accepted
    Complete,
}

impl Fulfilment {
    /// Whether the position could legitimately be left as it stands
    pub fn fulfilled(self) -> bool {
        !matches!(self, Fulfilment::Not)
    }
}

/// The outcome of assessing one position: its status and which child indices
/// may be entered next
#[derive(Debug)]
pub(crate) struct Assessment {
    pub status: Fulfilment,
    pub admissible: Vec<usize>,
}

/// Assesses the position `schema` against the document view
///
/// `doc` is the committed occurrence, if one exists, and `iteration` the
/// (possibly prospective) repetition under assessment. A prospective
/// repetition — one beyond what the document has committed — sees zeroed
/// child counts, since a fresh repetition starts with nothing consumed.
pub(crate) fn assess(
    machine: &StateMachine,
    tree: &DocTree,
    schema: StateId,
    doc: Option<DocId>,
    iteration: u32,
) -> Result<Assessment, ErrorKind> {
    let node = machine.node(schema);
    let committed = doc.map(|d| tree.node(d).iteration).unwrap_or(0);
    let fresh = doc.is_none() || iteration > committed;
    let count = |index: usize| -> u32 {
        match (fresh, doc) {
            (false, Some(doc)) => tree.child_iteration(doc, index),
            _ => 0,
        }
    };
    // Whether a child position can stand with the occurrences it has: its
    // minimum is met, or the whole particle can be satisfied by nothing
    let satisfied = |child: StateId, entered: u32| -> bool {
        machine.node(child).occurs.met(entered) || machine.accepts_empty(child)
    };

    let mut admissible = Vec::new();
    let status = match &node.kind {
        StateKind::Element(_) | StateKind::Any(_) => {
            if !node.occurs.admits(committed) {
                return Err(ErrorKind::SchemaInvariant(format!(
                    "{} exceeded its occurrence bound",
                    node
                )));
            }
            if !node.occurs.met(committed) {
                Fulfilment::Not
            } else if node.occurs.exhausted(committed) {
                Fulfilment::Complete
            } else {
                Fulfilment::Partial
            }
        }
        StateKind::Sequence(children) => {
            let start = match (fresh, doc) {
                (false, Some(doc)) => tree.node(doc).sequence_position,
                _ => 0,
            };
            let mut all_satisfied = true;
            let mut all_exhausted = true;
            for (position, &child) in children.iter().enumerate().skip(start) {
                let entered = count(position);
                if !machine.node(child).occurs.exhausted(entered) {
                    admissible.push(position);
                    all_exhausted = false;
                }
                if !satisfied(child, entered) {
                    all_satisfied = false;
                    break;
                }
            }
            group_status(node, committed, all_satisfied, all_exhausted)
        }
        StateKind::Choice(children) | StateKind::Substitution(children) => {
            let entered = children
                .iter()
                .enumerate()
                .find(|(position, _)| count(*position) > 0);
            match entered {
                Some((position, &child)) => {
                    let entered = count(position);
                    if !machine.node(child).occurs.admits(entered) {
                        return Err(ErrorKind::SchemaInvariant(format!(
                            "choice branch {} exceeded its occurrence bound",
                            machine.node(child)
                        )));
                    }
                    if !machine.node(child).occurs.exhausted(entered) {
                        admissible.push(position);
                    }
                    group_status(
                        node,
                        committed,
                        satisfied(child, entered),
                        machine.node(child).occurs.exhausted(entered),
                    )
                }
                None => {
                    for (position, &child) in children.iter().enumerate() {
                        if !machine.node(child).occurs.exhausted(0) {
                            admissible.push(position);
                        }
                    }
                    let empty_ok = children.iter().any(|&child| machine.accepts_empty(child));
                    group_status(node, committed, empty_ok, admissible.is_empty())
                }
            }
        }
        StateKind::All(children) => {
            let mut all_satisfied = true;
            let mut all_exhausted = true;
            for (position, &child) in children.iter().enumerate() {
                let entered = count(position);
                if !machine.node(child).occurs.exhausted(entered) {
                    admissible.push(position);
                    all_exhausted = false;
                }
                if !satisfied(child, entered) {
                    all_satisfied = false;
                }
            }
            group_status(node, committed, all_satisfied, all_exhausted)
        }
    };
    Ok(Assessment { status, admissible })
}

/// Combines a group's content status with its own occurrence bound: a group
/// is only complete once its contents are and no further repetition of the
/// group itself is possible
fn group_status(
    node: &schemapath_model::StateNode,
    committed: u32,
    contents_satisfied: bool,
    contents_exhausted: bool,
) -> Fulfilment {
    if !contents_satisfied {
        Fulfilment::Not
    } else if contents_exhausted && node.occurs.exhausted(committed) {
        Fulfilment::Complete
    } else {
        Fulfilment::Partial
    }
}
