use std::collections::VecDeque;

use schemapath_model::QName;

use crate::path::PathId;
use crate::segment::Segment;

/// A snapshot taken at an ambiguous event, enabling retraction
///
/// Holds the branch point on the committed chain, the remaining candidates in
/// preference order, the index of the event that diverged, and copies of the
/// element and wildcard stacks as they stood before that event.
#[derive(Debug)]
pub(crate) struct DecisionPoint {
    pub branch: PathId,
    pub candidates: VecDeque<Segment>,
    pub event_index: usize,
    pub element_stack: Vec<QName>,
    pub wildcard_stack: Vec<QName>,
}
