//! The online, backtracking matcher that aligns a stream of document events
//! against a precompiled content-model state machine, committing the single
//! traversal consistent with both the schema and everything seen so far.
//!
//! Ambiguity is intrinsic: optional groups, unbounded repetitions,
//! substitution groups and wildcards can all reach the same element through
//! several traversals. The [PathFinder] explores the alternatives for each
//! event, commits the preferred one, stacks a decision point when more than
//! one survives, and — when a later event refutes an earlier commitment —
//! rolls the document tree back to the branch point and replays the
//! intervening events against the next alternative.
//!
//! ```
//! use schemapath_matcher::PathFinder;
//! use schemapath_model::parse_grammar;
//! use schemapath_sax::EventScript;
//!
//! let machine = parse_grammar(
//!     "element root { sequence { choice * { element A, element B }, any(##other) ? } }",
//! )?;
//! let mut finder = PathFinder::new(&machine);
//! EventScript::parse(
//!     "
//!     start root
//!     start A
//!     end A
//!     end root
//!     ",
//! )?
//! .drive(&mut finder)?;
//!
//! let rendered = finder.render_path();
//! assert!(rendered.starts_with("child element root"));
//! assert!(rendered.contains("child element A"));
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! After `end_document` the committed chain reached from the root step — see
//! [PathFinder::path] — is the canonical traversal; the document tree behind
//! it records how many times each schema position was instantiated.
//!
//! One matcher handles one document at a time. The state machine itself is
//! immutable and may be shared by any number of matcher instances.
#![warn(missing_docs)]

use anyhow::Result;
use tracing::{debug, span, trace, Level};

use schemapath_model::{ContentKind, QName, StateKind, StateMachine};
use schemapath_sax::{
    Attribute, ElementValidator, EventHandler, LenientValidator, NamespaceContext,
};

mod decision;
mod doc;
mod error;
mod fulfilment;
mod log;
mod path;
mod search;
mod segment;

pub use doc::{DocId, DocNode};
pub use error::{ErrorKind, MatchError};
pub use fulfilment::Fulfilment;
pub use log::EventKind;
pub use path::{Direction, PathId, PathNode};

use decision::DecisionPoint;
use doc::DocTree;
use fulfilment::assess;
use log::EventLog;
use path::{follow, unfollow, PathPool, Undo};
use search::{sort_candidates, Searcher};
use segment::Segment;

/// One committed step of the canonical traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    /// The schema position visited
    pub state: schemapath_model::StateId,
    /// How the step was reached
    pub direction: Direction,
    /// Which repetition of the position this step entered
    pub iteration: u32,
    /// The document occurrence the step is bound to
    pub doc: Option<DocId>,
}

/// The event the matcher was processing when a branch was refuted
#[derive(Clone, Copy)]
enum Refuted<'e> {
    Start(&'e QName, &'e [Attribute]),
    End(&'e QName),
}

impl Refuted<'_> {
    fn name(&self) -> &QName {
        match self {
            Refuted::Start(name, _) | Refuted::End(name) => name,
        }
    }
}

/// The event-driven matcher; one instance per document
///
/// Feed it events directly or through its [EventHandler] implementation. On
/// success the committed traversal is available from [path](PathFinder::path);
/// on failure every event method returns a [MatchError] carrying the event
/// trail.
pub struct PathFinder<'m, V = LenientValidator> {
    machine: &'m StateMachine,
    validator: V,
    pool: PathPool,
    tree: DocTree,
    log: EventLog,
    decisions: Vec<DecisionPoint>,
    element_stack: Vec<QName>,
    wildcard_stack: Vec<QName>,
    namespaces: NamespaceContext,
    root: PathId,
    current: Option<PathId>,
}

impl<'m> PathFinder<'m, LenientValidator> {
    /// Constructs a matcher over `machine` with the lenient validator
    pub fn new(machine: &'m StateMachine) -> Self {
        Self::with_validator(machine, LenientValidator)
    }
}

impl<'m, V: ElementValidator> PathFinder<'m, V> {
    /// Constructs a matcher over `machine` delegating lexical checks to
    /// `validator`
    pub fn with_validator(machine: &'m StateMachine, validator: V) -> Self {
        let mut pool = PathPool::new();
        let root = pool.alloc(machine.root(), Direction::Child, 1, None);
        PathFinder {
            machine,
            validator,
            pool,
            tree: DocTree::new(),
            log: EventLog::default(),
            decisions: Vec::new(),
            element_stack: Vec::new(),
            wildcard_stack: Vec::new(),
            namespaces: NamespaceContext::new(),
            root,
            current: None,
        }
    }

    fn reset(&mut self) {
        self.pool = PathPool::new();
        self.tree = DocTree::new();
        self.log = EventLog::default();
        self.decisions.clear();
        self.element_stack.clear();
        self.wildcard_stack.clear();
        self.namespaces = NamespaceContext::new();
        self.root = self
            .pool
            .alloc(self.machine.root(), Direction::Child, 1, None);
        self.current = None;
    }

    fn fatal(&self, kind: ErrorKind) -> MatchError {
        MatchError::new(kind, self.log.render())
    }

    /// Whether events are currently inside an opaque wildcard subtree
    fn in_wildcard(&self) -> bool {
        if self.wildcard_stack.is_empty() {
            return false;
        }
        self.current
            .map(|id| {
                matches!(
                    self.machine.node(self.pool.node(id).schema).kind,
                    StateKind::Any(_)
                )
            })
            .unwrap_or(false)
    }

    // -- Event entry points --------------------------------------------------

    /// Begins a new document, discarding any state from a previous one
    pub fn start_document(&mut self) -> Result<(), MatchError> {
        self.reset();
        Ok(())
    }

    /// Records a namespace prefix mapping
    pub fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<(), MatchError> {
        self.namespaces.declare(prefix, uri);
        Ok(())
    }

    /// Ends a prefix mapping; the registry is append-only so nothing is
    /// removed
    pub fn end_prefix_mapping(&mut self, _prefix: &str) -> Result<(), MatchError> {
        Ok(())
    }

    /// Processes an element start, backtracking as needed to place it
    pub fn start_element(
        &mut self,
        name: &QName,
        attributes: &[Attribute],
    ) -> Result<(), MatchError> {
        let span = span!(Level::DEBUG, "start_element", name = %name);
        let _span = span.enter();
        if !self.handle_start(name, attributes, None)? {
            debug!("no candidate admits \"{name}\"; backtracking");
            self.backtrack(Refuted::Start(name, attributes))?;
        }
        Ok(())
    }

    /// Processes character data within the open element
    pub fn characters(&mut self, text: &str) -> Result<(), MatchError> {
        if self.in_wildcard() {
            // Content inside a wildcard subtree is opaque
            return Ok(());
        }
        let trimmed = text.trim();
        let Some(current) = self.current else {
            if trimmed.is_empty() {
                return Ok(());
            }
            return Err(self.fatal(ErrorKind::UnexpectedCharacterData { owner: None }));
        };
        let Some(doc) = self.pool.node(current).doc else {
            return Err(self.fatal(ErrorKind::SchemaInvariant(
                "character data at an uncommitted position".into(),
            )));
        };
        let Some(owner) = self.tree.owning_element(self.machine, doc) else {
            if trimmed.is_empty() {
                return Ok(());
            }
            return Err(self.fatal(ErrorKind::UnexpectedCharacterData { owner: None }));
        };
        let Some(decl) = self.machine.node(self.tree.node(owner).schema).element() else {
            return Err(self.fatal(ErrorKind::SchemaInvariant(
                "owning occurrence is not an element".into(),
            )));
        };

        if !decl.content_kind.expects_text() {
            if trimmed.is_empty() {
                // Ignorable whitespace between child elements
                return Ok(());
            }
            return Err(self.fatal(ErrorKind::UnexpectedCharacterData {
                owner: Some(decl.name.clone()),
            }));
        }
        if trimmed.is_empty()
            && !decl.nillable
            && decl.content_kind != ContentKind::Mixed
            && !decl.has_preset()
        {
            return Err(self.fatal(ErrorKind::MissingContent {
                name: decl.name.clone(),
            }));
        }
        self.validator
            .validate_content(decl, text, &self.namespaces)
            .map_err(|cause| self.fatal(ErrorKind::ContentInvalid(cause)))?;

        let owner_name = decl.name.clone();
        self.push_content(owner);
        self.log.push_content(owner_name, text);
        Ok(())
    }

    /// Processes an element end, backtracking if the close refutes the
    /// committed branch
    pub fn end_element(&mut self, name: &QName) -> Result<(), MatchError> {
        let span = span!(Level::DEBUG, "end_element", name = %name);
        let _span = span.enter();
        if !self.handle_end(name, None)? {
            debug!("\"{name}\" cannot close here; backtracking");
            self.backtrack(Refuted::End(name))?;
        }
        Ok(())
    }

    /// Finishes the document; the committed path becomes final
    pub fn end_document(&mut self) -> Result<(), MatchError> {
        if !self.element_stack.is_empty() {
            return Err(self.fatal(ErrorKind::UnclosedElements {
                depth: self.element_stack.len(),
            }));
        }
        // Untried alternatives are no longer needed
        let decisions = std::mem::take(&mut self.decisions);
        for decision in decisions {
            for segment in &decision.candidates {
                self.pool.recycle_segment(segment);
            }
        }
        Ok(())
    }

    // -- Results -------------------------------------------------------------

    /// The committed traversal, from the root step onward
    ///
    /// Empty until a root element has been committed; final after
    /// [end_document](PathFinder::end_document).
    pub fn path(&self) -> impl Iterator<Item = PathStep> + '_ {
        let mut cursor = self.tree.root().map(|_| self.root);
        std::iter::from_fn(move || {
            let id = cursor?;
            let node = self.pool.node(id);
            cursor = node.next();
            Some(PathStep {
                state: node.schema(),
                direction: node.direction(),
                iteration: node.iteration(),
                doc: node.doc(),
            })
        })
    }

    /// Renders the committed traversal, one step per line
    pub fn render_path(&self) -> String {
        self.path()
            .map(|step| {
                format!(
                    "{} {} #{}",
                    step.direction,
                    self.machine.node(step.state),
                    step.iteration
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Borrows a committed document occurrence
    pub fn doc_node(&self, id: DocId) -> &DocNode {
        self.tree.node(id)
    }

    /// The namespace mappings seen so far
    pub fn namespaces(&self) -> &NamespaceContext {
        &self.namespaces
    }

    // -- Event machinery -----------------------------------------------------

    /// Advances over one start event. `replay` carries the event's log index
    /// when re-driving history after a retraction; live events pass `None`
    /// and are logged on success. Returns false when no candidate admits the
    /// element.
    fn handle_start(
        &mut self,
        name: &QName,
        attributes: &[Attribute],
        replay: Option<usize>,
    ) -> Result<bool, MatchError> {
        if self.in_wildcard() {
            if replay.is_none() {
                self.log.push_start(name, attributes);
            }
            self.element_stack.push(name.clone());
            self.wildcard_stack.push(name.clone());
            return Ok(true);
        }
        let current = *self.current.get_or_insert(self.root);
        let live = replay.is_none();
        let event_index = replay.unwrap_or_else(|| self.log.len());

        let found = {
            let mut searcher = Searcher {
                machine: self.machine,
                pool: &mut self.pool,
                tree: &self.tree,
                open_element: self.element_stack.last(),
            };
            searcher.find(current, name)
        };
        let mut candidates = found.map_err(|kind| self.fatal(kind))?;
        if candidates.is_empty() {
            return Ok(false);
        }
        sort_candidates(&self.pool, self.machine, &mut candidates);
        trace!(
            "{} candidate(s) for \"{name}\", taking {}",
            candidates.len(),
            self.pool.describe_segment(&candidates[0], self.machine)
        );

        let chosen = candidates.remove(0);
        if !candidates.is_empty() {
            self.decisions.push(DecisionPoint {
                branch: current,
                candidates: candidates.into(),
                event_index,
                element_stack: self.element_stack.clone(),
                wildcard_stack: self.wildcard_stack.clone(),
            });
        }
        self.apply(chosen, name, attributes, live)?;
        if live {
            self.log.push_start(name, attributes);
        }
        Ok(true)
    }

    /// Commits a chosen candidate for a start event: splices and binds the
    /// segment, validates attributes (live events only), and pushes the
    /// element onto the stacks
    fn apply(
        &mut self,
        segment: Segment,
        name: &QName,
        attributes: &[Attribute],
        validate: bool,
    ) -> Result<(), MatchError> {
        follow(&mut self.pool, &mut self.tree, self.machine, &segment)
            .map_err(|kind| self.fatal(kind))?;
        self.current = Some(segment.end);

        let end_node = self.machine.node(self.pool.node(segment.end).schema);
        if validate {
            if let Some(decl) = end_node.element() {
                self.validator
                    .validate_attributes(decl, attributes, &self.namespaces)
                    .map_err(|cause| self.fatal(ErrorKind::ContentInvalid(cause)))?;
            }
        }
        self.element_stack.push(name.clone());
        if matches!(end_node.kind, StateKind::Any(_)) {
            self.wildcard_stack.push(name.clone());
        }
        Ok(())
    }

    /// Advances over one end event; returns false when the close refutes the
    /// current branch
    fn handle_end(&mut self, name: &QName, replay: Option<usize>) -> Result<bool, MatchError> {
        if self.in_wildcard() {
            if replay.is_none() {
                self.log.push_end(name);
            }
            self.element_stack.pop();
            self.wildcard_stack.pop();
            if self.wildcard_stack.is_empty() {
                // The wildcard element itself has closed
                self.walk_up_tree()?;
            }
            return Ok(true);
        }
        if !self.close_element(name)? {
            return Ok(false);
        }
        if replay.is_none() {
            self.log.push_end(name);
        }
        self.element_stack.pop();
        self.walk_up_tree()?;
        Ok(true)
    }

    /// Walks the path up to the element being closed, gating each departure
    /// on its fulfilment, then checks the element's own content expectations.
    /// Returns false when the close is inconsistent with the committed branch.
    fn close_element(&mut self, name: &QName) -> Result<bool, MatchError> {
        match self.element_stack.last() {
            Some(top) if top == name => {}
            top => {
                let expected = top.cloned();
                return Err(self.fatal(ErrorKind::MismatchedEnd {
                    expected,
                    found: name.clone(),
                }));
            }
        }
        let Some(mut cursor) = self.current else {
            return Err(self.fatal(ErrorKind::SchemaInvariant(
                "end event before any start".into(),
            )));
        };

        loop {
            let (schema, iteration, doc) = {
                let node = self.pool.node(cursor);
                (node.schema(), node.iteration(), node.doc())
            };
            let node = self.machine.node(schema);
            if let Some(decl) = node.element() {
                if decl.name == *name {
                    break;
                }
            }
            // Leaving this position behind for good: its content and its own
            // minimum must both be satisfied
            let assessment = assess(self.machine, &self.tree, schema, doc, iteration)
                .map_err(|kind| self.fatal(kind))?;
            if !(assessment.status.fulfilled() && node.occurs.met(iteration)) {
                trace!("{} unfulfilled at close of \"{name}\"", node);
                return Ok(false);
            }
            let Some(doc) = doc else {
                return Err(self.fatal(ErrorKind::SchemaInvariant(
                    "closing over an uncommitted position".into(),
                )));
            };
            let Some(parent) = self.tree.node(doc).parent() else {
                return Err(self.fatal(ErrorKind::SchemaInvariant(format!(
                    "no enclosing element found closing \"{name}\""
                ))));
            };
            let parent_schema = self.tree.node(parent).schema();
            let parent_iteration = self.tree.node(parent).iteration();
            let step = self.pool.alloc(
                parent_schema,
                Direction::Parent,
                parent_iteration,
                Some(parent),
            );
            self.pool.link(cursor, step);
            cursor = step;
        }
        self.current = Some(cursor);

        let (schema, doc) = {
            let node = self.pool.node(cursor);
            (node.schema(), node.doc())
        };
        let Some(doc) = doc else {
            return Err(self.fatal(ErrorKind::SchemaInvariant(
                "closing an uncommitted element".into(),
            )));
        };
        let decl = self
            .machine
            .node(schema)
            .element()
            .expect("walk ended on a non-element");

        // A simple-typed element must have received content by now
        if decl.content_kind == ContentKind::Simple
            && !self.tree.node(doc).received_content()
            && !decl.nillable
            && !decl.has_preset()
        {
            return Err(self.fatal(ErrorKind::MissingContent {
                name: decl.name.clone(),
            }));
        }
        // Its content model must be satisfied, or satisfiable by nothing
        if let Some(content) = decl.content {
            match self.tree.child(doc, 0) {
                Some(content_doc) => {
                    let iteration = self.tree.node(content_doc).iteration();
                    let assessment =
                        assess(self.machine, &self.tree, content, Some(content_doc), iteration)
                            .map_err(|kind| self.fatal(kind))?;
                    if !(assessment.status.fulfilled()
                        && self.machine.node(content).occurs.met(iteration))
                    {
                        trace!("content of \"{name}\" unfulfilled at close");
                        return Ok(false);
                    }
                }
                None => {
                    if !self.machine.accepts_empty(content) {
                        trace!("\"{name}\" closed before entering required content");
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    /// After a close, ascends past every position that can accept nothing
    /// further, stopping at the first extensible position, an element, or the
    /// root
    fn walk_up_tree(&mut self) -> Result<(), MatchError> {
        loop {
            let Some(cursor) = self.current else { return Ok(()) };
            let (schema, iteration, doc) = {
                let node = self.pool.node(cursor);
                (node.schema(), node.iteration(), node.doc())
            };
            let Some(doc) = doc else { return Ok(()) };
            let assessment = assess(self.machine, &self.tree, schema, Some(doc), iteration)
                .map_err(|kind| self.fatal(kind))?;
            if assessment.status != Fulfilment::Complete {
                return Ok(());
            }
            let Some(parent) = self.tree.node(doc).parent() else {
                return Ok(());
            };
            let parent_schema = self.tree.node(parent).schema();
            let parent_iteration = self.tree.node(parent).iteration();
            let step = self.pool.alloc(
                parent_schema,
                Direction::Parent,
                parent_iteration,
                Some(parent),
            );
            self.pool.link(cursor, step);
            self.current = Some(step);
            if self.machine.node(parent_schema).element().is_some() {
                return Ok(());
            }
        }
    }

    /// Inserts a content step after the current position and marks the owning
    /// element, recording the previous flag for rollback
    fn push_content(&mut self, owner: DocId) {
        let Some(current) = self.current else { return };
        let (schema, iteration, doc) = {
            let node = self.pool.node(current);
            (node.schema(), node.iteration(), node.doc())
        };
        let had_content = self.tree.node(owner).received_content();
        self.tree.node_mut(owner).received_content = true;
        let step = self.pool.alloc(schema, Direction::Content, iteration, doc);
        self.pool.node_mut(step).undo = Undo {
            content_owner: Some(owner),
            owner_had_content: had_content,
            ..Undo::default()
        };
        self.pool.link(current, step);
        self.current = Some(step);
    }

    /// Re-drives one logged content event; checks and validation already
    /// happened live
    fn replay_content(&mut self) -> Result<(), MatchError> {
        if self.in_wildcard() {
            return Ok(());
        }
        let Some(current) = self.current else {
            return Ok(());
        };
        let Some(doc) = self.pool.node(current).doc() else {
            return Ok(());
        };
        if let Some(owner) = self.tree.owning_element(self.machine, doc) {
            self.push_content(owner);
        }
        Ok(())
    }

    /// The iterative retraction loop: keeps taking the next alternative from
    /// the newest decision point, rolling the document back to its branch
    /// point, replaying the events after the divergence, and finally
    /// re-attempting the refuted event. Decision points created during replay
    /// stay on the stack and are tried first when the replayed branch also
    /// fails.
    fn backtrack(&mut self, refuted: Refuted<'_>) -> Result<(), MatchError> {
        loop {
            let Some(top) = self.decisions.last_mut() else {
                let name = refuted.name().clone();
                return Err(self.fatal(ErrorKind::PathNotFound { name }));
            };
            let Some(candidate) = top.candidates.pop_front() else {
                self.decisions.pop();
                continue;
            };
            let branch = top.branch;
            let event_index = top.event_index;
            let element_stack = top.element_stack.clone();
            let wildcard_stack = top.wildcard_stack.clone();
            debug!(
                "retrying event {event_index} with {}",
                self.pool.describe_segment(&candidate, self.machine)
            );

            unfollow(&mut self.pool, &mut self.tree, branch);
            self.current = Some(branch);
            self.element_stack = element_stack;
            self.wildcard_stack = wildcard_stack;

            // Recommit the diverged start against the new alternative
            let diverged = self.log.get(event_index).clone();
            self.apply(candidate, &diverged.name, &diverged.attributes, false)?;

            if !self.replay(event_index + 1)? {
                continue;
            }
            let succeeded = match refuted {
                Refuted::Start(name, attributes) => self.handle_start(name, attributes, None)?,
                Refuted::End(name) => self.handle_end(name, None)?,
            };
            if succeeded {
                return Ok(());
            }
        }
    }

    /// Re-drives the logged events from `from` to the end of the log against
    /// the freshly chosen branch. Returns false as soon as any replayed event
    /// finds no continuation, leaving newly pushed decision points in place.
    fn replay(&mut self, from: usize) -> Result<bool, MatchError> {
        for index in from..self.log.len() {
            let event = self.log.get(index).clone();
            let advanced = match event.kind {
                EventKind::Start => self.handle_start(&event.name, &event.attributes, Some(index))?,
                EventKind::Content => {
                    self.replay_content()?;
                    true
                }
                EventKind::End => self.handle_end(&event.name, Some(index))?,
            };
            if !advanced {
                trace!("replay refuted at event {index}");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<V: ElementValidator> EventHandler for PathFinder<'_, V> {
    fn start_document(&mut self) -> Result<()> {
        Ok(PathFinder::start_document(self)?)
    }

    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()> {
        Ok(PathFinder::start_prefix_mapping(self, prefix, uri)?)
    }

    fn end_prefix_mapping(&mut self, prefix: &str) -> Result<()> {
        Ok(PathFinder::end_prefix_mapping(self, prefix)?)
    }

    fn start_element(&mut self, name: &QName, attributes: &[Attribute]) -> Result<()> {
        Ok(PathFinder::start_element(self, name, attributes)?)
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        Ok(PathFinder::characters(self, text)?)
    }

    fn end_element(&mut self, name: &QName) -> Result<()> {
        Ok(PathFinder::end_element(self, name)?)
    }

    fn end_document(&mut self) -> Result<()> {
        Ok(PathFinder::end_document(self)?)
    }
}

#[cfg(test)]
mod tests;
