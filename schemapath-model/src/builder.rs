use anyhow::{bail, Result};

use crate::{
    ElementDecl, Occurs, StateId, StateKind, StateMachine, StateNode, WildcardRule,
};

/// Incremental constructor for a [StateMachine]
///
/// Nodes are added leaves-first, each add returning the [StateId] used to wire
/// it into later compositors. Cyclic models reserve a [placeholder] first and
/// [fill] it once the referencing subgraph exists.
///
/// [placeholder]: StateMachineBuilder::placeholder
/// [fill]: StateMachineBuilder::fill
#[derive(Debug, Default)]
pub struct StateMachineBuilder {
    nodes: Vec<Option<StateNode>>,
}

impl StateMachineBuilder {
    /// Constructs an empty builder
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a fully formed node, returning its handle
    pub fn add(&mut self, node: StateNode) -> StateId {
        let id = StateId::new(self.nodes.len());
        self.nodes.push(Some(node));
        id
    }

    /// Reserves a handle to be [fill](Self::fill)ed later, enabling cycles
    pub fn placeholder(&mut self) -> StateId {
        let id = StateId::new(self.nodes.len());
        self.nodes.push(None);
        id
    }

    /// Fills a previously reserved placeholder
    pub fn fill(&mut self, id: StateId, node: StateNode) -> Result<()> {
        match self.nodes.get_mut(id.index()) {
            Some(slot @ None) => {
                *slot = Some(node);
                Ok(())
            }
            Some(Some(_)) => bail!("{id} is already filled"),
            None => bail!("{id} was never reserved"),
        }
    }

    /// Adds an element node
    pub fn element(&mut self, decl: ElementDecl, occurs: Occurs) -> StateId {
        self.add(StateNode {
            occurs,
            kind: StateKind::Element(decl),
        })
    }

    /// Adds a wildcard node
    pub fn any(&mut self, rule: WildcardRule, occurs: Occurs) -> StateId {
        self.add(StateNode {
            occurs,
            kind: StateKind::Any(rule),
        })
    }

    /// Adds a sequence compositor over `children`
    pub fn sequence(&mut self, children: Vec<StateId>, occurs: Occurs) -> Result<StateId> {
        self.group(StateKind::Sequence(children), occurs)
    }

    /// Adds an all compositor over `children`
    pub fn all(&mut self, children: Vec<StateId>, occurs: Occurs) -> Result<StateId> {
        self.group(StateKind::All(children), occurs)
    }

    /// Adds a choice compositor over `children`
    pub fn choice(&mut self, children: Vec<StateId>, occurs: Occurs) -> Result<StateId> {
        self.group(StateKind::Choice(children), occurs)
    }

    /// Adds a substitution group; `children` lead with the head element
    pub fn substitution(&mut self, children: Vec<StateId>, occurs: Occurs) -> Result<StateId> {
        self.group(StateKind::Substitution(children), occurs)
    }

    fn group(&mut self, kind: StateKind, occurs: Occurs) -> Result<StateId> {
        if kind.children().is_empty() {
            bail!("{} group must have at least one child", kind.label());
        }
        Ok(self.add(StateNode { occurs, kind }))
    }

    /// Borrows a node added earlier (placeholders return `None`)
    pub fn node(&self, id: StateId) -> Option<&StateNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Finalizes the machine with `root` as its entry node
    pub fn build(self, root: StateId) -> Result<StateMachine> {
        let nodes = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(index, slot)| match slot {
                Some(node) => Ok(node),
                None => bail!("placeholder s{index} was never filled"),
            })
            .collect::<Result<Vec<_>>>()?;
        StateMachine::from_parts(nodes, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QName;

    #[test]
    fn placeholders_permit_recursive_models() {
        let mut builder = StateMachineBuilder::new();
        let item = builder.placeholder();
        let nested = builder.sequence(vec![item], Occurs::OPTIONAL).unwrap();
        builder
            .fill(
                item,
                StateNode {
                    occurs: Occurs::ONE,
                    kind: StateKind::Element(ElementDecl::complex(QName::local("item"), nested)),
                },
            )
            .unwrap();
        let machine = builder.build(item).unwrap();
        assert_eq!(machine.node(nested).children(), &[item]);
    }

    #[test]
    fn unfilled_placeholders_fail_the_build() {
        let mut builder = StateMachineBuilder::new();
        let hole = builder.placeholder();
        let root = builder.sequence(vec![hole], Occurs::ONE).unwrap();
        assert!(builder.build(root).is_err());
    }

    #[test]
    fn double_fill_is_rejected() {
        let mut builder = StateMachineBuilder::new();
        let hole = builder.placeholder();
        let node = StateNode {
            occurs: Occurs::ONE,
            kind: StateKind::Element(ElementDecl::simple(QName::local("x"))),
        };
        builder.fill(hole, node.clone()).unwrap();
        assert!(builder.fill(hole, node).is_err());
    }
}
