//! Read-only structural queries over the IR
//!
//! [`NodeRef`] is the cursor handed to compiler passes and to user-level
//! code-transformation macros. None of its operations mutate the tree.
//! Queries relative to a parent (ancestors, siblings) return `None` for a
//! detached node.

use super::node::{Node, NodeId, NodeKind};
use super::tree::IrTree;
use crate::span::Span;

/// Borrowed cursor on one node of an [`IrTree`]
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a IrTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(tree: &'a IrTree, id: NodeId) -> Self {
        Self { tree, id }
    }

    fn node(&self) -> &'a Node {
        // A NodeRef is only constructed for ids that exist in its tree.
        &self.tree_nodes()[self.id.index()]
    }

    fn tree_nodes(&self) -> &'a [Node] {
        self.tree.nodes()
    }

    fn at(&self, id: NodeId) -> NodeRef<'a> {
        NodeRef::new(self.tree, id)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.node().kind
    }

    pub fn span(&self) -> Span {
        self.node().span
    }

    pub fn slot(&self) -> Option<u32> {
        self.node().slot
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|id| self.at(id))
    }

    pub fn is_detached(&self) -> bool {
        self.node().parent.is_none()
    }

    /// Nearest containing node (innermost first) satisfying `predicate`
    pub fn ancestor<P>(&self, predicate: P) -> Option<NodeRef<'a>>
    where
        P: Fn(&NodeRef<'a>) -> bool,
    {
        let mut current = self.parent();
        while let Some(node) = current {
            if predicate(&node) {
                return Some(node);
            }
            current = node.parent();
        }
        None
    }

    /// Immediate children in source order
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + Clone + 'a {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |id| NodeRef::new(tree, *id))
    }

    /// Immediate children satisfying `predicate`
    pub fn children_where<P>(&self, predicate: P) -> impl Iterator<Item = NodeRef<'a>> + Clone + 'a
    where
        P: Fn(&NodeRef<'a>) -> bool + Clone + 'a,
    {
        self.children().filter(move |node| predicate(node))
    }

    /// Child at `index`, if any
    pub fn child(&self, index: usize) -> Option<NodeRef<'a>> {
        self.node().children.get(index).map(|id| self.at(*id))
    }

    pub fn child_count(&self) -> usize {
        self.node().children.len()
    }

    /// Pre-order walk of the subtree, excluding this node
    pub fn descendants(&self) -> Descendants<'a> {
        let mut stack: Vec<NodeId> = self.node().children.clone();
        stack.reverse();
        Descendants {
            tree: self.tree,
            stack,
        }
    }

    /// Pre-order walk of the subtree keeping only nodes satisfying `predicate`
    pub fn descendants_where<P>(
        &self,
        predicate: P,
    ) -> impl Iterator<Item = NodeRef<'a>> + Clone + 'a
    where
        P: Fn(&NodeRef<'a>) -> bool + Clone + 'a,
    {
        self.descendants().filter(move |node| predicate(node))
    }

    /// Position of this node in its parent's child sequence
    pub fn index_in_parent(&self) -> Option<usize> {
        let parent = self.node().parent?;
        self.tree_nodes()[parent.index()]
            .children
            .iter()
            .position(|id| *id == self.id)
    }

    pub fn previous_sibling(&self) -> Option<NodeRef<'a>> {
        let index = self.index_in_parent()?;
        let parent = self.parent()?;
        index.checked_sub(1).and_then(|i| parent.child(i))
    }

    pub fn next_sibling(&self) -> Option<NodeRef<'a>> {
        let index = self.index_in_parent()?;
        self.parent()?.child(index + 1)
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", self.kind())
            .finish()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

/// Lazy pre-order iterator; clone it to restart from the same point
#[derive(Clone)]
pub struct Descendants<'a> {
    tree: &'a IrTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let children = &self.tree.nodes()[id.index()].children;
        self.stack.extend(children.iter().rev().copied());
        Some(NodeRef::new(self.tree, id))
    }
}
