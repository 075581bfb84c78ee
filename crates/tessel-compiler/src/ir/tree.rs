//! IR arena
//!
//! Every node is owned by the tree and addressed by [`NodeId`]. A parent
//! owns the ordered sequence of its children; a child only records its
//! parent's id, set when it is attached and cleared when it is detached.

use super::navigate::NodeRef;
use super::node::{Node, NodeId, NodeKind};
use crate::error::{CompileError, CompileResult};
use crate::span::Span;

/// Arena holding an IR tree (and any detached subtrees under construction)
#[derive(Debug, Clone, Default)]
pub struct IrTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl IrTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree whose root is a fresh node of `kind`
    pub(crate) fn with_root(kind: NodeKind, span: Span) -> (Self, NodeId) {
        let mut tree = Self::new();
        let root = tree.add_node(kind, span);
        tree.root = Some(root);
        (tree, root)
    }

    /// Create a detached node
    pub fn add_node(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind, span));
        id
    }

    /// Mark a node as the tree root (normally the module)
    pub fn set_root(&mut self, id: NodeId) -> CompileResult<()> {
        let node = self.try_get(id)?;
        if node.parent.is_some() {
            return Err(CompileError::invariant(format!(
                "{} is attached and cannot be the root",
                id
            )));
        }
        self.root = Some(id);
        Ok(())
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Append `child` to the end of `parent`'s child sequence
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> CompileResult<()> {
        self.try_get(parent)?;
        let child_node = self.try_get(child)?;
        if let Some(owner) = child_node.parent {
            return Err(CompileError::invariant(format!(
                "{} is already attached to {}",
                child, owner
            )));
        }
        if parent == child || self.is_ancestor_of(child, parent) {
            return Err(CompileError::invariant(format!(
                "attaching {} under {} would create a cycle",
                child, parent
            )));
        }
        if self.root == Some(child) {
            return Err(CompileError::invariant(format!(
                "the root {} cannot be attached",
                child
            )));
        }

        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
        Ok(())
    }

    /// Remove `child` from its parent; detaching a detached node does nothing
    pub fn detach(&mut self, child: NodeId) -> CompileResult<()> {
        let Some(parent) = self.try_get(child)?.parent else {
            return Ok(());
        };
        self.nodes[parent.index()].children.retain(|c| *c != child);
        self.nodes[child.index()].parent = None;
        Ok(())
    }

    /// Record the storage slot chosen for a node
    pub fn set_slot(&mut self, id: NodeId, slot: u32) -> CompileResult<()> {
        self.try_get(id)?;
        self.nodes[id.index()].slot = Some(slot);
        Ok(())
    }

    /// Name a function node (closures are named by the resolver)
    pub fn set_function_name(&mut self, id: NodeId, new_name: String) -> CompileResult<()> {
        self.try_get(id)?;
        match &mut self.nodes[id.index()].kind {
            NodeKind::Function { name, .. } => {
                *name = new_name;
                Ok(())
            }
            other => Err(CompileError::invariant(format!(
                "'{}' is not a function",
                other.label()
            ))),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Read-only navigation cursor for a node
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.get(id).map(|_| NodeRef::new(self, id))
    }

    /// Cursor on the root node
    pub fn root_node(&self) -> Option<NodeRef<'_>> {
        self.root.and_then(|id| self.node(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn try_get(&self, id: NodeId) -> CompileResult<&Node> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| CompileError::invariant(format!("unknown IR node {}", id)))
    }

    /// Whether `candidate` appears on the parent chain of `node`
    fn is_ancestor_of(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes[node.index()].parent;
        let mut steps = 0;
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                // A longer chain than the arena means the links are corrupt.
                return true;
            }
            current = self.nodes[id.index()].parent;
        }
        false
    }
}
