//! Builder used by parser front-ends to produce an IR tree
//!
//! Statement constructors append to a block; expression constructors return
//! detached nodes that are attached when they are used as an operand.

use super::node::{Literal, NodeId, NodeKind, Operator};
use super::tree::IrTree;
use crate::error::{CompileError, CompileResult};
use crate::scope::ReferenceKind;
use crate::span::Span;

/// Helper for building a module's IR
pub struct IrBuilder {
    tree: IrTree,
    module: NodeId,
}

impl IrBuilder {
    pub fn new(module_name: impl Into<String>) -> Self {
        let (tree, module) = IrTree::with_root(
            NodeKind::Module {
                name: module_name.into(),
            },
            Span::synthetic(),
        );
        Self { tree, module }
    }

    pub fn module(&self) -> NodeId {
        self.module
    }

    pub fn tree(&self) -> &IrTree {
        &self.tree
    }

    /// Add a top-level function with an empty body block
    pub fn function(&mut self, name: &str, params: &[&str], span: Span) -> CompileResult<NodeId> {
        let function = self.function_node(name, params, false, span)?;
        self.tree.attach(self.module, function)?;
        Ok(function)
    }

    /// Create a closure expression wrapping an anonymous function
    pub fn closure(&mut self, params: &[&str], span: Span) -> CompileResult<NodeId> {
        let closure = self.tree.add_node(NodeKind::Closure, span);
        let function = self.function_node("", params, true, span)?;
        self.tree.attach(closure, function)?;
        Ok(closure)
    }

    /// Body block of a function, or of the function wrapped by a closure
    pub fn body(&self, node: NodeId) -> CompileResult<NodeId> {
        let node = self
            .tree
            .node(node)
            .ok_or_else(|| CompileError::invariant(format!("unknown IR node {}", node)))?;
        let function = match node.kind() {
            NodeKind::Closure => node.child(0),
            NodeKind::Function { .. } => Some(node),
            other => {
                return Err(CompileError::invariant(format!(
                    "'{}' has no body",
                    other.label()
                )))
            }
        };
        function
            .and_then(|f| f.child(0))
            .map(|block| block.id())
            .ok_or_else(|| CompileError::invariant("function without a body block"))
    }

    fn function_node(
        &mut self,
        name: &str,
        params: &[&str],
        closure: bool,
        span: Span,
    ) -> CompileResult<NodeId> {
        let function = self.tree.add_node(
            NodeKind::Function {
                name: name.to_string(),
                params: params.iter().map(|p| p.to_string()).collect(),
                closure,
            },
            span,
        );
        let body = self.tree.add_node(NodeKind::Block, span);
        self.tree.attach(function, body)?;
        Ok(function)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub fn declare(
        &mut self,
        block: NodeId,
        name: &str,
        kind: ReferenceKind,
        init: NodeId,
        span: Span,
    ) -> CompileResult<NodeId> {
        let decl = self.tree.add_node(
            NodeKind::LocalDeclaration {
                name: name.to_string(),
                kind,
            },
            span,
        );
        self.tree.attach(decl, init)?;
        self.tree.attach(block, decl)?;
        Ok(decl)
    }

    pub fn destructure(
        &mut self,
        block: NodeId,
        names: &[&str],
        kind: ReferenceKind,
        init: NodeId,
        span: Span,
    ) -> CompileResult<NodeId> {
        let node = self.tree.add_node(
            NodeKind::Destructure {
                names: names.iter().map(|n| n.to_string()).collect(),
                kind,
            },
            span,
        );
        self.tree.attach(node, init)?;
        self.tree.attach(block, node)?;
        Ok(node)
    }

    pub fn assign(
        &mut self,
        block: NodeId,
        name: &str,
        value: NodeId,
        span: Span,
    ) -> CompileResult<NodeId> {
        let node = self.tree.add_node(
            NodeKind::Assignment {
                name: name.to_string(),
            },
            span,
        );
        self.tree.attach(node, value)?;
        self.tree.attach(block, node)?;
        Ok(node)
    }

    pub fn return_value(
        &mut self,
        block: NodeId,
        value: Option<NodeId>,
        span: Span,
    ) -> CompileResult<NodeId> {
        let node = self.tree.add_node(NodeKind::Return, span);
        if let Some(value) = value {
            self.tree.attach(node, value)?;
        }
        self.tree.attach(block, node)?;
        Ok(node)
    }

    /// `if` statement; returns the then-block and, when requested, the else-block
    pub fn if_then(
        &mut self,
        block: NodeId,
        condition: NodeId,
        with_else: bool,
        span: Span,
    ) -> CompileResult<(NodeId, Option<NodeId>)> {
        let node = self.tree.add_node(NodeKind::If, span);
        self.tree.attach(node, condition)?;
        let then_block = self.tree.add_node(NodeKind::Block, span);
        self.tree.attach(node, then_block)?;
        let else_block = if with_else {
            let else_block = self.tree.add_node(NodeKind::Block, span);
            self.tree.attach(node, else_block)?;
            Some(else_block)
        } else {
            None
        };
        self.tree.attach(block, node)?;
        Ok((then_block, else_block))
    }

    /// `while` loop; returns the body block
    pub fn while_loop(&mut self, block: NodeId, condition: NodeId, span: Span) -> CompileResult<NodeId> {
        let node = self.tree.add_node(NodeKind::While, span);
        self.tree.attach(node, condition)?;
        let body = self.tree.add_node(NodeKind::Block, span);
        self.tree.attach(node, body)?;
        self.tree.attach(block, node)?;
        Ok(body)
    }

    /// `foreach` loop; returns the body block
    pub fn for_each(
        &mut self,
        block: NodeId,
        variable: &str,
        iterable: NodeId,
        span: Span,
    ) -> CompileResult<NodeId> {
        let node = self.tree.add_node(
            NodeKind::ForEach {
                variable: variable.to_string(),
            },
            span,
        );
        self.tree.attach(node, iterable)?;
        let body = self.tree.add_node(NodeKind::Block, span);
        self.tree.attach(node, body)?;
        self.tree.attach(block, node)?;
        Ok(body)
    }

    /// Nested `{ ... }` block statement; opens its own scope
    pub fn block(&mut self, block: NodeId, span: Span) -> CompileResult<NodeId> {
        let node = self.tree.add_node(NodeKind::Block, span);
        self.tree.attach(block, node)?;
        Ok(node)
    }

    pub fn expression(&mut self, block: NodeId, expr: NodeId, span: Span) -> CompileResult<NodeId> {
        let node = self.tree.add_node(NodeKind::ExpressionStatement, span);
        self.tree.attach(node, expr)?;
        self.tree.attach(block, node)?;
        Ok(node)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn constant(&mut self, literal: Literal, span: Span) -> NodeId {
        self.tree.add_node(NodeKind::Constant(literal), span)
    }

    pub fn reference(&mut self, name: &str, span: Span) -> NodeId {
        self.tree.add_node(
            NodeKind::Reference {
                name: name.to_string(),
            },
            span,
        )
    }

    pub fn binary(
        &mut self,
        op: Operator,
        left: NodeId,
        right: NodeId,
        span: Span,
    ) -> CompileResult<NodeId> {
        if op.arity() != 2 {
            return Err(CompileError::invariant(format!(
                "'{}' is not a binary operator",
                op
            )));
        }
        let node = self.tree.add_node(NodeKind::BinaryOperation(op), span);
        self.tree.attach(node, left)?;
        self.tree.attach(node, right)?;
        Ok(node)
    }

    pub fn unary(&mut self, op: Operator, operand: NodeId, span: Span) -> CompileResult<NodeId> {
        if op.arity() != 1 {
            return Err(CompileError::invariant(format!(
                "'{}' is not a unary operator",
                op
            )));
        }
        let node = self.tree.add_node(NodeKind::UnaryOperation(op), span);
        self.tree.attach(node, operand)?;
        Ok(node)
    }

    /// Method invocation `receiver.name(args...)`
    pub fn invoke(
        &mut self,
        receiver: NodeId,
        name: &str,
        args: &[NodeId],
        span: Span,
    ) -> CompileResult<NodeId> {
        let node = self.tree.add_node(
            NodeKind::MethodInvocation {
                name: name.to_string(),
            },
            span,
        );
        self.tree.attach(node, receiver)?;
        for arg in args {
            self.tree.attach(node, *arg)?;
        }
        Ok(node)
    }

    /// Call of a module-level function `name(args...)`
    pub fn call(&mut self, name: &str, args: &[NodeId], span: Span) -> CompileResult<NodeId> {
        let node = self.tree.add_node(
            NodeKind::FunctionInvocation {
                name: name.to_string(),
            },
            span,
        );
        for arg in args {
            self.tree.attach(node, *arg)?;
        }
        Ok(node)
    }

    pub fn finish(self) -> IrTree {
        self.tree
    }
}
