//! Name resolution - assigns storage slots and collects call sites
//!
//! The resolver walks the IR with one reference table per lexical scope:
//!
//! ```text
//! module table (empty root)
//!   └─ function parameters
//!        └─ body block
//!             └─ nested blocks / foreach loop scopes
//! ```
//!
//! Closures start from a flattened copy of the enclosing scope, so their
//! captured environment has its own slot numbering. Every dynamically
//! dispatched operation (operators and method invocations) becomes a
//! [`CallSiteDescriptor`] for the emission backend.

use crate::error::{CompileError, CompileResult};
use crate::ir::{IrTree, NodeId, NodeKind, NodeRef, Operator};
use crate::scope::{LocalReference, ReferenceKind, ReferenceTables, TableId};
use crate::span::Span;
use crate::symbols::SymbolGenerator;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a call site dispatches on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    Operator(Operator),
    Method { name: String },
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::Operator(op) => write!(f, "{}", op),
            CallKind::Method { name } => write!(f, "{}", name),
        }
    }
}

/// A dynamically linked operation, handed to the emission backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSiteDescriptor {
    /// Position in the module's call-site list
    pub id: u32,
    /// IR node the site was created for
    pub node: NodeId,
    pub kind: CallKind,
    /// Operand count, receiver included for method invocations
    pub arity: usize,
    pub span: Span,
}

impl CallSiteDescriptor {
    /// Operator symbol or method name
    pub fn name(&self) -> String {
        self.kind.to_string()
    }
}

/// A binding a closure reads from its enclosing scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedReference {
    pub name: String,
    /// Slot of the captured value inside the closure's frame
    pub slot: u32,
}

/// Storage layout of one function or closure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    pub function: NodeId,
    pub name: String,
    pub closure: bool,
    /// Parameter slots, in declaration order
    pub params: Vec<u32>,
    /// Total number of slots (captured environment, parameters and locals)
    pub slot_count: u32,
    /// Captured bindings actually used by the closure body
    pub captured: Vec<CapturedReference>,
}

/// Resolver configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Names provided by the environment (imports, builtins); they resolve without a slot
    pub globals: Vec<String>,
}

impl ResolverOptions {
    pub fn with_globals<I, S>(globals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            globals: globals.into_iter().map(Into::into).collect(),
        }
    }
}

/// Output of the resolver: the slot-annotated tree and its side tables
#[derive(Debug, Clone)]
pub struct Resolution {
    pub tree: IrTree,
    pub tables: ReferenceTables,
    pub frames: Vec<FrameLayout>,
    pub call_sites: Vec<CallSiteDescriptor>,
    scopes: FxHashMap<NodeId, TableId>,
}

impl Resolution {
    pub fn frame(&self, name: &str) -> Option<&FrameLayout> {
        self.frames.iter().find(|f| f.name == name)
    }

    pub fn frame_for(&self, function: NodeId) -> Option<&FrameLayout> {
        self.frames.iter().find(|f| f.function == function)
    }

    /// Reference table opened for a block, foreach loop or function
    pub fn table_for(&self, node: NodeId) -> Option<TableId> {
        self.scopes.get(&node).copied()
    }

    /// Bindings declared directly in a scope node; sizes its local storage
    pub fn block_locals(&self, node: NodeId) -> &[LocalReference] {
        match self.table_for(node) {
            Some(table) => self.tables.owned_references(table),
            None => &[],
        }
    }
}

/// Per-function state while walking its body
struct Frame {
    function: NodeId,
    name: String,
    closure: bool,
    next_slot: u32,
    params: Vec<u32>,
    /// Flattened copy of the enclosing scope, for closures
    environment: Option<TableId>,
    captured: Vec<CapturedReference>,
}

impl Frame {
    fn allocate(&mut self) -> u32 {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }
}

/// Name resolver for one compilation unit
pub struct Resolver {
    tables: ReferenceTables,
    symbols: SymbolGenerator,
    globals: FxHashSet<String>,
    frames: Vec<Frame>,
    layouts: Vec<FrameLayout>,
    call_sites: Vec<CallSiteDescriptor>,
    scopes: FxHashMap<NodeId, TableId>,
    slots: Vec<(NodeId, u32)>,
    names: Vec<(NodeId, String)>,
}

impl Resolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self {
            tables: ReferenceTables::new(),
            symbols: SymbolGenerator::new(),
            globals: options.globals.into_iter().collect(),
            frames: Vec::new(),
            layouts: Vec::new(),
            call_sites: Vec::new(),
            scopes: FxHashMap::default(),
            slots: Vec::new(),
            names: Vec::new(),
        }
    }

    /// Resolve a module tree
    ///
    /// Aborts on the first unresolved reference or invalid assignment.
    pub fn resolve(mut self, mut tree: IrTree) -> CompileResult<Resolution> {
        let root = tree
            .root_node()
            .ok_or_else(|| CompileError::invariant("IR tree has no root"))?;
        let NodeKind::Module { name } = root.kind() else {
            return Err(CompileError::invariant(format!(
                "IR root is '{}', expected a module",
                root.kind().label()
            )));
        };
        log::debug!("resolving module {}", name);

        let module_table = self.tables.root();
        self.scopes.insert(root.id(), module_table);
        for function in root.children() {
            if let NodeKind::Function { name, .. } = function.kind() {
                self.globals.insert(name.clone());
            }
        }

        self.symbols.enter(name.clone());
        for function in root.children() {
            if !function.kind().is_function() {
                return Err(CompileError::invariant(format!(
                    "unexpected '{}' at module level",
                    function.kind().label()
                )));
            }
            self.resolve_function(function, module_table)?;
        }
        self.symbols.exit();

        for (node, slot) in self.slots {
            tree.set_slot(node, slot)?;
        }
        for (node, name) in self.names {
            tree.set_function_name(node, name)?;
        }

        log::debug!(
            "resolved {} functions, {} call sites, {} synthetic names",
            self.layouts.len(),
            self.call_sites.len(),
            self.symbols.count()
        );

        Ok(Resolution {
            tree,
            tables: self.tables,
            frames: self.layouts,
            call_sites: self.call_sites,
            scopes: self.scopes,
        })
    }

    fn frame(&mut self) -> CompileResult<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| CompileError::invariant("statement outside of a function"))
    }

    /// Declare `reference` in `table` under a fresh slot of the current frame
    fn declare(&mut self, table: TableId, name: &str, kind: ReferenceKind) -> CompileResult<u32> {
        let slot = self.frame()?.allocate();
        self.tables
            .at_mut(table)?
            .add(LocalReference::new(name, kind).with_index(slot))?;
        log::trace!("{} {} -> slot {}", kind, name, slot);
        Ok(slot)
    }

    fn resolve_function(&mut self, function: NodeRef<'_>, outer: TableId) -> CompileResult<Vec<String>> {
        let NodeKind::Function {
            name,
            params,
            closure,
        } = function.kind()
        else {
            return Err(CompileError::invariant("expected a function node"));
        };

        let name = if *closure {
            let synthetic = self.symbols.next_with("closure");
            self.names.push((function.id(), synthetic.clone()));
            synthetic
        } else {
            name.clone()
        };
        log::debug!("resolving {} {}", if *closure { "closure" } else { "function" }, name);

        let (environment, first_slot) = if *closure {
            let copy = self.tables.flat_deep_copy(outer, false)?;
            let names: Vec<String> = self
                .tables
                .owned_symbols(copy)
                .into_iter()
                .map(str::to_string)
                .collect();
            for name in &names {
                if let Some(reference) = self.tables.get_owned_mut(copy, name) {
                    reference.set_captured(false);
                }
            }
            let size = names.len() as u32;
            (Some(copy), size)
        } else {
            (None, 0)
        };
        let param_table = self.tables.fork(environment.unwrap_or(outer))?;
        self.scopes.insert(function.id(), param_table);

        self.frames.push(Frame {
            function: function.id(),
            name: name.clone(),
            closure: *closure,
            next_slot: first_slot,
            params: Vec::new(),
            environment,
            captured: Vec::new(),
        });
        self.symbols.enter(name);

        for param in params {
            let slot = self.declare(param_table, param, ReferenceKind::Constant)?;
            self.frame()?.params.push(slot);
        }
        let body = function
            .child(0)
            .filter(|b| b.kind().is_block())
            .ok_or_else(|| CompileError::invariant("function without a body block"))?;
        self.resolve_block(body, param_table)?;

        self.symbols.exit();
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| CompileError::invariant("frame stack underflow"))?;
        let captured = frame.captured.iter().map(|c| c.name.clone()).collect();
        self.layouts.push(FrameLayout {
            function: frame.function,
            name: frame.name,
            closure: frame.closure,
            params: frame.params,
            slot_count: frame.next_slot,
            captured: frame.captured,
        });
        Ok(captured)
    }

    fn resolve_block(&mut self, block: NodeRef<'_>, parent: TableId) -> CompileResult<()> {
        let table = self.tables.fork(parent)?;
        self.scopes.insert(block.id(), table);
        for statement in block.children() {
            self.resolve_statement(statement, table)?;
        }
        Ok(())
    }

    fn resolve_statement(&mut self, statement: NodeRef<'_>, table: TableId) -> CompileResult<()> {
        match statement.kind() {
            NodeKind::LocalDeclaration { name, kind } => {
                // The initializer sees the scope as it was before the declaration.
                self.resolve_children(statement, table)?;
                let slot = self.declare(table, name, *kind)?;
                self.slots.push((statement.id(), slot));
            }
            NodeKind::Destructure { names, kind } => {
                self.resolve_children(statement, table)?;
                let temp = self.symbols.next_with("destruct");
                let slot = self.declare(table, &temp, ReferenceKind::Constant)?;
                self.slots.push((statement.id(), slot));
                for name in names {
                    self.declare(table, name, *kind)?;
                }
            }
            NodeKind::Assignment { name } => {
                self.resolve_children(statement, table)?;
                let reference = self.tables.get(table, name).cloned();
                let environment = self.frame()?.environment;
                let captured =
                    environment.is_some() && environment == self.tables.owner_of(table, name);
                match reference {
                    Some(reference) if reference.is_constant() => {
                        return Err(CompileError::AssignmentToConstant {
                            name: name.clone(),
                            span: statement.span(),
                        })
                    }
                    Some(_) if captured => {
                        return Err(CompileError::AssignmentToCaptured {
                            name: name.clone(),
                            span: statement.span(),
                        })
                    }
                    Some(_) => {
                        let slot = self.use_reference(name, table)?;
                        if let Some(slot) = slot {
                            self.slots.push((statement.id(), slot));
                        }
                    }
                    None => {
                        return Err(CompileError::UnresolvedReference {
                            name: name.clone(),
                            span: statement.span(),
                        })
                    }
                }
            }
            NodeKind::ForEach { variable } => {
                let iterable = statement
                    .child(0)
                    .ok_or_else(|| CompileError::invariant("foreach without an iterable"))?;
                self.resolve_expression(iterable, table)?;

                let loop_table = self.tables.fork(table)?;
                self.scopes.insert(statement.id(), loop_table);
                let iterator = self.symbols.next_with("foreach");
                self.declare(loop_table, &iterator, ReferenceKind::Constant)?;
                let slot = self.declare(loop_table, variable, ReferenceKind::Variable)?;
                self.slots.push((statement.id(), slot));

                let body = statement
                    .child(1)
                    .ok_or_else(|| CompileError::invariant("foreach without a body"))?;
                self.resolve_block(body, loop_table)?;
            }
            NodeKind::Return
            | NodeKind::If
            | NodeKind::While
            | NodeKind::ExpressionStatement => self.resolve_children(statement, table)?,
            NodeKind::Block => self.resolve_block(statement, table)?,
            other => {
                return Err(CompileError::invariant(format!(
                    "'{}' is not a statement",
                    other.label()
                )))
            }
        }
        Ok(())
    }

    /// Resolve operands, conditions and nested blocks in source order
    fn resolve_children(&mut self, node: NodeRef<'_>, table: TableId) -> CompileResult<()> {
        for child in node.children() {
            if child.kind().is_block() {
                self.resolve_block(child, table)?;
            } else {
                self.resolve_expression(child, table)?;
            }
        }
        Ok(())
    }

    fn resolve_expression(&mut self, expr: NodeRef<'_>, table: TableId) -> CompileResult<()> {
        match expr.kind() {
            NodeKind::Constant(_) => {}
            NodeKind::Reference { name } => match self.use_reference(name, table)? {
                Some(slot) => self.slots.push((expr.id(), slot)),
                None if self.globals.contains(name) => {}
                None => {
                    return Err(CompileError::UnresolvedReference {
                        name: name.clone(),
                        span: expr.span(),
                    })
                }
            },
            NodeKind::BinaryOperation(op) | NodeKind::UnaryOperation(op) => {
                self.record_call_site(expr, CallKind::Operator(*op));
                self.resolve_children(expr, table)?;
            }
            NodeKind::MethodInvocation { name } => {
                self.record_call_site(expr, CallKind::Method { name: name.clone() });
                self.resolve_children(expr, table)?;
            }
            NodeKind::FunctionInvocation { name } => {
                // A local binding shadows a module function: it holds a closure.
                if let Some(slot) = self.use_reference(name, table)? {
                    self.slots.push((expr.id(), slot));
                }
                self.resolve_children(expr, table)?;
            }
            NodeKind::Closure => {
                let function = expr
                    .child(0)
                    .ok_or_else(|| CompileError::invariant("closure without a function"))?;
                let captured = self.resolve_function(function, table)?;
                // Nested captures must flow through the enclosing closure as well.
                for name in captured {
                    self.use_reference(&name, table)?;
                }
            }
            other => {
                return Err(CompileError::invariant(format!(
                    "'{}' is not an expression",
                    other.label()
                )))
            }
        }
        Ok(())
    }

    /// Slot of a visible binding, marking it captured when it comes from a closure environment
    fn use_reference(&mut self, name: &str, table: TableId) -> CompileResult<Option<u32>> {
        let Some(owner) = self.tables.owner_of(table, name) else {
            return Ok(None);
        };
        let frame = self.frame()?;
        if frame.environment == Some(owner) {
            let reference = self
                .tables
                .get_owned_mut(owner, name)
                .ok_or_else(|| CompileError::invariant(format!("lost binding '{}'", name)))?;
            let slot = reference.index();
            if !reference.is_captured() {
                reference.set_captured(true);
                if let Some(slot) = slot {
                    self.frame()?.captured.push(CapturedReference {
                        name: name.to_string(),
                        slot,
                    });
                }
            }
            return Ok(slot);
        }
        Ok(self.tables.get(table, name).and_then(|r| r.index()))
    }

    fn record_call_site(&mut self, node: NodeRef<'_>, kind: CallKind) {
        let descriptor = CallSiteDescriptor {
            id: self.call_sites.len() as u32,
            node: node.id(),
            kind,
            arity: node.child_count(),
            span: node.span(),
        };
        log::trace!("call site #{} '{}' at {}", descriptor.id, descriptor.kind, descriptor.span);
        self.call_sites.push(descriptor);
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(ResolverOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrBuilder, Literal};

    fn at(line: u32, column: u32) -> Span {
        Span::new(0, 0, line, column)
    }

    #[test]
    fn test_params_and_locals_get_sequential_slots() {
        let mut b = IrBuilder::new("m");
        let f = b.function("f", &["x", "y"], at(1, 1)).unwrap();
        let body = b.body(f).unwrap();
        let x = b.reference("x", at(2, 9));
        let decl = b.declare(body, "z", ReferenceKind::Variable, x, at(2, 1)).unwrap();

        let resolution = Resolver::default().resolve(b.finish()).unwrap();
        let frame = resolution.frame("f").unwrap();
        assert_eq!(frame.params, vec![0, 1]);
        assert_eq!(frame.slot_count, 3);
        assert_eq!(resolution.tree.get(decl).unwrap().slot, Some(2));
        assert_eq!(resolution.tree.get(x).unwrap().slot, Some(0));
        assert_eq!(resolution.block_locals(body).len(), 1);
    }

    #[test]
    fn test_unresolved_reference_carries_span() {
        let mut b = IrBuilder::new("m");
        let f = b.function("f", &[], at(1, 1)).unwrap();
        let body = b.body(f).unwrap();
        let missing = b.reference("ghost", at(3, 7));
        b.expression(body, missing, at(3, 7)).unwrap();

        let err = Resolver::default().resolve(b.finish()).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnresolvedReference {
                name: "ghost".to_string(),
                span: at(3, 7),
            }
        );
        assert_eq!(err.span(), Some(at(3, 7)));
    }

    #[test]
    fn test_assignment_to_constant() {
        let mut b = IrBuilder::new("m");
        let f = b.function("f", &[], at(1, 1)).unwrap();
        let body = b.body(f).unwrap();
        let one = b.constant(Literal::Int(1), at(2, 9));
        b.declare(body, "a", ReferenceKind::Constant, one, at(2, 1)).unwrap();
        let two = b.constant(Literal::Int(2), at(3, 5));
        b.assign(body, "a", two, at(3, 1)).unwrap();

        let err = Resolver::default().resolve(b.finish()).unwrap_err();
        assert!(matches!(err, CompileError::AssignmentToConstant { ref name, .. } if name == "a"));
    }

    #[test]
    fn test_globals_resolve_without_slot() {
        let mut b = IrBuilder::new("m");
        let f = b.function("f", &[], at(1, 1)).unwrap();
        let body = b.body(f).unwrap();
        let println = b.reference("println", at(2, 1));
        b.expression(body, println, at(2, 1)).unwrap();
        let g = b.reference("f", at(3, 1));
        b.expression(body, g, at(3, 1)).unwrap();

        let resolution = Resolver::new(ResolverOptions::with_globals(["println"]))
            .resolve(b.finish())
            .unwrap();
        assert_eq!(resolution.tree.get(println).unwrap().slot, None);
        assert_eq!(resolution.tree.get(g).unwrap().slot, None);
    }
}
