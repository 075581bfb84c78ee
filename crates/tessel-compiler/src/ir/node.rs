//! IR node kinds
//!
//! The IR is a tagged tree: modules own functions, functions own a body block,
//! blocks own statements and statements own expressions.

use crate::scope::ReferenceKind;
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node identifier (index into the owning [`IrTree`](super::IrTree))
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Operators whose implementation is chosen at run time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    // Arithmetic
    Plus,
    Minus,
    Times,
    Divide,
    Modulo,

    // Comparison
    Equals,
    NotEquals,
    Less,
    LessOrEquals,
    More,
    MoreOrEquals,

    // Identity and null handling
    Is,
    Isnt,
    OrIfNull,

    // Unary
    Not,
    Negate,
}

impl Operator {
    /// Number of operands the operator takes
    pub fn arity(&self) -> usize {
        match self {
            Operator::Not | Operator::Negate => 1,
            _ => 2,
        }
    }

    /// Check if this is an arithmetic operator
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Plus | Operator::Minus | Operator::Times | Operator::Divide | Operator::Modulo
        )
    }

    /// Check if this is an ordering comparison
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Less | Operator::LessOrEquals | Operator::More | Operator::MoreOrEquals
        )
    }

    /// Check if this operator concatenates text operands
    pub fn is_additive(&self) -> bool {
        matches!(self, Operator::Plus)
    }

    /// Source-level spelling
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus | Operator::Negate => "-",
            Operator::Times => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::Equals => "==",
            Operator::NotEquals => "!=",
            Operator::Less => "<",
            Operator::LessOrEquals => "<=",
            Operator::More => ">",
            Operator::MoreOrEquals => ">=",
            Operator::Is => "is",
            Operator::Isnt => "isnt",
            Operator::OrIfNull => "orIfNull",
            Operator::Not => "not",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Literal constants
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Long(l) => write!(f, "{}L", l),
            Literal::Float(x) => write!(f, "{}F", x),
            Literal::Double(d) => write!(f, "{}", d),
            Literal::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// What a node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Module {
        name: String,
    },
    Function {
        name: String,
        params: Vec<String>,
        closure: bool,
    },
    Block,

    // Statements
    LocalDeclaration {
        name: String,
        kind: ReferenceKind,
    },
    Destructure {
        names: Vec<String>,
        kind: ReferenceKind,
    },
    Assignment {
        name: String,
    },
    Return,
    If,
    While,
    ForEach {
        variable: String,
    },
    ExpressionStatement,

    // Expressions
    Constant(Literal),
    Reference {
        name: String,
    },
    BinaryOperation(Operator),
    UnaryOperation(Operator),
    MethodInvocation {
        name: String,
    },
    FunctionInvocation {
        name: String,
    },
    Closure,
}

impl NodeKind {
    pub fn is_function(&self) -> bool {
        matches!(self, NodeKind::Function { .. })
    }

    pub fn is_block(&self) -> bool {
        matches!(self, NodeKind::Block)
    }

    /// Short label used by the pretty printer and in diagnostics
    pub fn label(&self) -> String {
        match self {
            NodeKind::Module { name } => format!("module {}", name),
            NodeKind::Function {
                name,
                params,
                closure,
            } => {
                let keyword = if *closure { "closure" } else { "function" };
                format!("{} {}({})", keyword, name, params.join(", "))
            }
            NodeKind::Block => "block".to_string(),
            NodeKind::LocalDeclaration { name, kind } => format!("{} {}", kind, name),
            NodeKind::Destructure { names, kind } => {
                format!("{} [{}]", kind, names.join(", "))
            }
            NodeKind::Assignment { name } => format!("assign {}", name),
            NodeKind::Return => "return".to_string(),
            NodeKind::If => "if".to_string(),
            NodeKind::While => "while".to_string(),
            NodeKind::ForEach { variable } => format!("foreach {}", variable),
            NodeKind::ExpressionStatement => "expr".to_string(),
            NodeKind::Constant(literal) => format!("const {}", literal),
            NodeKind::Reference { name } => format!("ref {}", name),
            NodeKind::BinaryOperation(op) => format!("binary {}", op),
            NodeKind::UnaryOperation(op) => format!("unary {}", op),
            NodeKind::MethodInvocation { name } => format!("invoke .{}", name),
            NodeKind::FunctionInvocation { name } => format!("call {}", name),
            NodeKind::Closure => "closure".to_string(),
        }
    }
}

/// A node stored in the arena
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Storage slot assigned by the resolver (references, declarations, assignments)
    pub slot: Option<u32>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            slot: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn child_ids(&self) -> &[NodeId] {
        &self.children
    }
}
