//! Intermediate Representation (IR) for Tessel
//!
//! The IR is a tree produced from the parser's syntax tree. Passes read it
//! through [`NodeRef`] and the resolver annotates it with storage slots.
//!
//! # Structure
//!
//! - `IrTree` - arena owning every node
//! - `NodeKind` - module / function / block / statement / expression variants
//! - `NodeRef` - read-only navigation (ancestors, children, siblings, descendants)
//! - `IrBuilder` - construction API for parser front-ends

pub mod builder;
pub mod navigate;
pub mod node;
pub mod pretty;
pub mod tree;

pub use builder::IrBuilder;
pub use navigate::{Descendants, NodeRef};
pub use node::{Literal, Node, NodeId, NodeKind, Operator};
pub use pretty::PrettyPrint;
pub use tree::IrTree;
