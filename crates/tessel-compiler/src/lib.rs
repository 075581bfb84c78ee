//! Tessel Compiler - scope resolution and call-site collection
//!
//! This crate turns the parser's IR tree into a slot-annotated tree and the
//! ordered list of dynamic call sites the emission backend links at run time.

pub mod error;
pub mod ir;
pub mod resolve;
pub mod scope;
pub mod span;
pub mod symbols;

pub use error::{CompileError, CompileResult};
pub use ir::{IrBuilder, IrTree, NodeId, NodeKind, NodeRef, Operator};
pub use resolve::{
    CallKind, CallSiteDescriptor, CapturedReference, FrameLayout, Resolution, Resolver,
    ResolverOptions,
};
pub use scope::{LocalReference, ReferenceKind, ReferenceTables, ScopeError, TableId};
pub use span::Span;
pub use symbols::SymbolGenerator;

/// Resolve a module with default options
pub fn resolve(tree: IrTree) -> CompileResult<Resolution> {
    Resolver::default().resolve(tree)
}
