//! Tessel Core Runtime
//!
//! This crate provides the dynamic dispatch runtime for compiled Tessel code:
//! - Runtime values and their dynamic types
//! - Class registry with native methods
//! - Operator and overload resolution
//! - Per-call-site polymorphic inline caches with a shared megamorphic table
//! - The linker that wires compiler call-site descriptors to call sites

#![warn(rust_2018_idioms)]

pub mod call_site;
pub mod error;
pub mod linker;
pub mod methods;
pub mod operators;
pub mod registry;
pub mod runtime;
pub mod value;

pub use call_site::{CacheMode, CallSite, CallSiteStats};
pub use error::{DispatchError, DispatchResult};
pub use linker::Linker;
pub use operators::{NumericKind, OperatorImpl};
pub use registry::{Class, ClassId, ClassRegistry, ClassRegistryBuilder, Method, NativeFn, ParamType};
pub use runtime::{DispatchPolicy, MegamorphicTable, Runtime, Target};
pub use value::{Object, RuntimeType, Value};
