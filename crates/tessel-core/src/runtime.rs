//! Dispatch runtime shared by every linked call site

use crate::error::DispatchResult;
use crate::operators::{self, OperatorImpl};
use crate::registry::{ClassRegistry, Method};
use crate::value::{RuntimeType, Value};
use crate::methods;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tessel_compiler::CallKind;

/// Call-site caching policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPolicy {
    /// Signatures a call site caches before going megamorphic
    pub polymorphic_limit: usize,
}

impl DispatchPolicy {
    pub const DEFAULT_POLYMORPHIC_LIMIT: usize = 5;

    /// Policy with the given limit; a limit below 1 is raised to 1
    pub fn new(polymorphic_limit: usize) -> Self {
        Self {
            polymorphic_limit: polymorphic_limit.max(1),
        }
    }

    pub fn with_polymorphic_limit(self, polymorphic_limit: usize) -> Self {
        Self::new(polymorphic_limit)
    }
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_POLYMORPHIC_LIMIT)
    }
}

/// What a call site invokes once resolved
#[derive(Debug, Clone)]
pub enum Target {
    Operator(OperatorImpl),
    Method(Arc<Method>),
}

impl Target {
    #[inline]
    pub fn invoke(&self, args: &[Value]) -> DispatchResult<Value> {
        match self {
            Target::Operator(imp) => imp.apply(args),
            Target::Method(method) => method.invoke(args),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DispatchKey {
    kind: CallKind,
    signature: Box<[RuntimeType]>,
}

/// Runtime-wide signature-keyed targets used by megamorphic call sites
#[derive(Debug, Default)]
pub struct MegamorphicTable {
    targets: DashMap<DispatchKey, Target>,
}

impl MegamorphicTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, kind: &CallKind, signature: &[RuntimeType]) -> Option<Target> {
        let key = DispatchKey {
            kind: kind.clone(),
            signature: signature.into(),
        };
        self.targets.get(&key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, kind: CallKind, signature: &[RuntimeType], target: Target) {
        self.targets.insert(
            DispatchKey {
                kind,
                signature: signature.into(),
            },
            target,
        );
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Frozen registry, caching policy and megamorphic table
#[derive(Debug)]
pub struct Runtime {
    registry: Arc<ClassRegistry>,
    policy: DispatchPolicy,
    megamorphic: MegamorphicTable,
}

impl Runtime {
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self::with_policy(registry, DispatchPolicy::default())
    }

    pub fn with_policy(registry: Arc<ClassRegistry>, policy: DispatchPolicy) -> Self {
        Self {
            registry,
            policy,
            megamorphic: MegamorphicTable::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    pub fn megamorphic(&self) -> &MegamorphicTable {
        &self.megamorphic
    }

    /// Resolve the target for the operand values' runtime types
    ///
    /// Pure with respect to the frozen registry: the same kind and operand
    /// types always yield the same target.
    pub fn resolve(&self, kind: &CallKind, args: &[Value]) -> DispatchResult<Target> {
        let signature = signature_of(args);
        match kind {
            CallKind::Operator(op) => operators::resolve(*op, &signature)
                .map(Target::Operator)
                .ok_or_else(|| operators::unsupported(*op, args)),
            CallKind::Method { name } => {
                methods::resolve(&self.registry, name, &signature).map(Target::Method)
            }
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(ClassRegistry::empty())
    }
}

/// Runtime types of the operands, in order
pub fn signature_of(args: &[Value]) -> Vec<RuntimeType> {
    args.iter().map(Value::runtime_type).collect()
}
