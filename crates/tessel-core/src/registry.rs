//! Class registry
//!
//! Classes, their parent links and the native methods callable on any
//! receiver type. The registry is assembled with a [`ClassRegistryBuilder`]
//! and frozen into an `Arc` before the first call site runs, so method
//! resolution never observes a registry change.

use crate::error::{DispatchError, DispatchResult};
use crate::value::{Object, RuntimeType, Value};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Class identifier (index into the registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Native method body; `args[0]` is the receiver
pub type NativeFn = Arc<dyn Fn(&[Value]) -> DispatchResult<Value> + Send + Sync>;

/// Declared parameter type of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Accepts every value
    Any,
    /// Accepts the type, values widening to it, and subclasses
    Exact(RuntimeType),
}

/// A method callable through a dynamic call site
pub struct Method {
    name: String,
    receiver: RuntimeType,
    params: Vec<ParamType>,
    body: NativeFn,
}

impl Method {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type the method is declared on
    pub fn receiver(&self) -> RuntimeType {
        self.receiver
    }

    /// Parameter types, receiver excluded
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Run the body; `args` holds the receiver followed by the arguments
    pub fn invoke(&self, args: &[Value]) -> DispatchResult<Value> {
        if args.len() != self.params.len() + 1 {
            return Err(DispatchError::ArityMismatch {
                name: self.name.clone(),
                expected: self.params.len() + 1,
                actual: args.len(),
            });
        }
        (self.body)(args)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("receiver", &self.receiver)
            .field("params", &self.params)
            .finish()
    }
}

/// Class definition
#[derive(Debug, Clone)]
pub struct Class {
    pub id: ClassId,
    pub name: Arc<str>,
    pub parent: Option<ClassId>,
}

/// Frozen set of classes and methods
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<Class>,
    by_name: FxHashMap<String, ClassId>,
    methods: FxHashMap<RuntimeType, Vec<Arc<Method>>>,
}

impl ClassRegistry {
    pub fn builder() -> ClassRegistryBuilder {
        ClassRegistryBuilder::default()
    }

    /// Registry without classes or methods; operators still dispatch
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id.0 as usize)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&Class> {
        self.by_name.get(name).and_then(|id| self.class(*id))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Create an instance of a registered class
    pub fn instantiate(&self, id: ClassId, fields: Vec<Value>) -> DispatchResult<Value> {
        let class = self.class(id).ok_or(DispatchError::UnknownClass(id))?;
        Ok(Value::Object(Arc::new(Object::new(
            id,
            class.name.clone(),
            fields,
        ))))
    }

    /// Methods declared directly on a type
    pub fn declared_methods(&self, receiver: RuntimeType) -> &[Arc<Method>] {
        self.methods
            .get(&receiver)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `ty` followed by its superclasses, nearest first
    pub fn lineage(&self, ty: RuntimeType) -> impl Iterator<Item = RuntimeType> + '_ {
        std::iter::successors(Some(ty), move |current| match current {
            RuntimeType::Object(id) => self
                .class(*id)
                .and_then(|c| c.parent)
                .map(RuntimeType::Object),
            _ => None,
        })
    }

    /// Number of subclass steps from `class` up to `ancestor`
    pub fn distance(&self, class: ClassId, ancestor: ClassId) -> Option<usize> {
        self.lineage(RuntimeType::Object(class))
            .position(|ty| ty == RuntimeType::Object(ancestor))
    }

    pub fn is_subclass(&self, class: ClassId, ancestor: ClassId) -> bool {
        self.distance(class, ancestor).is_some()
    }

    /// Whether a value of type `from` can be passed where `to` is expected
    pub fn is_assignable(&self, from: RuntimeType, to: RuntimeType) -> bool {
        if from == to {
            return true;
        }
        match (from, to) {
            (RuntimeType::Object(class), RuntimeType::Object(ancestor)) => {
                self.is_subclass(class, ancestor)
            }
            (RuntimeType::Null, RuntimeType::Str | RuntimeType::Object(_)) => true,
            _ => match (from.numeric_rank(), to.numeric_rank()) {
                (Some(a), Some(b)) => a <= b,
                _ => false,
            },
        }
    }

    pub fn accepts(&self, param: ParamType, argument: RuntimeType) -> bool {
        match param {
            ParamType::Any => true,
            ParamType::Exact(expected) => self.is_assignable(argument, expected),
        }
    }

    /// Diagnostic name of a type, using class names for objects
    pub fn type_name(&self, ty: RuntimeType) -> String {
        match ty {
            RuntimeType::Object(id) => self
                .class(id)
                .map(|c| c.name.to_string())
                .unwrap_or_else(|| ty.to_string()),
            other => other.to_string(),
        }
    }

    /// Human-readable signature, e.g. `speak(int, any)`
    pub fn signature(&self, method: &Method) -> String {
        let params: Vec<String> = method
            .params
            .iter()
            .map(|p| match p {
                ParamType::Any => "any".to_string(),
                ParamType::Exact(ty) => self.type_name(*ty),
            })
            .collect();
        format!("{}({})", method.name, params.join(", "))
    }
}

/// Builder for [`ClassRegistry`]
#[derive(Default)]
pub struct ClassRegistryBuilder {
    registry: ClassRegistry,
}

impl ClassRegistryBuilder {
    /// Register a class
    pub fn class(&mut self, name: &str, parent: Option<ClassId>) -> DispatchResult<ClassId> {
        if let Some(parent) = parent {
            self.registry
                .class(parent)
                .ok_or(DispatchError::UnknownClass(parent))?;
        }
        let id = ClassId(self.registry.classes.len() as u32);
        self.registry.classes.push(Class {
            id,
            name: Arc::from(name),
            parent,
        });
        self.registry.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Register a native method on a class or a primitive type
    ///
    /// A method with the same name and parameter list as one already
    /// declared on `receiver` replaces it.
    pub fn method<F>(
        &mut self,
        receiver: RuntimeType,
        name: &str,
        params: Vec<ParamType>,
        body: F,
    ) -> DispatchResult<&mut Self>
    where
        F: Fn(&[Value]) -> DispatchResult<Value> + Send + Sync + 'static,
    {
        if let RuntimeType::Object(id) = receiver {
            self.registry
                .class(id)
                .ok_or(DispatchError::UnknownClass(id))?;
        }
        let method = Arc::new(Method {
            name: name.to_string(),
            receiver,
            params,
            body: Arc::new(body),
        });
        let declared = self.registry.methods.entry(receiver).or_default();
        declared.retain(|m| !(m.name == method.name && m.params == method.params));
        declared.push(method);
        Ok(self)
    }

    /// Freeze the registry
    pub fn build(self) -> Arc<ClassRegistry> {
        Arc::new(self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> (Arc<ClassRegistry>, ClassId, ClassId, ClassId) {
        let mut builder = ClassRegistry::builder();
        let animal = builder.class("Animal", None).unwrap();
        let dog = builder.class("Dog", Some(animal)).unwrap();
        let rock = builder.class("Rock", None).unwrap();
        (builder.build(), animal, dog, rock)
    }

    #[test]
    fn test_subclass_distance() {
        let (registry, animal, dog, rock) = hierarchy();
        assert_eq!(registry.distance(dog, dog), Some(0));
        assert_eq!(registry.distance(dog, animal), Some(1));
        assert_eq!(registry.distance(animal, dog), None);
        assert!(!registry.is_subclass(rock, animal));
    }

    #[test]
    fn test_assignability() {
        let (registry, animal, dog, _) = hierarchy();
        assert!(registry.is_assignable(RuntimeType::Int, RuntimeType::Double));
        assert!(!registry.is_assignable(RuntimeType::Double, RuntimeType::Int));
        assert!(registry.is_assignable(RuntimeType::Object(dog), RuntimeType::Object(animal)));
        assert!(registry.is_assignable(RuntimeType::Null, RuntimeType::Object(dog)));
        assert!(!registry.is_assignable(RuntimeType::Bool, RuntimeType::Int));
        assert!(registry.accepts(ParamType::Any, RuntimeType::Bool));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut builder = ClassRegistry::builder();
        let result = builder.class("Orphan", Some(ClassId(9)));
        assert_eq!(result, Err(DispatchError::UnknownClass(ClassId(9))));
    }

    #[test]
    fn test_method_redeclaration_replaces() {
        let mut builder = ClassRegistry::builder();
        builder
            .method(RuntimeType::Str, "size", vec![], |_| Ok(Value::Int(1)))
            .unwrap()
            .method(RuntimeType::Str, "size", vec![], |_| Ok(Value::Int(2)))
            .unwrap();
        let registry = builder.build();

        let methods = registry.declared_methods(RuntimeType::Str);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].invoke(&[Value::str("x")]), Ok(Value::Int(2)));
    }

    #[test]
    fn test_instantiate_and_signature() {
        let (registry, _, dog, _) = hierarchy();
        let rex = registry.instantiate(dog, vec![Value::str("rex")]).unwrap();
        assert_eq!(rex.type_name(), "Dog");
        assert_eq!(rex.runtime_type(), RuntimeType::Object(dog));
        assert!(registry.instantiate(ClassId(42), vec![]).is_err());
        assert_eq!(registry.class_by_name("Dog").map(|c| c.id), Some(dog));
    }
}
