//! Method and overload resolution
//!
//! Candidates are the methods of the requested name and arity visible on
//! the receiver's type, walking up the class chain; a subclass method with
//! the same parameter list hides the inherited one. Among the applicable
//! candidates the most specific wins, i.e. the one whose every parameter is
//! assignable to the corresponding parameter of each other candidate.

use crate::error::{DispatchError, DispatchResult};
use crate::registry::{ClassRegistry, Method, ParamType};
use crate::value::RuntimeType;
use std::sync::Arc;

/// Resolve `name` for a receiver and argument types (`signature[0]` is the receiver)
pub fn resolve(
    registry: &ClassRegistry,
    name: &str,
    signature: &[RuntimeType],
) -> DispatchResult<Arc<Method>> {
    let Some((receiver, args)) = signature.split_first() else {
        return Err(DispatchError::ArityMismatch {
            name: name.to_string(),
            expected: 1,
            actual: 0,
        });
    };

    let visible = candidates(registry, *receiver, name, args.len());
    let applicable: Vec<&Arc<Method>> = visible
        .into_iter()
        .filter(|m| {
            m.params()
                .iter()
                .zip(args)
                .all(|(param, arg)| registry.accepts(*param, *arg))
        })
        .collect();

    if applicable.is_empty() {
        return Err(DispatchError::NoSuchMethod {
            name: name.to_string(),
            receiver: registry.type_name(*receiver),
            arity: args.len(),
        });
    }

    let best: Vec<&&Arc<Method>> = applicable
        .iter()
        .filter(|c| applicable.iter().all(|o| more_specific(registry, c, o)))
        .collect();

    match best.as_slice() {
        [winner] => Ok(Arc::clone(winner)),
        _ => Err(DispatchError::AmbiguousMethod {
            name: name.to_string(),
            receiver: registry.type_name(*receiver),
            candidates: applicable.iter().map(|m| registry.signature(m)).collect(),
        }),
    }
}

/// Methods named `name` with `arity` parameters, nearest declaration first
fn candidates<'r>(
    registry: &'r ClassRegistry,
    receiver: RuntimeType,
    name: &str,
    arity: usize,
) -> Vec<&'r Arc<Method>> {
    let mut visible: Vec<&Arc<Method>> = Vec::new();
    for ty in registry.lineage(receiver) {
        for method in registry.declared_methods(ty) {
            if method.name() != name || method.arity() != arity {
                continue;
            }
            // overridden further down the chain
            if visible.iter().any(|m| m.params() == method.params()) {
                continue;
            }
            visible.push(method);
        }
    }
    visible
}

fn more_specific(registry: &ClassRegistry, candidate: &Method, other: &Method) -> bool {
    candidate
        .params()
        .iter()
        .zip(other.params())
        .all(|(a, b)| match (a, b) {
            (_, ParamType::Any) => true,
            (ParamType::Any, ParamType::Exact(_)) => false,
            (ParamType::Exact(a), ParamType::Exact(b)) => registry.is_assignable(*a, *b),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn tagged(tag: &'static str) -> impl Fn(&[Value]) -> DispatchResult<Value> + Send + Sync {
        move |_| Ok(Value::str(tag))
    }

    #[test]
    fn test_exact_match_beats_widening() {
        let mut builder = ClassRegistry::builder();
        builder
            .method(RuntimeType::Str, "pad", vec![ParamType::Exact(RuntimeType::Double)], tagged("double"))
            .unwrap()
            .method(RuntimeType::Str, "pad", vec![ParamType::Exact(RuntimeType::Int)], tagged("int"))
            .unwrap()
            .method(RuntimeType::Str, "pad", vec![ParamType::Any], tagged("any"))
            .unwrap();
        let registry = builder.build();

        let int = resolve(&registry, "pad", &[RuntimeType::Str, RuntimeType::Int]).unwrap();
        assert_eq!(int.invoke(&[Value::str(""), Value::Int(1)]), Ok(Value::str("int")));
        let long = resolve(&registry, "pad", &[RuntimeType::Str, RuntimeType::Long]).unwrap();
        assert_eq!(long.invoke(&[Value::str(""), Value::Long(1)]), Ok(Value::str("double")));
        let text = resolve(&registry, "pad", &[RuntimeType::Str, RuntimeType::Str]).unwrap();
        assert_eq!(text.invoke(&[Value::str(""), Value::str("")]), Ok(Value::str("any")));
    }

    #[test]
    fn test_override_hides_inherited_method() {
        let mut builder = ClassRegistry::builder();
        let animal = builder.class("Animal", None).unwrap();
        let dog = builder.class("Dog", Some(animal)).unwrap();
        builder
            .method(RuntimeType::Object(animal), "speak", vec![], tagged("..."))
            .unwrap()
            .method(RuntimeType::Object(dog), "speak", vec![], tagged("woof"))
            .unwrap();
        let registry = builder.build();

        let speak = resolve(&registry, "speak", &[RuntimeType::Object(dog)]).unwrap();
        assert_eq!(speak.receiver(), RuntimeType::Object(dog));
        let speak = resolve(&registry, "speak", &[RuntimeType::Object(animal)]).unwrap();
        assert_eq!(speak.receiver(), RuntimeType::Object(animal));
    }

    #[test]
    fn test_ambiguous_overloads() {
        let mut builder = ClassRegistry::builder();
        builder
            .method(
                RuntimeType::Str,
                "pick",
                vec![ParamType::Exact(RuntimeType::Int), ParamType::Any],
                tagged("left"),
            )
            .unwrap()
            .method(
                RuntimeType::Str,
                "pick",
                vec![ParamType::Any, ParamType::Exact(RuntimeType::Int)],
                tagged("right"),
            )
            .unwrap();
        let registry = builder.build();

        let err = resolve(&registry, "pick", &[RuntimeType::Str, RuntimeType::Int, RuntimeType::Int])
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::AmbiguousMethod {
                name: "pick".to_string(),
                receiver: "string".to_string(),
                candidates: vec!["pick(int, any)".to_string(), "pick(any, int)".to_string()],
            }
        );
        assert!(resolve(&registry, "pick", &[RuntimeType::Str, RuntimeType::Int, RuntimeType::Bool]).is_ok());
    }

    #[test]
    fn test_no_such_method() {
        let registry = ClassRegistry::empty();
        let err = resolve(&registry, "size", &[RuntimeType::Str, RuntimeType::Int]).unwrap_err();
        assert_eq!(
            err,
            DispatchError::NoSuchMethod {
                name: "size".to_string(),
                receiver: "string".to_string(),
                arity: 1,
            }
        );
    }
}
