use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tessel_compiler::{CallKind, CallSiteDescriptor, NodeId, Operator, Span};
use tessel_core::{CallSite, ClassRegistry, DispatchPolicy, ParamType, Runtime, RuntimeType, Value};

fn site(kind: CallKind, arity: usize, runtime: Arc<Runtime>) -> CallSite {
    let descriptor = CallSiteDescriptor {
        id: 0,
        node: NodeId::new(0),
        kind,
        arity,
        span: Span::synthetic(),
    };
    CallSite::new(descriptor, runtime)
}

fn bench_operator_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("operator_plus");
    let signatures: Vec<[Value; 2]> = vec![
        [Value::Int(1), Value::Int(2)],
        [Value::Long(1), Value::Int(2)],
        [Value::Double(1.0), Value::Int(2)],
        [Value::str("a"), Value::Int(2)],
        [Value::Int(1), Value::Long(2)],
        [Value::Float(1.0), Value::Float(2.0)],
        [Value::Int(1), Value::Double(2.0)],
        [Value::Long(1), Value::Long(2)],
    ];

    for (label, kinds, limit) in [("monomorphic", 1, 5), ("polymorphic", 4, 5), ("megamorphic", 8, 2)] {
        let runtime = Arc::new(Runtime::with_policy(
            ClassRegistry::empty(),
            DispatchPolicy::new(limit),
        ));
        let site = site(CallKind::Operator(Operator::Plus), 2, runtime);
        let inputs = &signatures[..kinds];
        for args in inputs {
            site.invoke(args).unwrap();
        }

        group.bench_with_input(BenchmarkId::new(label, kinds), &inputs, |b, inputs| {
            let mut i = 0;
            b.iter(|| {
                let args = &inputs[i % inputs.len()];
                i += 1;
                site.invoke(black_box(args)).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_method_dispatch(c: &mut Criterion) {
    let mut builder = ClassRegistry::builder();
    let shape = builder.class("Shape", None).unwrap();
    let square = builder.class("Square", Some(shape)).unwrap();
    builder
        .method(RuntimeType::Object(shape), "scale", vec![ParamType::Any], |_| Ok(Value::Null))
        .unwrap()
        .method(
            RuntimeType::Object(square),
            "scale",
            vec![ParamType::Exact(RuntimeType::Double)],
            |args| Ok(args[1].clone()),
        )
        .unwrap();
    let registry = builder.build();
    let receiver = registry.instantiate(square, vec![Value::Double(2.0)]).unwrap();

    let runtime = Arc::new(Runtime::new(registry));
    let site = site(CallKind::Method { name: "scale".to_string() }, 2, runtime);
    let args = [receiver, Value::Int(3)];
    site.invoke(&args).unwrap();

    c.bench_function("method_scale_cached", |b| {
        b.iter(|| site.invoke(black_box(&args)).unwrap());
    });
}

criterion_group!(benches, bench_operator_modes, bench_method_dispatch);
criterion_main!(benches);
