use std::fs;
use std::thread;

use classgen::prelude::*;
use classgen_vm::{Value, Vm};

use crate::common::{init_tracing, name};

fn answer() -> ObjectDef {
    ObjectDef::class(name("Answer"))
        .add_method(
            MethodDef::builder("get")
                .add_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
                .returns(TypeDef::INT)
                .add_statement(ExpressionDef::int(42).returning())
                .build(),
        )
        .build()
        .unwrap()
}

#[test]
fn definitions_are_emitted_once_per_round() {
    init_tracing();
    let generator = BytecodeGenerator::default();
    let round = RoundContext::new();
    let mut sink = MemorySink::new();
    let def = answer();

    let first = generator.generate(&round, &def, &mut sink).unwrap();
    assert_eq!(first.emitted(), [name("Answer")]);
    assert_eq!(
        generator.generate(&round, &def, &mut sink).unwrap(),
        Generated::Skipped
    );
    assert_eq!(sink.write_count(), 1);

    round.start_round();
    let again = generator.generate(&round, &def, &mut sink).unwrap();
    assert_eq!(again.emitted(), [name("Answer")]);
    assert_eq!(sink.write_count(), 2);
    assert_eq!(sink.len(), 1);
}

#[test]
fn concurrent_generators_share_one_round() {
    init_tracing();
    let round = RoundContext::new();
    let def = answer();

    let outcomes: Vec<(Generated, usize)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let mut sink = MemorySink::new();
                    let generated = BytecodeGenerator::default()
                        .generate(&round, &def, &mut sink)
                        .unwrap();
                    (generated, sink.write_count())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let emitted: Vec<_> = outcomes
        .iter()
        .filter(|(generated, _)| matches!(generated, Generated::Emitted(_)))
        .collect();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].1, 1);
    assert_eq!(outcomes.iter().map(|(_, writes)| writes).sum::<usize>(), 1);
}

#[test]
fn directory_output_loads_into_vm() {
    init_tracing();
    let root = std::env::temp_dir().join(format!("classgen-rounds-{}", std::process::id()));
    let outer = name("Holder");
    let inner = outer.nested("Value");
    let def = ObjectDef::class(outer.clone())
        .add_inner_type(
            ObjectDef::class(inner.clone())
                .add_method(
                    MethodDef::builder("get")
                        .add_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
                        .returns(TypeDef::LONG)
                        .add_statement(ExpressionDef::long(7).returning())
                        .build(),
                )
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let mut sink = DirectorySink::new(&root);
    let report = BytecodeGenerator::default()
        .generate_all(&RoundContext::new(), &[def], &mut sink)
        .unwrap();
    assert_eq!(report.emitted, [outer.clone(), inner.clone()]);

    let mut vm = Vm::new();
    for name in [&outer, &inner] {
        let path = sink.path_for(name, &GeneratedOutput::Class(Vec::new()));
        assert!(path.ends_with(name.file_path("class")));
        let loaded = vm.load(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(loaded, name.to_string());
    }
    assert_eq!(
        vm.invoke_static(&inner.to_string(), "get", "()J", &[]),
        Ok(Some(Value::Long(7)))
    );

    fs::remove_dir_all(&root).unwrap();
}
