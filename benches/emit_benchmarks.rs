//! Performance benchmarks for class emission.
//!
//! - Shapes: records, enums and method-heavy classes
//! - Batches: many definitions through one round
//!
//! Run with the `profiling` feature to get per-phase scopes from whichever
//! profiler backend is enabled for the `profiling` crate.

use classgen::model::{CompareOp, MathOp, SwitchBranch, SwitchStatement};
use classgen::prelude::*;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn record(index: usize) -> ObjectDef {
    let mut builder = ObjectDef::record(QualifiedName::new("bench", format!("Record{index}")));
    for component in 0..8 {
        let ty = if component % 2 == 0 {
            TypeDef::INT
        } else {
            TypeDef::string()
        };
        builder = builder.add_component(PropertyDef::new(format!("c{component}"), ty));
    }
    builder.with_structural_equality().build().unwrap()
}

fn enumeration(constants: usize) -> ObjectDef {
    let mut builder = ObjectDef::enumeration(QualifiedName::new("bench", "Large"));
    for constant in 0..constants {
        builder = builder.add_enum_constant(format!("C{constant}"));
    }
    builder.build().unwrap()
}

/// A class with `methods` static methods, each a loop around a switch.
fn methods(count: usize) -> ObjectDef {
    let mut builder = ObjectDef::class(QualifiedName::new("bench", "Methods"));
    for index in 0..count {
        let n = VariableDef::parameter("n", TypeDef::INT);
        let i = VariableDef::local("i", TypeDef::INT);
        let total = VariableDef::local("total", TypeDef::LONG);
        let branches = (0..16)
            .map(|label| {
                SwitchBranch::ints(
                    [label * 3],
                    total.assign(total.read().math(MathOp::Add, ExpressionDef::int(label))),
                )
            })
            .collect();
        let switch = SwitchStatement::new(i.read(), branches, None).unwrap();

        builder = builder.add_method(
            MethodDef::builder(format!("m{index}"))
                .add_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
                .returns(TypeDef::LONG)
                .add_parameter("n", TypeDef::INT)
                .add_statement(StatementDef::define("total", ExpressionDef::long(0)))
                .add_statement(StatementDef::define("i", ExpressionDef::int(0)))
                .add_statement(StatementDef::while_loop(
                    i.read().compare(CompareOp::Lt, n.read()),
                    StatementDef::multi([
                        StatementDef::switch(switch),
                        i.assign(i.read().math(MathOp::Add, ExpressionDef::int(1))),
                    ]),
                ))
                .add_statement(total.read().returning())
                .build(),
        );
    }
    builder.build().unwrap()
}

fn shape_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit/shapes");
    let generator = BytecodeGenerator::default();

    let record = record(0);
    group.bench_function("record_8_components", |b| {
        b.iter(|| black_box(generator.render(black_box(&record)).unwrap()))
    });

    for constants in [8, 256] {
        let def = enumeration(constants);
        group.throughput(Throughput::Elements(constants as u64));
        group.bench_with_input(BenchmarkId::new("enum", constants), &def, |b, def| {
            b.iter(|| black_box(generator.render(black_box(def)).unwrap()))
        });
    }

    for count in [10, 100] {
        let def = methods(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("methods", count), &def, |b, def| {
            b.iter(|| black_box(generator.render(black_box(def)).unwrap()))
        });
    }
    group.finish();
}

fn batch_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit/batch");
    let generator = BytecodeGenerator::default();
    let defs: Vec<ObjectDef> = (0..100).map(record).collect();

    group.throughput(Throughput::Elements(defs.len() as u64));
    group.bench_function("records_100", |b| {
        b.iter(|| {
            let round = RoundContext::new();
            let mut sink = MemorySink::new();
            let report = generator.generate_all(&round, &defs, &mut sink).unwrap();
            black_box(report.emitted.len())
        })
    });
    group.finish();
}

criterion_group!(benches, shape_benchmarks, batch_benchmarks);
criterion_main!(benches);
