use std::sync::Once;

use classgen::prelude::*;
use classgen_vm::Vm;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a subscriber once when `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING.call_once(|| {
        if std::env::var_os("RUST_LOG").is_some() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        }
    });
}

/// Generate `defs` (and their inner types) and load every class.
pub fn load_with(options: WriterOptions, defs: &[ObjectDef]) -> Vm {
    init_tracing();
    let generator = BytecodeGenerator::new(GeneratorConfig::default().with_writer(options));
    let round = RoundContext::new();
    let mut sink = MemorySink::new();
    let report = generator.generate_all(&round, defs, &mut sink).unwrap();
    assert!(report.is_success(), "generation failed: {:?}", report.failures);

    let mut vm = Vm::new();
    for (_, output) in sink.iter() {
        match output {
            GeneratedOutput::Class(bytes) => {
                vm.load(bytes).unwrap();
            }
            GeneratedOutput::Source(_) => unreachable!("bytecode generator wrote source"),
        }
    }
    vm
}

pub fn load(defs: &[ObjectDef]) -> Vm {
    load_with(WriterOptions::default(), defs)
}

pub fn name(simple: &str) -> QualifiedName {
    QualifiedName::new("demo", simple)
}
