//! # classgen
//!
//! Describe classes, interfaces, enums and records as a tree and render
//! them as JVM class files.
//!
//! The work is split across crates:
//!
//! - `classgen-core`: the type, object and code tree model
//! - `classgen-bytecode`: the class file emitter
//! - this crate: processing rounds, generators, output sinks and build
//!   plugin task metadata
//!
//! ## Example
//!
//! ```
//! use classgen::prelude::*;
//!
//! let def = ObjectDef::record(QualifiedName::new("demo", "Point"))
//!     .add_component(PropertyDef::new("x", TypeDef::INT))
//!     .add_component(PropertyDef::new("y", TypeDef::INT))
//!     .build()
//!     .unwrap();
//!
//! let round = RoundContext::new();
//! let mut sink = MemorySink::new();
//! let generator = BytecodeGenerator::default();
//!
//! generator.generate(&round, &def, &mut sink).unwrap();
//! // Requests for the same name are ignored until the next round
//! assert_eq!(generator.generate(&round, &def, &mut sink).unwrap(), Generated::Skipped);
//! assert!(sink.class_bytes(def.name()).is_some());
//! ```

mod error;
mod generator;
pub mod plugin;
mod round;
mod sink;

pub use classgen_bytecode as bytecode;
pub use classgen_core as model;

pub use error::{ConfigError, GenerationError, Result};
pub use generator::{
    BytecodeGenerator, Generated, GenerationReport, Generator, GeneratorConfig, SourceGenerator,
};
pub use round::RoundContext;
pub use sink::{DirectorySink, GeneratedOutput, MemorySink, OutputSink};

pub mod prelude {
    pub use crate::generator::{
        BytecodeGenerator, Generated, Generator, GeneratorConfig, SourceGenerator,
    };
    pub use crate::round::RoundContext;
    pub use crate::sink::{DirectorySink, GeneratedOutput, MemorySink, OutputSink};
    pub use crate::{ConfigError, GenerationError};
    pub use classgen_bytecode::{ClassWriter, EmittedClass, WriterOptions};
    pub use classgen_core::{
        ClassTypeDef, ExpressionDef, FieldDef, MethodDef, Modifiers, ObjectDef, PropertyDef,
        QualifiedName, StatementDef, TypeDef, VariableDef,
    };
}
