//! Round-aware generators.
//!
//! A [`Generator`] renders one [`ObjectDef`] into an artifact. The provided
//! [`Generator::generate`] wraps rendering with the round rules: each
//! qualified name is emitted at most once per round, inner definitions
//! follow their outer definition breadth-first, and a failed definition
//! releases its claim.

use std::collections::VecDeque;

use classgen_bytecode::{ClassWriter, WriterOptions};
use classgen_core::{ObjectDef, ObjectDefBuilder, QualifiedName};

use crate::error::{GenerationError, Result};
use crate::round::RoundContext;
use crate::sink::{GeneratedOutput, OutputSink};

/// Outcome of one [`Generator::generate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    /// Names written, outer definition first.
    Emitted(Vec<QualifiedName>),
    /// Already generated this round.
    Skipped,
}

impl Generated {
    pub fn emitted(&self) -> &[QualifiedName] {
        match self {
            Generated::Emitted(names) => names,
            Generated::Skipped => &[],
        }
    }
}

/// Summary of [`Generator::generate_all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    pub emitted: Vec<QualifiedName>,
    pub skipped: Vec<QualifiedName>,
    pub failures: Vec<GenerationError>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratorConfig {
    pub writer: WriterOptions,
    /// Stop `generate_all` at the first failure.
    pub fail_fast: bool,
}

impl GeneratorConfig {
    pub fn with_writer(mut self, writer: WriterOptions) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

pub trait Generator {
    /// Render a single definition, without its inner definitions.
    fn render(&self, def: &ObjectDef) -> Result<GeneratedOutput>;

    fn fail_fast(&self) -> bool {
        false
    }

    /// Generate `def` and its inner definitions into `sink`.
    fn generate(
        &self,
        round: &RoundContext,
        def: &ObjectDef,
        sink: &mut dyn OutputSink,
    ) -> Result<Generated> {
        if !round.claim(def.name()) {
            return Ok(Generated::Skipped);
        }

        let mut emitted = Vec::new();
        let mut queue = VecDeque::from([def]);
        while let Some(current) = queue.pop_front() {
            let name = current.name();
            let written = self.render(current).and_then(|output| {
                sink.write(name, output)
                    .map_err(|error| GenerationError::output(name.clone(), &error))
            });
            if let Err(error) = written {
                round.release(name);
                tracing::debug!(%name, %error, "generation failed");
                return Err(error);
            }
            tracing::trace!(%name, "definition generated");
            emitted.push(name.clone());

            for inner in current.inner_types() {
                if round.claim(inner.name()) {
                    queue.push_back(inner);
                }
            }
        }
        Ok(Generated::Emitted(emitted))
    }

    /// Generate every definition, collecting failures unless
    /// [`fail_fast`](Generator::fail_fast) is set.
    fn generate_all(
        &self,
        round: &RoundContext,
        defs: &[ObjectDef],
        sink: &mut dyn OutputSink,
    ) -> Result<GenerationReport> {
        let mut report = GenerationReport::default();
        for def in defs {
            match self.generate(round, def, sink) {
                Ok(Generated::Emitted(names)) => report.emitted.extend(names),
                Ok(Generated::Skipped) => report.skipped.push(def.name().clone()),
                Err(error) if self.fail_fast() => return Err(error),
                Err(error) => report.failures.push(error),
            }
        }
        tracing::debug!(
            emitted = report.emitted.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "batch generated"
        );
        Ok(report)
    }

    /// Build `builder` and generate the result. Validation errors are
    /// reported against the builder's name.
    fn generate_built(
        &self,
        round: &RoundContext,
        builder: ObjectDefBuilder,
        sink: &mut dyn OutputSink,
    ) -> Result<Generated> {
        let name = builder.name().clone();
        let def = builder
            .build()
            .map_err(|source| GenerationError::Model { name, source })?;
        self.generate(round, &def, sink)
    }
}

/// Textual renderer over the same definitions.
///
/// This crate ships no source backend; implementors get round handling
/// through the blanket [`Generator`] impl.
pub trait SourceGenerator {
    fn render_source(&self, def: &ObjectDef) -> Result<String>;
}

impl<T: SourceGenerator> Generator for T {
    fn render(&self, def: &ObjectDef) -> Result<GeneratedOutput> {
        self.render_source(def).map(GeneratedOutput::Source)
    }
}

/// Writes class files.
#[derive(Debug, Clone, Default)]
pub struct BytecodeGenerator {
    config: GeneratorConfig,
    writer: ClassWriter,
}

impl BytecodeGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let writer = ClassWriter::new(config.writer.clone());
        Self { config, writer }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl Generator for BytecodeGenerator {
    #[tracing::instrument(level = "debug", skip_all, fields(name = %def.name()))]
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn render(&self, def: &ObjectDef) -> Result<GeneratedOutput> {
        self.writer
            .write(def)
            .map(|class| GeneratedOutput::Class(class.bytes))
            .map_err(|source| GenerationError::Emit {
                name: def.name().clone(),
                source,
            })
    }

    fn fail_fast(&self) -> bool {
        self.config.fail_fast
    }
}
