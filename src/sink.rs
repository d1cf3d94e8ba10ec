//! Output sinks.
//!
//! Generators hand finished artifacts to an [`OutputSink`] keyed by the
//! qualified name of the definition. Binary and source artifacts go through
//! the same interface.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use classgen_core::QualifiedName;

/// One generated artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedOutput {
    /// Class file bytes.
    Class(Vec<u8>),
    /// Textual source.
    Source(String),
}

impl GeneratedOutput {
    /// File extension of the artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            GeneratedOutput::Class(_) => "class",
            GeneratedOutput::Source(_) => "java",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            GeneratedOutput::Class(bytes) => bytes,
            GeneratedOutput::Source(text) => text.as_bytes(),
        }
    }
}

/// Destination for generated artifacts.
pub trait OutputSink {
    fn write(&mut self, name: &QualifiedName, output: GeneratedOutput) -> io::Result<()>;
}

/// Keeps artifacts in memory, ordered by qualified name.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    outputs: BTreeMap<QualifiedName, GeneratedOutput>,
    writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &QualifiedName) -> Option<&GeneratedOutput> {
        self.outputs.get(name)
    }

    /// Class bytes written for `name`, if any.
    pub fn class_bytes(&self, name: &QualifiedName) -> Option<&[u8]> {
        match self.outputs.get(name)? {
            GeneratedOutput::Class(bytes) => Some(bytes),
            GeneratedOutput::Source(_) => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &QualifiedName> {
        self.outputs.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedName, &GeneratedOutput)> {
        self.outputs.iter()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Number of writes received, counting overwrites.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn into_outputs(self) -> BTreeMap<QualifiedName, GeneratedOutput> {
        self.outputs
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, name: &QualifiedName, output: GeneratedOutput) -> io::Result<()> {
        self.writes += 1;
        self.outputs.insert(name.clone(), output);
        Ok(())
    }
}

/// Writes artifacts below a root directory as `a/b/C.class` or
/// `a/b/C.java`, creating package directories as needed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an artifact for `name` is written to.
    pub fn path_for(&self, name: &QualifiedName, output: &GeneratedOutput) -> PathBuf {
        self.root.join(name.file_path(output.extension()))
    }
}

impl OutputSink for DirectorySink {
    fn write(&mut self, name: &QualifiedName, output: GeneratedOutput) -> io::Result<()> {
        let path = self.path_for(name, &output);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, output.as_bytes())?;
        tracing::trace!(path = %path.display(), "artifact written");
        Ok(())
    }
}
