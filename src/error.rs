use classgen_bytecode::EmitError;
use classgen_core::{ModelError, QualifiedName};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerationError>;

/// Failure to generate one definition.
///
/// Every variant names the definition that failed; sibling definitions in
/// the same round are unaffected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("failed to generate '{name}': {source}")]
    Emit {
        name: QualifiedName,
        #[source]
        source: EmitError,
    },

    #[error("failed to generate '{name}': {source}")]
    Model {
        name: QualifiedName,
        #[source]
        source: ModelError,
    },

    /// The output sink rejected the result.
    #[error("failed to generate '{name}': could not write output: {message}")]
    Output { name: QualifiedName, message: String },

    /// No generator is registered for the requested output.
    #[error("failed to generate '{name}': {message}")]
    Unsupported { name: QualifiedName, message: String },
}

impl GenerationError {
    pub fn output(name: QualifiedName, error: &std::io::Error) -> Self {
        GenerationError::Output {
            name,
            message: error.to_string(),
        }
    }

    /// The definition that failed.
    pub fn name(&self) -> &QualifiedName {
        match self {
            GenerationError::Emit { name, .. }
            | GenerationError::Model { name, .. }
            | GenerationError::Output { name, .. }
            | GenerationError::Unsupported { name, .. } => name,
        }
    }
}

/// Invalid plugin task metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("parameter '{parameter}' cannot be both internal and required")]
    InternalAndRequired { parameter: String },

    #[error("parameter '{parameter}' cannot have a default value and be required")]
    DefaultAndRequired { parameter: String },

    #[error(
        "parameter '{parameter}' has a default value but its type {ty} is not a primitive, enum or string"
    )]
    DefaultOnUnsupportedType { parameter: String, ty: String },

    #[error("expected exactly one method of '{task}' annotated as the task executable but found {found}")]
    ExecutableCount { task: String, found: usize },

    #[error("task executable '{method}' of '{task}' must have no parameters")]
    ExecutableParameters { task: String, method: String },

    #[error("task executable '{method}' of '{task}' must return void")]
    ExecutableReturn { task: String, method: String },
}
