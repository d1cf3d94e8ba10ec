//! Validation errors raised while building the model.
//!
//! Every builder in this crate validates eagerly: a malformed definition is
//! rejected by `build()` and never reaches an emitter.

use thiserror::Error;

/// Errors produced by Type Model, Object Model and Code Tree builders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A qualified name could not be parsed.
    #[error("invalid qualified name '{name}'")]
    InvalidName { name: String },

    /// Two fields (or properties) with the same name on one definition.
    #[error("'{owner}' declares field '{name}' more than once")]
    DuplicateField { owner: String, name: String },

    /// Two methods with the same name and parameter types.
    #[error("'{owner}' declares method {signature} more than once")]
    DuplicateMethod { owner: String, signature: String },

    /// An enum without constants.
    #[error("enum '{owner}' must declare at least one constant")]
    EmptyEnum { owner: String },

    /// The same enum constant declared twice.
    #[error("enum '{owner}' declares constant '{name}' more than once")]
    DuplicateEnumConstant { owner: String, name: String },

    /// The same record component declared twice.
    #[error("record '{owner}' declares component '{name}' more than once")]
    DuplicateComponent { owner: String, name: String },

    /// No declared enum constructor accepts a constant's arguments.
    #[error("enum '{owner}' has no constructor matching constant '{constant}'")]
    EnumConstructorNotFound { owner: String, constant: String },

    /// A builder operation that does not apply to the definition kind.
    #[error("'{owner}' is {kind}; {operation} is not allowed")]
    WrongKind {
        owner: String,
        kind: &'static str,
        operation: &'static str,
    },

    /// A class method without a body that is not declared abstract.
    #[error("method '{method}' of '{owner}' has no body and is not abstract")]
    MissingBody { owner: String, method: String },

    /// Interface fields must be static.
    #[error("interface '{owner}' declares non-static field '{field}'")]
    InterfaceFieldNotStatic { owner: String, field: String },

    /// A switch label appears in more than one branch.
    #[error("switch label {label} appears in more than one branch")]
    OverlappingSwitchLabel { label: String },

    /// A switch mixes integer and string labels.
    #[error("switch mixes integer and string labels")]
    MixedSwitchLabels,

    /// A switch branch without labels.
    #[error("switch branch {index} has no labels")]
    EmptySwitchBranch { index: usize },

    /// A switch expression must produce a value for every input.
    #[error("switch expression requires a default branch")]
    MissingSwitchDefault,

    /// Re-parameterizing a parameterized type with a different arity.
    #[error("'{name}' is already parameterized with {expected} argument(s), got {found}")]
    ParameterizedArity {
        name: String,
        expected: usize,
        found: usize,
    },

    /// An invocation whose argument count differs from its parameter count.
    #[error("'{method}' expects {expected} argument(s), got {found}")]
    ArgumentCount {
        method: String,
        expected: usize,
        found: usize,
    },
}
