//! Emission errors.
//!
//! Structural problems found while lowering a definition abort that
//! definition only. [`EmitError`] carries the qualified name of the
//! definition and, when known, the member being emitted.

use std::fmt;

use thiserror::Error;

/// What went wrong while emitting a member.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitErrorKind {
    #[error("branch target label {label} was never placed")]
    UnresolvedLabel { label: u32 },

    #[error("stack depth mismatch at label {label}: expected {expected}, found {found}")]
    StackMismatch { label: u32, expected: u16, found: u16 },

    #[error("operand stack underflow at offset {offset}")]
    StackUnderflow { offset: usize },

    #[error("non-void method can complete without returning a value")]
    MissingReturn,

    #[error("return without value in a method returning {expected}")]
    MissingReturnValue { expected: String },

    #[error("void method returns a value")]
    UnexpectedReturnValue,

    #[error("a void expression is used as a value")]
    VoidValue,

    #[error("unknown local variable '{name}'")]
    UnknownLocal { name: String },

    #[error("unknown parameter '{name}'")]
    UnknownParameter { name: String },

    #[error("local variable '{name}' is already declared in this scope")]
    DuplicateLocal { name: String },

    #[error("receiver used in a static context")]
    NoReceiver,

    #[error("'{target}' cannot be assigned")]
    NotAssignable { target: String },

    #[error("cannot switch on values of type {ty}")]
    UnsupportedSwitchSubject { ty: String },

    #[error("operator {op} is not defined for {ty}")]
    UnsupportedOperator { op: String, ty: String },

    #[error("method body is {length} bytes, exceeding 65535")]
    CodeTooLarge { length: usize },

    #[error("branch offset {offset} does not fit in 16 bits")]
    BranchOutOfRange { offset: i64 },

    #[error("constant pool exceeds 65535 entries")]
    ConstantPoolOverflow,

    #[error("encoded string of {length} bytes exceeds 65535")]
    DescriptorTooLarge { length: usize },

    #[error("method needs {count} local slots, exceeding 65535")]
    TooManyLocals { count: usize },

    #[error("method takes {count} argument slots, exceeding 255")]
    TooManyArguments { count: usize },

    #[error("method body was never built")]
    UnresolvedBody,
}

/// An emission failure for one definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct EmitError {
    /// Qualified name of the definition being emitted
    pub definition: String,
    /// Member being emitted (method signature or field name)
    pub member: Option<String>,
    pub kind: EmitErrorKind,
}

impl EmitError {
    pub fn new(definition: impl Into<String>, member: Option<String>, kind: EmitErrorKind) -> Self {
        Self {
            definition: definition.into(),
            member,
            kind,
        }
    }
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            Some(member) => write!(f, "in '{}' member {}: {}", self.definition, member, self.kind),
            None => write!(f, "in '{}': {}", self.definition, self.kind),
        }
    }
}
