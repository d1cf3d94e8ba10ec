use thiserror::Error;

/// Failures while loading or running class files.
///
/// Exceptions thrown by the running program are not errors until they
/// escape the outermost call; they then surface as [`VmError::Uncaught`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    #[error("malformed class file: {0}")]
    Malformed(String),

    #[error("class '{0}' is not loaded")]
    ClassNotFound(String),

    #[error("class '{0}' is already loaded")]
    DuplicateClass(String),

    #[error("no method {class}.{name}{descriptor}")]
    NoSuchMethod {
        class: String,
        name: String,
        descriptor: String,
    },

    #[error("no field {class}.{name}")]
    NoSuchField { class: String, name: String },

    #[error("invalid opcode 0x{opcode:02x} at offset {pc}")]
    InvalidOpcode { opcode: u8, pc: usize },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("operand stack underflow at offset {pc}")]
    StackUnderflow { pc: usize },

    #[error("constant pool index {0} is invalid")]
    BadConstant(u16),

    #[error("call depth exceeded {0}")]
    StackOverflow(usize),

    #[error("dangling object reference #{0}")]
    DanglingReference(u32),

    #[error("uncaught {class}: {}", .message.as_deref().unwrap_or("<no message>"))]
    Uncaught {
        /// Binary name of the exception class
        class: String,
        message: Option<String>,
    },
}

pub type Result<T> = std::result::Result<T, VmError>;
