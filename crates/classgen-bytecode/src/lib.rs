//! JVM class file emitter for classgen.
//!
//! Lowers a frozen [`ObjectDef`](classgen_core::ObjectDef) into a class
//! file that the JVM (or `classgen-vm`) can load.
//!
//! ## Pipeline
//!
//! - **Desugar**: properties, enums, records, constructors and static
//!   initializers become a flat member plan
//! - **Descriptors**: types map to memoized descriptor strings
//! - **Lowering**: each method body becomes a `Code` attribute with
//!   resolved branches, allocated local slots and exception tables
//! - **Assembly**: the constant pool, members and attributes are laid out
//!
//! ## Modules
//!
//! - [`class_file`]: access flags, attributes and final layout
//! - [`code`]: instruction buffer, labels and stack tracking
//! - [`constant_pool`]: deduplicated constant pool
//! - [`descriptor`]: descriptors and generic signatures
//! - [`locals`]: scoped local slot allocation
//! - [`opcode`]: the instruction set
//!
//! ```
//! use classgen_bytecode::ClassWriter;
//! use classgen_core::{ObjectDef, QualifiedName};
//!
//! let def = ObjectDef::class(QualifiedName::new("demo", "Empty")).build().unwrap();
//! let class = ClassWriter::default().write(&def).unwrap();
//! assert_eq!(&class.bytes[..4], &[0xca, 0xfe, 0xba, 0xbe]);
//! ```

pub mod class_file;
pub mod code;
pub mod constant_pool;
pub mod descriptor;
mod desugar;
mod error;
pub mod locals;
mod lower;
pub mod opcode;
mod options;
mod writer;

pub use code::{CodeAttribute, CodeBuffer, HandlerEntry, Label, SlotKind};
pub use constant_pool::{ConstantPool, PoolEntry};
pub use descriptor::DescriptorCache;
pub use error::{EmitError, EmitErrorKind};
pub use locals::LocalSlots;
pub use lower::string_hash;
pub use opcode::OpCode;
pub use options::WriterOptions;
pub use writer::{ClassWriter, EmittedClass};
