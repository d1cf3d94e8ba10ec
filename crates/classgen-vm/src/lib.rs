//! A small reference interpreter for class files written by
//! `classgen-bytecode`.
//!
//! It exists to run generated code in tests: load class bytes, call
//! methods, read statics and inspect the resulting objects. It covers the
//! instruction set the emitter produces plus the handful of `java.lang`
//! classes generated code links against, which are implemented natively.
//!
//! There is no verifier, no garbage collection and no threading; monitors
//! only count entries so that balanced `synchronized` blocks can be
//! checked.
//!
//! ```no_run
//! use classgen_vm::{Value, Vm};
//!
//! # fn run(bytes: &[u8]) -> Result<(), classgen_vm::VmError> {
//! let mut vm = Vm::new();
//! let name = vm.load(bytes)?;
//! let sum = vm.invoke_static(&name, "add", "(II)I", &[Value::Int(2), Value::Int(3)])?;
//! assert_eq!(sum, Some(Value::Int(5)));
//! # Ok(())
//! # }
//! ```

mod builtins;
pub mod class;
mod error;
pub mod heap;
pub mod value;
mod vm;

pub use class::ClassFile;
pub use error::{Result, VmError};
pub use value::{ObjectRef, Value};
pub use vm::{MAX_DEPTH, Vm};
