//! The Code Tree: expressions and statements forming method bodies.
//!
//! Trees are plain owned values built bottom-up. Once handed to an object
//! builder they are frozen; nothing in a tree is shared or mutated.

mod constant;
mod expr;
mod stmt;
mod switch;
mod validate;
mod variable;

pub use constant::Constant;
pub use expr::{CompareOp, ExpressionDef, InvokeInstance, InvokeStatic, MathOp, MethodRef, UnaryOp};
pub use stmt::{CatchDef, ResourceDef, StatementDef, TryStatement};
pub use switch::{SwitchBranch, SwitchExpression, SwitchLabel, SwitchStatement};
pub use variable::VariableDef;
