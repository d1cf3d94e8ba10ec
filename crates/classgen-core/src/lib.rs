//! Core model for classgen.
//!
//! This crate holds everything a generator builds before any output format
//! is involved:
//!
//! - **Type Model** ([`TypeDef`], [`ClassTypeDef`]): value types whose
//!   identity depends only on the resolved qualified name.
//! - **Object Model** ([`ObjectDef`] and its members): classes, interfaces,
//!   enums and records, built through validating builders.
//! - **Code Tree** ([`ExpressionDef`], [`StatementDef`]): method bodies.
//! - **Descriptor provider** ([`TypeElement`]): the capability used to
//!   describe existing program elements.
//!
//! The model has no dependency on any emitter; binary and textual backends
//! consume the same frozen [`ObjectDef`].

mod annotation;
pub mod code;
mod element;
mod error;
mod modifiers;
pub mod object;
mod qualified_name;
mod type_hash;
pub mod types;

pub use annotation::{AnnotationDef, AnnotationDefBuilder, AnnotationValue};
pub use code::{
    CatchDef, CompareOp, Constant, ExpressionDef, InvokeInstance, InvokeStatic, MathOp, MethodRef,
    ResourceDef, StatementDef, SwitchBranch, SwitchExpression, SwitchLabel, SwitchStatement,
    TryStatement, UnaryOp, VariableDef,
};
pub use element::{DescribedType, MethodElement, PropertyElement, TypeElement};
pub use error::ModelError;
pub use modifiers::Modifiers;
pub use object::{
    ClassDef, EnumConstant, EnumDef, FieldDef, InterfaceDef, MethodBody, MethodDef,
    MethodDefBuilder, ObjectDef, ObjectDefBuilder, ObjectHeader, ParameterDef, PropertyDef,
    RecordDef,
};
pub use qualified_name::QualifiedName;
pub use type_hash::TypeHash;
pub use types::{
    ClassTypeDef, ClassTypeRepr, DefinitionRef, PrimitiveKind, TypeDef, TypeKind, TypeVariableDef,
    WildcardBound,
};
