//! The Type Model.
//!
//! [`TypeDef`] is a closed sum over every type the model can express.
//! Class types carry their own identity rules (see [`class_type`]); every
//! other variant compares structurally.

pub mod class_type;
mod primitive;

use std::fmt;

pub use class_type::{ClassTypeDef, ClassTypeRepr, DefinitionRef, TypeKind};
pub use primitive::PrimitiveKind;

use crate::{QualifiedName, TypeHash};

/// Any type usable in a signature, field or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDef {
    Primitive(PrimitiveKind),
    Void,
    /// Array of the component type.
    Array(Box<TypeDef>),
    TypeVariable(TypeVariableDef),
    Wildcard(WildcardBound),
    Class(ClassTypeDef),
}

/// A declared or referenced type variable (`T extends Comparable<T>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeVariableDef {
    pub name: String,
    pub bounds: Vec<ClassTypeDef>,
}

/// Bound of a wildcard type argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WildcardBound {
    Unbounded,
    Extends(Box<TypeDef>),
    Super(Box<TypeDef>),
}

impl TypeDef {
    pub const BOOLEAN: TypeDef = TypeDef::Primitive(PrimitiveKind::Boolean);
    pub const BYTE: TypeDef = TypeDef::Primitive(PrimitiveKind::Byte);
    pub const SHORT: TypeDef = TypeDef::Primitive(PrimitiveKind::Short);
    pub const CHAR: TypeDef = TypeDef::Primitive(PrimitiveKind::Char);
    pub const INT: TypeDef = TypeDef::Primitive(PrimitiveKind::Int);
    pub const LONG: TypeDef = TypeDef::Primitive(PrimitiveKind::Long);
    pub const FLOAT: TypeDef = TypeDef::Primitive(PrimitiveKind::Float);
    pub const DOUBLE: TypeDef = TypeDef::Primitive(PrimitiveKind::Double);

    /// Class type referenced by name.
    pub fn of(name: QualifiedName) -> Self {
        TypeDef::Class(ClassTypeDef::of(name))
    }

    pub fn object() -> Self {
        TypeDef::Class(ClassTypeDef::object())
    }

    pub fn string() -> Self {
        TypeDef::Class(ClassTypeDef::string())
    }

    /// Array whose components are `component`.
    pub fn array_of(component: TypeDef) -> Self {
        TypeDef::Array(Box::new(component))
    }

    /// Unbounded type variable.
    pub fn variable(name: impl Into<String>) -> Self {
        TypeDef::TypeVariable(TypeVariableDef {
            name: name.into(),
            bounds: Vec::new(),
        })
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeDef::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDef::Primitive(_))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            TypeDef::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Everything held by reference on the operand stack.
    pub fn is_reference(&self) -> bool {
        !matches!(self, TypeDef::Primitive(_) | TypeDef::Void)
    }

    pub fn as_class(&self) -> Option<&ClassTypeDef> {
        match self {
            TypeDef::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn component(&self) -> Option<&TypeDef> {
        match self {
            TypeDef::Array(component) => Some(component),
            _ => None,
        }
    }

    /// Primitive kind boxed by this type when it is a wrapper class.
    pub fn boxed_kind(&self) -> Option<PrimitiveKind> {
        self.as_class()
            .and_then(|class| PrimitiveKind::from_wrapper(&class.resolve()))
    }

    /// Wide values occupy two slots.
    pub fn is_wide(&self) -> bool {
        self.as_primitive().is_some_and(PrimitiveKind::is_wide)
    }

    /// Local-variable slots (and stack entries) used by a value of this type.
    pub fn slot_size(&self) -> u16 {
        match self {
            TypeDef::Void => 0,
            ty if ty.is_wide() => 2,
            _ => 1,
        }
    }

    /// Runtime type after generic erasure.
    pub fn erasure(&self) -> TypeDef {
        match self {
            TypeDef::Primitive(_) | TypeDef::Void => self.clone(),
            TypeDef::Array(component) => TypeDef::array_of(component.erasure()),
            TypeDef::TypeVariable(variable) => variable
                .bounds
                .first()
                .map(|bound| TypeDef::Class(bound.erasure()))
                .unwrap_or_else(TypeDef::object),
            TypeDef::Wildcard(WildcardBound::Extends(bound)) => bound.erasure(),
            TypeDef::Wildcard(_) => TypeDef::object(),
            TypeDef::Class(class) => TypeDef::Class(class.erasure()),
        }
    }

    /// Mark a class type nullable; other variants are returned unchanged.
    pub fn make_nullable(self) -> Self {
        match self {
            TypeDef::Class(class) => TypeDef::Class(class.make_nullable()),
            other => other,
        }
    }

    /// Identity hash consistent with `PartialEq`.
    pub fn type_hash(&self) -> TypeHash {
        match self {
            TypeDef::Primitive(kind) => TypeHash::from_name(kind.name()),
            TypeDef::Void => TypeHash::from_name("void"),
            TypeDef::Array(component) => TypeHash::from_array(component.type_hash()),
            TypeDef::TypeVariable(variable) => TypeHash::from_name(&format!("<{}>", variable.name)),
            TypeDef::Wildcard(WildcardBound::Unbounded) => TypeHash::from_name("?"),
            TypeDef::Wildcard(WildcardBound::Extends(bound)) => {
                TypeHash::from_parameterized(TypeHash::from_name("? extends"), &[bound.type_hash()])
            }
            TypeDef::Wildcard(WildcardBound::Super(bound)) => {
                TypeHash::from_parameterized(TypeHash::from_name("? super"), &[bound.type_hash()])
            }
            TypeDef::Class(class) => class.identity_hash(),
        }
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDef::Primitive(kind) => write!(f, "{}", kind.name()),
            TypeDef::Void => write!(f, "void"),
            TypeDef::Array(component) => write!(f, "{component}[]"),
            TypeDef::TypeVariable(variable) => write!(f, "{}", variable.name),
            TypeDef::Wildcard(WildcardBound::Unbounded) => write!(f, "?"),
            TypeDef::Wildcard(WildcardBound::Extends(bound)) => write!(f, "? extends {bound}"),
            TypeDef::Wildcard(WildcardBound::Super(bound)) => write!(f, "? super {bound}"),
            TypeDef::Class(class) => write!(f, "{class}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_sizes() {
        assert_eq!(TypeDef::Void.slot_size(), 0);
        assert_eq!(TypeDef::INT.slot_size(), 1);
        assert_eq!(TypeDef::LONG.slot_size(), 2);
        assert_eq!(TypeDef::DOUBLE.slot_size(), 2);
        assert_eq!(TypeDef::string().slot_size(), 1);
    }

    #[test]
    fn erasure_of_bounded_variable() {
        let bounded = TypeDef::TypeVariable(TypeVariableDef {
            name: "T".into(),
            bounds: vec![ClassTypeDef::number()],
        });
        assert_eq!(bounded.erasure(), TypeDef::Class(ClassTypeDef::number()));
        assert_eq!(TypeDef::variable("U").erasure(), TypeDef::object());
    }

    #[test]
    fn erasure_strips_arguments() {
        let list = ClassTypeDef::of(QualifiedName::new("java.util", "List"))
            .parameterize(vec![TypeDef::string()])
            .unwrap();
        let erased = TypeDef::Class(list.clone()).erasure();
        assert_eq!(
            erased,
            TypeDef::of(QualifiedName::new("java.util", "List"))
        );
        assert_ne!(erased, TypeDef::Class(list));
    }

    #[test]
    fn boxed_kind_of_wrapper() {
        assert_eq!(
            TypeDef::Class(ClassTypeDef::java_lang("Integer")).boxed_kind(),
            Some(PrimitiveKind::Int)
        );
        assert_eq!(TypeDef::string().boxed_kind(), None);
    }

    #[test]
    fn nullable_type_def_is_equal() {
        assert_eq!(TypeDef::string().make_nullable(), TypeDef::string());
        assert_eq!(
            TypeDef::string().make_nullable().type_hash(),
            TypeDef::string().type_hash()
        );
    }
}
