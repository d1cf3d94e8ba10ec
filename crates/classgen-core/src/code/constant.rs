use crate::{ClassTypeDef, TypeDef};

/// Literal value with its static type.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// `null` typed as the given reference type.
    Null(TypeDef),
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Constant {
    pub fn ty(&self) -> TypeDef {
        match self {
            Constant::Null(ty) => ty.clone(),
            Constant::Boolean(_) => TypeDef::BOOLEAN,
            Constant::Byte(_) => TypeDef::BYTE,
            Constant::Short(_) => TypeDef::SHORT,
            Constant::Char(_) => TypeDef::CHAR,
            Constant::Int(_) => TypeDef::INT,
            Constant::Long(_) => TypeDef::LONG,
            Constant::Float(_) => TypeDef::FLOAT,
            Constant::Double(_) => TypeDef::DOUBLE,
            Constant::String(_) => TypeDef::Class(ClassTypeDef::string()),
        }
    }

    /// Value of an int-like constant as it appears on the stack.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Constant::Boolean(b) => Some(i32::from(*b)),
            Constant::Byte(v) => Some(i32::from(*v)),
            Constant::Short(v) => Some(i32::from(*v)),
            Constant::Char(v) => Some(i32::from(*v)),
            Constant::Int(v) => Some(*v),
            _ => None,
        }
    }
}
