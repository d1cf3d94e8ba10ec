//! Annotation instances attached to definitions, members and types.

use ordered_float::OrderedFloat;

use crate::{ClassTypeDef, TypeDef};

/// A single annotation: its type and ordered member values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationDef {
    /// Annotation type
    pub ty: ClassTypeDef,
    /// Member values in declaration order
    pub values: Vec<(String, AnnotationValue)>,
}

/// Value of an annotation member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationValue {
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    String(String),
    /// Enum constant reference.
    Enum { ty: ClassTypeDef, constant: String },
    /// Class literal.
    Class(TypeDef),
    /// Nested annotation.
    Annotation(Box<AnnotationDef>),
    Array(Vec<AnnotationValue>),
}

impl AnnotationDef {
    /// Start building an annotation of the given type.
    pub fn builder(ty: ClassTypeDef) -> AnnotationDefBuilder {
        AnnotationDefBuilder {
            ty,
            values: Vec::new(),
        }
    }

    /// Annotation without members.
    pub fn marker(ty: ClassTypeDef) -> Self {
        Self {
            ty,
            values: Vec::new(),
        }
    }

    /// Look up a member value by name.
    pub fn value(&self, name: &str) -> Option<&AnnotationValue> {
        self.values
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, value)| value)
    }
}

impl AnnotationValue {
    /// String payload, also rendering scalar values and enum constant names.
    pub fn as_string(&self) -> Option<String> {
        match self {
            AnnotationValue::String(s) => Some(s.clone()),
            AnnotationValue::Enum { constant, .. } => Some(constant.clone()),
            AnnotationValue::Boolean(b) => Some(b.to_string()),
            AnnotationValue::Int(i) => Some(i.to_string()),
            AnnotationValue::Long(l) => Some(l.to_string()),
            AnnotationValue::Short(s) => Some(s.to_string()),
            AnnotationValue::Byte(b) => Some(b.to_string()),
            AnnotationValue::Double(d) => Some(d.to_string()),
            AnnotationValue::Float(f) => Some(f.to_string()),
            AnnotationValue::Char(c) => char::from_u32(*c as u32).map(String::from),
            AnnotationValue::Class(_)
            | AnnotationValue::Annotation(_)
            | AnnotationValue::Array(_) => None,
        }
    }

    /// Boolean payload, accepting the strings "true" and "false".
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnnotationValue::Boolean(b) => Some(*b),
            AnnotationValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Builder for [`AnnotationDef`].
#[derive(Debug, Clone)]
pub struct AnnotationDefBuilder {
    ty: ClassTypeDef,
    values: Vec<(String, AnnotationValue)>,
}

impl AnnotationDefBuilder {
    /// Set a member value, replacing an earlier value for the same member.
    pub fn add_member(mut self, name: impl Into<String>, value: AnnotationValue) -> Self {
        let name = name.into();
        match self.values.iter_mut().find(|(member, _)| *member == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
        self
    }

    pub fn build(self) -> AnnotationDef {
        AnnotationDef {
            ty: self.ty,
            values: self.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QualifiedName;

    fn ann() -> ClassTypeDef {
        ClassTypeDef::of(QualifiedName::new("a", "Ann"))
    }

    #[test]
    fn member_lookup_preserves_order() {
        let def = AnnotationDef::builder(ann())
            .add_member("b", AnnotationValue::Int(1))
            .add_member("a", AnnotationValue::Boolean(true))
            .build();
        assert_eq!(def.values[0].0, "b");
        assert_eq!(def.value("a"), Some(&AnnotationValue::Boolean(true)));
        assert_eq!(def.value("c"), None);
    }

    #[test]
    fn repeated_member_replaces_value() {
        let def = AnnotationDef::builder(ann())
            .add_member("x", AnnotationValue::Int(1))
            .add_member("x", AnnotationValue::Int(2))
            .build();
        assert_eq!(def.values.len(), 1);
        assert_eq!(def.value("x"), Some(&AnnotationValue::Int(2)));
    }

    #[test]
    fn scalar_rendering() {
        assert_eq!(
            AnnotationValue::String("true".into()).as_bool(),
            Some(true)
        );
        assert_eq!(AnnotationValue::Int(4).as_string().as_deref(), Some("4"));
        assert_eq!(AnnotationValue::Array(vec![]).as_string(), None);
    }
}
