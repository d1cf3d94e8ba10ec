//! Fields, parameters and properties.

use crate::{AnnotationDef, ExpressionDef, Modifiers, TypeDef};

/// A field of a generated type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeDef,
    pub modifiers: Modifiers,
    pub initializer: Option<ExpressionDef>,
    pub annotations: Vec<AnnotationDef>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeDef) -> Self {
        Self {
            name: name.into(),
            ty,
            modifiers: Modifiers::empty(),
            initializer: None,
            annotations: Vec::new(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    pub fn with_initializer(mut self, initializer: ExpressionDef) -> Self {
        self.initializer = Some(initializer);
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationDef) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    pub name: String,
    pub ty: TypeDef,
    pub modifiers: Modifiers,
    pub annotations: Vec<AnnotationDef>,
}

impl ParameterDef {
    pub fn new(name: impl Into<String>, ty: TypeDef) -> Self {
        Self {
            name: name.into(),
            ty,
            modifiers: Modifiers::empty(),
            annotations: Vec::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: AnnotationDef) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// A property: a field with accessors, or a record component.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub name: String,
    pub ty: TypeDef,
    pub modifiers: Modifiers,
    pub initializer: Option<ExpressionDef>,
    pub annotations: Vec<AnnotationDef>,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, ty: TypeDef) -> Self {
        Self {
            name: name.into(),
            ty,
            modifiers: Modifiers::empty(),
            initializer: None,
            annotations: Vec::new(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    pub fn with_initializer(mut self, initializer: ExpressionDef) -> Self {
        self.initializer = Some(initializer);
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationDef) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// `getName` for property `name`.
    pub fn getter_name(&self) -> String {
        format!("get{}", capitalize(&self.name))
    }

    /// `setName` for property `name`.
    pub fn setter_name(&self) -> String {
        format!("set{}", capitalize(&self.name))
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessor_names() {
        let property = PropertyDef::new("title", TypeDef::string());
        assert_eq!(property.getter_name(), "getTitle");
        assert_eq!(property.setter_name(), "setTitle");
    }

    #[test]
    fn modifiers_accumulate() {
        let field = FieldDef::new("x", TypeDef::INT)
            .with_modifiers(Modifiers::PRIVATE)
            .with_modifiers(Modifiers::STATIC);
        assert!(field.is_static());
        assert!(field.modifiers.is_private());
    }
}
