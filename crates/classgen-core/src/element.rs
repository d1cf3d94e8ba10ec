//! Descriptor-provider capability.
//!
//! A [`TypeElement`] exposes the shape of an existing program element
//! (its name, properties, methods and annotation values) without tying the
//! model to any particular reflection mechanism. Host toolchains provide
//! adapters; [`DescribedType`] is a plain in-memory implementation.

use std::fmt;

use crate::{AnnotationDef, AnnotationValue, QualifiedName, TypeDef, TypeKind};

/// Reflected view of an existing type.
pub trait TypeElement: fmt::Debug + Send + Sync {
    /// Resolved qualified name.
    fn name(&self) -> QualifiedName;

    /// Kind of the element (class, interface, ...).
    fn kind(&self) -> TypeKind {
        TypeKind::Class
    }

    /// Properties in declaration order.
    fn properties(&self) -> Vec<PropertyElement>;

    /// Methods in declaration order.
    fn methods(&self) -> Vec<MethodElement>;

    /// Value of member `member` of the annotation `annotation` on the type.
    fn annotation_value(&self, annotation: &QualifiedName, member: &str) -> Option<AnnotationValue>;
}

/// A reflected property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyElement {
    pub name: String,
    pub ty: TypeDef,
    pub annotations: Vec<AnnotationDef>,
}

/// A reflected method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodElement {
    pub name: String,
    pub parameter_types: Vec<TypeDef>,
    pub return_type: TypeDef,
    pub annotations: Vec<AnnotationDef>,
}

fn find_value(
    annotations: &[AnnotationDef],
    annotation: &QualifiedName,
    member: &str,
) -> Option<AnnotationValue> {
    annotations
        .iter()
        .find(|def| def.ty.resolve() == *annotation)
        .and_then(|def| def.value(member).cloned())
}

fn has_annotation(annotations: &[AnnotationDef], annotation: &QualifiedName) -> bool {
    annotations.iter().any(|def| def.ty.resolve() == *annotation)
}

impl PropertyElement {
    pub fn annotation_value(&self, annotation: &QualifiedName, member: &str) -> Option<AnnotationValue> {
        find_value(&self.annotations, annotation, member)
    }

    pub fn has_annotation(&self, annotation: &QualifiedName) -> bool {
        has_annotation(&self.annotations, annotation)
    }
}

impl MethodElement {
    pub fn annotation_value(&self, annotation: &QualifiedName, member: &str) -> Option<AnnotationValue> {
        find_value(&self.annotations, annotation, member)
    }

    pub fn has_annotation(&self, annotation: &QualifiedName) -> bool {
        has_annotation(&self.annotations, annotation)
    }
}

/// In-memory [`TypeElement`].
#[derive(Debug, Clone, Default)]
pub struct DescribedType {
    name: QualifiedName,
    kind: TypeKind,
    properties: Vec<PropertyElement>,
    methods: Vec<MethodElement>,
    annotations: Vec<AnnotationDef>,
}

impl DescribedType {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_property(mut self, property: PropertyElement) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_method(mut self, method: MethodElement) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationDef) -> Self {
        self.annotations.push(annotation);
        self
    }
}

impl TypeElement for DescribedType {
    fn name(&self) -> QualifiedName {
        self.name.clone()
    }

    fn kind(&self) -> TypeKind {
        self.kind
    }

    fn properties(&self) -> Vec<PropertyElement> {
        self.properties.clone()
    }

    fn methods(&self) -> Vec<MethodElement> {
        self.methods.clone()
    }

    fn annotation_value(&self, annotation: &QualifiedName, member: &str) -> Option<AnnotationValue> {
        find_value(&self.annotations, annotation, member)
    }
}
