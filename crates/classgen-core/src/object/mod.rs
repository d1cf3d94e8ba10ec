//! The Object Model: generatable definitions and their members.
//!
//! [`ObjectDef`] is a closed sum over the four definition kinds. All kinds
//! share an [`ObjectHeader`] (name, modifiers, supertypes, annotations,
//! members and owned inner definitions); enums add constants and records add
//! components.
//!
//! Definitions are only created through [`ObjectDefBuilder`], which validates
//! the member set and resolves deferred method bodies. A built definition is
//! immutable.

mod builder;
mod member;
mod method;

use std::sync::Arc;

pub use builder::ObjectDefBuilder;
pub use member::{FieldDef, ParameterDef, PropertyDef};
pub use method::{BodyFn, MethodBody, MethodDef, MethodDefBuilder};

use crate::{
    AnnotationDef, ClassTypeDef, DefinitionRef, ExpressionDef, Modifiers, QualifiedName,
    StatementDef, TypeKind, TypeVariableDef,
};

// ============================================================================
// Types
// ============================================================================

/// A generatable type definition.
#[derive(Debug, Clone)]
pub enum ObjectDef {
    Class(ClassDef),
    Interface(InterfaceDef),
    Enum(EnumDef),
    Record(RecordDef),
}

/// Parts shared by every definition kind.
#[derive(Debug, Clone)]
pub struct ObjectHeader {
    shell: Arc<DefinitionRef>,
    modifiers: Modifiers,
    annotations: Vec<AnnotationDef>,
    type_parameters: Vec<TypeVariableDef>,
    superinterfaces: Vec<ClassTypeDef>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
    properties: Vec<PropertyDef>,
    static_initializer: Vec<StatementDef>,
    inner: Vec<ObjectDef>,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    header: ObjectHeader,
    superclass: Option<ClassTypeDef>,
}

#[derive(Debug, Clone)]
pub struct InterfaceDef {
    header: ObjectHeader,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    header: ObjectHeader,
    constants: Vec<EnumConstant>,
}

#[derive(Debug, Clone)]
pub struct RecordDef {
    header: ObjectHeader,
    components: Vec<PropertyDef>,
    structural_equality: bool,
}

/// An enum constant and the arguments passed to its constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstant {
    pub name: String,
    pub arguments: Vec<ExpressionDef>,
}

// ============================================================================
// Entry points
// ============================================================================

impl ObjectDef {
    pub fn class(name: QualifiedName) -> ObjectDefBuilder {
        ObjectDefBuilder::new(name, TypeKind::Class)
    }

    pub fn interface(name: QualifiedName) -> ObjectDefBuilder {
        ObjectDefBuilder::new(name, TypeKind::Interface)
    }

    pub fn enumeration(name: QualifiedName) -> ObjectDefBuilder {
        ObjectDefBuilder::new(name, TypeKind::Enum)
    }

    pub fn record(name: QualifiedName) -> ObjectDefBuilder {
        ObjectDefBuilder::new(name, TypeKind::Record)
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ObjectDef {
    pub fn header(&self) -> &ObjectHeader {
        match self {
            ObjectDef::Class(def) => &def.header,
            ObjectDef::Interface(def) => &def.header,
            ObjectDef::Enum(def) => &def.header,
            ObjectDef::Record(def) => &def.header,
        }
    }

    pub fn kind(&self) -> TypeKind {
        self.header().shell.kind
    }

    pub fn name(&self) -> &QualifiedName {
        &self.header().shell.name
    }

    /// Reference to this definition, sharing its identity shell.
    pub fn type_ref(&self) -> ClassTypeDef {
        ClassTypeDef::of_definition(self.header().shell.clone())
    }

    /// Declared superclass; `None` for interfaces, enums, records and
    /// classes extending `Object` implicitly.
    pub fn superclass(&self) -> Option<&ClassTypeDef> {
        match self {
            ObjectDef::Class(def) => def.superclass.as_ref(),
            _ => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        self.header().modifiers
    }

    pub fn annotations(&self) -> &[AnnotationDef] {
        &self.header().annotations
    }

    pub fn type_parameters(&self) -> &[TypeVariableDef] {
        &self.header().type_parameters
    }

    pub fn superinterfaces(&self) -> &[ClassTypeDef] {
        &self.header().superinterfaces
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.header().fields
    }

    pub fn methods(&self) -> &[MethodDef] {
        &self.header().methods
    }

    pub fn properties(&self) -> &[PropertyDef] {
        &self.header().properties
    }

    pub fn static_initializer(&self) -> &[StatementDef] {
        &self.header().static_initializer
    }

    /// Owned inner definitions in declaration order.
    pub fn inner_types(&self) -> &[ObjectDef] {
        &self.header().inner
    }

    pub fn as_enum(&self) -> Option<&EnumDef> {
        match self {
            ObjectDef::Enum(def) => Some(def),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordDef> {
        match self {
            ObjectDef::Record(def) => Some(def),
            _ => None,
        }
    }
}

impl EnumDef {
    pub fn constants(&self) -> &[EnumConstant] {
        &self.constants
    }
}

impl RecordDef {
    /// Components in declaration order.
    pub fn components(&self) -> &[PropertyDef] {
        &self.components
    }

    /// Whether `equals`/`hashCode` are derived from the components.
    pub fn structural_equality(&self) -> bool {
        self.structural_equality
    }
}
