//! Lowering of definitions to a flat member plan.
//!
//! Everything that has no direct class-file form is rewritten here before
//! any bytecode is produced:
//! - properties become a field plus accessors
//! - constructors gain the superclass call and instance initializers
//! - static initializers are collected into `<clinit>`
//! - enums gain their constants, `values()`, `valueOf` and the hidden
//!   name/ordinal constructor parameters
//! - records gain component fields, the canonical constructor, accessors
//!   and (optionally) structural `equals`/`hashCode`

mod enums;
mod members;
mod records;

use classgen_core::{
    AnnotationDef, ClassTypeDef, FieldDef, MethodDef, ObjectDef, QualifiedName, StatementDef,
    TypeDef, TypeKind, TypeVariableDef,
};

use crate::class_file::{access, class_access, field_access, method_access};
use crate::{EmitErrorKind, WriterOptions};

/// A field ready to be written.
#[derive(Debug, Clone)]
pub(crate) struct FieldPlan {
    pub def: FieldDef,
    pub access: u16,
}

/// A method ready to be written; bodies are final.
#[derive(Debug, Clone)]
pub(crate) struct MethodPlan {
    pub def: MethodDef,
    pub access: u16,
}

/// Flat view of one class file.
#[derive(Debug, Clone)]
pub(crate) struct ClassPlan {
    pub name: QualifiedName,
    pub this_type: ClassTypeDef,
    pub kind: TypeKind,
    pub access: u16,
    pub superclass: ClassTypeDef,
    pub interfaces: Vec<ClassTypeDef>,
    pub type_parameters: Vec<TypeVariableDef>,
    pub annotations: Vec<AnnotationDef>,
    pub fields: Vec<FieldPlan>,
    pub methods: Vec<MethodPlan>,
    /// Statements run by `<clinit>` before static field initializers.
    pub static_init: Vec<StatementDef>,
}

impl ClassPlan {
    pub fn build(def: &ObjectDef, options: &WriterOptions) -> Result<Self, EmitErrorKind> {
        let kind = def.kind();
        let this_type = def.type_ref();
        let superclass = match def {
            ObjectDef::Class(_) => def.superclass().cloned().unwrap_or_else(ClassTypeDef::object),
            ObjectDef::Interface(_) => ClassTypeDef::object(),
            // Enum<E>
            ObjectDef::Enum(_) => ClassTypeDef::enum_base()
                .parameterize(vec![this_type.clone().into()])
                .unwrap_or_else(|_| ClassTypeDef::enum_base()),
            ObjectDef::Record(_) => ClassTypeDef::record_base(),
        };

        let mut plan = ClassPlan {
            name: def.name().clone(),
            this_type,
            kind,
            access: class_access(kind, def.modifiers()),
            superclass,
            interfaces: def.superinterfaces().to_vec(),
            type_parameters: def.type_parameters().to_vec(),
            annotations: def.annotations().to_vec(),
            fields: Vec::new(),
            methods: Vec::new(),
            static_init: Vec::new(),
        };

        let in_interface = kind == TypeKind::Interface;
        for field in def.fields() {
            plan.add_field(field.clone(), 0);
        }
        for method in def.methods() {
            if method.is_deferred() {
                return Err(EmitErrorKind::UnresolvedBody);
            }
            plan.methods.push(MethodPlan {
                access: method_access(method.modifiers, method.has_body(), in_interface),
                def: method.clone(),
            });
        }
        members::lower_properties(&mut plan, def.properties());

        match def {
            ObjectDef::Enum(enum_def) => enums::lower_enum(&mut plan, enum_def),
            ObjectDef::Record(record) => records::lower_record(&mut plan, record),
            _ => {}
        }

        if kind != TypeKind::Interface {
            members::complete_constructors(&mut plan, def, options);
        }
        members::lower_static_initializer(&mut plan, def);
        Ok(plan)
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn add_field(&mut self, def: FieldDef, extra_access: u16) {
        let access = field_access(def.modifiers, self.is_interface()) | extra_access;
        self.fields.push(FieldPlan { def, access });
    }

    pub fn add_method(&mut self, def: MethodDef) {
        self.add_method_with(def, 0);
    }

    pub fn add_method_with(&mut self, def: MethodDef, extra_access: u16) {
        let access =
            method_access(def.modifiers, def.has_body(), self.is_interface()) | extra_access;
        self.methods.push(MethodPlan { def, access });
    }

    /// Declared method with this name and erased parameter types.
    pub fn find_method(&self, name: &str, parameters: &[TypeDef]) -> Option<&MethodPlan> {
        self.methods.iter().find(|method| {
            method.def.name == name
                && method.def.parameters.len() == parameters.len()
                && method
                    .def
                    .parameters
                    .iter()
                    .zip(parameters)
                    .all(|(p, ty)| p.ty.erasure() == ty.erasure())
        })
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MethodPlan> {
        self.methods.iter().filter(|m| m.def.is_constructor())
    }

    /// Whether the method is private to this class (called non-virtually).
    pub fn is_private(method: &MethodPlan) -> bool {
        method.access & access::PRIVATE != 0 && !method.def.is_static()
    }
}

