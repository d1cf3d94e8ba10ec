//! Type descriptors and generic signatures.
//!
//! Descriptors are computed from erased types and memoized per type
//! identity, so equal encodings of one class share a single entry.

use std::sync::Arc;

use classgen_core::{ClassTypeDef, TypeDef, TypeVariableDef, WildcardBound};
use rustc_hash::FxHashMap;

/// Memoizing descriptor builder.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    types: FxHashMap<TypeDef, Arc<str>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field descriptor of a type (`I`, `Ljava/lang/String;`, `[J`).
    pub fn descriptor(&mut self, ty: &TypeDef) -> Arc<str> {
        if let Some(cached) = self.types.get(ty) {
            return cached.clone();
        }
        let mut out = String::new();
        write_descriptor(&mut out, ty);
        let descriptor: Arc<str> = Arc::from(out);
        self.types.insert(ty.clone(), descriptor.clone());
        descriptor
    }

    /// Method descriptor `(params)ret`.
    pub fn method_descriptor(&mut self, parameters: &[TypeDef], return_type: &TypeDef) -> String {
        let mut out = String::from("(");
        for parameter in parameters {
            out.push_str(&self.descriptor(parameter));
        }
        out.push(')');
        out.push_str(&self.descriptor(return_type));
        out
    }

    /// Name used in class entries: internal name for classes, descriptor
    /// for arrays.
    pub fn class_entry_name(&mut self, ty: &TypeDef) -> String {
        match ty.erasure() {
            TypeDef::Class(class) => class.internal_name(),
            other => self.descriptor(&other).to_string(),
        }
    }

    /// Number of distinct memoized types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn write_descriptor(out: &mut String, ty: &TypeDef) {
    match ty {
        TypeDef::Primitive(kind) => out.push(kind.descriptor()),
        TypeDef::Void => out.push('V'),
        TypeDef::Array(component) => {
            out.push('[');
            write_descriptor(out, component);
        }
        TypeDef::TypeVariable(_) | TypeDef::Wildcard(_) => write_descriptor(out, &ty.erasure()),
        TypeDef::Class(class) => {
            out.push('L');
            out.push_str(&class.internal_name());
            out.push(';');
        }
    }
}

// ============================================================================
// Generic signatures
// ============================================================================

/// Whether a type needs a generic signature to be fully described.
pub fn is_generic(ty: &TypeDef) -> bool {
    match ty {
        TypeDef::Primitive(_) | TypeDef::Void => false,
        TypeDef::Array(component) => is_generic(component),
        TypeDef::TypeVariable(_) | TypeDef::Wildcard(_) => true,
        TypeDef::Class(class) => class.is_parameterized(),
    }
}

/// Signature of a type as used in `Signature` attributes.
pub fn type_signature(ty: &TypeDef) -> String {
    let mut out = String::new();
    write_signature(&mut out, ty);
    out
}

fn write_signature(out: &mut String, ty: &TypeDef) {
    match ty {
        TypeDef::Primitive(kind) => out.push(kind.descriptor()),
        TypeDef::Void => out.push('V'),
        TypeDef::Array(component) => {
            out.push('[');
            write_signature(out, component);
        }
        TypeDef::TypeVariable(variable) => {
            out.push('T');
            out.push_str(&variable.name);
            out.push(';');
        }
        TypeDef::Wildcard(WildcardBound::Unbounded) => out.push('*'),
        TypeDef::Wildcard(WildcardBound::Extends(bound)) => {
            out.push('+');
            write_signature(out, bound);
        }
        TypeDef::Wildcard(WildcardBound::Super(bound)) => {
            out.push('-');
            write_signature(out, bound);
        }
        TypeDef::Class(class) => write_class_signature(out, class),
    }
}

fn write_class_signature(out: &mut String, class: &ClassTypeDef) {
    out.push('L');
    out.push_str(&class.internal_name());
    let arguments = class.type_arguments();
    if !arguments.is_empty() {
        out.push('<');
        for argument in arguments {
            write_signature(out, argument);
        }
        out.push('>');
    }
    out.push(';');
}

fn write_type_parameters(out: &mut String, parameters: &[TypeVariableDef]) {
    if parameters.is_empty() {
        return;
    }
    out.push('<');
    for parameter in parameters {
        out.push_str(&parameter.name);
        if parameter.bounds.is_empty() {
            out.push_str(":Ljava/lang/Object;");
        }
        for (i, bound) in parameter.bounds.iter().enumerate() {
            // An interface first bound leaves the class bound empty.
            if i == 0 && bound.is_interface() {
                out.push(':');
            }
            out.push(':');
            write_class_signature(out, bound);
        }
    }
    out.push('>');
}

/// Class signature: formal parameters, superclass and interfaces.
pub fn class_signature(
    type_parameters: &[TypeVariableDef],
    superclass: &ClassTypeDef,
    interfaces: &[ClassTypeDef],
) -> String {
    let mut out = String::new();
    write_type_parameters(&mut out, type_parameters);
    write_class_signature(&mut out, superclass);
    for interface in interfaces {
        write_class_signature(&mut out, interface);
    }
    out
}

/// Method signature: formal parameters, parameter and return types.
pub fn method_signature(
    type_parameters: &[TypeVariableDef],
    parameters: &[TypeDef],
    return_type: &TypeDef,
) -> String {
    let mut out = String::new();
    write_type_parameters(&mut out, type_parameters);
    out.push('(');
    for parameter in parameters {
        write_signature(&mut out, parameter);
    }
    out.push(')');
    write_signature(&mut out, return_type);
    out
}
