//! Class file layout: access flags, attributes and final assembly.

use classgen_core::{AnnotationDef, AnnotationValue, Modifiers, TypeDef, TypeKind};

use crate::{CodeAttribute, ConstantPool, DescriptorCache, EmitErrorKind};

/// Class file magic number.
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Access flag bits.
pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    /// `ACC_SUPER` on classes, `ACC_SYNCHRONIZED` on methods.
    pub const SUPER: u16 = 0x0020;
    pub const SYNCHRONIZED: u16 = 0x0020;
    pub const VOLATILE: u16 = 0x0040;
    pub const TRANSIENT: u16 = 0x0080;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ENUM: u16 = 0x4000;
}

/// Flags shared by every member kind.
fn common_access(modifiers: Modifiers) -> u16 {
    let mut flags = 0;
    if modifiers.contains(Modifiers::PUBLIC) {
        flags |= access::PUBLIC;
    }
    if modifiers.contains(Modifiers::PRIVATE) {
        flags |= access::PRIVATE;
    }
    if modifiers.contains(Modifiers::PROTECTED) {
        flags |= access::PROTECTED;
    }
    if modifiers.contains(Modifiers::STATIC) {
        flags |= access::STATIC;
    }
    if modifiers.contains(Modifiers::FINAL) {
        flags |= access::FINAL;
    }
    if modifiers.contains(Modifiers::SYNTHETIC) {
        flags |= access::SYNTHETIC;
    }
    flags
}

/// Top-level class flags. Nested visibility is not representable here, so
/// private and protected types are written package-private.
pub fn class_access(kind: TypeKind, modifiers: Modifiers) -> u16 {
    let mut flags = 0;
    if modifiers.contains(Modifiers::PUBLIC) {
        flags |= access::PUBLIC;
    }
    if modifiers.contains(Modifiers::SYNTHETIC) {
        flags |= access::SYNTHETIC;
    }
    match kind {
        TypeKind::Interface => flags | access::INTERFACE | access::ABSTRACT,
        TypeKind::Enum => flags | access::FINAL | access::SUPER | access::ENUM,
        TypeKind::Record => flags | access::FINAL | access::SUPER,
        TypeKind::Class => {
            if modifiers.contains(Modifiers::FINAL) {
                flags |= access::FINAL;
            }
            if modifiers.contains(Modifiers::ABSTRACT) {
                flags |= access::ABSTRACT;
            }
            flags | access::SUPER
        }
    }
}

pub fn field_access(modifiers: Modifiers, in_interface: bool) -> u16 {
    if in_interface {
        return access::PUBLIC | access::STATIC | access::FINAL;
    }
    let mut flags = common_access(modifiers);
    if modifiers.contains(Modifiers::VOLATILE) {
        flags |= access::VOLATILE;
    }
    if modifiers.contains(Modifiers::TRANSIENT) {
        flags |= access::TRANSIENT;
    }
    flags
}

pub fn method_access(modifiers: Modifiers, has_body: bool, in_interface: bool) -> u16 {
    let mut flags = common_access(modifiers);
    if modifiers.contains(Modifiers::SYNCHRONIZED) {
        flags |= access::SYNCHRONIZED;
    }
    if modifiers.contains(Modifiers::ABSTRACT) || !has_body {
        flags |= access::ABSTRACT;
    }
    if in_interface && flags & access::PRIVATE == 0 {
        flags |= access::PUBLIC;
    }
    flags
}

// ============================================================================
// Attributes
// ============================================================================

/// Write `name_index`, `length` and the payload of one attribute.
pub fn write_attribute(
    out: &mut Vec<u8>,
    pool: &mut ConstantPool,
    name: &str,
    payload: &[u8],
) -> Result<(), EmitErrorKind> {
    let name = pool.utf8(name)?;
    out.extend_from_slice(&name.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

/// `Code` attribute payload.
pub fn code_payload(code: &CodeAttribute) -> Vec<u8> {
    let mut out = Vec::with_capacity(code.code.len() + 12);
    out.extend_from_slice(&code.max_stack.to_be_bytes());
    out.extend_from_slice(&code.max_locals.to_be_bytes());
    out.extend_from_slice(&(code.code.len() as u32).to_be_bytes());
    out.extend_from_slice(&code.code);
    out.extend_from_slice(&(code.exception_table.len() as u16).to_be_bytes());
    for entry in &code.exception_table {
        out.extend_from_slice(&entry.start_pc.to_be_bytes());
        out.extend_from_slice(&entry.end_pc.to_be_bytes());
        out.extend_from_slice(&entry.handler_pc.to_be_bytes());
        out.extend_from_slice(&entry.catch_type.to_be_bytes());
    }
    // no nested attributes
    out.extend_from_slice(&0u16.to_be_bytes());
    out
}

/// `Signature` attribute payload.
pub fn signature_payload(pool: &mut ConstantPool, signature: &str) -> Result<Vec<u8>, EmitErrorKind> {
    Ok(pool.utf8(signature)?.to_be_bytes().to_vec())
}

/// `RuntimeVisibleAnnotations` payload.
pub fn annotations_payload(
    pool: &mut ConstantPool,
    descriptors: &mut DescriptorCache,
    annotations: &[AnnotationDef],
) -> Result<Vec<u8>, EmitErrorKind> {
    let mut out = Vec::new();
    out.extend_from_slice(&(annotations.len() as u16).to_be_bytes());
    for annotation in annotations {
        write_annotation(&mut out, pool, descriptors, annotation)?;
    }
    Ok(out)
}

/// `RuntimeVisibleParameterAnnotations` payload.
pub fn parameter_annotations_payload(
    pool: &mut ConstantPool,
    descriptors: &mut DescriptorCache,
    parameters: &[&[AnnotationDef]],
) -> Result<Vec<u8>, EmitErrorKind> {
    let mut out = vec![parameters.len() as u8];
    for annotations in parameters {
        out.extend_from_slice(&annotations_payload(pool, descriptors, annotations)?);
    }
    Ok(out)
}

fn write_annotation(
    out: &mut Vec<u8>,
    pool: &mut ConstantPool,
    descriptors: &mut DescriptorCache,
    annotation: &AnnotationDef,
) -> Result<(), EmitErrorKind> {
    let ty = descriptors.descriptor(&TypeDef::Class(annotation.ty.clone()));
    out.extend_from_slice(&pool.utf8(&ty)?.to_be_bytes());
    out.extend_from_slice(&(annotation.values.len() as u16).to_be_bytes());
    for (name, value) in &annotation.values {
        out.extend_from_slice(&pool.utf8(name)?.to_be_bytes());
        write_element_value(out, pool, descriptors, value)?;
    }
    Ok(())
}

fn write_element_value(
    out: &mut Vec<u8>,
    pool: &mut ConstantPool,
    descriptors: &mut DescriptorCache,
    value: &AnnotationValue,
) -> Result<(), EmitErrorKind> {
    let (tag, index) = match value {
        AnnotationValue::Boolean(v) => (b'Z', pool.integer(i32::from(*v))?),
        AnnotationValue::Byte(v) => (b'B', pool.integer(i32::from(*v))?),
        AnnotationValue::Char(v) => (b'C', pool.integer(i32::from(*v))?),
        AnnotationValue::Short(v) => (b'S', pool.integer(i32::from(*v))?),
        AnnotationValue::Int(v) => (b'I', pool.integer(*v)?),
        AnnotationValue::Long(v) => (b'J', pool.long(*v)?),
        AnnotationValue::Float(v) => (b'F', pool.float(v.into_inner())?),
        AnnotationValue::Double(v) => (b'D', pool.double(v.into_inner())?),
        AnnotationValue::String(v) => (b's', pool.utf8(v)?),
        AnnotationValue::Enum { ty, constant } => {
            let descriptor = descriptors.descriptor(&TypeDef::Class(ty.clone()));
            out.push(b'e');
            out.extend_from_slice(&pool.utf8(&descriptor)?.to_be_bytes());
            out.extend_from_slice(&pool.utf8(constant)?.to_be_bytes());
            return Ok(());
        }
        AnnotationValue::Class(ty) => {
            let descriptor = descriptors.descriptor(ty);
            (b'c', pool.utf8(&descriptor)?)
        }
        AnnotationValue::Annotation(nested) => {
            out.push(b'@');
            return write_annotation(out, pool, descriptors, nested);
        }
        AnnotationValue::Array(values) => {
            out.push(b'[');
            out.extend_from_slice(&(values.len() as u16).to_be_bytes());
            for value in values {
                write_element_value(out, pool, descriptors, value)?;
            }
            return Ok(());
        }
    };
    out.push(tag);
    out.extend_from_slice(&index.to_be_bytes());
    Ok(())
}

// ============================================================================
// Assembly
// ============================================================================

/// Parts of a class file that reference the finished pool.
pub struct ClassFileParts {
    pub major_version: u16,
    pub access: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    /// Serialized `field_info` structures
    pub fields: Vec<Vec<u8>>,
    /// Serialized `method_info` structures
    pub methods: Vec<Vec<u8>>,
    /// Serialized class attributes
    pub attributes: Vec<Vec<u8>>,
}

/// Lay out the class file. The pool must be complete.
pub fn assemble(pool: &ConstantPool, parts: &ClassFileParts) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&parts.major_version.to_be_bytes());
    pool.write(&mut out);
    out.extend_from_slice(&parts.access.to_be_bytes());
    out.extend_from_slice(&parts.this_class.to_be_bytes());
    out.extend_from_slice(&parts.super_class.to_be_bytes());
    out.extend_from_slice(&(parts.interfaces.len() as u16).to_be_bytes());
    for interface in &parts.interfaces {
        out.extend_from_slice(&interface.to_be_bytes());
    }
    for group in [&parts.fields, &parts.methods, &parts.attributes] {
        out.extend_from_slice(&(group.len() as u16).to_be_bytes());
        for item in group {
            out.extend_from_slice(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use classgen_core::{ClassTypeDef, QualifiedName};

    #[test]
    fn class_flags_by_kind() {
        assert_eq!(
            class_access(TypeKind::Class, Modifiers::PUBLIC),
            access::PUBLIC | access::SUPER
        );
        assert_eq!(
            class_access(TypeKind::Interface, Modifiers::PUBLIC),
            access::PUBLIC | access::INTERFACE | access::ABSTRACT
        );
        assert_eq!(
            class_access(TypeKind::Enum, Modifiers::empty()) & access::ENUM,
            access::ENUM
        );
        // nested visibility is dropped
        assert_eq!(
            class_access(TypeKind::Class, Modifiers::PRIVATE | Modifiers::STATIC),
            access::SUPER
        );
    }

    #[test]
    fn bodiless_methods_are_abstract() {
        assert_eq!(
            method_access(Modifiers::empty(), false, true),
            access::PUBLIC | access::ABSTRACT
        );
        assert_eq!(
            method_access(Modifiers::PRIVATE | Modifiers::SYNCHRONIZED, true, false),
            access::PRIVATE | access::SYNCHRONIZED
        );
    }

    #[test]
    fn interface_fields_are_constants() {
        assert_eq!(
            field_access(Modifiers::STATIC, true),
            access::PUBLIC | access::STATIC | access::FINAL
        );
        assert_eq!(
            field_access(Modifiers::PRIVATE | Modifiers::TRANSIENT, false),
            access::PRIVATE | access::TRANSIENT
        );
    }

    #[test]
    fn annotation_encoding() {
        let mut pool = ConstantPool::new();
        let mut descriptors = DescriptorCache::new();
        let annotation = AnnotationDef::builder(ClassTypeDef::of(QualifiedName::new("a", "Tag")))
            .add_member("value", AnnotationValue::Int(3))
            .build();
        let payload = annotations_payload(&mut pool, &mut descriptors, &[annotation]).unwrap();
        // count, type index, pair count, name index, tag, value index
        assert_eq!(payload.len(), 2 + 2 + 2 + 2 + 1 + 2);
        assert_eq!(payload[8], b'I');
        assert_eq!(pool.get(1), Some(&crate::PoolEntry::Utf8("La/Tag;".into())));
    }

    #[test]
    fn assembled_header() {
        let pool = ConstantPool::new();
        let bytes = assemble(
            &pool,
            &ClassFileParts {
                major_version: 49,
                access: access::PUBLIC,
                this_class: 0,
                super_class: 0,
                interfaces: vec![],
                fields: vec![],
                methods: vec![],
                attributes: vec![],
            },
        );
        assert_eq!(&bytes[0..4], &[0xca, 0xfe, 0xba, 0xbe]);
        assert_eq!(&bytes[6..8], &49u16.to_be_bytes());
        assert_eq!(bytes.len(), 4 + 2 + 2 + 2 + 2 + 2 + 2 + 2 + 2 + 2 + 2);
    }
}
