//! Class file parsing.
//!
//! Only the parts the interpreter needs are kept: the constant pool,
//! super types, fields and each method's `Code` attribute. Every other
//! attribute is skipped.

use classgen_bytecode::constant_pool::{decode_modified_utf8, tag};

use crate::error::{Result, VmError};

pub mod access {
    pub const STATIC: u16 = 0x0008;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
}

/// A resolved constant pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    Fieldref(u16, u16),
    Methodref(u16, u16),
    InterfaceMethodref(u16, u16),
    NameAndType(u16, u16),
    /// Index 0 and the slot after a long or double.
    Unusable,
}

/// One entry of a method's exception table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handler {
    pub start: u16,
    pub end: u16,
    pub handler: u16,
    /// Pool index of the caught class, 0 for any.
    pub catch_type: u16,
}

#[derive(Debug, Clone)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub bytes: Vec<u8>,
    pub handlers: Vec<Handler>,
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub code: Option<Code>,
}

impl MethodInfo {
    pub fn is_static(&self) -> bool {
        self.access & access::STATIC != 0
    }
}

/// A field or method reference, resolved to names.
#[derive(Debug, Clone, Copy)]
pub struct MemberRef<'a> {
    pub class: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// A parsed class file.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub major_version: u16,
    pub access: u16,
    /// Internal name (`demo/Widget`)
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub constants: Vec<Constant>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        if reader.u32()? != 0xCAFE_BABE {
            return Err(VmError::Malformed("bad magic".into()));
        }
        let _minor = reader.u16()?;
        let major_version = reader.u16()?;
        let constants = read_constants(&mut reader)?;

        let mut class = ClassFile {
            major_version,
            access: reader.u16()?,
            name: String::new(),
            super_name: None,
            interfaces: Vec::new(),
            constants,
            fields: Vec::new(),
            methods: Vec::new(),
        };
        let this_class = reader.u16()?;
        class.name = class.class_name(this_class)?.to_string();
        let super_class = reader.u16()?;
        if super_class != 0 {
            class.super_name = Some(class.class_name(super_class)?.to_string());
        }
        for _ in 0..reader.u16()? {
            let index = reader.u16()?;
            let name = class.class_name(index)?.to_string();
            class.interfaces.push(name);
        }

        for _ in 0..reader.u16()? {
            let access = reader.u16()?;
            let name = class.utf8(reader.u16()?)?.to_string();
            let descriptor = class.utf8(reader.u16()?)?.to_string();
            skip_attributes(&mut reader)?;
            class.fields.push(FieldInfo {
                access,
                name,
                descriptor,
            });
        }

        for _ in 0..reader.u16()? {
            let access = reader.u16()?;
            let name = class.utf8(reader.u16()?)?.to_string();
            let descriptor = class.utf8(reader.u16()?)?.to_string();
            let mut code = None;
            for _ in 0..reader.u16()? {
                let attribute = class.utf8(reader.u16()?)?.to_string();
                let length = reader.u32()? as usize;
                let payload = reader.bytes(length)?;
                if attribute == "Code" {
                    code = Some(read_code(payload)?);
                }
            }
            class.methods.push(MethodInfo {
                access,
                name,
                descriptor,
                code,
            });
        }
        skip_attributes(&mut reader)?;
        Ok(class)
    }

    pub fn is_interface(&self) -> bool {
        self.access & access::INTERFACE != 0
    }

    pub fn constant(&self, index: u16) -> Result<&Constant> {
        self.constants
            .get(index as usize)
            .ok_or(VmError::BadConstant(index))
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.constant(index)? {
            Constant::Utf8(text) => Ok(text),
            _ => Err(VmError::BadConstant(index)),
        }
    }

    /// Name in a class entry: an internal name or an array descriptor.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.constant(index)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(VmError::BadConstant(index)),
        }
    }

    pub fn member_ref(&self, index: u16) -> Result<MemberRef<'_>> {
        let (class, name_and_type) = match self.constant(index)? {
            Constant::Fieldref(c, n)
            | Constant::Methodref(c, n)
            | Constant::InterfaceMethodref(c, n) => (*c, *n),
            _ => return Err(VmError::BadConstant(index)),
        };
        let (name, descriptor) = match self.constant(name_and_type)? {
            Constant::NameAndType(n, d) => (*n, *d),
            _ => return Err(VmError::BadConstant(name_and_type)),
        };
        Ok(MemberRef {
            class: self.class_name(class)?,
            name: self.utf8(name)?,
            descriptor: self.utf8(descriptor)?,
        })
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Parameter descriptors and the return descriptor of a method descriptor.
pub fn split_method_descriptor(descriptor: &str) -> Result<(Vec<&str>, &str)> {
    let malformed = || VmError::Malformed(format!("method descriptor '{descriptor}'"));
    let rest = descriptor.strip_prefix('(').ok_or_else(malformed)?;
    let close = rest.find(')').ok_or_else(malformed)?;
    let (mut params, ret) = (&rest[..close], &rest[close + 1..]);
    let mut out = Vec::new();
    while !params.is_empty() {
        let length = field_descriptor_length(params).ok_or_else(malformed)?;
        out.push(&params[..length]);
        params = &params[length..];
    }
    Ok((out, ret))
}

fn field_descriptor_length(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    match bytes.first()? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => Some(1),
        b'L' => text.find(';').map(|end| end + 1),
        b'[' => field_descriptor_length(&text[1..]).map(|inner| inner + 1),
        _ => None,
    }
}

// ============================================================================
// Reading
// ============================================================================

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.pos + length;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| VmError::Malformed(format!("truncated at offset {}", self.pos)))?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok((u64::from(self.u32()?) << 32) | u64::from(self.u32()?))
    }
}

fn read_constants(reader: &mut Reader<'_>) -> Result<Vec<Constant>> {
    let count = reader.u16()? as usize;
    let mut constants = Vec::with_capacity(count);
    constants.push(Constant::Unusable);
    while constants.len() < count {
        let entry = match reader.u8()? {
            tag::UTF8 => {
                let length = reader.u16()? as usize;
                let units = decode_modified_utf8(reader.bytes(length)?)
                    .ok_or_else(|| VmError::Malformed("invalid modified UTF-8".into()))?;
                Constant::Utf8(String::from_utf16_lossy(&units))
            }
            tag::INTEGER => Constant::Integer(reader.u32()? as i32),
            tag::FLOAT => Constant::Float(f32::from_bits(reader.u32()?)),
            tag::LONG => Constant::Long(reader.u64()? as i64),
            tag::DOUBLE => Constant::Double(f64::from_bits(reader.u64()?)),
            tag::CLASS => Constant::Class(reader.u16()?),
            tag::STRING => Constant::String(reader.u16()?),
            tag::FIELDREF => Constant::Fieldref(reader.u16()?, reader.u16()?),
            tag::METHODREF => Constant::Methodref(reader.u16()?, reader.u16()?),
            tag::INTERFACE_METHODREF => {
                Constant::InterfaceMethodref(reader.u16()?, reader.u16()?)
            }
            tag::NAME_AND_TYPE => Constant::NameAndType(reader.u16()?, reader.u16()?),
            other => {
                return Err(VmError::Malformed(format!(
                    "unsupported constant tag {other}"
                )));
            }
        };
        let wide = matches!(entry, Constant::Long(_) | Constant::Double(_));
        constants.push(entry);
        if wide {
            constants.push(Constant::Unusable);
        }
    }
    Ok(constants)
}

fn skip_attributes(reader: &mut Reader<'_>) -> Result<()> {
    for _ in 0..reader.u16()? {
        let _name = reader.u16()?;
        let length = reader.u32()? as usize;
        reader.bytes(length)?;
    }
    Ok(())
}

fn read_code(payload: &[u8]) -> Result<Code> {
    let mut reader = Reader::new(payload);
    let max_stack = reader.u16()?;
    let max_locals = reader.u16()?;
    let length = reader.u32()? as usize;
    let bytes = reader.bytes(length)?.to_vec();
    let mut handlers = Vec::new();
    for _ in 0..reader.u16()? {
        handlers.push(Handler {
            start: reader.u16()?,
            end: reader.u16()?,
            handler: reader.u16()?,
            catch_type: reader.u16()?,
        });
    }
    skip_attributes(&mut reader)?;
    Ok(Code {
        max_stack,
        max_locals,
        bytes,
        handlers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_descriptors() {
        let (params, ret) = split_method_descriptor("(IJ[Ljava/lang/String;Z)V").unwrap();
        assert_eq!(params, ["I", "J", "[Ljava/lang/String;", "Z"]);
        assert_eq!(ret, "V");

        let (params, ret) = split_method_descriptor("()[[D").unwrap();
        assert!(params.is_empty());
        assert_eq!(ret, "[[D");

        assert!(split_method_descriptor("(Q)V").is_err());
        assert!(split_method_descriptor("I").is_err());
    }

    #[test]
    fn rejects_bad_magic() {
        assert_eq!(
            ClassFile::parse(&[0, 1, 2, 3]).unwrap_err(),
            VmError::Malformed("bad magic".into())
        );
        assert!(matches!(
            ClassFile::parse(&[0xca, 0xfe]),
            Err(VmError::Malformed(_))
        ));
    }
}
