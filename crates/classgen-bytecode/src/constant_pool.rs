//! Class-file constant pool.
//!
//! Entries are deduplicated: adding an identical entry returns the index of
//! the first one. Indices start at 1, and long and double entries occupy
//! two indices. Strings are stored in the modified UTF-8 encoding used by
//! class files.

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use crate::EmitErrorKind;

/// Pool entry tags.
pub mod tag {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELDREF: u8 = 9;
    pub const METHODREF: u8 = 10;
    pub const INTERFACE_METHODREF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
}

/// A constant pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEntry {
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
}

impl PoolEntry {
    fn is_wide(&self) -> bool {
        matches!(self, PoolEntry::Long(_) | PoolEntry::Double(_))
    }
}

/// Hashable form of an entry; floats by total order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PoolKey {
    Utf8(String),
    Integer(i32),
    Float(OrderedFloat<f32>),
    Long(i64),
    Double(OrderedFloat<f64>),
    Class(u16),
    String(u16),
    Fieldref(u16, u16),
    Methodref(u16, u16),
    InterfaceMethodref(u16, u16),
    NameAndType(u16, u16),
}

/// Deduplicating constant pool for one class file.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    /// Entries with their pool index.
    entries: Vec<(u16, PoolEntry)>,
    index: FxHashMap<PoolKey, u16>,
    /// Next free index; the pool count written to the class file.
    next: u32,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self {
            next: 1,
            ..Self::default()
        }
    }

    /// Add an entry or return the index of an identical one.
    pub fn add(&mut self, entry: PoolEntry) -> Result<u16, EmitErrorKind> {
        let key = Self::to_key(&entry);
        if let Some(&idx) = self.index.get(&key) {
            return Ok(idx);
        }

        if let PoolEntry::Utf8(text) = &entry {
            let length = modified_utf8(text).len();
            if length > usize::from(u16::MAX) {
                return Err(EmitErrorKind::DescriptorTooLarge { length });
            }
        }

        let width = if entry.is_wide() { 2 } else { 1 };
        if self.next + width > u32::from(u16::MAX) {
            return Err(EmitErrorKind::ConstantPoolOverflow);
        }
        let idx = self.next as u16;
        self.next += width;
        self.entries.push((idx, entry));
        self.index.insert(key, idx);
        Ok(idx)
    }

    pub fn utf8(&mut self, text: &str) -> Result<u16, EmitErrorKind> {
        self.add(PoolEntry::Utf8(text.to_string()))
    }

    pub fn integer(&mut self, value: i32) -> Result<u16, EmitErrorKind> {
        self.add(PoolEntry::Integer(value))
    }

    pub fn float(&mut self, value: f32) -> Result<u16, EmitErrorKind> {
        self.add(PoolEntry::Float(value))
    }

    pub fn long(&mut self, value: i64) -> Result<u16, EmitErrorKind> {
        self.add(PoolEntry::Long(value))
    }

    pub fn double(&mut self, value: f64) -> Result<u16, EmitErrorKind> {
        self.add(PoolEntry::Double(value))
    }

    /// Class entry for an internal name (or array descriptor).
    pub fn class(&mut self, internal_name: &str) -> Result<u16, EmitErrorKind> {
        let name = self.utf8(internal_name)?;
        self.add(PoolEntry::Class(name))
    }

    pub fn string(&mut self, value: &str) -> Result<u16, EmitErrorKind> {
        let text = self.utf8(value)?;
        self.add(PoolEntry::String(text))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16, EmitErrorKind> {
        let name = self.utf8(name)?;
        let descriptor = self.utf8(descriptor)?;
        self.add(PoolEntry::NameAndType(name, descriptor))
    }

    pub fn field_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, EmitErrorKind> {
        let class = self.class(owner)?;
        let nat = self.name_and_type(name, descriptor)?;
        self.add(PoolEntry::Fieldref(class, nat))
    }

    /// Method reference; interface owners use an interface method entry.
    pub fn method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> Result<u16, EmitErrorKind> {
        let class = self.class(owner)?;
        let nat = self.name_and_type(name, descriptor)?;
        if interface {
            self.add(PoolEntry::InterfaceMethodref(class, nat))
        } else {
            self.add(PoolEntry::Methodref(class, nat))
        }
    }

    /// Entry at a pool index.
    pub fn get(&self, idx: u16) -> Option<&PoolEntry> {
        self.entries
            .binary_search_by_key(&idx, |(i, _)| *i)
            .ok()
            .map(|pos| &self.entries[pos].1)
    }

    /// Pool count as written to the class file (highest index + 1).
    pub fn count(&self) -> u16 {
        self.next as u16
    }

    /// Number of distinct entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the count and all entries.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.count().to_be_bytes());
        for (_, entry) in &self.entries {
            match entry {
                PoolEntry::Utf8(text) => {
                    let bytes = modified_utf8(text);
                    out.push(tag::UTF8);
                    out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
                    out.extend_from_slice(&bytes);
                }
                PoolEntry::Integer(v) => {
                    out.push(tag::INTEGER);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                PoolEntry::Float(v) => {
                    out.push(tag::FLOAT);
                    out.extend_from_slice(&v.to_bits().to_be_bytes());
                }
                PoolEntry::Long(v) => {
                    out.push(tag::LONG);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                PoolEntry::Double(v) => {
                    out.push(tag::DOUBLE);
                    out.extend_from_slice(&v.to_bits().to_be_bytes());
                }
                PoolEntry::Class(name) => {
                    out.push(tag::CLASS);
                    out.extend_from_slice(&name.to_be_bytes());
                }
                PoolEntry::String(text) => {
                    out.push(tag::STRING);
                    out.extend_from_slice(&text.to_be_bytes());
                }
                PoolEntry::Fieldref(class, nat) => write_pair(out, tag::FIELDREF, *class, *nat),
                PoolEntry::Methodref(class, nat) => write_pair(out, tag::METHODREF, *class, *nat),
                PoolEntry::InterfaceMethodref(class, nat) => {
                    write_pair(out, tag::INTERFACE_METHODREF, *class, *nat)
                }
                PoolEntry::NameAndType(name, descriptor) => {
                    write_pair(out, tag::NAME_AND_TYPE, *name, *descriptor)
                }
            }
        }
    }

    fn to_key(entry: &PoolEntry) -> PoolKey {
        match entry {
            PoolEntry::Utf8(text) => PoolKey::Utf8(text.clone()),
            PoolEntry::Integer(v) => PoolKey::Integer(*v),
            PoolEntry::Float(v) => PoolKey::Float(OrderedFloat(*v)),
            PoolEntry::Long(v) => PoolKey::Long(*v),
            PoolEntry::Double(v) => PoolKey::Double(OrderedFloat(*v)),
            PoolEntry::Class(v) => PoolKey::Class(*v),
            PoolEntry::String(v) => PoolKey::String(*v),
            PoolEntry::Fieldref(a, b) => PoolKey::Fieldref(*a, *b),
            PoolEntry::Methodref(a, b) => PoolKey::Methodref(*a, *b),
            PoolEntry::InterfaceMethodref(a, b) => PoolKey::InterfaceMethodref(*a, *b),
            PoolEntry::NameAndType(a, b) => PoolKey::NameAndType(*a, *b),
        }
    }
}

fn write_pair(out: &mut Vec<u8>, tag: u8, first: u16, second: u16) {
    out.push(tag);
    out.extend_from_slice(&first.to_be_bytes());
    out.extend_from_slice(&second.to_be_bytes());
}

/// Encode in modified UTF-8: NUL as two bytes, supplementary characters as
/// surrogate pairs of three bytes each.
pub fn modified_utf8(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for unit in text.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                out.push(0xc0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    out
}

/// Decode modified UTF-8 into UTF-16 code units.
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<Vec<u16>> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(u16::from(b));
            i += 1;
        } else if b & 0xe0 == 0xc0 {
            let b2 = *bytes.get(i + 1)?;
            units.push((u16::from(b & 0x1f) << 6) | u16::from(b2 & 0x3f));
            i += 2;
        } else if b & 0xf0 == 0xe0 {
            let b2 = *bytes.get(i + 1)?;
            let b3 = *bytes.get(i + 2)?;
            units.push(
                (u16::from(b & 0x0f) << 12) | (u16::from(b2 & 0x3f) << 6) | u16::from(b3 & 0x3f),
            );
            i += 3;
        } else {
            return None;
        }
    }
    Some(units)
}
