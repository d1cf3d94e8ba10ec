//! Object heap.
//!
//! Objects live for the lifetime of the [`Vm`](crate::Vm); nothing is
//! collected. String literals are interned so that equal literals are the
//! same object, as the JVM guarantees.

use rustc_hash::FxHashMap;

use crate::error::{Result, VmError};
use crate::value::{ObjectRef, Value};

#[derive(Debug, Clone)]
pub enum ObjectData {
    /// Instance fields by name. Fields not yet written read as zero.
    Fields(FxHashMap<String, Value>),
    Str(String),
    Array {
        /// Component descriptor (`I`, `Ljava/lang/String;`)
        component: String,
        elements: Vec<Value>,
    },
    /// A wrapper (`Integer`, `Boolean`, ...) holding its primitive.
    Boxed(Value),
}

#[derive(Debug, Clone)]
pub struct HeapObject {
    /// Internal class name; arrays use their descriptor.
    pub class: String,
    pub data: ObjectData,
    /// Monitor entry count.
    pub monitor: u32,
}

impl HeapObject {
    pub fn instance(class: impl Into<String>) -> Self {
        Self::with_data(class, ObjectData::Fields(FxHashMap::default()))
    }

    pub fn with_data(class: impl Into<String>, data: ObjectData) -> Self {
        Self {
            class: class.into(),
            data,
            monitor: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
    strings: FxHashMap<String, ObjectRef>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, object: HeapObject) -> ObjectRef {
        let handle = ObjectRef(self.objects.len() as u32);
        self.objects.push(object);
        handle
    }

    /// A fresh string object.
    pub fn string(&mut self, text: impl Into<String>) -> ObjectRef {
        self.allocate(HeapObject::with_data(
            "java/lang/String",
            ObjectData::Str(text.into()),
        ))
    }

    /// The interned string object for a literal.
    pub fn intern(&mut self, text: &str) -> ObjectRef {
        if let Some(existing) = self.strings.get(text) {
            return *existing;
        }
        let handle = self.string(text);
        self.strings.insert(text.to_string(), handle);
        handle
    }

    pub fn get(&self, handle: ObjectRef) -> Result<&HeapObject> {
        self.objects
            .get(handle.0 as usize)
            .ok_or(VmError::DanglingReference(handle.0))
    }

    pub fn get_mut(&mut self, handle: ObjectRef) -> Result<&mut HeapObject> {
        self.objects
            .get_mut(handle.0 as usize)
            .ok_or(VmError::DanglingReference(handle.0))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_are_interned() {
        let mut heap = Heap::new();
        let a = heap.intern("hello");
        let b = heap.intern("hello");
        let c = heap.string("hello");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn dangling_handles_are_errors() {
        let heap = Heap::new();
        assert_eq!(
            heap.get(ObjectRef(3)).unwrap_err(),
            VmError::DanglingReference(3)
        );
    }
}
