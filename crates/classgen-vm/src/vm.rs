//! The interpreter.
//!
//! Each Java call runs in its own [`Frame`] on the Rust stack. A thrown
//! exception travels up as [`Trap::Throw`] until a frame's exception table
//! has a matching entry for the throwing instruction; exceptions that
//! escape the outermost call become [`VmError::Uncaught`].

use std::sync::Arc;

use classgen_bytecode::OpCode;
use num_enum::TryFromPrimitive;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::builtins::{self, MESSAGE_FIELD};
use crate::class::{ClassFile, Code, Constant, split_method_descriptor};
use crate::error::{Result, VmError};
use crate::heap::{Heap, HeapObject, ObjectData};
use crate::value::{ObjectRef, Value};

/// Maximum nesting of Java calls.
pub const MAX_DEPTH: usize = 512;

/// Why a frame stopped before returning.
#[derive(Debug)]
pub(crate) enum Trap {
    /// A Java exception in flight.
    Throw(ObjectRef),
    Fatal(VmError),
}

impl From<VmError> for Trap {
    fn from(error: VmError) -> Self {
        Trap::Fatal(error)
    }
}

pub(crate) type Exec<T> = std::result::Result<T, Trap>;

/// `newarray` element type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
enum ArrayKind {
    Boolean = 4,
    Char = 5,
    Float = 6,
    Double = 7,
    Byte = 8,
    Short = 9,
    Int = 10,
    Long = 11,
}

impl ArrayKind {
    fn descriptor(self) -> &'static str {
        match self {
            ArrayKind::Boolean => "Z",
            ArrayKind::Char => "C",
            ArrayKind::Float => "F",
            ArrayKind::Double => "D",
            ArrayKind::Byte => "B",
            ArrayKind::Short => "S",
            ArrayKind::Int => "I",
            ArrayKind::Long => "J",
        }
    }
}

/// Internal name from a binary or internal class name.
fn internal(name: &str) -> String {
    name.replace('.', "/")
}

fn binary(name: &str) -> String {
    name.replace('/', ".")
}

/// A reference interpreter for class files.
#[derive(Debug, Default)]
pub struct Vm {
    classes: FxHashMap<String, Arc<ClassFile>>,
    initialized: FxHashSet<String>,
    /// Static fields by (declaring class, name).
    statics: FxHashMap<(String, String), Value>,
    pub(crate) heap: Heap,
    depth: usize,
}

// ============================================================================
// Public API
// ============================================================================

impl Vm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register a class file, returning its binary name. Static
    /// initialization runs on first use.
    #[tracing::instrument(level = "debug", skip_all, fields(bytes = bytes.len()))]
    pub fn load(&mut self, bytes: &[u8]) -> Result<String> {
        let class = ClassFile::parse(bytes)?;
        if self.classes.contains_key(&class.name) || builtins::is_builtin(&class.name) {
            return Err(VmError::DuplicateClass(binary(&class.name)));
        }
        let name = binary(&class.name);
        tracing::debug!(
            class = %name,
            methods = class.methods.len(),
            fields = class.fields.len(),
            "class loaded"
        );
        self.classes.insert(class.name.clone(), Arc::new(class));
        Ok(name)
    }

    pub fn is_loaded(&self, class: &str) -> bool {
        self.classes.contains_key(&internal(class))
    }

    /// Call a static method.
    pub fn invoke_static(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        args: &[Value],
    ) -> Result<Option<Value>> {
        let class = internal(class);
        let result = self
            .ensure_initialized(&class)
            .and_then(|()| self.invoke(&class, name, descriptor, None, args.to_vec()));
        self.finish(result)
    }

    /// Call an instance method with virtual dispatch on `receiver`.
    pub fn invoke_virtual(
        &mut self,
        receiver: Value,
        name: &str,
        descriptor: &str,
        args: &[Value],
    ) -> Result<Option<Value>> {
        let result = match receiver.as_reference()? {
            Some(target) => self.invoke_virtual_ref(target, name, descriptor, args.to_vec()),
            None => Err(self.throw("java/lang/NullPointerException", None)),
        };
        self.finish(result)
    }

    /// Allocate an instance and run the constructor with `descriptor`.
    pub fn new_object(&mut self, class: &str, descriptor: &str, args: &[Value]) -> Result<Value> {
        let class = internal(class);
        let result = self.instantiate(&class, descriptor, args.to_vec());
        self.finish(result)
    }

    /// Read a static field, initializing its class first.
    pub fn get_static(&mut self, class: &str, field: &str) -> Result<Value> {
        let class = internal(class);
        let initialized = self.ensure_initialized(&class);
        self.finish(initialized)?;
        let (owner, descriptor) = self.static_owner(&class, field).ok_or_else(|| {
            VmError::NoSuchField {
                class: binary(&class),
                name: field.to_string(),
            }
        })?;
        Ok(self.static_value(&owner, field, &descriptor))
    }

    /// A new `java.lang.String`.
    pub fn string(&mut self, text: &str) -> Value {
        Value::Ref(self.heap.string(text))
    }

    /// Text of a string value.
    pub fn string_value(&self, value: Value) -> Option<String> {
        match &self.object(value)?.data {
            ObjectData::Str(text) => Some(text.clone()),
            _ => None,
        }
    }

    pub fn array_elements(&self, value: Value) -> Option<Vec<Value>> {
        match &self.object(value)?.data {
            ObjectData::Array { elements, .. } => Some(elements.clone()),
            _ => None,
        }
    }

    /// Primitive held by a wrapper object.
    pub fn unbox(&self, value: Value) -> Option<Value> {
        match &self.object(value)?.data {
            ObjectData::Boxed(inner) => Some(*inner),
            _ => None,
        }
    }

    /// Binary name of the object's class.
    pub fn class_of(&self, value: Value) -> Option<String> {
        self.object(value).map(|object| binary(&object.class))
    }

    /// Current monitor entry count of an object.
    pub fn monitor_count(&self, value: Value) -> Option<u32> {
        self.object(value).map(|object| object.monitor)
    }

    fn object(&self, value: Value) -> Option<&HeapObject> {
        match value {
            Value::Ref(handle) => self.heap.get(handle).ok(),
            _ => None,
        }
    }

    /// Turn an escaping exception into an error.
    fn finish<T>(&mut self, result: Exec<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(Trap::Fatal(error)) => Err(error),
            Err(Trap::Throw(exception)) => {
                let object = self.heap.get(exception)?;
                let class = binary(&object.class);
                let message = match &object.data {
                    ObjectData::Fields(fields) => fields
                        .get(MESSAGE_FIELD)
                        .and_then(|message| self.string_value(*message)),
                    _ => None,
                };
                tracing::debug!(%class, ?message, "uncaught exception");
                Err(VmError::Uncaught { class, message })
            }
        }
    }
}

// ============================================================================
// Classes, dispatch and exceptions
// ============================================================================

impl Vm {
    /// Run `<clinit>` of `class` and its superclasses once.
    pub(crate) fn ensure_initialized(&mut self, class: &str) -> Exec<()> {
        if self.initialized.contains(class) {
            return Ok(());
        }
        let Some(file) = self.classes.get(class).cloned() else {
            return Ok(());
        };
        self.initialized.insert(class.to_string());
        if let Some(super_name) = &file.super_name {
            self.ensure_initialized(super_name)?;
        }
        if let Some(index) = file
            .methods
            .iter()
            .position(|m| m.name == "<clinit>" && m.code.is_some())
        {
            tracing::trace!(class, "running static initializer");
            self.execute(file.clone(), index, None, Vec::new())?;
        }
        Ok(())
    }

    fn instantiate(&mut self, class: &str, descriptor: &str, args: Vec<Value>) -> Exec<Value> {
        self.ensure_initialized(class)?;
        let handle = self.allocate_instance(class)?;
        let receiver = Value::Ref(handle);
        self.invoke(class, "<init>", descriptor, Some(receiver), args)?;
        Ok(receiver)
    }

    fn allocate_instance(&mut self, class: &str) -> Result<ObjectRef> {
        if !self.classes.contains_key(class) && !builtins::is_builtin(class) {
            return Err(VmError::ClassNotFound(binary(class)));
        }
        Ok(self.heap.allocate(HeapObject::instance(class)))
    }

    pub(crate) fn invoke_virtual_ref(
        &mut self,
        target: ObjectRef,
        name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> Exec<Option<Value>> {
        let class = self.heap.get(target)?.class.clone();
        self.invoke(&class, name, descriptor, Some(Value::Ref(target)), args)
    }

    /// Find and run a method, searching from `start` up the superclass
    /// chain and then through default interface methods.
    pub(crate) fn invoke(
        &mut self,
        start: &str,
        name: &str,
        descriptor: &str,
        receiver: Option<Value>,
        args: Vec<Value>,
    ) -> Exec<Option<Value>> {
        let mut current = Some(start.to_string());
        while let Some(class) = current {
            if let Some(file) = self.classes.get(&class).cloned() {
                let found = file.methods.iter().position(|m| {
                    m.name == name && m.descriptor == descriptor && m.code.is_some()
                });
                if let Some(index) = found {
                    return self.execute(file, index, receiver, args);
                }
                current = file.super_name.clone();
            } else if builtins::is_builtin(&class) {
                if let builtins::Outcome::Handled(value) =
                    self.call_builtin(&class, name, descriptor, receiver, &args)?
                {
                    return Ok(value);
                }
                current = builtins::superclass(&class).map(str::to_string);
            } else {
                return Err(VmError::ClassNotFound(binary(&class)).into());
            }
        }

        for interface in self.interfaces_of(start) {
            let Some(file) = self.classes.get(&interface).cloned() else {
                continue;
            };
            let found = file
                .methods
                .iter()
                .position(|m| m.name == name && m.descriptor == descriptor && m.code.is_some());
            if let Some(index) = found {
                return self.execute(file, index, receiver, args);
            }
        }

        Err(VmError::NoSuchMethod {
            class: binary(start),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
        .into())
    }

    /// All interfaces implemented by `class`, nearest first.
    fn interfaces_of(&self, class: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut current = Some(class.to_string());
        let mut pending = Vec::new();
        while let Some(name) = current {
            let Some(file) = self.classes.get(&name) else {
                break;
            };
            pending.extend(file.interfaces.iter().cloned());
            current = file.super_name.clone();
        }
        while !pending.is_empty() {
            let interface = pending.remove(0);
            if out.contains(&interface) {
                continue;
            }
            if let Some(file) = self.classes.get(&interface) {
                pending.extend(file.interfaces.iter().cloned());
            }
            out.push(interface);
        }
        out
    }

    /// Whether values of class `class` are assignable to `target`.
    pub(crate) fn is_subclass(&self, class: &str, target: &str) -> bool {
        if class == target || target == "java/lang/Object" {
            return true;
        }
        if let (Some(component), Some(target_component)) =
            (class.strip_prefix('['), target.strip_prefix('['))
        {
            return match (reference_name(component), reference_name(target_component)) {
                (Some(a), Some(b)) => self.is_subclass(a, b),
                _ => component == target_component,
            };
        }
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            if name == target {
                return true;
            }
            current = match self.classes.get(&name) {
                Some(file) => file.super_name.clone(),
                None => builtins::superclass(&name).map(str::to_string),
            };
        }
        self.interfaces_of(class).iter().any(|i| i == target)
    }

    /// Allocate a built-in exception.
    pub(crate) fn exception(&mut self, class: &str, message: Option<&str>) -> ObjectRef {
        let mut object = HeapObject::instance(class);
        if let Some(message) = message {
            let text = self.heap.string(message);
            if let ObjectData::Fields(fields) = &mut object.data {
                fields.insert(MESSAGE_FIELD.to_string(), Value::Ref(text));
            }
        }
        self.heap.allocate(object)
    }

    pub(crate) fn throw(&mut self, class: &str, message: Option<&str>) -> Trap {
        Trap::Throw(self.exception(class, message))
    }

    fn null_pointer(&mut self) -> Trap {
        self.throw("java/lang/NullPointerException", None)
    }

    /// Class declaring static field `name`, searching up from `class`.
    fn static_owner(&self, class: &str, name: &str) -> Option<(String, String)> {
        let mut current = Some(class.to_string());
        while let Some(owner) = current {
            let file = self.classes.get(&owner)?;
            if let Some(field) = file.fields.iter().find(|f| f.name == name) {
                return Some((owner, field.descriptor.clone()));
            }
            current = file.super_name.clone();
        }
        None
    }

    fn static_value(&self, owner: &str, name: &str, descriptor: &str) -> Value {
        self.statics
            .get(&(owner.to_string(), name.to_string()))
            .copied()
            .unwrap_or_else(|| Value::default_for(descriptor))
    }
}

/// Class name inside a reference component descriptor.
fn reference_name(component: &str) -> Option<&str> {
    if component.starts_with('[') {
        Some(component)
    } else {
        component.strip_prefix('L')?.strip_suffix(';')
    }
}

// ============================================================================
// Execution
// ============================================================================

struct Frame {
    pc: usize,
    /// Offset of the instruction being executed.
    start: usize,
    stack: Vec<Value>,
    locals: Vec<Value>,
}

enum Step {
    Next,
    Return(Option<Value>),
}

impl Frame {
    fn malformed(&self, what: &str) -> VmError {
        VmError::Malformed(format!("{what} at offset {}", self.start))
    }

    fn read_u8(&mut self, code: &[u8]) -> Result<u8> {
        let byte = *code
            .get(self.pc)
            .ok_or_else(|| self.malformed("truncated instruction"))?;
        self.pc += 1;
        Ok(byte)
    }

    fn read_u16(&mut self, code: &[u8]) -> Result<u16> {
        Ok(u16::from_be_bytes([self.read_u8(code)?, self.read_u8(code)?]))
    }

    fn read_i32(&mut self, code: &[u8]) -> Result<i32> {
        let high = self.read_u16(code)?;
        let low = self.read_u16(code)?;
        Ok(((u32::from(high) << 16) | u32::from(low)) as i32)
    }

    fn jump(&mut self, offset: i32) -> Result<()> {
        let target = self.start as i64 + i64::from(offset);
        self.pc = usize::try_from(target).map_err(|_| self.malformed("branch before start"))?;
        Ok(())
    }

    fn push(&mut self, value: impl Into<Value>) {
        self.stack.push(value.into());
    }

    fn pop(&mut self) -> Result<Value> {
        self.stack
            .pop()
            .ok_or(VmError::StackUnderflow { pc: self.start })
    }

    fn pop_n(&mut self, count: usize) -> Result<Vec<Value>> {
        let at = self
            .stack
            .len()
            .checked_sub(count)
            .ok_or(VmError::StackUnderflow { pc: self.start })?;
        Ok(self.stack.split_off(at))
    }

    fn peek(&self) -> Result<Value> {
        self.stack
            .last()
            .copied()
            .ok_or(VmError::StackUnderflow { pc: self.start })
    }

    fn pop_int(&mut self) -> Result<i32> {
        self.pop()?.as_int()
    }

    fn pop_long(&mut self) -> Result<i64> {
        self.pop()?.as_long()
    }

    fn pop_float(&mut self) -> Result<f32> {
        self.pop()?.as_float()
    }

    fn pop_double(&mut self) -> Result<f64> {
        self.pop()?.as_double()
    }

    fn pop_ref(&mut self) -> Result<Option<ObjectRef>> {
        self.pop()?.as_reference()
    }

    fn load(&mut self, index: usize) -> Result<()> {
        let value = *self
            .locals
            .get(index)
            .ok_or_else(|| self.malformed("local index out of range"))?;
        self.stack.push(value);
        Ok(())
    }

    fn store(&mut self, index: usize) -> Result<()> {
        let value = self.pop()?;
        let slot = self
            .locals
            .get_mut(index)
            .ok_or(VmError::Malformed(format!("local {index} out of range")))?;
        *slot = value;
        Ok(())
    }

    fn int_op(&mut self, op: impl Fn(i32, i32) -> i32) -> Result<()> {
        let b = self.pop_int()?;
        let a = self.pop_int()?;
        self.push(op(a, b));
        Ok(())
    }

    fn long_op(&mut self, op: impl Fn(i64, i64) -> i64) -> Result<()> {
        let b = self.pop_long()?;
        let a = self.pop_long()?;
        self.push(op(a, b));
        Ok(())
    }

    fn long_shift(&mut self, op: impl Fn(i64, u32) -> i64) -> Result<()> {
        let b = self.pop_int()?;
        let a = self.pop_long()?;
        self.push(op(a, b as u32));
        Ok(())
    }

    fn float_op(&mut self, op: impl Fn(f32, f32) -> f32) -> Result<()> {
        let b = self.pop_float()?;
        let a = self.pop_float()?;
        self.push(op(a, b));
        Ok(())
    }

    fn double_op(&mut self, op: impl Fn(f64, f64) -> f64) -> Result<()> {
        let b = self.pop_double()?;
        let a = self.pop_double()?;
        self.push(op(a, b));
        Ok(())
    }
}

/// `fcmpl`/`fcmpg` result; `nan` is pushed when either side is NaN.
fn compare_floats<T: PartialOrd>(a: T, b: T, nan: i32) -> i32 {
    match a.partial_cmp(&b) {
        Some(ordering) => ordering as i32,
        None => nan,
    }
}

impl Vm {
    fn execute(
        &mut self,
        class: Arc<ClassFile>,
        index: usize,
        receiver: Option<Value>,
        args: Vec<Value>,
    ) -> Exec<Option<Value>> {
        if self.depth >= MAX_DEPTH {
            return Err(VmError::StackOverflow(MAX_DEPTH).into());
        }
        let method = &class.methods[index];
        let code = method.code.as_ref().ok_or_else(|| VmError::NoSuchMethod {
            class: binary(&class.name),
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
        })?;

        let mut locals = vec![Value::Null; code.max_locals as usize];
        let mut slot = 0;
        for value in receiver.into_iter().chain(args) {
            let cell = locals.get_mut(slot).ok_or_else(|| {
                VmError::Malformed(format!("arguments of {} exceed max_locals", method.name))
            })?;
            *cell = value;
            slot += if value.is_wide() { 2 } else { 1 };
        }

        let mut frame = Frame {
            pc: 0,
            start: 0,
            stack: Vec::with_capacity(code.max_stack as usize),
            locals,
        };
        self.depth += 1;
        let result = self.run_frame(&class, code, &mut frame);
        self.depth -= 1;
        result
    }

    fn run_frame(&mut self, class: &ClassFile, code: &Code, frame: &mut Frame) -> Exec<Option<Value>> {
        loop {
            match self.step(class, code, frame) {
                Ok(Step::Next) => {}
                Ok(Step::Return(value)) => return Ok(value),
                Err(Trap::Throw(exception)) => match self.find_handler(class, code, frame.start, exception)? {
                    Some(handler) => {
                        frame.stack.clear();
                        frame.stack.push(Value::Ref(exception));
                        frame.pc = handler;
                    }
                    None => return Err(Trap::Throw(exception)),
                },
                Err(fatal) => return Err(fatal),
            }
        }
    }

    fn find_handler(
        &self,
        class: &ClassFile,
        code: &Code,
        pc: usize,
        exception: ObjectRef,
    ) -> Result<Option<usize>> {
        let thrown = &self.heap.get(exception)?.class;
        for entry in &code.handlers {
            if !(entry.start as usize..entry.end as usize).contains(&pc) {
                continue;
            }
            if entry.catch_type == 0 || self.is_subclass(thrown, class.class_name(entry.catch_type)?) {
                return Ok(Some(entry.handler as usize));
            }
        }
        Ok(None)
    }

    fn constant(&mut self, class: &ClassFile, index: u16) -> Result<Value> {
        Ok(match class.constant(index)? {
            Constant::Integer(v) => Value::Int(*v),
            Constant::Float(v) => Value::Float(*v),
            Constant::Long(v) => Value::Long(*v),
            Constant::Double(v) => Value::Double(*v),
            Constant::String(text) => Value::Ref(self.heap.intern(class.utf8(*text)?)),
            _ => return Err(VmError::BadConstant(index)),
        })
    }

    fn array_load(&mut self, array: Option<ObjectRef>, index: i32) -> Exec<Value> {
        let array = array.ok_or_else(|| self.null_pointer())?;
        let element = match &self.heap.get(array)?.data {
            ObjectData::Array { elements, .. } => usize::try_from(index)
                .ok()
                .and_then(|i| elements.get(i).copied())
                .ok_or(elements.len()),
            _ => return Err(VmError::TypeMismatch { expected: "array", found: "object" }.into()),
        };
        element.map_err(|length| self.index_out_of_bounds(index, length))
    }

    fn array_store(&mut self, array: Option<ObjectRef>, index: i32, value: Value) -> Exec<()> {
        let array = array.ok_or_else(|| self.null_pointer())?;
        let stored = match &mut self.heap.get_mut(array)?.data {
            ObjectData::Array {
                component,
                elements,
            } => {
                let value = match (component.as_str(), value) {
                    ("Z", Value::Int(v)) => Value::Int(v & 1),
                    ("B", Value::Int(v)) => Value::Int(i32::from(v as i8)),
                    ("C", Value::Int(v)) => Value::Int(i32::from(v as u16)),
                    ("S", Value::Int(v)) => Value::Int(i32::from(v as i16)),
                    (_, value) => value,
                };
                let length = elements.len();
                match usize::try_from(index).ok().and_then(|i| elements.get_mut(i)) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(length),
                }
            }
            _ => return Err(VmError::TypeMismatch { expected: "array", found: "object" }.into()),
        };
        stored.map_err(|length| self.index_out_of_bounds(index, length))
    }

    fn index_out_of_bounds(&mut self, index: i32, length: usize) -> Trap {
        let message = format!("Index {index} out of bounds for length {length}");
        self.throw("java/lang/ArrayIndexOutOfBoundsException", Some(&message))
    }

    fn new_array(&mut self, component: String, count: i32) -> Exec<Value> {
        let Ok(length) = usize::try_from(count) else {
            let message = count.to_string();
            return Err(self.throw("java/lang/NegativeArraySizeException", Some(&message)));
        };
        let elements = vec![Value::default_for(&component); length];
        let object = HeapObject::with_data(
            format!("[{component}"),
            ObjectData::Array {
                component,
                elements,
            },
        );
        Ok(Value::Ref(self.heap.allocate(object)))
    }

    fn invoke_instruction(&mut self, op: OpCode, class: &ClassFile, f: &mut Frame, index: u16) -> Exec<()> {
        let member = class.member_ref(index)?;
        let (parameters, ret) = split_method_descriptor(member.descriptor)?;
        let args = f.pop_n(parameters.len())?;
        let returns_value = ret != "V";

        let result = if op == OpCode::Invokestatic {
            self.ensure_initialized(member.class)?;
            self.invoke(member.class, member.name, member.descriptor, None, args)?
        } else {
            let receiver = f.pop()?;
            let Some(target) = receiver.as_reference()? else {
                return Err(self.null_pointer());
            };
            if op == OpCode::Invokespecial {
                self.invoke(member.class, member.name, member.descriptor, Some(receiver), args)?
            } else {
                self.invoke_virtual_ref(target, member.name, member.descriptor, args)?
            }
        };

        match (returns_value, result) {
            (true, Some(value)) => f.push(value),
            (false, _) => {}
            (true, None) => {
                return Err(VmError::TypeMismatch {
                    expected: "return value",
                    found: "void",
                }
                .into());
            }
        }
        Ok(())
    }

    fn step(&mut self, class: &ClassFile, code: &Code, f: &mut Frame) -> Exec<Step> {
        use OpCode::*;

        let bytes = code.bytes.as_slice();
        f.start = f.pc;
        let byte = f.read_u8(bytes)?;
        let op = OpCode::try_from(byte).map_err(|_| VmError::InvalidOpcode {
            opcode: byte,
            pc: f.start,
        })?;

        match op {
            Nop => {}

            // ================================================================
            // Constants
            // ================================================================
            AconstNull => f.push(Value::Null),
            IconstM1 => f.push(-1),
            Iconst0 => f.push(0),
            Iconst1 => f.push(1),
            Iconst2 => f.push(2),
            Iconst3 => f.push(3),
            Iconst4 => f.push(4),
            Iconst5 => f.push(5),
            Lconst0 => f.push(0i64),
            Lconst1 => f.push(1i64),
            Fconst0 => f.push(0.0f32),
            Fconst1 => f.push(1.0f32),
            Fconst2 => f.push(2.0f32),
            Dconst0 => f.push(0.0f64),
            Dconst1 => f.push(1.0f64),
            Bipush => {
                let value = f.read_u8(bytes)? as i8;
                f.push(i32::from(value));
            }
            Sipush => {
                let value = f.read_u16(bytes)? as i16;
                f.push(i32::from(value));
            }
            Ldc => {
                let index = u16::from(f.read_u8(bytes)?);
                let value = self.constant(class, index)?;
                f.push(value);
            }
            LdcW | Ldc2W => {
                let index = f.read_u16(bytes)?;
                let value = self.constant(class, index)?;
                f.push(value);
            }

            // ================================================================
            // Locals
            // ================================================================
            Iload | Lload | Fload | Dload | Aload => {
                let index = f.read_u8(bytes)?;
                f.load(index as usize)?;
            }
            Iload0 | Lload0 | Fload0 | Dload0 | Aload0 => f.load(0)?,
            Iload1 | Lload1 | Fload1 | Dload1 | Aload1 => f.load(1)?,
            Iload2 | Lload2 | Fload2 | Dload2 | Aload2 => f.load(2)?,
            Iload3 | Lload3 | Fload3 | Dload3 | Aload3 => f.load(3)?,
            Istore | Lstore | Fstore | Dstore | Astore => {
                let index = f.read_u8(bytes)?;
                f.store(index as usize)?;
            }
            Istore0 | Lstore0 | Fstore0 | Dstore0 | Astore0 => f.store(0)?,
            Istore1 | Lstore1 | Fstore1 | Dstore1 | Astore1 => f.store(1)?,
            Istore2 | Lstore2 | Fstore2 | Dstore2 | Astore2 => f.store(2)?,
            Istore3 | Lstore3 | Fstore3 | Dstore3 | Astore3 => f.store(3)?,
            Iinc => {
                let index = f.read_u8(bytes)? as usize;
                let delta = i32::from(f.read_u8(bytes)? as i8);
                f.load(index)?;
                let value = f.pop_int()?.wrapping_add(delta);
                f.push(value);
                f.store(index)?;
            }
            Wide => {
                let inner = f.read_u8(bytes)?;
                let inner = OpCode::try_from(inner).map_err(|_| VmError::InvalidOpcode {
                    opcode: inner,
                    pc: f.start,
                })?;
                let index = f.read_u16(bytes)? as usize;
                match inner {
                    Iload | Lload | Fload | Dload | Aload => f.load(index)?,
                    Istore | Lstore | Fstore | Dstore | Astore => f.store(index)?,
                    Iinc => {
                        let delta = i32::from(f.read_u16(bytes)? as i16);
                        f.load(index)?;
                        let value = f.pop_int()?.wrapping_add(delta);
                        f.push(value);
                        f.store(index)?;
                    }
                    _ => {
                        return Err(VmError::InvalidOpcode {
                            opcode: u8::from(inner),
                            pc: f.start,
                        }
                        .into());
                    }
                }
            }

            // ================================================================
            // Arrays
            // ================================================================
            Iaload | Laload | Faload | Daload | Aaload | Baload | Caload | Saload => {
                let index = f.pop_int()?;
                let array = f.pop_ref()?;
                let value = self.array_load(array, index)?;
                f.push(value);
            }
            Iastore | Lastore | Fastore | Dastore | Aastore | Bastore | Castore | Sastore => {
                let value = f.pop()?;
                let index = f.pop_int()?;
                let array = f.pop_ref()?;
                self.array_store(array, index, value)?;
            }
            Newarray => {
                let code = f.read_u8(bytes)?;
                let kind = ArrayKind::try_from_primitive(code)
                    .map_err(|_| f.malformed("unknown newarray type"))?;
                let count = f.pop_int()?;
                let array = self.new_array(kind.descriptor().to_string(), count)?;
                f.push(array);
            }
            Anewarray => {
                let index = f.read_u16(bytes)?;
                let name = class.class_name(index)?;
                let component = if name.starts_with('[') {
                    name.to_string()
                } else {
                    format!("L{name};")
                };
                let count = f.pop_int()?;
                let array = self.new_array(component, count)?;
                f.push(array);
            }
            Arraylength => {
                let Some(array) = f.pop_ref()? else {
                    return Err(self.null_pointer());
                };
                let length = match &self.heap.get(array)?.data {
                    ObjectData::Array { elements, .. } => elements.len() as i32,
                    _ => {
                        return Err(VmError::TypeMismatch {
                            expected: "array",
                            found: "object",
                        }
                        .into());
                    }
                };
                f.push(length);
            }

            // ================================================================
            // Stack
            // ================================================================
            Pop => {
                f.pop()?;
            }
            Pop2 => {
                if !f.pop()?.is_wide() {
                    f.pop()?;
                }
            }
            Dup => {
                let value = f.peek()?;
                f.push(value);
            }
            DupX1 => {
                let a = f.pop()?;
                let b = f.pop()?;
                f.stack.extend([a, b, a]);
            }
            DupX2 => {
                let a = f.pop()?;
                let b = f.pop()?;
                if b.is_wide() {
                    f.stack.extend([a, b, a]);
                } else {
                    let c = f.pop()?;
                    f.stack.extend([a, c, b, a]);
                }
            }
            Dup2 => {
                let a = f.pop()?;
                if a.is_wide() {
                    f.stack.extend([a, a]);
                } else {
                    let b = f.pop()?;
                    f.stack.extend([b, a, b, a]);
                }
            }
            Dup2X1 => {
                let a = f.pop()?;
                if a.is_wide() {
                    let b = f.pop()?;
                    f.stack.extend([a, b, a]);
                } else {
                    let b = f.pop()?;
                    let c = f.pop()?;
                    f.stack.extend([b, a, c, b, a]);
                }
            }
            Dup2X2 => {
                let a = f.pop()?;
                if a.is_wide() {
                    let b = f.pop()?;
                    if b.is_wide() {
                        f.stack.extend([a, b, a]);
                    } else {
                        let c = f.pop()?;
                        f.stack.extend([a, c, b, a]);
                    }
                } else {
                    let b = f.pop()?;
                    let c = f.pop()?;
                    if c.is_wide() {
                        f.stack.extend([b, a, c, b, a]);
                    } else {
                        let d = f.pop()?;
                        f.stack.extend([b, a, d, c, b, a]);
                    }
                }
            }
            Swap => {
                let a = f.pop()?;
                let b = f.pop()?;
                f.stack.extend([a, b]);
            }

            // ================================================================
            // Arithmetic
            // ================================================================
            Iadd => f.int_op(i32::wrapping_add)?,
            Isub => f.int_op(i32::wrapping_sub)?,
            Imul => f.int_op(i32::wrapping_mul)?,
            Idiv | Irem => {
                let b = f.pop_int()?;
                let a = f.pop_int()?;
                if b == 0 {
                    return Err(self.throw("java/lang/ArithmeticException", Some("/ by zero")));
                }
                f.push(if op == Idiv { a.wrapping_div(b) } else { a.wrapping_rem(b) });
            }
            Ladd => f.long_op(i64::wrapping_add)?,
            Lsub => f.long_op(i64::wrapping_sub)?,
            Lmul => f.long_op(i64::wrapping_mul)?,
            Ldiv | Lrem => {
                let b = f.pop_long()?;
                let a = f.pop_long()?;
                if b == 0 {
                    return Err(self.throw("java/lang/ArithmeticException", Some("/ by zero")));
                }
                f.push(if op == Ldiv { a.wrapping_div(b) } else { a.wrapping_rem(b) });
            }
            Fadd => f.float_op(|a, b| a + b)?,
            Fsub => f.float_op(|a, b| a - b)?,
            Fmul => f.float_op(|a, b| a * b)?,
            Fdiv => f.float_op(|a, b| a / b)?,
            Frem => f.float_op(|a, b| a % b)?,
            Dadd => f.double_op(|a, b| a + b)?,
            Dsub => f.double_op(|a, b| a - b)?,
            Dmul => f.double_op(|a, b| a * b)?,
            Ddiv => f.double_op(|a, b| a / b)?,
            Drem => f.double_op(|a, b| a % b)?,
            Ineg => {
                let v = f.pop_int()?;
                f.push(v.wrapping_neg());
            }
            Lneg => {
                let v = f.pop_long()?;
                f.push(v.wrapping_neg());
            }
            Fneg => {
                let v = f.pop_float()?;
                f.push(-v);
            }
            Dneg => {
                let v = f.pop_double()?;
                f.push(-v);
            }
            Ishl => f.int_op(|a, b| a.wrapping_shl(b as u32))?,
            Ishr => f.int_op(|a, b| a.wrapping_shr(b as u32))?,
            Iushr => f.int_op(|a, b| (a as u32).wrapping_shr(b as u32) as i32)?,
            Lshl => f.long_shift(i64::wrapping_shl)?,
            Lshr => f.long_shift(i64::wrapping_shr)?,
            Lushr => f.long_shift(|a, b| (a as u64).wrapping_shr(b) as i64)?,
            Iand => f.int_op(|a, b| a & b)?,
            Ior => f.int_op(|a, b| a | b)?,
            Ixor => f.int_op(|a, b| a ^ b)?,
            Land => f.long_op(|a, b| a & b)?,
            Lor => f.long_op(|a, b| a | b)?,
            Lxor => f.long_op(|a, b| a ^ b)?,

            // ================================================================
            // Conversions and comparisons
            // ================================================================
            I2l => {
                let v = f.pop_int()?;
                f.push(i64::from(v));
            }
            I2f => {
                let v = f.pop_int()?;
                f.push(v as f32);
            }
            I2d => {
                let v = f.pop_int()?;
                f.push(f64::from(v));
            }
            L2i => {
                let v = f.pop_long()?;
                f.push(v as i32);
            }
            L2f => {
                let v = f.pop_long()?;
                f.push(v as f32);
            }
            L2d => {
                let v = f.pop_long()?;
                f.push(v as f64);
            }
            F2i => {
                let v = f.pop_float()?;
                f.push(v as i32);
            }
            F2l => {
                let v = f.pop_float()?;
                f.push(v as i64);
            }
            F2d => {
                let v = f.pop_float()?;
                f.push(f64::from(v));
            }
            D2i => {
                let v = f.pop_double()?;
                f.push(v as i32);
            }
            D2l => {
                let v = f.pop_double()?;
                f.push(v as i64);
            }
            D2f => {
                let v = f.pop_double()?;
                f.push(v as f32);
            }
            I2b => {
                let v = f.pop_int()?;
                f.push(i32::from(v as i8));
            }
            I2c => {
                let v = f.pop_int()?;
                f.push(i32::from(v as u16));
            }
            I2s => {
                let v = f.pop_int()?;
                f.push(i32::from(v as i16));
            }
            Lcmp => {
                let b = f.pop_long()?;
                let a = f.pop_long()?;
                f.push(a.cmp(&b) as i32);
            }
            Fcmpl | Fcmpg => {
                let b = f.pop_float()?;
                let a = f.pop_float()?;
                f.push(compare_floats(a, b, if op == Fcmpl { -1 } else { 1 }));
            }
            Dcmpl | Dcmpg => {
                let b = f.pop_double()?;
                let a = f.pop_double()?;
                f.push(compare_floats(a, b, if op == Dcmpl { -1 } else { 1 }));
            }

            // ================================================================
            // Control flow
            // ================================================================
            Ifeq | Ifne | Iflt | Ifge | Ifgt | Ifle => {
                let offset = i32::from(f.read_u16(bytes)? as i16);
                let v = f.pop_int()?;
                let taken = match op {
                    Ifeq => v == 0,
                    Ifne => v != 0,
                    Iflt => v < 0,
                    Ifge => v >= 0,
                    Ifgt => v > 0,
                    _ => v <= 0,
                };
                if taken {
                    f.jump(offset)?;
                }
            }
            IfIcmpeq | IfIcmpne | IfIcmplt | IfIcmpge | IfIcmpgt | IfIcmple => {
                let offset = i32::from(f.read_u16(bytes)? as i16);
                let b = f.pop_int()?;
                let a = f.pop_int()?;
                let taken = match op {
                    IfIcmpeq => a == b,
                    IfIcmpne => a != b,
                    IfIcmplt => a < b,
                    IfIcmpge => a >= b,
                    IfIcmpgt => a > b,
                    _ => a <= b,
                };
                if taken {
                    f.jump(offset)?;
                }
            }
            IfAcmpeq | IfAcmpne => {
                let offset = i32::from(f.read_u16(bytes)? as i16);
                let b = f.pop_ref()?;
                let a = f.pop_ref()?;
                if (a == b) == (op == IfAcmpeq) {
                    f.jump(offset)?;
                }
            }
            Ifnull | Ifnonnull => {
                let offset = i32::from(f.read_u16(bytes)? as i16);
                let is_null = f.pop_ref()?.is_none();
                if is_null == (op == Ifnull) {
                    f.jump(offset)?;
                }
            }
            Goto => {
                let offset = i32::from(f.read_u16(bytes)? as i16);
                f.jump(offset)?;
            }
            Tableswitch => {
                let key = f.pop_int()?;
                f.pc = (f.start + 4) & !3;
                let default = f.read_i32(bytes)?;
                let low = f.read_i32(bytes)?;
                let high = f.read_i32(bytes)?;
                let offset = if key < low || key > high {
                    default
                } else {
                    f.pc += 4 * (key as i64 - low as i64) as usize;
                    f.read_i32(bytes)?
                };
                f.jump(offset)?;
            }
            Lookupswitch => {
                let key = f.pop_int()?;
                f.pc = (f.start + 4) & !3;
                let default = f.read_i32(bytes)?;
                let pairs = f.read_i32(bytes)?;
                let mut offset = default;
                for _ in 0..pairs {
                    let candidate = f.read_i32(bytes)?;
                    let target = f.read_i32(bytes)?;
                    if candidate == key {
                        offset = target;
                        break;
                    }
                }
                f.jump(offset)?;
            }
            Ireturn | Lreturn | Freturn | Dreturn | Areturn => {
                return Ok(Step::Return(Some(f.pop()?)));
            }
            Return => return Ok(Step::Return(None)),
            Athrow => {
                let Some(exception) = f.pop_ref()? else {
                    return Err(self.null_pointer());
                };
                return Err(Trap::Throw(exception));
            }

            // ================================================================
            // Fields
            // ================================================================
            Getstatic | Putstatic => {
                let index = f.read_u16(bytes)?;
                let member = class.member_ref(index)?;
                self.ensure_initialized(member.class)?;
                let owner = self
                    .static_owner(member.class, member.name)
                    .map_or_else(|| member.class.to_string(), |(owner, _)| owner);
                if op == Getstatic {
                    let value = self.static_value(&owner, member.name, member.descriptor);
                    f.push(value);
                } else {
                    let value = f.pop()?;
                    self.statics.insert((owner, member.name.to_string()), value);
                }
            }
            Getfield => {
                let index = f.read_u16(bytes)?;
                let member = class.member_ref(index)?;
                let Some(target) = f.pop_ref()? else {
                    return Err(self.null_pointer());
                };
                let value = match &self.heap.get(target)?.data {
                    ObjectData::Fields(fields) => fields
                        .get(member.name)
                        .copied()
                        .unwrap_or_else(|| Value::default_for(member.descriptor)),
                    _ => {
                        return Err(VmError::NoSuchField {
                            class: binary(member.class),
                            name: member.name.to_string(),
                        }
                        .into());
                    }
                };
                f.push(value);
            }
            Putfield => {
                let index = f.read_u16(bytes)?;
                let member = class.member_ref(index)?;
                let value = f.pop()?;
                let Some(target) = f.pop_ref()? else {
                    return Err(self.null_pointer());
                };
                match &mut self.heap.get_mut(target)?.data {
                    ObjectData::Fields(fields) => {
                        fields.insert(member.name.to_string(), value);
                    }
                    _ => {
                        return Err(VmError::NoSuchField {
                            class: binary(member.class),
                            name: member.name.to_string(),
                        }
                        .into());
                    }
                }
            }

            // ================================================================
            // Calls and objects
            // ================================================================
            Invokevirtual | Invokespecial | Invokestatic => {
                let index = f.read_u16(bytes)?;
                self.invoke_instruction(op, class, f, index)?;
            }
            Invokeinterface => {
                let index = f.read_u16(bytes)?;
                let _count = f.read_u8(bytes)?;
                let _zero = f.read_u8(bytes)?;
                self.invoke_instruction(op, class, f, index)?;
            }
            New => {
                let index = f.read_u16(bytes)?;
                let name = class.class_name(index)?;
                self.ensure_initialized(name)?;
                let object = self.allocate_instance(name)?;
                f.push(object);
            }
            Checkcast => {
                let index = f.read_u16(bytes)?;
                let target = class.class_name(index)?;
                if let Some(object) = f.peek()?.as_reference()? {
                    let actual = self.heap.get(object)?.class.clone();
                    if !self.is_subclass(&actual, target) {
                        let message = format!(
                            "class {} cannot be cast to class {}",
                            binary(&actual),
                            binary(target)
                        );
                        return Err(self.throw("java/lang/ClassCastException", Some(&message)));
                    }
                }
            }
            Instanceof => {
                let index = f.read_u16(bytes)?;
                let target = class.class_name(index)?;
                let result = match f.pop_ref()? {
                    Some(object) => {
                        let actual = &self.heap.get(object)?.class;
                        self.is_subclass(actual, target)
                    }
                    None => false,
                };
                f.push(result);
            }
            Monitorenter => {
                let Some(object) = f.pop_ref()? else {
                    return Err(self.null_pointer());
                };
                self.heap.get_mut(object)?.monitor += 1;
            }
            Monitorexit => {
                let Some(object) = f.pop_ref()? else {
                    return Err(self.null_pointer());
                };
                if self.heap.get(object)?.monitor == 0 {
                    return Err(self.throw("java/lang/IllegalMonitorStateException", None));
                }
                self.heap.get_mut(object)?.monitor -= 1;
            }
        }
        Ok(Step::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_exceptions_are_throwables() {
        let vm = Vm::new();
        assert!(vm.is_subclass("java/lang/IllegalArgumentException", "java/lang/RuntimeException"));
        assert!(vm.is_subclass("java/lang/ArithmeticException", "java/lang/Throwable"));
        assert!(!vm.is_subclass("java/lang/Throwable", "java/lang/Exception"));
        assert!(vm.is_subclass("java/lang/String", "java/lang/Object"));
    }

    #[test]
    fn array_assignability() {
        let vm = Vm::new();
        assert!(vm.is_subclass("[Ljava/lang/String;", "[Ljava/lang/Object;"));
        assert!(vm.is_subclass("[I", "java/lang/Object"));
        assert!(!vm.is_subclass("[I", "[J"));
        assert!(!vm.is_subclass("[I", "[Ljava/lang/Object;"));
    }

    #[test]
    fn unknown_class_is_reported() {
        let mut vm = Vm::new();
        assert_eq!(
            vm.invoke_static("demo.Missing", "run", "()V", &[]),
            Err(VmError::ClassNotFound("demo.Missing".into()))
        );
        assert!(!vm.is_loaded("demo.Missing"));
    }

    #[test]
    fn escaped_exception_carries_message() {
        let mut vm = Vm::new();
        let trap = vm.throw("java/lang/IllegalStateException", Some("closed"));
        assert_eq!(
            vm.finish::<()>(Err(trap)),
            Err(VmError::Uncaught {
                class: "java.lang.IllegalStateException".into(),
                message: Some("closed".into()),
            })
        );
    }

    #[test]
    fn float_comparison_nan_bias() {
        assert_eq!(compare_floats(1.0f32, 2.0, -1), -1);
        assert_eq!(compare_floats(f32::NAN, 2.0, -1), -1);
        assert_eq!(compare_floats(f64::NAN, 2.0, 1), 1);
        assert_eq!(compare_floats(3.0f64, 3.0, 1), 0);
    }
}
