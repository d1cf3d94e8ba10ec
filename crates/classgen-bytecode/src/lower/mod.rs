//! Body lowering: code trees to JVM instructions.
//!
//! [`MethodLowering`] walks one method body and writes into a
//! [`CodeBuffer`]. Expressions leave exactly one value of their type on the
//! operand stack (none for `void`); statements leave the stack as they
//! found it. The submodules add the lowering of each node family:
//!
//! - `expr`: values, operators, arrays and casts
//! - `condition`: boolean expressions lowered straight to branches
//! - `coerce`: primitive conversions, boxing and unboxing
//! - `invoke`: variables, field access, calls and instantiation
//! - `stmt`: statements and blocks
//! - `switch`: integer and string switches
//! - `finally`: try/catch/finally, resources and `synchronized`

mod coerce;
mod condition;
mod expr;
mod finally;
mod invoke;
mod stmt;
mod switch;

pub use switch::string_hash;

use classgen_core::{ClassTypeDef, MethodDef, PrimitiveKind, TypeDef, TypeHash};
use rustc_hash::FxHashSet;

use crate::code::{CodeAttribute, CodeBuffer, SlotKind};
use crate::constant_pool::ConstantPool;
use crate::descriptor::DescriptorCache;
use crate::locals::LocalSlots;
use crate::{EmitErrorKind, OpCode, WriterOptions};

use finally::FinallyFrame;

type Result<T> = std::result::Result<T, EmitErrorKind>;

/// What every method body of one class needs to know about the class.
#[derive(Debug)]
pub(crate) struct ClassContext {
    pub this_type: ClassTypeDef,
    pub is_interface: bool,
    /// Signature keys of private instance methods; calls to them are
    /// dispatched non-virtually.
    pub private_methods: FxHashSet<TypeHash>,
}

impl ClassContext {
    /// Signature key matching [`MethodDef::signature_key`].
    pub fn method_key(name: &str, parameters: &[TypeDef]) -> TypeHash {
        let hashes: Vec<TypeHash> = parameters.iter().map(|p| p.erasure().type_hash()).collect();
        TypeHash::from_method(name, &hashes)
    }
}

/// Lowering state of one method body.
pub(crate) struct MethodLowering<'a> {
    class: &'a ClassContext,
    pool: &'a mut ConstantPool,
    descriptors: &'a mut DescriptorCache,
    options: &'a WriterOptions,
    code: CodeBuffer,
    locals: LocalSlots,
    is_static: bool,
    return_type: TypeDef,
    /// Enclosing finally blocks and monitors, innermost last.
    frames: Vec<FinallyFrame>,
}

/// Lower the body of `method`. The method must have a body.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn lower_method(
    class: &ClassContext,
    pool: &mut ConstantPool,
    descriptors: &mut DescriptorCache,
    options: &WriterOptions,
    method: &MethodDef,
) -> Result<CodeAttribute> {
    let body = method.body().ok_or(EmitErrorKind::UnresolvedBody)?;
    let mut lowering = MethodLowering {
        class,
        pool,
        descriptors,
        options,
        code: CodeBuffer::new(),
        locals: LocalSlots::new(),
        is_static: method.is_static(),
        return_type: method.return_type.clone(),
        frames: Vec::new(),
    };

    if !lowering.is_static {
        lowering.locals.reserve_receiver()?;
    }
    for parameter in &method.parameters {
        lowering
            .locals
            .declare_parameter(&parameter.name, parameter.ty.clone())?;
    }
    let argument_slots = lowering.locals.in_use() as usize;
    if argument_slots > 255 {
        return Err(EmitErrorKind::TooManyArguments {
            count: argument_slots,
        });
    }

    lowering.statement(body)?;
    if lowering.code.is_reachable() {
        if !lowering.return_type.is_void() {
            return Err(EmitErrorKind::MissingReturn);
        }
        lowering.code.op(OpCode::Return)?;
    }

    let max_locals = lowering.locals.max_locals();
    lowering.code.finish(max_locals)
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Local slot category of values of a type.
pub(crate) fn slot_kind(ty: &TypeDef) -> SlotKind {
    match ty.as_primitive().map(PrimitiveKind::stack_kind) {
        Some(PrimitiveKind::Long) => SlotKind::Long,
        Some(PrimitiveKind::Float) => SlotKind::Float,
        Some(PrimitiveKind::Double) => SlotKind::Double,
        Some(_) => SlotKind::Int,
        None => SlotKind::Reference,
    }
}

fn return_op(ty: &TypeDef) -> OpCode {
    if ty.is_void() {
        return OpCode::Return;
    }
    match slot_kind(ty) {
        SlotKind::Int => OpCode::Ireturn,
        SlotKind::Long => OpCode::Lreturn,
        SlotKind::Float => OpCode::Freturn,
        SlotKind::Double => OpCode::Dreturn,
        SlotKind::Reference => OpCode::Areturn,
    }
}

fn array_load_op(component: &TypeDef) -> OpCode {
    match component.as_primitive() {
        Some(PrimitiveKind::Boolean | PrimitiveKind::Byte) => OpCode::Baload,
        Some(PrimitiveKind::Char) => OpCode::Caload,
        Some(PrimitiveKind::Short) => OpCode::Saload,
        Some(PrimitiveKind::Int) => OpCode::Iaload,
        Some(PrimitiveKind::Long) => OpCode::Laload,
        Some(PrimitiveKind::Float) => OpCode::Faload,
        Some(PrimitiveKind::Double) => OpCode::Daload,
        None => OpCode::Aaload,
    }
}

fn array_store_op(component: &TypeDef) -> OpCode {
    match component.as_primitive() {
        Some(PrimitiveKind::Boolean | PrimitiveKind::Byte) => OpCode::Bastore,
        Some(PrimitiveKind::Char) => OpCode::Castore,
        Some(PrimitiveKind::Short) => OpCode::Sastore,
        Some(PrimitiveKind::Int) => OpCode::Iastore,
        Some(PrimitiveKind::Long) => OpCode::Lastore,
        Some(PrimitiveKind::Float) => OpCode::Fastore,
        Some(PrimitiveKind::Double) => OpCode::Dastore,
        None => OpCode::Aastore,
    }
}

impl MethodLowering<'_> {
    /// Push an int constant with the shortest encoding.
    fn push_int(&mut self, value: i32) -> Result<()> {
        use OpCode::*;
        match value {
            -1 => self.code.op(IconstM1),
            0 => self.code.op(Iconst0),
            1 => self.code.op(Iconst1),
            2 => self.code.op(Iconst2),
            3 => self.code.op(Iconst3),
            4 => self.code.op(Iconst4),
            5 => self.code.op(Iconst5),
            v if i8::try_from(v).is_ok() => {
                self.code.op(Bipush)?;
                self.code.write_u8(v as i8 as u8);
                Ok(())
            }
            v if i16::try_from(v).is_ok() => {
                self.code.op(Sipush)?;
                self.code.write_u16(v as i16 as u16);
                Ok(())
            }
            v => {
                let index = self.pool.integer(v)?;
                self.ldc(index)
            }
        }
    }

    fn push_long(&mut self, value: i64) -> Result<()> {
        match value {
            0 => self.code.op(OpCode::Lconst0),
            1 => self.code.op(OpCode::Lconst1),
            v => {
                let index = self.pool.long(v)?;
                self.code.op_u16(OpCode::Ldc2W, index)
            }
        }
    }

    fn push_float(&mut self, value: f32) -> Result<()> {
        // Bit comparison keeps -0.0 out of fconst_0.
        if value.to_bits() == 0.0f32.to_bits() {
            self.code.op(OpCode::Fconst0)
        } else if value == 1.0 {
            self.code.op(OpCode::Fconst1)
        } else if value == 2.0 {
            self.code.op(OpCode::Fconst2)
        } else {
            let index = self.pool.float(value)?;
            self.ldc(index)
        }
    }

    fn push_double(&mut self, value: f64) -> Result<()> {
        if value.to_bits() == 0.0f64.to_bits() {
            self.code.op(OpCode::Dconst0)
        } else if value == 1.0 {
            self.code.op(OpCode::Dconst1)
        } else {
            let index = self.pool.double(value)?;
            self.code.op_u16(OpCode::Ldc2W, index)
        }
    }

    /// `ldc` for single-slot pool constants.
    fn ldc(&mut self, index: u16) -> Result<()> {
        match u8::try_from(index) {
            Ok(short) => {
                self.code.op(OpCode::Ldc)?;
                self.code.write_u8(short);
                Ok(())
            }
            Err(_) => self.code.op_u16(OpCode::LdcW, index),
        }
    }

    /// Pool index of the class entry for a type.
    fn class_index(&mut self, ty: &TypeDef) -> Result<u16> {
        let name = self.descriptors.class_entry_name(ty);
        self.pool.class(&name)
    }

    /// Discard a value of the given type.
    fn pop_value(&mut self, ty: &TypeDef) -> Result<()> {
        match ty.slot_size() {
            0 => Ok(()),
            1 => self.code.op(OpCode::Pop),
            _ => self.code.op(OpCode::Pop2),
        }
    }
}
