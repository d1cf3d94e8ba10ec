//! Conversions between the type of a value on the stack and the type a
//! consumer expects.

use classgen_core::{ClassTypeDef, MethodRef, PrimitiveKind, TypeDef};

use super::{MethodLowering, Result};
use crate::OpCode;

fn wrapper(kind: PrimitiveKind) -> TypeDef {
    TypeDef::Class(ClassTypeDef::of(kind.wrapper()))
}

/// Conversion between stack kinds, if one is needed.
fn stack_conversion(from: PrimitiveKind, to: PrimitiveKind) -> Option<OpCode> {
    use OpCode::*;
    use PrimitiveKind::{Double, Float, Int, Long};
    let op = match (from.stack_kind(), to.stack_kind()) {
        (Int, Long) => I2l,
        (Int, Float) => I2f,
        (Int, Double) => I2d,
        (Long, Int) => L2i,
        (Long, Float) => L2f,
        (Long, Double) => L2d,
        (Float, Int) => F2i,
        (Float, Long) => F2l,
        (Float, Double) => F2d,
        (Double, Int) => D2i,
        (Double, Long) => D2l,
        (Double, Float) => D2f,
        _ => return None,
    };
    Some(op)
}

/// Truncation into a sub-int kind, if one is needed.
fn narrowing(from: PrimitiveKind, to: PrimitiveKind) -> Option<OpCode> {
    use PrimitiveKind::*;
    match to {
        Byte if from != Byte => Some(OpCode::I2b),
        Short if !matches!(from, Byte | Short) => Some(OpCode::I2s),
        Char if from != Char => Some(OpCode::I2c),
        _ => None,
    }
}

impl MethodLowering<'_> {
    /// Convert the value on top of the stack from `from` to `to`.
    pub(super) fn coerce(&mut self, from: &TypeDef, to: &TypeDef) -> Result<()> {
        let from = from.erasure();
        let to = to.erasure();
        if from == to || to.is_void() {
            return Ok(());
        }
        match (from.as_primitive(), to.as_primitive()) {
            (Some(source), Some(target)) => self.convert(source, target),
            (Some(source), None) => self.box_value(source, &to),
            (None, Some(target)) => self.unbox_value(&from, target),
            (None, None) => {
                if to.as_class().is_some_and(ClassTypeDef::is_object) {
                    return Ok(());
                }
                let index = self.class_index(&to)?;
                self.code.op_u16(OpCode::Checkcast, index)
            }
        }
    }

    fn convert(&mut self, from: PrimitiveKind, to: PrimitiveKind) -> Result<()> {
        if let Some(op) = stack_conversion(from, to) {
            self.code.op(op)?;
        }
        // Anything coming from long, float or double is a full int by now.
        let source = if from.is_int_like() {
            from
        } else {
            PrimitiveKind::Int
        };
        if let Some(op) = narrowing(source, to) {
            self.code.op(op)?;
        }
        Ok(())
    }

    fn box_value(&mut self, from: PrimitiveKind, to: &TypeDef) -> Result<()> {
        // Box into the target wrapper when there is one, else into our own.
        let kind = match to.boxed_kind() {
            Some(kind) => {
                self.convert(from, kind)?;
                kind
            }
            None => from,
        };
        let value_of = MethodRef::new(
            ClassTypeDef::of(kind.wrapper()),
            "valueOf",
            vec![TypeDef::Primitive(kind)],
            wrapper(kind),
        );
        self.invoke_ref(OpCode::Invokestatic, &value_of, false)
    }

    fn unbox_value(&mut self, from: &TypeDef, to: PrimitiveKind) -> Result<()> {
        if let Some(kind) = from.boxed_kind() {
            let accessor = MethodRef::new(
                ClassTypeDef::of(kind.wrapper()),
                kind.unbox_method(),
                vec![],
                TypeDef::Primitive(kind),
            );
            self.invoke_ref(OpCode::Invokevirtual, &accessor, true)?;
            return self.convert(kind, to);
        }

        // Unknown reference: cast to the narrowest type with the accessor.
        let owner = match to {
            PrimitiveKind::Boolean | PrimitiveKind::Char => ClassTypeDef::of(to.wrapper()),
            _ => ClassTypeDef::number(),
        };
        let index = self.class_index(&TypeDef::Class(owner.clone()))?;
        self.code.op_u16(OpCode::Checkcast, index)?;
        let accessor = MethodRef::new(owner, to.unbox_method(), vec![], TypeDef::Primitive(to));
        self.invoke_ref(OpCode::Invokevirtual, &accessor, true)
    }
}
