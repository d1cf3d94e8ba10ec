//! Expression lowering.

use classgen_core::{Constant, ExpressionDef, MathOp, PrimitiveKind, TypeDef, UnaryOp};

use super::{MethodLowering, Result, array_load_op, array_store_op};
use crate::{EmitErrorKind, OpCode};

/// `newarray` type code of a primitive component.
fn array_type_code(kind: PrimitiveKind) -> u8 {
    match kind {
        PrimitiveKind::Boolean => 4,
        PrimitiveKind::Char => 5,
        PrimitiveKind::Float => 6,
        PrimitiveKind::Double => 7,
        PrimitiveKind::Byte => 8,
        PrimitiveKind::Short => 9,
        PrimitiveKind::Int => 10,
        PrimitiveKind::Long => 11,
    }
}

fn math_op(op: MathOp, kind: PrimitiveKind) -> Option<OpCode> {
    use OpCode::*;
    use PrimitiveKind::{Double, Float, Int, Long};
    let code = match (op, kind) {
        (MathOp::Add, Int) => Iadd,
        (MathOp::Add, Long) => Ladd,
        (MathOp::Add, Float) => Fadd,
        (MathOp::Add, Double) => Dadd,
        (MathOp::Sub, Int) => Isub,
        (MathOp::Sub, Long) => Lsub,
        (MathOp::Sub, Float) => Fsub,
        (MathOp::Sub, Double) => Dsub,
        (MathOp::Mul, Int) => Imul,
        (MathOp::Mul, Long) => Lmul,
        (MathOp::Mul, Float) => Fmul,
        (MathOp::Mul, Double) => Dmul,
        (MathOp::Div, Int) => Idiv,
        (MathOp::Div, Long) => Ldiv,
        (MathOp::Div, Float) => Fdiv,
        (MathOp::Div, Double) => Ddiv,
        (MathOp::Rem, Int) => Irem,
        (MathOp::Rem, Long) => Lrem,
        (MathOp::Rem, Float) => Frem,
        (MathOp::Rem, Double) => Drem,
        (MathOp::BitAnd, Int) => Iand,
        (MathOp::BitAnd, Long) => Land,
        (MathOp::BitOr, Int) => Ior,
        (MathOp::BitOr, Long) => Lor,
        (MathOp::BitXor, Int) => Ixor,
        (MathOp::BitXor, Long) => Lxor,
        (MathOp::Shl, Int) => Ishl,
        (MathOp::Shl, Long) => Lshl,
        (MathOp::Shr, Int) => Ishr,
        (MathOp::Shr, Long) => Lshr,
        (MathOp::UShr, Int) => Iushr,
        (MathOp::UShr, Long) => Lushr,
        _ => return None,
    };
    Some(code)
}

fn unsupported(op: impl std::fmt::Debug, ty: &TypeDef) -> EmitErrorKind {
    EmitErrorKind::UnsupportedOperator {
        op: format!("{op:?}"),
        ty: ty.to_string(),
    }
}

impl MethodLowering<'_> {
    /// Lower `expr`, leaving its value (if any) on the stack. Returns the
    /// static type of what was pushed.
    pub(super) fn expression(&mut self, expr: &ExpressionDef) -> Result<TypeDef> {
        match expr {
            ExpressionDef::Constant(constant) => self.constant(constant)?,
            ExpressionDef::Variable(variable) => self.load_variable(variable)?,
            ExpressionDef::InvokeInstance(call) => self.invoke_instance(call)?,
            ExpressionDef::InvokeStatic(call) => self.invoke_static(call)?,
            ExpressionDef::NewInstance {
                ty,
                parameter_types,
                arguments,
            } => self.new_instance(ty, parameter_types, arguments)?,
            ExpressionDef::NewArray { component, size } => {
                self.value_as(size, &TypeDef::INT)?;
                self.new_array(component)?;
            }
            ExpressionDef::NewArrayInitialized { component, items } => {
                let length = i32::try_from(items.len()).unwrap_or(i32::MAX);
                self.push_int(length)?;
                self.new_array(component)?;
                let store = array_store_op(component);
                for (index, item) in items.iter().enumerate() {
                    self.code.op(OpCode::Dup)?;
                    self.push_int(index as i32)?;
                    self.value_as(item, component)?;
                    self.code.op(store)?;
                }
            }
            ExpressionDef::ArrayElement { array, index } => {
                let array_ty = self.value(array)?;
                let component = array_ty.component().cloned().unwrap_or_else(TypeDef::object);
                self.value_as(index, &TypeDef::INT)?;
                self.code.op(array_load_op(&component))?;
            }
            ExpressionDef::ArrayLength(array) => {
                self.value(array)?;
                self.code.op(OpCode::Arraylength)?;
            }
            ExpressionDef::Cast { target, expression } => {
                self.value_as(expression, target)?;
            }
            ExpressionDef::InstanceOf { expression, ty } => {
                self.value(expression)?;
                let index = self.class_index(ty)?;
                self.code.op_u16(OpCode::Instanceof, index)?;
            }
            ExpressionDef::Conditional {
                condition,
                when_true,
                when_false,
                ty,
            } => {
                let otherwise = self.code.new_label();
                let end = self.code.new_label();
                self.condition(condition, false, otherwise)?;
                self.value_as(when_true, ty)?;
                self.code.branch(OpCode::Goto, end)?;
                self.code.place(otherwise)?;
                self.value_as(when_false, ty)?;
                self.code.place(end)?;
            }
            ExpressionDef::Unary {
                op: UnaryOp::Not, ..
            }
            | ExpressionDef::Compare { .. }
            | ExpressionDef::And(..)
            | ExpressionDef::Or(..)
            | ExpressionDef::IsNull(_)
            | ExpressionDef::IsNotNull(_)
            | ExpressionDef::EqualsStructurally(..)
            | ExpressionDef::EqualsReferentially(..) => self.materialize(expr)?,
            ExpressionDef::Unary { op, operand } => self.unary(*op, operand, &expr.ty())?,
            ExpressionDef::Math {
                op,
                left,
                right,
                ty,
            } => self.math(*op, left, right, ty)?,
            ExpressionDef::Switch(switch) => self.switch_expression(switch)?,
        }
        Ok(expr.ty())
    }

    /// Lower an expression that must produce a value.
    pub(super) fn value(&mut self, expr: &ExpressionDef) -> Result<TypeDef> {
        if expr.ty().is_void() {
            return Err(EmitErrorKind::VoidValue);
        }
        self.expression(expr)
    }

    /// Lower an expression and convert the result to `target`.
    pub(super) fn value_as(&mut self, expr: &ExpressionDef, target: &TypeDef) -> Result<()> {
        if let ExpressionDef::Constant(Constant::Null(_)) = expr {
            if !target.is_primitive() {
                return self.code.op(OpCode::AconstNull);
            }
        }
        let ty = self.value(expr)?;
        self.coerce(&ty, target)
    }

    fn constant(&mut self, constant: &Constant) -> Result<()> {
        match constant {
            Constant::Null(_) => self.code.op(OpCode::AconstNull),
            Constant::Long(value) => self.push_long(*value),
            Constant::Float(value) => self.push_float(*value),
            Constant::Double(value) => self.push_double(*value),
            Constant::String(text) => {
                let index = self.pool.string(text)?;
                self.ldc(index)
            }
            int_like => self.push_int(int_like.as_int().unwrap_or_default()),
        }
    }

    fn new_array(&mut self, component: &TypeDef) -> Result<()> {
        match component.as_primitive() {
            Some(kind) => {
                self.code.op(OpCode::Newarray)?;
                self.code.write_u8(array_type_code(kind));
                Ok(())
            }
            None => {
                let index = self.class_index(component)?;
                self.code.op_u16(OpCode::Anewarray, index)
            }
        }
    }

    /// Push 1 or 0 for a boolean-valued node.
    fn materialize(&mut self, expr: &ExpressionDef) -> Result<()> {
        let when_false = self.code.new_label();
        let end = self.code.new_label();
        self.condition(expr, false, when_false)?;
        self.push_int(1)?;
        self.code.branch(OpCode::Goto, end)?;
        self.code.place(when_false)?;
        self.push_int(0)?;
        self.code.place(end)
    }

    fn unary(&mut self, op: UnaryOp, operand: &ExpressionDef, ty: &TypeDef) -> Result<()> {
        let kind = ty.as_primitive().unwrap_or(PrimitiveKind::Int);
        self.value_as(operand, ty)?;
        match (op, kind) {
            (UnaryOp::Negate, PrimitiveKind::Long) => self.code.op(OpCode::Lneg),
            (UnaryOp::Negate, PrimitiveKind::Float) => self.code.op(OpCode::Fneg),
            (UnaryOp::Negate, PrimitiveKind::Double) => self.code.op(OpCode::Dneg),
            (UnaryOp::Negate, _) => self.code.op(OpCode::Ineg),
            (UnaryOp::BitNot, PrimitiveKind::Long) => {
                self.push_long(-1)?;
                self.code.op(OpCode::Lxor)
            }
            (UnaryOp::BitNot, PrimitiveKind::Float | PrimitiveKind::Double) => {
                Err(unsupported(op, ty))
            }
            (UnaryOp::BitNot, _) => {
                self.code.op(OpCode::IconstM1)?;
                self.code.op(OpCode::Ixor)
            }
            (UnaryOp::Not, _) => Err(unsupported(op, ty)),
        }
    }

    fn math(
        &mut self,
        op: MathOp,
        left: &ExpressionDef,
        right: &ExpressionDef,
        ty: &TypeDef,
    ) -> Result<()> {
        let result = ty.as_primitive().ok_or_else(|| unsupported(op, ty))?;
        let kind = result.stack_kind();
        let opcode = math_op(op, kind).ok_or_else(|| unsupported(op, ty))?;
        if op.is_shift() {
            self.value_as(left, &TypeDef::Primitive(kind))?;
            self.value_as(right, &TypeDef::INT)?;
        } else {
            // Boolean operands of &, | and ^ stay booleans.
            let operand = if result == PrimitiveKind::Boolean {
                TypeDef::BOOLEAN
            } else {
                TypeDef::Primitive(kind)
            };
            self.value_as(left, &operand)?;
            self.value_as(right, &operand)?;
        }
        self.code.op(opcode)
    }
}
