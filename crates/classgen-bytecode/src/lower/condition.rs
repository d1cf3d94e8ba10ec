//! Boolean expressions lowered directly to conditional branches.
//!
//! `condition(expr, jump_when, target)` branches to `target` when `expr`
//! evaluates to `jump_when` and falls through otherwise. Comparisons,
//! `&&`, `||` and `!` never materialize an intermediate boolean.
//!
//! ```text
//! a < b && c          (jump to L when false)
//!
//!     <a> <b> if_icmpge L
//!     <c> ifeq L
//! ```

use classgen_core::{
    ClassTypeDef, CompareOp, Constant, ExpressionDef, MethodRef, PrimitiveKind, TypeDef, UnaryOp,
};

use super::{MethodLowering, Result};
use crate::code::Label;
use crate::{EmitErrorKind, OpCode};

fn int_compare_op(op: CompareOp) -> OpCode {
    match op {
        CompareOp::Eq => OpCode::IfIcmpeq,
        CompareOp::Ne => OpCode::IfIcmpne,
        CompareOp::Lt => OpCode::IfIcmplt,
        CompareOp::Le => OpCode::IfIcmple,
        CompareOp::Gt => OpCode::IfIcmpgt,
        CompareOp::Ge => OpCode::IfIcmpge,
    }
}

fn zero_compare_op(op: CompareOp) -> OpCode {
    match op {
        CompareOp::Eq => OpCode::Ifeq,
        CompareOp::Ne => OpCode::Ifne,
        CompareOp::Lt => OpCode::Iflt,
        CompareOp::Le => OpCode::Ifle,
        CompareOp::Gt => OpCode::Ifgt,
        CompareOp::Ge => OpCode::Ifge,
    }
}

fn is_int_zero(expr: &ExpressionDef) -> bool {
    matches!(expr, ExpressionDef::Constant(constant) if constant.as_int() == Some(0))
}

fn numeric_kind(ty: &TypeDef) -> Option<PrimitiveKind> {
    ty.as_primitive().or_else(|| ty.boxed_kind())
}

impl MethodLowering<'_> {
    pub(super) fn condition(
        &mut self,
        expr: &ExpressionDef,
        jump_when: bool,
        target: Label,
    ) -> Result<()> {
        match expr {
            ExpressionDef::Constant(Constant::Boolean(value)) => {
                if *value == jump_when {
                    self.code.branch(OpCode::Goto, target)?;
                }
                Ok(())
            }
            ExpressionDef::Unary {
                op: UnaryOp::Not,
                operand,
            } => self.condition(operand, !jump_when, target),
            ExpressionDef::And(left, right) => {
                if jump_when {
                    let skip = self.code.new_label();
                    self.condition(left, false, skip)?;
                    self.condition(right, true, target)?;
                    self.code.place(skip)
                } else {
                    self.condition(left, false, target)?;
                    self.condition(right, false, target)
                }
            }
            ExpressionDef::Or(left, right) => {
                if jump_when {
                    self.condition(left, true, target)?;
                    self.condition(right, true, target)
                } else {
                    let skip = self.code.new_label();
                    self.condition(left, true, skip)?;
                    self.condition(right, false, target)?;
                    self.code.place(skip)
                }
            }
            ExpressionDef::IsNull(value) => {
                self.value(value)?;
                let op = if jump_when { OpCode::Ifnull } else { OpCode::Ifnonnull };
                self.code.branch(op, target)
            }
            ExpressionDef::IsNotNull(value) => {
                self.value(value)?;
                let op = if jump_when { OpCode::Ifnonnull } else { OpCode::Ifnull };
                self.code.branch(op, target)
            }
            ExpressionDef::InstanceOf { expression, ty } => {
                self.value(expression)?;
                let index = self.class_index(ty)?;
                self.code.op_u16(OpCode::Instanceof, index)?;
                self.branch_on_int(jump_when, target)
            }
            ExpressionDef::EqualsReferentially(left, right) => {
                if left.ty().is_primitive() || right.ty().is_primitive() {
                    self.compare(CompareOp::Eq, left, right, jump_when, target)
                } else {
                    self.reference_equality(CompareOp::Eq, left, right, jump_when, target)
                }
            }
            ExpressionDef::EqualsStructurally(left, right) => {
                if left.ty().is_primitive() || right.ty().is_primitive() {
                    return self.compare(CompareOp::Eq, left, right, jump_when, target);
                }
                self.value(left)?;
                self.value_as(right, &TypeDef::object())?;
                let equals = MethodRef::new(
                    ClassTypeDef::object(),
                    "equals",
                    vec![TypeDef::object()],
                    TypeDef::BOOLEAN,
                );
                self.invoke_ref(OpCode::Invokevirtual, &equals, true)?;
                self.branch_on_int(jump_when, target)
            }
            ExpressionDef::Compare { op, left, right } => {
                self.compare(*op, left, right, jump_when, target)
            }
            _ => {
                self.value_as(expr, &TypeDef::BOOLEAN)?;
                self.branch_on_int(jump_when, target)
            }
        }
    }

    /// Branch on the int on top of the stack being non-zero.
    fn branch_on_int(&mut self, jump_when: bool, target: Label) -> Result<()> {
        let op = if jump_when { OpCode::Ifne } else { OpCode::Ifeq };
        self.code.branch(op, target)
    }

    fn reference_equality(
        &mut self,
        op: CompareOp,
        left: &ExpressionDef,
        right: &ExpressionDef,
        jump_when: bool,
        target: Label,
    ) -> Result<()> {
        self.value(left)?;
        self.value(right)?;
        let equal = (op == CompareOp::Eq) == jump_when;
        let op = if equal { OpCode::IfAcmpeq } else { OpCode::IfAcmpne };
        self.code.branch(op, target)
    }

    fn compare(
        &mut self,
        op: CompareOp,
        left: &ExpressionDef,
        right: &ExpressionDef,
        jump_when: bool,
        target: Label,
    ) -> Result<()> {
        let left_ty = left.ty();
        let right_ty = right.ty();
        let is_equality = matches!(op, CompareOp::Eq | CompareOp::Ne);
        // Two boxed values compare by identity under == and !=.
        let numeric = left_ty.is_primitive()
            || right_ty.is_primitive()
            || (!is_equality && left_ty.boxed_kind().is_some() && right_ty.boxed_kind().is_some());

        if !numeric {
            if !is_equality {
                return Err(EmitErrorKind::UnsupportedOperator {
                    op: format!("{op:?}"),
                    ty: left_ty.to_string(),
                });
            }
            return self.reference_equality(op, left, right, jump_when, target);
        }

        let (Some(l), Some(r)) = (numeric_kind(&left_ty), numeric_kind(&right_ty)) else {
            return Err(EmitErrorKind::UnsupportedOperator {
                op: format!("{op:?}"),
                ty: format!("{left_ty} and {right_ty}"),
            });
        };
        let kind = l.promote(r);
        let operand = TypeDef::Primitive(kind);
        let effective = if jump_when { op } else { op.negate() };

        if kind == PrimitiveKind::Int && is_int_zero(right) {
            self.value_as(left, &operand)?;
            return self.code.branch(zero_compare_op(effective), target);
        }
        self.value_as(left, &operand)?;
        self.value_as(right, &operand)?;

        // The g variants make NaN compare greater, so `<` and `<=` fail on NaN.
        let nan_greater = matches!(op, CompareOp::Lt | CompareOp::Le);
        match kind {
            PrimitiveKind::Long => self.code.op(OpCode::Lcmp)?,
            PrimitiveKind::Float => {
                self.code.op(if nan_greater { OpCode::Fcmpg } else { OpCode::Fcmpl })?
            }
            PrimitiveKind::Double => {
                self.code.op(if nan_greater { OpCode::Dcmpg } else { OpCode::Dcmpl })?
            }
            _ => return self.code.branch(int_compare_op(effective), target),
        }
        self.code.branch(zero_compare_op(effective), target)
    }
}
