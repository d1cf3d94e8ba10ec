//! Statement lowering.
//!
//! Statements start and end with an empty operand stack. Statements that
//! follow one that never completes normally (`return`, `throw`, an
//! infinite loop) are dropped, since no path reaches them.

use classgen_core::{ExpressionDef, StatementDef, TypeDef};

use super::{MethodLowering, Result, array_store_op, slot_kind};
use crate::{EmitErrorKind, OpCode};

impl MethodLowering<'_> {
    pub(super) fn statement(&mut self, statement: &StatementDef) -> Result<()> {
        match statement {
            StatementDef::Return(value) => self.return_statement(value.as_ref()),
            StatementDef::Expression(expr) => {
                let ty = self.expression(expr)?;
                self.pop_value(&ty)
            }
            StatementDef::DefineAndAssign { name, ty, value } => {
                // The initializer cannot see the variable it initializes.
                self.value_as(value, ty)?;
                let slot = self.locals.declare(name, ty.clone())?;
                self.code.store(slot_kind(ty), slot)
            }
            StatementDef::Assign { variable, value } => self.assign(variable, value),
            StatementDef::PutArrayElement {
                array,
                index,
                value,
            } => {
                let array_ty = self.value(array)?;
                let component = array_ty.component().cloned().unwrap_or_else(TypeDef::object);
                self.value_as(index, &TypeDef::INT)?;
                self.value_as(value, &component)?;
                self.code.op(array_store_op(&component))
            }
            StatementDef::If { condition, then } => {
                let end = self.code.new_label();
                self.condition(condition, false, end)?;
                self.block(then)?;
                self.code.place(end)
            }
            StatementDef::IfElse {
                condition,
                then,
                otherwise,
            } => {
                let otherwise_label = self.code.new_label();
                let end = self.code.new_label();
                self.condition(condition, false, otherwise_label)?;
                self.block(then)?;
                if self.code.is_reachable() {
                    self.code.branch(OpCode::Goto, end)?;
                }
                self.code.place(otherwise_label)?;
                self.block(otherwise)?;
                self.code.place(end)
            }
            StatementDef::While { condition, body } => {
                let top = self.code.new_label();
                let end = self.code.new_label();
                self.code.place(top)?;
                self.condition(condition, false, end)?;
                self.block(body)?;
                if self.code.is_reachable() {
                    self.code.branch(OpCode::Goto, top)?;
                }
                self.code.place(end)
            }
            StatementDef::Switch(switch) => self.switch_statement(switch),
            StatementDef::Throw(exception) => {
                self.value(exception)?;
                self.code.op(OpCode::Athrow)
            }
            StatementDef::Try(body) => self.try_statement(body),
            StatementDef::Synchronized { monitor, body } => self.synchronized(monitor, body),
            StatementDef::Multi(statements) => {
                self.locals.push_scope();
                let result = self.statements(statements);
                self.locals.pop_scope();
                result
            }
        }
    }

    fn statements(&mut self, statements: &[StatementDef]) -> Result<()> {
        for statement in statements {
            if !self.code.is_reachable() {
                break;
            }
            self.statement(statement)?;
        }
        Ok(())
    }

    /// A statement in its own scope.
    pub(super) fn block(&mut self, statement: &StatementDef) -> Result<()> {
        self.locals.push_scope();
        let result = self.statement(statement);
        self.locals.pop_scope();
        result
    }

    fn return_statement(&mut self, value: Option<&ExpressionDef>) -> Result<()> {
        let return_type = self.return_type.clone();
        match value {
            Some(_) if return_type.is_void() => Err(EmitErrorKind::UnexpectedReturnValue),
            None if !return_type.is_void() => Err(EmitErrorKind::MissingReturnValue {
                expected: return_type.to_string(),
            }),
            Some(value) => {
                self.value_as(value, &return_type)?;
                self.exit_with(&return_type)
            }
            None => self.exit_with(&return_type),
        }
    }
}
