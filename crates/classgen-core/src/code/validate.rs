//! Structural checks run when a definition is built.

use crate::{ExpressionDef, ModelError, StatementDef, VariableDef};

impl StatementDef {
    /// Reject invocations and instantiations whose argument count differs
    /// from the referenced parameter list.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            StatementDef::Return(value) => value.as_ref().map_or(Ok(()), ExpressionDef::validate),
            StatementDef::Expression(expression)
            | StatementDef::Throw(expression)
            | StatementDef::DefineAndAssign {
                value: expression, ..
            } => expression.validate(),
            StatementDef::Assign { variable, value } => {
                validate_variable(variable)?;
                value.validate()
            }
            StatementDef::PutArrayElement {
                array,
                index,
                value,
            } => {
                array.validate()?;
                index.validate()?;
                value.validate()
            }
            StatementDef::If { condition, then } => {
                condition.validate()?;
                then.validate()
            }
            StatementDef::IfElse {
                condition,
                then,
                otherwise,
            } => {
                condition.validate()?;
                then.validate()?;
                otherwise.validate()
            }
            StatementDef::While { condition, body } => {
                condition.validate()?;
                body.validate()
            }
            StatementDef::Switch(switch) => {
                switch.subject().validate()?;
                for branch in switch.branches() {
                    branch.body.validate()?;
                }
                switch.default().map_or(Ok(()), StatementDef::validate)
            }
            StatementDef::Try(try_stmt) => {
                for resource in &try_stmt.resources {
                    resource.value.validate()?;
                }
                try_stmt.body.validate()?;
                for catch in &try_stmt.catches {
                    catch.body.validate()?;
                }
                try_stmt
                    .finally
                    .as_ref()
                    .map_or(Ok(()), StatementDef::validate)
            }
            StatementDef::Synchronized { monitor, body } => {
                monitor.validate()?;
                body.validate()
            }
            StatementDef::Multi(statements) => statements.iter().try_for_each(StatementDef::validate),
        }
    }
}

impl ExpressionDef {
    /// See [`StatementDef::validate`].
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            ExpressionDef::Constant(_) => Ok(()),
            ExpressionDef::Variable(variable) => validate_variable(variable),
            ExpressionDef::InvokeInstance(invoke) => {
                check_arity(
                    &invoke.method.name,
                    invoke.method.parameter_types.len(),
                    invoke.arguments.len(),
                )?;
                invoke.receiver.validate()?;
                invoke.arguments.iter().try_for_each(ExpressionDef::validate)
            }
            ExpressionDef::InvokeStatic(invoke) => {
                check_arity(
                    &invoke.method.name,
                    invoke.method.parameter_types.len(),
                    invoke.arguments.len(),
                )?;
                invoke.arguments.iter().try_for_each(ExpressionDef::validate)
            }
            ExpressionDef::NewInstance {
                ty,
                parameter_types,
                arguments,
            } => {
                check_arity(
                    &format!("new {ty}"),
                    parameter_types.len(),
                    arguments.len(),
                )?;
                arguments.iter().try_for_each(ExpressionDef::validate)
            }
            ExpressionDef::NewArrayInitialized { items, .. } => {
                items.iter().try_for_each(ExpressionDef::validate)
            }
            ExpressionDef::NewArray { size: inner, .. }
            | ExpressionDef::ArrayLength(inner)
            | ExpressionDef::Cast {
                expression: inner, ..
            }
            | ExpressionDef::InstanceOf {
                expression: inner, ..
            }
            | ExpressionDef::Unary { operand: inner, .. }
            | ExpressionDef::IsNull(inner)
            | ExpressionDef::IsNotNull(inner) => inner.validate(),
            ExpressionDef::ArrayElement {
                array: left,
                index: right,
            }
            | ExpressionDef::Math { left, right, .. }
            | ExpressionDef::Compare { left, right, .. }
            | ExpressionDef::And(left, right)
            | ExpressionDef::Or(left, right)
            | ExpressionDef::EqualsStructurally(left, right)
            | ExpressionDef::EqualsReferentially(left, right) => {
                left.validate()?;
                right.validate()
            }
            ExpressionDef::Conditional {
                condition,
                when_true,
                when_false,
                ..
            } => {
                condition.validate()?;
                when_true.validate()?;
                when_false.validate()
            }
            ExpressionDef::Switch(switch) => {
                switch.subject().validate()?;
                for branch in switch.branches() {
                    branch.body.validate()?;
                }
                switch.default().validate()
            }
        }
    }
}

fn validate_variable(variable: &VariableDef) -> Result<(), ModelError> {
    match variable {
        VariableDef::Field { instance, .. } => instance.validate(),
        _ => Ok(()),
    }
}

fn check_arity(method: &str, expected: usize, found: usize) -> Result<(), ModelError> {
    if expected == found {
        Ok(())
    } else {
        Err(ModelError::ArgumentCount {
            method: method.to_string(),
            expected,
            found,
        })
    }
}
