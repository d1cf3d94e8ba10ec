//! Statement trees.

use crate::{ClassTypeDef, ExpressionDef, SwitchStatement, TypeDef, VariableDef};

/// A statement node. Statements never produce a value.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementDef {
    /// `return;` or `return value;`
    Return(Option<ExpressionDef>),
    /// Expression evaluated for its side effects; any result is discarded.
    Expression(ExpressionDef),
    /// Declare a local in the enclosing block and initialize it.
    DefineAndAssign {
        name: String,
        ty: TypeDef,
        value: ExpressionDef,
    },
    Assign {
        variable: VariableDef,
        value: ExpressionDef,
    },
    PutArrayElement {
        array: ExpressionDef,
        index: ExpressionDef,
        value: ExpressionDef,
    },
    If {
        condition: ExpressionDef,
        then: Box<StatementDef>,
    },
    IfElse {
        condition: ExpressionDef,
        then: Box<StatementDef>,
        otherwise: Box<StatementDef>,
    },
    While {
        condition: ExpressionDef,
        body: Box<StatementDef>,
    },
    Switch(Box<SwitchStatement>),
    Throw(ExpressionDef),
    Try(Box<TryStatement>),
    /// Body executed while holding the monitor of `monitor`.
    Synchronized {
        monitor: ExpressionDef,
        body: Box<StatementDef>,
    },
    /// Block of statements; locals declared inside end with it.
    Multi(Vec<StatementDef>),
}

/// A resource acquired before a try body and released on every exit.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDef {
    pub name: String,
    pub ty: TypeDef,
    pub value: ExpressionDef,
}

impl ResourceDef {
    pub fn new(name: impl Into<String>, ty: TypeDef, value: ExpressionDef) -> Self {
        Self {
            name: name.into(),
            ty,
            value,
        }
    }

    /// The local holding the resource inside the try body.
    pub fn variable(&self) -> VariableDef {
        VariableDef::local(self.name.clone(), self.ty.clone())
    }
}

/// A catch clause binding the caught exception to a local.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchDef {
    pub exception: ClassTypeDef,
    pub name: String,
    pub body: StatementDef,
}

impl CatchDef {
    pub fn new(exception: ClassTypeDef, name: impl Into<String>, body: StatementDef) -> Self {
        Self {
            exception,
            name: name.into(),
            body,
        }
    }

    /// The local holding the caught exception.
    pub fn variable(&self) -> VariableDef {
        VariableDef::local(self.name.clone(), TypeDef::Class(self.exception.clone()))
    }
}

/// Try statement with optional resources, catch clauses and finally block.
#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    pub resources: Vec<ResourceDef>,
    pub body: StatementDef,
    pub catches: Vec<CatchDef>,
    pub finally: Option<StatementDef>,
}

impl TryStatement {
    pub fn new(body: StatementDef) -> Self {
        Self {
            resources: Vec::new(),
            body,
            catches: Vec::new(),
            finally: None,
        }
    }

    pub fn with_resource(mut self, resource: ResourceDef) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_catch(mut self, catch: CatchDef) -> Self {
        self.catches.push(catch);
        self
    }

    pub fn with_finally(mut self, finally: StatementDef) -> Self {
        self.finally = Some(finally);
        self
    }

    pub fn build(self) -> StatementDef {
        StatementDef::Try(Box::new(self))
    }
}

impl StatementDef {
    /// Block of statements.
    pub fn multi(statements: impl IntoIterator<Item = StatementDef>) -> Self {
        StatementDef::Multi(statements.into_iter().collect())
    }

    /// Declare and initialize a local typed as its value.
    pub fn define(name: impl Into<String>, value: ExpressionDef) -> Self {
        StatementDef::DefineAndAssign {
            name: name.into(),
            ty: value.ty(),
            value,
        }
    }

    pub fn if_then(condition: ExpressionDef, then: StatementDef) -> Self {
        StatementDef::If {
            condition,
            then: Box::new(then),
        }
    }

    pub fn if_else(condition: ExpressionDef, then: StatementDef, otherwise: StatementDef) -> Self {
        StatementDef::IfElse {
            condition,
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn while_loop(condition: ExpressionDef, body: StatementDef) -> Self {
        StatementDef::While {
            condition,
            body: Box::new(body),
        }
    }

    pub fn synchronized(monitor: ExpressionDef, body: StatementDef) -> Self {
        StatementDef::Synchronized {
            monitor,
            body: Box::new(body),
        }
    }

    pub fn switch(switch: SwitchStatement) -> Self {
        StatementDef::Switch(Box::new(switch))
    }

    /// Statements of a block, or the statement itself.
    pub fn into_statements(self) -> Vec<StatementDef> {
        match self {
            StatementDef::Multi(statements) => statements,
            other => vec![other],
        }
    }
}
