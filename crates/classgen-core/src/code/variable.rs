use crate::{ClassTypeDef, ExpressionDef, StatementDef, TypeDef};

/// Anything that can be read, and (except `This`/`Super`) assigned.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableDef {
    /// The receiver of the enclosing method.
    This(ClassTypeDef),
    /// The receiver viewed as the given supertype; calls through it use
    /// non-virtual dispatch.
    Super(ClassTypeDef),
    /// Local declared by `DefineAndAssign`, a resource or a catch clause.
    Local { name: String, ty: TypeDef },
    /// Parameter of the enclosing method.
    MethodParameter { name: String, ty: TypeDef },
    /// Instance field of `instance`.
    Field {
        instance: Box<ExpressionDef>,
        owner: ClassTypeDef,
        name: String,
        ty: TypeDef,
    },
    StaticField {
        owner: ClassTypeDef,
        name: String,
        ty: TypeDef,
    },
}

impl VariableDef {
    pub fn this(ty: ClassTypeDef) -> Self {
        VariableDef::This(ty)
    }

    pub fn super_of(ty: ClassTypeDef) -> Self {
        VariableDef::Super(ty)
    }

    pub fn local(name: impl Into<String>, ty: TypeDef) -> Self {
        VariableDef::Local {
            name: name.into(),
            ty,
        }
    }

    pub fn parameter(name: impl Into<String>, ty: TypeDef) -> Self {
        VariableDef::MethodParameter {
            name: name.into(),
            ty,
        }
    }

    pub fn static_field(owner: ClassTypeDef, name: impl Into<String>, ty: TypeDef) -> Self {
        VariableDef::StaticField {
            owner,
            name: name.into(),
            ty,
        }
    }

    /// Static type of the variable.
    pub fn ty(&self) -> TypeDef {
        match self {
            VariableDef::This(ty) | VariableDef::Super(ty) => TypeDef::Class(ty.clone()),
            VariableDef::Local { ty, .. }
            | VariableDef::MethodParameter { ty, .. }
            | VariableDef::Field { ty, .. }
            | VariableDef::StaticField { ty, .. } => ty.clone(),
        }
    }

    /// Instance field of this variable's value.
    pub fn field(&self, owner: ClassTypeDef, name: impl Into<String>, ty: TypeDef) -> VariableDef {
        self.read().field(owner, name, ty)
    }

    /// Read the variable.
    pub fn read(&self) -> ExpressionDef {
        ExpressionDef::Variable(self.clone())
    }

    /// Assign a value.
    pub fn assign(&self, value: impl Into<ExpressionDef>) -> StatementDef {
        StatementDef::Assign {
            variable: self.clone(),
            value: value.into(),
        }
    }
}

impl From<VariableDef> for ExpressionDef {
    fn from(variable: VariableDef) -> Self {
        ExpressionDef::Variable(variable)
    }
}
