//! Expression trees.
//!
//! Every expression knows its result type ([`ExpressionDef::ty`]); emitters
//! use it for descriptors and for deciding where boxing, unboxing and casts
//! are needed. The convenience constructors here only build trees.

use crate::{
    ClassTypeDef, Constant, MethodDef, PrimitiveKind, StatementDef, SwitchExpression, TypeDef,
    VariableDef,
};

// ============================================================================
// Types
// ============================================================================

/// A method referenced by owner, name and erased signature.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRef {
    /// Declaring type (class, interface or array type)
    pub owner: TypeDef,
    pub name: String,
    pub parameter_types: Vec<TypeDef>,
    pub return_type: TypeDef,
}

/// Invocation through a receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeInstance {
    pub receiver: ExpressionDef,
    pub method: MethodRef,
    pub arguments: Vec<ExpressionDef>,
}

/// Invocation of a static method.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeStatic {
    pub method: MethodRef,
    pub arguments: Vec<ExpressionDef>,
}

/// Arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

impl MathOp {
    pub fn is_shift(self) -> bool {
        matches!(self, MathOp::Shl | MathOp::Shr | MathOp::UShr)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, MathOp::BitAnd | MathOp::BitOr | MathOp::BitXor)
    }
}

/// Primitive comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// The operator that holds exactly when this one does not.
    pub fn negate(self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Ge => CompareOp::Lt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Le => CompareOp::Gt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    /// Logical not of a boolean.
    Not,
    BitNot,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionDef {
    Constant(Constant),
    Variable(VariableDef),
    InvokeInstance(Box<InvokeInstance>),
    InvokeStatic(Box<InvokeStatic>),
    /// Allocate and run a constructor.
    NewInstance {
        ty: ClassTypeDef,
        parameter_types: Vec<TypeDef>,
        arguments: Vec<ExpressionDef>,
    },
    NewArray {
        component: TypeDef,
        size: Box<ExpressionDef>,
    },
    NewArrayInitialized {
        component: TypeDef,
        items: Vec<ExpressionDef>,
    },
    ArrayElement {
        array: Box<ExpressionDef>,
        index: Box<ExpressionDef>,
    },
    ArrayLength(Box<ExpressionDef>),
    Cast {
        target: TypeDef,
        expression: Box<ExpressionDef>,
    },
    InstanceOf {
        expression: Box<ExpressionDef>,
        ty: TypeDef,
    },
    /// `condition ? when_true : when_false`
    Conditional {
        condition: Box<ExpressionDef>,
        when_true: Box<ExpressionDef>,
        when_false: Box<ExpressionDef>,
        ty: TypeDef,
    },
    Unary {
        op: UnaryOp,
        operand: Box<ExpressionDef>,
    },
    Math {
        op: MathOp,
        left: Box<ExpressionDef>,
        right: Box<ExpressionDef>,
        ty: TypeDef,
    },
    Compare {
        op: CompareOp,
        left: Box<ExpressionDef>,
        right: Box<ExpressionDef>,
    },
    And(Box<ExpressionDef>, Box<ExpressionDef>),
    Or(Box<ExpressionDef>, Box<ExpressionDef>),
    IsNull(Box<ExpressionDef>),
    IsNotNull(Box<ExpressionDef>),
    /// `left.equals(right)` for references, `==` for primitives.
    EqualsStructurally(Box<ExpressionDef>, Box<ExpressionDef>),
    /// Identity comparison.
    EqualsReferentially(Box<ExpressionDef>, Box<ExpressionDef>),
    Switch(Box<SwitchExpression>),
}

// ============================================================================
// MethodRef
// ============================================================================

impl MethodRef {
    pub fn new(
        owner: impl Into<TypeDef>,
        name: impl Into<String>,
        parameter_types: Vec<TypeDef>,
        return_type: TypeDef,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            parameter_types,
            return_type,
        }
    }

    /// Constructor of `owner`.
    pub fn constructor(owner: ClassTypeDef, parameter_types: Vec<TypeDef>) -> Self {
        Self::new(owner, MethodDef::CONSTRUCTOR, parameter_types, TypeDef::Void)
    }

    /// Reference to a method declared on `owner`.
    pub fn of(owner: impl Into<TypeDef>, method: &MethodDef) -> Self {
        Self::new(
            owner,
            method.name.clone(),
            method.parameter_types(),
            method.return_type.clone(),
        )
    }

    pub fn is_constructor(&self) -> bool {
        self.name == MethodDef::CONSTRUCTOR
    }

    /// Whether the owner is an interface.
    pub fn owner_is_interface(&self) -> bool {
        self.owner.as_class().is_some_and(ClassTypeDef::is_interface)
    }
}

// ============================================================================
// Construction helpers
// ============================================================================

impl ExpressionDef {
    pub fn int(value: i32) -> Self {
        ExpressionDef::Constant(Constant::Int(value))
    }

    pub fn long(value: i64) -> Self {
        ExpressionDef::Constant(Constant::Long(value))
    }

    pub fn double(value: f64) -> Self {
        ExpressionDef::Constant(Constant::Double(value))
    }

    pub fn boolean(value: bool) -> Self {
        ExpressionDef::Constant(Constant::Boolean(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        ExpressionDef::Constant(Constant::String(value.into()))
    }

    pub fn null(ty: TypeDef) -> Self {
        ExpressionDef::Constant(Constant::Null(ty))
    }

    /// `new ty(arguments...)`
    pub fn new_instance(
        ty: ClassTypeDef,
        parameter_types: Vec<TypeDef>,
        arguments: Vec<ExpressionDef>,
    ) -> Self {
        ExpressionDef::NewInstance {
            ty,
            parameter_types,
            arguments,
        }
    }

    pub fn new_array(component: TypeDef, size: ExpressionDef) -> Self {
        ExpressionDef::NewArray {
            component,
            size: Box::new(size),
        }
    }

    pub fn new_array_of(component: TypeDef, items: Vec<ExpressionDef>) -> Self {
        ExpressionDef::NewArrayInitialized { component, items }
    }

    pub fn invoke_static(method: MethodRef, arguments: Vec<ExpressionDef>) -> Self {
        ExpressionDef::InvokeStatic(Box::new(InvokeStatic { method, arguments }))
    }

    /// Call `method` on this value.
    pub fn invoke(self, method: MethodRef, arguments: Vec<ExpressionDef>) -> Self {
        ExpressionDef::InvokeInstance(Box::new(InvokeInstance {
            receiver: self,
            method,
            arguments,
        }))
    }

    /// Instance field of this value.
    pub fn field(self, owner: ClassTypeDef, name: impl Into<String>, ty: TypeDef) -> VariableDef {
        VariableDef::Field {
            instance: Box::new(self),
            owner,
            name: name.into(),
            ty,
        }
    }

    pub fn cast(self, target: TypeDef) -> Self {
        ExpressionDef::Cast {
            target,
            expression: Box::new(self),
        }
    }

    pub fn instance_of(self, ty: TypeDef) -> Self {
        ExpressionDef::InstanceOf {
            expression: Box::new(self),
            ty,
        }
    }

    pub fn is_null(self) -> Self {
        ExpressionDef::IsNull(Box::new(self))
    }

    pub fn is_non_null(self) -> Self {
        ExpressionDef::IsNotNull(Box::new(self))
    }

    pub fn equals_structurally(self, other: ExpressionDef) -> Self {
        ExpressionDef::EqualsStructurally(Box::new(self), Box::new(other))
    }

    pub fn equals_referentially(self, other: ExpressionDef) -> Self {
        ExpressionDef::EqualsReferentially(Box::new(self), Box::new(other))
    }

    pub fn and(self, other: ExpressionDef) -> Self {
        ExpressionDef::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: ExpressionDef) -> Self {
        ExpressionDef::Or(Box::new(self), Box::new(other))
    }

    pub fn not(self) -> Self {
        ExpressionDef::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    pub fn negate(self) -> Self {
        ExpressionDef::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(self),
        }
    }

    pub fn compare(self, op: CompareOp, other: ExpressionDef) -> Self {
        ExpressionDef::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Arithmetic with binary numeric promotion of the unboxed operand types.
    pub fn math(self, op: MathOp, other: ExpressionDef) -> Self {
        let left = numeric_kind(&self.ty());
        let right = numeric_kind(&other.ty());
        let kind = match (left, right) {
            (Some(PrimitiveKind::Boolean), Some(PrimitiveKind::Boolean)) if op.is_bitwise() => {
                PrimitiveKind::Boolean
            }
            (Some(l), _) if op.is_shift() => l.stack_kind(),
            (Some(l), Some(r)) => l.promote(r),
            (Some(k), None) | (None, Some(k)) => k.stack_kind(),
            (None, None) => PrimitiveKind::Int,
        };
        ExpressionDef::Math {
            op,
            left: Box::new(self),
            right: Box::new(other),
            ty: TypeDef::Primitive(kind),
        }
    }

    /// `condition ? self : otherwise`, typed as `self`.
    pub fn when(self, condition: ExpressionDef, otherwise: ExpressionDef) -> Self {
        let ty = self.ty();
        ExpressionDef::Conditional {
            condition: Box::new(condition),
            when_true: Box::new(self),
            when_false: Box::new(otherwise),
            ty,
        }
    }

    pub fn array_element(self, index: ExpressionDef) -> Self {
        ExpressionDef::ArrayElement {
            array: Box::new(self),
            index: Box::new(index),
        }
    }

    pub fn array_length(self) -> Self {
        ExpressionDef::ArrayLength(Box::new(self))
    }

    /// `return self;`
    pub fn returning(self) -> StatementDef {
        StatementDef::Return(Some(self))
    }

    /// Evaluate for side effects only.
    pub fn into_statement(self) -> StatementDef {
        StatementDef::Expression(self)
    }

    /// Declare a local initialized with this value and continue with `rest`.
    pub fn new_local(
        self,
        name: impl Into<String>,
        rest: impl FnOnce(VariableDef) -> StatementDef,
    ) -> StatementDef {
        let name = name.into();
        let ty = self.ty();
        let local = VariableDef::local(name.clone(), ty.clone());
        StatementDef::Multi(vec![
            StatementDef::DefineAndAssign {
                name,
                ty,
                value: self,
            },
            rest(local),
        ])
    }
}

fn numeric_kind(ty: &TypeDef) -> Option<PrimitiveKind> {
    ty.as_primitive().or_else(|| ty.boxed_kind())
}

// ============================================================================
// Typing
// ============================================================================

impl ExpressionDef {
    /// Static result type; `Void` for invocations of void methods.
    pub fn ty(&self) -> TypeDef {
        match self {
            ExpressionDef::Constant(constant) => constant.ty(),
            ExpressionDef::Variable(variable) => variable.ty(),
            ExpressionDef::InvokeInstance(invoke) => invoke.method.return_type.clone(),
            ExpressionDef::InvokeStatic(invoke) => invoke.method.return_type.clone(),
            ExpressionDef::NewInstance { ty, .. } => TypeDef::Class(ty.clone()),
            ExpressionDef::NewArray { component, .. }
            | ExpressionDef::NewArrayInitialized { component, .. } => {
                TypeDef::array_of(component.clone())
            }
            ExpressionDef::ArrayElement { array, .. } => array
                .ty()
                .component()
                .cloned()
                .unwrap_or_else(TypeDef::object),
            ExpressionDef::ArrayLength(_) => TypeDef::INT,
            ExpressionDef::Cast { target, .. } => target.clone(),
            ExpressionDef::Conditional { ty, .. } | ExpressionDef::Math { ty, .. } => ty.clone(),
            ExpressionDef::Unary { op, operand } => match op {
                UnaryOp::Not => TypeDef::BOOLEAN,
                UnaryOp::Negate | UnaryOp::BitNot => numeric_kind(&operand.ty())
                    .map(|kind| TypeDef::Primitive(kind.stack_kind()))
                    .unwrap_or(TypeDef::INT),
            },
            ExpressionDef::InstanceOf { .. }
            | ExpressionDef::Compare { .. }
            | ExpressionDef::And(..)
            | ExpressionDef::Or(..)
            | ExpressionDef::IsNull(_)
            | ExpressionDef::IsNotNull(_)
            | ExpressionDef::EqualsStructurally(..)
            | ExpressionDef::EqualsReferentially(..) => TypeDef::BOOLEAN,
            ExpressionDef::Switch(switch) => switch.ty().clone(),
        }
    }
}

impl From<Constant> for ExpressionDef {
    fn from(constant: Constant) -> Self {
        ExpressionDef::Constant(constant)
    }
}
