//! Method definitions and deferred bodies.
//!
//! A body can be given directly as statements, or as a closure receiving the
//! receiver variable and the parameter variables. The closure form exists for
//! bodies that refer to sibling members of a definition that is still being
//! built; the owning object builder invokes it exactly once and stores the
//! resulting statements in its place.

use std::fmt;
use std::sync::Arc;

use crate::{
    AnnotationDef, Modifiers, ParameterDef, StatementDef, TypeDef, TypeHash, TypeVariableDef,
    VariableDef,
};

/// Body constructor: `(self, parameters) -> statements`.
pub type BodyFn = Arc<dyn Fn(&VariableDef, &[VariableDef]) -> StatementDef + Send + Sync>;

/// Body of a method.
#[derive(Clone)]
pub enum MethodBody {
    /// Abstract or interface method.
    None,
    Statements(StatementDef),
    /// Built when the owning definition is built.
    Deferred(BodyFn),
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodBody::None => write!(f, "None"),
            MethodBody::Statements(statements) => f.debug_tuple("Statements").field(statements).finish(),
            MethodBody::Deferred(_) => write!(f, "Deferred(..)"),
        }
    }
}

/// A method or constructor of a generated type.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub modifiers: Modifiers,
    pub return_type: TypeDef,
    pub parameters: Vec<ParameterDef>,
    pub type_parameters: Vec<TypeVariableDef>,
    pub annotations: Vec<AnnotationDef>,
    body: MethodBody,
}

impl MethodDef {
    /// Name of instance constructors.
    pub const CONSTRUCTOR: &'static str = "<init>";
    /// Name of the static initializer.
    pub const STATIC_INITIALIZER: &'static str = "<clinit>";

    pub fn builder(name: impl Into<String>) -> MethodDefBuilder {
        MethodDefBuilder {
            name: name.into(),
            modifiers: Modifiers::empty(),
            return_type: TypeDef::Void,
            parameters: Vec::new(),
            type_parameters: Vec::new(),
            annotations: Vec::new(),
            statements: Vec::new(),
        }
    }

    /// Builder for an instance constructor.
    pub fn constructor() -> MethodDefBuilder {
        Self::builder(Self::CONSTRUCTOR)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == Self::CONSTRUCTOR
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract()
    }

    pub fn parameter_types(&self) -> Vec<TypeDef> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }

    /// Variables referring to the parameters, in order.
    pub fn parameter_variables(&self) -> Vec<VariableDef> {
        self.parameters
            .iter()
            .map(|p| VariableDef::parameter(p.name.clone(), p.ty.clone()))
            .collect()
    }

    /// Resolved body, if any. Deferred bodies read as absent until built.
    pub fn body(&self) -> Option<&StatementDef> {
        match &self.body {
            MethodBody::Statements(statements) => Some(statements),
            MethodBody::None | MethodBody::Deferred(_) => None,
        }
    }

    pub fn has_body(&self) -> bool {
        !matches!(self.body, MethodBody::None)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.body, MethodBody::Deferred(_))
    }

    /// Replace the body.
    pub fn with_body(mut self, body: StatementDef) -> Self {
        self.body = MethodBody::Statements(body);
        self
    }

    /// Name plus erased parameter types; two methods with the same key
    /// cannot coexist on one definition.
    pub fn signature_key(&self) -> TypeHash {
        let params: Vec<TypeHash> = self
            .parameters
            .iter()
            .map(|p| p.ty.erasure().type_hash())
            .collect();
        TypeHash::from_method(&self.name, &params)
    }

    /// Human-readable signature, e.g. `add(int, java.lang.String)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.parameters.iter().map(|p| p.ty.to_string()).collect();
        format!("{}({})", self.name, params.join(", "))
    }

    /// Run a deferred body constructor, consuming it.
    pub(crate) fn resolve_body(&mut self, this: &VariableDef) {
        if let MethodBody::Deferred(build) = &self.body {
            let build = Arc::clone(build);
            let params = self.parameter_variables();
            self.body = MethodBody::Statements(build(this, &params));
        }
    }
}

/// Builder for [`MethodDef`].
#[derive(Debug, Clone)]
pub struct MethodDefBuilder {
    name: String,
    modifiers: Modifiers,
    return_type: TypeDef,
    parameters: Vec<ParameterDef>,
    type_parameters: Vec<TypeVariableDef>,
    annotations: Vec<AnnotationDef>,
    statements: Vec<StatementDef>,
}

impl MethodDefBuilder {
    pub fn add_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    pub fn returns(mut self, ty: TypeDef) -> Self {
        self.return_type = ty;
        self
    }

    pub fn add_parameter(self, name: impl Into<String>, ty: TypeDef) -> Self {
        self.add_parameter_def(ParameterDef::new(name, ty))
    }

    pub fn add_parameter_def(mut self, parameter: ParameterDef) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn add_type_parameter(mut self, variable: TypeVariableDef) -> Self {
        self.type_parameters.push(variable);
        self
    }

    pub fn add_annotation(mut self, annotation: AnnotationDef) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Append a statement to the body.
    pub fn add_statement(mut self, statement: StatementDef) -> Self {
        self.statements.push(statement);
        self
    }

    /// Finish with the statements added so far. No statements means no
    /// body, except for constructors, which get an empty one.
    pub fn build(self) -> MethodDef {
        let body = if self.statements.is_empty() && self.name != MethodDef::CONSTRUCTOR {
            MethodBody::None
        } else {
            MethodBody::Statements(StatementDef::Multi(self.statements.clone()))
        };
        self.finish(body)
    }

    /// Finish with a body built later from the receiver and parameters.
    ///
    /// Statements added with `add_statement` run before the built body.
    pub fn build_with<F>(self, body: F) -> MethodDef
    where
        F: Fn(&VariableDef, &[VariableDef]) -> StatementDef + Send + Sync + 'static,
    {
        if self.statements.is_empty() {
            return self.finish(MethodBody::Deferred(Arc::new(body)));
        }
        let prefix = self.statements.clone();
        self.finish(MethodBody::Deferred(Arc::new(
            move |this: &VariableDef, params: &[VariableDef]| {
                let mut statements = prefix.clone();
                statements.push(body(this, params));
                StatementDef::Multi(statements)
            },
        )))
    }

    fn finish(self, body: MethodBody) -> MethodDef {
        MethodDef {
            name: self.name,
            modifiers: self.modifiers,
            return_type: self.return_type,
            parameters: self.parameters,
            type_parameters: self.type_parameters,
            annotations: self.annotations,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassTypeDef, ExpressionDef, QualifiedName};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn this() -> VariableDef {
        VariableDef::this(ClassTypeDef::of(QualifiedName::new("a", "B")))
    }

    #[test]
    fn statements_form_body() {
        let method = MethodDef::builder("answer")
            .returns(TypeDef::INT)
            .add_statement(ExpressionDef::int(42).returning())
            .build();
        assert!(method.has_body());
        assert!(!method.is_deferred());
        assert!(method.body().is_some());
    }

    #[test]
    fn no_statements_means_no_body() {
        let method = MethodDef::builder("run").build();
        assert!(!method.has_body());
        assert!(method.body().is_none());
    }

    #[test]
    fn deferred_body_runs_once_with_parameters() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut method = MethodDef::builder("echo")
            .returns(TypeDef::INT)
            .add_parameter("value", TypeDef::INT)
            .build_with(move |_, params| {
                counter.fetch_add(1, Ordering::SeqCst);
                params[0].read().returning()
            });
        assert!(method.is_deferred());
        assert!(method.body().is_none());

        method.resolve_body(&this());
        method.resolve_body(&this());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            method.body(),
            Some(&StatementDef::Return(Some(ExpressionDef::Variable(
                VariableDef::parameter("value", TypeDef::INT)
            ))))
        );
    }

    #[test]
    fn signature_key_uses_erasure() {
        let list = ClassTypeDef::of(QualifiedName::new("java.util", "List"));
        let a = MethodDef::builder("m")
            .add_parameter("x", TypeDef::Class(list.clone()))
            .build();
        let b = MethodDef::builder("m")
            .add_parameter(
                "y",
                TypeDef::Class(list.parameterize(vec![TypeDef::string()]).unwrap()),
            )
            .build();
        assert_eq!(a.signature_key(), b.signature_key());
        assert_eq!(a.signature(), "m(java.util.List)");
    }
}
