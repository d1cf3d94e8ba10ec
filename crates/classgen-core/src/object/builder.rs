use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::{
    ClassDef, EnumConstant, EnumDef, FieldDef, InterfaceDef, MethodDef, ObjectDef, ObjectHeader,
    PropertyDef, RecordDef,
};
use crate::{
    AnnotationDef, ClassTypeDef, DefinitionRef, ExpressionDef, ModelError, Modifiers,
    QualifiedName, StatementDef, TypeKind, TypeVariableDef, VariableDef,
};

/// Builder shared by all definition kinds.
///
/// Members may be added in any order; their insertion order is preserved.
/// Operations that only apply to one kind (superclass, enum constants,
/// record components) are recorded as errors on other kinds and reported by
/// [`build`](Self::build).
///
/// ```
/// use classgen_core::{ExpressionDef, MethodDef, Modifiers, ObjectDef, QualifiedName, TypeDef};
///
/// let def = ObjectDef::class(QualifiedName::new("demo", "Greeter"))
///     .add_modifiers(Modifiers::PUBLIC)
///     .add_method(
///         MethodDef::builder("greet")
///             .add_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
///             .returns(TypeDef::string())
///             .add_statement(ExpressionDef::string("hello").returning())
///             .build(),
///     )
///     .build()
///     .unwrap();
/// assert_eq!(def.methods().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ObjectDefBuilder {
    shell: Arc<DefinitionRef>,
    modifiers: Modifiers,
    annotations: Vec<AnnotationDef>,
    type_parameters: Vec<TypeVariableDef>,
    superclass: Option<ClassTypeDef>,
    superinterfaces: Vec<ClassTypeDef>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
    properties: Vec<PropertyDef>,
    static_initializer: Vec<StatementDef>,
    inner: Vec<ObjectDef>,
    constants: Vec<EnumConstant>,
    components: Vec<PropertyDef>,
    structural_equality: bool,
    misuse: Option<ModelError>,
}

impl ObjectDefBuilder {
    pub(crate) fn new(name: QualifiedName, kind: TypeKind) -> Self {
        Self {
            shell: Arc::new(DefinitionRef { name, kind }),
            modifiers: Modifiers::empty(),
            annotations: Vec::new(),
            type_parameters: Vec::new(),
            superclass: None,
            superinterfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            static_initializer: Vec::new(),
            inner: Vec::new(),
            constants: Vec::new(),
            components: Vec::new(),
            structural_equality: false,
            misuse: None,
        }
    }

    /// Reference to the definition being built, usable inside its own
    /// member bodies.
    pub fn type_ref(&self) -> ClassTypeDef {
        ClassTypeDef::of_definition(self.shell.clone())
    }

    pub fn name(&self) -> &QualifiedName {
        &self.shell.name
    }

    // ==========================================================================
    // Common members
    // ==========================================================================

    pub fn add_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    pub fn add_annotation(mut self, annotation: AnnotationDef) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn add_type_parameter(mut self, variable: TypeVariableDef) -> Self {
        self.type_parameters.push(variable);
        self
    }

    /// Add a superinterface; repeated interfaces are kept once.
    pub fn add_superinterface(mut self, interface: ClassTypeDef) -> Self {
        if !self.superinterfaces.contains(&interface) {
            self.superinterfaces.push(interface);
        }
        self
    }

    pub fn add_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn add_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn add_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    /// Statement run once when the type is initialized, after static field
    /// initializers.
    pub fn add_static_initializer(mut self, statement: StatementDef) -> Self {
        self.static_initializer.push(statement);
        self
    }

    /// Add an owned inner definition.
    pub fn add_inner_type(mut self, inner: ObjectDef) -> Self {
        self.inner.push(inner);
        self
    }

    // ==========================================================================
    // Kind-specific members
    // ==========================================================================

    /// Superclass of a class.
    pub fn superclass(mut self, superclass: ClassTypeDef) -> Self {
        if self.require(TypeKind::Class, "setting a superclass") {
            self.superclass = Some(superclass);
        }
        self
    }

    /// Enum constant constructed without arguments.
    pub fn add_enum_constant(self, name: impl Into<String>) -> Self {
        self.add_enum_constant_with(name, Vec::new())
    }

    /// Enum constant constructed with `arguments`.
    pub fn add_enum_constant_with(mut self, name: impl Into<String>, arguments: Vec<ExpressionDef>) -> Self {
        if self.require(TypeKind::Enum, "adding an enum constant") {
            self.constants.push(EnumConstant {
                name: name.into(),
                arguments,
            });
        }
        self
    }

    /// Record component.
    pub fn add_component(mut self, component: PropertyDef) -> Self {
        if self.require(TypeKind::Record, "adding a record component") {
            self.components.push(component);
        }
        self
    }

    /// Derive `equals`/`hashCode` from the record components.
    pub fn with_structural_equality(mut self) -> Self {
        if self.require(TypeKind::Record, "requesting structural equality") {
            self.structural_equality = true;
        }
        self
    }

    fn require(&mut self, kind: TypeKind, operation: &'static str) -> bool {
        if self.shell.kind == kind {
            return true;
        }
        if self.misuse.is_none() {
            self.misuse = Some(ModelError::WrongKind {
                owner: self.shell.name.to_string(),
                kind: self.shell.kind.describe(),
                operation,
            });
        }
        false
    }

    // ==========================================================================
    // Build
    // ==========================================================================

    /// Validate the member set, resolve deferred bodies and freeze.
    pub fn build(mut self) -> Result<ObjectDef, ModelError> {
        if let Some(error) = self.misuse.take() {
            return Err(error);
        }
        let owner = self.shell.name.to_string();
        let kind = self.shell.kind;

        self.check_fields(&owner, kind)?;
        self.check_methods(&owner, kind)?;
        if kind == TypeKind::Enum {
            self.check_constants(&owner)?;
        }

        let this = VariableDef::This(self.type_ref());
        for method in &mut self.methods {
            method.resolve_body(&this);
            if let Some(body) = method.body() {
                body.validate()?;
            }
        }
        for initializer in self
            .fields
            .iter()
            .filter_map(|f| f.initializer.as_ref())
            .chain(self.properties.iter().filter_map(|p| p.initializer.as_ref()))
        {
            initializer.validate()?;
        }
        for statement in &self.static_initializer {
            statement.validate()?;
        }
        for constant in &self.constants {
            constant.arguments.iter().try_for_each(ExpressionDef::validate)?;
        }

        let header = ObjectHeader {
            shell: self.shell,
            modifiers: self.modifiers,
            annotations: self.annotations,
            type_parameters: self.type_parameters,
            superinterfaces: self.superinterfaces,
            fields: self.fields,
            methods: self.methods,
            properties: self.properties,
            static_initializer: self.static_initializer,
            inner: self.inner,
        };
        Ok(match kind {
            TypeKind::Class => ObjectDef::Class(ClassDef {
                header,
                superclass: self.superclass,
            }),
            TypeKind::Interface => ObjectDef::Interface(InterfaceDef { header }),
            TypeKind::Enum => ObjectDef::Enum(EnumDef {
                header,
                constants: self.constants,
            }),
            TypeKind::Record => ObjectDef::Record(RecordDef {
                header,
                components: self.components,
                structural_equality: self.structural_equality,
            }),
        })
    }

    fn check_fields(&self, owner: &str, kind: TypeKind) -> Result<(), ModelError> {
        let mut components = FxHashSet::default();
        for component in &self.components {
            if !components.insert(component.name.as_str()) {
                return Err(ModelError::DuplicateComponent {
                    owner: owner.to_string(),
                    name: component.name.clone(),
                });
            }
        }

        let mut names = components;
        let declared = self
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.properties.iter().map(|p| p.name.as_str()));
        for name in declared {
            if !names.insert(name) {
                return Err(ModelError::DuplicateField {
                    owner: owner.to_string(),
                    name: name.to_string(),
                });
            }
        }

        if kind == TypeKind::Interface
            && let Some(field) = self.fields.iter().find(|f| !f.is_static())
        {
            return Err(ModelError::InterfaceFieldNotStatic {
                owner: owner.to_string(),
                field: field.name.clone(),
            });
        }
        Ok(())
    }

    fn check_methods(&self, owner: &str, kind: TypeKind) -> Result<(), ModelError> {
        let mut signatures = FxHashSet::default();
        for method in &self.methods {
            if !signatures.insert(method.signature_key()) {
                return Err(ModelError::DuplicateMethod {
                    owner: owner.to_string(),
                    signature: method.signature(),
                });
            }
            if kind != TypeKind::Interface && !method.has_body() && !method.is_abstract() {
                return Err(ModelError::MissingBody {
                    owner: owner.to_string(),
                    method: method.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_constants(&self, owner: &str) -> Result<(), ModelError> {
        if self.constants.is_empty() {
            return Err(ModelError::EmptyEnum {
                owner: owner.to_string(),
            });
        }
        let mut names = FxHashSet::default();
        let constructors: Vec<&MethodDef> = self.methods.iter().filter(|m| m.is_constructor()).collect();
        for constant in &self.constants {
            if !names.insert(constant.name.as_str()) {
                return Err(ModelError::DuplicateEnumConstant {
                    owner: owner.to_string(),
                    name: constant.name.clone(),
                });
            }
            let arity = constant.arguments.len();
            let matched = if constructors.is_empty() {
                arity == 0
            } else {
                constructors.iter().any(|c| c.parameters.len() == arity)
            };
            if !matched {
                return Err(ModelError::EnumConstructorNotFound {
                    owner: owner.to_string(),
                    constant: constant.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MethodRef, TypeDef};

    fn name(simple: &str) -> QualifiedName {
        QualifiedName::new("com.example", simple)
    }

    fn returning_int(method: &str, value: i32) -> MethodDef {
        MethodDef::builder(method)
            .returns(TypeDef::INT)
            .add_statement(ExpressionDef::int(value).returning())
            .build()
    }

    #[test]
    fn members_keep_insertion_order() {
        let def = ObjectDef::class(name("Ordered"))
            .add_field(FieldDef::new("z", TypeDef::INT))
            .add_field(FieldDef::new("a", TypeDef::INT))
            .add_method(returning_int("second", 2))
            .add_method(returning_int("first", 1))
            .build()
            .unwrap();
        let fields: Vec<_> = def.fields().iter().map(|f| f.name.as_str()).collect();
        let methods: Vec<_> = def.methods().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(fields, ["z", "a"]);
        assert_eq!(methods, ["second", "first"]);
    }

    #[test]
    fn duplicate_field_rejected() {
        let result = ObjectDef::class(name("Dup"))
            .add_field(FieldDef::new("x", TypeDef::INT))
            .add_property(PropertyDef::new("x", TypeDef::LONG))
            .build();
        assert!(matches!(result, Err(ModelError::DuplicateField { ref name, .. }) if name == "x"));
    }

    #[test]
    fn duplicate_method_signature_rejected() {
        let result = ObjectDef::class(name("Dup"))
            .add_method(returning_int("m", 1))
            .add_method(returning_int("m", 2))
            .build();
        assert!(matches!(result, Err(ModelError::DuplicateMethod { ref signature, .. }) if signature == "m()"));
    }

    #[test]
    fn overloads_are_allowed() {
        let result = ObjectDef::class(name("Overloads"))
            .add_method(returning_int("m", 1))
            .add_method(
                MethodDef::builder("m")
                    .add_parameter("x", TypeDef::INT)
                    .add_statement(StatementDef::Return(None))
                    .build(),
            )
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn enum_requires_constants() {
        let result = ObjectDef::enumeration(name("Empty")).build();
        assert!(matches!(result, Err(ModelError::EmptyEnum { .. })));
    }

    #[test]
    fn duplicate_enum_constant_rejected() {
        let result = ObjectDef::enumeration(name("Color"))
            .add_enum_constant("RED")
            .add_enum_constant("RED")
            .build();
        assert!(matches!(result, Err(ModelError::DuplicateEnumConstant { .. })));
    }

    #[test]
    fn enum_constant_arguments_need_constructor() {
        let result = ObjectDef::enumeration(name("Planet"))
            .add_enum_constant_with("EARTH", vec![ExpressionDef::int(3)])
            .build();
        assert!(matches!(result, Err(ModelError::EnumConstructorNotFound { .. })));

        let ok = ObjectDef::enumeration(name("Planet"))
            .add_enum_constant_with("EARTH", vec![ExpressionDef::int(3)])
            .add_method(
                MethodDef::constructor()
                    .add_parameter("order", TypeDef::INT)
                    .build(),
            )
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn duplicate_component_rejected() {
        let result = ObjectDef::record(name("Pair"))
            .add_component(PropertyDef::new("a", TypeDef::INT))
            .add_component(PropertyDef::new("a", TypeDef::INT))
            .build();
        assert!(matches!(result, Err(ModelError::DuplicateComponent { .. })));
    }

    #[test]
    fn kind_specific_operation_on_wrong_kind() {
        let result = ObjectDef::class(name("NotEnum"))
            .add_enum_constant("A")
            .build();
        assert!(matches!(
            result,
            Err(ModelError::WrongKind {
                kind: "a class",
                ..
            })
        ));
        let result = ObjectDef::record(name("NotClass"))
            .superclass(ClassTypeDef::object())
            .build();
        assert!(matches!(result, Err(ModelError::WrongKind { .. })));
    }

    #[test]
    fn bodiless_class_method_must_be_abstract() {
        let result = ObjectDef::class(name("Partial"))
            .add_method(MethodDef::builder("run").build())
            .build();
        assert!(matches!(result, Err(ModelError::MissingBody { .. })));

        let result = ObjectDef::class(name("Partial"))
            .add_modifiers(Modifiers::ABSTRACT)
            .add_method(MethodDef::builder("run").add_modifiers(Modifiers::ABSTRACT).build())
            .build();
        assert!(result.is_ok());

        let result = ObjectDef::interface(name("Runner"))
            .add_method(MethodDef::builder("run").build())
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn interface_fields_must_be_static() {
        let result = ObjectDef::interface(name("Constants"))
            .add_field(FieldDef::new("X", TypeDef::INT))
            .build();
        assert!(matches!(result, Err(ModelError::InterfaceFieldNotStatic { .. })));
    }

    #[test]
    fn statement_bodies_survive_build() {
        let x = VariableDef::parameter("x", TypeDef::INT);
        let def = ObjectDef::class(name("Identity"))
            .add_method(
                MethodDef::builder("pick")
                    .add_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
                    .returns(TypeDef::INT)
                    .add_parameter("x", TypeDef::INT)
                    .add_statement(x.read().returning())
                    .build(),
            )
            .build()
            .unwrap();

        let method = &def.methods()[0];
        assert!(!method.is_deferred());
        assert_eq!(method.body(), Some(&x.read().returning()));
    }

    #[test]
    fn statement_bodies_are_validated() {
        let concat = MethodRef::new(
            ClassTypeDef::string(),
            "concat",
            vec![TypeDef::string()],
            TypeDef::string(),
        );
        let result = ObjectDef::class(name("Joiner"))
            .add_method(
                MethodDef::builder("join")
                    .add_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
                    .returns(TypeDef::string())
                    .add_statement(ExpressionDef::string("a").invoke(concat, vec![]).returning())
                    .build(),
            )
            .build();
        assert_eq!(
            result.unwrap_err(),
            ModelError::ArgumentCount {
                method: "concat".into(),
                expected: 1,
                found: 0,
            }
        );
    }

    #[test]
    fn deferred_body_sees_own_type() {
        let builder = ObjectDef::class(name("Counter"));
        let self_type = builder.type_ref();
        let def = builder
            .add_field(FieldDef::new("count", TypeDef::INT))
            .add_method(MethodDef::builder("count").returns(TypeDef::INT).build_with(
                move |this, _| {
                    this.field(self_type.clone(), "count", TypeDef::INT)
                        .read()
                        .returning()
                },
            ))
            .build()
            .unwrap();

        let method = &def.methods()[0];
        assert!(!method.is_deferred());
        match method.body() {
            Some(StatementDef::Return(Some(ExpressionDef::Variable(VariableDef::Field {
                instance,
                owner,
                ..
            })))) => {
                assert_eq!(*owner, def.type_ref());
                assert_eq!(
                    **instance,
                    ExpressionDef::Variable(VariableDef::This(ClassTypeDef::of(name("Counter"))))
                );
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn arity_checked_at_build() {
        let concat = MethodRef::new(
            ClassTypeDef::string(),
            "concat",
            vec![TypeDef::string()],
            TypeDef::string(),
        );
        let result = ObjectDef::class(name("Bad"))
            .add_method(
                MethodDef::builder("m")
                    .returns(TypeDef::string())
                    .add_statement(ExpressionDef::string("a").invoke(concat, vec![]).returning())
                    .build(),
            )
            .build();
        assert!(matches!(result, Err(ModelError::ArgumentCount { .. })));
    }

    #[test]
    fn inner_types_are_owned_copies() {
        let inner = ObjectDef::class(name("Outer").nested("Inner")).build().unwrap();
        let outer = ObjectDef::class(name("Outer"))
            .add_inner_type(inner)
            .build()
            .unwrap();
        let copy = outer.clone();
        assert_eq!(copy.inner_types().len(), 1);
        assert_eq!(copy.inner_types()[0].name().to_string(), "com.example.Outer$Inner");
        assert!(!std::ptr::eq(&outer.inner_types()[0], &copy.inner_types()[0]));
    }

    #[test]
    fn superinterfaces_deduplicated() {
        let def = ObjectDef::class(name("Impl"))
            .add_superinterface(ClassTypeDef::auto_closeable())
            .add_superinterface(ClassTypeDef::auto_closeable())
            .build()
            .unwrap();
        assert_eq!(def.superinterfaces().len(), 1);
    }
}
