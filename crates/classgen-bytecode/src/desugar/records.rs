//! Record components, canonical constructor, accessors and structural
//! `equals`/`hashCode`.

use classgen_core::{
    ClassTypeDef, CompareOp, ExpressionDef, FieldDef, MathOp, MethodDef, MethodRef, Modifiers,
    PrimitiveKind, PropertyDef, RecordDef, StatementDef, TypeDef, VariableDef,
};

use super::ClassPlan;

pub(super) fn lower_record(plan: &mut ClassPlan, def: &RecordDef) {
    let this = plan.this_type.clone();
    let receiver = VariableDef::this(this.clone());
    let components = def.components();

    for component in components {
        let mut field = FieldDef::new(component.name.clone(), component.ty.clone())
            .with_modifiers(Modifiers::PRIVATE | Modifiers::FINAL);
        field.annotations = component.annotations.clone();
        plan.add_field(field, 0);
    }

    let types: Vec<TypeDef> = components.iter().map(|c| c.ty.clone()).collect();
    if plan.find_method(MethodDef::CONSTRUCTOR, &types).is_none() {
        let mut canonical = MethodDef::constructor().add_modifiers(Modifiers::PUBLIC);
        for component in components {
            canonical = canonical
                .add_parameter(component.name.clone(), component.ty.clone())
                .add_statement(
                    receiver
                        .field(this.clone(), component.name.clone(), component.ty.clone())
                        .assign(VariableDef::parameter(component.name.clone(), component.ty.clone())),
                );
        }
        plan.add_method(canonical.build());
    }

    for component in components {
        if plan.find_method(&component.name, &[]).is_some() {
            continue;
        }
        let field = receiver.field(this.clone(), component.name.clone(), component.ty.clone());
        plan.add_method(
            MethodDef::builder(component.name.clone())
                .add_modifiers(Modifiers::PUBLIC)
                .returns(component.ty.clone())
                .add_statement(field.read().returning())
                .build(),
        );
    }

    if !def.structural_equality() {
        return;
    }
    if plan.find_method("equals", &[TypeDef::object()]).is_none() {
        let method = equals_method(&this, components);
        plan.add_method(method);
    }
    if plan.find_method("hashCode", &[]).is_none() {
        let method = hash_code_method(&this, components);
        plan.add_method(method);
    }
}

// ============================================================================
// equals
// ============================================================================

fn static_call(owner: &str, name: &str, parameters: Vec<TypeDef>, ret: TypeDef) -> MethodRef {
    MethodRef::new(ClassTypeDef::java_lang(owner), name, parameters, ret)
}

fn component_equals(ty: &TypeDef, left: ExpressionDef, right: ExpressionDef) -> ExpressionDef {
    match ty.as_primitive() {
        // compare() keeps NaN equal to itself, matching the boxed equals.
        Some(kind @ (PrimitiveKind::Float | PrimitiveKind::Double)) => {
            let owner = if kind == PrimitiveKind::Float { "Float" } else { "Double" };
            ExpressionDef::invoke_static(
                static_call(owner, "compare", vec![ty.clone(), ty.clone()], TypeDef::INT),
                vec![left, right],
            )
            .compare(CompareOp::Eq, ExpressionDef::int(0))
        }
        Some(_) => left.compare(CompareOp::Eq, right),
        None => ExpressionDef::invoke_static(
            MethodRef::new(
                ClassTypeDef::objects(),
                "equals",
                vec![TypeDef::object(), TypeDef::object()],
                TypeDef::BOOLEAN,
            ),
            vec![left, right],
        ),
    }
}

fn equals_method(this: &ClassTypeDef, components: &[PropertyDef]) -> MethodDef {
    let this_ty = TypeDef::Class(this.clone());
    let receiver = VariableDef::this(this.clone());
    let other = VariableDef::parameter("other", TypeDef::object());
    let that = VariableDef::local("$that", this_ty.clone());

    let all_equal = components
        .iter()
        .map(|component| {
            let mine = receiver.field(this.clone(), component.name.clone(), component.ty.clone());
            let theirs = that.field(this.clone(), component.name.clone(), component.ty.clone());
            component_equals(&component.ty, mine.read(), theirs.read())
        })
        .reduce(ExpressionDef::and)
        .unwrap_or_else(|| ExpressionDef::boolean(true));

    MethodDef::builder("equals")
        .add_modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
        .returns(TypeDef::BOOLEAN)
        .add_parameter("other", TypeDef::object())
        .add_statement(StatementDef::if_then(
            receiver.read().equals_referentially(other.read()),
            ExpressionDef::boolean(true).returning(),
        ))
        .add_statement(StatementDef::if_then(
            other.read().instance_of(this_ty.clone()).not(),
            ExpressionDef::boolean(false).returning(),
        ))
        .add_statement(StatementDef::define("$that", other.read().cast(this_ty)))
        .add_statement(all_equal.returning())
        .build()
}

// ============================================================================
// hashCode
// ============================================================================

fn component_hash(ty: &TypeDef, value: ExpressionDef) -> ExpressionDef {
    let wrapper_hash = |owner: &str| {
        ExpressionDef::invoke_static(
            static_call(owner, "hashCode", vec![ty.clone()], TypeDef::INT),
            vec![value.clone()],
        )
    };
    match ty.as_primitive() {
        Some(PrimitiveKind::Boolean) => wrapper_hash("Boolean"),
        Some(PrimitiveKind::Long) => wrapper_hash("Long"),
        Some(PrimitiveKind::Float) => wrapper_hash("Float"),
        Some(PrimitiveKind::Double) => wrapper_hash("Double"),
        Some(_) => value,
        None => ExpressionDef::invoke_static(
            MethodRef::new(
                ClassTypeDef::objects(),
                "hashCode",
                vec![TypeDef::object()],
                TypeDef::INT,
            ),
            vec![value],
        ),
    }
}

fn hash_code_method(this: &ClassTypeDef, components: &[PropertyDef]) -> MethodDef {
    let receiver = VariableDef::this(this.clone());
    let hash = components
        .iter()
        .map(|component| {
            let field = receiver.field(this.clone(), component.name.clone(), component.ty.clone());
            component_hash(&component.ty, field.read())
        })
        .reduce(|acc, next| {
            ExpressionDef::int(31)
                .math(MathOp::Mul, acc)
                .math(MathOp::Add, next)
        })
        .unwrap_or_else(|| ExpressionDef::int(0));

    MethodDef::builder("hashCode")
        .add_modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
        .returns(TypeDef::INT)
        .add_statement(hash.returning())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WriterOptions;
    use classgen_core::{ObjectDef, QualifiedName};

    fn point(structural: bool) -> ObjectDef {
        let mut builder = ObjectDef::record(QualifiedName::new("demo", "Point"))
            .add_component(PropertyDef::new("x", TypeDef::INT))
            .add_component(PropertyDef::new("label", TypeDef::string()));
        if structural {
            builder = builder.with_structural_equality();
        }
        builder.build().unwrap()
    }

    #[test]
    fn components_become_final_fields_and_accessors() {
        let plan = ClassPlan::build(&point(false), &WriterOptions::default()).unwrap();
        assert_eq!(plan.fields.len(), 2);
        assert!(plan.find_method("x", &[]).is_some());
        assert!(plan.find_method("label", &[]).is_some());
        assert!(plan.find_method("equals", &[TypeDef::object()]).is_none());
    }

    #[test]
    fn canonical_constructor_is_only_constructor() {
        let plan = ClassPlan::build(&point(false), &WriterOptions::default()).unwrap();
        let ctors: Vec<_> = plan.constructors().collect();
        assert_eq!(ctors.len(), 1);
        assert_eq!(
            ctors[0].def.parameter_types(),
            vec![TypeDef::INT, TypeDef::string()]
        );
        // super call plus two assignments
        let body = ctors[0].def.body().cloned().unwrap().into_statements();
        assert_eq!(body.len(), 3);
    }

    #[test]
    fn structural_equality_adds_equals_and_hash_code() {
        let plan = ClassPlan::build(&point(true), &WriterOptions::default()).unwrap();
        assert!(plan.find_method("equals", &[TypeDef::object()]).is_some());
        assert!(plan.find_method("hashCode", &[]).is_some());
    }

    #[test]
    fn double_components_compare_through_wrapper() {
        let left = ExpressionDef::double(1.0);
        let right = ExpressionDef::double(2.0);
        match component_equals(&TypeDef::DOUBLE, left, right) {
            ExpressionDef::Compare { left, .. } => match *left {
                ExpressionDef::InvokeStatic(call) => assert_eq!(call.method.name, "compare"),
                other => panic!("expected Double.compare, got {other:?}"),
            },
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn int_components_hash_to_themselves() {
        let value = ExpressionDef::int(5);
        assert_eq!(component_hash(&TypeDef::INT, value.clone()), value);
    }
}
