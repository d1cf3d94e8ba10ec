//! Enum constants, `$VALUES`, `values()` and `valueOf(String)`.

use classgen_core::{
    ClassTypeDef, CompareOp, EnumConstant, EnumDef, ExpressionDef, FieldDef, MathOp, MethodDef,
    MethodRef, Modifiers, StatementDef, TypeDef, VariableDef,
};

use super::ClassPlan;
use crate::class_file::access;

const VALUES_FIELD: &str = "$VALUES";
const VALUES_METHOD: &str = "$values";

/// Declared parameter types of the constructor a constant is created with:
/// same arity and erased argument types, else the first of the same arity.
fn constructor_for(plan: &ClassPlan, constant: &EnumConstant) -> Vec<TypeDef> {
    let arity = constant.arguments.len();
    let argument_types: Vec<TypeDef> = constant
        .arguments
        .iter()
        .map(|argument| argument.ty().erasure())
        .collect();
    let candidates: Vec<_> = plan
        .constructors()
        .filter(|ctor| ctor.def.parameters.len() == arity)
        .collect();
    candidates
        .iter()
        .find(|ctor| {
            ctor.def
                .parameters
                .iter()
                .zip(&argument_types)
                .all(|(parameter, argument)| parameter.ty.erasure() == *argument)
        })
        .or_else(|| candidates.first())
        .map(|ctor| ctor.def.parameter_types())
        .unwrap_or_default()
}

pub(super) fn lower_enum(plan: &mut ClassPlan, def: &EnumDef) {
    let this = plan.this_type.clone();
    let this_ty = TypeDef::Class(this.clone());
    let array_ty = TypeDef::array_of(this_ty.clone());
    let values = VariableDef::static_field(this.clone(), VALUES_FIELD, array_ty.clone());

    let mut items = Vec::with_capacity(def.constants().len());
    for (ordinal, constant) in def.constants().iter().enumerate() {
        let field = FieldDef::new(constant.name.clone(), this_ty.clone())
            .with_modifiers(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL);
        plan.add_field(field, access::ENUM);

        let mut parameter_types = vec![TypeDef::string(), TypeDef::INT];
        parameter_types.extend(constructor_for(plan, constant));
        let mut arguments = vec![
            ExpressionDef::string(constant.name.clone()),
            ExpressionDef::int(ordinal as i32),
        ];
        arguments.extend(constant.arguments.iter().cloned());

        let target = VariableDef::static_field(this.clone(), constant.name.clone(), this_ty.clone());
        plan.static_init.push(target.assign(ExpressionDef::new_instance(
            this.clone(),
            parameter_types,
            arguments,
        )));
        items.push(target.read());
    }

    plan.add_field(
        FieldDef::new(VALUES_FIELD, array_ty.clone()).with_modifiers(
            Modifiers::PRIVATE | Modifiers::STATIC | Modifiers::FINAL | Modifiers::SYNTHETIC,
        ),
        0,
    );
    plan.add_method(
        MethodDef::builder(VALUES_METHOD)
            .add_modifiers(Modifiers::PRIVATE | Modifiers::STATIC | Modifiers::SYNTHETIC)
            .returns(array_ty.clone())
            .add_statement(ExpressionDef::new_array_of(this_ty.clone(), items).returning())
            .build(),
    );
    plan.static_init.push(values.assign(ExpressionDef::invoke_static(
        MethodRef::new(this.clone(), VALUES_METHOD, vec![], array_ty.clone()),
        vec![],
    )));

    if plan.find_method("values", &[]).is_none() {
        let clone = MethodRef::new(array_ty.clone(), "clone", vec![], TypeDef::object());
        plan.add_method(
            MethodDef::builder("values")
                .add_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
                .returns(array_ty.clone())
                .add_statement(
                    values
                        .read()
                        .invoke(clone, vec![])
                        .cast(array_ty.clone())
                        .returning(),
                )
                .build(),
        );
    }

    if plan.find_method("valueOf", &[TypeDef::string()]).is_none() {
        let body = value_of_body(plan, &values);
        plan.add_method(
            MethodDef::builder("valueOf")
                .add_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
                .returns(this_ty)
                .add_parameter("name", TypeDef::string())
                .add_statement(body)
                .build(),
        );
    }
}

/// Linear scan of `$VALUES` by `name()`; an unknown name throws
/// `IllegalArgumentException`.
fn value_of_body(plan: &ClassPlan, values: &VariableDef) -> StatementDef {
    let this_ty = TypeDef::Class(plan.this_type.clone());
    let name = VariableDef::parameter("name", TypeDef::string());
    let index = VariableDef::local("$index", TypeDef::INT);
    let constant = VariableDef::local("$constant", this_ty);
    let constant_name = MethodRef::new(ClassTypeDef::enum_base(), "name", vec![], TypeDef::string());
    let concat = MethodRef::new(
        ClassTypeDef::string(),
        "concat",
        vec![TypeDef::string()],
        TypeDef::string(),
    );
    let error = ClassTypeDef::java_lang("IllegalArgumentException");
    let prefix = format!("No enum constant {}.", plan.name);

    StatementDef::multi([
        StatementDef::define("$index", ExpressionDef::int(0)),
        StatementDef::while_loop(
            index
                .read()
                .compare(CompareOp::Lt, values.read().array_length()),
            StatementDef::multi([
                StatementDef::define("$constant", values.read().array_element(index.read())),
                StatementDef::if_then(
                    constant
                        .read()
                        .invoke(constant_name, vec![])
                        .equals_structurally(name.read()),
                    constant.read().returning(),
                ),
                index.assign(index.read().math(MathOp::Add, ExpressionDef::int(1))),
            ]),
        ),
        StatementDef::Throw(ExpressionDef::new_instance(
            error,
            vec![TypeDef::string()],
            vec![ExpressionDef::string(prefix).invoke(concat, vec![name.read()])],
        )),
    ])
}
