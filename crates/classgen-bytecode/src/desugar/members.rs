//! Properties, constructors and the static initializer.

use classgen_core::{
    ClassTypeDef, ExpressionDef, FieldDef, InvokeInstance, MethodDef, MethodRef, Modifiers,
    ObjectDef, ParameterDef, PropertyDef, StatementDef, TypeDef, TypeKind, VariableDef,
};

use super::{ClassPlan, MethodPlan};
use crate::WriterOptions;
use crate::class_file::{access, method_access};

/// Hidden constructor parameters carrying an enum constant's name and ordinal.
pub(super) const ENUM_NAME_PARAMETER: &str = "$enum$name";
pub(super) const ENUM_ORDINAL_PARAMETER: &str = "$enum$ordinal";

// ============================================================================
// Properties
// ============================================================================

fn accessor_modifiers(property: &PropertyDef, in_interface: bool) -> Modifiers {
    if in_interface {
        return Modifiers::PUBLIC;
    }
    let visibility = property.modifiers.visibility();
    let mut modifiers = if visibility.is_empty() {
        Modifiers::PUBLIC
    } else {
        visibility
    };
    if property.modifiers.is_static() {
        modifiers |= Modifiers::STATIC;
    }
    modifiers
}

fn property_storage(this: &ClassTypeDef, property: &PropertyDef) -> VariableDef {
    if property.modifiers.is_static() {
        VariableDef::static_field(this.clone(), property.name.clone(), property.ty.clone())
    } else {
        VariableDef::this(this.clone()).field(this.clone(), property.name.clone(), property.ty.clone())
    }
}

/// Backing field, getter and (unless final) setter for each property.
/// Accessors already declared by name and parameter types are kept.
pub(super) fn lower_properties(plan: &mut ClassPlan, properties: &[PropertyDef]) {
    let in_interface = plan.is_interface();
    let this = plan.this_type.clone();

    for property in properties {
        if !in_interface {
            let storage = Modifiers::STATIC | Modifiers::FINAL | Modifiers::TRANSIENT | Modifiers::VOLATILE;
            let mut field = FieldDef::new(property.name.clone(), property.ty.clone())
                .with_modifiers(Modifiers::PRIVATE | (property.modifiers & storage));
            field.initializer = property.initializer.clone();
            field.annotations = property.annotations.clone();
            plan.add_field(field, 0);
        }

        let modifiers = accessor_modifiers(property, in_interface);
        let getter = property.getter_name();
        if plan.find_method(&getter, &[]).is_none() {
            let mut builder = MethodDef::builder(getter)
                .add_modifiers(modifiers)
                .returns(property.ty.clone());
            if !in_interface {
                builder = builder.add_statement(property_storage(&this, property).read().returning());
            }
            plan.add_method(builder.build());
        }

        if property.modifiers.is_final() {
            continue;
        }
        let setter = property.setter_name();
        if plan
            .find_method(&setter, std::slice::from_ref(&property.ty))
            .is_none()
        {
            let mut builder = MethodDef::builder(setter)
                .add_modifiers(modifiers)
                .add_parameter(property.name.clone(), property.ty.clone());
            if !in_interface {
                let value = VariableDef::parameter(property.name.clone(), property.ty.clone());
                builder = builder.add_statement(property_storage(&this, property).assign(value));
            }
            plan.add_method(builder.build());
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    This,
    Super,
}

fn call_kind(statement: &StatementDef) -> Option<CallKind> {
    let StatementDef::Expression(ExpressionDef::InvokeInstance(invoke)) = statement else {
        return None;
    };
    if !invoke.method.is_constructor() {
        return None;
    }
    match &invoke.receiver {
        ExpressionDef::Variable(VariableDef::This(_)) => Some(CallKind::This),
        ExpressionDef::Variable(VariableDef::Super(_)) => Some(CallKind::Super),
        _ => None,
    }
}

/// Remove an explicit `this(...)`/`super(...)` call heading the body.
fn take_leading_call(statements: &mut Vec<StatementDef>) -> Option<(CallKind, InvokeInstance)> {
    let first = statements.first_mut()?;
    if let StatementDef::Multi(inner) = first {
        return take_leading_call(inner);
    }
    let kind = call_kind(first)?;
    match statements.remove(0) {
        StatementDef::Expression(ExpressionDef::InvokeInstance(invoke)) => Some((kind, *invoke)),
        _ => None,
    }
}

fn enum_parameters() -> [VariableDef; 2] {
    [
        VariableDef::parameter(ENUM_NAME_PARAMETER, TypeDef::string()),
        VariableDef::parameter(ENUM_ORDINAL_PARAMETER, TypeDef::INT),
    ]
}

fn super_call(superclass: &ClassTypeDef, is_enum: bool) -> StatementDef {
    let receiver = VariableDef::super_of(superclass.clone()).read();
    let (parameter_types, arguments) = if is_enum {
        let [name, ordinal] = enum_parameters();
        (vec![TypeDef::string(), TypeDef::INT], vec![name.read(), ordinal.read()])
    } else {
        (Vec::new(), Vec::new())
    };
    receiver
        .invoke(MethodRef::constructor(superclass.erasure(), parameter_types), arguments)
        .into_statement()
}

/// Give every constructor its superclass call and instance initializers,
/// adding the default constructor where none is declared.
///
/// A constructor delegating to `this(...)` runs no initializers itself.
/// Enum constructors become private and take the constant's name and
/// ordinal ahead of their declared parameters.
pub(super) fn complete_constructors(plan: &mut ClassPlan, def: &ObjectDef, options: &WriterOptions) {
    let is_enum = plan.kind == TypeKind::Enum;
    if plan.constructors().next().is_none() && (options.generate_default_constructor || is_enum) {
        let visibility = if is_enum {
            Modifiers::PRIVATE
        } else {
            def.modifiers().visibility()
        };
        plan.add_method(MethodDef::constructor().add_modifiers(visibility).build());
    }

    let this = plan.this_type.clone();
    let receiver = VariableDef::this(this.clone());
    let initializers: Vec<StatementDef> = plan
        .fields
        .iter()
        .filter(|field| !field.def.is_static())
        .filter_map(|field| {
            let value = field.def.initializer.clone()?;
            Some(
                receiver
                    .field(this.clone(), field.def.name.clone(), field.def.ty.clone())
                    .assign(value),
            )
        })
        .collect();
    let superclass = plan.superclass.clone();

    for method in plan.methods.iter_mut().filter(|m| m.def.is_constructor()) {
        let mut ctor = method.def.clone();
        let mut statements = ctor
            .body()
            .cloned()
            .map(StatementDef::into_statements)
            .unwrap_or_default();
        let leading = take_leading_call(&mut statements);

        if is_enum {
            ctor.parameters.splice(
                0..0,
                [
                    ParameterDef::new(ENUM_NAME_PARAMETER, TypeDef::string()),
                    ParameterDef::new(ENUM_ORDINAL_PARAMETER, TypeDef::INT),
                ],
            );
            ctor.modifiers.remove(Modifiers::PUBLIC | Modifiers::PROTECTED);
            ctor.modifiers.insert(Modifiers::PRIVATE);
        }

        let mut body = Vec::with_capacity(statements.len() + initializers.len() + 1);
        match leading {
            Some((CallKind::This, mut call)) => {
                if is_enum {
                    let [name, ordinal] = enum_parameters();
                    call.method
                        .parameter_types
                        .splice(0..0, [TypeDef::string(), TypeDef::INT]);
                    call.arguments.splice(0..0, [name.read(), ordinal.read()]);
                }
                body.push(ExpressionDef::InvokeInstance(Box::new(call)).into_statement());
            }
            Some((CallKind::Super, call)) if !is_enum => {
                body.push(ExpressionDef::InvokeInstance(Box::new(call)).into_statement());
                body.extend(initializers.iter().cloned());
            }
            _ => {
                body.push(super_call(&superclass, is_enum));
                body.extend(initializers.iter().cloned());
            }
        }
        body.extend(statements);

        let ctor = ctor.with_body(StatementDef::Multi(body));
        *method = MethodPlan {
            access: method_access(ctor.modifiers, true, false),
            def: ctor,
        };
    }
}

// ============================================================================
// Static initializer
// ============================================================================

/// Collect `<clinit>`: generated statements, static field initializers in
/// declaration order, then the declared static initializer blocks.
pub(super) fn lower_static_initializer(plan: &mut ClassPlan, def: &ObjectDef) {
    let mut statements = std::mem::take(&mut plan.static_init);
    for field in plan.fields.iter().filter(|field| field.def.is_static()) {
        if let Some(value) = &field.def.initializer {
            let target = VariableDef::static_field(
                plan.this_type.clone(),
                field.def.name.clone(),
                field.def.ty.clone(),
            );
            statements.push(target.assign(value.clone()));
        }
    }
    statements.extend(def.static_initializer().iter().cloned());
    if statements.is_empty() {
        return;
    }

    let clinit = MethodDef::builder(MethodDef::STATIC_INITIALIZER)
        .add_modifiers(Modifiers::STATIC)
        .build()
        .with_body(StatementDef::Multi(statements));
    plan.methods.push(MethodPlan {
        def: clinit,
        access: access::STATIC,
    });
}
