//! Variables, fields, calls and instantiation.
//!
//! Dispatch rules for instance calls:
//!
//! | receiver / target                  | instruction       |
//! |------------------------------------|-------------------|
//! | constructor                        | `invokespecial`   |
//! | `super`                            | `invokespecial`   |
//! | `this`, private method of the class| `invokespecial`   |
//! | interface owner                    | `invokeinterface` |
//! | anything else                      | `invokevirtual`   |

use classgen_core::{
    ClassTypeDef, ExpressionDef, InvokeInstance, InvokeStatic, MethodRef, TypeDef, VariableDef,
};

use super::{ClassContext, MethodLowering, Result, slot_kind};
use crate::code::SlotKind;
use crate::{EmitErrorKind, OpCode};

impl MethodLowering<'_> {
    /// Emit a call instruction; receiver and arguments are already on the
    /// stack.
    pub(super) fn invoke_ref(
        &mut self,
        op: OpCode,
        method: &MethodRef,
        has_receiver: bool,
    ) -> Result<()> {
        let owner = self.descriptors.class_entry_name(&method.owner);
        let descriptor = self
            .descriptors
            .method_descriptor(&method.parameter_types, &method.return_type);
        let index = self.pool.method_ref(
            &owner,
            &method.name,
            &descriptor,
            method.owner_is_interface(),
        )?;

        let argument_slots: u16 = method.parameter_types.iter().map(TypeDef::slot_size).sum();
        let pops = argument_slots + u16::from(has_receiver);
        self.code
            .op_with(op, pops, method.return_type.slot_size())?;
        self.code.write_u16(index);
        if op == OpCode::Invokeinterface {
            self.code.write_u8(pops as u8);
            self.code.write_u8(0);
        }
        Ok(())
    }

    /// Push each argument converted to its parameter type.
    fn arguments(&mut self, parameters: &[TypeDef], arguments: &[ExpressionDef]) -> Result<()> {
        for (parameter, argument) in parameters.iter().zip(arguments) {
            self.value_as(argument, parameter)?;
        }
        Ok(())
    }

    fn is_private_call(&self, method: &MethodRef) -> bool {
        let this = TypeDef::Class(self.class.this_type.erasure());
        method.owner.erasure() == this
            && self
                .class
                .private_methods
                .contains(&ClassContext::method_key(&method.name, &method.parameter_types))
    }

    pub(super) fn invoke_instance(&mut self, call: &InvokeInstance) -> Result<()> {
        let method = &call.method;
        let op = match &call.receiver {
            _ if method.is_constructor() => OpCode::Invokespecial,
            ExpressionDef::Variable(VariableDef::Super(_)) => OpCode::Invokespecial,
            ExpressionDef::Variable(VariableDef::This(_)) if self.is_private_call(method) => {
                OpCode::Invokespecial
            }
            _ if method.owner_is_interface() => OpCode::Invokeinterface,
            _ => OpCode::Invokevirtual,
        };
        self.value(&call.receiver)?;
        self.arguments(&method.parameter_types, &call.arguments)?;
        self.invoke_ref(op, method, true)
    }

    pub(super) fn invoke_static(&mut self, call: &InvokeStatic) -> Result<()> {
        self.arguments(&call.method.parameter_types, &call.arguments)?;
        self.invoke_ref(OpCode::Invokestatic, &call.method, false)
    }

    pub(super) fn new_instance(
        &mut self,
        ty: &ClassTypeDef,
        parameter_types: &[TypeDef],
        arguments: &[ExpressionDef],
    ) -> Result<()> {
        let index = self.class_index(&TypeDef::Class(ty.clone()))?;
        self.code.op_u16(OpCode::New, index)?;
        self.code.op(OpCode::Dup)?;
        self.arguments(parameter_types, arguments)?;
        let constructor = MethodRef::constructor(ty.erasure(), parameter_types.to_vec());
        self.invoke_ref(OpCode::Invokespecial, &constructor, true)
    }

    // ========================================================================
    // Variables
    // ========================================================================

    fn field_index(&mut self, owner: &ClassTypeDef, name: &str, ty: &TypeDef) -> Result<u16> {
        let descriptor = self.descriptors.descriptor(ty);
        self.pool.field_ref(&owner.internal_name(), name, &descriptor)
    }

    /// Slot kind, index and declared type of a named local or parameter.
    fn lookup(&self, name: &str, parameter: bool) -> Result<(SlotKind, u16, TypeDef)> {
        let found = if parameter {
            self.locals
                .parameter(name)
                .ok_or_else(|| EmitErrorKind::UnknownParameter {
                    name: name.to_string(),
                })?
        } else {
            self.locals
                .local(name)
                .ok_or_else(|| EmitErrorKind::UnknownLocal {
                    name: name.to_string(),
                })?
        };
        Ok((slot_kind(&found.ty), found.slot, found.ty.clone()))
    }

    pub(super) fn load_variable(&mut self, variable: &VariableDef) -> Result<()> {
        match variable {
            VariableDef::This(_) | VariableDef::Super(_) => {
                if self.is_static {
                    return Err(EmitErrorKind::NoReceiver);
                }
                self.code.load(SlotKind::Reference, 0)
            }
            VariableDef::Local { name, .. } => {
                let (kind, slot, _) = self.lookup(name, false)?;
                self.code.load(kind, slot)
            }
            VariableDef::MethodParameter { name, .. } => {
                let (kind, slot, _) = self.lookup(name, true)?;
                self.code.load(kind, slot)
            }
            VariableDef::Field {
                instance,
                owner,
                name,
                ty,
            } => {
                self.value(instance)?;
                let index = self.field_index(owner, name, ty)?;
                self.code.op_with(OpCode::Getfield, 1, ty.slot_size())?;
                self.code.write_u16(index);
                Ok(())
            }
            VariableDef::StaticField { owner, name, ty } => {
                let index = self.field_index(owner, name, ty)?;
                self.code.op_with(OpCode::Getstatic, 0, ty.slot_size())?;
                self.code.write_u16(index);
                Ok(())
            }
        }
    }

    pub(super) fn assign(&mut self, variable: &VariableDef, value: &ExpressionDef) -> Result<()> {
        match variable {
            VariableDef::This(_) | VariableDef::Super(_) => Err(EmitErrorKind::NotAssignable {
                target: "this".to_string(),
            }),
            VariableDef::Local { name, .. } | VariableDef::MethodParameter { name, .. } => {
                let parameter = matches!(variable, VariableDef::MethodParameter { .. });
                let (kind, slot, ty) = self.lookup(name, parameter)?;
                self.value_as(value, &ty)?;
                self.code.store(kind, slot)
            }
            VariableDef::Field {
                instance,
                owner,
                name,
                ty,
            } => {
                self.value(instance)?;
                self.value_as(value, ty)?;
                let index = self.field_index(owner, name, ty)?;
                self.code.op_with(OpCode::Putfield, 1 + ty.slot_size(), 0)?;
                self.code.write_u16(index);
                Ok(())
            }
            VariableDef::StaticField { owner, name, ty } => {
                self.value_as(value, ty)?;
                let index = self.field_index(owner, name, ty)?;
                self.code.op_with(OpCode::Putstatic, ty.slot_size(), 0)?;
                self.code.write_u16(index);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{assert_ops, context, lower};
    use super::super::{ClassContext, lower_method};
    use crate::constant_pool::{ConstantPool, PoolEntry};
    use crate::descriptor::DescriptorCache;
    use crate::{EmitErrorKind, OpCode, WriterOptions};
    use classgen_core::{
        ClassTypeDef, ExpressionDef, MethodDef, MethodRef, Modifiers, QualifiedName, StatementDef,
        TypeDef, VariableDef,
    };

    fn subject() -> ClassTypeDef {
        context().this_type
    }

    fn instance_method(statements: Vec<StatementDef>) -> MethodDef {
        let mut builder = MethodDef::builder("run");
        for statement in statements {
            builder = builder.add_statement(statement);
        }
        builder.build()
    }

    #[test]
    fn interface_call_uses_invokeinterface() {
        let list = ClassTypeDef::interface(QualifiedName::new("java.util", "List"));
        let size = MethodRef::new(list.clone(), "size", vec![], TypeDef::INT);
        let method = MethodDef::builder("run")
            .add_modifiers(Modifiers::STATIC)
            .returns(TypeDef::INT)
            .add_parameter("items", TypeDef::Class(list.clone()))
            .add_statement(
                VariableDef::parameter("items", TypeDef::Class(list))
                    .read()
                    .invoke(size, vec![])
                    .returning(),
            )
            .build();
        let code = lower(&method).unwrap();
        assert_ops(&code, &[OpCode::Aload0, OpCode::Invokeinterface, OpCode::Ireturn]);
        // count byte includes the receiver
        assert_eq!(code.code[4], 1);
    }

    #[test]
    fn super_call_is_special() {
        let to_string = MethodRef::new(ClassTypeDef::object(), "toString", vec![], TypeDef::string());
        let method = MethodDef::builder("toString")
            .returns(TypeDef::string())
            .add_statement(
                VariableDef::super_of(ClassTypeDef::object())
                    .read()
                    .invoke(to_string, vec![])
                    .returning(),
            )
            .build();
        assert_ops(
            &lower(&method).unwrap(),
            &[OpCode::Aload0, OpCode::Invokespecial, OpCode::Areturn],
        );
    }

    #[test]
    fn private_method_of_this_class_is_special() {
        let mut class = context();
        class
            .private_methods
            .insert(ClassContext::method_key("helper", &[]));
        let helper = MethodRef::new(subject(), "helper", vec![], TypeDef::Void);
        let method = instance_method(vec![
            VariableDef::this(subject())
                .read()
                .invoke(helper, vec![])
                .into_statement(),
        ]);
        let mut pool = ConstantPool::new();
        let mut descriptors = DescriptorCache::new();
        let code = lower_method(
            &class,
            &mut pool,
            &mut descriptors,
            &WriterOptions::default(),
            &method,
        )
        .unwrap();
        assert_ops(&code, &[OpCode::Aload0, OpCode::Invokespecial, OpCode::Return]);
    }

    #[test]
    fn construction_duplicates_new_reference() {
        let method = MethodDef::builder("make")
            .add_modifiers(Modifiers::STATIC)
            .returns(TypeDef::object())
            .add_statement(
                ExpressionDef::new_instance(
                    ClassTypeDef::java_lang("StringBuilder"),
                    vec![TypeDef::string()],
                    vec![ExpressionDef::string("x")],
                )
                .returning(),
            )
            .build();
        let code = lower(&method).unwrap();
        assert_ops(
            &code,
            &[OpCode::New, OpCode::Dup, OpCode::Ldc, OpCode::Invokespecial, OpCode::Areturn],
        );
        assert_eq!(code.max_stack, 3);
    }

    #[test]
    fn field_assignment_coerces_value() {
        let counter = VariableDef::this(subject()).field(subject(), "count", TypeDef::LONG);
        let method = instance_method(vec![counter.assign(ExpressionDef::int(1))]);
        let code = lower(&method).unwrap();
        assert_ops(
            &code,
            &[OpCode::Aload0, OpCode::Iconst1, OpCode::I2l, OpCode::Putfield, OpCode::Return],
        );
        assert_eq!(code.max_stack, 3);
    }

    #[test]
    fn receiver_rejected_in_static_method() {
        let method = MethodDef::builder("run")
            .add_modifiers(Modifiers::STATIC)
            .returns(TypeDef::object())
            .add_statement(VariableDef::this(subject()).read().returning())
            .build();
        assert_eq!(lower(&method), Err(EmitErrorKind::NoReceiver));
    }

    #[test]
    fn unknown_local_reported_by_name() {
        let method = instance_method(vec![
            VariableDef::local("missing", TypeDef::INT).assign(ExpressionDef::int(1)),
        ]);
        assert_eq!(
            lower(&method),
            Err(EmitErrorKind::UnknownLocal {
                name: "missing".to_string()
            })
        );
    }

    #[test]
    fn this_is_not_assignable() {
        let method = instance_method(vec![StatementDef::Assign {
            variable: VariableDef::this(subject()),
            value: ExpressionDef::null(TypeDef::object()),
        }]);
        assert!(matches!(
            lower(&method),
            Err(EmitErrorKind::NotAssignable { .. })
        ));
    }

    #[test]
    fn interface_owner_gets_interface_method_entry() {
        let runnable = ClassTypeDef::interface(QualifiedName::new("java.lang", "Runnable"));
        let run = MethodRef::new(runnable.clone(), "run", vec![], TypeDef::Void);
        let method = MethodDef::builder("go")
            .add_modifiers(Modifiers::STATIC)
            .add_parameter("task", TypeDef::Class(runnable.clone()))
            .add_statement(
                VariableDef::parameter("task", TypeDef::Class(runnable))
                    .read()
                    .invoke(run, vec![])
                    .into_statement(),
            )
            .build();
        let mut pool = ConstantPool::new();
        let mut descriptors = DescriptorCache::new();
        lower_method(
            &context(),
            &mut pool,
            &mut descriptors,
            &WriterOptions::default(),
            &method,
        )
        .unwrap();
        let has_interface_ref = (1..=pool.count().saturating_sub(1))
            .filter_map(|index| pool.get(index))
            .any(|entry| matches!(entry, PoolEntry::InterfaceMethodref(..)));
        assert!(has_interface_ref);
    }
}
