use classgen::model::{CatchDef, CompareOp, MathOp, ResourceDef, TryStatement};
use classgen::prelude::*;
use classgen_vm::{Value, Vm, VmError};

use crate::common::{load, name};

// ============================================================================
// Helpers
// ============================================================================

fn counter(owner: &QualifiedName, field: &str) -> VariableDef {
    VariableDef::static_field(ClassTypeDef::of(owner.clone()), field, TypeDef::INT)
}

fn counter_field(field: &str) -> FieldDef {
    FieldDef::new(field, TypeDef::INT).with_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
}

/// `owner.field = owner.field + 1`
fn bump(owner: &QualifiedName, field: &str) -> StatementDef {
    let counter = counter(owner, field);
    counter.assign(counter.read().math(MathOp::Add, ExpressionDef::int(1)))
}

fn mode_is(value: i32) -> ExpressionDef {
    VariableDef::parameter("mode", TypeDef::INT)
        .read()
        .compare(CompareOp::Eq, ExpressionDef::int(value))
}

fn throw_illegal_state(message: &str) -> StatementDef {
    StatementDef::Throw(ExpressionDef::new_instance(
        ClassTypeDef::java_lang("IllegalStateException"),
        vec![TypeDef::string()],
        vec![ExpressionDef::string(message)],
    ))
}

fn static_method(method: &str) -> classgen::model::MethodDefBuilder {
    MethodDef::builder(method).add_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
}

fn count(vm: &mut Vm, class: &str, field: &str) -> Value {
    vm.get_static(class, field).unwrap()
}

fn illegal_state(message: &str) -> VmError {
    VmError::Uncaught {
        class: "java.lang.IllegalStateException".into(),
        message: Some(message.into()),
    }
}

// ============================================================================
// try/finally
// ============================================================================

/// `run(mode)`: returns early for 0, throws for 1, falls through otherwise.
fn guarded() -> ObjectDef {
    let owner = name("Guarded");
    ObjectDef::class(owner.clone())
        .add_field(counter_field("finallyCount"))
        .add_method(
            static_method("run")
                .returns(TypeDef::INT)
                .add_parameter("mode", TypeDef::INT)
                .add_statement(
                    TryStatement::new(StatementDef::multi([
                        StatementDef::if_then(mode_is(0), ExpressionDef::int(1).returning()),
                        StatementDef::if_then(mode_is(1), throw_illegal_state("boom")),
                    ]))
                    .with_finally(bump(&owner, "finallyCount"))
                    .build(),
                )
                .add_statement(ExpressionDef::int(3).returning())
                .build(),
        )
        .build()
        .unwrap()
}

#[test]
fn finally_runs_once_on_every_exit() {
    let mut vm = load(&[guarded()]);
    assert_eq!(count(&mut vm, "demo.Guarded", "finallyCount"), Value::Int(0));

    let early = vm.invoke_static("demo.Guarded", "run", "(I)I", &[Value::Int(0)]);
    assert_eq!(early, Ok(Some(Value::Int(1))));
    assert_eq!(count(&mut vm, "demo.Guarded", "finallyCount"), Value::Int(1));

    let thrown = vm.invoke_static("demo.Guarded", "run", "(I)I", &[Value::Int(1)]);
    assert_eq!(thrown, Err(illegal_state("boom")));
    assert_eq!(count(&mut vm, "demo.Guarded", "finallyCount"), Value::Int(2));

    let fallthrough = vm.invoke_static("demo.Guarded", "run", "(I)I", &[Value::Int(2)]);
    assert_eq!(fallthrough, Ok(Some(Value::Int(3))));
    assert_eq!(count(&mut vm, "demo.Guarded", "finallyCount"), Value::Int(3));
}

#[test]
fn nested_finally_blocks_each_run_once() {
    let owner = name("Nested");
    let def = ObjectDef::class(owner.clone())
        .add_field(counter_field("inner"))
        .add_field(counter_field("outer"))
        .add_method(
            static_method("run")
                .returns(TypeDef::INT)
                .add_parameter("mode", TypeDef::INT)
                .add_statement(
                    TryStatement::new(
                        TryStatement::new(StatementDef::multi([
                            StatementDef::if_then(mode_is(1), throw_illegal_state("deep")),
                            ExpressionDef::int(10).returning(),
                        ]))
                        .with_finally(bump(&owner, "inner"))
                        .build(),
                    )
                    .with_finally(bump(&owner, "outer"))
                    .build(),
                )
                .build(),
        )
        .build()
        .unwrap();
    let mut vm = load(&[def]);

    assert_eq!(
        vm.invoke_static("demo.Nested", "run", "(I)I", &[Value::Int(0)]),
        Ok(Some(Value::Int(10)))
    );
    assert_eq!(count(&mut vm, "demo.Nested", "inner"), Value::Int(1));
    assert_eq!(count(&mut vm, "demo.Nested", "outer"), Value::Int(1));

    assert_eq!(
        vm.invoke_static("demo.Nested", "run", "(I)I", &[Value::Int(1)]),
        Err(illegal_state("deep"))
    );
    assert_eq!(count(&mut vm, "demo.Nested", "inner"), Value::Int(2));
    assert_eq!(count(&mut vm, "demo.Nested", "outer"), Value::Int(2));
}

#[test]
fn catch_handles_matching_exceptions_only() {
    let owner = name("Catching");
    let def = ObjectDef::class(owner.clone())
        .add_field(counter_field("finallyCount"))
        .add_method(
            static_method("run")
                .returns(TypeDef::INT)
                .add_parameter("mode", TypeDef::INT)
                .add_statement(
                    TryStatement::new(StatementDef::multi([
                        StatementDef::if_then(mode_is(1), throw_illegal_state("caught")),
                        StatementDef::if_then(
                            mode_is(2),
                            StatementDef::Throw(ExpressionDef::new_instance(
                                ClassTypeDef::java_lang("IllegalArgumentException"),
                                vec![TypeDef::string()],
                                vec![ExpressionDef::string("escapes")],
                            )),
                        ),
                    ]))
                    .with_catch(CatchDef::new(
                        ClassTypeDef::java_lang("IllegalStateException"),
                        "e",
                        ExpressionDef::int(7).returning(),
                    ))
                    .with_finally(bump(&owner, "finallyCount"))
                    .build(),
                )
                .add_statement(ExpressionDef::int(0).returning())
                .build(),
        )
        .build()
        .unwrap();
    let mut vm = load(&[def]);

    let run = |vm: &mut Vm, mode: i32| vm.invoke_static("demo.Catching", "run", "(I)I", &[Value::Int(mode)]);
    assert_eq!(run(&mut vm, 0), Ok(Some(Value::Int(0))));
    assert_eq!(run(&mut vm, 1), Ok(Some(Value::Int(7))));
    assert_eq!(
        run(&mut vm, 2),
        Err(VmError::Uncaught {
            class: "java.lang.IllegalArgumentException".into(),
            message: Some("escapes".into()),
        })
    );
    assert_eq!(count(&mut vm, "demo.Catching", "finallyCount"), Value::Int(3));
}

#[test]
fn runtime_exceptions_reach_generated_handlers() {
    let a = VariableDef::parameter("a", TypeDef::INT);
    let b = VariableDef::parameter("b", TypeDef::INT);
    let def = ObjectDef::class(name("Divider"))
        .add_method(
            static_method("divide")
                .returns(TypeDef::INT)
                .add_parameter("a", TypeDef::INT)
                .add_parameter("b", TypeDef::INT)
                .add_statement(
                    TryStatement::new(a.read().math(MathOp::Div, b.read()).returning())
                        .with_catch(CatchDef::new(
                            ClassTypeDef::java_lang("ArithmeticException"),
                            "e",
                            ExpressionDef::int(-1).returning(),
                        ))
                        .build(),
                )
                .build(),
        )
        .build()
        .unwrap();
    let mut vm = load(&[def]);
    let divide = |vm: &mut Vm, a: i32, b: i32| {
        vm.invoke_static("demo.Divider", "divide", "(II)I", &[Value::Int(a), Value::Int(b)])
    };
    assert_eq!(divide(&mut vm, 12, 4), Ok(Some(Value::Int(3))));
    assert_eq!(divide(&mut vm, 1, 0), Ok(Some(Value::Int(-1))));
}

// ============================================================================
// Resources and monitors
// ============================================================================

/// `Resource(int id)` whose `close()` appends its id to `order`.
fn resource() -> ObjectDef {
    let owner = name("Resource");
    let this = VariableDef::this(ClassTypeDef::of(owner.clone()));
    let id = this.field(ClassTypeDef::of(owner.clone()), "id", TypeDef::INT);
    let order = counter(&owner, "order");
    ObjectDef::class(owner.clone())
        .add_superinterface(ClassTypeDef::auto_closeable())
        .add_field(counter_field("order"))
        .add_field(FieldDef::new("id", TypeDef::INT).with_modifiers(Modifiers::PRIVATE | Modifiers::FINAL))
        .add_method(
            MethodDef::constructor()
                .add_modifiers(Modifiers::PUBLIC)
                .add_parameter("id", TypeDef::INT)
                .add_statement(id.assign(VariableDef::parameter("id", TypeDef::INT)))
                .build(),
        )
        .add_method(
            MethodDef::builder("close")
                .add_modifiers(Modifiers::PUBLIC)
                .add_statement(order.assign(
                    order
                        .read()
                        .math(MathOp::Mul, ExpressionDef::int(10))
                        .math(MathOp::Add, id.read()),
                ))
                .build(),
        )
        .build()
        .unwrap()
}

fn open(variable: &str, id: i32) -> ResourceDef {
    let ty = ClassTypeDef::of(name("Resource"));
    ResourceDef::new(
        variable,
        TypeDef::Class(ty.clone()),
        ExpressionDef::new_instance(ty, vec![TypeDef::INT], vec![ExpressionDef::int(id)]),
    )
}

#[test]
fn resources_close_in_reverse_order() {
    let user = ObjectDef::class(name("User"))
        .add_method(
            static_method("run")
                .returns(TypeDef::INT)
                .add_parameter("mode", TypeDef::INT)
                .add_statement(
                    TryStatement::new(StatementDef::multi([
                        StatementDef::if_then(mode_is(1), throw_illegal_state("inside")),
                        ExpressionDef::int(5).returning(),
                    ]))
                    .with_resource(open("first", 1))
                    .with_resource(open("second", 2))
                    .build(),
                )
                .build(),
        )
        .build()
        .unwrap();
    let mut vm = load(&[resource(), user]);

    assert_eq!(
        vm.invoke_static("demo.User", "run", "(I)I", &[Value::Int(0)]),
        Ok(Some(Value::Int(5)))
    );
    assert_eq!(count(&mut vm, "demo.Resource", "order"), Value::Int(21));

    assert_eq!(
        vm.invoke_static("demo.User", "run", "(I)I", &[Value::Int(1)]),
        Err(illegal_state("inside"))
    );
    assert_eq!(count(&mut vm, "demo.Resource", "order"), Value::Int(2121));
}

#[test]
fn synchronized_releases_monitor_on_every_exit() {
    let def = ObjectDef::class(name("Locked"))
        .add_method(
            static_method("run")
                .returns(TypeDef::INT)
                .add_parameter("lock", TypeDef::object())
                .add_parameter("mode", TypeDef::INT)
                .add_statement(StatementDef::synchronized(
                    VariableDef::parameter("lock", TypeDef::object()).read(),
                    StatementDef::multi([
                        StatementDef::if_then(mode_is(1), throw_illegal_state("locked")),
                        ExpressionDef::int(4).returning(),
                    ]),
                ))
                .build(),
        )
        .build()
        .unwrap();
    let mut vm = load(&[def]);
    let lock = vm.new_object("java.lang.Object", "()V", &[]).unwrap();
    let descriptor = "(Ljava/lang/Object;I)I";

    assert_eq!(
        vm.invoke_static("demo.Locked", "run", descriptor, &[lock, Value::Int(0)]),
        Ok(Some(Value::Int(4)))
    );
    assert_eq!(vm.monitor_count(lock), Some(0));

    assert_eq!(
        vm.invoke_static("demo.Locked", "run", descriptor, &[lock, Value::Int(1)]),
        Err(illegal_state("locked"))
    );
    assert_eq!(vm.monitor_count(lock), Some(0));
}

// ============================================================================
// Loops and coercion
// ============================================================================

#[test]
fn while_loop_accumulates() {
    let n = VariableDef::parameter("n", TypeDef::INT);
    let total = VariableDef::local("total", TypeDef::LONG);
    let i = VariableDef::local("i", TypeDef::INT);
    let def = ObjectDef::class(name("Loops"))
        .add_method(
            static_method("sum")
                .returns(TypeDef::LONG)
                .add_parameter("n", TypeDef::INT)
                .add_statement(StatementDef::define("total", ExpressionDef::long(0)))
                .add_statement(StatementDef::define("i", ExpressionDef::int(0)))
                .add_statement(StatementDef::while_loop(
                    i.read().compare(CompareOp::Lt, n.read()),
                    StatementDef::multi([
                        total.assign(total.read().math(MathOp::Add, i.read())),
                        i.assign(i.read().math(MathOp::Add, ExpressionDef::int(1))),
                    ]),
                ))
                .add_statement(total.read().returning())
                .build(),
        )
        .build()
        .unwrap();
    let mut vm = load(&[def]);
    assert_eq!(
        vm.invoke_static("demo.Loops", "sum", "(I)J", &[Value::Int(10)]),
        Ok(Some(Value::Long(45)))
    );
    assert_eq!(
        vm.invoke_static("demo.Loops", "sum", "(I)J", &[Value::Int(0)]),
        Ok(Some(Value::Long(0)))
    );
}

#[test]
fn returns_box_and_unbox() {
    let integer = TypeDef::of(QualifiedName::new("java.lang", "Integer"));
    let def = ObjectDef::class(name("Boxes"))
        .add_method(
            static_method("boxed")
                .returns(integer.clone())
                .add_parameter("x", TypeDef::INT)
                .add_statement(VariableDef::parameter("x", TypeDef::INT).read().returning())
                .build(),
        )
        .add_method(
            static_method("unboxed")
                .returns(TypeDef::INT)
                .add_parameter("x", integer.clone())
                .add_statement(VariableDef::parameter("x", integer).read().returning())
                .build(),
        )
        .build()
        .unwrap();
    let mut vm = load(&[def]);

    let boxed = vm
        .invoke_static("demo.Boxes", "boxed", "(I)Ljava/lang/Integer;", &[Value::Int(9)])
        .unwrap()
        .unwrap();
    assert_eq!(vm.class_of(boxed).as_deref(), Some("java.lang.Integer"));
    assert_eq!(vm.unbox(boxed), Some(Value::Int(9)));

    assert_eq!(
        vm.invoke_static("demo.Boxes", "unboxed", "(Ljava/lang/Integer;)I", &[boxed]),
        Ok(Some(Value::Int(9)))
    );
    assert_eq!(
        vm.invoke_static("demo.Boxes", "unboxed", "(Ljava/lang/Integer;)I", &[Value::Null]),
        Err(VmError::Uncaught {
            class: "java.lang.NullPointerException".into(),
            message: None,
        })
    );
}
