use classgen::model::{SwitchBranch, SwitchExpression, SwitchStatement};
use classgen::prelude::*;
use classgen_vm::{Value, Vm};

use crate::common::{load, load_with, name};

/// `pick(int)`: `100 + i` for every `i` in `0..10`, `-1` otherwise.
fn picker() -> ObjectDef {
    let subject = VariableDef::parameter("i", TypeDef::INT);
    let result = VariableDef::local("result", TypeDef::INT);
    let branches = (0..10)
        .map(|i| SwitchBranch::ints([i], result.assign(ExpressionDef::int(100 + i))))
        .collect();
    let switch = SwitchStatement::new(
        subject.read(),
        branches,
        Some(result.assign(ExpressionDef::int(-1))),
    )
    .unwrap();

    ObjectDef::class(name("Picker"))
        .add_method(
            MethodDef::builder("pick")
                .add_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
                .returns(TypeDef::INT)
                .add_parameter("i", TypeDef::INT)
                .add_statement(StatementDef::define("result", ExpressionDef::int(0)))
                .add_statement(StatementDef::switch(switch))
                .add_statement(result.read().returning())
                .build(),
        )
        .build()
        .unwrap()
}

fn pick(vm: &mut Vm, i: i32) -> Option<Value> {
    vm.invoke_static("demo.Picker", "pick", "(I)I", &[Value::Int(i)])
        .unwrap()
}

fn check_picker(vm: &mut Vm) {
    for i in -3..13 {
        let expected = if (0..10).contains(&i) { 100 + i } else { -1 };
        assert_eq!(pick(vm, i), Some(Value::Int(expected)), "pick({i})");
    }
}

#[test]
fn dense_switch_as_table() {
    let mut vm = load_with(WriterOptions::default().with_switch_density(0.5), &[picker()]);
    check_picker(&mut vm);
}

#[test]
fn dense_switch_as_lookup() {
    // No label set can reach a density above 1.
    let mut vm = load_with(WriterOptions::default().with_switch_density(1.1), &[picker()]);
    check_picker(&mut vm);
}

#[test]
fn sparse_labels_with_negative_values() {
    let subject = VariableDef::parameter("i", TypeDef::INT);
    let switch = SwitchExpression::new(
        subject.read(),
        TypeDef::INT,
        vec![
            SwitchBranch::ints([-1_000_000], ExpressionDef::int(1)),
            SwitchBranch::ints([0, 7], ExpressionDef::int(2)),
            SwitchBranch::ints([i32::MAX], ExpressionDef::int(3)),
        ],
        Some(ExpressionDef::int(0)),
    )
    .unwrap();
    let def = ObjectDef::class(name("Sparse"))
        .add_method(
            MethodDef::builder("classify")
                .add_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
                .returns(TypeDef::INT)
                .add_parameter("i", TypeDef::INT)
                .add_statement(ExpressionDef::Switch(Box::new(switch)).returning())
                .build(),
        )
        .build()
        .unwrap();
    let mut vm = load(&[def]);

    for (input, expected) in [(-1_000_000, 1), (0, 2), (7, 2), (i32::MAX, 3), (1, 0), (i32::MIN, 0)] {
        assert_eq!(
            vm.invoke_static("demo.Sparse", "classify", "(I)I", &[Value::Int(input)]),
            Ok(Some(Value::Int(expected))),
            "classify({input})"
        );
    }
}

// ============================================================================
// Strings
// ============================================================================

/// `"Aa"` and `"BB"` share a hash code, so both land in one bucket and are
/// told apart by `equals`.
fn colliding() -> ObjectDef {
    let subject = VariableDef::parameter("s", TypeDef::string());
    let switch = SwitchExpression::new(
        subject.read(),
        TypeDef::INT,
        vec![
            SwitchBranch::strings(["Aa"], ExpressionDef::int(1)),
            SwitchBranch::strings(["BB"], ExpressionDef::int(2)),
            SwitchBranch::strings(["C", "D"], ExpressionDef::int(3)),
        ],
        Some(ExpressionDef::int(0)),
    )
    .unwrap();
    ObjectDef::class(name("Strings"))
        .add_method(
            MethodDef::builder("code")
                .add_modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
                .returns(TypeDef::INT)
                .add_parameter("s", TypeDef::string())
                .add_statement(ExpressionDef::Switch(Box::new(switch)).returning())
                .build(),
        )
        .build()
        .unwrap()
}

#[test]
fn string_switch_separates_hash_collisions() {
    assert_eq!(
        classgen::bytecode::string_hash("Aa"),
        classgen::bytecode::string_hash("BB")
    );
    let mut vm = load(&[colliding()]);

    for (input, expected) in [("Aa", 1), ("BB", 2), ("C", 3), ("D", 3), ("Ab", 0), ("", 0)] {
        let text = vm.string(input);
        assert_eq!(
            vm.invoke_static("demo.Strings", "code", "(Ljava/lang/String;)I", &[text]),
            Ok(Some(Value::Int(expected))),
            "code({input:?})"
        );
    }
}

#[test]
fn string_switch_on_null_throws() {
    let mut vm = load(&[colliding()]);
    let thrown = vm
        .invoke_static("demo.Strings", "code", "(Ljava/lang/String;)I", &[Value::Null])
        .unwrap_err();
    assert_eq!(
        thrown,
        classgen_vm::VmError::Uncaught {
            class: "java.lang.NullPointerException".into(),
            message: None,
        }
    );
}
