use classgen::bytecode::string_hash;
use classgen::prelude::*;
use classgen_vm::{Value, VmError};

use crate::common::{load, name};

fn book(structural: bool) -> ObjectDef {
    let mut builder = ObjectDef::record(name("Book"))
        .add_component(PropertyDef::new("title", TypeDef::string()))
        .add_component(PropertyDef::new("age", TypeDef::INT));
    if structural {
        builder = builder.with_structural_equality();
    }
    builder.build().unwrap()
}

const CANONICAL: &str = "(Ljava/lang/String;I)V";

#[test]
fn accessors_return_constructor_arguments() {
    let mut vm = load(&[book(false)]);
    let title = vm.string("Dune");
    let instance = vm
        .new_object("demo.Book", CANONICAL, &[title, Value::Int(42)])
        .unwrap();

    let read = vm
        .invoke_virtual(instance, "title", "()Ljava/lang/String;", &[])
        .unwrap()
        .unwrap();
    assert_eq!(vm.string_value(read).as_deref(), Some("Dune"));
    assert_eq!(
        vm.invoke_virtual(instance, "age", "()I", &[]).unwrap(),
        Some(Value::Int(42))
    );
    assert_eq!(vm.class_of(instance).as_deref(), Some("demo.Book"));
}

#[test]
fn structural_equality_compares_components() {
    let mut vm = load(&[book(true)]);
    let make = |vm: &mut classgen_vm::Vm, title: &str, age: i32| {
        let title = vm.string(title);
        vm.new_object("demo.Book", CANONICAL, &[title, Value::Int(age)])
            .unwrap()
    };
    let a = make(&mut vm, "Dune", 42);
    let b = make(&mut vm, "Dune", 42);
    let c = make(&mut vm, "Dune", 43);

    let equals = |vm: &mut classgen_vm::Vm, x: Value, y: Value| {
        vm.invoke_virtual(x, "equals", "(Ljava/lang/Object;)Z", &[y])
            .unwrap()
    };
    assert_eq!(equals(&mut vm, a, b), Some(Value::Int(1)));
    assert_eq!(equals(&mut vm, a, c), Some(Value::Int(0)));
    assert_eq!(equals(&mut vm, a, Value::Null), Some(Value::Int(0)));
    let text = vm.string("Dune");
    assert_eq!(equals(&mut vm, a, text), Some(Value::Int(0)));

    let expected = string_hash("Dune").wrapping_mul(31).wrapping_add(42);
    assert_eq!(
        vm.invoke_virtual(a, "hashCode", "()I", &[]).unwrap(),
        Some(Value::Int(expected))
    );
    assert_eq!(
        vm.invoke_virtual(b, "hashCode", "()I", &[]).unwrap(),
        Some(Value::Int(expected))
    );
}

#[test]
fn null_components_hash_to_zero() {
    let mut vm = load(&[book(true)]);
    let instance = vm
        .new_object("demo.Book", CANONICAL, &[Value::Null, Value::Int(7)])
        .unwrap();
    assert_eq!(
        vm.invoke_virtual(instance, "hashCode", "()I", &[]).unwrap(),
        Some(Value::Int(7))
    );
}

#[test]
fn without_structural_equality_identity_is_used() {
    let mut vm = load(&[book(false)]);
    let title = vm.string("Dune");
    let a = vm
        .new_object("demo.Book", CANONICAL, &[title, Value::Int(1)])
        .unwrap();
    let b = vm
        .new_object("demo.Book", CANONICAL, &[title, Value::Int(1)])
        .unwrap();
    assert_eq!(
        vm.invoke_virtual(a, "equals", "(Ljava/lang/Object;)Z", &[b]).unwrap(),
        Some(Value::Int(0))
    );
}

#[test]
fn double_components_compare_like_boxed_values() {
    let def = ObjectDef::record(name("Reading"))
        .add_component(PropertyDef::new("value", TypeDef::DOUBLE))
        .with_structural_equality()
        .build()
        .unwrap();
    let mut vm = load(&[def]);
    let nan = |vm: &mut classgen_vm::Vm| {
        vm.new_object("demo.Reading", "(D)V", &[Value::Double(f64::NAN)])
            .unwrap()
    };
    let a = nan(&mut vm);
    let b = nan(&mut vm);
    assert_eq!(
        vm.invoke_virtual(a, "equals", "(Ljava/lang/Object;)Z", &[b]).unwrap(),
        Some(Value::Int(1))
    );
}

#[test]
fn missing_constructor_is_reported() {
    let mut vm = load(&[book(false)]);
    assert!(matches!(
        vm.new_object("demo.Book", "(I)V", &[Value::Int(1)]),
        Err(VmError::NoSuchMethod { .. })
    ));
}
