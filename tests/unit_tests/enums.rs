use classgen::prelude::*;
use classgen_vm::{Value, Vm, VmError};

use crate::common::{load, name};

const VALUES: &str = "()[Ldemo/Letter;";
const VALUE_OF: &str = "(Ljava/lang/String;)Ldemo/Letter;";

fn letters() -> Vm {
    let def = ObjectDef::enumeration(name("Letter"))
        .add_enum_constant("A")
        .add_enum_constant("B")
        .add_enum_constant("C")
        .build()
        .unwrap();
    load(&[def])
}

fn constant_name(vm: &mut Vm, constant: Value) -> String {
    let name = vm
        .invoke_virtual(constant, "name", "()Ljava/lang/String;", &[])
        .unwrap()
        .unwrap();
    vm.string_value(name).unwrap()
}

#[test]
fn values_lists_constants_in_declaration_order() {
    let mut vm = letters();
    let values = vm
        .invoke_static("demo.Letter", "values", VALUES, &[])
        .unwrap()
        .unwrap();
    let constants = vm.array_elements(values).unwrap();
    assert_eq!(constants.len(), 3);

    for (ordinal, constant) in constants.iter().enumerate() {
        let expected = ["A", "B", "C"][ordinal];
        assert_eq!(constant_name(&mut vm, *constant), expected);
        assert_eq!(
            vm.invoke_virtual(*constant, "ordinal", "()I", &[]).unwrap(),
            Some(Value::Int(ordinal as i32))
        );
        assert_eq!(vm.get_static("demo.Letter", expected).unwrap(), *constant);
    }
}

#[test]
fn values_returns_a_fresh_copy() {
    let mut vm = letters();
    let first = vm.invoke_static("demo.Letter", "values", VALUES, &[]).unwrap();
    let second = vm.invoke_static("demo.Letter", "values", VALUES, &[]).unwrap();
    assert_ne!(first, second);
    assert_eq!(
        vm.array_elements(first.unwrap()),
        vm.array_elements(second.unwrap())
    );
}

#[test]
fn value_of_finds_constant_by_name() {
    let mut vm = letters();
    let text = vm.string("B");
    let found = vm
        .invoke_static("demo.Letter", "valueOf", VALUE_OF, &[text])
        .unwrap()
        .unwrap();
    assert_eq!(found, vm.get_static("demo.Letter", "B").unwrap());
    assert_eq!(constant_name(&mut vm, found), "B");
}

#[test]
fn value_of_rejects_unknown_names() {
    let mut vm = letters();
    let text = vm.string("Z");
    assert_eq!(
        vm.invoke_static("demo.Letter", "valueOf", VALUE_OF, &[text]),
        Err(VmError::Uncaught {
            class: "java.lang.IllegalArgumentException".into(),
            message: Some("No enum constant demo.Letter.Z".into()),
        })
    );
}

#[test]
fn constants_compare_by_ordinal() {
    let mut vm = letters();
    let a = vm.get_static("demo.Letter", "A").unwrap();
    let c = vm.get_static("demo.Letter", "C").unwrap();
    assert_eq!(
        vm.invoke_virtual(a, "compareTo", "(Ljava/lang/Enum;)I", &[c]).unwrap(),
        Some(Value::Int(-2))
    );
    assert_eq!(
        vm.invoke_virtual(c, "toString", "()Ljava/lang/String;", &[])
            .map(|value| value.and_then(|value| vm.string_value(value))),
        Ok(Some("C".to_string()))
    );
}
