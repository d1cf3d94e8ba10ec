//! Native stand-ins for the `java.lang` classes generated code links to.
//!
//! Builtin classes have no class file. [`Vm::invoke`] asks
//! [`Vm::call_builtin`] for each builtin class on the superclass chain and
//! moves on to the superclass when the method is not handled there.

use classgen_bytecode::string_hash;

use crate::error::VmError;
use crate::heap::{HeapObject, ObjectData};
use crate::value::{ObjectRef, Value};
use crate::vm::{Exec, Trap, Vm};

/// Field holding a throwable's detail message.
pub(crate) const MESSAGE_FIELD: &str = "Throwable.message";
const ENUM_NAME_FIELD: &str = "Enum.name";
const ENUM_ORDINAL_FIELD: &str = "Enum.ordinal";

/// Builtin classes and their superclasses.
const HIERARCHY: &[(&str, Option<&str>)] = &[
    ("java/lang/Object", None),
    ("java/lang/String", Some("java/lang/Object")),
    ("java/lang/Number", Some("java/lang/Object")),
    ("java/lang/Enum", Some("java/lang/Object")),
    ("java/lang/Record", Some("java/lang/Object")),
    ("java/lang/Boolean", Some("java/lang/Object")),
    ("java/lang/Character", Some("java/lang/Object")),
    ("java/util/Objects", Some("java/lang/Object")),
    ("java/lang/Throwable", Some("java/lang/Object")),
    ("java/lang/Integer", Some("java/lang/Number")),
    ("java/lang/Long", Some("java/lang/Number")),
    ("java/lang/Float", Some("java/lang/Number")),
    ("java/lang/Double", Some("java/lang/Number")),
    ("java/lang/Short", Some("java/lang/Number")),
    ("java/lang/Byte", Some("java/lang/Number")),
    ("java/lang/Exception", Some("java/lang/Throwable")),
    ("java/lang/Error", Some("java/lang/Throwable")),
    ("java/lang/RuntimeException", Some("java/lang/Exception")),
    ("java/lang/IllegalArgumentException", Some("java/lang/RuntimeException")),
    ("java/lang/IllegalStateException", Some("java/lang/RuntimeException")),
    ("java/lang/NullPointerException", Some("java/lang/RuntimeException")),
    ("java/lang/ArithmeticException", Some("java/lang/RuntimeException")),
    ("java/lang/ClassCastException", Some("java/lang/RuntimeException")),
    ("java/lang/IndexOutOfBoundsException", Some("java/lang/RuntimeException")),
    ("java/lang/UnsupportedOperationException", Some("java/lang/RuntimeException")),
    ("java/lang/IllegalMonitorStateException", Some("java/lang/RuntimeException")),
    ("java/lang/NegativeArraySizeException", Some("java/lang/RuntimeException")),
    (
        "java/lang/ArrayIndexOutOfBoundsException",
        Some("java/lang/IndexOutOfBoundsException"),
    ),
];

/// Arrays are builtin too and extend `Object`.
pub(crate) fn is_builtin(class: &str) -> bool {
    class.starts_with('[') || HIERARCHY.iter().any(|(name, _)| *name == class)
}

pub(crate) fn superclass(class: &str) -> Option<&'static str> {
    if class.starts_with('[') {
        return Some("java/lang/Object");
    }
    HIERARCHY
        .iter()
        .find(|(name, _)| *name == class)
        .and_then(|(_, parent)| *parent)
}

/// Result of offering a call to one builtin class.
pub(crate) enum Outcome {
    Handled(Option<Value>),
    /// Not implemented here; try the superclass.
    Unhandled,
}

/// Wrapper class for a primitive descriptor.
fn wrapper_primitive(class: &str) -> Option<&'static str> {
    Some(match class {
        "java/lang/Integer" => "I",
        "java/lang/Long" => "J",
        "java/lang/Float" => "F",
        "java/lang/Double" => "D",
        "java/lang/Short" => "S",
        "java/lang/Byte" => "B",
        "java/lang/Character" => "C",
        "java/lang/Boolean" => "Z",
        _ => return None,
    })
}

fn float_bits(value: f32) -> i32 {
    if value.is_nan() {
        0x7fc0_0000
    } else {
        value.to_bits() as i32
    }
}

fn double_bits(value: f64) -> i64 {
    if value.is_nan() {
        0x7ff8_0000_0000_0000
    } else {
        value.to_bits() as i64
    }
}

fn long_hash(value: i64) -> i32 {
    (value ^ ((value as u64) >> 32) as i64) as i32
}

/// `Float.compare`/`Double.compare`: `-0.0 < 0.0` and NaN above everything,
/// equal to itself.
fn compare_float(a: f64, b: f64) -> i32 {
    let canonical = |v: f64| if v.is_nan() { f64::NAN } else { v };
    canonical(a).total_cmp(&canonical(b)) as i32
}

/// `hashCode` of a primitive as its wrapper computes it.
fn primitive_hash(value: Value) -> Option<i32> {
    Some(match value {
        Value::Int(v) => v,
        Value::Long(v) => long_hash(v),
        Value::Float(v) => float_bits(v),
        Value::Double(v) => long_hash(double_bits(v)),
        _ => return None,
    })
}

/// Convert a primitive to the type named by a `xxxValue` accessor.
fn narrow(value: Value, target: &str) -> Option<Value> {
    let as_f64 = match value {
        Value::Int(v) => f64::from(v),
        Value::Long(v) => v as f64,
        Value::Float(v) => f64::from(v),
        Value::Double(v) => v,
        _ => return None,
    };
    let as_i64 = match value {
        Value::Int(v) => i64::from(v),
        Value::Long(v) => v,
        _ => as_f64 as i64,
    };
    Some(match target {
        "intValue" | "charValue" | "booleanValue" => match value {
            Value::Int(v) => Value::Int(v),
            Value::Long(v) => Value::Int(v as i32),
            _ => Value::Int(as_f64 as i32),
        },
        "longValue" => Value::Long(as_i64),
        "floatValue" => Value::Float(as_f64 as f32),
        "doubleValue" => Value::Double(as_f64),
        "shortValue" => Value::Int(i32::from(as_i64 as i16)),
        "byteValue" => Value::Int(i32::from(as_i64 as i8)),
        _ => return None,
    })
}

fn argument(args: &[Value], index: usize) -> Exec<Value> {
    args.get(index).copied().ok_or_else(|| {
        VmError::Malformed(format!("builtin call is missing argument {index}")).into()
    })
}

impl Vm {
    fn receiver_ref(&mut self, receiver: Option<Value>) -> Exec<ObjectRef> {
        match receiver {
            Some(value) => match value.as_reference()? {
                Some(handle) => Ok(handle),
                None => Err(self.throw("java/lang/NullPointerException", None)),
            },
            None => Err(VmError::Malformed("instance builtin called without receiver".into()).into()),
        }
    }

    fn set_field(&mut self, target: ObjectRef, name: &str, value: Value) -> Exec<()> {
        if let ObjectData::Fields(fields) = &mut self.heap.get_mut(target)?.data {
            fields.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn field(&self, target: ObjectRef, name: &str) -> Exec<Value> {
        match &self.heap.get(target)?.data {
            ObjectData::Fields(fields) => Ok(fields.get(name).copied().unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        }
    }

    fn text(&self, handle: ObjectRef) -> Exec<String> {
        match &self.heap.get(handle)?.data {
            ObjectData::Str(text) => Ok(text.clone()),
            _ => Err(VmError::TypeMismatch {
                expected: "string",
                found: "object",
            }
            .into()),
        }
    }

    fn identity_string(&self, handle: ObjectRef) -> Exec<String> {
        let class = self.heap.get(handle)?.class.replace('/', ".");
        Ok(format!("{class}@{:x}", handle.index()))
    }

    fn boxed(&mut self, class: &str, value: Value) -> Value {
        Value::Ref(
            self.heap
                .allocate(HeapObject::with_data(class, ObjectData::Boxed(value))),
        )
    }

    fn boxed_value(&self, handle: ObjectRef) -> Exec<Value> {
        match &self.heap.get(handle)?.data {
            ObjectData::Boxed(value) => Ok(*value),
            _ => Err(VmError::TypeMismatch {
                expected: "boxed primitive",
                found: "object",
            }
            .into()),
        }
    }

    /// Offer a call to the builtin `class`.
    pub(crate) fn call_builtin(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        receiver: Option<Value>,
        args: &[Value],
    ) -> Exec<Outcome> {
        if class.starts_with('[') {
            return self.array_builtin(name, descriptor, receiver);
        }
        if wrapper_primitive(class).is_some() {
            return self.wrapper_builtin(class, name, descriptor, receiver, args);
        }

        let result = match (class, name, descriptor) {
            ("java/lang/Object", "<init>", "()V") => None,
            ("java/lang/Object", "equals", "(Ljava/lang/Object;)Z") => {
                let this = self.receiver_ref(receiver)?;
                let other = argument(args, 0)?.as_reference()?;
                Some(Value::from(other == Some(this)))
            }
            ("java/lang/Object", "hashCode", "()I") => {
                let this = self.receiver_ref(receiver)?;
                Some(Value::Int(this.index() as i32))
            }
            ("java/lang/Object", "toString", "()Ljava/lang/String;") => {
                let this = self.receiver_ref(receiver)?;
                let text = self.identity_string(this)?;
                Some(Value::Ref(self.heap.string(text)))
            }

            ("java/lang/String", _, _) => return self.string_builtin(name, descriptor, receiver, args),

            ("java/lang/Record", "<init>", "()V") => None,
            ("java/lang/Enum", "<init>", "(Ljava/lang/String;I)V") => {
                let this = self.receiver_ref(receiver)?;
                self.set_field(this, ENUM_NAME_FIELD, argument(args, 0)?)?;
                self.set_field(this, ENUM_ORDINAL_FIELD, argument(args, 1)?)?;
                None
            }
            ("java/lang/Enum", "name" | "toString", "()Ljava/lang/String;") => {
                let this = self.receiver_ref(receiver)?;
                Some(self.field(this, ENUM_NAME_FIELD)?)
            }
            ("java/lang/Enum", "ordinal", "()I") => {
                let this = self.receiver_ref(receiver)?;
                Some(self.field(this, ENUM_ORDINAL_FIELD)?)
            }
            ("java/lang/Enum", "compareTo", "(Ljava/lang/Enum;)I") => {
                let this = self.receiver_ref(receiver)?;
                let Some(other) = argument(args, 0)?.as_reference()? else {
                    return Err(self.throw("java/lang/NullPointerException", None));
                };
                let mine = self.field(this, ENUM_ORDINAL_FIELD)?.as_int()?;
                let theirs = self.field(other, ENUM_ORDINAL_FIELD)?.as_int()?;
                Some(Value::Int(mine - theirs))
            }

            ("java/util/Objects", "equals", "(Ljava/lang/Object;Ljava/lang/Object;)Z") => {
                let left = argument(args, 0)?.as_reference()?;
                let right = argument(args, 1)?;
                let equal = match left {
                    None => right.as_reference()?.is_none(),
                    Some(left) if Value::Ref(left) == right => true,
                    Some(left) => self
                        .invoke_virtual_ref(left, "equals", "(Ljava/lang/Object;)Z", vec![right])?
                        .unwrap_or(Value::Int(0))
                        .as_bool()?,
                };
                Some(Value::from(equal))
            }
            ("java/util/Objects", "hashCode", "(Ljava/lang/Object;)I") => {
                let hash = match argument(args, 0)?.as_reference()? {
                    None => Value::Int(0),
                    Some(target) => self
                        .invoke_virtual_ref(target, "hashCode", "()I", Vec::new())?
                        .unwrap_or(Value::Int(0)),
                };
                Some(hash)
            }

            ("java/lang/Throwable", "<init>", "()V") => None,
            ("java/lang/Throwable", "<init>", "(Ljava/lang/String;)V") => {
                let this = self.receiver_ref(receiver)?;
                self.set_field(this, MESSAGE_FIELD, argument(args, 0)?)?;
                None
            }
            ("java/lang/Throwable", "getMessage", "()Ljava/lang/String;") => {
                let this = self.receiver_ref(receiver)?;
                Some(self.field(this, MESSAGE_FIELD)?)
            }
            ("java/lang/Throwable", "toString", "()Ljava/lang/String;") => {
                let this = self.receiver_ref(receiver)?;
                let class = self.heap.get(this)?.class.replace('/', ".");
                let text = match self.field(this, MESSAGE_FIELD)?.as_reference()? {
                    Some(message) => format!("{class}: {}", self.text(message)?),
                    None => class,
                };
                Some(Value::Ref(self.heap.string(text)))
            }
            _ => return Ok(Outcome::Unhandled),
        };
        Ok(Outcome::Handled(result))
    }

    fn string_builtin(
        &mut self,
        name: &str,
        descriptor: &str,
        receiver: Option<Value>,
        args: &[Value],
    ) -> Exec<Outcome> {
        if receiver.is_none() {
            return Ok(Outcome::Unhandled);
        }
        let this = self.receiver_ref(receiver)?;
        let text = self.text(this)?;
        let result = match (name, descriptor) {
            ("equals", "(Ljava/lang/Object;)Z") => {
                let equal = match argument(args, 0)?.as_reference()? {
                    Some(other) => matches!(
                        &self.heap.get(other)?.data,
                        ObjectData::Str(other) if *other == text
                    ),
                    None => false,
                };
                Value::from(equal)
            }
            ("hashCode", "()I") => Value::Int(string_hash(&text)),
            ("length", "()I") => Value::Int(text.encode_utf16().count() as i32),
            ("isEmpty", "()Z") => Value::from(text.is_empty()),
            ("toString", "()Ljava/lang/String;") => Value::Ref(this),
            ("concat", "(Ljava/lang/String;)Ljava/lang/String;") => {
                let Some(other) = argument(args, 0)?.as_reference()? else {
                    return Err(self.throw("java/lang/NullPointerException", None));
                };
                let joined = text + &self.text(other)?;
                Value::Ref(self.heap.string(joined))
            }
            _ => return Ok(Outcome::Unhandled),
        };
        Ok(Outcome::Handled(Some(result)))
    }

    fn wrapper_builtin(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        receiver: Option<Value>,
        args: &[Value],
    ) -> Exec<Outcome> {
        let Some(primitive) = wrapper_primitive(class) else {
            return Ok(Outcome::Unhandled);
        };
        let static_call = receiver.is_none();

        let result = match name {
            "valueOf" if static_call && descriptor.starts_with(&format!("({primitive})")) => {
                Some(self.boxed(class, argument(args, 0)?))
            }
            "compare" if static_call => {
                let (a, b) = (argument(args, 0)?, argument(args, 1)?);
                let order = match (a, b) {
                    (Value::Float(a), Value::Float(b)) => compare_float(f64::from(a), f64::from(b)),
                    (Value::Double(a), Value::Double(b)) => compare_float(a, b),
                    (Value::Long(a), Value::Long(b)) => a.cmp(&b) as i32,
                    (Value::Int(a), Value::Int(b)) => a.cmp(&b) as i32,
                    _ => return Ok(Outcome::Unhandled),
                };
                Some(Value::Int(order))
            }
            "hashCode" if static_call => {
                let value = argument(args, 0)?;
                Some(Value::Int(wrapper_hash(primitive, value)?))
            }
            "hashCode" => {
                let this = self.receiver_ref(receiver)?;
                let value = self.boxed_value(this)?;
                Some(Value::Int(wrapper_hash(primitive, value)?))
            }
            "equals" => {
                let this = self.receiver_ref(receiver)?;
                let value = self.boxed_value(this)?;
                let equal = match argument(args, 0)?.as_reference()? {
                    Some(other) if self.heap.get(other)?.class == class => {
                        let other = self.boxed_value(other)?;
                        match (value, other) {
                            (Value::Float(a), Value::Float(b)) => float_bits(a) == float_bits(b),
                            (Value::Double(a), Value::Double(b)) => double_bits(a) == double_bits(b),
                            (a, b) => a == b,
                        }
                    }
                    _ => false,
                };
                Some(Value::from(equal))
            }
            "toString" => {
                let this = self.receiver_ref(receiver)?;
                let text = match self.boxed_value(this)? {
                    Value::Int(v) if primitive == "Z" => (v != 0).to_string(),
                    Value::Int(v) if primitive == "C" => char::from_u32(v as u32)
                        .map(String::from)
                        .unwrap_or_default(),
                    Value::Int(v) => v.to_string(),
                    Value::Long(v) => v.to_string(),
                    Value::Float(v) => format!("{v:?}"),
                    Value::Double(v) => format!("{v:?}"),
                    other => other.type_name().to_string(),
                };
                Some(Value::Ref(self.heap.string(text)))
            }
            accessor if accessor.ends_with("Value") && !static_call => {
                let this = self.receiver_ref(receiver)?;
                let value = self.boxed_value(this)?;
                match narrow(value, accessor) {
                    Some(value) => Some(value),
                    None => return Ok(Outcome::Unhandled),
                }
            }
            _ => return Ok(Outcome::Unhandled),
        };
        Ok(Outcome::Handled(result))
    }

    fn array_builtin(
        &mut self,
        name: &str,
        descriptor: &str,
        receiver: Option<Value>,
    ) -> Exec<Outcome> {
        if (name, descriptor) != ("clone", "()Ljava/lang/Object;") {
            return Ok(Outcome::Unhandled);
        }
        let this = self.receiver_ref(receiver)?;
        let copy = self.heap.get(this)?.clone();
        let copy = HeapObject { monitor: 0, ..copy };
        Ok(Outcome::Handled(Some(Value::Ref(self.heap.allocate(copy)))))
    }
}

fn wrapper_hash(primitive: &str, value: Value) -> Exec<i32> {
    let hash = match (primitive, value) {
        ("Z", Value::Int(v)) => {
            if v != 0 {
                1231
            } else {
                1237
            }
        }
        (_, value) => primitive_hash(value).ok_or(Trap::Fatal(VmError::TypeMismatch {
            expected: "primitive",
            found: value.type_name(),
        }))?,
    };
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_hashes() {
        assert_eq!(wrapper_hash("Z", Value::Int(1)).unwrap(), 1231);
        assert_eq!(wrapper_hash("Z", Value::Int(0)).unwrap(), 1237);
        assert_eq!(wrapper_hash("J", Value::Long(1 << 32)).unwrap(), 1);
        assert_eq!(wrapper_hash("F", Value::Float(1.0)).unwrap(), 0x3f80_0000);
        assert_eq!(
            wrapper_hash("F", Value::Float(f32::NAN)).unwrap(),
            wrapper_hash("F", Value::Float(-f32::NAN)).unwrap()
        );
    }

    #[test]
    fn float_compare_orders_zero_and_nan() {
        assert_eq!(compare_float(-0.0, 0.0), -1);
        assert_eq!(compare_float(f64::NAN, f64::NAN), 0);
        assert_eq!(compare_float(f64::NAN, f64::INFINITY), 1);
        assert_eq!(compare_float(1.0, 2.0), -1);
    }

    #[test]
    fn hierarchy_lookup() {
        assert!(is_builtin("java/lang/Enum"));
        assert!(is_builtin("[I"));
        assert!(!is_builtin("demo/Widget"));
        assert_eq!(superclass("[Ljava/lang/String;"), Some("java/lang/Object"));
        assert_eq!(
            superclass("java/lang/ArrayIndexOutOfBoundsException"),
            Some("java/lang/IndexOutOfBoundsException")
        );
        assert_eq!(superclass("java/lang/Object"), None);
    }

    #[test]
    fn accessors_narrow() {
        assert_eq!(narrow(Value::Int(300), "byteValue"), Some(Value::Int(44)));
        assert_eq!(narrow(Value::Double(2.9), "intValue"), Some(Value::Int(2)));
        assert_eq!(narrow(Value::Int(7), "longValue"), Some(Value::Long(7)));
        assert_eq!(narrow(Value::Null, "intValue"), None);
    }

    #[test]
    fn boxing_round_trip_through_vm() {
        let mut vm = Vm::new();
        let boxed = vm
            .invoke_static("java.lang.Integer", "valueOf", "(I)Ljava/lang/Integer;", &[Value::Int(5)])
            .unwrap()
            .unwrap();
        assert_eq!(vm.unbox(boxed), Some(Value::Int(5)));
        let long = vm.invoke_virtual(boxed, "longValue", "()J", &[]).unwrap();
        assert_eq!(long, Some(Value::Long(5)));
    }

    #[test]
    fn string_methods_through_vm() {
        let mut vm = Vm::new();
        let a = vm.string("ab");
        let b = vm.string("cd");
        let joined = vm
            .invoke_virtual(a, "concat", "(Ljava/lang/String;)Ljava/lang/String;", &[b])
            .unwrap()
            .unwrap();
        assert_eq!(vm.string_value(joined).as_deref(), Some("abcd"));

        let copy = vm.string("abcd");
        let equal = vm
            .invoke_virtual(joined, "equals", "(Ljava/lang/Object;)Z", &[copy])
            .unwrap();
        assert_eq!(equal, Some(Value::Int(1)));

        let objects_equal = vm
            .invoke_static(
                "java.util.Objects",
                "equals",
                "(Ljava/lang/Object;Ljava/lang/Object;)Z",
                &[Value::Null, copy],
            )
            .unwrap();
        assert_eq!(objects_equal, Some(Value::Int(0)));
    }

    #[test]
    fn exception_constructor_reaches_throwable() {
        let mut vm = Vm::new();
        let message = vm.string("bad input");
        let exception = vm
            .new_object(
                "java.lang.IllegalArgumentException",
                "(Ljava/lang/String;)V",
                &[message],
            )
            .unwrap();
        let read = vm
            .invoke_virtual(exception, "getMessage", "()Ljava/lang/String;", &[])
            .unwrap()
            .unwrap();
        assert_eq!(vm.string_value(read).as_deref(), Some("bad input"));
    }
}
