//! Integer and string switches.
//!
//! Integer switches compile to `tableswitch` when the labels are dense
//! enough (see [`WriterOptions::switch_density`]) and to `lookupswitch`
//! otherwise. String switches dispatch on `hashCode()` first, then confirm
//! with `equals` inside each hash bucket:
//!
//! ```text
//! switch (s) { case "a": A; case "b": B; default: D }
//!
//!     <s> dup astore t invokevirtual String.hashCode
//!     lookupswitch { 97: H1, 98: H2, default: DEF }
//! H1: aload t ldc "a" invokevirtual String.equals ifne A
//!     goto DEF
//! H2: aload t ldc "b" invokevirtual String.equals ifne B
//!     goto DEF
//! ```
//!
//! [`WriterOptions::switch_density`]: crate::WriterOptions::switch_density

use std::collections::BTreeMap;

use classgen_core::{
    ClassTypeDef, ExpressionDef, MethodRef, PrimitiveKind, SwitchExpression, SwitchLabel,
    SwitchStatement, TypeDef,
};

use super::{MethodLowering, Result};
use crate::code::{Label, SlotKind};
use crate::{EmitErrorKind, OpCode};

/// Jump tables wider than this always use `lookupswitch`.
const MAX_TABLE_RANGE: i64 = 4096;

/// `String.hashCode()` of a string: `31 * h + c` over its UTF-16 units.
pub fn string_hash(value: &str) -> i32 {
    value
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

enum SubjectKind {
    Int,
    String,
}

fn subject_kind(ty: &TypeDef) -> Option<SubjectKind> {
    let erased = ty.erasure();
    if erased == TypeDef::string() {
        return Some(SubjectKind::String);
    }
    erased
        .as_primitive()
        .or_else(|| erased.boxed_kind())
        .filter(|kind| kind.is_int_like() && *kind != PrimitiveKind::Boolean)
        .map(|_| SubjectKind::Int)
}

impl MethodLowering<'_> {
    pub(super) fn switch_statement(&mut self, switch: &SwitchStatement) -> Result<()> {
        self.locals.push_scope();
        let result = self.switch_statement_scoped(switch);
        self.locals.pop_scope();
        result
    }

    fn switch_statement_scoped(&mut self, switch: &SwitchStatement) -> Result<()> {
        let end = self.code.new_label();
        let default = self.code.new_label();
        let targets: Vec<Label> = switch.branches().iter().map(|_| self.code.new_label()).collect();
        let labels: Vec<&[SwitchLabel]> = switch.branches().iter().map(|b| &b.labels[..]).collect();
        self.dispatch(switch.subject(), &labels, &targets, default)?;

        for (branch, target) in switch.branches().iter().zip(&targets) {
            self.code.place(*target)?;
            self.block(&branch.body)?;
            if self.code.is_reachable() {
                self.code.branch(OpCode::Goto, end)?;
            }
        }
        self.code.place(default)?;
        if let Some(body) = switch.default() {
            self.block(body)?;
        }
        self.code.place(end)
    }

    pub(super) fn switch_expression(&mut self, switch: &SwitchExpression) -> Result<()> {
        self.locals.push_scope();
        let result = self.switch_expression_scoped(switch);
        self.locals.pop_scope();
        result
    }

    fn switch_expression_scoped(&mut self, switch: &SwitchExpression) -> Result<()> {
        let ty = switch.ty().clone();
        let end = self.code.new_label();
        let default = self.code.new_label();
        let targets: Vec<Label> = switch.branches().iter().map(|_| self.code.new_label()).collect();
        let labels: Vec<&[SwitchLabel]> = switch.branches().iter().map(|b| &b.labels[..]).collect();
        self.dispatch(switch.subject(), &labels, &targets, default)?;

        for (branch, target) in switch.branches().iter().zip(&targets) {
            self.code.place(*target)?;
            self.value_as(&branch.body, &ty)?;
            self.code.branch(OpCode::Goto, end)?;
        }
        self.code.place(default)?;
        self.value_as(switch.default(), &ty)?;
        self.code.place(end)
    }

    /// Evaluate the subject and jump to the target of the matching label,
    /// or to `default`.
    fn dispatch(
        &mut self,
        subject: &ExpressionDef,
        labels: &[&[SwitchLabel]],
        targets: &[Label],
        default: Label,
    ) -> Result<()> {
        let subject_ty = subject.ty();
        let unsupported = || EmitErrorKind::UnsupportedSwitchSubject {
            ty: subject_ty.to_string(),
        };
        match subject_kind(&subject_ty).ok_or_else(unsupported)? {
            SubjectKind::Int => {
                let mut pairs = Vec::new();
                for (branch_labels, target) in labels.iter().zip(targets) {
                    for label in branch_labels.iter() {
                        match label {
                            SwitchLabel::Int(value) => pairs.push((*value, *target)),
                            SwitchLabel::String(_) => return Err(unsupported()),
                        }
                    }
                }
                self.value_as(subject, &TypeDef::INT)?;
                self.int_switch(&pairs, default)
            }
            SubjectKind::String => {
                let mut buckets: BTreeMap<i32, Vec<(&str, Label)>> = BTreeMap::new();
                for (branch_labels, target) in labels.iter().zip(targets) {
                    for label in branch_labels.iter() {
                        match label {
                            SwitchLabel::String(text) => buckets
                                .entry(string_hash(text))
                                .or_default()
                                .push((text.as_str(), *target)),
                            SwitchLabel::Int(_) => return Err(unsupported()),
                        }
                    }
                }
                self.value_as(subject, &TypeDef::string())?;
                self.string_switch(&buckets, default)
            }
        }
    }

    fn string_switch(
        &mut self,
        buckets: &BTreeMap<i32, Vec<(&str, Label)>>,
        default: Label,
    ) -> Result<()> {
        let string = ClassTypeDef::string();
        let hash_code = MethodRef::new(string.clone(), "hashCode", vec![], TypeDef::INT);
        let equals = MethodRef::new(string, "equals", vec![TypeDef::object()], TypeDef::BOOLEAN);

        let temp = self.locals.temporary(TypeDef::string())?;
        self.code.op(OpCode::Dup)?;
        self.code.store(SlotKind::Reference, temp)?;
        self.invoke_ref(OpCode::Invokevirtual, &hash_code, true)?;

        let bucket_labels: Vec<(i32, Label)> = buckets
            .keys()
            .map(|hash| (*hash, self.code.new_label()))
            .collect();
        self.int_switch(&bucket_labels, default)?;

        for ((_, bucket_label), candidates) in bucket_labels.iter().zip(buckets.values()) {
            self.code.place(*bucket_label)?;
            for (text, target) in candidates {
                self.code.load(SlotKind::Reference, temp)?;
                let index = self.pool.string(text)?;
                self.ldc(index)?;
                self.invoke_ref(OpCode::Invokevirtual, &equals, true)?;
                self.code.branch(OpCode::Ifne, *target)?;
            }
            self.code.branch(OpCode::Goto, default)?;
        }
        Ok(())
    }

    /// Jump on the int on top of the stack.
    fn int_switch(&mut self, pairs: &[(i32, Label)], default: Label) -> Result<()> {
        let (Some(low), Some(high)) = (
            pairs.iter().map(|(key, _)| *key).min(),
            pairs.iter().map(|(key, _)| *key).max(),
        ) else {
            self.code.op(OpCode::Pop)?;
            return self.code.branch(OpCode::Goto, default);
        };

        let range = i64::from(high) - i64::from(low) + 1;
        let density = pairs.len() as f64 / range as f64;
        if range <= MAX_TABLE_RANGE && density >= self.options.switch_density {
            let mut table = vec![default; range as usize];
            for (key, target) in pairs {
                table[(i64::from(*key) - i64::from(low)) as usize] = *target;
            }
            self.code.table_switch(low, high, default, &table)
        } else {
            self.code.lookup_switch(default, pairs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{lower, lower_with};
    use super::*;
    use crate::WriterOptions;
    use classgen_core::{
        MethodDef, Modifiers, StatementDef, SwitchBranch, SwitchExpression, SwitchStatement,
        VariableDef,
    };

    #[test]
    fn string_hash_matches_java() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("hello"), 99_162_322);
        // overflow wraps
        assert_eq!(string_hash("polygenelubricants"), i32::MIN);
        // "Aa" and "BB" collide
        assert_eq!(string_hash("Aa"), string_hash("BB"));
    }

    fn int_switch_method(labels: &[i32]) -> MethodDef {
        let value = VariableDef::parameter("value", TypeDef::INT);
        let branches = labels
            .iter()
            .map(|label| SwitchBranch::ints([*label], ExpressionDef::int(*label * 10)))
            .collect();
        let switch =
            SwitchExpression::new(value.read(), TypeDef::INT, branches, Some(ExpressionDef::int(-1)))
                .unwrap();
        MethodDef::builder("pick")
            .add_modifiers(Modifiers::STATIC)
            .returns(TypeDef::INT)
            .add_parameter("value", TypeDef::INT)
            .add_statement(ExpressionDef::Switch(Box::new(switch)).returning())
            .build()
    }

    #[test]
    fn dense_labels_use_table() {
        let code = lower(&int_switch_method(&[1, 2, 3, 4])).unwrap();
        assert!(code.opcodes().contains(&OpCode::Tableswitch));
    }

    #[test]
    fn sparse_labels_use_lookup() {
        let code = lower(&int_switch_method(&[1, 1000, 50_000])).unwrap();
        assert!(code.opcodes().contains(&OpCode::Lookupswitch));
    }

    #[test]
    fn density_threshold_is_configurable() {
        let method = int_switch_method(&[1, 2, 3, 4]);
        let never = WriterOptions::default().with_switch_density(1.1);
        let code = lower_with(&method, &never).unwrap();
        assert!(code.opcodes().contains(&OpCode::Lookupswitch));
        assert!(!code.opcodes().contains(&OpCode::Tableswitch));
    }

    #[test]
    fn colliding_strings_share_a_bucket() {
        let name = VariableDef::parameter("name", TypeDef::string());
        let switch = SwitchStatement::new(
            name.read(),
            vec![
                SwitchBranch::strings(["Aa"], ExpressionDef::int(1).returning()),
                SwitchBranch::strings(["BB"], ExpressionDef::int(2).returning()),
            ],
            Some(ExpressionDef::int(0).returning()),
        )
        .unwrap();
        let method = MethodDef::builder("pick")
            .add_modifiers(Modifiers::STATIC)
            .returns(TypeDef::INT)
            .add_parameter("name", TypeDef::string())
            .add_statement(StatementDef::switch(switch))
            .build();
        let code = lower(&method).unwrap();
        let ops = code.opcodes();
        // hashCode once, then one equals per candidate
        let calls = ops.iter().filter(|op| **op == OpCode::Invokevirtual).count();
        assert_eq!(calls, 3);
        assert!(ops.contains(&OpCode::Tableswitch));
    }

    #[test]
    fn boolean_subject_rejected() {
        let flag = VariableDef::parameter("flag", TypeDef::BOOLEAN);
        let switch = SwitchStatement::new(flag.read(), vec![], None).unwrap();
        let method = MethodDef::builder("pick")
            .add_modifiers(Modifiers::STATIC)
            .add_parameter("flag", TypeDef::BOOLEAN)
            .add_statement(StatementDef::switch(switch))
            .build();
        assert_eq!(
            lower(&method),
            Err(EmitErrorKind::UnsupportedSwitchSubject {
                ty: "boolean".to_string()
            })
        );
    }

    #[test]
    fn empty_switch_pops_subject() {
        let value = VariableDef::parameter("value", TypeDef::INT);
        let switch = SwitchStatement::new(value.read(), vec![], None).unwrap();
        let method = MethodDef::builder("pick")
            .add_modifiers(Modifiers::STATIC)
            .add_parameter("value", TypeDef::INT)
            .add_statement(StatementDef::switch(switch))
            .build();
        let ops = lower(&method).unwrap().opcodes();
        assert_eq!(ops, [OpCode::Iload0, OpCode::Pop, OpCode::Goto, OpCode::Return]);
    }
}
