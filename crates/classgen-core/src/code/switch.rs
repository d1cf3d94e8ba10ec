//! Switch statements and expressions.
//!
//! Branches are ordered `(labels, body)` pairs. Construction rejects labels
//! that appear in more than one branch, branches without labels, and mixed
//! integer/string labels, so emitters can rely on a disjoint label set.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::{ExpressionDef, ModelError, StatementDef, TypeDef};

/// A case label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SwitchLabel {
    Int(i32),
    String(String),
}

impl fmt::Display for SwitchLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchLabel::Int(value) => write!(f, "{value}"),
            SwitchLabel::String(value) => write!(f, "\"{value}\""),
        }
    }
}

/// One branch of a switch.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchBranch<T> {
    pub labels: Vec<SwitchLabel>,
    pub body: T,
}

impl<T> SwitchBranch<T> {
    pub fn new(labels: Vec<SwitchLabel>, body: T) -> Self {
        Self { labels, body }
    }

    /// Branch for integer labels.
    pub fn ints(labels: impl IntoIterator<Item = i32>, body: T) -> Self {
        Self::new(labels.into_iter().map(SwitchLabel::Int).collect(), body)
    }

    /// Branch for string labels.
    pub fn strings<S: Into<String>>(labels: impl IntoIterator<Item = S>, body: T) -> Self {
        Self::new(
            labels
                .into_iter()
                .map(|label| SwitchLabel::String(label.into()))
                .collect(),
            body,
        )
    }
}

/// Switch statement; branches do not fall through.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStatement {
    subject: ExpressionDef,
    branches: Vec<SwitchBranch<StatementDef>>,
    default: Option<StatementDef>,
}

impl SwitchStatement {
    pub fn new(
        subject: ExpressionDef,
        branches: Vec<SwitchBranch<StatementDef>>,
        default: Option<StatementDef>,
    ) -> Result<Self, ModelError> {
        check_labels(&branches)?;
        Ok(Self {
            subject,
            branches,
            default,
        })
    }

    pub fn subject(&self) -> &ExpressionDef {
        &self.subject
    }

    pub fn branches(&self) -> &[SwitchBranch<StatementDef>] {
        &self.branches
    }

    pub fn default(&self) -> Option<&StatementDef> {
        self.default.as_ref()
    }
}

/// Switch producing a value; a default branch is mandatory.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchExpression {
    subject: ExpressionDef,
    ty: TypeDef,
    branches: Vec<SwitchBranch<ExpressionDef>>,
    default: ExpressionDef,
}

impl SwitchExpression {
    pub fn new(
        subject: ExpressionDef,
        ty: TypeDef,
        branches: Vec<SwitchBranch<ExpressionDef>>,
        default: Option<ExpressionDef>,
    ) -> Result<Self, ModelError> {
        check_labels(&branches)?;
        let default = default.ok_or(ModelError::MissingSwitchDefault)?;
        Ok(Self {
            subject,
            ty,
            branches,
            default,
        })
    }

    pub fn subject(&self) -> &ExpressionDef {
        &self.subject
    }

    pub fn ty(&self) -> &TypeDef {
        &self.ty
    }

    pub fn branches(&self) -> &[SwitchBranch<ExpressionDef>] {
        &self.branches
    }

    pub fn default(&self) -> &ExpressionDef {
        &self.default
    }
}

fn check_labels<T>(branches: &[SwitchBranch<T>]) -> Result<(), ModelError> {
    let mut seen = FxHashSet::default();
    let mut has_int = false;
    let mut has_string = false;
    for (index, branch) in branches.iter().enumerate() {
        if branch.labels.is_empty() {
            return Err(ModelError::EmptySwitchBranch { index });
        }
        for label in &branch.labels {
            match label {
                SwitchLabel::Int(_) => has_int = true,
                SwitchLabel::String(_) => has_string = true,
            }
            if !seen.insert(label) {
                return Err(ModelError::OverlappingSwitchLabel {
                    label: label.to_string(),
                });
            }
        }
    }
    if has_int && has_string {
        return Err(ModelError::MixedSwitchLabels);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> StatementDef {
        StatementDef::Multi(vec![])
    }

    #[test]
    fn overlapping_labels_rejected() {
        let result = SwitchStatement::new(
            ExpressionDef::int(1),
            vec![
                SwitchBranch::ints([1, 2], body()),
                SwitchBranch::ints([3, 2], body()),
            ],
            None,
        );
        assert_eq!(
            result.unwrap_err(),
            ModelError::OverlappingSwitchLabel {
                label: "2".into()
            }
        );
    }

    #[test]
    fn mixed_labels_rejected() {
        let result = SwitchStatement::new(
            ExpressionDef::int(1),
            vec![
                SwitchBranch::ints([1], body()),
                SwitchBranch::strings(["a"], body()),
            ],
            None,
        );
        assert_eq!(result.unwrap_err(), ModelError::MixedSwitchLabels);
    }

    #[test]
    fn empty_branch_rejected() {
        let result = SwitchStatement::new(
            ExpressionDef::int(1),
            vec![SwitchBranch::new(vec![], body())],
            None,
        );
        assert_eq!(result.unwrap_err(), ModelError::EmptySwitchBranch { index: 0 });
    }

    #[test]
    fn expression_requires_default() {
        let result = SwitchExpression::new(
            ExpressionDef::int(1),
            TypeDef::INT,
            vec![SwitchBranch::ints([1], ExpressionDef::int(10))],
            None,
        );
        assert_eq!(result.unwrap_err(), ModelError::MissingSwitchDefault);
    }

    #[test]
    fn disjoint_labels_accepted() {
        let switch = SwitchStatement::new(
            ExpressionDef::string("x"),
            vec![
                SwitchBranch::strings(["a", "b"], body()),
                SwitchBranch::strings(["c"], body()),
            ],
            Some(body()),
        )
        .unwrap();
        assert_eq!(switch.branches().len(), 2);
        assert!(switch.default().is_some());
    }
}
